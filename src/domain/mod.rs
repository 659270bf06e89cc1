//! Plain entity types shared by repositories, services and routes.

pub mod client;
pub mod manager;
