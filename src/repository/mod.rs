use crate::{
    db::DbPool,
    domain::{
        client::NewClient,
        manager::{Manager, NewManager},
    },
    repository::{
        client::DieselClientSource, errors::RepositoryResult, manager::DieselManagerSource,
    },
};

pub mod client;
pub mod errors;
pub mod manager;
#[cfg(any(test, feature = "test-mocks"))]
pub mod mock;
mod query;

/// Diesel-backed access to every entity of the admin backend.
#[derive(Clone)]
pub struct DieselRepository {
    pool: DbPool,
}

impl DieselRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Clients of `hub_id`, ready to be paged by the search engine.
    pub fn clients(&self, hub_id: i32) -> DieselClientSource<'_> {
        DieselClientSource::new(&self.pool, hub_id)
    }

    /// Managers of `hub_id`, ready to be paged by the search engine.
    pub fn managers(&self, hub_id: i32) -> DieselManagerSource<'_> {
        DieselManagerSource::new(&self.pool, hub_id)
    }
}

pub trait ClientWriter {
    fn create_clients(&self, new_clients: &[NewClient]) -> RepositoryResult<usize>;
}

pub trait ManagerWriter {
    fn create_manager(&self, new_manager: &NewManager) -> RepositoryResult<Manager>;
}
