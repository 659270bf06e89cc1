//! Mock sources and repositories for isolating services in tests.

use mockall::mock;

use crate::domain::client::{Client, NewClient};
use crate::domain::manager::{Manager, NewManager};
use crate::repository::errors::RepositoryResult;
use crate::repository::{ClientWriter, ManagerWriter};
use crate::search::engine::{QueryPlan, QueryableSource};

mock! {
    pub ClientSource {}

    impl QueryableSource for ClientSource {
        type Row = Client;

        fn fetch(&self, plan: &QueryPlan) -> RepositoryResult<Vec<Client>>;
        fn count(&self, plan: &QueryPlan) -> RepositoryResult<usize>;
    }
}

mock! {
    pub ManagerSource {}

    impl QueryableSource for ManagerSource {
        type Row = Manager;

        fn fetch(&self, plan: &QueryPlan) -> RepositoryResult<Vec<Manager>>;
        fn count(&self, plan: &QueryPlan) -> RepositoryResult<usize>;
    }
}

mock! {
    pub Repository {}

    impl ClientWriter for Repository {
        fn create_clients(&self, new_clients: &[NewClient]) -> RepositoryResult<usize>;
    }

    impl ManagerWriter for Repository {
        fn create_manager(&self, new_manager: &NewManager) -> RepositoryResult<Manager>;
    }
}
