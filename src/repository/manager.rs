use diesel::prelude::*;
use diesel::sqlite::Sqlite;

use crate::db::{DbPool, get_connection};
use crate::domain::manager::{Manager, NewManager};
use crate::repository::query::{
    ColumnOp, Predicate, compare_column, int_column_value, keyset_predicate, mismatched_value,
    text_predicate, then_order_by, unknown_column, window,
};
use crate::repository::{DieselRepository, ManagerWriter, errors::RepositoryResult};
use crate::schema::managers;
use crate::search::cursor::CursorValue;
use crate::search::engine::{QueryPlan, QueryableSource, SortableRow};
use crate::search::sort::{SortParam, TieBreaker};
use crate::search::{SearchOptions, SearchOptionsError};

const TABLE: &str = "managers";

/// Sort allowlist, defaults and searchable columns of the managers list.
pub fn manager_search_options() -> Result<SearchOptions, SearchOptionsError> {
    SearchOptions::builder()
        .allow("id", "id")
        .allow("name", "name")
        .allow("email", "email")
        .default_sort(SortParam::asc("name"))
        .tie_breaker(TieBreaker::new("name", "id"))
        .text_searchable("name")
        .text_searchable("email")
        .build()
}

impl SortableRow for Manager {
    fn column_value(&self, column: &str) -> Option<CursorValue> {
        match column {
            "id" => Some(self.id.into()),
            "hub_id" => Some(self.hub_id.into()),
            "name" => Some(self.name.as_str().into()),
            "email" => Some(self.email.as_str().into()),
            _ => None,
        }
    }
}

/// Managers of one hub as a [`QueryableSource`].
pub struct DieselManagerSource<'a> {
    pool: &'a DbPool,
    hub_id: i32,
}

impl<'a> DieselManagerSource<'a> {
    pub fn new(pool: &'a DbPool, hub_id: i32) -> Self {
        Self { pool, hub_id }
    }
}

fn compare(
    column: &str,
    op: ColumnOp,
    value: &CursorValue,
) -> RepositoryResult<Predicate<managers::table>> {
    let predicate = match (column, value) {
        ("id", CursorValue::Int(id)) => {
            let id = int_column_value(TABLE, column, *id)?;
            compare_column!(managers::table, managers::id, op, id)
        }
        ("name", CursorValue::Text(name)) => {
            compare_column!(managers::table, managers::name, op, name.clone())
        }
        ("email", CursorValue::Text(email)) => {
            compare_column!(managers::table, managers::email, op, email.clone())
        }
        ("id" | "name" | "email", _) => return Err(mismatched_value(TABLE, column, value)),
        _ => return Err(unknown_column(TABLE, column)),
    };
    Ok(predicate)
}

fn like(column: &str, pattern: String) -> RepositoryResult<Predicate<managers::table>> {
    match column {
        "name" => Ok(Box::new(managers::name.like(pattern).escape('\\'))),
        "email" => Ok(Box::new(managers::email.like(pattern).escape('\\'))),
        _ => Err(unknown_column(TABLE, column)),
    }
}

fn filtered_managers(
    hub_id: i32,
    plan: &QueryPlan,
) -> RepositoryResult<managers::BoxedQuery<'static, Sqlite>> {
    let mut query = managers::table.filter(managers::hub_id.eq(hub_id)).into_boxed();

    let text = match &plan.filter {
        Some(filter) => text_predicate(filter, like)?,
        None => None,
    };
    if let Some(text) = text {
        query = query.filter(text);
    }

    Ok(query)
}

fn manager_page_query(
    hub_id: i32,
    plan: &QueryPlan,
) -> RepositoryResult<managers::BoxedQuery<'static, Sqlite>> {
    let mut query = filtered_managers(hub_id, plan)?;

    let after = match &plan.keyset {
        Some(keyset) => keyset_predicate(keyset, compare)?,
        None => None,
    };
    if let Some(after) = after {
        query = query.filter(after);
    }

    for order in &plan.order {
        query = match order.column.as_str() {
            "id" => then_order_by!(query, managers::id, order.direction),
            "name" => then_order_by!(query, managers::name, order.direction),
            "email" => then_order_by!(query, managers::email, order.direction),
            other => return Err(unknown_column(TABLE, other)),
        };
    }

    let (limit, offset) = window(plan);
    if let Some(limit) = limit {
        query = query.limit(limit);
    }
    if let Some(offset) = offset {
        query = query.offset(offset);
    }

    Ok(query)
}

impl QueryableSource for DieselManagerSource<'_> {
    type Row = Manager;

    fn fetch(&self, plan: &QueryPlan) -> RepositoryResult<Vec<Manager>> {
        use crate::models::manager::Manager as DbManager;

        let query = manager_page_query(self.hub_id, plan)?;
        let mut conn = get_connection(self.pool)?;

        let items = query
            .load::<DbManager>(&mut conn)?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(items)
    }

    fn count(&self, plan: &QueryPlan) -> RepositoryResult<usize> {
        let query = filtered_managers(self.hub_id, plan)?;
        let mut conn = get_connection(self.pool)?;

        let total = query.count().get_result::<i64>(&mut conn)?;

        Ok(usize::try_from(total).unwrap_or_default())
    }
}

impl ManagerWriter for DieselRepository {
    fn create_manager(&self, new_manager: &NewManager) -> RepositoryResult<Manager> {
        use crate::models::manager::{Manager as DbManager, NewManager as DbNewManager};

        let mut conn = get_connection(self.pool())?;
        let insertable: DbNewManager = new_manager.into();
        let manager = diesel::insert_into(managers::table)
            .values(&insertable)
            .get_result::<DbManager>(&mut conn)?;

        Ok(manager.into())
    }
}
