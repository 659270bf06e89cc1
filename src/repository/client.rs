use diesel::prelude::*;
use diesel::sqlite::Sqlite;

use crate::db::{DbPool, get_connection};
use crate::domain::client::{Client, NewClient};
use crate::repository::query::{
    ColumnOp, Predicate, compare_column, int_column_value, keyset_predicate, mismatched_value,
    text_predicate, then_order_by, unknown_column, window,
};
use crate::repository::{ClientWriter, DieselRepository, errors::RepositoryResult};
use crate::schema::clients;
use crate::search::cursor::CursorValue;
use crate::search::engine::{QueryPlan, QueryableSource, SortableRow};
use crate::search::sort::{SortParam, TieBreaker};
use crate::search::{SearchOptions, SearchOptionsError};

const TABLE: &str = "clients";

/// Sort allowlist, defaults and searchable columns of the clients list.
pub fn client_search_options() -> Result<SearchOptions, SearchOptionsError> {
    SearchOptions::builder()
        .allow("id", "id")
        .allow("name", "name")
        .allow("createdAt", "created_at")
        .allow("updatedAt", "updated_at")
        .default_sort(SortParam::desc("createdAt"))
        .tie_breaker(TieBreaker::new("createdAt", "id"))
        .text_searchable("name")
        .text_searchable("email")
        .text_searchable("phone")
        .build()
}

impl SortableRow for Client {
    fn column_value(&self, column: &str) -> Option<CursorValue> {
        match column {
            "id" => Some(self.id.into()),
            "hub_id" => Some(self.hub_id.into()),
            "name" => Some(self.name.as_str().into()),
            "email" => self.email.as_deref().map(Into::into),
            "phone" => self.phone.as_deref().map(Into::into),
            "created_at" => Some(self.created_at.into()),
            "updated_at" => Some(self.updated_at.into()),
            _ => None,
        }
    }
}

/// Clients of one hub as a [`QueryableSource`].
pub struct DieselClientSource<'a> {
    pool: &'a DbPool,
    hub_id: i32,
}

impl<'a> DieselClientSource<'a> {
    pub fn new(pool: &'a DbPool, hub_id: i32) -> Self {
        Self { pool, hub_id }
    }
}

fn compare(
    column: &str,
    op: ColumnOp,
    value: &CursorValue,
) -> RepositoryResult<Predicate<clients::table>> {
    let predicate = match (column, value) {
        ("id", CursorValue::Int(id)) => {
            let id = int_column_value(TABLE, column, *id)?;
            compare_column!(clients::table, clients::id, op, id)
        }
        ("name", CursorValue::Text(name)) => {
            compare_column!(clients::table, clients::name, op, name.clone())
        }
        ("created_at", CursorValue::Timestamp(at)) => {
            compare_column!(clients::table, clients::created_at, op, *at)
        }
        ("updated_at", CursorValue::Timestamp(at)) => {
            compare_column!(clients::table, clients::updated_at, op, *at)
        }
        ("id" | "name" | "created_at" | "updated_at", _) => {
            return Err(mismatched_value(TABLE, column, value));
        }
        _ => return Err(unknown_column(TABLE, column)),
    };
    Ok(predicate)
}

fn like(column: &str, pattern: String) -> RepositoryResult<Predicate<clients::table>> {
    match column {
        "name" => Ok(Box::new(clients::name.like(pattern).escape('\\'))),
        "email" => Ok(Box::new(clients::email.assume_not_null().like(pattern).escape('\\'))),
        "phone" => Ok(Box::new(clients::phone.assume_not_null().like(pattern).escape('\\'))),
        _ => Err(unknown_column(TABLE, column)),
    }
}

/// Clients of `hub_id` matching the plan's text filter.
fn filtered_clients(
    hub_id: i32,
    plan: &QueryPlan,
) -> RepositoryResult<clients::BoxedQuery<'static, Sqlite>> {
    let mut query = clients::table.filter(clients::hub_id.eq(hub_id)).into_boxed();

    let text = match &plan.filter {
        Some(filter) => text_predicate(filter, like)?,
        None => None,
    };
    if let Some(text) = text {
        query = query.filter(text);
    }

    Ok(query)
}

/// Page query: filter, keyset, ordering and window of the plan.
fn client_page_query(
    hub_id: i32,
    plan: &QueryPlan,
) -> RepositoryResult<clients::BoxedQuery<'static, Sqlite>> {
    let mut query = filtered_clients(hub_id, plan)?;

    let after = match &plan.keyset {
        Some(keyset) => keyset_predicate(keyset, compare)?,
        None => None,
    };
    if let Some(after) = after {
        query = query.filter(after);
    }

    for order in &plan.order {
        query = match order.column.as_str() {
            "id" => then_order_by!(query, clients::id, order.direction),
            "name" => then_order_by!(query, clients::name, order.direction),
            "created_at" => then_order_by!(query, clients::created_at, order.direction),
            "updated_at" => then_order_by!(query, clients::updated_at, order.direction),
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

impl QueryableSource for DieselClientSource<'_> {
    type Row = Client;

    fn fetch(&self, plan: &QueryPlan) -> RepositoryResult<Vec<Client>> {
        use crate::models::client::Client as DbClient;

        let query = client_page_query(self.hub_id, plan)?;
        let mut conn = get_connection(self.pool)?;

        let items = query
            .load::<DbClient>(&mut conn)?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(items)
    }

    fn count(&self, plan: &QueryPlan) -> RepositoryResult<usize> {
        let query = filtered_clients(self.hub_id, plan)?;
        let mut conn = get_connection(self.pool)?;

        let total = query.count().get_result::<i64>(&mut conn)?;

        Ok(usize::try_from(total).unwrap_or_default())
    }
}

impl ClientWriter for DieselRepository {
    fn create_clients(&self, new_clients: &[NewClient]) -> RepositoryResult<usize> {
        use crate::models::client::NewClient as DbNewClient;

        let mut conn = get_connection(self.pool())?;
        let insertables: Vec<DbNewClient> = new_clients.iter().map(Into::into).collect();
        let affected = diesel::insert_into(clients::table)
            .values(&insertables)
            .execute(&mut conn)?;

        Ok(affected)
    }
}
