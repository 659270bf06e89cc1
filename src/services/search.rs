//! Service layer turning API search requests into engine calls.

use validator::Validate;

use crate::dto::api::SearchRequest;
use crate::models::config::ServerConfig;
use crate::repository::client::client_search_options;
use crate::repository::manager::manager_search_options;
use crate::search::cursor::CursorSigner;
use crate::search::engine::{QueryableSource, SearchEngine};
use crate::search::errors::SearchError;
use crate::search::params::{DEFAULT_PAGE_SIZE, PaginationParams};
use crate::search::sort::AllowlistSortResolver;
use crate::search::{SearchOptions, SearchOptionsError, SearchParams, SearchResult};
use crate::services::ServiceResult;

/// Server-side limits applied to client supplied page sizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageBounds {
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for PageBounds {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: 100,
        }
    }
}

impl From<&ServerConfig> for PageBounds {
    fn from(config: &ServerConfig) -> Self {
        Self {
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
        }
    }
}

impl PageBounds {
    /// Clamps `pageSize` or `limit` into `1..=max_page_size`.
    pub fn clamp(&self, params: PaginationParams) -> PaginationParams {
        let max = self.max_page_size.max(1);
        match params {
            PaginationParams::Offset(mut offset) => {
                offset.page_size = offset.page_size.clamp(1, max);
                PaginationParams::Offset(offset)
            }
            PaginationParams::Cursor(mut cursor) => {
                cursor.limit = cursor.limit.clamp(1, max);
                PaginationParams::Cursor(cursor)
            }
        }
    }
}

/// Search options of every listable entity, built once at startup.
#[derive(Clone, Debug)]
pub struct SearchCatalog {
    pub clients: SearchOptions,
    pub managers: SearchOptions,
}

impl SearchCatalog {
    pub fn new() -> Result<Self, SearchOptionsError> {
        Ok(Self {
            clients: client_search_options()?,
            managers: manager_search_options()?,
        })
    }
}

/// Validates `request` and runs one page of `source` through the engine.
///
/// Sort fields outside the allowlist fail the request instead of being
/// silently dropped.
pub fn search<Q, C>(
    source: Q,
    signer: C,
    options: &SearchOptions,
    bounds: PageBounds,
    request: SearchRequest,
) -> ServiceResult<SearchResult<Q::Row>>
where
    Q: QueryableSource,
    C: CursorSigner,
{
    request.validate()?;

    if let Some(sort) = request
        .pagination
        .sorts
        .iter()
        .find(|sort| options.column_for(&sort.field).is_none())
    {
        return Err(SearchError::DisallowedSortField(sort.field.clone()).into());
    }

    let pagination = bounds.clamp(PaginationParams::normalize_with(
        request.pagination,
        options.default_sorts(),
        bounds.default_page_size,
    ));
    let params = SearchParams::new(pagination).query(request.query);

    let engine = SearchEngine::new(AllowlistSortResolver, signer, source);
    engine.search(params, options).map_err(|err| {
        if err.is_client_error() {
            log::debug!("Rejected search request: {err}");
        } else {
            log::error!("Failed to search: {err}");
        }
        err.into()
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::client::Client;
    use crate::domain::manager::Manager;
    use crate::repository::errors::RepositoryError;
    use crate::repository::mock::{MockClientSource, MockManagerSource};
    use crate::search::cursor::{CursorSecret, HmacCursorSigner};
    use crate::search::params::{CursorParams, OffsetParams, PaginationInput, PaginationMode};
    use crate::search::sort::{SortDirection, SortParam};
    use crate::services::ServiceError;

    fn signer() -> HmacCursorSigner {
        HmacCursorSigner::new(&CursorSecret::new("service-secret")).expect("signer")
    }

    fn client(id: i32) -> Client {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, id as u32))
            .expect("valid timestamp");
        Client {
            id,
            hub_id: 1,
            name: format!("Client {id}"),
            created_at: ts,
            updated_at: ts,
            ..Default::default()
        }
    }

    fn cursor_request(limit: usize) -> SearchRequest {
        SearchRequest {
            pagination: PaginationInput {
                mode: Some(PaginationMode::Cursor),
                limit: Some(limit),
                ..Default::default()
            },
            query: None,
        }
    }

    #[test]
    fn clamp_limits_page_sizes() {
        let bounds = PageBounds {
            default_page_size: 20,
            max_page_size: 50,
        };

        let clamped = bounds.clamp(PaginationParams::Cursor(CursorParams {
            limit: 500,
            after: None,
            sorts: vec![],
        }));
        assert!(matches!(clamped, PaginationParams::Cursor(c) if c.limit == 50));

        let clamped = bounds.clamp(PaginationParams::Offset(OffsetParams {
            page: 3,
            page_size: 10,
            sorts: vec![],
            with_total: false,
        }));
        assert!(matches!(clamped, PaginationParams::Offset(o) if o.page_size == 10 && o.page == 3));
    }

    #[test]
    fn catalog_builds() {
        let catalog = SearchCatalog::new().expect("catalog");
        assert_eq!(catalog.clients.column_for("updatedAt"), Some("updated_at"));
        assert_eq!(catalog.managers.column_for("email"), Some("email"));
    }

    #[test]
    fn cursor_search_fetches_limit_plus_one_in_tie_broken_order() {
        let catalog = SearchCatalog::new().expect("catalog");
        let mut source = MockClientSource::new();
        source
            .expect_fetch()
            .withf(|plan| {
                plan.limit == Some(3)
                    && plan.keyset.is_none()
                    && plan
                        .order
                        .iter()
                        .map(|o| (o.column.as_str(), o.direction))
                        .eq([
                            ("created_at", SortDirection::Desc),
                            ("id", SortDirection::Desc),
                        ])
            })
            .times(1)
            .returning(|_| Ok(vec![client(3), client(2), client(1)]));
        source.expect_count().never();

        let page = search(
            &source,
            signer(),
            &catalog.clients,
            PageBounds::default(),
            cursor_request(2),
        )
        .expect("page");

        assert_eq!(page.items.len(), 2);
        let info = page.page_info.expect("cursor metadata");
        assert!(info.has_next);
        assert!(info.next_cursor.is_some());
    }

    #[test]
    fn limit_is_clamped_before_fetching() {
        let catalog = SearchCatalog::new().expect("catalog");
        let mut source = MockManagerSource::new();
        source
            .expect_fetch()
            .withf(|plan| plan.limit == Some(6))
            .times(1)
            .returning(|_| Ok(Vec::<Manager>::new()));

        let bounds = PageBounds {
            default_page_size: 2,
            max_page_size: 5,
        };
        let page = search(
            &source,
            signer(),
            &catalog.managers,
            bounds,
            cursor_request(1000),
        )
        .expect("page");

        assert!(page.items.is_empty());
        assert_eq!(page.page_info.map(|i| i.has_next), Some(false));
    }

    #[test]
    fn offset_search_with_total_counts_under_filter() {
        let catalog = SearchCatalog::new().expect("catalog");
        let mut source = MockClientSource::new();
        source
            .expect_count()
            .withf(|plan| {
                plan.keyset.is_none()
                    && plan.limit.is_none()
                    && plan.filter.as_ref().map(|f| f.term.as_str()) == Some("acme")
            })
            .times(1)
            .returning(|_| Ok(42));
        source
            .expect_fetch()
            .withf(|plan| plan.offset == Some(10) && plan.limit == Some(10))
            .times(1)
            .returning(|_| Ok(vec![client(1)]));

        let request = SearchRequest {
            pagination: PaginationInput {
                page: Some(2),
                page_size: Some(10),
                with_total: Some(true),
                ..Default::default()
            },
            query: Some("  acme ".into()),
        };
        let page = search(
            &source,
            signer(),
            &catalog.clients,
            PageBounds::default(),
            request,
        )
        .expect("page");

        assert_eq!(page.total, Some(42));
        assert_eq!(page.page, Some(2));
        assert_eq!(page.page_size, Some(10));
        assert!(page.page_info.is_none());
    }

    #[test]
    fn disallowed_sort_field_is_rejected_before_querying() {
        let catalog = SearchCatalog::new().expect("catalog");
        let mut source = MockClientSource::new();
        source.expect_fetch().never();

        let request = SearchRequest {
            pagination: PaginationInput {
                sorts: vec![SortParam::asc("password")],
                ..Default::default()
            },
            query: None,
        };
        let err = search(
            &source,
            signer(),
            &catalog.clients,
            PageBounds::default(),
            request,
        )
        .expect_err("disallowed sort");

        assert_eq!(err.code(), "INVALID_SORT_FIELD");
        assert!(err.is_client_error());
    }

    #[test]
    fn invalid_request_is_a_validation_error() {
        let catalog = SearchCatalog::new().expect("catalog");
        let source = MockClientSource::new();

        let request = SearchRequest {
            pagination: PaginationInput::default(),
            query: Some("q".repeat(500)),
        };
        let err = search(
            &source,
            signer(),
            &catalog.clients,
            PageBounds::default(),
            request,
        )
        .expect_err("too long query");

        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn tampered_cursor_is_invalid_cursor() {
        let catalog = SearchCatalog::new().expect("catalog");
        let mut source = MockClientSource::new();
        source.expect_fetch().never();

        let mut request = cursor_request(5);
        request.pagination.after = Some("bm90LWEtY3Vyc29y".into());
        let err = search(
            &source,
            signer(),
            &catalog.clients,
            PageBounds::default(),
            request,
        )
        .expect_err("tampered cursor");

        assert_eq!(err.code(), "INVALID_CURSOR");
    }

    #[test]
    fn repository_failure_is_a_server_error() {
        let catalog = SearchCatalog::new().expect("catalog");
        let mut source = MockClientSource::new();
        source
            .expect_fetch()
            .returning(|_| Err(RepositoryError::ConnectionError("pool closed".into())));

        let err = search(
            &source,
            signer(),
            &catalog.clients,
            PageBounds::default(),
            SearchRequest::default(),
        )
        .expect_err("failing source");

        assert_eq!(err.code(), "QUERY_FAILED");
        assert!(!err.is_client_error());
    }
}
