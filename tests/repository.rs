use std::collections::HashSet;

use pushkind_admin::domain::client::{Client, NewClient};
use pushkind_admin::domain::manager::NewManager;
use pushkind_admin::repository::client::client_search_options;
use pushkind_admin::repository::manager::manager_search_options;
use pushkind_admin::repository::{ClientWriter, DieselRepository, ManagerWriter};
use pushkind_admin::search::SearchParams;
use pushkind_admin::search::engine::SearchEngine;
use pushkind_admin::search::errors::SearchError;
use pushkind_admin::search::params::{PaginationInput, PaginationMode, PaginationParams};
use pushkind_admin::search::sort::{AllowlistSortResolver, SortParam};

mod common;

/// 25 clients in hub 1 whose creation times collide in pairs, plus 3 in hub 2.
fn seed_clients(repo: &DieselRepository) {
    let hub_one: Vec<NewClient> = (0..25)
        .map(|i| {
            let email = (i % 5 == 0).then(|| format!("vip{i}@example.com"));
            NewClient::new(1, format!("Client {i:02}"), email, None)
                .created_at(common::timestamp(i / 2))
        })
        .collect();
    assert_eq!(repo.create_clients(&hub_one).unwrap(), 25);

    let hub_two: Vec<NewClient> = (0..3)
        .map(|i| {
            NewClient::new(2, format!("Other {i}"), None, None).created_at(common::timestamp(i))
        })
        .collect();
    assert_eq!(repo.create_clients(&hub_two).unwrap(), 3);
}

fn cursor_input(limit: usize, after: Option<String>, sorts: Vec<SortParam>) -> PaginationInput {
    PaginationInput {
        mode: Some(PaginationMode::Cursor),
        limit: Some(limit),
        after,
        sorts,
        ..Default::default()
    }
}

fn all_clients(repo: &DieselRepository, hub_id: i32) -> Vec<Client> {
    let options = client_search_options().unwrap();
    let engine = SearchEngine::new(AllowlistSortResolver, common::signer(), repo.clients(hub_id));
    let input = PaginationInput {
        page_size: Some(100),
        ..Default::default()
    };
    let params = SearchParams::new(PaginationParams::normalize(input, options.default_sorts()));
    engine.search(params, &options).unwrap().items
}

#[test]
fn test_cursor_pages_cover_every_client_once_in_order() {
    let test_db = common::TestDb::new("test_cursor_pages.db");
    let repo = DieselRepository::new(test_db.pool());
    seed_clients(&repo);

    let options = client_search_options().unwrap();
    let engine = SearchEngine::new(AllowlistSortResolver, common::signer(), repo.clients(1));

    let mut after = None;
    let mut pages = Vec::new();
    let mut seen = Vec::new();
    loop {
        let input = cursor_input(10, after.take(), vec![]);
        let params = SearchParams::new(PaginationParams::normalize(input, options.default_sorts()));
        let page = engine.search(params, &options).unwrap();
        let info = page.page_info.clone().unwrap();

        pages.push((page.items.len(), info.has_next));
        seen.extend(page.items.iter().map(|c| (c.created_at, c.id)));

        match info.next_cursor {
            Some(cursor) => after = Some(cursor),
            None => break,
        }
    }

    assert_eq!(pages, vec![(10, true), (10, true), (5, false)]);

    let mut expected: Vec<_> = all_clients(&repo, 1)
        .into_iter()
        .map(|c| (c.created_at, c.id))
        .collect();
    expected.sort_by(|a, b| b.cmp(a));
    assert_eq!(seen, expected);

    let unique: HashSet<_> = seen.iter().map(|(_, id)| *id).collect();
    assert_eq!(unique.len(), 25);
}

#[test]
fn test_offset_pages_report_total_per_hub() {
    let test_db = common::TestDb::new("test_offset_pages.db");
    let repo = DieselRepository::new(test_db.pool());
    seed_clients(&repo);

    let options = client_search_options().unwrap();
    let engine = SearchEngine::new(AllowlistSortResolver, common::signer(), repo.clients(1));

    let input = PaginationInput {
        page: Some(3),
        page_size: Some(10),
        with_total: Some(true),
        ..Default::default()
    };
    let params = SearchParams::new(PaginationParams::normalize(input, options.default_sorts()));
    let page = engine.search(params, &options).unwrap();

    assert_eq!(page.total, Some(25));
    assert_eq!(page.page, Some(3));
    assert_eq!(page.items.len(), 5);
    assert!(page.page_info.is_none());
    assert!(page.items.iter().all(|c| c.hub_id == 1));

    assert_eq!(all_clients(&repo, 2).len(), 3);
}

#[test]
fn test_text_query_filters_rows_and_total() {
    let test_db = common::TestDb::new("test_text_query.db");
    let repo = DieselRepository::new(test_db.pool());
    seed_clients(&repo);

    let options = client_search_options().unwrap();
    let engine = SearchEngine::new(AllowlistSortResolver, common::signer(), repo.clients(1));

    let input = PaginationInput {
        with_total: Some(true),
        ..Default::default()
    };
    let params = SearchParams::new(PaginationParams::normalize(input, options.default_sorts()))
        .query(Some("VIP"));
    let page = engine.search(params, &options).unwrap();

    assert_eq!(page.total, Some(5));
    assert_eq!(page.items.len(), 5);
    assert!(
        page.items
            .iter()
            .all(|c| c.email.as_deref().is_some_and(|e| e.starts_with("vip")))
    );
}

#[test]
fn test_like_wildcards_are_matched_literally() {
    let test_db = common::TestDb::new("test_like_wildcards.db");
    let repo = DieselRepository::new(test_db.pool());
    repo.create_clients(&[
        NewClient::new(3, "100% Juice".into(), None, None),
        NewClient::new(3, "Apple_Pie".into(), None, None),
        NewClient::new(3, "Banana".into(), None, None),
    ])
    .unwrap();

    let options = client_search_options().unwrap();
    let engine = SearchEngine::new(AllowlistSortResolver, common::signer(), repo.clients(3));
    let search = |query: &str| {
        let params = SearchParams::new(PaginationParams::normalize(
            PaginationInput::default(),
            options.default_sorts(),
        ))
        .query(Some(query));
        engine
            .search(params, &options)
            .unwrap()
            .items
            .into_iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
    };

    assert_eq!(search("%"), vec!["100% Juice".to_string()]);
    assert_eq!(search("_"), vec!["Apple_Pie".to_string()]);
    assert_eq!(search("juice"), vec!["100% Juice".to_string()]);
}

#[test]
fn test_text_query_folds_ascii_case_only() {
    let test_db = common::TestDb::new("test_text_case_folding.db");
    let repo = DieselRepository::new(test_db.pool());
    repo.create_clients(&[
        NewClient::new(4, "ACME Corp".into(), None, None),
        NewClient::new(4, "Ärzte GmbH".into(), None, None),
    ])
    .unwrap();

    let options = client_search_options().unwrap();
    let engine = SearchEngine::new(AllowlistSortResolver, common::signer(), repo.clients(4));
    let total = |query: &str| {
        let input = PaginationInput {
            with_total: Some(true),
            ..Default::default()
        };
        let params = SearchParams::new(PaginationParams::normalize(input, options.default_sorts()))
            .query(Some(query));
        engine.search(params, &options).unwrap().total
    };

    assert_eq!(total("acme"), Some(1));
    assert_eq!(total("Ärzte"), Some(1));
    assert_eq!(total("ärzte"), Some(0));
}

#[test]
fn test_cursor_from_other_sort_is_rejected() {
    let test_db = common::TestDb::new("test_cursor_other_sort.db");
    let repo = DieselRepository::new(test_db.pool());
    seed_clients(&repo);

    let options = client_search_options().unwrap();
    let engine = SearchEngine::new(AllowlistSortResolver, common::signer(), repo.clients(1));

    let first = SearchParams::new(PaginationParams::normalize(
        cursor_input(5, None, vec![]),
        options.default_sorts(),
    ));
    let cursor = engine
        .search(first, &options)
        .unwrap()
        .page_info
        .and_then(|info| info.next_cursor)
        .unwrap();

    let resumed = SearchParams::new(PaginationParams::normalize(
        cursor_input(5, Some(cursor), vec![SortParam::asc("name")]),
        options.default_sorts(),
    ));
    let err = engine.search(resumed, &options).unwrap_err();
    assert!(matches!(err, SearchError::InvalidCursor(_)));
}

#[test]
fn test_managers_page_by_name_with_id_tie_breaker() {
    let test_db = common::TestDb::new("test_managers_pages.db");
    let repo = DieselRepository::new(test_db.pool());

    let names = ["Carol", "alice", "Bob", "Bob", "Dave"];
    let created: Vec<_> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            repo.create_manager(&NewManager::new(
                1,
                (*name).to_string(),
                format!("m{i}@example.com"),
            ))
            .unwrap()
        })
        .collect();
    assert!(created.iter().all(|m| m.id > 0 && m.hub_id == 1));

    let options = manager_search_options().unwrap();
    let engine = SearchEngine::new(AllowlistSortResolver, common::signer(), repo.managers(1));

    let mut after = None;
    let mut seen = Vec::new();
    loop {
        let params = SearchParams::new(PaginationParams::normalize(
            cursor_input(2, after.take(), vec![]),
            options.default_sorts(),
        ));
        let page = engine.search(params, &options).unwrap();
        seen.extend(page.items.into_iter().map(|m| (m.name, m.id)));
        match page.page_info.and_then(|info| info.next_cursor) {
            Some(cursor) => after = Some(cursor),
            None => break,
        }
    }

    let mut expected: Vec<_> = created.into_iter().map(|m| (m.name, m.id)).collect();
    // SQLite compares TEXT with BINARY collation by default.
    expected.sort();
    assert_eq!(seen, expected);
}
