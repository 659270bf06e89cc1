#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use diesel::{Connection, SqliteConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use pushkind_admin::db::{DbPool, establish_connection_pool};
use pushkind_admin::search::cursor::{CursorSecret, HmacCursorSigner};
use tempfile::TempDir;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

/// Migrated SQLite database living in a temporary directory.
pub struct TestDb {
    pool: DbPool,
    _dir: TempDir,
}

impl TestDb {
    pub fn new(name: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join(name);
        let url = path.to_str().expect("utf-8 path").to_string();

        let mut conn = SqliteConnection::establish(&url).expect("open test database");
        conn.run_pending_migrations(MIGRATIONS)
            .expect("run migrations");
        drop(conn);

        let pool = establish_connection_pool(&url).expect("create pool");
        Self { pool, _dir: dir }
    }

    pub fn pool(&self) -> DbPool {
        self.pool.clone()
    }
}

pub fn signer() -> HmacCursorSigner {
    HmacCursorSigner::new(&CursorSecret::new("integration-secret")).expect("signer")
}

/// `2024-01-01 00:00:00` shifted by `seconds`.
pub fn timestamp(seconds: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid date")
        + TimeDelta::seconds(seconds)
}
