//! Shared helpers for the storage-backed integration tests.
//!
//! Every test gets its own database, cloned from a migrated template on an
//! embedded PostgreSQL cluster (`pg-embed-setup-unpriv`). A cluster that
//! cannot be started fails the test.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::thread;

use diesel_async::RunQueryDsl;
use pg_embedded_setup_unpriv::test_support::{hash_directory, shared_cluster_handle};
use pg_embedded_setup_unpriv::{ClusterHandle, TemporaryDatabase};
use roster_service::models::{NewHardware, NewUser};
use roster_service::schema::{hardware, users};
use roster_service::{build_pool, run_migrations, DbPool, RosterQueries};
use rstest::fixture;
use shared::Hardware;
use uuid::Uuid;

static TEMPLATE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const TEMPLATE_NAME_PREFIX: &str = "roster_template";
const POOL_SIZE: u32 = 6;

/// A pool onto a scratch database that is dropped with the value.
pub struct TestDb {
    pub pool: DbPool,
    _database: ScratchDatabase,
}

struct ScratchDatabase(Option<TemporaryDatabase>);

impl Drop for ScratchDatabase {
    fn drop(&mut self) {
        // teardown talks to the cluster synchronously; keep it off the test runtime
        if let Some(database) = self.0.take() {
            let _ = thread::spawn(move || drop(database)).join();
        }
    }
}

#[fixture]
pub async fn test_db() -> TestDb {
    let database = thread::spawn(provision_database)
        .join()
        .expect("database setup thread")
        .unwrap_or_else(|reason| panic!("embedded PostgreSQL setup failed: {reason}"));

    let pool = build_pool(database.url(), POOL_SIZE)
        .await
        .expect("pool builds");

    TestDb {
        pool,
        _database: ScratchDatabase(Some(database)),
    }
}

fn template_database_name() -> Result<String, String> {
    let migrations = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations");
    let hash = hash_directory(migrations).map_err(|err| format!("hash migrations: {err}"))?;
    let short_hash = hash.get(..8).unwrap_or(&hash);
    Ok(format!("{TEMPLATE_NAME_PREFIX}_{short_hash}"))
}

/// Creates the template on first use and runs the service's migrations on it.
fn ensure_template_database(cluster: &ClusterHandle) -> Result<String, String> {
    let template_name = template_database_name()?;
    let _lock = TEMPLATE_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|err| err.into_inner());

    let exists = cluster
        .database_exists(template_name.as_str())
        .map_err(|err| format!("template check: {err:?}"))?;

    if !exists {
        cluster
            .create_database(template_name.as_str())
            .map_err(|err| format!("create template: {err:?}"))?;

        let url = cluster.connection().database_url(&template_name);
        run_migrations(&url).map_err(|err| format!("migrate template: {err:#}"))?;
    }

    Ok(template_name)
}

fn provision_database() -> Result<TemporaryDatabase, String> {
    let cluster = shared_cluster_handle().map_err(|err| format!("start cluster: {err:?}"))?;
    let template_name = ensure_template_database(cluster)?;
    let db_name = format!("roster_test_{}", Uuid::new_v4().simple());

    cluster
        .temporary_database_from_template(db_name.as_str(), template_name.as_str())
        .map_err(|err| format!("create database from template: {err:?}"))
}

pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

pub async fn create_user(pool: &DbPool, name: &str) -> i32 {
    let mut conn = pool.get().await.expect("connection");
    let email = format!("{name}@example.com");
    diesel::insert_into(users::table)
        .values(&NewUser {
            name,
            company: Some("Acme"),
            email: &email,
            phone: "555-0100",
        })
        .returning(users::id)
        .get_result(&mut conn)
        .await
        .expect("user inserted")
}

pub async fn create_hardware(pool: &DbPool, total: i32) -> i32 {
    let mut conn = pool.get().await.expect("connection");
    let name = unique("board");
    diesel::insert_into(hardware::table)
        .values(&NewHardware {
            name: &name,
            total_quantity: total,
            available_quantity: total,
        })
        .returning(hardware::id)
        .get_result(&mut conn)
        .await
        .expect("hardware inserted")
}

pub async fn hardware_state(pool: &DbPool, hardware_id: i32) -> Hardware {
    RosterQueries::new(pool.clone())
        .get_hardware(hardware_id)
        .await
        .expect("hardware read")
        .expect("hardware exists")
}

pub fn owned_by(item: &Hardware, user_id: i32) -> Option<i32> {
    item.owners
        .iter()
        .find(|o| o.user_id == user_id)
        .map(|o| o.owned_quantity)
}

/// Owned quantities plus shelf stock add up to the item's total.
pub fn is_balanced(item: &Hardware) -> bool {
    let owned: i64 = item.owners.iter().map(|o| i64::from(o.owned_quantity)).sum();
    owned + i64::from(item.available_quantity) == i64::from(item.total_quantity)
}
