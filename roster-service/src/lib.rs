pub mod api;
pub mod db;
pub mod error;
pub mod guards;
pub mod ledger;
pub mod models;
pub mod profiles;
pub mod queries;
pub mod schema;
pub mod seed;

pub use api::{create_router, AppState};
pub use db::{build_pool, run_migrations, DbPool};
pub use error::ServiceError;
pub use ledger::HardwareLedger;
pub use profiles::UserService;
pub use queries::RosterQueries;
