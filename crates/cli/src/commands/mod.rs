//! CLI subcommands.

pub mod admin;
pub mod backup;
pub mod migrate;

use mp_records_server::db::{PgStore, create_pool};
use secrecy::SecretString;

/// Read `DATABASE_URL` (after loading `.env`) and open a store on it.
///
/// # Errors
///
/// Returns an error if the variable is missing or the database is unreachable.
pub async fn connect() -> Result<PgStore, ConnectError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| ConnectError::MissingEnvVar("DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = create_pool(&SecretString::from(database_url)).await?;
    Ok(PgStore::new(pool))
}

/// Errors opening the database.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}
