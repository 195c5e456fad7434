mod cli;
mod demo;
mod hashing;
mod infra;
pub mod routes;
mod server;

use valuation_engine::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
