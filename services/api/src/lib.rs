mod cli;
mod demo;
mod export;
mod infra;
mod routes;
mod server;

use campus_housing::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
