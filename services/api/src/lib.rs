mod cli;
mod demo;
mod infra;
mod routes;
mod server;

use elo_cultura::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
