mod cli;
mod infra;
mod routes;
mod score;
mod server;
mod stream;

use incident_watch::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
