mod cli;
mod infra;
mod offline;
mod routes;
mod server;

use cellscan::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
