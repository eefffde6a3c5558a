mod cli;
pub mod infra;
mod routes;
mod server;

use forecourt::error::AppError;

pub use server::api_router;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
