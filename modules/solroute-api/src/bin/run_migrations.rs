//! Applies pending SQLx migrations and exits.
//!
//! Migrations are embedded at compile time. Run this before starting the
//! server when migrations should not happen on boot.

use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;

    println!("Running database migrations...");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;

    sqlx::migrate!("../../migrations").run(&pool).await?;
    pool.close().await;

    println!("Migrations completed successfully.");

    Ok(())
}
