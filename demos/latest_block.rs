//! Latest block example for chainquery-rs.
//!
//! Fetches the newest block from the public Chainquery API, then looks up the
//! claims in it with a prepared statement.
//!
//! Note: This example requires network access. Pass a different server as the
//! first argument to use another endpoint. Set `RUST_LOG=debug` to see the
//! HTTP traffic.

use chainquery_rs::{Driver, Parameter, Value};
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let server = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://chainquery.lbry.com".to_string());

    println!("=== chainquery-rs Latest Block Example ===\n");

    // 1. Open the database
    let driver = Driver::new();
    println!(
        "1. Driver: {} v{} by {}",
        driver.name(),
        driver.version(),
        driver.vendor()
    );
    let database = driver.open(&server)?;
    let connection = database.connect().await?;
    println!("   Connected to {}\n", connection.server());

    // 2. SELECT * takes its columns from the returned row
    println!("2. Fetching the latest block...");
    let mut rows = connection
        .query("SELECT * FROM block ORDER BY height DESC LIMIT 1", &[])
        .await?;

    let Some(block) = rows.next_row().transpose()? else {
        println!("   No blocks returned");
        return Ok(());
    };
    for (column, value) in block.columns().iter().zip(block.values()) {
        println!("   {column:<24} {value}");
    }
    println!();

    // 3. Prepared statement with a bound parameter
    let height = block.get("height").and_then(Value::as_i64).unwrap_or_default();
    println!("3. Claims created at height {height}...");
    let stmt = connection.prepare(
        "SELECT claim_id, name, is_nsfw, created_at FROM claim WHERE height = ? LIMIT 10",
    )?;
    let claims = connection
        .query_prepared(&stmt, &[Parameter::Int(height)])
        .await?;

    println!("   {} claim(s)", claims.len());
    for claim in claims {
        let claim = claim?;
        println!(
            "   {} {} nsfw={} created={}",
            claim.get("claim_id").map(ToString::to_string).unwrap_or_default(),
            claim.get("name").map(ToString::to_string).unwrap_or_default(),
            claim.get("is_nsfw").map(ToString::to_string).unwrap_or_default(),
            claim.get("created_at").map(ToString::to_string).unwrap_or_default(),
        );
    }

    connection.close();
    println!("\n=== Done ===");
    Ok(())
}
