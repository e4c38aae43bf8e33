//! Lists the source images of an organization.
//!
//! Run with: `ROKKA_API_KEY=... cargo run --example list_images -- <organization>`
//!
//! Set `RUST_LOG=rokka=debug` to see each request and retry.

use rokka::{Client, Config, Error};
use std::collections::HashMap;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let organization = std::env::args().nth(1).unwrap_or_else(|| "demo".to_string());

    let config = Config::builder()
        .api_key(std::env::var("ROKKA_API_KEY").unwrap_or_default())
        .verbose(true)
        .build()?;
    let client = Client::new(config).auto_retry();

    match client.valid_api_key().await {
        Ok(true) => {}
        Ok(false) => {
            eprintln!("The API key was rejected");
            return Ok(());
        }
        Err(Error::MissingApiKey) => {
            eprintln!("Set ROKKA_API_KEY to run this example");
            return Ok(());
        }
        Err(e) => return Err(e),
    }

    let query = HashMap::from([("limit".to_string(), "20".to_string())]);
    match client.list_source_images(&organization, Some(&query)).await {
        Ok(listing) => {
            println!("{} images in {}", listing.total, organization);
            for image in &listing.items {
                println!(
                    "{}  {:>5}x{:<5} {:>10} bytes  {}",
                    image.short_hash, image.width, image.height, image.size, image.name
                );
            }
            if let Some(cursor) = listing.cursor {
                println!("next page: cursor={}", cursor);
            }
        }
        Err(Error::Status(e)) => {
            eprintln!("{}", e);
            if let Some(api_error) = e.api_error {
                eprintln!("API error code {}: {}", api_error.code, api_error.message);
            }
        }
        Err(e) => return Err(e),
    }

    Ok(())
}
