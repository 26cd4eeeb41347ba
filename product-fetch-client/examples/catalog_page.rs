use product_fetch_client::{endpoint, FetchConfig, ProductFetchClient};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    let config_path = std::env::args().nth(1);
    let config = FetchConfig::load(config_path.as_deref().map(Path::new))?;
    let client = ProductFetchClient::from_config(&config)?;

    let endpoints = vec![
        endpoint::listing("/api/monuments", "single"),
        endpoint::listing("/api/fences", "granite"),
    ];

    // Two widgets on the same page asking for overlapping listings
    println!("=== First page load ===");
    let mut slider = client.use_products_cache(&endpoints);
    let mut grid = client.use_products_cache(&endpoints[..1]);
    let slider_state = slider.loaded().await;
    let grid_state = grid.loaded().await;
    println!("Slider: {} products", slider_state.products.len());
    println!("Grid: {} products", grid_state.products.len());
    println!("Fetch stats: {:?}", client.fetch_stats());

    // A later widget is served from cache
    println!("\n=== Second widget ===");
    let start = std::time::Instant::now();
    let products = client.fetch_all(&endpoints).await;
    println!("Cached fetch of {} products took {:?}", products.len(), start.elapsed());

    let complex: Vec<_> = products
        .iter()
        .filter(|p| p.category() == Some("complex"))
        .collect();
    println!("Complex monuments: {}", complex.len());

    println!("\nCache stats: {:?}", client.cache_stats());
    println!("Fetch stats: {:?}", client.fetch_stats());

    Ok(())
}
