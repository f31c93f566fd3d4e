//! Binary entrypoint for the skyline API server.
use skyline_api::run;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Default listen address can be overridden with SKYLINE_ADDR
    let addr = std::env::var("SKYLINE_ADDR").unwrap_or_else(|_| "0.0.0.0:8790".to_string());
    run(&addr).await;
}
