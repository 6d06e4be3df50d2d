use hemmer_provider_instatus::{init_logging, serve, InstatusProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_logging();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Instatus provider");
    serve(InstatusProvider::new()).await
}
