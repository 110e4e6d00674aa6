use authentik_provider::{init_logging, serve, AuthentikProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting authentik provider");
    serve(AuthentikProvider::new()).await?;
    Ok(())
}
