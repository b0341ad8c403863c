use std::io;

use mock_server::{MockConfig, MockState};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let defaults = MockConfig::default();
    let config = MockConfig {
        user_name: std::env::var("MOCK_USER").unwrap_or(defaults.user_name),
        api_key: std::env::var("MOCK_API_KEY").unwrap_or(defaults.api_key),
        fail_with_502: std::env::var("MOCK_FAIL_502")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        ..defaults
    };

    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    mock_server::run(listener, MockState::new(config)).await
}
