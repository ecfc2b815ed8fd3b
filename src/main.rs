use std::sync::Arc;

use pagestage::apply::config::ApplyConfig;
use pagestage::apply::http::HttpApplyClient;
use pagestage::{routes, state};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .expect("invalid PORT");

    let config = ApplyConfig::from_env().expect("apply config");
    let applier = HttpApplyClient::new(config.base_url.clone(), config.timeouts).expect("apply client init failed");
    tracing::info!(
        base_url = %config.base_url,
        partial_failure = config.partial_failure.as_str(),
        "apply client initialized"
    );

    let state = state::AppState::new(Arc::new(applier), config.partial_failure);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "pagestage listening");
    axum::serve(listener, app).await.expect("server failed");
}
