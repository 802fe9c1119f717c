use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pve_mock_server::{MockConfig, MockState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pve_mock_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "8006".to_string());
    let addr = format!("127.0.0.1:{port}");

    let mut config = MockConfig::default();
    if let Ok(password) = std::env::var("PVE_MOCK_PASSWORD") {
        config.password = password;
    }
    if let Ok(polls) = std::env::var("PVE_MOCK_RUNNING_POLLS") {
        config.running_polls = polls.parse()?;
    }

    let listener = TcpListener::bind(&addr).await?;
    info!("PVE 模拟服务监听: http://{}/api2/json (用户 {})", addr, config.userid);

    pve_mock_server::run(listener, Arc::new(MockState::new(config))).await?;
    Ok(())
}
