use std::sync::Arc;

use rub_exchange::config::Config;
use rub_exchange::domain::services::Exchange;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(config.log_filter.clone()))
        .init();

    let exchange = Arc::new(Exchange::new());

    rub_exchange::api::serve(config.bind_addr, exchange).await?;

    Ok(())
}
