//! Sink Node binary
//!
//! Runs one uwsink sink against a Redis coordination store.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uwsink_node::{Error, NodeConfig, SinkNode};
use uwsink_store::RedisStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sink_node=info,uwsink_node=info,uwsink_auth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Sink Node");

    let config = match NodeConfig::from_env().and_then(|c| c.validate().map(|()| c)) {
        Ok(config) => config,
        Err(Error::InvalidConfiguration(reason)) => {
            tracing::error!("Invalid configuration: {}", reason);
            std::process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };

    let store = RedisStore::connect(&config.redis_url, config.store_timeout)?;

    // Create and run node
    let node = SinkNode::new(config, Box::new(store)).await?;
    node.run().await?;

    Ok(())
}
