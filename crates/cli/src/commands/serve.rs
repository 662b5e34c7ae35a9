//! `blotter serve` — Start the HTTP gateway.

use crate::app::App;
use blotter_config::AppConfig;
use blotter_gateway::GatewayState;
use std::sync::Arc;

pub async fn run(mut config: AppConfig, port_override: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Blotter Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Ledger:    {}", config.ledger.csv_path);

    let gateway = config.gateway.clone();
    let app = App::build(config).await?;
    let state = Arc::new(GatewayState {
        dispatcher: app.dispatcher.clone(),
        events: app.events.clone(),
    });

    blotter_gateway::start(&gateway, state)
        .await
        .map_err(|e| anyhow::anyhow!("gateway failed: {e}"))?;
    Ok(())
}
