use anyhow::Result;
use env_logger::Env;
use log::info;

use ireina_indicators::{app_router, build_state, Config};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    let listen_addr = config.listen_addr;
    let state = build_state(config).await?;

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!("Listening on {}", listen_addr);
    axum::serve(listener, app_router(state)).await?;
    Ok(())
}
