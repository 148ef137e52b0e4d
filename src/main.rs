use rdreamer::{
    app::{self, DreamerApp},
    logger::{self, LoggerConfig},
    Controller, DreamerConfig, ImageStore, Listener, Txt2ImgClient,
};
use std::sync::Arc;
use tokio::sync::mpsc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_loaded = dotenv::dotenv().is_ok();

    let (config, warnings) = DreamerConfig::from_env();
    logger::init_with_config(LoggerConfig::from_settings(&config))?;
    for warning in &warnings {
        log::warn!("⚠️  {}", warning);
    }

    if env_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::debug!("No .env file found, using system environment variables");
    }
    log::info!("🚀 Starting rdreamer v{}", env!("CARGO_PKG_VERSION"));
    logger::log_config_info(&config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("rdreamer-worker")
        .build()?;

    let store = ImageStore::from_config(&config)?;
    log::info!("📁 Images go to {}", store.dir().display());
    let backend = Arc::new(Txt2ImgClient::from_config(&config)?);

    let (sender, inbox) = mpsc::unbounded_channel();
    let listener = Listener::spawn(
        runtime.handle(),
        config.socket_endpoint.clone(),
        config.socket_idle_reconnect,
        sender,
    );

    let controller = Controller::new(inbox, backend, runtime.handle().clone(), store)
        .with_settings(config.generation);
    let window = DreamerApp::new(controller, listener, config.poll_interval);

    if let Err(e) = app::run(&config, window) {
        log::error!("❌ {}", e);
        return Err(e.into());
    }

    runtime.shutdown_timeout(std::time::Duration::from_secs(1));
    log::info!("Bye");
    Ok(())
}
