//! NextGCore NEF (Network Exposure Function)
//!
//! The NEF is a 5G core network function responsible for:
//! - Traffic influence requests from AFs, routed to the PCF or the UDR
//! - PFD management transactions from AFs, stored in the UDR
//! - PFD retrieval and change notifications for SMFs and UPFs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use nextgcore_nefd::{
    nef_sbi_request_handler, Consumer, HttpPfdNotificationSender, NefConfig, NefContext,
    NotifyDispatcher, PfdChangeNotifier, Processor, NEF_DEFAULT_CONFIG_PATH,
};
use ogs_sbi::{SbiServer, SbiServerConfig, UriScheme};

/// NextGCore NEF - Network Exposure Function
#[derive(Parser, Debug)]
#[command(name = "nextgcore-nefd")]
#[command(author = "NextGCore")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "5G Core Network Exposure Function", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, default_value = NEF_DEFAULT_CONFIG_PATH)]
    config: String,

    /// Log file path
    #[arg(short = 'l', long)]
    log_file: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides logger.level
    #[arg(short = 'e', long)]
    log_level: Option<String>,

    /// Disable color output
    #[arg(short = 'm', long)]
    no_color: bool,
}

const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Arc::new(
        NefConfig::load(&args.config)
            .with_context(|| format!("Failed to load configuration from {}", args.config))?,
    );

    // Initialize logging
    init_logging(&args, config.log_level())?;

    log::info!("NextGCore NEF v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!("Config version [{}]", config.version());

    // Set up signal handlers
    let shutdown = Arc::new(AtomicBool::new(false));
    setup_signal_handlers(shutdown.clone())?;

    let context = Arc::new(NefContext::new());
    let consumer = Consumer::from_config(config.clone(), context.clone());

    let (notifier, rx) = PfdChangeNotifier::new();
    let dispatcher = NotifyDispatcher::new(rx, Arc::new(HttpPfdNotificationSender::new()));
    let dispatcher_task = tokio::spawn(dispatcher.run());

    let processor = Arc::new(Processor::new(
        config.clone(),
        context.clone(),
        consumer.clone(),
        Arc::new(notifier),
    ));

    // Registration is a precondition for serving; only a signal stops the retries
    tokio::select! {
        result = consumer.nrf.register_nf_instance() => {
            result.map_err(|e| anyhow::anyhow!("NRF registration failed: {}", e))?;
        }
        _ = wait_for_shutdown(shutdown.clone()) => {
            log::info!("Shutdown requested before NRF registration completed");
            dispatcher_task.abort();
            return Ok(());
        }
    }
    log::info!("NF instance [{}] registered", context.nf_instance_id());

    let mut server_config = SbiServerConfig::with_host_port(config.sbi_binding_ip(), config.sbi_port())
        .map_err(|e| anyhow::anyhow!("Invalid SBI address: {}", e))?;
    if config.sbi_scheme() == UriScheme::Https {
        server_config = server_config.with_tls(config.tls_key_path(), config.tls_pem_path());
    }
    let sbi_server = SbiServer::new(server_config);

    let handler_processor = processor.clone();
    sbi_server
        .start(move |request| nef_sbi_request_handler(handler_processor.clone(), request))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start SBI server: {}", e))?;

    log::info!("SBI HTTP/2 server listening on {}", config.binding_addr());
    log::info!("NextGCore NEF ready");

    wait_for_shutdown(shutdown).await;

    // Graceful shutdown
    log::info!("Shutting down...");

    if let Err(e) = consumer.nrf.deregister_nf_instance().await {
        log::warn!("NRF deregistration failed: {}", e);
    }

    sbi_server
        .stop()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to stop SBI server: {}", e))?;
    log::info!("SBI HTTP/2 server stopped");

    dispatcher_task.abort();

    log::info!("NextGCore NEF stopped");
    Ok(())
}

/// Initialize logging; the command line level wins over the config file
fn init_logging(args: &Args, config_level: Option<&str>) -> Result<()> {
    let mut builder = env_logger::Builder::new();

    let level = match args
        .log_level
        .as_deref()
        .or(config_level)
        .unwrap_or("info")
        .to_lowercase()
        .as_str()
    {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };
    builder.filter_level(level);

    builder.format_timestamp_millis();

    if args.no_color {
        builder.write_style(env_logger::WriteStyle::Never);
    }

    if let Some(path) = &args.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
        builder.write_style(env_logger::WriteStyle::Never);
    }

    builder.init();

    Ok(())
}

/// Set up signal handlers for graceful shutdown
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        shutdown.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    Ok(())
}

async fn wait_for_shutdown(shutdown: Arc<AtomicBool>) {
    while !shutdown.load(Ordering::SeqCst) {
        tokio::time::sleep(SHUTDOWN_POLL_INTERVAL).await;
    }
}
