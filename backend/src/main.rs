use std::sync::Arc;
use std::sync::mpsc::channel;
use std::thread;

use groupcall_server::{
    GroupCallConfig, KurentoEngine, MediaEngine, MessageHandler, RoomRegistry, SignalingServer,
};

fn main() {
    println!("Group call server - Starting...");

    let config = load_config();
    let logger = initialize_logger(&config);
    logger.info("Group call server starting...");

    let (event_sender, event_receiver) = channel();
    let engine: Arc<dyn MediaEngine> =
        match KurentoEngine::connect(&config.media, event_sender, logger.for_component("Media")) {
            Ok(engine) => Arc::new(engine),
            Err(e) => {
                logger.error(&format!(
                    "Cannot reach media server at {}: {}",
                    config.media.kurento_uri, e
                ));
                eprintln!("Failed to connect to media server: {}", e);
                std::process::exit(1);
            }
        };

    let registry = RoomRegistry::new(logger.for_component("Registry"));
    let handler = MessageHandler::new(registry, engine, logger.for_component("Router"));

    let negotiation = handler.negotiation().clone();
    if let Err(e) = thread::Builder::new()
        .name("media-events".to_string())
        .spawn(move || negotiation.pump_media_events(event_receiver))
    {
        logger.error(&format!("Failed to start media event thread: {}", e));
        std::process::exit(1);
    }

    run_server(&config, handler, logger);
}

/// Initializes the main logger from configuration
fn initialize_logger(config: &GroupCallConfig) -> logging::Logger {
    let log_level = config
        .logging
        .log_level
        .parse()
        .unwrap_or(logging::LogLevel::Info);

    if !config.logging.enable_file {
        return logging::Logger::console_only(log_level, "Main");
    }

    let log_path = config.logging.log_file_path.clone().into();
    match logging::Logger::with_component(log_path, log_level, "Main", config.logging.enable_console)
    {
        Ok(logger) => {
            println!(
                "Logging initialized: {} (level: {})",
                config.logging.log_file_path, log_level
            );
            logger
        }
        Err(e) => {
            eprintln!("Failed to create logger: {}", e);
            eprintln!("Cannot continue without logging system.");
            std::process::exit(1);
        }
    }
}

/// Loads configuration or returns default values
fn load_config() -> GroupCallConfig {
    // Determine the configuration in this order:
    // 1. CONFIG environment variable holding inline JSON
    // 2. First command-line argument as a file path
    // 3. server_config.json from CONFIG_PATH, ./config or ./
    if let Ok(json_str) = std::env::var("CONFIG") {
        match GroupCallConfig::from_json_str(&json_str, "CONFIG env") {
            Ok(cfg) => {
                println!("Configuration loaded from CONFIG env as JSON string");
                return cfg;
            }
            Err(e) => eprintln!("CONFIG env is not valid JSON: {}", e),
        }
    }

    let loaded = match std::env::args().nth(1) {
        Some(path) => GroupCallConfig::load_from_file(&path).map(|c| (c, path)),
        None => GroupCallConfig::find_default()
            .map(|c| (c, groupcall_server::config::group_call_config::DEFAULT_CONFIG_FILE.to_string())),
    };

    match loaded {
        Ok((config, source)) => {
            println!("Configuration loaded from: {}", source);
            config
        }
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            eprintln!("Using default values...");
            GroupCallConfig::default()
        }
    }
}

/// Runs the signaling server (blocking)
fn run_server(config: &GroupCallConfig, handler: MessageHandler, main_logger: logging::Logger) {
    let ws_logger = main_logger.for_component("WS");
    let server = SignalingServer::new(handler, config.server.clone(), ws_logger.clone());

    let server = if config.server.enable_tls {
        let Some(pkcs12_path) = &config.server.pkcs12_path else {
            ws_logger.error("TLS enabled but pkcs12_path not set in config");
            ws_logger.error("Server will NOT start - please provide certificate path");
            return;
        };
        let password = config.server.pkcs12_password.as_deref().unwrap_or("");
        match server.with_tls(pkcs12_path, password) {
            Ok(server) => server,
            Err(e) => {
                ws_logger.error(&format!("Failed to enable TLS: {}", e));
                ws_logger.error("Server will NOT start without valid TLS certificate");
                return;
            }
        }
    } else {
        ws_logger.warn("TLS is DISABLED - connections will not be encrypted!");
        server
    };

    println!("Signaling server starting on {}", config.server.bind_addr());
    if let Err(e) = server.start() {
        ws_logger.error(&format!("Server error: {}", e));
        std::process::exit(1);
    }
}
