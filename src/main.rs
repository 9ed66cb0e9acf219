use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use vkapi::{Config, ErrorKind, EventBus, VkApi, VkEvent};

const CONFIG_PATH: &str = "vkapi.toml";

#[tokio::main]
async fn main() {
    // Load configuration, creating a default file on first run
    let config = match Config::load_or_create(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {CONFIG_PATH}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = vkapi::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        vkapi::logging::init_console_only(&config.logging.level);
    }

    let events = EventBus::new();
    let mut receiver = events.subscribe();

    let api = match VkApi::init(&config, events) {
        Ok(api) => api,
        Err(e) => {
            warn!("VK API not started: {e}");
            return;
        }
    };

    // `vkapi send <user_id> <message>` sends one message and exits.
    let args: Vec<String> = std::env::args().skip(1).collect();
    let one_shot = match args.as_slice() {
        [command, user_id, message] if command == "send" => {
            info!("Send test message to {user_id}");
            if let Err(e) = api.send_text(user_id, message) {
                error!("{e}");
                api.unload().await;
                return;
            }
            true
        }
        [] => false,
        _ => {
            warn!("Usage: vkapi [send <user_id> <message>]");
            api.unload().await;
            return;
        }
    };

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
            event = receiver.recv() => match event {
                Ok(VkEvent::Connected) => {}
                Ok(VkEvent::MessageSent { user_id, message }) => {
                    info!("Message '{message}' was sent to VK user {user_id}");
                    if one_shot {
                        break;
                    }
                }
                Ok(VkEvent::Error(e)) => {
                    match e.kind {
                        ErrorKind::Api | ErrorKind::Disallowed => info!(
                            "API error code: {}; description: '{}'",
                            e.api_code.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string()),
                            e.description
                        ),
                        ErrorKind::Network | ErrorKind::MissingToken => {
                            info!("Something went wrong: '{}'", e.description)
                        }
                    }
                    if one_shot && e.user_id.is_some() {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => warn!("Missed {n} VK event(s)"),
                Err(RecvError::Closed) => break,
            }
        }
    }

    api.unload().await;
}
