use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;

use rankit_live::config::ServerConfig;
use rankit_live::core::ServerManager;
use rankit_live::handlers::routes;
use rankit_live::storage::{
    load_quizzes, FileHistorySink, HistorySink, MemoryHistoryStore, MemoryQuizStore,
};

#[tokio::main]
async fn main() {
    // Initialize env before the logger so RUST_LOG can come from .env
    let dotenv_result = dotenvy::dotenv();

    // Initialize logging
    env_logger::init();

    match dotenv_result {
        Ok(path) => info!("Environment variables loaded from {}", path.display()),
        Err(e) => warn!("Failed to load .env file: {}", e),
    };

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Configuration: host={}, port={}", config.host, config.port);

    let quizzes = match &config.quiz_file {
        Some(path) => match load_quizzes(path).await {
            Ok(quizzes) => {
                info!("Loaded {} quizzes from {}", quizzes.len(), path);
                MemoryQuizStore::with_quizzes(quizzes)
            }
            Err(e) => {
                error!("Failed to load quizzes from {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => {
            warn!("RANKIT_QUIZ_FILE not set, no quizzes can be played");
            MemoryQuizStore::new()
        }
    };

    let history: Arc<dyn HistorySink> = match &config.history_file {
        Some(path) => {
            info!("Archiving finished rooms to {}", path);
            Arc::new(FileHistorySink::new(path))
        }
        None => {
            warn!("RANKIT_HISTORY_FILE not set, room history is kept in memory only");
            Arc::new(MemoryHistoryStore::new())
        }
    };

    // Build the server address
    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to parse server address: {}", e);
            std::process::exit(1);
        }
    };

    let server = Arc::new(ServerManager::start(config, Arc::new(quizzes), history));

    info!("Starting Rankit Live server on {}", addr);
    warp::serve(routes(server)).run(addr).await;
}
