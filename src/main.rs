use log::*;
use service::{config::Config, logging::Logger};

#[tokio::main]
async fn main() {
    let config = Config::new();

    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to initialize logger: {e}");
        std::process::exit(1);
    }

    info!("Starting event stream server...");
    debug!("Emitting stream events every {:?}", config.event_interval());

    let app_state = web::AppState::new(config);

    if let Err(e) = web::init_server(app_state).await {
        error!("Server exited with error: {e}");
        std::process::exit(1);
    }
}
