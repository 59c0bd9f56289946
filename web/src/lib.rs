use log::*;
use service::config::Config;
use sse::ClientRegistry;
use std::net::SocketAddr;
use std::sync::Arc;

pub mod error;
pub mod middleware;
pub mod router;

mod controller;
mod extractors;
mod params;
mod stream;

// Web-level state shared by every handler.
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub client_registry: Arc<ClientRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            client_registry: Arc::new(ClientRegistry::new()),
        }
    }
}

/// Binds the configured address and serves requests until the process exits.
pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let listen_address = app_state.config.listen_address();
    let listener = tokio::net::TcpListener::bind(&listen_address).await?;
    info!("Server listening on {}", listener.local_addr()?);

    let app = router::define_routes(app_state);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}
