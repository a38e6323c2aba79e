//! TCP listener, shared state, and the accept loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::config::ServerConfig;
use crate::engine::Engine;
use crate::error::ServerError;
use crate::handler::handle_connection;
use crate::timeout;

/// Pause after a failed `accept` before retrying.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Shared server state handed to every connection task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks; all game
/// state sits behind the engine mutex.
pub(crate) struct ServerState {
    pub(crate) config: ServerConfig,
    pub(crate) engine: Mutex<Engine>,
    pub(crate) connections: AtomicUsize,
}

/// A running Dropfour server.
///
/// # Example
///
/// ```rust,no_run
/// use dropfour::{Server, ServerConfig};
///
/// # async fn run() -> Result<(), dropfour::ServerError> {
/// let server = Server::bind(ServerConfig::default()).await?;
/// server.run().await
/// # }
/// ```
pub struct Server {
    listener: TcpListener,
    state: Arc<ServerState>,
}

impl Server {
    /// Binds the listener and prepares the shared state. A bind failure
    /// is fatal and terminates the process from `main`.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        let state = Arc::new(ServerState {
            engine: Mutex::new(Engine::new(config.clone())),
            config,
            connections: AtomicUsize::new(0),
        });
        Ok(Server { listener, state })
    }

    /// The bound local address, useful with an OS-assigned port.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop until the process terminates. The timeout
    /// sweeper is spawned alongside it.
    pub async fn run(self) -> Result<(), ServerError> {
        timeout::spawn_sweeper(Arc::clone(&self.state));

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let live = self.state.connections.load(Ordering::Acquire);
                    if live >= self.state.config.max_connections {
                        tracing::warn!(%peer, live, "at connection capacity, dropping socket");
                        continue;
                    }
                    self.state.connections.fetch_add(1, Ordering::AcqRel);
                    tracing::debug!(%peer, "accepted connection");
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        handle_connection(stream, Arc::clone(&state)).await;
                        state.connections.fetch_sub(1, Ordering::AcqRel);
                    });
                }
                Err(e) => {
                    // accept errors like EMFILE tend to persist; back off
                    // instead of spinning on the listener
                    tracing::error!(error = %e, "accept failed");
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                }
            }
        }
    }
}
