//! TCP listener and per-connection task wiring

use crate::game::{GameState, SharedState};
use crate::handler;
use crate::transport;
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Per-connection transport limits
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Longest a single socket write may take before the peer is dropped
    pub write_timeout: Duration,
    /// Drop peers that send nothing for this long; `None` waits forever
    pub idle_timeout: Option<Duration>,
    /// Frames buffered per peer before sends start failing
    pub queue_capacity: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            write_timeout: Duration::from_secs(5),
            idle_timeout: None,
            queue_capacity: 64,
        }
    }
}

/// The game server: one listener, one shared game state
pub struct Server {
    listener: TcpListener,
    state: SharedState,
    settings: ConnectionSettings,
}

impl Server {
    pub async fn bind(addr: &str, settings: ConnectionSettings) -> std::io::Result<Self> {
        Self::bind_with_state(addr, settings, GameState::new()).await
    }

    pub async fn bind_with_state(
        addr: &str,
        settings: ConnectionSettings,
        state: GameState,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            state: state.into_shared(),
            settings,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    /// Accepts connections until the process is stopped
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!("Server started successfully");

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => self.spawn_connection(stream, addr).await,
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }

    /// Spawns the writer and reader tasks for a fresh connection
    async fn spawn_connection(&self, stream: TcpStream, addr: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            error!("Failed to set TCP_NODELAY for {}: {}", addr, e);
        }
        let (read_half, write_half) = stream.into_split();
        let (outbound_tx, outbound_rx) = mpsc::channel(self.settings.queue_capacity.max(1));

        let (id, closed) = {
            let mut state = self.state.lock().await;
            state.register(addr, outbound_tx)
        };

        tokio::spawn(transport::run_writer(
            write_half,
            outbound_rx,
            self.settings.write_timeout,
        ));
        tokio::spawn(handler::handle_connection(
            id,
            read_half,
            closed,
            Arc::clone(&self.state),
            self.settings.idle_timeout,
        ));
    }
}
