//! Outbound delivery: unicast, broadcast and the per-connection writer task
//!
//! Messages are queued onto each connection's bounded channel while the game
//! state is locked; the actual socket writes happen in `run_writer`, outside
//! the critical section. A full or closed queue counts as a failed send.

use crate::registry::{ConnectionId, ConnectionRegistry};
use log::{debug, warn};
use shared::ServerMessage;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::timeout;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("outbound queue is full")]
    QueueFull,
    #[error("peer writer has shut down")]
    Closed,
    #[error("connection is not registered")]
    NotRegistered,
}

pub fn enqueue(
    outbound: &mpsc::Sender<String>,
    message: &ServerMessage,
) -> Result<(), DeliveryError> {
    outbound.try_send(message.to_frame()).map_err(|e| match e {
        TrySendError::Full(_) => DeliveryError::QueueFull,
        TrySendError::Closed(_) => DeliveryError::Closed,
    })
}

/// Best-effort delivery to a single connection
pub fn send_to(
    registry: &ConnectionRegistry,
    id: ConnectionId,
    message: &ServerMessage,
) -> Result<(), DeliveryError> {
    let connection = registry.get(id).ok_or(DeliveryError::NotRegistered)?;
    connection.send(message)
}

/// Delivers to every connection registered at call time
///
/// Returns the connections whose delivery failed; the caller tears them down
/// once the current transition is complete.
pub fn broadcast_to_all(
    registry: &ConnectionRegistry,
    message: &ServerMessage,
) -> Vec<ConnectionId> {
    registry
        .all_connections()
        .into_iter()
        .filter(|&id| match send_to(registry, id, message) {
            Ok(()) => false,
            Err(e) => {
                warn!("Failed to deliver to connection {}: {}", id, e);
                true
            }
        })
        .collect()
}

/// Drains a connection's outbound queue into its socket
///
/// Ends when the queue's sender is dropped (connection unregistered), or on
/// the first failed or timed-out write. Closing the receiver on exit makes
/// any later enqueue fail, which in turn triggers the disconnect path.
pub async fn run_writer<W>(
    mut writer: W,
    mut outbound: mpsc::Receiver<String>,
    write_timeout: Duration,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = outbound.recv().await {
        match timeout(write_timeout, writer.write_all(frame.as_bytes())).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!("Write failed: {}", e);
                break;
            }
            Err(_) => {
                warn!("Write timed out after {:?}", write_timeout);
                break;
            }
        }
    }

    outbound.close();
    if let Err(e) = writer.shutdown().await {
        debug!("Socket shutdown failed: {}", e);
    }
}
