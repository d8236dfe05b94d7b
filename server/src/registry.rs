//! Live connection tracking for the game server
//!
//! This module handles the server-side bookkeeping of transport connections:
//! - Connection lifecycle (register on accept, unregister on leave or send failure)
//! - Binding a player name to the connection that announced it
//! - Name lookups in both directions
//!
//! Player records that outlive a connection (color, score) live in the
//! player directory instead; the registry only knows who is connected right now.

use crate::transport::{self, DeliveryError};
use log::info;
use shared::ServerMessage;
use std::collections::HashMap;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

pub type ConnectionId = u64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),
    #[error("connection is already bound to `{0}`")]
    AlreadyBound(String),
}

/// A registered transport connection
///
/// Outbound frames go through a bounded queue drained by the connection's
/// writer task, so queueing never waits on the peer.
#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    pub addr: SocketAddr,
    pub name: Option<String>,
    outbound: mpsc::Sender<String>,
    // Dropped together with the connection, which wakes its reader task.
    _closer: oneshot::Sender<()>,
}

impl Connection {
    /// Queues a message for this peer without waiting
    pub fn send(&self, message: &ServerMessage) -> Result<(), DeliveryError> {
        transport::enqueue(&self.outbound, message)
    }
}

/// Tracks every live connection and the player name bound to it
///
/// A name is bound to at most one connection. Binding a name that another
/// connection holds displaces the previous holder, which is handed back to
/// the caller for teardown.
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
    names: HashMap<String, ConnectionId>,
    next_id: ConnectionId,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
            names: HashMap::new(),
            next_id: 1,
        }
    }

    /// Registers a freshly accepted connection
    ///
    /// Returns the connection ID and a receiver that resolves once the
    /// connection is unregistered, whichever path removed it.
    pub fn register(
        &mut self,
        addr: SocketAddr,
        outbound: mpsc::Sender<String>,
    ) -> (ConnectionId, oneshot::Receiver<()>) {
        let id = self.next_id;
        self.next_id += 1;

        let (closer, closed) = oneshot::channel();
        self.connections.insert(
            id,
            Connection {
                id,
                addr,
                name: None,
                outbound,
                _closer: closer,
            },
        );
        info!("Connection {} opened from {}", id, addr);

        (id, closed)
    }

    /// Binds `name` to connection `id`
    ///
    /// Returns the connection that previously held the name, already removed
    /// from the registry. Rebinding a connection to its own name is a no-op;
    /// rebinding it to a different name is refused.
    pub fn bind_name(
        &mut self,
        id: ConnectionId,
        name: &str,
    ) -> Result<Option<Connection>, BindError> {
        match self.connections.get(&id) {
            None => return Err(BindError::UnknownConnection(id)),
            Some(connection) => match connection.name.as_deref() {
                Some(bound) if bound == name => return Ok(None),
                Some(bound) => return Err(BindError::AlreadyBound(bound.to_string())),
                None => {}
            },
        }

        let displaced = match self.names.get(name).copied() {
            Some(holder) if holder != id => self.connections.remove(&holder),
            _ => None,
        };

        if let Some(connection) = self.connections.get_mut(&id) {
            connection.name = Some(name.to_string());
        }
        self.names.insert(name.to_string(), id);

        Ok(displaced)
    }

    /// Removes a connection. Safe to call more than once for the same ID.
    pub fn unregister(&mut self, id: ConnectionId) -> Option<Connection> {
        let connection = self.connections.remove(&id)?;
        if let Some(name) = &connection.name {
            if self.names.get(name) == Some(&id) {
                self.names.remove(name);
            }
        }
        info!("Connection {} closed", id);
        Some(connection)
    }

    /// Snapshot of registered connection IDs in registration order
    pub fn all_connections(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self.connections.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn name_of(&self, id: ConnectionId) -> Option<&str> {
        self.connections
            .get(&id)
            .and_then(|connection| connection.name.as_deref())
    }

    pub fn connection_for(&self, name: &str) -> Option<ConnectionId> {
        self.names.get(name).copied()
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
