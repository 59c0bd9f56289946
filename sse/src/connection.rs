use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Peer identity (`ip:port`) used as the registry key.
pub type RemoteIdentity = String;

/// Live metadata for one streaming connection.
///
/// Only the owning session advances `last_event_id`; the status endpoint reads it
/// concurrently, so the cursor lives in an atomic rather than behind the map lock.
#[derive(Debug)]
pub struct Client {
    remote: RemoteIdentity,
    connected_at: DateTime<Utc>,
    last_event_id: AtomicU64,
}

impl Client {
    pub fn new(remote: RemoteIdentity, last_event_id: u64) -> Self {
        Self {
            remote,
            connected_at: Utc::now(),
            last_event_id: AtomicU64::new(last_event_id),
        }
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    pub fn last_event_id(&self) -> u64 {
        self.last_event_id.load(Ordering::Relaxed)
    }

    pub(crate) fn set_last_event_id(&self, cursor: u64) {
        self.last_event_id.store(cursor, Ordering::Relaxed);
    }

    pub fn view(&self) -> ClientView {
        ClientView {
            remote: self.remote.clone(),
            connected_at: self.connected_at,
            last_event_id: self.last_event_id(),
        }
    }
}

/// Point-in-time copy of a `Client` as served by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientView {
    pub remote: RemoteIdentity,
    pub connected_at: DateTime<Utc>,
    pub last_event_id: u64,
}

/// Process-wide map of active streaming sessions keyed by remote identity.
///
/// Every operation locks only the shard it touches; nothing holds a lock across
/// a network write.
pub struct ClientRegistry {
    clients: DashMap<RemoteIdentity, Arc<Client>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
        }
    }

    /// Insert a client, replacing any entry under the same identity (last writer wins).
    pub fn insert(&self, client: Arc<Client>) {
        if self
            .clients
            .insert(client.remote.clone(), client)
            .is_some()
        {
            debug!("Replaced an existing client entry on reconnect");
        }
    }

    /// Unconditionally erase the entry for `remote`.
    pub fn remove(&self, remote: &str) {
        self.clients.remove(remote);
    }

    /// Erase the entry for `client` only if it has not been replaced by a newer session.
    pub fn remove_client(&self, client: &Arc<Client>) {
        self.clients
            .remove_if(client.remote(), |_, current| Arc::ptr_eq(current, client));
    }

    pub fn get(&self, remote: &str) -> Option<Arc<Client>> {
        self.clients.get(remote).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Copies the current entries without mutating the registry.
    ///
    /// Shards are read one at a time, so a concurrent cursor update may or may not
    /// be reflected; each individual field is always a consistent value.
    pub fn snapshot(&self) -> BTreeMap<RemoteIdentity, ClientView> {
        self.clients
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().view()))
            .collect()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry membership for one session; dropping it removes the client.
///
/// Held by the session task so the entry disappears on every exit path,
/// including a failed write or a panic.
pub struct Registration {
    registry: Arc<ClientRegistry>,
    client: Arc<Client>,
}

impl Registration {
    pub fn register(registry: &Arc<ClientRegistry>, client: Client) -> Self {
        let client = Arc::new(client);
        registry.insert(Arc::clone(&client));

        Self {
            registry: Arc::clone(registry),
            client,
        }
    }

    pub fn client(&self) -> &Arc<Client> {
        &self.client
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.remove_client(&self.client);
        info!("Client {} closed connection.", self.client.remote());
    }
}
