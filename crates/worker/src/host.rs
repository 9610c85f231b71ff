//! Host environment seam: clients, notifications and activation signals.
//!
//! The worker never owns windows or a notification tray; it asks the host.
//! [`LocalHost`] is the in-process implementation used by the server binary
//! and by tests. It records what was asked of it so callers can observe it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use sw_cache_core::Error;
use tokio::sync::RwLock;
use url::Url;

/// An open window controlled (or controllable) by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub id: String,
    pub url: Url,
    pub focused: bool,
}

/// Metadata attached to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    pub task_id: Option<String>,
    /// Milliseconds since the Unix epoch at which the notification was built.
    pub timestamp: i64,
}

/// A system notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Identifies the notification for later dismissal.
    pub tag: String,
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub data: NotificationData,
}

/// Operations the worker needs from its execution environment.
#[async_trait::async_trait]
pub trait Host: Send + Sync {
    /// Ask to be activated without waiting for existing clients to close.
    async fn skip_waiting(&self) -> Result<(), Error>;

    /// Take control of every open client immediately.
    async fn claim(&self) -> Result<(), Error>;

    /// Open window clients, including uncontrolled ones.
    async fn window_clients(&self) -> Result<Vec<ClientInfo>, Error>;

    async fn focus(&self, client_id: &str) -> Result<ClientInfo, Error>;

    async fn open_window(&self, url: &Url) -> Result<ClientInfo, Error>;

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error>;

    async fn close_notification(&self, tag: &str) -> Result<(), Error>;
}

/// In-process host that keeps clients and notifications in memory.
#[derive(Debug, Default)]
pub struct LocalHost {
    clients: RwLock<HashMap<String, ClientInfo>>,
    notifications: RwLock<Vec<Notification>>,
    claimed: AtomicBool,
    skip_waiting_calls: AtomicUsize,
    next_id: AtomicU64,
}

impl LocalHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already open window.
    pub async fn add_client(&self, url: Url) -> ClientInfo {
        let client = ClientInfo { id: self.next_client_id(), url, focused: false };
        self.clients.write().await.insert(client.id.clone(), client.clone());
        client
    }

    /// Notifications currently displayed.
    pub async fn notifications(&self) -> Vec<Notification> {
        self.notifications.read().await.clone()
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::SeqCst)
    }

    pub fn skip_waiting_calls(&self) -> usize {
        self.skip_waiting_calls.load(Ordering::SeqCst)
    }

    fn next_client_id(&self) -> String {
        format!("client-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[async_trait::async_trait]
impl Host for LocalHost {
    async fn skip_waiting(&self) -> Result<(), Error> {
        self.skip_waiting_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn claim(&self) -> Result<(), Error> {
        self.claimed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn window_clients(&self) -> Result<Vec<ClientInfo>, Error> {
        let mut clients: Vec<ClientInfo> = self.clients.read().await.values().cloned().collect();
        clients.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(clients)
    }

    async fn focus(&self, client_id: &str) -> Result<ClientInfo, Error> {
        let mut clients = self.clients.write().await;
        if !clients.contains_key(client_id) {
            return Err(Error::Client(format!("no such client: {client_id}")));
        }

        for client in clients.values_mut() {
            client.focused = client.id == client_id;
        }
        clients
            .get(client_id)
            .cloned()
            .ok_or_else(|| Error::Client(format!("no such client: {client_id}")))
    }

    async fn open_window(&self, url: &Url) -> Result<ClientInfo, Error> {
        let client = ClientInfo { id: self.next_client_id(), url: url.clone(), focused: true };

        let mut clients = self.clients.write().await;
        for other in clients.values_mut() {
            other.focused = false;
        }
        clients.insert(client.id.clone(), client.clone());
        Ok(client)
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        let mut shown = self.notifications.write().await;
        shown.retain(|n| n.tag != notification.tag);
        shown.push(notification.clone());
        Ok(())
    }

    async fn close_notification(&self, tag: &str) -> Result<(), Error> {
        self.notifications.write().await.retain(|n| n.tag != tag);
        Ok(())
    }
}
