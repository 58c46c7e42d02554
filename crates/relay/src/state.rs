use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use stockcart_types::{CartItem, CartUpdated, ServerEvent};
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

/// A connected socket's outbound queue.
pub struct ClientConnection {
    pub tx: mpsc::UnboundedSender<String>,
    pub connected_at: Instant,
}

/// Why an add-item command was refused. The text goes back to the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected(pub String);

/// Shared relay state.
#[derive(Clone)]
pub struct RelayState {
    /// Movements that can be searched and added to carts.
    pub catalogue: Arc<Vec<CartItem>>,
    /// Carts, keyed by session key.
    pub carts: Arc<DashMap<String, Vec<CartItem>>>,
    /// Open sockets, keyed by connection id.
    pub connections: Arc<DashMap<Uuid, ClientConnection>>,
}

impl RelayState {
    pub fn new(catalogue: Vec<CartItem>) -> Self {
        Self {
            catalogue: Arc::new(catalogue),
            carts: Arc::new(DashMap::new()),
            connections: Arc::new(DashMap::new()),
        }
    }

    pub fn cart(&self, key: &str) -> Vec<CartItem> {
        self.carts.get(key).map(|c| c.value().clone()).unwrap_or_default()
    }

    pub fn movement(&self, id: i64) -> Option<&CartItem> {
        self.catalogue.iter().find(|m| m.id == id)
    }

    /// Appends movement `id` to the cart for `key` and broadcasts the new cart.
    ///
    /// The broadcast is queued while the cart entry is still locked, so two
    /// concurrent adds to one key reach every socket in the order they were
    /// applied and the last broadcast always carries the full cart.
    pub fn add_item(&self, key: &str, id: i64) -> Result<usize, Rejected> {
        let key = key.trim();
        if key.is_empty() {
            return Err(Rejected("Chave de sessão ausente".to_string()));
        }
        let item = self
            .movement(id)
            .cloned()
            .ok_or_else(|| Rejected(format!("Movimentação {id} não encontrada")))?;

        let mut cart = self.carts.entry(key.to_string()).or_default();
        cart.push(item);
        let len = cart.len();
        self.broadcast(&ServerEvent::CartUpdated(CartUpdated {
            chave: key.to_string(),
            produtos: cart.to_vec(),
        }));
        Ok(len)
    }

    /// Queues `event` on every open socket. Clients filter by key.
    pub fn broadcast(&self, event: &ServerEvent) {
        let text = match event.to_frame().and_then(|f| f.to_text()) {
            Ok(text) => text,
            Err(e) => {
                warn!("failed to encode broadcast: {e}");
                return;
            }
        };
        for conn in self.connections.iter() {
            let _ = conn.tx.send(text.clone());
        }
    }

    /// Queues `event` on one socket only.
    pub fn send_to(&self, id: &Uuid, event: &ServerEvent) {
        let Some(conn) = self.connections.get(id) else {
            return;
        };
        match event.to_frame().and_then(|f| f.to_text()) {
            Ok(text) => {
                let _ = conn.tx.send(text);
            }
            Err(e) => warn!("failed to encode reply: {e}"),
        }
    }
}
