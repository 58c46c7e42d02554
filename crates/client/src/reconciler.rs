//! Cart reconciliation.
//!
//! The server owns every cart. The client keeps a read-only copy for the
//! active session key and replaces it wholesale from two sources only: a
//! `carrinho_atualizado` broadcast whose key matches, or a `/carrinho` fetch
//! whose key is still active when it completes. Adding an item is a request
//! sent over the push channel, never a local edit.

use stockcart_types::{
    AddItem, CartItem, CartUpdated, ClientCommand, ServerError, ServerEvent, SessionKey,
};
use tracing::{debug, info, warn};

use crate::channel::CommandSink;
use crate::error::{ClientError, KeyStoreError};
use crate::key_store::SessionKeyStore;
use crate::notify::{Notification, NotificationSlot};
use crate::query::InventoryApi;

pub const CART_UPDATED_MESSAGE: &str = "Cart updated";
pub const SERVER_ERROR_FALLBACK: &str = "Server error";
pub const LOAD_CART_FALLBACK: &str = "Could not load cart";
pub const EMPTY_KEY_MESSAGE: &str = "Session key must not be empty";

/// Outcome of handling one server event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    CartReplaced,
    /// Broadcast for another session key.
    Discarded,
    ErrorReported,
}

pub struct CartReconciler {
    keys: SessionKeyStore,
    active: SessionKey,
    cart: Vec<CartItem>,
    notifications: NotificationSlot,
}

impl CartReconciler {
    /// Activates the persisted key (creating one on first launch) with an empty cart.
    pub fn new(mut keys: SessionKeyStore) -> Result<Self, KeyStoreError> {
        let active = keys.get_or_create_key()?;
        Ok(Self {
            keys,
            active,
            cart: Vec::new(),
            notifications: NotificationSlot::default(),
        })
    }

    pub fn active_key(&self) -> &SessionKey {
        &self.active
    }

    pub fn cart(&self) -> &[CartItem] {
        &self.cart
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notifications.current()
    }

    pub fn notify(&mut self, notification: Notification) {
        self.notifications.show(notification);
    }

    /// Single entry point for inbound push events.
    pub fn handle(&mut self, event: ServerEvent) -> Reconciled {
        match event {
            ServerEvent::CartUpdated(payload) => {
                if self.on_cart_updated(payload) {
                    Reconciled::CartReplaced
                } else {
                    Reconciled::Discarded
                }
            }
            ServerEvent::Error(payload) => {
                self.on_error(payload);
                Reconciled::ErrorReported
            }
        }
    }

    /// Applies a broadcast if it belongs to the active key. Returns whether it did.
    pub fn on_cart_updated(&mut self, payload: CartUpdated) -> bool {
        if !self.active.matches(&payload.chave) {
            debug!(
                active = %self.active,
                received = %payload.chave,
                "discarding cart broadcast for another key"
            );
            return false;
        }
        debug!(key = %self.active, items = payload.produtos.len(), "cart broadcast applied");
        self.cart = payload.produtos;
        self.notifications.show(Notification::info(CART_UPDATED_MESSAGE));
        true
    }

    pub fn on_error(&mut self, payload: ServerError) {
        let message = payload
            .mensagem
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| SERVER_ERROR_FALLBACK.to_string());
        warn!(message = %message, "server reported an error");
        self.notifications.show(Notification::error(message));
    }

    /// Asks the server to add `item_id` to the active cart.
    ///
    /// Silently does nothing for a missing/zero id or a disconnected channel.
    /// The cart itself changes only when the resulting broadcast arrives.
    pub fn request_add<S: CommandSink + ?Sized>(&self, item_id: Option<i64>, sink: &S) -> bool {
        let Some(id) = item_id.filter(|id| *id != 0) else {
            return false;
        };
        if !sink.is_connected() {
            return false;
        }
        let sent = sink.emit(ClientCommand::AddItem(AddItem::new(id, &self.active)));
        if sent {
            debug!(id, key = %self.active, "add-item requested");
        }
        sent
    }

    /// Fetches the active key's cart and replaces the local copy.
    ///
    /// On failure an error notification is shown and the cart is left as it was.
    pub async fn load_cart<A: InventoryApi + ?Sized>(
        &mut self,
        api: &A,
    ) -> Result<(), ClientError> {
        let key = self.active.clone();
        let result = api.fetch_cart(&key).await;
        self.apply_loaded_cart(&key, result)
    }

    /// Applies a completed cart fetch issued for `key`.
    ///
    /// A result for a key that is no longer active is dropped, whether it
    /// succeeded or failed.
    pub fn apply_loaded_cart(
        &mut self,
        key: &SessionKey,
        result: Result<Vec<CartItem>, ClientError>,
    ) -> Result<(), ClientError> {
        if key != &self.active {
            debug!(
                requested = %key,
                active = %self.active,
                ok = result.is_ok(),
                "dropping cart fetch for previous key"
            );
            return Ok(());
        }
        match result {
            Ok(items) => {
                info!(key = %key, items = items.len(), "cart loaded");
                self.cart = items;
                Ok(())
            }
            Err(e) => {
                warn!(key = %key, "cart load failed: {e}");
                let message = e.server_message().unwrap_or(LOAD_CART_FALLBACK).to_string();
                self.notifications.show(Notification::error(message));
                Err(e)
            }
        }
    }

    /// Switches to a user-supplied key. The cart is not reloaded here.
    pub fn set_key(&mut self, raw: &str) -> Result<&SessionKey, KeyStoreError> {
        match self.keys.set_key(raw) {
            Ok(key) => {
                self.active = key;
                Ok(&self.active)
            }
            Err(e) => {
                if let KeyStoreError::Invalid(_) = e {
                    self.notifications.show(Notification::error(EMPTY_KEY_MESSAGE));
                }
                Err(e)
            }
        }
    }

    /// Starts a fresh session: new random key, empty cart.
    pub fn regenerate_key(&mut self) -> Result<&SessionKey, KeyStoreError> {
        self.active = self.keys.regenerate_key()?;
        self.cart.clear();
        Ok(&self.active)
    }
}
