//! Client for the stockcart inventory backend.
//!
//! - [`key_store`]: the anonymous session key, persisted across restarts.
//! - [`channel`]: the push channel carrying cart commands out and broadcasts in.
//! - [`reconciler`]: gates broadcasts on the active key and owns the cart copy.
//! - [`query`]: request/response lookups (movements, products, carts).
//! - [`state`]: the presentation model tying them together.

pub mod channel;
pub mod config;
pub mod error;
pub mod key_store;
pub mod notify;
pub mod query;
pub mod reconciler;
pub mod sequence;
pub mod state;

pub use channel::{ChannelEvent, CommandSink, ConnectionState, PushChannel, ReconnectPolicy};
pub use config::ClientConfig;
pub use error::{ClientError, ConfigError, KeyStoreError};
pub use key_store::{FileKeyStorage, KeyStorage, MemoryKeyStorage, SessionKeyStore};
pub use notify::{Notification, NotificationKind};
pub use query::{InventoryApi, QueryClient};
pub use reconciler::{CartReconciler, Reconciled};
pub use state::ClientState;
