//! Shared data model for the stockcart client and relay.
//!
//! Field names on the wire follow the inventory backend (`quantidade`,
//! `chave`, `produtos`, ...); Rust-side names are only used where the wire
//! name would be ambiguous.

pub mod cart;
pub mod key;
pub mod protocol;

pub use cart::{CartItem, MovementFilter, Product, ProductQuery};
pub use key::{InvalidSessionKey, SessionKey};
pub use protocol::{AddItem, CartUpdated, ClientCommand, Frame, ServerError, ServerEvent};
