//! Push-channel messages.
//!
//! Every WebSocket text frame carries one envelope:
//!
//! ```json
//! {"event": "carrinho_atualizado", "data": {"chave": "a1b2c3d4", "produtos": []}}
//! ```
//!
//! | Event                 | Direction        | Payload                 |
//! |-----------------------|------------------|-------------------------|
//! | `adicionar_produto`   | client -> server | `{id, chave}`           |
//! | `carrinho_atualizado` | server -> client | `{chave, produtos}`     |
//! | `erro`                | server -> client | `{mensagem?}`           |
//!
//! Decoding is lenient about payload contents: a missing or malformed
//! `produtos` becomes an empty cart, a missing `mensagem` becomes `None`.
//! Unknown event names decode to `Ok(None)` so either side can skip them.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::cart::CartItem;
use crate::key::SessionKey;

pub const ADD_ITEM_EVENT: &str = "adicionar_produto";
pub const CART_UPDATED_EVENT: &str = "carrinho_atualizado";
pub const ERROR_EVENT: &str = "erro";

/// Raw envelope of a push-channel frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Frame {
    pub fn new(event: &str, data: impl Serialize) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event: event.to_string(),
            data: serde_json::to_value(data)?,
        })
    }

    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Payload decoded as `T`; `null` data decodes as `T::default()`.
    fn payload<T: DeserializeOwned + Default>(&self) -> Result<T, serde_json::Error> {
        if self.data.is_null() {
            return Ok(T::default());
        }
        T::deserialize(&self.data)
    }
}

/// `adicionar_produto` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddItem {
    pub id: i64,
    /// Raw key as sent; the relay validates it.
    #[serde(default)]
    pub chave: String,
}

impl AddItem {
    pub fn new(id: i64, key: &SessionKey) -> Self {
        Self {
            id,
            chave: key.as_str().to_string(),
        }
    }
}

/// `carrinho_atualizado` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartUpdated {
    #[serde(default)]
    pub chave: String,
    #[serde(default, deserialize_with = "lenient_items")]
    pub produtos: Vec<CartItem>,
}

/// `erro` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mensagem: Option<String>,
}

impl ServerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            mensagem: Some(message.into()),
        }
    }
}

/// Commands a client sends to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    AddItem(AddItem),
}

impl ClientCommand {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::AddItem(_) => ADD_ITEM_EVENT,
        }
    }

    pub fn to_frame(&self) -> Result<Frame, serde_json::Error> {
        match self {
            Self::AddItem(payload) => Frame::new(ADD_ITEM_EVENT, payload),
        }
    }

    pub fn from_frame(frame: &Frame) -> Result<Option<Self>, serde_json::Error> {
        match frame.event.as_str() {
            ADD_ITEM_EVENT => Ok(Some(Self::AddItem(AddItem::deserialize(&frame.data)?))),
            _ => Ok(None),
        }
    }
}

/// Events the server pushes to clients.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    CartUpdated(CartUpdated),
    Error(ServerError),
}

impl ServerEvent {
    pub fn to_frame(&self) -> Result<Frame, serde_json::Error> {
        match self {
            Self::CartUpdated(payload) => Frame::new(CART_UPDATED_EVENT, payload),
            Self::Error(payload) => Frame::new(ERROR_EVENT, payload),
        }
    }

    pub fn from_frame(frame: &Frame) -> Result<Option<Self>, serde_json::Error> {
        match frame.event.as_str() {
            CART_UPDATED_EVENT => Ok(Some(Self::CartUpdated(frame.payload()?))),
            ERROR_EVENT => Ok(Some(Self::Error(frame.payload()?))),
            _ => Ok(None),
        }
    }
}

fn lenient_items<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<CartItem>, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    Ok(Vec::<CartItem>::deserialize(value).unwrap_or_default())
}
