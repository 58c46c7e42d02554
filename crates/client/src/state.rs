//! Presentation-facing client state.
//!
//! Owned by a single task. Lookups are split into `begin_*` (validate and
//! issue a ticket) and `complete_*` (apply the result if the ticket is still
//! the latest), so a slow response can never overwrite a newer one. The
//! plain async methods run both halves back to back.

use stockcart_types::{CartItem, MovementFilter, Product, ProductQuery};
use tracing::debug;

use crate::error::ClientError;
use crate::notify::Notification;
use crate::query::InventoryApi;
use crate::reconciler::CartReconciler;
use crate::sequence::{RequestSequencer, Ticket};

pub const MISSING_SEARCH_VALUE: &str = "Enter a material code or EAN";
pub const PRODUCT_NOT_FOUND: &str = "Product not found";
pub const SEARCH_FAILED: &str = "Movement search failed";

pub struct ClientState {
    pub reconciler: CartReconciler,
    produto: Option<Product>,
    movements: Vec<CartItem>,
    product_seq: RequestSequencer,
    search_seq: RequestSequencer,
}

impl ClientState {
    pub fn new(reconciler: CartReconciler) -> Self {
        Self {
            reconciler,
            produto: None,
            movements: Vec::new(),
            product_seq: RequestSequencer::default(),
            search_seq: RequestSequencer::default(),
        }
    }

    pub fn product(&self) -> Option<&Product> {
        self.produto.as_ref()
    }

    pub fn movements(&self) -> &[CartItem] {
        &self.movements
    }

    /// Validates the lookup value. Blank input is reported without a request.
    pub fn begin_product_lookup(
        &mut self,
        raw: &str,
    ) -> Result<(Ticket, ProductQuery), ClientError> {
        let Some(query) = ProductQuery::from_input(raw) else {
            self.reconciler.notify(Notification::error(MISSING_SEARCH_VALUE));
            return Err(ClientError::Validation(MISSING_SEARCH_VALUE.to_string()));
        };
        Ok((self.product_seq.issue(), query))
    }

    /// Applies a lookup result. Returns `false` when a newer lookup superseded it.
    pub fn complete_product_lookup(
        &mut self,
        ticket: Ticket,
        result: Result<Product, ClientError>,
    ) -> Result<bool, ClientError> {
        if !self.product_seq.is_current(ticket) {
            debug!(?ticket, "dropping superseded product lookup");
            return Ok(false);
        }
        match result {
            Ok(product) => {
                self.produto = Some(product);
                Ok(true)
            }
            Err(e) => {
                let message = e.server_message().unwrap_or(PRODUCT_NOT_FOUND).to_string();
                self.reconciler.notify(Notification::error(message));
                Err(e)
            }
        }
    }

    pub async fn lookup_product<A: InventoryApi + ?Sized>(
        &mut self,
        api: &A,
        raw: &str,
    ) -> Result<Option<&Product>, ClientError> {
        let (ticket, query) = self.begin_product_lookup(raw)?;
        let result = api.find_product(&query).await;
        self.complete_product_lookup(ticket, result)?;
        Ok(self.produto.as_ref())
    }

    pub fn begin_movement_search(&mut self) -> Ticket {
        self.search_seq.issue()
    }

    /// Applies a search result. Returns `false` when a newer search superseded it.
    pub fn complete_movement_search(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<CartItem>, ClientError>,
    ) -> Result<bool, ClientError> {
        if !self.search_seq.is_current(ticket) {
            debug!(?ticket, "dropping superseded movement search");
            return Ok(false);
        }
        match result {
            Ok(items) => {
                self.movements = items;
                Ok(true)
            }
            Err(e) => {
                let message = e.server_message().unwrap_or(SEARCH_FAILED).to_string();
                self.reconciler.notify(Notification::error(message));
                Err(e)
            }
        }
    }

    pub async fn search_movements<A: InventoryApi + ?Sized>(
        &mut self,
        api: &A,
        filter: &MovementFilter,
    ) -> Result<&[CartItem], ClientError> {
        let ticket = self.begin_movement_search();
        let result = api.search_movements(filter).await;
        self.complete_movement_search(ticket, result)?;
        Ok(&self.movements)
    }
}
