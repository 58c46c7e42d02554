//! Reference backend for stockcart: movement/product lookups, carts per
//! session key, and a realtime `/ws` endpoint that broadcasts cart changes.

pub mod error;
pub mod routes;
pub mod seed;
pub mod state;
pub mod ws;

use axum::{
    routing::{get, post},
    Router,
};
use state::RelayState;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn app(state: RelayState) -> Router {
    // Browser clients are served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/ws", get(ws::ws_handler))
        .route("/movimentacoes", get(routes::list_movements))
        .route("/buscar_produto", post(routes::find_product))
        .route("/carrinho/{chave}", get(routes::get_cart))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
