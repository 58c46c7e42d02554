//! Request/response endpoints.
//!
//! - `GET  /movimentacoes?id=&ean=&material=` -- filtered movements
//! - `POST /buscar_produto`                   -- product by material code or EAN
//! - `GET  /carrinho/{chave}`                 -- cart for a session key

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use stockcart_types::{CartItem, Product};

use crate::error::RelayError;
use crate::state::RelayState;

/// Raw query parameters; blank values count as absent.
#[derive(Debug, Default, Deserialize)]
pub struct MovementQuery {
    pub id: Option<String>,
    pub ean: Option<String>,
    pub material: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    #[serde(default)]
    pub valor: Value,
}

/// GET /movimentacoes
pub async fn list_movements(
    State(state): State<RelayState>,
    Query(query): Query<MovementQuery>,
) -> Result<Json<Vec<CartItem>>, RelayError> {
    let id = match present(&query.id) {
        Some(raw) => Some(
            raw.parse::<i64>()
                .map_err(|_| RelayError::BadRequest(format!("id inválido: {raw}")))?,
        ),
        None => None,
    };
    let ean = present(&query.ean);
    let material = present(&query.material);

    let items = state
        .catalogue
        .iter()
        .filter(|m| id.map_or(true, |id| m.id == id))
        .filter(|m| ean.map_or(true, |ean| m.ean.as_deref() == Some(ean)))
        .filter(|m| material.map_or(true, |mat| m.material.as_deref() == Some(mat)))
        .cloned()
        .collect();
    Ok(Json(items))
}

/// POST /buscar_produto
///
/// `valor` may be a string or a number and matches either the material code
/// or the EAN of a catalogued movement.
pub async fn find_product(
    State(state): State<RelayState>,
    Json(req): Json<ProductRequest>,
) -> Result<Json<Product>, RelayError> {
    let valor = match &req.valor {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    };
    if valor.is_empty() {
        return Err(RelayError::BadRequest("Informe um código de material ou EAN".into()));
    }

    let item = state
        .catalogue
        .iter()
        .find(|m| {
            m.material.as_deref() == Some(valor.as_str())
                || m.ean.as_deref() == Some(valor.as_str())
        })
        .ok_or_else(|| RelayError::NotFound("Produto não encontrado".into()))?;

    Ok(Json(Product {
        cod_material: item.material.clone(),
        ean: item.ean.clone(),
        texto_breve_material: item.texto_breve_material.clone(),
        descricao: item.descricao_fornecedor_principal.clone(),
    }))
}

/// GET /carrinho/{chave}
pub async fn get_cart(
    State(state): State<RelayState>,
    Path(chave): Path<String>,
) -> Json<Vec<CartItem>> {
    Json(state.cart(chave.trim()))
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
