//! Movement catalogue the relay serves.

use std::path::Path;

use anyhow::{Context, Result};
use stockcart_types::CartItem;

/// Reads a JSON array of movements.
pub fn load(path: &Path) -> Result<Vec<CartItem>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading seed file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing seed file {}", path.display()))
}

/// Small built-in catalogue for local development.
pub fn demo_catalogue() -> Vec<CartItem> {
    // (id, quantity, kind, material, ean, short text, main supplier)
    let rows = [
        (1, 5.0, "ENTRADA", "8517681", "7891000100103", "PARAFUSO SEXT M8X30", "METALURGICA SUL"),
        (2, 12.0, "SAIDA", "8517682", "7891000100110", "PORCA SEXT M8", "METALURGICA SUL"),
        (3, 1.0, "ENTRADA", "9200114", "7896543210987", "LUVA NITRILICA G", "PROTEGE EPI"),
        (
            4,
            40.0,
            "TRANSFERENCIA",
            "9200115",
            "7896543210994",
            "FITA ISOLANTE 19MM",
            "ELETRO NORTE",
        ),
    ];
    rows.into_iter()
        .map(|(id, qty, kind, material, ean, text, supplier)| CartItem {
            id,
            quantidade: Some(qty),
            tipo_movimento: Some(kind.to_string()),
            data_hora: Some(format!("2024-03-{id:02}T08:30:00")),
            material: Some(material.to_string()),
            ean: Some(ean.to_string()),
            texto_breve_material: Some(text.to_string()),
            descricao_fornecedor_principal: Some(supplier.to_string()),
        })
        .collect()
}
