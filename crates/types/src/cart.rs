use serde::{Deserialize, Serialize};

/// One movement-derived entry, as listed by `/movimentacoes` and held in a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantidade: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tipo_movimento: Option<String>,
    /// Entry timestamp, kept verbatim; the backend's format is not fixed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_hora: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ean: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texto_breve_material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descricao_fornecedor_principal: Option<String>,
}

impl CartItem {
    /// An item carrying only its identifier.
    pub fn bare(id: i64) -> Self {
        Self {
            id,
            quantidade: None,
            tipo_movimento: None,
            data_hora: None,
            material: None,
            ean: None,
            texto_breve_material: None,
            descricao_fornecedor_principal: None,
        }
    }
}

/// Product record returned by `/buscar_produto`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub cod_material: Option<String>,
    #[serde(default)]
    pub ean: Option<String>,
    #[serde(default)]
    pub texto_breve_material: Option<String>,
    #[serde(default, alias = "descricao_fornecedor_principal")]
    pub descricao: Option<String>,
}

/// The `valor` of a product lookup: free text (material code, EAN) or a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductQuery {
    Number(i64),
    Text(String),
}

impl ProductQuery {
    /// Builds a text query from user input; `None` when the input is blank.
    pub fn from_input(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self::Text(trimmed.to_string()))
    }

    /// Text form used for matching and logging.
    pub fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

/// Filters for a movement search. Absent filters are left out of the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementFilter {
    pub id: Option<i64>,
    pub ean: Option<String>,
    pub material: Option<String>,
}

impl MovementFilter {
    /// Query-string pairs for the filters that are set and non-blank.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(id) = self.id {
            pairs.push(("id", id.to_string()));
        }
        if let Some(ean) = non_blank(self.ean.as_deref()) {
            pairs.push(("ean", ean.to_string()));
        }
        if let Some(material) = non_blank(self.material.as_deref()) {
            pairs.push(("material", material.to_string()));
        }
        pairs
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
