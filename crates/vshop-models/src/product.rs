//! Catalog products matched to detections.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::category::Category;

/// Availability shown for a matched product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StockStatus {
    #[default]
    #[serde(rename = "In Stock", alias = "in_stock")]
    InStock,
    #[serde(rename = "Out of Stock", alias = "out_of_stock")]
    OutOfStock,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "In Stock",
            StockStatus::OutOfStock => "Out of Stock",
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A catalog item matched to a detection.
///
/// `image_url` is the identity of the match: within one frame's product list
/// there is at most one product per `image_url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Detector label that produced the match
    pub object_type: String,
    pub category: Category,
    /// Path/URL of the matched catalog image
    pub image_url: String,
    pub title: String,
    #[serde(default)]
    pub stock: StockStatus,
    pub direct_url: String,
    /// Confidence of the detection that produced the match
    #[serde(default)]
    pub confidence: f64,
}

/// Product as returned to API clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductResult {
    pub object_type: String,
    pub category: Category,
    pub image_url: String,
    pub title: String,
    pub stock: StockStatus,
    pub direct_url: String,
}

impl From<Product> for ProductResult {
    fn from(p: Product) -> Self {
        Self {
            object_type: p.object_type,
            category: p.category,
            image_url: p.image_url,
            title: p.title,
            stock: p.stock,
            direct_url: p.direct_url,
        }
    }
}

/// Title-case a detector label: the first letter of every alphabetic run is
/// upper-cased and the rest lower-cased ("t-shirt" -> "T-Shirt").
pub fn title_case(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut prev_is_alpha = false;
    for ch in label.chars() {
        if ch.is_alphabetic() {
            if prev_is_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_is_alpha = true;
        } else {
            out.push(ch);
            prev_is_alpha = false;
        }
    }
    out
}
