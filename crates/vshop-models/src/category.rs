//! Product categories shared by detectors and similarity indices.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Detection/product category.
///
/// Each category owns its own detector and its own similarity index;
/// the two are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Clothing,
    Jewelry,
}

impl Category {
    /// All categories in detection order.
    pub const ALL: [Category; 2] = [Category::Clothing, Category::Jewelry];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Clothing => "clothing",
            Category::Jewelry => "jewelry",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("unknown category: {0}")]
pub struct ParseCategoryError(pub String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clothing" => Ok(Category::Clothing),
            "jewelry" | "jewellery" => Ok(Category::Jewelry),
            other => Err(ParseCategoryError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_serde() {
        assert_eq!(serde_json::to_string(&Category::Clothing).unwrap(), "\"clothing\"");
        let parsed: Category = serde_json::from_str("\"jewelry\"").unwrap();
        assert_eq!(parsed, Category::Jewelry);
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("Clothing".parse::<Category>().unwrap(), Category::Clothing);
        assert_eq!("jewellery".parse::<Category>().unwrap(), Category::Jewelry);
        assert!("shoes".parse::<Category>().is_err());
    }
}
