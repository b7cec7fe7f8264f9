//! Product bundles: complementary products from one frame offered together.

use serde::{Deserialize, Serialize};

use crate::product::{title_case, Product, ProductResult};
use crate::result::format_timestamp_key;
use crate::video::VideoId;

/// Most bundles returned for one frame.
pub const MAX_BUNDLES: usize = 3;

/// Most items of one type combined into outfit or layered bundles.
const MAX_PER_TYPE: usize = 2;

/// Most accessories added to a main item.
const MAX_ACCESSORIES: usize = 2;

/// Main garments an accessory bundle is built around, in preference order.
const MAIN_TYPES: &[&str] = &["top", "bottom", "dress", "outer"];

/// Accessory types, one of each at most.
const ACCESSORY_TYPES: &[&str] = &["bag", "hat", "shoes", "accessory"];

/// Kind of bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleKind {
    /// Top with bottom
    Outfit,
    /// Top with outerwear
    Layered,
    /// Main garment with accessories
    Accessories,
}

/// A group of products sold together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub id: String,
    pub name: String,
    pub description: String,
    pub total_price: f64,
    pub discount_price: f64,
    pub category: BundleKind,
    /// Image shown for the whole bundle
    pub image_url: String,
    /// Titles of the bundled products
    pub product_ids: Vec<String>,
    pub products: Vec<ProductResult>,
    pub similarity_score: f64,
}

impl Bundle {
    #[allow(clippy::too_many_arguments)]
    fn new(
        id: String,
        name: String,
        description: String,
        category: BundleKind,
        prices: (f64, f64),
        image_url: &str,
        members: &[&Product],
        similarity_score: f64,
    ) -> Self {
        Self {
            id,
            name,
            description,
            total_price: prices.0,
            discount_price: prices.1,
            category,
            image_url: image_url.to_string(),
            product_ids: members.iter().map(|p| p.title.clone()).collect(),
            products: members.iter().map(|&p| ProductResult::from(p.clone())).collect(),
            similarity_score,
        }
    }
}

fn of_type<'a>(products: &'a [Product], object_type: &str) -> Vec<&'a Product> {
    products
        .iter()
        .filter(|p| p.object_type == object_type)
        .collect()
}

/// Group one frame's products into at most [`MAX_BUNDLES`] bundles.
///
/// Outfits pair each of the first two tops with each of the first two
/// bottoms. Layered looks pair tops with outerwear while fewer than three
/// bundles exist. If there is still room, the first main garment found gets
/// up to two accessories.
pub fn build_bundles(products: &[Product], video_id: &VideoId, timestamp: f64) -> Vec<Bundle> {
    let time = format_timestamp_key(timestamp);
    let tops = of_type(products, "top");
    let bottoms = of_type(products, "bottom");
    let outers = of_type(products, "outer");
    let mut bundles = Vec::new();

    for (i, &top) in tops.iter().take(MAX_PER_TYPE).enumerate() {
        for (j, &bottom) in bottoms.iter().take(MAX_PER_TYPE).enumerate() {
            bundles.push(Bundle::new(
                format!("bundle-outfit-{video_id}-{time}-{i}-{j}"),
                format!("Complete Outfit {}", i + 1),
                format!(
                    "Stylish {} and {} combination",
                    top.object_type, bottom.object_type
                ),
                BundleKind::Outfit,
                (99.98, 79.98),
                &top.image_url,
                &[top, bottom],
                0.85,
            ));
        }
    }

    for (i, &top) in tops.iter().take(MAX_PER_TYPE).enumerate() {
        for (j, &outer) in outers.iter().take(MAX_PER_TYPE).enumerate() {
            if bundles.len() >= MAX_BUNDLES {
                break;
            }
            bundles.push(Bundle::new(
                format!("bundle-layered-{video_id}-{time}-{i}-{j}"),
                format!("Layered Look {}", i + 1),
                format!("Stylish {} with {}", top.object_type, outer.object_type),
                BundleKind::Layered,
                (129.98, 99.98),
                &outer.image_url,
                &[top, outer],
                0.8,
            ));
        }
    }

    if bundles.len() < MAX_BUNDLES {
        let accessories: Vec<&Product> = ACCESSORY_TYPES
            .iter()
            .filter_map(|t| products.iter().find(|p| p.object_type == *t))
            .take(MAX_ACCESSORIES)
            .collect();
        let main = MAIN_TYPES
            .iter()
            .find_map(|t| products.iter().find(|p| p.object_type == *t).map(|p| (*t, p)));

        if let (Some((main_type, main)), false) = (main, accessories.is_empty()) {
            let mut members = vec![main];
            members.extend(accessories);
            let extra = (members.len() - 1) as f64;
            bundles.push(Bundle::new(
                format!("bundle-accessories-{video_id}-{time}-{main_type}"),
                "Complete Look".to_string(),
                format!("{} with accessories", title_case(&main.object_type)),
                BundleKind::Accessories,
                (89.98 + extra * 30.0, 69.98 + extra * 20.0),
                &main.image_url,
                &members,
                0.75,
            ));
        }
    }

    bundles.truncate(MAX_BUNDLES);
    bundles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::product::StockStatus;

    fn item(object_type: &str, n: u32) -> Product {
        Product {
            object_type: object_type.to_string(),
            category: Category::Clothing,
            image_url: format!("catalog/{object_type}_{n}.jpg"),
            title: format!("{} {n}", title_case(object_type)),
            stock: StockStatus::InStock,
            direct_url: format!("https://example.com/product/{object_type}-{n}"),
            confidence: 0.8,
        }
    }

    fn kinds(bundles: &[Bundle]) -> Vec<BundleKind> {
        bundles.iter().map(|b| b.category).collect()
    }

    #[test]
    fn test_outfits_pair_tops_with_bottoms() {
        let products = vec![item("top", 1), item("bottom", 1), item("bottom", 2)];
        let bundles = build_bundles(&products, &VideoId::from("v1"), 5.0);

        assert_eq!(kinds(&bundles), vec![BundleKind::Outfit, BundleKind::Outfit]);
        let first = &bundles[0];
        assert_eq!(first.id, "bundle-outfit-v1-5.0-0-0");
        assert_eq!(first.name, "Complete Outfit 1");
        assert_eq!(first.description, "Stylish top and bottom combination");
        assert_eq!(first.image_url, "catalog/top_1.jpg");
        assert_eq!(first.product_ids, vec!["Top 1", "Bottom 1"]);
        assert_eq!(bundles[1].product_ids, vec!["Top 1", "Bottom 2"]);
        assert_eq!(first.total_price, 99.98);
        assert_eq!(first.discount_price, 79.98);
    }

    #[test]
    fn test_outfits_are_capped() {
        let products = vec![
            item("top", 1),
            item("top", 2),
            item("top", 3),
            item("bottom", 1),
            item("bottom", 2),
            item("outer", 1),
        ];
        let bundles = build_bundles(&products, &VideoId::from("v1"), 0.0);

        assert_eq!(bundles.len(), MAX_BUNDLES);
        assert!(bundles.iter().all(|b| b.category == BundleKind::Outfit));
        assert!(bundles.iter().all(|b| b.product_ids[0] != "Top 3"));
    }

    #[test]
    fn test_layered_look_uses_outerwear_image() {
        let products = vec![item("outer", 1), item("top", 1)];
        let bundles = build_bundles(&products, &VideoId::from("v1"), 10.0);

        assert_eq!(kinds(&bundles), vec![BundleKind::Layered]);
        assert_eq!(bundles[0].name, "Layered Look 1");
        assert_eq!(bundles[0].description, "Stylish top with outer");
        assert_eq!(bundles[0].image_url, "catalog/outer_1.jpg");
        assert_eq!(bundles[0].total_price, 129.98);
    }

    #[test]
    fn test_accessories_join_first_main_garment() {
        let products = vec![
            item("dress", 1),
            item("hat", 1),
            item("bag", 1),
            item("shoes", 1),
            item("bag", 2),
        ];
        let bundles = build_bundles(&products, &VideoId::from("v1"), 5.0);

        assert_eq!(kinds(&bundles), vec![BundleKind::Accessories]);
        let bundle = &bundles[0];
        assert_eq!(bundle.id, "bundle-accessories-v1-5.0-dress");
        assert_eq!(bundle.description, "Dress with accessories");
        // One per accessory type, in type order, at most two
        assert_eq!(bundle.product_ids, vec!["Dress 1", "Bag 1", "Hat 1"]);
        assert!((bundle.total_price - 149.98).abs() < 1e-9);
        assert!((bundle.discount_price - 109.98).abs() < 1e-9);
    }

    #[test]
    fn test_accessory_bundle_fills_remaining_slot() {
        let products = vec![item("top", 1), item("bottom", 1), item("outer", 1), item("hat", 1)];
        let bundles = build_bundles(&products, &VideoId::from("v1"), 5.0);

        assert_eq!(
            kinds(&bundles),
            vec![BundleKind::Outfit, BundleKind::Layered, BundleKind::Accessories]
        );
        assert_eq!(bundles[2].product_ids, vec!["Top 1", "Hat 1"]);
    }

    #[test]
    fn test_no_bundles_without_complements() {
        assert!(build_bundles(&[], &VideoId::from("v1"), 0.0).is_empty());
        assert!(build_bundles(&[item("top", 1), item("top", 2)], &VideoId::from("v1"), 0.0).is_empty());
        assert!(build_bundles(&[item("hat", 1)], &VideoId::from("v1"), 0.0).is_empty());
    }

    #[test]
    fn test_bundle_wire_format() {
        let products = vec![item("top", 1), item("bottom", 1)];
        let json = serde_json::to_value(&build_bundles(&products, &VideoId::from("v1"), 5.0)).unwrap();
        assert_eq!(json[0]["category"], "outfit");
        assert_eq!(json[0]["products"][1]["stock"], "In Stock");
        assert!(json[0]["products"][0].get("confidence").is_none());
    }
}
