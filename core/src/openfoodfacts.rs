use serde::Deserialize;
use serde_json::Value;

use crate::search::{RawRecord, SearchPage};

/// Shown in place of a product name the service left out.
pub const UNNAMED_PRODUCT: &str = "N/A";

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub count: Option<Value>,
    #[serde(default)]
    pub products: Vec<ProductData>,
}

#[derive(Debug, Deserialize)]
pub struct ProductData {
    pub product_name: Option<String>,
    pub quantity: Option<String>,
    pub nutriments: Option<Nutriments>,
}

/// Per-100g values. The service sends numbers, numeric strings, or `""`.
#[derive(Debug, Default, Deserialize)]
pub struct Nutriments {
    #[serde(rename = "energy-kcal_100g")]
    pub energy_kcal: Option<Value>,
    /// Older spelling, consulted only when the hyphenated key is absent.
    #[serde(rename = "energy_kcal_100g")]
    pub energy_kcal_legacy: Option<Value>,
    #[serde(rename = "fat_100g")]
    pub fat: Option<Value>,
    #[serde(rename = "carbohydrates_100g")]
    pub carbohydrates: Option<Value>,
    #[serde(rename = "proteins_100g")]
    pub proteins: Option<Value>,
}

/// A finite number, or `None` for null, `""`, and anything unparseable.
fn number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn count(value: Option<&Value>) -> usize {
    match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| usize::try_from(n).ok()).unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

#[must_use]
pub fn product_to_record(p: ProductData) -> RawRecord {
    let name = p
        .product_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| UNNAMED_PRODUCT.to_string());
    let n = p.nutriments.unwrap_or_default();
    let calories = match n.energy_kcal.as_ref() {
        Some(v) if !v.is_null() => number(Some(v)),
        _ => number(n.energy_kcal_legacy.as_ref()),
    };

    RawRecord {
        name,
        quantity: p.quantity.filter(|q| !q.trim().is_empty()),
        calories,
        fat: number(n.fat.as_ref()),
        carbs: number(n.carbohydrates.as_ref()),
        protein: number(n.proteins.as_ref()),
    }
}

#[must_use]
pub fn response_to_page(resp: SearchResponse) -> SearchPage {
    SearchPage {
        total_count: count(resp.count.as_ref()),
        records: resp.products.into_iter().map(product_to_record).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> SearchPage {
        response_to_page(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_complete_product() {
        let page = parse(
            r#"{"count": 1234, "products": [{
                "product_name": "Nutella",
                "quantity": "400 g",
                "nutriments": {"energy-kcal_100g": 539, "fat_100g": 30.9,
                               "carbohydrates_100g": 57.5, "proteins_100g": 6.3}
            }]}"#,
        );
        assert_eq!(page.total_count, 1234);
        let r = &page.records[0];
        assert_eq!(r.name, "Nutella");
        assert_eq!(r.quantity.as_deref(), Some("400 g"));
        let p = r.profile().unwrap();
        assert!((p.calories - 539.0).abs() < f64::EPSILON);
        assert!((p.protein - 6.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_legacy_energy_key_and_numeric_strings() {
        let page = parse(
            r#"{"count": "2", "products": [{
                "product_name": "Oat Drink",
                "nutriments": {"energy_kcal_100g": "46", "fat_100g": "1.5",
                               "carbohydrates_100g": "6.7", "proteins_100g": "0.3"}
            }]}"#,
        );
        assert_eq!(page.total_count, 2);
        let p = page.records[0].profile().unwrap();
        assert!((p.calories - 46.0).abs() < f64::EPSILON);
        assert!((p.fat - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_string_counts_as_missing() {
        let page = parse(
            r#"{"products": [{
                "product_name": "Mystery Bar",
                "nutriments": {"energy-kcal_100g": 400, "fat_100g": "",
                               "carbohydrates_100g": 50, "proteins_100g": 5}
            }]}"#,
        );
        assert_eq!(page.total_count, 0);
        assert!(page.records[0].fat.is_none());
        assert!(page.records[0].profile().is_none());
    }

    #[test]
    fn test_missing_name_and_nutriments() {
        let page = parse(r#"{"count": 1, "products": [{"quantity": ""}]}"#);
        let r = &page.records[0];
        assert_eq!(r.name, UNNAMED_PRODUCT);
        assert!(r.quantity.is_none());
        assert!(r.calories.is_none());
    }

    #[test]
    fn test_empty_response() {
        let page = parse("{}");
        assert!(page.records.is_empty());
        assert_eq!(page.total_count, 0);
    }
}
