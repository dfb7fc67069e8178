//! Wire-key conversion between the camelCase used by callers and the
//! snake_case the backend speaks.
//!
//! Conversion is shallow: nested objects such as free-form
//! `specifications` keep their keys.

use serde_json::{Map, Value};

/// `tenantId` → `tenant_id`. Already-snake keys pass through.
///
/// A run of capitals is one word: `seoURL` → `seo_url`,
/// `HTMLParser` → `html_parser`.
pub fn to_snake_case(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);
    for (i, &ch) in chars.iter().enumerate() {
        if !ch.is_ascii_uppercase() {
            out.push(ch);
            continue;
        }
        if i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|c| c.is_ascii_lowercase());
            let word_start = prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower);
            if word_start {
                out.push('_');
            }
        }
        out.push(ch.to_ascii_lowercase());
    }
    out
}

/// `tenant_id` → `tenantId`. Already-camel keys pass through.
pub fn to_camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for ch in key.chars() {
        if ch == '_' && !out.is_empty() {
            upper_next = true;
        } else if upper_next {
            out.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Renames the top-level keys of an object to snake_case.
pub fn snake_case_keys(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter().map(|(k, v)| (to_snake_case(&k), v)).collect()
}

/// Renames the top-level keys of an object to camelCase.
pub fn camel_case_keys(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter().map(|(k, v)| (to_camel_case(&k), v)).collect()
}

/// [`camel_case_keys`] for a value: objects are converted, arrays have each
/// object element converted, anything else is returned unchanged.
pub fn camel_case_value(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(camel_case_keys(map)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Value::Object(camel_case_keys(map)),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("tenantId"), "tenant_id");
        assert_eq!(to_snake_case("seoKeywords"), "seo_keywords");
        assert_eq!(to_snake_case("stock_quantity"), "stock_quantity");
        assert_eq!(to_snake_case("Name"), "name");
    }

    #[test]
    fn test_snake_case_keeps_capital_runs_together() {
        assert_eq!(to_snake_case("seoURL"), "seo_url");
        assert_eq!(to_snake_case("HTMLParser"), "html_parser");
        assert_eq!(to_snake_case("productID"), "product_id");
        assert_eq!(to_snake_case("sku2Code"), "sku2_code");
        assert_eq!(to_camel_case(&to_snake_case("seoURL")), "seoUrl");
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(to_camel_case("tenant_id"), "tenantId");
        assert_eq!(to_camel_case("customization_options"), "customizationOptions");
        assert_eq!(to_camel_case("longDescription"), "longDescription");
        assert_eq!(to_camel_case("_private"), "_private");
    }

    #[test]
    fn test_conversion_is_shallow() {
        let value = camel_case_value(json!({
            "price_unit": "each",
            "specifications": {"inner_key": 1}
        }));
        assert_eq!(value, json!({"priceUnit": "each", "specifications": {"inner_key": 1}}));
    }

    #[test]
    fn test_snake_then_camel_restores_keys() {
        let original = json!({"minOrder": 5, "leadTime": "2w"});
        let snake = snake_case_keys(original.as_object().cloned().unwrap());
        assert!(snake.contains_key("min_order"));
        assert_eq!(Value::Object(camel_case_keys(snake)), original);
    }
}
