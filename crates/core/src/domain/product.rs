use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductCode(pub String);

impl ProductCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProductCode {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One row of the catalog listing handed to the model: code and description only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub code: ProductCode,
    pub description: String,
}

/// Full product record returned by the detail lookup.
///
/// Scales are the upper bound in kilograms for which the matching price applies:
/// retail from zero up to `retail_scale_kg`, half-wholesale up to
/// `half_wholesale_scale_kg`, and so on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub code: ProductCode,
    pub description: String,
    pub line: String,
    pub sub_line: String,
    pub brand: String,
    pub stock_kg: Decimal,
    pub popularity: i64,
    pub avg_box_weight_kg: Decimal,
    pub pieces_per_box: i64,
    pub avg_piece_weight_kg: Decimal,
    pub retail_price: Decimal,
    pub retail_scale_kg: Decimal,
    pub half_wholesale_price: Decimal,
    pub half_wholesale_scale_kg: Decimal,
    pub wholesale_price: Decimal,
    pub wholesale_scale_kg: Decimal,
    pub special_price: Decimal,
}

impl ProductDetail {
    pub fn summary(&self) -> ProductSummary {
        ProductSummary { code: self.code.clone(), description: self.description.clone() }
    }
}

/// Line/sub-line filter where an empty value matches every line or sub-line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryFilter {
    pub line: String,
    pub sub_line: String,
}

impl CategoryFilter {
    pub fn new(line: impl Into<String>, sub_line: impl Into<String>) -> Self {
        Self { line: line.into(), sub_line: sub_line.into() }
    }

    pub fn matches(&self, line: &str, sub_line: &str) -> bool {
        field_matches(&self.line, line) && field_matches(&self.sub_line, sub_line)
    }
}

fn field_matches(filter: &str, value: &str) -> bool {
    let filter = filter.trim();
    filter.is_empty() || filter.eq_ignore_ascii_case(value.trim())
}

#[cfg(test)]
mod tests {
    use super::{CategoryFilter, ProductCode};

    #[test]
    fn empty_category_filter_matches_everything() {
        let filter = CategoryFilter::default();
        assert!(filter.matches("RES", "CORTES"));
        assert!(filter.matches("", ""));
    }

    #[test]
    fn category_filter_matches_line_only() {
        let filter = CategoryFilter::new("res", "");
        assert!(filter.matches("RES", "CORTES"));
        assert!(filter.matches("RES", "MOLIDA"));
        assert!(!filter.matches("CERDO", "CORTES"));
    }

    #[test]
    fn product_code_serializes_as_plain_string() {
        let json = serde_json::to_string(&ProductCode::from("A-100")).expect("serialize");
        assert_eq!(json, "\"A-100\"");
    }
}
