use async_trait::async_trait;
use thiserror::Error;

use crate::domain::product::{CategoryFilter, ProductCode, ProductDetail, ProductSummary};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog query failed: {0}")]
    Query(String),
    #[error("catalog row could not be decoded: {0}")]
    Decode(String),
}

/// Read-only product catalog consumed by the tool handlers.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn list_all_products(&self) -> Result<Vec<ProductSummary>, CatalogError>;

    async fn codes_by_search_term(&self, term: &str) -> Result<Vec<ProductCode>, CatalogError>;

    async fn codes_by_brand(&self, brand: &str) -> Result<Vec<ProductCode>, CatalogError>;

    async fn codes_by_category(
        &self,
        filter: &CategoryFilter,
    ) -> Result<Vec<ProductCode>, CatalogError>;

    /// Returns the details for `codes`, skipping codes that do not exist.
    async fn details_by_codes(
        &self,
        codes: &[ProductCode],
    ) -> Result<Vec<ProductDetail>, CatalogError>;
}
