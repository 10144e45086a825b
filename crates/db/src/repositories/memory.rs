use std::collections::BTreeMap;

use async_trait::async_trait;
use copo_core::catalog::{Catalog, CatalogError};
use copo_core::domain::product::{CategoryFilter, ProductCode, ProductDetail, ProductSummary};
use tokio::sync::RwLock;

/// Catalog held in memory, ordered by product code. Mirrors the SQL repository's filters.
#[derive(Default)]
pub struct InMemoryCatalog {
    products: RwLock<BTreeMap<ProductCode, ProductDetail>>,
}

impl InMemoryCatalog {
    pub fn with_products(products: impl IntoIterator<Item = ProductDetail>) -> Self {
        let products =
            products.into_iter().map(|product| (product.code.clone(), product)).collect();
        Self { products: RwLock::new(products) }
    }

    pub async fn insert(&self, product: ProductDetail) {
        let mut products = self.products.write().await;
        products.insert(product.code.clone(), product);
    }

    async fn codes_where<F>(&self, predicate: F) -> Vec<ProductCode>
    where
        F: Fn(&ProductDetail) -> bool,
    {
        let products = self.products.read().await;
        let mut matched = products.values().filter(|product| predicate(product)).collect::<Vec<_>>();
        matched.sort_by(|left, right| {
            right.popularity.cmp(&left.popularity).then_with(|| left.code.cmp(&right.code))
        });
        matched.into_iter().map(|product| product.code.clone()).collect()
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn list_all_products(&self) -> Result<Vec<ProductSummary>, CatalogError> {
        let products = self.products.read().await;
        Ok(products.values().map(ProductDetail::summary).collect())
    }

    async fn codes_by_search_term(&self, term: &str) -> Result<Vec<ProductCode>, CatalogError> {
        let needle = term.trim().to_lowercase();
        Ok(self.codes_where(|product| product.description.to_lowercase().contains(&needle)).await)
    }

    async fn codes_by_brand(&self, brand: &str) -> Result<Vec<ProductCode>, CatalogError> {
        let brand = brand.trim();
        Ok(self.codes_where(|product| product.brand.eq_ignore_ascii_case(brand)).await)
    }

    async fn codes_by_category(
        &self,
        filter: &CategoryFilter,
    ) -> Result<Vec<ProductCode>, CatalogError> {
        let products = self.products.read().await;
        Ok(products
            .values()
            .filter(|product| filter.matches(&product.line, &product.sub_line))
            .map(|product| product.code.clone())
            .collect())
    }

    async fn details_by_codes(
        &self,
        codes: &[ProductCode],
    ) -> Result<Vec<ProductDetail>, CatalogError> {
        let products = self.products.read().await;
        let mut found =
            codes.iter().filter_map(|code| products.get(code)).cloned().collect::<Vec<_>>();
        found.sort_by(|left, right| {
            right.popularity.cmp(&left.popularity).then_with(|| left.code.cmp(&right.code))
        });
        found.dedup_by(|left, right| left.code == right.code);
        Ok(found)
    }
}
