use std::str::FromStr;

use async_trait::async_trait;
use copo_core::catalog::{Catalog, CatalogError};
use copo_core::domain::product::{CategoryFilter, ProductCode, ProductDetail, ProductSummary};
use rust_decimal::Decimal;
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::debug;

use super::RepositoryError;
use crate::DbPool;

const DETAIL_COLUMNS: &str = "code, description, line, sub_line, brand, stock_kg, popularity,
    avg_box_weight_kg, pieces_per_box, avg_piece_weight_kg,
    retail_price, retail_scale_kg, half_wholesale_price, half_wholesale_scale_kg,
    wholesale_price, wholesale_scale_kg, special_price";

pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn list_summaries(&self) -> Result<Vec<ProductSummary>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT code, description FROM product
             WHERE active = 1
             ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(ProductSummary {
                    code: ProductCode(get_column(row, "code")?),
                    description: get_column(row, "description")?,
                })
            })
            .collect()
    }

    async fn codes_matching_term(&self, term: &str) -> Result<Vec<ProductCode>, RepositoryError> {
        let needle = term.trim().to_lowercase();
        let rows = sqlx::query(
            "SELECT code, description FROM product
             WHERE active = 1
             ORDER BY popularity DESC, code",
        )
        .fetch_all(&self.pool)
        .await?;

        // SQLite LIKE folds ASCII only; accented descriptions are folded here instead.
        let mut codes = Vec::new();
        for row in &rows {
            let description: String = get_column(row, "description")?;
            if description.to_lowercase().contains(&needle) {
                codes.push(ProductCode(get_column(row, "code")?));
            }
        }
        Ok(codes)
    }

    async fn codes_for_brand(&self, brand: &str) -> Result<Vec<ProductCode>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT code FROM product
             WHERE active = 1 AND brand = ?1 COLLATE NOCASE
             ORDER BY popularity DESC, code",
        )
        .bind(brand.trim())
        .fetch_all(&self.pool)
        .await?;

        rows_to_codes(&rows)
    }

    async fn codes_for_category(
        &self,
        filter: &CategoryFilter,
    ) -> Result<Vec<ProductCode>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT code FROM product
             WHERE active = 1
               AND (?1 = '' OR line = ?1 COLLATE NOCASE)
               AND (?2 = '' OR sub_line = ?2 COLLATE NOCASE)
             ORDER BY code",
        )
        .bind(filter.line.trim())
        .bind(filter.sub_line.trim())
        .fetch_all(&self.pool)
        .await?;

        rows_to_codes(&rows)
    }

    async fn details(&self, codes: &[ProductCode]) -> Result<Vec<ProductDetail>, RepositoryError> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {DETAIL_COLUMNS} FROM product WHERE active = 1 AND code IN ("));
        let mut separated = builder.separated(", ");
        for code in codes {
            separated.push_bind(code.as_str());
        }
        separated.push_unseparated(") ORDER BY popularity DESC, code");

        let rows = builder.build().fetch_all(&self.pool).await?;
        debug!(requested = codes.len(), found = rows.len(), "loaded product details");

        rows.iter().map(row_to_detail).collect()
    }
}

#[async_trait]
impl Catalog for SqlCatalogRepository {
    async fn list_all_products(&self) -> Result<Vec<ProductSummary>, CatalogError> {
        Ok(self.list_summaries().await?)
    }

    async fn codes_by_search_term(&self, term: &str) -> Result<Vec<ProductCode>, CatalogError> {
        Ok(self.codes_matching_term(term).await?)
    }

    async fn codes_by_brand(&self, brand: &str) -> Result<Vec<ProductCode>, CatalogError> {
        Ok(self.codes_for_brand(brand).await?)
    }

    async fn codes_by_category(
        &self,
        filter: &CategoryFilter,
    ) -> Result<Vec<ProductCode>, CatalogError> {
        Ok(self.codes_for_category(filter).await?)
    }

    async fn details_by_codes(
        &self,
        codes: &[ProductCode],
    ) -> Result<Vec<ProductDetail>, CatalogError> {
        Ok(self.details(codes).await?)
    }
}

fn get_column<T>(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<T, RepositoryError>
where
    T: for<'r> sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(column).map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

fn get_decimal(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<Decimal, RepositoryError> {
    let raw: String = get_column(row, column)?;
    Decimal::from_str(raw.trim())
        .map_err(|e| RepositoryError::Decode(format!("{column}: `{raw}` is not a decimal: {e}")))
}

fn rows_to_codes(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<ProductCode>, RepositoryError> {
    rows.iter().map(|row| get_column(row, "code").map(ProductCode)).collect()
}

fn row_to_detail(row: &sqlx::sqlite::SqliteRow) -> Result<ProductDetail, RepositoryError> {
    Ok(ProductDetail {
        code: ProductCode(get_column(row, "code")?),
        description: get_column(row, "description")?,
        line: get_column(row, "line")?,
        sub_line: get_column(row, "sub_line")?,
        brand: get_column(row, "brand")?,
        stock_kg: get_decimal(row, "stock_kg")?,
        popularity: get_column(row, "popularity")?,
        avg_box_weight_kg: get_decimal(row, "avg_box_weight_kg")?,
        pieces_per_box: get_column(row, "pieces_per_box")?,
        avg_piece_weight_kg: get_decimal(row, "avg_piece_weight_kg")?,
        retail_price: get_decimal(row, "retail_price")?,
        retail_scale_kg: get_decimal(row, "retail_scale_kg")?,
        half_wholesale_price: get_decimal(row, "half_wholesale_price")?,
        half_wholesale_scale_kg: get_decimal(row, "half_wholesale_scale_kg")?,
        wholesale_price: get_decimal(row, "wholesale_price")?,
        wholesale_scale_kg: get_decimal(row, "wholesale_scale_kg")?,
        special_price: get_decimal(row, "special_price")?,
    })
}

#[cfg(test)]
mod tests {
    use copo_core::catalog::{Catalog, CatalogError};
    use copo_core::domain::product::{CategoryFilter, ProductCode};
    use rust_decimal::Decimal;

    use super::SqlCatalogRepository;
    use crate::{connect_with_settings, migrations, DbPool, DemoCatalogSeed};

    async fn seeded_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        DemoCatalogSeed::load(&pool).await.expect("seed demo catalog");
        pool
    }

    fn codes(values: &[&str]) -> Vec<ProductCode> {
        values.iter().map(|value| ProductCode::from(*value)).collect()
    }

    #[tokio::test]
    async fn list_all_products_skips_inactive_rows() {
        let repo = SqlCatalogRepository::new(seeded_pool().await);

        let products = repo.list_all_products().await.expect("list products");

        assert_eq!(products.len(), 7);
        assert!(products.iter().all(|product| product.code.as_str() != "EMB-002"));
        assert_eq!(products[0].code.as_str(), "CER-001");
    }

    #[tokio::test]
    async fn search_term_is_case_insensitive_and_ordered_by_popularity() {
        let repo = SqlCatalogRepository::new(seeded_pool().await);

        let found = repo.codes_by_search_term("res").await.expect("search");

        assert_eq!(found, codes(&["RES-001", "RES-002", "RES-003"]));
    }

    #[tokio::test]
    async fn search_term_folds_accented_letters() {
        let pool = seeded_pool().await;
        sqlx::query(
            "INSERT INTO product (code, description, line, sub_line, brand, popularity)
             VALUES ('JAM-001', 'JAMÓN DE PIERNA', 'EMBUTIDOS', 'JAMONES', 'PALMA', 40)",
        )
        .execute(&pool)
        .await
        .expect("insert accented row");
        let repo = SqlCatalogRepository::new(pool);

        let lower = repo.codes_by_search_term("jamón").await.expect("search");
        let mixed = repo.codes_by_search_term(" Jamón de ").await.expect("search");

        assert_eq!(lower, codes(&["JAM-001"]));
        assert_eq!(mixed, codes(&["JAM-001"]));
    }

    #[tokio::test]
    async fn search_term_treats_like_wildcards_literally() {
        let repo = SqlCatalogRepository::new(seeded_pool().await);

        let found = repo.codes_by_search_term("%").await.expect("search");

        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn brand_lookup_ignores_case() {
        let repo = SqlCatalogRepository::new(seeded_pool().await);

        let found = repo.codes_by_brand("zwan").await.expect("brand lookup");

        assert_eq!(found, codes(&["CER-001", "EMB-001"]));
    }

    #[tokio::test]
    async fn empty_category_filter_returns_whole_active_catalog() {
        let repo = SqlCatalogRepository::new(seeded_pool().await);

        let everything = repo.codes_by_category(&CategoryFilter::default()).await.expect("category");
        let listed = repo
            .list_all_products()
            .await
            .expect("list")
            .into_iter()
            .map(|product| product.code)
            .collect::<Vec<_>>();

        assert_eq!(everything, listed);
    }

    #[tokio::test]
    async fn category_filter_narrows_by_line_and_sub_line() {
        let repo = SqlCatalogRepository::new(seeded_pool().await);

        let beef = repo.codes_by_category(&CategoryFilter::new("RES", "")).await.expect("line");
        let beef_cuts =
            repo.codes_by_category(&CategoryFilter::new("res", "cortes")).await.expect("sub-line");

        assert_eq!(beef, codes(&["RES-001", "RES-002", "RES-003"]));
        assert_eq!(beef_cuts, codes(&["RES-001", "RES-003"]));
    }

    #[tokio::test]
    async fn details_decode_decimal_columns() {
        let repo = SqlCatalogRepository::new(seeded_pool().await);

        let details = repo.details_by_codes(&codes(&["RES-001", "NOPE"])).await.expect("details");

        assert_eq!(details.len(), 1);
        let detail = &details[0];
        assert_eq!(detail.brand, "SUKARNE");
        assert_eq!(detail.retail_price, Decimal::new(28900, 2));
        assert_eq!(detail.stock_kg, Decimal::new(42050, 2));
        assert_eq!(detail.pieces_per_box, 6);
    }

    #[tokio::test]
    async fn details_for_empty_code_list_is_empty() {
        let repo = SqlCatalogRepository::new(seeded_pool().await);

        let details = repo.details_by_codes(&[]).await.expect("details");

        assert!(details.is_empty());
    }

    #[tokio::test]
    async fn malformed_decimal_surfaces_decode_error() {
        let pool = seeded_pool().await;
        sqlx::query("UPDATE product SET retail_price = 'n/a' WHERE code = 'POL-001'")
            .execute(&pool)
            .await
            .expect("corrupt row");
        let repo = SqlCatalogRepository::new(pool);

        let error = repo.details_by_codes(&codes(&["POL-001"])).await.expect_err("decode error");

        assert!(matches!(error, CatalogError::Decode(ref message) if message.contains("retail_price")));
    }

    #[tokio::test]
    async fn closed_pool_surfaces_query_error() {
        let pool = seeded_pool().await;
        pool.close().await;
        let repo = SqlCatalogRepository::new(pool);

        let error = repo.list_all_products().await.expect_err("closed pool");

        assert!(matches!(error, CatalogError::Query(_)));
    }
}
