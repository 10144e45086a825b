use copo_core::domain::product::{ProductCode, ProductDetail};
use rust_decimal::Decimal;
use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Demo rows as `(code, active)`; the SQL fixture must insert exactly these.
pub const DEMO_CODES: &[(&str, bool)] = &[
    ("CER-001", true),
    ("CER-002", true),
    ("EMB-001", true),
    ("EMB-002", false),
    ("POL-001", true),
    ("RES-001", true),
    ("RES-002", true),
    ("RES-003", true),
];

/// Deterministic meat-distributor catalog used by `copo seed`, the doctor check and tests.
pub struct DemoCatalogSeed;

impl DemoCatalogSeed {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_catalog.sql");

    /// Loads the demo rows. Safe to run repeatedly.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            products_seeded: DEMO_CODES.len(),
            active_products: DEMO_CODES.iter().filter(|(_, active)| *active).count(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::with_capacity(DEMO_CODES.len());

        for (code, active) in DEMO_CODES {
            let present: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM product WHERE code = ?1 AND active = ?2)",
            )
            .bind(*code)
            .bind(i64::from(*active))
            .fetch_one(pool)
            .await?;
            checks.push((*code, present == 1));
        }

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }

    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;
        for (code, _) in DEMO_CODES {
            sqlx::query("DELETE FROM product WHERE code = ?1").bind(*code).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub products_seeded: usize,
    pub active_products: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

/// Active demo products as domain values, matching the SQL fixture row for row.
pub fn demo_products() -> Vec<ProductDetail> {
    vec![
        demo("RES-001", "ARRACHERA DE RES MARINADA", ("RES", "CORTES"), "SUKARNE", 42050, 95)
            .packaging(1200, 6, 200)
            .prices([28900, 26900, 24900, 23900]),
        demo("RES-002", "CARNE MOLIDA DE RES 80/20", ("RES", "MOLIDA"), "SUKARNE", 31000, 88)
            .packaging(1000, 10, 100)
            .prices([15900, 14900, 13900, 13200]),
        demo("RES-003", "RIB EYE DE RES", ("RES", "CORTES"), "ANGUS SELECT", 8525, 70)
            .packaging(1550, 5, 310)
            .prices([45900, 43900, 41900, 40900]),
        demo("CER-001", "CHULETA AHUMADA DE CERDO", ("CERDO", "AHUMADOS"), "ZWAN", 15000, 80)
            .packaging(900, 12, 75)
            .prices([13900, 12900, 11900, 11400]),
        demo("CER-002", "PIERNA DE CERDO SIN HUESO", ("CERDO", "CORTES"), "KEKEN", 50000, 60)
            .packaging(1800, 4, 450)
            .prices([11900, 11200, 10500, 9900]),
        demo("POL-001", "PECHUGA DE POLLO SIN HUESO", ("POLLO", "CORTES"), "BACHOCO", 27575, 99)
            .packaging(2000, 10, 200)
            .prices([12900, 12100, 11400, 10900]),
        demo("EMB-001", "SALCHICHA DE PAVO", ("EMBUTIDOS", "SALCHICHAS"), "ZWAN", 6000, 55)
            .packaging(500, 20, 25)
            .prices([8900, 8400, 7900, 7500]),
    ]
}

fn cents(value: i64) -> Decimal {
    Decimal::new(value, 2)
}

fn demo(
    code: &str,
    description: &str,
    (line, sub_line): (&str, &str),
    brand: &str,
    stock_cents: i64,
    popularity: i64,
) -> ProductDetail {
    ProductDetail {
        code: ProductCode::from(code),
        description: description.to_owned(),
        line: line.to_owned(),
        sub_line: sub_line.to_owned(),
        brand: brand.to_owned(),
        stock_kg: cents(stock_cents),
        popularity,
        avg_box_weight_kg: Decimal::ZERO,
        pieces_per_box: 0,
        avg_piece_weight_kg: Decimal::ZERO,
        retail_price: Decimal::ZERO,
        retail_scale_kg: Decimal::from(10),
        half_wholesale_price: Decimal::ZERO,
        half_wholesale_scale_kg: Decimal::from(50),
        wholesale_price: Decimal::ZERO,
        wholesale_scale_kg: Decimal::from(200),
        special_price: Decimal::ZERO,
    }
}

trait DemoProductExt {
    fn packaging(self, box_cents: i64, pieces: i64, piece_cents: i64) -> Self;
    fn prices(self, prices: [i64; 4]) -> Self;
}

impl DemoProductExt for ProductDetail {
    fn packaging(mut self, box_cents: i64, pieces: i64, piece_cents: i64) -> Self {
        self.avg_box_weight_kg = cents(box_cents);
        self.pieces_per_box = pieces;
        self.avg_piece_weight_kg = cents(piece_cents);
        self
    }

    fn prices(mut self, [retail, half_wholesale, wholesale, special]: [i64; 4]) -> Self {
        self.retail_price = cents(retail);
        self.half_wholesale_price = cents(half_wholesale);
        self.wholesale_price = cents(wholesale);
        self.special_price = cents(special);
        self
    }
}
