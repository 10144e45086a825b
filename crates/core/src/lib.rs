pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;

pub use catalog::{Catalog, CatalogError};
pub use domain::product::{CategoryFilter, ProductCode, ProductDetail, ProductSummary};
pub use errors::{ApplicationError, DomainError, InterfaceError};
