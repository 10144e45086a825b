use copo_core::catalog::CatalogError;
use thiserror::Error;

pub mod memory;
pub mod product;

pub use memory::InMemoryCatalog;
pub use product::SqlCatalogRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for CatalogError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Database(error) => Self::Query(error.to_string()),
            RepositoryError::Decode(message) => Self::Decode(message),
        }
    }
}
