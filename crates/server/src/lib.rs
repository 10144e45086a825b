//! HTTP adapter exposing the product assistant as an OpenAI-style chat completions endpoint.

pub mod bootstrap;
pub mod chat;
pub mod formatter;
pub mod health;
pub mod inspect;
pub mod router;

pub use bootstrap::{bootstrap, bootstrap_with_config, Application, BootstrapError};
pub use formatter::ResponseFormatter;
pub use router::router;
