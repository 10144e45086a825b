use std::sync::Arc;

use copo_core::catalog::Catalog;
use copo_core::domain::product::{CategoryFilter, ProductCode};
use serde::Serialize;
use tracing::{debug, warn};

use crate::arguments::{ArgumentError, ArgumentMap};
use crate::llm::ToolCall;
use crate::tools::{ToolKind, ToolRegistry};

pub const LIST_FAILED: &str = "ocurrió un error al obtener la lista de códigos";
pub const SEARCH_FAILED: &str = "ocurrió un problema al obtener la lista de códigos por búsqueda";
pub const BRAND_FAILED: &str = "ocurrió un problema al obtener la lista de códigos por marca";
pub const CATEGORY_FAILED: &str = "ocurrió un problema al obtener la lista de códigos por línea";
pub const CODES_ARGUMENT_FAILED: &str = "ocurrió un problema al obtener información de los códigos";
pub const DETAILS_FAILED: &str = "ocurrió un error al obtener la información de los productos";

impl ToolKind {
    /// Message fed back to the model when this tool's arguments cannot be extracted.
    fn argument_failure(&self) -> &'static str {
        match self {
            Self::ListAllProducts => LIST_FAILED,
            Self::SearchByTerm => SEARCH_FAILED,
            Self::SearchByBrand => BRAND_FAILED,
            Self::SearchByCategory => CATEGORY_FAILED,
            Self::DetailsByCodes => CODES_ARGUMENT_FAILED,
        }
    }
}

pub fn unknown_tool_message(name: &str) -> String {
    format!("la herramienta `{name}` no existe; usa una de las herramientas disponibles")
}

/// Executes tool calls against the catalog. Every outcome, including failures, is a string
/// that goes back to the model.
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub async fn invoke(&self, call: &ToolCall, catalog: &dyn Catalog) -> String {
        let Some(entry) = self.registry.lookup(&call.name) else {
            warn!(event_name = "tool.unknown", tool = %call.name, "model requested an unknown tool");
            return unknown_tool_message(&call.name);
        };

        if let Err(error) = call.args.validate(&entry.declaration.parameters) {
            return argument_failure(entry.kind, &error);
        }

        debug!(event_name = "tool.invoke", tool = %call.name, "dispatching tool call");
        match entry.kind {
            ToolKind::ListAllProducts => list_all_products(catalog).await,
            ToolKind::SearchByTerm => search_by_term(&call.args, catalog).await,
            ToolKind::SearchByBrand => search_by_brand(&call.args, catalog).await,
            ToolKind::SearchByCategory => search_by_category(&call.args, catalog).await,
            ToolKind::DetailsByCodes => details_by_codes(&call.args, catalog).await,
        }
    }
}

fn argument_failure(kind: ToolKind, error: &ArgumentError) -> String {
    warn!(
        event_name = "tool.arguments_invalid",
        tool = kind.wire_name(),
        error = %error,
        "could not extract tool arguments"
    );
    kind.argument_failure().to_string()
}

fn to_json<T: Serialize>(value: &T, failure: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|error| {
        warn!(error = %error, "could not serialize tool result");
        failure.to_string()
    })
}

async fn list_all_products(catalog: &dyn Catalog) -> String {
    match catalog.list_all_products().await {
        Ok(products) => to_json(&products, LIST_FAILED),
        Err(error) => {
            warn!(event_name = "tool.catalog_failed", error = %error, "listing products failed");
            LIST_FAILED.to_string()
        }
    }
}

async fn search_by_term(args: &ArgumentMap, catalog: &dyn Catalog) -> String {
    let term = match args.text("searchTerm") {
        Ok(term) => term,
        Err(error) => return argument_failure(ToolKind::SearchByTerm, &error),
    };
    match catalog.codes_by_search_term(term).await {
        Ok(codes) => product_details(&codes, catalog).await,
        Err(error) => {
            warn!(event_name = "tool.catalog_failed", error = %error, "search by term failed");
            SEARCH_FAILED.to_string()
        }
    }
}

async fn search_by_brand(args: &ArgumentMap, catalog: &dyn Catalog) -> String {
    let brand = match args.text("brand") {
        Ok(brand) => brand,
        Err(error) => return argument_failure(ToolKind::SearchByBrand, &error),
    };
    match catalog.codes_by_brand(brand).await {
        Ok(codes) => product_details(&codes, catalog).await,
        Err(error) => {
            warn!(event_name = "tool.catalog_failed", error = %error, "search by brand failed");
            BRAND_FAILED.to_string()
        }
    }
}

async fn search_by_category(args: &ArgumentMap, catalog: &dyn Catalog) -> String {
    let filter = match (args.text("linea"), args.text("sublinea")) {
        (Ok(line), Ok(sub_line)) => CategoryFilter::new(line, sub_line),
        (Err(error), _) | (_, Err(error)) => {
            return argument_failure(ToolKind::SearchByCategory, &error)
        }
    };
    match catalog.codes_by_category(&filter).await {
        Ok(codes) => product_details(&codes, catalog).await,
        Err(error) => {
            warn!(event_name = "tool.catalog_failed", error = %error, "search by category failed");
            CATEGORY_FAILED.to_string()
        }
    }
}

async fn details_by_codes(args: &ArgumentMap, catalog: &dyn Catalog) -> String {
    match args.text_list("productCodes") {
        Ok(codes) => {
            let codes = codes.into_iter().map(ProductCode).collect::<Vec<_>>();
            product_details(&codes, catalog).await
        }
        Err(error) => argument_failure(ToolKind::DetailsByCodes, &error),
    }
}

/// Detail lookup shared by the explicit-code tool and the three search tools.
async fn product_details(codes: &[ProductCode], catalog: &dyn Catalog) -> String {
    if codes.is_empty() {
        return "[]".to_string();
    }
    match catalog.details_by_codes(codes).await {
        Ok(details) => to_json(&details, DETAILS_FAILED),
        Err(error) => {
            warn!(event_name = "tool.catalog_failed", error = %error, "detail lookup failed");
            DETAILS_FAILED.to_string()
        }
    }
}
