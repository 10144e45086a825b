use std::collections::HashMap;

use serde_json::{json, Map, Value};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamType {
    String,
    StringArray,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::StringArray => "array of strings",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub param_type: ParamType,
    pub description: &'static str,
    pub required: bool,
}

impl ParameterSpec {
    pub fn required(name: &'static str, param_type: ParamType, description: &'static str) -> Self {
        Self { name, param_type, description, required: true }
    }
}

/// Object-shaped parameter schema: named, typed fields plus the required subset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParameterSchema {
    pub properties: Vec<ParameterSpec>,
}

impl ParameterSchema {
    pub fn new(properties: Vec<ParameterSpec>) -> Self {
        Self { properties }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn required_names(&self) -> Vec<&'static str> {
        self.properties.iter().filter(|spec| spec.required).map(|spec| spec.name).collect()
    }

    /// JSON-schema rendering as used by OpenAI-compatible `tools[].function.parameters`.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for spec in &self.properties {
            let property = match spec.param_type {
                ParamType::String => json!({ "type": "string", "description": spec.description }),
                ParamType::StringArray => json!({
                    "type": "array",
                    "description": spec.description,
                    "items": { "type": "string" },
                }),
            };
            properties.insert(spec.name.to_string(), property);
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": self.required_names(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolDeclaration {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: ParameterSchema,
    pub response_type: ParamType,
}

/// Closed set of catalog tools; the dispatcher matches on this to pick a handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolKind {
    ListAllProducts,
    SearchByTerm,
    SearchByBrand,
    SearchByCategory,
    DetailsByCodes,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        Self::ListAllProducts,
        Self::SearchByTerm,
        Self::SearchByBrand,
        Self::SearchByCategory,
        Self::DetailsByCodes,
    ];

    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::ListAllProducts => "obtenerListaProductos",
            Self::SearchByTerm => "obtenerInformacionPorBusqueda",
            Self::SearchByBrand => "obtenerInformacionPorMarca",
            Self::SearchByCategory => "obtenerInformacionPorLineaSublinea",
            Self::DetailsByCodes => "obtenerInformacionPorCodigo",
        }
    }

    pub fn declaration(&self) -> ToolDeclaration {
        let (description, parameters) = match self {
            Self::ListAllProducts => (
                "Devuelve un JSON con la lista completa de productos disponibles: código y \
                 descripción de cada producto.",
                ParameterSchema::empty(),
            ),
            Self::SearchByTerm => (
                "Busca productos cuya descripción contiene el término indicado y devuelve un \
                 JSON con su información detallada. El término debe ser una sola palabra en \
                 singular.",
                ParameterSchema::new(vec![ParameterSpec::required(
                    "searchTerm",
                    ParamType::String,
                    "Término de búsqueda: una sola palabra en singular.",
                )]),
            ),
            Self::SearchByBrand => (
                "Busca productos de una marca y devuelve un JSON con su información detallada: \
                 descripción, línea, sublínea, marca, existencia, popularidad, pesos promedio, \
                 piezas por caja y precios.",
                ParameterSchema::new(vec![ParameterSpec::required(
                    "brand",
                    ParamType::String,
                    "Marca a buscar.",
                )]),
            ),
            Self::SearchByCategory => (
                "Busca productos por línea y sublínea y devuelve un JSON con su información \
                 detallada: descripción, línea, sublínea, marca, existencia, popularidad, pesos \
                 promedio, piezas por caja y precios.",
                ParameterSchema::new(vec![
                    ParameterSpec::required(
                        "linea",
                        ParamType::String,
                        "Línea a buscar. Usa un texto vacío '' para incluir todas las líneas.",
                    ),
                    ParameterSpec::required(
                        "sublinea",
                        ParamType::String,
                        "Sublínea a buscar. Usa un texto vacío '' para incluir todas las \
                         sublíneas.",
                    ),
                ]),
            ),
            Self::DetailsByCodes => (
                "Devuelve un JSON con la información detallada de los productos indicados por \
                 código: descripción, línea, sublínea, marca, existencia, popularidad, pesos \
                 promedio, piezas por caja y precios escalonados.",
                ParameterSchema::new(vec![ParameterSpec::required(
                    "productCodes",
                    ParamType::StringArray,
                    "Lista de códigos de producto.",
                )]),
            ),
        };

        ToolDeclaration {
            name: self.wire_name(),
            description,
            parameters,
            response_type: ParamType::String,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolEntry {
    pub declaration: ToolDeclaration,
    pub kind: ToolKind,
}

impl From<ToolKind> for ToolEntry {
    fn from(kind: ToolKind) -> Self {
        Self { declaration: kind.declaration(), kind }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool `{0}` is registered more than once")]
    DuplicateName(String),
}

/// Name to tool mapping built once at startup and shared read-only afterwards.
#[derive(Debug)]
pub struct ToolRegistry {
    declarations: Vec<ToolDeclaration>,
    entries: Vec<ToolEntry>,
    by_name: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    pub fn new(entries: Vec<ToolEntry>) -> Result<Self, RegistryError> {
        let mut by_name = HashMap::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            if by_name.insert(entry.declaration.name, index).is_some() {
                return Err(RegistryError::DuplicateName(entry.declaration.name.to_string()));
            }
        }
        let declarations = entries.iter().map(|entry| entry.declaration.clone()).collect();

        Ok(Self { declarations, entries, by_name })
    }

    /// The five product catalog tools, in the order they are advertised to the model.
    pub fn product_catalog() -> Result<Self, RegistryError> {
        Self::new(ToolKind::ALL.into_iter().map(ToolEntry::from).collect())
    }

    pub fn declarations(&self) -> &[ToolDeclaration] {
        &self.declarations
    }

    pub fn lookup(&self, name: &str) -> Option<&ToolEntry> {
        self.by_name.get(name).map(|index| &self.entries[*index])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use super::{ParamType, RegistryError, ToolEntry, ToolKind, ToolRegistry};

    #[test]
    fn catalog_registry_names_are_unique_and_ordered() {
        let registry = ToolRegistry::product_catalog().expect("registry");

        let names = registry.declarations().iter().map(|decl| decl.name).collect::<Vec<_>>();
        let unique = names.iter().collect::<HashSet<_>>();

        assert_eq!(unique.len(), names.len());
        assert_eq!(
            names,
            vec![
                "obtenerListaProductos",
                "obtenerInformacionPorBusqueda",
                "obtenerInformacionPorMarca",
                "obtenerInformacionPorLineaSublinea",
                "obtenerInformacionPorCodigo",
            ]
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let entries = vec![ToolEntry::from(ToolKind::SearchByBrand), ToolEntry::from(ToolKind::SearchByBrand)];

        assert_eq!(
            ToolRegistry::new(entries).map(|registry| registry.len()),
            Err(RegistryError::DuplicateName("obtenerInformacionPorMarca".to_string()))
        );
    }

    #[test]
    fn lookup_resolves_kind_and_misses_unknown_names() {
        let registry = ToolRegistry::product_catalog().expect("registry");

        assert_eq!(
            registry.lookup("obtenerInformacionPorCodigo").map(|entry| entry.kind),
            Some(ToolKind::DetailsByCodes)
        );
        assert!(registry.lookup("obtenerListaDeProductos").is_none());
    }

    #[test]
    fn every_declaration_returns_a_string() {
        let registry = ToolRegistry::product_catalog().expect("registry");

        assert!(registry.declarations().iter().all(|decl| decl.response_type == ParamType::String));
    }

    #[test]
    fn array_parameters_render_items_schema() {
        let schema = ToolKind::DetailsByCodes.declaration().parameters.to_json_schema();

        assert_eq!(schema["type"], json!("object"));
        assert_eq!(schema["properties"]["productCodes"]["items"], json!({ "type": "string" }));
        assert_eq!(schema["required"], json!(["productCodes"]));
    }

    #[test]
    fn category_tool_requires_both_fields() {
        let declaration = ToolKind::SearchByCategory.declaration();

        assert_eq!(declaration.parameters.required_names(), vec!["linea", "sublinea"]);
    }
}
