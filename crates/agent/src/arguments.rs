use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::tools::{ParamType, ParameterSchema};

/// One argument value as sent by the model.
#[derive(Clone, Debug, PartialEq)]
pub enum ArgValue {
    Text(String),
    /// Array whose elements are all strings.
    TextList(Vec<String>),
    /// Array with at least one non-string element.
    List(Vec<Value>),
    Unsupported(Value),
}

impl ArgValue {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            Value::Array(items) if items.iter().all(Value::is_string) => Self::TextList(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(text) => Some(text),
                        _ => None,
                    })
                    .collect(),
            ),
            Value::Array(items) => Self::List(items),
            other => Self::Unsupported(other),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::TextList(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            Self::List(items) => Value::Array(items.clone()),
            Self::Unsupported(value) => value.clone(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "string",
            Self::TextList(_) | Self::List(_) => "array",
            Self::Unsupported(Value::Null) => "null",
            Self::Unsupported(Value::Bool(_)) => "boolean",
            Self::Unsupported(Value::Number(_)) => "number",
            Self::Unsupported(_) => "object",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("missing required argument `{0}`")]
    Missing(String),
    #[error("argument `{name}` should be {expected} but was {found}")]
    WrongType { name: String, expected: &'static str, found: &'static str },
}

/// Loosely typed argument bag of a single tool call. An absent key means the argument was not sent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArgumentMap {
    values: BTreeMap<String, ArgValue>,
}

impl ArgumentMap {
    /// Builds the bag from the JSON object the model produced; anything but an object yields an empty bag.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(object) => Self::from_object(object),
            Value::Null => Self::default(),
            other => {
                debug!(received = %other, "tool call arguments were not a JSON object");
                Self::default()
            }
        }
    }

    pub fn from_object(object: Map<String, Value>) -> Self {
        Self {
            values: object.into_iter().map(|(key, value)| (key, ArgValue::from_json(value))).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values.iter().map(|(key, value)| (key.clone(), value.to_json())).collect(),
        )
    }

    /// Checks that every required parameter is present with its declared shape.
    /// Extra arguments are ignored.
    pub fn validate(&self, schema: &ParameterSchema) -> Result<(), ArgumentError> {
        for spec in &schema.properties {
            let Some(value) = self.values.get(spec.name) else {
                if spec.required {
                    return Err(ArgumentError::Missing(spec.name.to_string()));
                }
                continue;
            };
            let shape_ok = match spec.param_type {
                ParamType::String => matches!(value, ArgValue::Text(_)),
                ParamType::StringArray => matches!(value, ArgValue::TextList(_) | ArgValue::List(_)),
            };
            if !shape_ok {
                return Err(ArgumentError::WrongType {
                    name: spec.name.to_string(),
                    expected: spec.param_type.as_str(),
                    found: value.kind(),
                });
            }
        }
        Ok(())
    }

    pub fn text(&self, name: &str) -> Result<&str, ArgumentError> {
        match self.values.get(name) {
            Some(ArgValue::Text(text)) => Ok(text),
            Some(other) => Err(ArgumentError::WrongType {
                name: name.to_string(),
                expected: "string",
                found: other.kind(),
            }),
            None => Err(ArgumentError::Missing(name.to_string())),
        }
    }

    /// Reads a list of strings. Elements of an untyped list that are not strings are dropped.
    pub fn text_list(&self, name: &str) -> Result<Vec<String>, ArgumentError> {
        match self.values.get(name) {
            Some(ArgValue::TextList(items)) => Ok(items.clone()),
            Some(ArgValue::List(items)) => {
                let kept = items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect::<Vec<_>>();
                debug!(
                    argument = name,
                    received = items.len(),
                    kept = kept.len(),
                    "dropped non-string elements from list argument"
                );
                Ok(kept)
            }
            Some(other) => Err(ArgumentError::WrongType {
                name: name.to_string(),
                expected: "array of strings",
                found: other.kind(),
            }),
            None => Err(ArgumentError::Missing(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ArgValue, ArgumentError, ArgumentMap};
    use crate::tools::{ParamType, ParameterSchema, ParameterSpec};

    fn codes_schema() -> ParameterSchema {
        ParameterSchema::new(vec![ParameterSpec::required(
            "productCodes",
            ParamType::StringArray,
            "codes",
        )])
    }

    #[test]
    fn mixed_list_keeps_only_strings() {
        let args = ArgumentMap::from_json(json!({ "productCodes": ["A", 7, null, "B", { "x": 1 }] }));

        assert_eq!(args.text_list("productCodes"), Ok(vec!["A".to_string(), "B".to_string()]));
    }

    #[test]
    fn typed_list_is_returned_as_is() {
        let args = ArgumentMap::from_json(json!({ "productCodes": ["RES-001", "CER-001"] }));

        assert!(matches!(args.get("productCodes"), Some(ArgValue::TextList(_))));
        assert_eq!(
            args.text_list("productCodes"),
            Ok(vec!["RES-001".to_string(), "CER-001".to_string()])
        );
    }

    #[test]
    fn scalar_where_list_expected_is_rejected() {
        let args = ArgumentMap::from_json(json!({ "productCodes": "RES-001" }));

        assert_eq!(
            args.validate(&codes_schema()),
            Err(ArgumentError::WrongType {
                name: "productCodes".to_string(),
                expected: "array of strings",
                found: "string",
            })
        );
    }

    #[test]
    fn missing_required_argument_is_reported() {
        let args = ArgumentMap::from_json(json!({ "other": "x" }));

        assert_eq!(
            args.validate(&codes_schema()),
            Err(ArgumentError::Missing("productCodes".to_string()))
        );
    }

    #[test]
    fn numeric_search_term_is_not_a_string() {
        let args = ArgumentMap::from_json(json!({ "searchTerm": 42 }));

        assert!(matches!(
            args.text("searchTerm"),
            Err(ArgumentError::WrongType { found: "number", .. })
        ));
    }

    #[test]
    fn non_object_arguments_become_empty_bag() {
        assert!(ArgumentMap::from_json(json!(["not", "an", "object"])).is_empty());
        assert!(ArgumentMap::from_json(serde_json::Value::Null).is_empty());
    }

    #[test]
    fn json_round_trip_preserves_untyped_lists() {
        let raw = json!({ "productCodes": ["A", 1], "searchTerm": "res" });

        assert_eq!(ArgumentMap::from_json(raw.clone()).to_json(), raw);
    }
}
