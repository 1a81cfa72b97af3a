//! Value converter — textual request values to typed values.
//!
//! Scalar support is deliberately minimal: text pass-through, integer
//! parsing, and a small set of structured-reference types. Array targets
//! decode the text as a JSON array of strings first, then convert each
//! element to the component type, preserving order and length.

use std::fmt;
use std::path::PathBuf;

use crate::error::ConvertError;

/// Declared target type of a request-bound parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Text,
    Int,
    Uri,
    Url,
    Path,
    Array(Box<ParamType>),
}

impl ParamType {
    /// Array of the given component type.
    pub fn array(component: ParamType) -> Self {
        Self::Array(Box::new(component))
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Int => f.write_str("int"),
            Self::Uri => f.write_str("uri"),
            Self::Url => f.write_str("url"),
            Self::Path => f.write_str("path"),
            Self::Array(component) => write!(f, "[{component}]"),
        }
    }
}

/// A converted request value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Int(i64),
    Uri(http::Uri),
    Url(url::Url),
    Path(PathBuf),
    Array(Vec<Value>),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Path(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }
}

/// Re-encodes the value in the textual form [`convert`] accepts.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Uri(u) => write!(f, "{u}"),
            Self::Url(u) => write!(f, "{u}"),
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::Array(items) => {
                let encoded: Vec<String> = items.iter().map(ToString::to_string).collect();
                let text = serde_json::to_string(&encoded).map_err(|_| fmt::Error)?;
                f.write_str(&text)
            }
        }
    }
}

/// Convert a single textual value to the target type.
pub fn convert(text: &str, target: &ParamType) -> Result<Value, ConvertError> {
    match target {
        ParamType::Text => Ok(Value::Text(text.to_owned())),
        ParamType::Int => text
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| parse_error(text, target, e)),
        ParamType::Uri => text
            .parse::<http::Uri>()
            .map(Value::Uri)
            .map_err(|e| parse_error(text, target, e)),
        ParamType::Url => url::Url::parse(text)
            .map(Value::Url)
            .map_err(|e| parse_error(text, target, e)),
        ParamType::Path => Ok(Value::Path(PathBuf::from(text))),
        ParamType::Array(component) => {
            let elements: Vec<String> =
                serde_json::from_str(text).map_err(|e| ConvertError::Array {
                    text: text.to_owned(),
                    source: e,
                })?;
            elements
                .iter()
                .map(|element| convert(element, component))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
    }
}

fn parse_error(
    text: &str,
    target: &ParamType,
    source: impl std::error::Error + Send + Sync + 'static,
) -> ConvertError {
    ConvertError::Parse {
        text: text.to_owned(),
        target: target.clone(),
        source: Box::new(source),
    }
}
