//! Tagged JSON encoding of the AST.
//!
//! Every node is written as `{"type": "<variant>", "payload": {...}}`.
//! Serialization is derived on [`Node`]; decoding dispatches on the tag by
//! hand so an unrecognized tag fails with its own error.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use super::Node;

const UNKNOWN_NODE_TYPE: &str = "unknown node type";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("{0}")]
    UnknownNodeType(String),
    #[error("malformed AST JSON: {0}")]
    Json(serde_json::Error),
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        let message = err.to_string();
        if message.starts_with(UNKNOWN_NODE_TYPE) {
            DecodeError::UnknownNodeType(message)
        } else {
            DecodeError::Json(err)
        }
    }
}

#[derive(Deserialize)]
struct Tagged {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

fn payload<T: DeserializeOwned, E: serde::de::Error>(value: Value) -> Result<T, E> {
    serde_json::from_value(value).map_err(E::custom)
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tagged = Tagged::deserialize(deserializer)?;
        let value = tagged.payload;
        match tagged.kind.as_str() {
            "literal" => payload(value).map(Node::Literal),
            "str_expr" => payload(value).map(Node::StrExpr),
            "code" => payload(value).map(Node::Code),
            "import" => payload(value).map(Node::Import),
            "if" => payload(value).map(Node::If),
            "for" => payload(value).map(Node::For),
            "partial" => payload(value).map(Node::Partial),
            "block" => payload(value).map(Node::Block),
            "element" => payload(value).map(Node::Element),
            other => Err(D::Error::custom(format!("{UNKNOWN_NODE_TYPE} {other:?}"))),
        }
    }
}

/// Pretty-printed JSON array of the given nodes.
pub fn nodes_to_json(nodes: &[Node]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(nodes)
}

pub fn nodes_from_json(json: &str) -> Result<Vec<Node>, DecodeError> {
    Ok(serde_json::from_str(json)?)
}
