use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One table item in the store's wire representation: attribute name → tagged value.
///
/// `BTreeMap` keeps attribute order stable across encode/decode passes, so staged
/// payloads are reproducible and comparisons in tests stay deterministic.
pub type Item = BTreeMap<String, AttrValue>;

/// Externally tagged attribute value, exactly as the store's JSON wire format renders it.
///
/// Numbers and number-set members stay strings end to end; the store's decimal precision
/// exceeds what an `f64` round trip can preserve. Binary payloads and binary-set members
/// are standard-alphabet base64 strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrValue {
    S(String),
    N(String),
    B(String),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
    L(Vec<AttrValue>),
    M(BTreeMap<String, AttrValue>),
    #[serde(rename = "SS")]
    Ss(Vec<String>),
    #[serde(rename = "NS")]
    Ns(Vec<String>),
    #[serde(rename = "BS")]
    Bs(Vec<String>),
}

/// Serializes an item batch as one bare JSON array (no envelope, no metadata).
pub fn encode_items(items: &[Item]) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(items)
}

/// Decodes a staged payload back into items.
pub fn decode_items(payload: &[u8]) -> Result<Vec<Item>, serde_json::Error> {
    serde_json::from_slice(payload)
}
