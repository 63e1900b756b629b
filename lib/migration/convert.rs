use std::collections::{BTreeMap, HashMap};

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

use crate::item::{AttrValue, Item};

/// Conversion failure between the SDK's attribute model and the wire model.
///
/// These are always fatal: an item that cannot be represented cannot be staged or
/// written, and retrying will not change that.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("attribute `{attribute}` holds an unsupported value type")]
    UnsupportedType { attribute: String },

    #[error("attribute `{attribute}` holds invalid base64: {detail}")]
    InvalidBase64 { attribute: String, detail: String },
}

pub fn item_from_sdk(attrs: &HashMap<String, AttributeValue>) -> Result<Item, ConvertError> {
    let mut item = Item::new();
    for (name, value) in attrs {
        item.insert(name.clone(), attr_from_sdk(name, value)?);
    }
    Ok(item)
}

pub fn item_to_sdk(item: &Item) -> Result<HashMap<String, AttributeValue>, ConvertError> {
    let mut attrs = HashMap::with_capacity(item.len());
    for (name, value) in item {
        attrs.insert(name.clone(), attr_to_sdk(name, value)?);
    }
    Ok(attrs)
}

fn attr_from_sdk(attribute: &str, value: &AttributeValue) -> Result<AttrValue, ConvertError> {
    match value {
        AttributeValue::S(text) => Ok(AttrValue::S(text.clone())),
        AttributeValue::N(number) => Ok(AttrValue::N(number.clone())),
        AttributeValue::B(blob) => Ok(AttrValue::B(STANDARD.encode(blob.as_ref()))),
        AttributeValue::Bool(flag) => Ok(AttrValue::Bool(*flag)),
        AttributeValue::Null(flag) => Ok(AttrValue::Null(*flag)),
        AttributeValue::L(list) => Ok(AttrValue::L(
            list.iter()
                .map(|entry| attr_from_sdk(attribute, entry))
                .collect::<Result<Vec<_>, _>>()?,
        )),
        AttributeValue::M(map) => {
            let mut nested = BTreeMap::new();
            for (name, entry) in map {
                nested.insert(name.clone(), attr_from_sdk(attribute, entry)?);
            }
            Ok(AttrValue::M(nested))
        }
        AttributeValue::Ss(members) => Ok(AttrValue::Ss(members.clone())),
        AttributeValue::Ns(members) => Ok(AttrValue::Ns(members.clone())),
        AttributeValue::Bs(members) => Ok(AttrValue::Bs(
            members
                .iter()
                .map(|blob| STANDARD.encode(blob.as_ref()))
                .collect(),
        )),
        _ => Err(ConvertError::UnsupportedType {
            attribute: attribute.to_string(),
        }),
    }
}

fn attr_to_sdk(attribute: &str, value: &AttrValue) -> Result<AttributeValue, ConvertError> {
    match value {
        AttrValue::S(text) => Ok(AttributeValue::S(text.clone())),
        AttrValue::N(number) => Ok(AttributeValue::N(number.clone())),
        AttrValue::B(encoded) => Ok(AttributeValue::B(Blob::new(decode_base64(
            attribute, encoded,
        )?))),
        AttrValue::Bool(flag) => Ok(AttributeValue::Bool(*flag)),
        AttrValue::Null(flag) => Ok(AttributeValue::Null(*flag)),
        AttrValue::L(list) => Ok(AttributeValue::L(
            list.iter()
                .map(|entry| attr_to_sdk(attribute, entry))
                .collect::<Result<Vec<_>, _>>()?,
        )),
        AttrValue::M(map) => {
            let mut nested = HashMap::with_capacity(map.len());
            for (name, entry) in map {
                nested.insert(name.clone(), attr_to_sdk(attribute, entry)?);
            }
            Ok(AttributeValue::M(nested))
        }
        AttrValue::Ss(members) => Ok(AttributeValue::Ss(members.clone())),
        AttrValue::Ns(members) => Ok(AttributeValue::Ns(members.clone())),
        AttrValue::Bs(members) => Ok(AttributeValue::Bs(
            members
                .iter()
                .map(|encoded| Ok(Blob::new(decode_base64(attribute, encoded)?)))
                .collect::<Result<Vec<_>, ConvertError>>()?,
        )),
    }
}

fn decode_base64(attribute: &str, encoded: &str) -> Result<Vec<u8>, ConvertError> {
    STANDARD.decode(encoded).map_err(|err| ConvertError::InvalidBase64 {
        attribute: attribute.to_string(),
        detail: err.to_string(),
    })
}
