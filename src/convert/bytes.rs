// src/convert/bytes.rs

//! Byte conversion for files, stdin, stdout and stderr.

use crate::convert::ConversionError;
use crate::types::{Value, ValueKind, XmlDocument};

/// Serialize a value into the bytes a process reads.
pub fn value_to_bytes(value: &Value) -> Result<Vec<u8>, ConversionError> {
    match value {
        Value::String(text) => Ok(text.as_bytes().to_vec()),
        Value::Xml(doc) => Ok(doc.text.as_bytes().to_vec()),
        Value::Json(json) | Value::GeoJson(json) => Ok(serde_json::to_vec(json)?),
        Value::GenericFile(bytes) | Value::Geotiff(bytes) => Ok(bytes.clone()),
        Value::BoundingBox(_) => Err(ConversionError::NoByteForm(ValueKind::BoundingBox)),
        literal => literal
            .literal_text()
            .map(String::into_bytes)
            .ok_or(ConversionError::NoByteForm(literal.kind())),
    }
}

/// Interpret bytes a process produced as a value of the given kind.
pub fn value_from_bytes(kind: ValueKind, bytes: &[u8]) -> Result<Value, ConversionError> {
    match kind {
        ValueKind::String => Ok(Value::String(String::from_utf8(bytes.to_vec())?)),
        ValueKind::Xml(schema) => Ok(Value::Xml(XmlDocument {
            schema,
            text: String::from_utf8(bytes.to_vec())?,
        })),
        ValueKind::Json => Ok(Value::Json(serde_json::from_slice(bytes)?)),
        ValueKind::GeoJson => Ok(Value::GeoJson(serde_json::from_slice(bytes)?)),
        ValueKind::GenericFile => Ok(Value::GenericFile(bytes.to_vec())),
        ValueKind::Geotiff => Ok(Value::Geotiff(bytes.to_vec())),
        ValueKind::BoundingBox => Err(ConversionError::NoByteForm(ValueKind::BoundingBox)),
        ValueKind::Integer | ValueKind::Double | ValueKind::Boolean => {
            let text = String::from_utf8(bytes.to_vec())?;
            Value::parse_literal(kind, &text).map_err(ConversionError::Invalid)
        }
    }
}

pub fn value_from_exit_code(exit_code: i32) -> Value {
    Value::Integer(i64::from(exit_code))
}
