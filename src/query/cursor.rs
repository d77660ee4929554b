//! Opaque keyset cursor: base64 of `{"field": <sort field>, "value": <last value>}`.

use crate::error::{DataError, DataResult};
use crate::investment_store::{InvestmentRecord, SortField, SortValue};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cursor {
    pub field: SortField,
    pub value: SortValue,
}

#[derive(Serialize, Deserialize)]
struct CursorPayload {
    field: String,
    value: Value,
}

impl Cursor {
    /// Cursor pointing just past `record` in a listing sorted by `field`.
    pub fn after(field: SortField, record: &InvestmentRecord) -> Self {
        Self {
            field,
            value: field.value_of(record),
        }
    }

    pub fn encode(&self) -> String {
        let value = match &self.value {
            SortValue::Null => Value::Null,
            SortValue::Integer(v) => Value::from(*v),
            // Amounts travel as strings to keep every digit
            SortValue::Amount(v) => Value::String(v.normalize().to_string()),
            SortValue::Text(v) => Value::String(v.clone()),
        };
        let payload = CursorPayload {
            field: self.field.column().to_string(),
            value,
        };
        // Serializing a string and a JSON value cannot fail
        let json = serde_json::to_vec(&payload).unwrap_or_default();
        STANDARD.encode(json)
    }

    pub fn decode(encoded: &str) -> DataResult<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| DataError::invalid(format!("cursor is not valid base64: {}", e)))?;
        let payload: CursorPayload = serde_json::from_slice(&bytes)
            .map_err(|e| DataError::invalid(format!("cursor is not a valid payload: {}", e)))?;

        let field = SortField::parse(&payload.field).ok_or_else(|| {
            DataError::invalid(format!("cursor names unknown field '{}'", payload.field))
        })?;
        let value = Self::typed_value(field, payload.value)?;
        Ok(Self { field, value })
    }

    fn typed_value(field: SortField, value: Value) -> DataResult<SortValue> {
        let mismatch = |value: &Value| {
            DataError::invalid(format!(
                "cursor value {} does not fit field '{}'",
                value, field
            ))
        };

        if value.is_null() {
            return Ok(SortValue::Null);
        }
        if field.is_text() {
            return match value {
                Value::String(text) => Ok(SortValue::Text(text)),
                other => Err(mismatch(&other)),
            };
        }
        if field.is_amount() {
            let amount = match &value {
                Value::String(text) => Decimal::from_str(text.trim()).ok(),
                Value::Number(number) => Decimal::from_str(&number.to_string()).ok(),
                _ => None,
            };
            return amount.map(SortValue::Amount).ok_or_else(|| mismatch(&value));
        }
        let integer = match &value {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse::<i64>().ok(),
            _ => None,
        };
        integer.map(SortValue::Integer).ok_or_else(|| mismatch(&value))
    }
}
