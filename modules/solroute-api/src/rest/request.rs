//! Request body decoding.
//!
//! Bodies are parsed to a JSON object once, then each field is checked and
//! converted in the same pass. The first bad field becomes a
//! `ValidationError` naming the field, the expected type and the JSON type
//! actually received.

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::runner::DelayRange;

const WRONG_TYPE: &str = "Invalid data type for field";

/// JSON type name as reported in `received_type`.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A decoded JSON object body with typed field accessors.
pub struct Fields(Map<String, Value>);

impl Fields {
    pub fn parse(body: &[u8]) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| ValidationError::invalid_json())?;
        match value {
            Value::Object(map) => Ok(Fields(map)),
            other => Err(ValidationError {
                received_type: Some(json_type_name(&other).to_string()),
                expected_type: Some("object"),
                ..ValidationError::new("Request body must be a JSON object")
            }),
        }
    }

    /// Absent is `None`; an explicit null is a type error like any other.
    pub fn optional_string(&self, field: &'static str) -> Result<Option<String>, ValidationError> {
        match self.0.get(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(ValidationError::wrong_type(
                field,
                WRONG_TYPE,
                "string",
                json_type_name(other),
            )),
        }
    }

    /// A present, non-empty string. `required_message` is used when the field
    /// is absent or empty.
    pub fn required_string(
        &self,
        field: &'static str,
        required_message: &str,
    ) -> Result<String, ValidationError> {
        require(field, self.optional_string(field)?, required_message)
    }

    pub fn string_array(&self, field: &'static str) -> Result<Vec<String>, ValidationError> {
        let items = self.array(field, "array of strings")?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(ValidationError::wrong_type(
                    field,
                    format!("Invalid data type in {field} array at index {i}"),
                    "string",
                    json_type_name(other),
                )),
            })
            .collect()
    }

    pub fn integer_array(&self, field: &'static str) -> Result<Vec<u64>, ValidationError> {
        let items = self.array(field, "array of integers")?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Number(n) if n.is_u64() => Ok(n.as_u64().unwrap_or_default()),
                Value::Number(n) if n.is_i64() => Err(ValidationError::for_field(
                    field,
                    format!("Negative value in {field} array at index {i}"),
                )),
                other => Err(ValidationError::wrong_type(
                    field,
                    format!("Invalid data type in {field} array at index {i}"),
                    "integer",
                    json_type_name(other),
                )),
            })
            .collect()
    }

    fn array(&self, field: &'static str, expected: &'static str) -> Result<&Vec<Value>, ValidationError> {
        match self.0.get(field) {
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(ValidationError::wrong_type(
                field,
                WRONG_TYPE,
                expected,
                json_type_name(other),
            )),
            None => Err(ValidationError::wrong_type(
                field,
                format!("Field {field} is required"),
                expected,
                "missing",
            )),
        }
    }
}

fn require(
    field: &'static str,
    value: Option<String>,
    required_message: &str,
) -> Result<String, ValidationError> {
    match value {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(ValidationError::for_field(field, required_message)),
    }
}

// ---------------------------------------------------------------------------
// Typed requests
// ---------------------------------------------------------------------------

/// `{"mint": string, "variable": [min, max], "comments": [string]}`
#[derive(Debug, Clone, PartialEq)]
pub struct BatchCommentRequest {
    pub mint: String,
    pub delay: DelayRange,
    pub comments: Vec<String>,
}

impl BatchCommentRequest {
    pub fn decode(body: &[u8]) -> Result<Self, ValidationError> {
        let fields = Fields::parse(body)?;

        // Types first, in field order; presence and ranges after.
        let mint = fields.optional_string("mint")?;
        let bounds = fields.integer_array("variable")?;
        let comments = fields.string_array("comments")?;

        let mint = require("mint", mint, "Mint address is required")?;
        let delay = match bounds.as_slice() {
            [min, max] => DelayRange::new(*min, *max).ok_or_else(|| {
                ValidationError::for_field("variable", "variable must be [min, max] with min <= max")
            })?,
            _ => {
                return Err(ValidationError::for_field(
                    "variable",
                    format!("variable must contain exactly 2 values, got {}", bounds.len()),
                ))
            }
        };

        Ok(Self {
            mint,
            delay,
            comments,
        })
    }
}

/// `{"mint": string, "message": string, "link": string?}`
#[derive(Debug, Clone, PartialEq)]
pub struct CommentRequest {
    pub mint: String,
    pub message: String,
    pub link: Option<String>,
}

impl CommentRequest {
    pub fn decode(body: &[u8]) -> Result<Self, ValidationError> {
        let fields = Fields::parse(body)?;
        Ok(Self {
            mint: fields.required_string("mint", "Mint address is required")?,
            message: fields.required_string("message", "Message is required")?,
            link: fields.optional_string("link")?.filter(|l| !l.is_empty()),
        })
    }
}

/// `{"message_id": string}`
#[derive(Debug, Clone, PartialEq)]
pub struct LikeRequest {
    pub message_id: String,
}

impl LikeRequest {
    pub fn decode(body: &[u8]) -> Result<Self, ValidationError> {
        let fields = Fields::parse(body)?;
        Ok(Self {
            message_id: fields.required_string("message_id", "Message ID is required")?,
        })
    }
}

/// `{"operation_id": string}`
#[derive(Debug, Clone, PartialEq)]
pub struct StopRequest {
    pub operation_id: String,
}

impl StopRequest {
    pub fn decode(body: &[u8]) -> Result<Self, ValidationError> {
        let fields = Fields::parse(body)?;
        Ok(Self {
            operation_id: fields.required_string("operation_id", "Missing operation ID")?,
        })
    }
}
