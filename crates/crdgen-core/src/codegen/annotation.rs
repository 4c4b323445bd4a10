//! Annotation codec for fields that exist in only one version.
//!
//! A value is stored as `<tag>=<payload>` under the key
//! `<prefix><section>.<FieldCamel>`. Scalars use a plain payload; composite
//! values and blobs use a JSON payload.

use std::fmt;

use chrono::DateTime;
use crdgen_model::{ScalarKind, ShapeKind, ShapeModel, ShapeRef};
use serde_json::{Number, Value};

/// Errors raised while encoding or decoding annotation values.
#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    /// The value has no `=` separating tag and payload.
    #[error("annotation value {0:?} has no tag separator")]
    MissingSeparator(String),

    /// The tag is not one of the known encodings.
    #[error("unknown annotation tag {0:?}")]
    UnknownTag(String),

    /// The payload does not parse under its tag.
    #[error("invalid {tag} payload {payload:?}: {message}")]
    InvalidPayload {
        /// The tag.
        tag: AnnotationTag,
        /// The offending payload.
        payload: String,
        /// Parser message.
        message: String,
    },

    /// The value cannot be encoded under the requested tag.
    #[error("cannot encode {value} as {tag}")]
    TypeMismatch {
        /// The tag.
        tag: AnnotationTag,
        /// The offending value.
        value: Value,
    },
}

/// Payload encoding of an annotation value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationTag {
    /// Plain text.
    String,
    /// `true` or `false`.
    Bool,
    /// Whole number.
    Int,
    /// Floating point number.
    Float,
    /// RFC 3339 timestamp.
    Timestamp,
    /// JSON document.
    Json,
}

impl AnnotationTag {
    /// The tag as written before `=`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Timestamp => "timestamp",
            Self::Json => "json",
        }
    }

    /// Parse a tag.
    pub fn parse(tag: &str) -> Result<Self, AnnotationError> {
        Ok(match tag {
            "string" => Self::String,
            "bool" => Self::Bool,
            "int" => Self::Int,
            "float" => Self::Float,
            "timestamp" => Self::Timestamp,
            "json" => Self::Json,
            other => return Err(AnnotationError::UnknownTag(other.to_owned())),
        })
    }

    /// The tag used for values of a shape; shapeless attributes are strings.
    #[must_use]
    pub fn for_shape(model: &ShapeModel, shape_ref: Option<&ShapeRef>) -> Self {
        let Some(shape_ref) = shape_ref else {
            return Self::String;
        };
        match model.resolve(shape_ref).map(|s| &s.kind) {
            Ok(ShapeKind::Scalar { scalar }) => match scalar {
                ScalarKind::String | ScalarKind::Character => Self::String,
                ScalarKind::Boolean => Self::Bool,
                ScalarKind::Byte | ScalarKind::Short | ScalarKind::Integer | ScalarKind::Long => {
                    Self::Int
                }
                ScalarKind::Float | ScalarKind::Double => Self::Float,
                ScalarKind::Timestamp => Self::Timestamp,
                ScalarKind::Blob => Self::Json,
            },
            _ => Self::Json,
        }
    }
}

impl fmt::Display for AnnotationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which half of a resource an annotated field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// Desired state.
    Spec,
    /// Observed state.
    Status,
}

impl Section {
    /// The section as it appears in annotation keys.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Spec => "spec",
            Self::Status => "status",
        }
    }

    /// The resource member holding this section.
    #[must_use]
    pub fn member(self) -> &'static str {
        match self {
            Self::Spec => "Spec",
            Self::Status => "Status",
        }
    }
}

/// The annotation key of a field.
#[must_use]
pub fn annotation_key(prefix: &str, section: Section, field_camel: &str) -> String {
    format!("{prefix}{}.{field_camel}", section.as_str())
}

/// Encode a value under a tag.
pub fn encode(tag: AnnotationTag, value: &Value) -> Result<String, AnnotationError> {
    let mismatch = || AnnotationError::TypeMismatch {
        tag,
        value: value.clone(),
    };
    let payload = match tag {
        AnnotationTag::String => value.as_str().ok_or_else(mismatch)?.to_owned(),
        AnnotationTag::Bool => value.as_bool().ok_or_else(mismatch)?.to_string(),
        AnnotationTag::Int => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
            _ => return Err(mismatch()),
        },
        AnnotationTag::Float => match value {
            Value::Number(n) => n.to_string(),
            _ => return Err(mismatch()),
        },
        AnnotationTag::Timestamp => {
            let raw = value.as_str().ok_or_else(mismatch)?;
            DateTime::parse_from_rfc3339(raw).map_err(|_| mismatch())?;
            raw.to_owned()
        }
        AnnotationTag::Json => value.to_string(),
    };
    Ok(format!("{}={payload}", tag.as_str()))
}

/// Decode an annotation value into its tag and value.
pub fn decode(raw: &str) -> Result<(AnnotationTag, Value), AnnotationError> {
    let (tag, payload) = raw
        .split_once('=')
        .ok_or_else(|| AnnotationError::MissingSeparator(raw.to_owned()))?;
    let tag = AnnotationTag::parse(tag)?;
    let invalid = |message: String| AnnotationError::InvalidPayload {
        tag,
        payload: payload.to_owned(),
        message,
    };
    let value = match tag {
        AnnotationTag::String => Value::String(payload.to_owned()),
        AnnotationTag::Bool => Value::Bool(payload.parse().map_err(|e| invalid(format!("{e}")))?),
        AnnotationTag::Int => Value::Number(parse_integer(payload).ok_or_else(|| {
            invalid("not an integer".to_owned())
        })?),
        AnnotationTag::Float => {
            let number = match parse_integer(payload) {
                Some(n) => n,
                None => {
                    let f: f64 = payload.parse().map_err(|e| invalid(format!("{e}")))?;
                    Number::from_f64(f).ok_or_else(|| invalid("not a finite number".to_owned()))?
                }
            };
            Value::Number(number)
        }
        AnnotationTag::Timestamp => {
            DateTime::parse_from_rfc3339(payload).map_err(|e| invalid(e.to_string()))?;
            Value::String(payload.to_owned())
        }
        AnnotationTag::Json => serde_json::from_str(payload).map_err(|e| invalid(e.to_string()))?,
    };
    Ok((tag, value))
}

fn parse_integer(payload: &str) -> Option<Number> {
    payload
        .parse::<i64>()
        .map(Number::from)
        .or_else(|_| payload.parse::<u64>().map(Number::from))
        .ok()
}
