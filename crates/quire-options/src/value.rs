//! Converted option values and their conversion into field types.

use std::{any::Any, fmt};

use serde_json::{Number, Value};

use crate::{RawOptions, error::ConvertError};

/// A value produced by an extractor, ready to be stored in a field.
pub enum OptionValue {
    /// No value; the field takes its language default.
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<OptionValue>),
    Map(RawOptions),
    Value(Value),
    /// A bound nested holder.
    Object(Box<dyn Any + Send>),
}

impl OptionValue {
    /// Short name of the value's shape, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Value(_) => "value",
            Self::Object(_) => "object",
        }
    }

    /// Convert back to raw JSON. Nested holders have no raw form.
    pub fn into_json(self) -> Option<Value> {
        Some(match self {
            Self::Null => Value::Null,
            Self::Boolean(b) => Value::Bool(b),
            Self::Integer(i) => Value::Number(i.into()),
            Self::Float(f) => Number::from_f64(f).map(Value::Number)?,
            Self::String(s) => Value::String(s),
            Self::List(items) => Value::Array(
                items
                    .into_iter()
                    .map(OptionValue::into_json)
                    .collect::<Option<Vec<_>>>()?,
            ),
            Self::Map(map) => Value::Object(map),
            Self::Value(value) => value,
            Self::Object(_) => return None,
        })
    }
}

impl fmt::Debug for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Self::Integer(i) => f.debug_tuple("Integer").field(i).finish(),
            Self::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Self::String(s) => f.debug_tuple("String").field(s).finish(),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Object(_) => f.write_str("Object(..)"),
        }
    }
}

/// Field types that can be assigned from an [`OptionValue`].
///
/// `Null` always converts to the type's language default.
pub trait FromOption: Sized {
    fn from_option(value: OptionValue) -> Result<Self, ConvertError>;
}

impl FromOption for bool {
    fn from_option(value: OptionValue) -> Result<Self, ConvertError> {
        match value {
            OptionValue::Null => Ok(false),
            OptionValue::Boolean(b) => Ok(b),
            other => Err(ConvertError::mismatch("Boolean", other.kind())),
        }
    }
}

impl FromOption for String {
    fn from_option(value: OptionValue) -> Result<Self, ConvertError> {
        match value {
            OptionValue::Null => Ok(String::new()),
            OptionValue::String(s) => Ok(s),
            other => Err(ConvertError::mismatch("String", other.kind())),
        }
    }
}

macro_rules! impl_from_option_int {
    ($($ty:ty),*) => {
        $(
            impl FromOption for $ty {
                fn from_option(value: OptionValue) -> Result<Self, ConvertError> {
                    match value {
                        OptionValue::Null => Ok(0),
                        OptionValue::Integer(i) => <$ty>::try_from(i)
                            .map_err(|_| ConvertError::mismatch(stringify!($ty), i.to_string())),
                        other => Err(ConvertError::mismatch("Integer", other.kind())),
                    }
                }
            }
        )*
    };
}

impl_from_option_int!(i32, i64, u32, u64, usize);

impl FromOption for f64 {
    fn from_option(value: OptionValue) -> Result<Self, ConvertError> {
        match value {
            OptionValue::Null => Ok(0.0),
            OptionValue::Float(f) => Ok(f),
            OptionValue::Integer(i) => Ok(i as f64),
            other => Err(ConvertError::mismatch("Float", other.kind())),
        }
    }
}

impl FromOption for RawOptions {
    fn from_option(value: OptionValue) -> Result<Self, ConvertError> {
        match value {
            OptionValue::Null => Ok(RawOptions::new()),
            OptionValue::Map(map) => Ok(map),
            other => Err(ConvertError::mismatch("Map", other.kind())),
        }
    }
}

impl FromOption for Value {
    fn from_option(value: OptionValue) -> Result<Self, ConvertError> {
        let kind = value.kind();
        value
            .into_json()
            .ok_or_else(|| ConvertError::mismatch("Value", kind))
    }
}

impl<T: FromOption> FromOption for Option<T> {
    fn from_option(value: OptionValue) -> Result<Self, ConvertError> {
        match value {
            OptionValue::Null => Ok(None),
            value => T::from_option(value).map(Some),
        }
    }
}

impl<T: FromOption> FromOption for Vec<T> {
    fn from_option(value: OptionValue) -> Result<Self, ConvertError> {
        match value {
            OptionValue::Null => Ok(Vec::new()),
            OptionValue::List(items) => items.into_iter().map(T::from_option).collect(),
            other => Err(ConvertError::mismatch("List", other.kind())),
        }
    }
}
