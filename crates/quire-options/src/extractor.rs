//! Built-in extractors converting raw values into typed option values.

use serde_json::Value;

use crate::{
    RawOptions,
    descriptor::{ObjectType, OptionSpec, OptionType},
    engine::{BindReport, OptionsExtractor},
    error::ConvertError,
    value::OptionValue,
};

/// Converts raw values for the option types it accepts.
pub trait OptionExtractor: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    fn accepts(&self, option_type: &OptionType) -> bool;

    /// Convert a raw value present in the option data.
    fn extract(
        &self,
        raw: &Value,
        spec: &OptionSpec,
        ctx: &mut ExtractCtx<'_>,
    ) -> Result<OptionValue, ConvertError>;

    /// Value used when the option is absent and declares no default.
    fn default_value(&self, _spec: &OptionSpec) -> OptionValue {
        OptionValue::Null
    }

    /// Default shown in descriptions.
    fn describe_default(&self, spec: &OptionSpec) -> String;
}

/// State shared with an extractor while one option is converted.
pub struct ExtractCtx<'a> {
    engine: &'a OptionsExtractor,
    report: &'a mut BindReport,
    path: String,
}

impl<'a> ExtractCtx<'a> {
    pub(crate) fn new(
        engine: &'a OptionsExtractor,
        report: &'a mut BindReport,
        path: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            report,
            path: path.into(),
        }
    }

    pub fn engine(&self) -> &OptionsExtractor {
        self.engine
    }

    /// Path of the value being converted, e.g. `sections[1]`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Convert a value nested under the current one with its own extractor.
    pub fn convert(
        &mut self,
        spec: &OptionSpec,
        raw: &Value,
        path: String,
    ) -> Result<OptionValue, ConvertError> {
        let engine = self.engine;
        let Some(extractor) = engine.extractor_for(&spec.option_type) else {
            return Err(ConvertError::mismatch(
                spec.option_type.name(),
                "a type no extractor accepts",
            ));
        };
        let parent = std::mem::replace(&mut self.path, path);
        let result = extractor.extract(raw, spec, self);
        self.path = parent;
        result
    }

    /// Bind `data` onto a fresh nested holder.
    ///
    /// Extraction errors inside the nested holder are recorded under the
    /// current path.
    pub fn bind_object(
        &mut self,
        object: &ObjectType,
        data: &RawOptions,
    ) -> Result<OptionValue, ConvertError> {
        let (holder, nested) = object.bind(self.engine, data)?;
        for error in nested.into_errors() {
            self.report
                .record(format!("{}.{}", self.path, error.key), error.message);
        }
        Ok(OptionValue::Object(holder))
    }
}

/// The built-in extractors in registration order.
pub fn default_extractors() -> Vec<Box<dyn OptionExtractor>> {
    vec![
        Box::new(BooleanExtractor),
        Box::new(IntegerExtractor),
        Box::new(FloatExtractor),
        Box::new(StringExtractor),
        Box::new(ListExtractor),
        Box::new(MapExtractor),
        Box::new(ObjectExtractor),
        Box::new(ValueExtractor),
    ]
}

/// Shape of a raw value for error messages.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn default_text(spec: &OptionSpec, fallback: &str) -> String {
    match &spec.default {
        Some(Value::String(s)) => s.clone(),
        Some(value) => value.to_string(),
        None => fallback.to_string(),
    }
}

pub struct BooleanExtractor;

impl OptionExtractor for BooleanExtractor {
    fn name(&self) -> &'static str {
        "boolean"
    }

    fn accepts(&self, option_type: &OptionType) -> bool {
        matches!(option_type, OptionType::Boolean)
    }

    fn extract(
        &self,
        raw: &Value,
        _spec: &OptionSpec,
        _ctx: &mut ExtractCtx<'_>,
    ) -> Result<OptionValue, ConvertError> {
        match raw {
            Value::Bool(b) => Ok(OptionValue::Boolean(*b)),
            Value::String(s) if s.trim().eq_ignore_ascii_case("true") => {
                Ok(OptionValue::Boolean(true))
            }
            Value::String(s) if s.trim().eq_ignore_ascii_case("false") => {
                Ok(OptionValue::Boolean(false))
            }
            other => Err(ConvertError::mismatch("Boolean", json_kind(other))),
        }
    }

    fn default_value(&self, _spec: &OptionSpec) -> OptionValue {
        OptionValue::Boolean(false)
    }

    fn describe_default(&self, spec: &OptionSpec) -> String {
        default_text(spec, "false")
    }
}

pub struct IntegerExtractor;

impl OptionExtractor for IntegerExtractor {
    fn name(&self) -> &'static str {
        "integer"
    }

    fn accepts(&self, option_type: &OptionType) -> bool {
        matches!(option_type, OptionType::Integer)
    }

    fn extract(
        &self,
        raw: &Value,
        _spec: &OptionSpec,
        _ctx: &mut ExtractCtx<'_>,
    ) -> Result<OptionValue, ConvertError> {
        let parsed = match raw {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        parsed
            .map(OptionValue::Integer)
            .ok_or_else(|| ConvertError::mismatch("Integer", json_kind(raw)))
    }

    fn describe_default(&self, spec: &OptionSpec) -> String {
        default_text(spec, "0")
    }
}

pub struct FloatExtractor;

impl OptionExtractor for FloatExtractor {
    fn name(&self) -> &'static str {
        "float"
    }

    fn accepts(&self, option_type: &OptionType) -> bool {
        matches!(option_type, OptionType::Float)
    }

    fn extract(
        &self,
        raw: &Value,
        _spec: &OptionSpec,
        _ctx: &mut ExtractCtx<'_>,
    ) -> Result<OptionValue, ConvertError> {
        let parsed = match raw {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        parsed
            .map(OptionValue::Float)
            .ok_or_else(|| ConvertError::mismatch("Float", json_kind(raw)))
    }

    fn describe_default(&self, spec: &OptionSpec) -> String {
        default_text(spec, "0.0")
    }
}

pub struct StringExtractor;

impl OptionExtractor for StringExtractor {
    fn name(&self) -> &'static str {
        "string"
    }

    fn accepts(&self, option_type: &OptionType) -> bool {
        matches!(option_type, OptionType::String)
    }

    fn extract(
        &self,
        raw: &Value,
        _spec: &OptionSpec,
        _ctx: &mut ExtractCtx<'_>,
    ) -> Result<OptionValue, ConvertError> {
        match raw {
            Value::String(s) => Ok(OptionValue::String(s.clone())),
            Value::Number(n) => Ok(OptionValue::String(n.to_string())),
            Value::Bool(b) => Ok(OptionValue::String(b.to_string())),
            other => Err(ConvertError::mismatch("String", json_kind(other))),
        }
    }

    fn describe_default(&self, spec: &OptionSpec) -> String {
        default_text(spec, "N/A")
    }
}

/// Lists; a single value is accepted as a one-element list.
pub struct ListExtractor;

impl OptionExtractor for ListExtractor {
    fn name(&self) -> &'static str {
        "list"
    }

    fn accepts(&self, option_type: &OptionType) -> bool {
        matches!(option_type, OptionType::List)
    }

    fn extract(
        &self,
        raw: &Value,
        spec: &OptionSpec,
        ctx: &mut ExtractCtx<'_>,
    ) -> Result<OptionValue, ConvertError> {
        let element = spec.element();
        let items = match raw {
            Value::Array(items) => items.as_slice(),
            single => std::slice::from_ref(single),
        };

        let mut values = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let path = format!("{}[{index}]", ctx.path());
            match ctx.convert(&element, item, path) {
                Ok(value) => values.push(value),
                Err(ConvertError::Mismatch { expected, found }) => {
                    return Err(ConvertError::mismatch(
                        format!("{expected} at index {index}"),
                        found,
                    ));
                }
                Err(fatal) => return Err(fatal),
            }
        }
        Ok(OptionValue::List(values))
    }

    fn default_value(&self, _spec: &OptionSpec) -> OptionValue {
        OptionValue::List(Vec::new())
    }

    fn describe_default(&self, spec: &OptionSpec) -> String {
        default_text(spec, "[]")
    }
}

pub struct MapExtractor;

impl OptionExtractor for MapExtractor {
    fn name(&self) -> &'static str {
        "map"
    }

    fn accepts(&self, option_type: &OptionType) -> bool {
        matches!(option_type, OptionType::Map)
    }

    fn extract(
        &self,
        raw: &Value,
        _spec: &OptionSpec,
        _ctx: &mut ExtractCtx<'_>,
    ) -> Result<OptionValue, ConvertError> {
        match raw {
            Value::Object(map) => Ok(OptionValue::Map(map.clone())),
            other => Err(ConvertError::mismatch("Map", json_kind(other))),
        }
    }

    fn default_value(&self, _spec: &OptionSpec) -> OptionValue {
        OptionValue::Map(RawOptions::new())
    }

    fn describe_default(&self, spec: &OptionSpec) -> String {
        default_text(spec, "{}")
    }
}

/// Nested holders, bound recursively.
pub struct ObjectExtractor;

impl OptionExtractor for ObjectExtractor {
    fn name(&self) -> &'static str {
        "object"
    }

    fn accepts(&self, option_type: &OptionType) -> bool {
        matches!(option_type, OptionType::Object(_))
    }

    fn extract(
        &self,
        raw: &Value,
        spec: &OptionSpec,
        ctx: &mut ExtractCtx<'_>,
    ) -> Result<OptionValue, ConvertError> {
        let OptionType::Object(object) = &spec.option_type else {
            return Err(ConvertError::mismatch("Object", spec.option_type.name()));
        };

        match (raw, &spec.implied_key) {
            (Value::Object(data), _) => ctx.bind_object(object, data),
            (Value::Array(_) | Value::Null, _) | (_, None) => {
                Err(ConvertError::mismatch(object.name(), json_kind(raw)))
            }
            (scalar, Some(implied)) => {
                let mut data = RawOptions::new();
                data.insert(implied.clone(), scalar.clone());
                ctx.bind_object(object, &data)
            }
        }
    }

    fn describe_default(&self, spec: &OptionSpec) -> String {
        default_text(spec, "N/A")
    }
}

/// Any value, stored unconverted.
pub struct ValueExtractor;

impl OptionExtractor for ValueExtractor {
    fn name(&self) -> &'static str {
        "value"
    }

    fn accepts(&self, option_type: &OptionType) -> bool {
        matches!(option_type, OptionType::Value)
    }

    fn extract(
        &self,
        raw: &Value,
        _spec: &OptionSpec,
        _ctx: &mut ExtractCtx<'_>,
    ) -> Result<OptionValue, ConvertError> {
        Ok(OptionValue::Value(raw.clone()))
    }

    fn describe_default(&self, spec: &OptionSpec) -> String {
        default_text(spec, "N/A")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn convert(spec: &OptionSpec, raw: Value) -> (Result<OptionValue, ConvertError>, BindReport) {
        let engine = OptionsExtractor::new(RawOptions::new());
        let mut report = BindReport::new("Test");
        let result = {
            let mut ctx = ExtractCtx::new(&engine, &mut report, spec.option_key());
            ctx.convert(spec, &raw, spec.option_key().to_string())
        };
        (result, report)
    }

    #[test]
    fn test_registration_order_first_match_wins() {
        let extractors = default_extractors();
        let names: Vec<&str> = extractors.iter().map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec!["boolean", "integer", "float", "string", "list", "map", "object", "value"]
        );
        for option_type in [
            OptionType::String,
            OptionType::Boolean,
            OptionType::Integer,
            OptionType::Float,
            OptionType::List,
            OptionType::Map,
            OptionType::Value,
        ] {
            let count = extractors.iter().filter(|e| e.accepts(&option_type)).count();
            assert_eq!(count, 1, "{option_type}");
        }
    }

    #[test]
    fn test_boolean_accepts_strings() {
        let spec = OptionSpec::boolean("parallel");
        assert!(matches!(
            convert(&spec, json!("TRUE")).0,
            Ok(OptionValue::Boolean(true))
        ));
        assert!(matches!(
            convert(&spec, json!(false)).0,
            Ok(OptionValue::Boolean(false))
        ));
        assert!(convert(&spec, json!("maybe")).0.is_err());
    }

    #[test]
    fn test_integer_conversion() {
        let spec = OptionSpec::integer("limit");
        assert!(matches!(convert(&spec, json!(5)).0, Ok(OptionValue::Integer(5))));
        assert!(matches!(convert(&spec, json!(5.0)).0, Ok(OptionValue::Integer(5))));
        assert!(matches!(convert(&spec, json!(" 12 ")).0, Ok(OptionValue::Integer(12))));
        assert!(convert(&spec, json!(5.5)).0.is_err());
        assert!(convert(&spec, json!([1])).0.is_err());
    }

    #[test]
    fn test_string_accepts_scalars_only() {
        let spec = OptionSpec::string("title");
        assert!(matches!(convert(&spec, json!(3)).0, Ok(OptionValue::String(s)) if s == "3"));
        assert!(convert(&spec, json!({ "a": 1 })).0.is_err());
    }

    #[test]
    fn test_list_wraps_scalar() {
        let spec = OptionSpec::list("exclude", OptionType::String);
        match convert(&spec, json!("drafts")).0 {
            Ok(OptionValue::List(items)) => {
                assert_eq!(items.len(), 1);
                assert!(matches!(&items[0], OptionValue::String(s) if s == "drafts"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_list_element_mismatch_names_index() {
        let spec = OptionSpec::list("sizes", OptionType::Integer);
        let err = convert(&spec, json!([1, "x"])).0.unwrap_err();
        assert_eq!(err.to_string(), "expected Integer at index 1, found string");
    }

    #[test]
    fn test_value_is_kept_raw() {
        let spec = OptionSpec::new("extra");
        assert!(matches!(
            convert(&spec, json!({ "nested": [1, 2] })).0,
            Ok(OptionValue::Value(v)) if v == json!({ "nested": [1, 2] })
        ));
    }

    #[test]
    fn test_describe_defaults() {
        assert_eq!(BooleanExtractor.describe_default(&OptionSpec::boolean("a")), "false");
        assert_eq!(
            BooleanExtractor.describe_default(&OptionSpec::boolean("a").default_value(true)),
            "true"
        );
        assert_eq!(StringExtractor.describe_default(&OptionSpec::string("a")), "N/A");
        assert_eq!(
            StringExtractor.describe_default(&OptionSpec::string("a").default_value("pages")),
            "pages"
        );
        assert_eq!(MapExtractor.describe_default(&OptionSpec::map("a")), "{}");
        assert_eq!(
            ListExtractor.describe_default(&OptionSpec::list("a", OptionType::String)),
            "[]"
        );
    }
}
