//! Declared option types, option specs and the metadata produced by
//! describing a holder.

use std::{any::TypeId, fmt, fmt::Write as _};

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::{
    RawOptions, Result,
    engine::{BindReport, OptionsExtractor},
    schema::{OptionsHolder, schema_of, short_type_name},
};

/// The declared type of an option.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionType {
    String,
    Boolean,
    Integer,
    Float,
    List,
    Map,
    /// Any raw value, kept as-is.
    Value,
    /// A nested holder, bound recursively.
    Object(ObjectType),
}

impl OptionType {
    /// Name shown in descriptions.
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Boolean => "Boolean",
            Self::Integer => "Integer",
            Self::Float => "Float",
            Self::List => "List",
            Self::Map => "Map",
            Self::Value => "Value",
            Self::Object(object) => object.name(),
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for OptionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

type BindFn = fn(&OptionsExtractor, &RawOptions) -> Result<(Box<dyn std::any::Any + Send>, BindReport)>;

/// A nested holder type usable as an option.
#[derive(Clone, Copy)]
pub struct ObjectType {
    type_id: TypeId,
    name: &'static str,
    bind: BindFn,
    preflight: fn(&mut Vec<TypeId>) -> Result<()>,
}

impl ObjectType {
    /// Object type for holder `T`.
    pub fn of<T: OptionsHolder + Default>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: short_type_name::<T>(),
            bind: bind_object::<T>,
            preflight: preflight_object::<T>,
        }
    }

    /// Short type name of the holder.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Create a fresh holder and bind `raw` onto it.
    pub(crate) fn bind(
        &self,
        engine: &OptionsExtractor,
        raw: &RawOptions,
    ) -> Result<(Box<dyn std::any::Any + Send>, BindReport)> {
        (self.bind)(engine, raw)
    }

    /// Check the holder's schema and everything nested in it.
    ///
    /// `visited` holds the holder types already checked on this walk.
    pub(crate) fn preflight(&self, visited: &mut Vec<TypeId>) -> Result<()> {
        if visited.contains(&self.type_id) {
            return Ok(());
        }
        visited.push(self.type_id);
        (self.preflight)(visited)
    }
}

fn preflight_object<T: OptionsHolder>(visited: &mut Vec<TypeId>) -> Result<()> {
    schema_of::<T>().preflight(visited)
}

fn bind_object<T: OptionsHolder + Default>(
    engine: &OptionsExtractor,
    raw: &RawOptions,
) -> Result<(Box<dyn std::any::Any + Send>, BindReport)> {
    let mut holder = T::default();
    let report = engine.extract(&mut holder, raw)?;
    Ok((Box::new(holder), report))
}

impl PartialEq for ObjectType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl fmt::Debug for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectType").field(&self.name).finish()
    }
}

/// Declaration of a single option.
///
/// A spec is created from the field's structural name; [`OptionSpec::key`]
/// overrides the key looked up in raw data.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionSpec {
    name: String,
    key: Option<String>,
    pub option_type: OptionType,
    pub type_params: Vec<OptionType>,
    pub description: String,
    pub default: Option<Value>,
    pub implied_key: Option<String>,
}

impl OptionSpec {
    /// A spec with the catch-all [`OptionType::Value`] type.
    pub fn new(name: impl Into<String>) -> Self {
        Self::typed(name, OptionType::Value)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::typed(name, OptionType::String)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::typed(name, OptionType::Boolean)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::typed(name, OptionType::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::typed(name, OptionType::Float)
    }

    pub fn map(name: impl Into<String>) -> Self {
        Self::typed(name, OptionType::Map)
    }

    /// A list whose elements are converted as `element`.
    pub fn list(name: impl Into<String>, element: OptionType) -> Self {
        let mut spec = Self::typed(name, OptionType::List);
        spec.type_params = vec![element];
        spec
    }

    fn typed(name: impl Into<String>, option_type: OptionType) -> Self {
        Self {
            name: name.into(),
            key: None,
            option_type,
            type_params: Vec::new(),
            description: String::new(),
            default: None,
            implied_key: None,
        }
    }

    /// Look the option up under `key` instead of its structural name.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Value used when the raw data has no entry for this option.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Wrap scalar values as `{implied_key: value}` when an object is expected.
    #[must_use]
    pub fn implied_key(mut self, key: impl Into<String>) -> Self {
        self.implied_key = Some(key.into());
        self
    }

    /// The key looked up in raw data.
    pub fn option_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.name)
    }

    /// The structural name the spec was declared with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spec used to convert elements of a list option.
    pub(crate) fn element(&self) -> OptionSpec {
        let mut element = self.clone();
        element.option_type = self
            .type_params
            .first()
            .cloned()
            .unwrap_or(OptionType::Value);
        element.type_params = Vec::new();
        element.default = None;
        element
    }
}

/// Description of one option of a holder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionDescriptor {
    pub key: String,
    pub option_type: OptionType,
    pub type_params: Vec<OptionType>,
    pub description: String,
    pub default_value: String,
}

impl OptionDescriptor {
    /// Type column text, e.g. `List<String>`.
    pub fn type_label(&self) -> String {
        if self.type_params.is_empty() {
            return self.option_type.name().to_string();
        }
        let params: Vec<&str> = self.type_params.iter().map(OptionType::name).collect();
        format!("{}<{}>", self.option_type.name(), params.join(", "))
    }
}

/// Description of an archetype contributing options to a holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchetypeDescription {
    pub key: String,
    pub archetype_type: String,
    pub name: String,
    pub description: String,
}

/// Self-description of a holder: its options and archetypes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HolderDescription {
    pub name: String,
    pub description: String,
    pub options: Vec<OptionDescriptor>,
    pub archetypes: Vec<ArchetypeDescription>,
}

const DESCRIPTION_WIDTH: usize = 45;

impl HolderDescription {
    /// Option lookup by key.
    pub fn option(&self, key: &str) -> Option<&OptionDescriptor> {
        self.options.iter().find(|o| o.key == key)
    }

    /// Render the options as a plain text table.
    pub fn table(&self) -> String {
        let header = ["Key", "Type", "Default Value", "Description"];
        let mut rows: Vec<[String; 4]> = Vec::with_capacity(self.options.len());
        for option in &self.options {
            let mut lines = wrap(&option.description, DESCRIPTION_WIDTH).into_iter();
            rows.push([
                option.key.clone(),
                option.type_label(),
                option.default_value.clone(),
                lines.next().unwrap_or_default(),
            ]);
            for line in lines {
                rows.push([String::new(), String::new(), String::new(), line]);
            }
        }

        let mut widths = header.map(str::len);
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        write_row(&mut out, &header.map(String::from), &widths);
        let rule = widths.map(|w| "-".repeat(w));
        write_row(&mut out, &rule, &widths);
        for row in &rows {
            write_row(&mut out, row, &widths);
        }
        out
    }
}

fn write_row(out: &mut String, cells: &[String; 4], widths: &[usize; 4]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(" | ");
    let _ = writeln!(out, "{}", line.trim_end());
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_key_defaults_to_name() {
        let spec = OptionSpec::string("base_dir");
        assert_eq!(spec.option_key(), "base_dir");

        let spec = spec.key("baseDir");
        assert_eq!(spec.option_key(), "baseDir");
        assert_eq!(spec.name(), "base_dir");
    }

    #[test]
    fn test_list_element_spec() {
        let spec = OptionSpec::list("tags", OptionType::String)
            .default_value(json!(["a"]))
            .implied_key("name");
        let element = spec.element();

        assert_eq!(element.option_type, OptionType::String);
        assert!(element.type_params.is_empty());
        assert!(element.default.is_none());
        assert_eq!(element.implied_key.as_deref(), Some("name"));
    }

    #[test]
    fn test_type_label() {
        let descriptor = OptionDescriptor {
            key: "exclude".into(),
            option_type: OptionType::List,
            type_params: vec![OptionType::String],
            description: String::new(),
            default_value: "[]".into(),
        };
        assert_eq!(descriptor.type_label(), "List<String>");
    }

    #[test]
    fn test_table_wraps_long_descriptions() {
        let description = HolderDescription {
            name: "Pages".into(),
            description: String::new(),
            options: vec![OptionDescriptor {
                key: "baseDir".into(),
                option_type: OptionType::String,
                type_params: Vec::new(),
                description: "The directory, relative to the resources directory, that pages are read from.".into(),
                default_value: "pages".into(),
            }],
            archetypes: Vec::new(),
        };

        let table = description.table();
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[0].starts_with("Key"));
        assert!(lines[0].contains("Default Value"));
        assert!(lines[2].starts_with("baseDir"));
        assert!(lines.len() > 3);
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("a b c", 3), vec!["a b", "c"]);
        assert!(wrap("", 10).is_empty());
    }
}
