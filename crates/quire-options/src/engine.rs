//! The options engine: binding, validation and description of holders.

use std::any::TypeId;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::{
    RawOptions,
    archetype,
    descriptor::{ArchetypeDescription, HolderDescription, OptionDescriptor, OptionSpec, OptionType},
    error::{ConvertError, ExtractionError, Result, ValidationError},
    extractor::{ExtractCtx, OptionExtractor, default_extractors},
    schema::{ALL_OPTIONS_DESCRIPTION, FieldScope, OptionsHolder, schema_of},
    validation::{HolderValidator, OptionsValidator},
    value::OptionValue,
};

/// Outcome of binding one holder.
///
/// Extraction errors do not abort binding; each failed field keeps its
/// language default and is listed here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindReport {
    holder: String,
    bound: usize,
    errors: Vec<ExtractionError>,
}

impl BindReport {
    pub fn new(holder: impl Into<String>) -> Self {
        Self {
            holder: holder.into(),
            bound: 0,
            errors: Vec::new(),
        }
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    /// Number of fields that received a value.
    pub fn bound(&self) -> usize {
        self.bound
    }

    pub fn errors(&self) -> &[ExtractionError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ExtractionError> {
        self.errors
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn record(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ExtractionError {
            holder: self.holder.clone(),
            key: key.into(),
            message: message.into(),
        });
    }
}

/// Binds raw option data onto holders and describes their options.
pub struct OptionsExtractor {
    site: RawOptions,
    extractors: Vec<Box<dyn OptionExtractor>>,
    validator: Box<dyn OptionsValidator>,
}

impl OptionsExtractor {
    /// An engine with the built-in extractors, reading archetype data from `site`.
    pub fn new(site: RawOptions) -> Self {
        Self {
            site,
            extractors: default_extractors(),
            validator: Box::new(HolderValidator),
        }
    }

    /// Register an extractor ahead of the built-in ones.
    #[must_use]
    pub fn with_extractor(mut self, extractor: impl OptionExtractor + 'static) -> Self {
        self.extractors.insert(0, Box::new(extractor));
        self
    }

    #[must_use]
    pub fn with_validator(mut self, validator: impl OptionsValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    /// Site-wide data archetypes read from.
    pub fn site_data(&self) -> &RawOptions {
        &self.site
    }

    /// The first registered extractor accepting `option_type`.
    pub fn extractor_for(&self, option_type: &OptionType) -> Option<&dyn OptionExtractor> {
        self.extractors
            .iter()
            .find(|e| e.accepts(option_type))
            .map(|e| e.as_ref())
    }

    /// Bind own and inherited options of `holder` from `raw`.
    pub fn extract<T: OptionsHolder>(&self, holder: &mut T, raw: &RawOptions) -> Result<BindReport> {
        self.extract_scoped(holder, raw, FieldScope::ALL)
    }

    /// Bind the fields selected by `scope`.
    ///
    /// Archetype data is resolved first and explicit values overlay it; fields
    /// absent from both take their declared default.
    pub fn extract_scoped<T: OptionsHolder>(
        &self,
        holder: &mut T,
        raw: &RawOptions,
        scope: FieldScope,
    ) -> Result<BindReport> {
        let schema = schema_of::<T>();
        schema.preflight(&mut vec![TypeId::of::<T>()])?;

        let name = T::descriptive_name();
        let data = archetype::resolve(name, schema.archetypes(), &self.site, raw)?;
        let mut report = BindReport::new(name);

        for field in schema.fields(scope) {
            let spec = field.spec();
            let key = spec.option_key();
            let value = self.extract_field(spec, data.get(key), &mut report)?;
            if let Err(e) = field.set(holder, value) {
                report.record(key, e.to_string());
                if let Err(reset) = field.set(holder, OptionValue::Null) {
                    report.record(key, format!("could not reset to its default: {reset}"));
                }
            } else {
                report.bound += 1;
            }
        }

        if let Some(all) = schema.all_options()
            && scope.includes(all.origin())
        {
            all.set(holder, data);
        }

        for failure in &report.errors {
            warn!(holder = name, key = %failure.key, "{}", failure.message);
        }
        debug!(
            holder = name,
            bound = report.bound,
            errors = report.errors.len(),
            "bound options"
        );
        Ok(report)
    }

    fn extract_field(
        &self,
        spec: &OptionSpec,
        raw: Option<&Value>,
        report: &mut BindReport,
    ) -> Result<OptionValue> {
        let key = spec.option_key();
        let Some(extractor) = self.extractor_for(&spec.option_type) else {
            report.record(key, format!("no extractor accepts {}", spec.option_type));
            return Ok(OptionValue::Null);
        };

        let empty_object = Value::Object(RawOptions::new());
        let raw = match raw.filter(|v| !v.is_null()).or(spec.default.as_ref()) {
            Some(raw) => raw,
            None if matches!(spec.option_type, OptionType::Object(_)) => &empty_object,
            None => return Ok(extractor.default_value(spec)),
        };

        let mut ctx = ExtractCtx::new(self, report, key);
        match extractor.extract(raw, spec, &mut ctx) {
            Ok(value) => Ok(value),
            Err(ConvertError::Mismatch { expected, found }) => {
                report.record(key, format!("expected {expected}, found {found}"));
                Ok(OptionValue::Null)
            }
            Err(ConvertError::Fatal(e)) => Err(e),
        }
    }

    /// Run the validator over a bound holder.
    pub fn validate<T: OptionsHolder>(&self, holder: &T) -> std::result::Result<(), ValidationError> {
        self.validate_named(T::descriptive_name(), holder)
    }

    /// Validate a holder known only through a trait object.
    pub fn validate_named(
        &self,
        name: &str,
        holder: &dyn OptionsHolder,
    ) -> std::result::Result<(), ValidationError> {
        self.validator.validate(holder).map_err(|reason| {
            error!(holder = name, %reason, "options did not pass validation");
            ValidationError {
                holder: name.to_string(),
                reason,
            }
        })
    }

    /// Describe the options of `T` without an instance.
    pub fn describe_options<T: OptionsHolder>(&self, own: bool, inherited: bool) -> HolderDescription {
        let schema = schema_of::<T>();
        let scope = FieldScope { own, inherited };

        let mut options: Vec<OptionDescriptor> = schema
            .fields(scope)
            .map(|field| {
                let spec = field.spec();
                OptionDescriptor {
                    key: spec.option_key().to_string(),
                    option_type: spec.option_type.clone(),
                    type_params: spec.type_params.clone(),
                    description: spec.description.clone(),
                    default_value: self
                        .extractor_for(&spec.option_type)
                        .map(|e| e.describe_default(spec))
                        .unwrap_or_else(|| "N/A".to_string()),
                }
            })
            .collect();

        if let Some(all) = schema.all_options()
            && scope.includes(all.origin())
        {
            options.push(OptionDescriptor {
                key: all.key().to_string(),
                option_type: OptionType::Map,
                type_params: Vec::new(),
                description: ALL_OPTIONS_DESCRIPTION.to_string(),
                default_value: "{}".to_string(),
            });
        }

        options.sort_by(|a, b| a.key.cmp(&b.key));

        let archetypes = schema
            .archetypes()
            .iter()
            .map(|archetype| ArchetypeDescription {
                key: archetype.key().to_string(),
                archetype_type: archetype.type_name().to_string(),
                name: archetype.descriptive_name().to_string(),
                description: archetype.description().to_string(),
            })
            .collect();

        HolderDescription {
            name: T::descriptive_name().to_string(),
            description: T::description().to_string(),
            options,
            archetypes,
        }
    }

    pub fn describe_all_options<T: OptionsHolder>(&self) -> HolderDescription {
        self.describe_options::<T>(true, true)
    }

    pub fn describe_own_options<T: OptionsHolder>(&self) -> HolderDescription {
        self.describe_options::<T>(true, false)
    }

    pub fn describe_inherited_options<T: OptionsHolder>(&self) -> HolderDescription {
        self.describe_options::<T>(false, true)
    }

    /// Whether `T` declares any options in the given scope.
    pub fn has_options<T: OptionsHolder>(&self, own: bool, inherited: bool) -> bool {
        let scope = FieldScope { own, inherited };
        let schema = schema_of::<T>();
        schema.fields(scope).next().is_some()
            || schema
                .all_options()
                .is_some_and(|all| scope.includes(all.origin()))
    }

    /// Keys of every option of `T`, sorted.
    pub fn option_names<T: OptionsHolder>(&self) -> Vec<String> {
        self.describe_all_options::<T>()
            .options
            .into_iter()
            .map(|o| o.key)
            .collect()
    }
}

/// Object-safe binding surface for holders used as trait objects.
pub trait Configurable: Send + Sync {
    /// Descriptive name of the concrete holder type.
    fn holder_name(&self) -> &'static str;

    fn bind_options(&mut self, engine: &OptionsExtractor, raw: &RawOptions) -> Result<BindReport>;

    fn validate_options(&self, engine: &OptionsExtractor) -> std::result::Result<(), ValidationError>;

    fn describe(&self, engine: &OptionsExtractor) -> HolderDescription;
}

impl<T: OptionsHolder> Configurable for T {
    fn holder_name(&self) -> &'static str {
        T::descriptive_name()
    }

    fn bind_options(&mut self, engine: &OptionsExtractor, raw: &RawOptions) -> Result<BindReport> {
        engine.extract(self, raw)
    }

    fn validate_options(&self, engine: &OptionsExtractor) -> std::result::Result<(), ValidationError> {
        engine.validate(self)
    }

    fn describe(&self, engine: &OptionsExtractor) -> HolderDescription {
        engine.describe_all_options::<T>()
    }
}
