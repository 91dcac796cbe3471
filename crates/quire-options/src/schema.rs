//! Option holders and their declared schemas.
//!
//! A holder declares its options once through a [`SchemaBuilder`]. The result
//! is cached per type for the lifetime of the process, so introspection cost
//! is paid once no matter how many instances are bound.

use std::{
    any::{Any, TypeId},
    collections::{HashMap, HashSet},
    sync::{Arc, LazyLock, Mutex, PoisonError},
};

use crate::{
    RawOptions,
    archetype::{self, Archetype},
    descriptor::{ObjectType, OptionSpec, OptionType},
    error::{ConvertError, OptionsError},
    value::{FromOption, OptionValue},
};

/// Description of the catch-all field receiving every raw option passed to a holder.
pub const ALL_OPTIONS_DESCRIPTION: &str = "All options passed to this object.";

/// A type whose fields are populated from raw option data.
pub trait OptionsHolder: Any + Send + Sync {
    /// Declare the options of this type.
    fn declare(options: &mut SchemaBuilder<Self>)
    where
        Self: Sized;

    /// Human-readable name used in descriptions and diagnostics.
    fn descriptive_name() -> &'static str
    where
        Self: Sized,
    {
        short_type_name::<Self>()
    }

    fn description() -> &'static str
    where
        Self: Sized,
    {
        ""
    }

    /// Validation hook run after binding.
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Where a field was declared relative to the holder being bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Own,
    Inherited,
}

/// Which fields take part in an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldScope {
    pub own: bool,
    pub inherited: bool,
}

impl FieldScope {
    pub const ALL: Self = Self {
        own: true,
        inherited: true,
    };
    pub const OWN: Self = Self {
        own: true,
        inherited: false,
    };
    pub const INHERITED: Self = Self {
        own: false,
        inherited: true,
    };

    pub fn includes(&self, origin: Origin) -> bool {
        match origin {
            Origin::Own => self.own,
            Origin::Inherited => self.inherited,
        }
    }
}

type Setter<T> = Arc<dyn Fn(&mut T, OptionValue) -> Result<(), ConvertError> + Send + Sync>;

/// A declared option together with the code storing into it.
pub struct Field<T> {
    spec: OptionSpec,
    origin: Origin,
    set: Setter<T>,
}

impl<T> Field<T> {
    pub fn spec(&self) -> &OptionSpec {
        &self.spec
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub(crate) fn set(&self, holder: &mut T, value: OptionValue) -> Result<(), ConvertError> {
        (self.set)(holder, value)
    }
}

/// The catch-all map field of a holder.
pub struct AllOptionsField<T> {
    key: String,
    origin: Origin,
    set: Arc<dyn Fn(&mut T, RawOptions) + Send + Sync>,
}

impl<T> AllOptionsField<T> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub(crate) fn set(&self, holder: &mut T, data: RawOptions) {
        (self.set)(holder, data)
    }
}

/// Builder passed to [`OptionsHolder::declare`].
pub struct SchemaBuilder<T> {
    own: Vec<Field<T>>,
    inherited: Vec<Field<T>>,
    all_options: Option<AllOptionsField<T>>,
    own_archetypes: Vec<Archetype>,
    inherited_archetypes: Vec<Archetype>,
}

impl<T: OptionsHolder> SchemaBuilder<T> {
    fn new() -> Self {
        Self {
            own: Vec::new(),
            inherited: Vec::new(),
            all_options: None,
            own_archetypes: Vec::new(),
            inherited_archetypes: Vec::new(),
        }
    }

    /// Declare an option stored in a field implementing [`FromOption`].
    pub fn option<F>(&mut self, spec: OptionSpec, field: fn(&mut T) -> &mut F) -> &mut Self
    where
        F: FromOption + 'static,
    {
        let set: Setter<T> = Arc::new(move |holder: &mut T, value: OptionValue| {
            *field(holder) = F::from_option(value)?;
            Ok(())
        });
        self.push(spec, set)
    }

    /// Declare a nested holder option.
    ///
    /// The spec's type is taken from `N`.
    pub fn object<N>(&mut self, mut spec: OptionSpec, field: fn(&mut T) -> &mut N) -> &mut Self
    where
        N: OptionsHolder + Default,
    {
        spec.option_type = OptionType::Object(ObjectType::of::<N>());
        spec.type_params = Vec::new();
        let set: Setter<T> = Arc::new(move |holder: &mut T, value: OptionValue| {
            *field(holder) = downcast_object::<N>(value)?;
            Ok(())
        });
        self.push(spec, set)
    }

    /// Declare a list of nested holders.
    pub fn object_list<N>(
        &mut self,
        mut spec: OptionSpec,
        field: fn(&mut T) -> &mut Vec<N>,
    ) -> &mut Self
    where
        N: OptionsHolder + Default,
    {
        spec.option_type = OptionType::List;
        spec.type_params = vec![OptionType::Object(ObjectType::of::<N>())];
        let set: Setter<T> = Arc::new(move |holder: &mut T, value: OptionValue| {
            *field(holder) = match value {
                OptionValue::Null => Vec::new(),
                OptionValue::List(items) => items
                    .into_iter()
                    .map(downcast_object::<N>)
                    .collect::<Result<_, _>>()?,
                other => return Err(ConvertError::mismatch("List", other.kind())),
            };
            Ok(())
        });
        self.push(spec, set)
    }

    /// Declare the field receiving every raw option passed to the holder.
    pub fn all_options(
        &mut self,
        key: impl Into<String>,
        field: fn(&mut T) -> &mut RawOptions,
    ) -> &mut Self {
        self.all_options = Some(AllOptionsField {
            key: key.into(),
            origin: Origin::Own,
            set: Arc::new(move |holder: &mut T, data: RawOptions| *field(holder) = data),
        });
        self
    }

    /// Attach an archetype supplying default data for this holder.
    pub fn archetype(&mut self, archetype: Archetype) -> &mut Self {
        self.own_archetypes.push(archetype);
        self
    }

    /// Include the options and archetypes of a base holder embedded in `T`.
    ///
    /// Base fields are marked inherited. A field declared on `T` with the same
    /// key hides the inherited one.
    pub fn inherit<B: OptionsHolder>(&mut self, base: fn(&mut T) -> &mut B) -> &mut Self {
        let schema = schema_of::<B>();

        for field in &schema.fields {
            let set = Arc::clone(&field.set);
            self.inherited.push(Field {
                spec: field.spec.clone(),
                origin: Origin::Inherited,
                set: Arc::new(move |holder: &mut T, value: OptionValue| set(base(holder), value)),
            });
        }

        if self.all_options.is_none()
            && let Some(all) = &schema.all_options
        {
            let set = Arc::clone(&all.set);
            self.all_options = Some(AllOptionsField {
                key: all.key.clone(),
                origin: Origin::Inherited,
                set: Arc::new(move |holder: &mut T, data: RawOptions| set(base(holder), data)),
            });
        }

        self.inherited_archetypes
            .extend(schema.archetypes.iter().cloned());
        self
    }

    fn push(&mut self, spec: OptionSpec, set: Setter<T>) -> &mut Self {
        self.own.push(Field {
            spec,
            origin: Origin::Own,
            set,
        });
        self
    }

    fn build(self) -> OptionsSchema<T> {
        let mut seen = HashSet::new();
        let mut duplicate_keys = Vec::new();
        for field in &self.own {
            let key = field.spec.option_key().to_string();
            if !seen.insert(key.clone()) {
                duplicate_keys.push(key);
            }
        }

        let mut fields = self.own;
        for field in self.inherited {
            if seen.insert(field.spec.option_key().to_string()) {
                fields.push(field);
            }
        }

        let mut archetypes = self.inherited_archetypes;
        archetypes.extend(self.own_archetypes);

        OptionsSchema {
            holder: T::descriptive_name(),
            fields,
            all_options: self.all_options,
            archetypes,
            duplicate_keys,
        }
    }
}

fn downcast_object<N: OptionsHolder + Default>(value: OptionValue) -> Result<N, ConvertError> {
    match value {
        OptionValue::Null => Ok(N::default()),
        OptionValue::Object(object) => object
            .downcast::<N>()
            .map(|boxed| *boxed)
            .map_err(|_| ConvertError::mismatch(short_type_name::<N>(), "another object type")),
        other => Err(ConvertError::mismatch(short_type_name::<N>(), other.kind())),
    }
}

/// The cached option schema of a holder type.
pub struct OptionsSchema<T> {
    holder: &'static str,
    fields: Vec<Field<T>>,
    all_options: Option<AllOptionsField<T>>,
    archetypes: Vec<Archetype>,
    duplicate_keys: Vec<String>,
}

impl<T> OptionsSchema<T> {
    /// Fields in declaration order, own fields before inherited ones.
    pub fn fields(&self, scope: FieldScope) -> impl Iterator<Item = &Field<T>> {
        self.fields
            .iter()
            .filter(move |field| scope.includes(field.origin))
    }

    pub fn all_options(&self) -> Option<&AllOptionsField<T>> {
        self.all_options.as_ref()
    }

    /// Archetypes applied to this holder, inherited ones first.
    pub fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    /// Reject schemas that cannot be bound.
    pub fn check(&self) -> Result<(), OptionsError> {
        match self.duplicate_keys.first() {
            Some(key) => Err(OptionsError::DuplicateKey {
                holder: self.holder.to_string(),
                key: key.clone(),
            }),
            None => Ok(()),
        }
    }

    /// [`check`](Self::check) this schema and the schemas of every nested
    /// holder, and walk every archetype chain.
    ///
    /// Runs before any field is bound.
    pub(crate) fn preflight(&self, visited: &mut Vec<TypeId>) -> Result<(), OptionsError> {
        self.check()?;
        archetype::check_chains(self.holder, &self.archetypes)?;
        for field in &self.fields {
            let spec = &field.spec;
            let nested = std::iter::once(&spec.option_type).chain(spec.type_params.iter());
            for option_type in nested {
                if let OptionType::Object(object) = option_type {
                    object.preflight(visited)?;
                }
            }
        }
        Ok(())
    }
}

static SCHEMAS: LazyLock<Mutex<HashMap<TypeId, &'static (dyn Any + Send + Sync)>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// The schema of holder type `T`, built on first use.
pub fn schema_of<T: OptionsHolder>() -> &'static OptionsSchema<T> {
    let id = TypeId::of::<T>();
    {
        let cache = SCHEMAS.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(schema) = cache
            .get(&id)
            .and_then(|s| s.downcast_ref::<OptionsSchema<T>>())
        {
            return schema;
        }
    }

    // Built without the lock held: declaring a holder may look up its bases.
    let mut builder = SchemaBuilder::new();
    T::declare(&mut builder);
    let built: &'static OptionsSchema<T> = Box::leak(Box::new(builder.build()));
    tracing::trace!(holder = T::descriptive_name(), "built option schema");

    let mut cache = SCHEMAS.lock().unwrap_or_else(PoisonError::into_inner);
    let entry = *cache
        .entry(id)
        .or_insert(built as &'static (dyn Any + Send + Sync));
    entry.downcast_ref::<OptionsSchema<T>>().unwrap_or(built)
}

/// Type name without its module path.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
