//! Archetypes: reusable sources of default option data.
//!
//! An archetype loads a map of options for a holder from site-wide data. A
//! holder's archetypes are resolved before its fields are extracted; their
//! data is deep-merged in declaration order and the explicit options passed to
//! the holder are merged last, so explicit values always win.

use std::{any::TypeId, fmt};

use serde_json::Value;

use crate::{
    RawOptions,
    error::{OptionsError, Result},
    schema::short_type_name,
};

/// A source of default option data.
pub trait OptionArchetype: Send + Sync + 'static {
    fn descriptive_name() -> &'static str
    where
        Self: Sized;

    fn description() -> &'static str
    where
        Self: Sized,
    {
        ""
    }

    /// Archetypes whose data this archetype builds on.
    fn archetypes() -> Vec<Archetype>
    where
        Self: Sized,
    {
        Vec::new()
    }

    /// Load the data stored for `key`.
    fn load(key: &str, site: &RawOptions) -> RawOptions
    where
        Self: Sized;
}

/// Reads a table from the site configuration.
///
/// The key is a dot-separated path: `allGenerators` reads the
/// `[allGenerators]` table, `wiki.defaults` reads `[wiki.defaults]`.
pub struct ConfigArchetype;

impl OptionArchetype for ConfigArchetype {
    fn descriptive_name() -> &'static str {
        "Site Config"
    }

    fn description() -> &'static str {
        "Options are loaded from the site configuration under the given key."
    }

    fn load(key: &str, site: &RawOptions) -> RawOptions {
        let mut segments = key.split('.').filter(|s| !s.is_empty());
        let Some(first) = segments.next() else {
            return RawOptions::new();
        };
        let mut current = site.get(first);
        for segment in segments {
            current = current.and_then(|value| value.get(segment));
        }
        match current {
            Some(Value::Object(map)) => map.clone(),
            _ => RawOptions::new(),
        }
    }
}

/// An archetype attached to a holder under a key.
#[derive(Clone)]
pub struct Archetype {
    key: String,
    target: ArchetypeTarget,
}

#[derive(Clone, Copy)]
struct ArchetypeTarget {
    type_id: TypeId,
    type_name: &'static str,
    name: fn() -> &'static str,
    description: fn() -> &'static str,
    archetypes: fn() -> Vec<Archetype>,
    load: fn(&str, &RawOptions) -> RawOptions,
}

impl Archetype {
    /// Attach archetype `A` with `key`.
    pub fn new<A: OptionArchetype>(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            target: ArchetypeTarget {
                type_id: TypeId::of::<A>(),
                type_name: short_type_name::<A>(),
                name: A::descriptive_name,
                description: A::description,
                archetypes: A::archetypes,
                load: A::load,
            },
        }
    }

    /// A [`ConfigArchetype`] reading the site configuration at `key`.
    pub fn config(key: impl Into<String>) -> Self {
        Self::new::<ConfigArchetype>(key)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn type_name(&self) -> &'static str {
        self.target.type_name
    }

    pub fn descriptive_name(&self) -> &'static str {
        (self.target.name)()
    }

    pub fn description(&self) -> &'static str {
        (self.target.description)()
    }
}

impl fmt::Debug for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archetype")
            .field("key", &self.key)
            .field("type", &self.target.type_name)
            .finish()
    }
}

/// Merge the data of `archetypes` with `explicit` on top.
///
/// Cycles are reported before any data is loaded past the repeated link.
pub fn resolve(
    holder: &str,
    archetypes: &[Archetype],
    site: &RawOptions,
    explicit: &RawOptions,
) -> Result<RawOptions> {
    let mut merged = RawOptions::new();
    let mut chain = Vec::new();
    for archetype in archetypes {
        let data = resolve_one(holder, archetype, site, &mut chain)?;
        deep_merge(&mut merged, data);
    }
    deep_merge(&mut merged, explicit.clone());
    Ok(merged)
}

/// Walk the archetype chains of a holder without loading any data.
pub fn check_chains(holder: &str, archetypes: &[Archetype]) -> Result<()> {
    let mut chain = Vec::new();
    archetypes
        .iter()
        .try_for_each(|archetype| check_one(holder, archetype, &mut chain))
}

fn check_one(
    holder: &str,
    archetype: &Archetype,
    chain: &mut Vec<(TypeId, &'static str)>,
) -> Result<()> {
    enter(holder, archetype, chain)?;
    for base in (archetype.target.archetypes)() {
        check_one(holder, &base, chain)?;
    }
    chain.pop();
    Ok(())
}

fn enter(
    holder: &str,
    archetype: &Archetype,
    chain: &mut Vec<(TypeId, &'static str)>,
) -> Result<()> {
    let target = archetype.target;
    if chain.iter().any(|(id, _)| *id == target.type_id) {
        let mut names: Vec<String> = chain.iter().map(|(_, name)| name.to_string()).collect();
        names.push(target.type_name.to_string());
        return Err(OptionsError::ArchetypeCycle {
            holder: holder.to_string(),
            chain: names,
        });
    }
    chain.push((target.type_id, target.type_name));
    Ok(())
}

fn resolve_one(
    holder: &str,
    archetype: &Archetype,
    site: &RawOptions,
    chain: &mut Vec<(TypeId, &'static str)>,
) -> Result<RawOptions> {
    enter(holder, archetype, chain)?;
    let target = archetype.target;
    let mut data = RawOptions::new();
    for base in (target.archetypes)() {
        deep_merge(&mut data, resolve_one(holder, &base, site, chain)?);
    }
    deep_merge(&mut data, (target.load)(&archetype.key, site));
    chain.pop();

    tracing::trace!(holder, archetype = %archetype.key, "resolved archetype");
    Ok(data)
}

/// Merge `overlay` into `base`. Nested maps merge; anything else is replaced.
pub fn deep_merge(base: &mut RawOptions, overlay: RawOptions) {
    for (key, value) in overlay {
        let Value::Object(incoming) = value else {
            base.insert(key, value);
            continue;
        };
        if let Some(Value::Object(existing)) = base.get_mut(&key) {
            deep_merge(existing, incoming);
            continue;
        }
        base.insert(key, Value::Object(incoming));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn site() -> RawOptions {
        match json!({
            "allGenerators": { "layout": "base", "theme": { "key": "default", "dark": false } },
            "wiki": { "defaults": { "title": "Wiki" } },
            "scalar": 5
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn map(value: Value) -> RawOptions {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    struct Ping;
    struct Pong;

    impl OptionArchetype for Ping {
        fn descriptive_name() -> &'static str {
            "Ping"
        }
        fn archetypes() -> Vec<Archetype> {
            vec![Archetype::new::<Pong>("pong")]
        }
        fn load(_key: &str, _site: &RawOptions) -> RawOptions {
            RawOptions::new()
        }
    }

    impl OptionArchetype for Pong {
        fn descriptive_name() -> &'static str {
            "Pong"
        }
        fn archetypes() -> Vec<Archetype> {
            vec![Archetype::new::<Ping>("ping")]
        }
        fn load(_key: &str, _site: &RawOptions) -> RawOptions {
            RawOptions::new()
        }
    }

    struct Layered;

    impl OptionArchetype for Layered {
        fn descriptive_name() -> &'static str {
            "Layered"
        }
        fn archetypes() -> Vec<Archetype> {
            vec![Archetype::config("allGenerators")]
        }
        fn load(_key: &str, _site: &RawOptions) -> RawOptions {
            map(json!({ "layout": "layered" }))
        }
    }

    #[test]
    fn test_config_archetype_reads_dotted_key() {
        let site = site();
        assert_eq!(
            ConfigArchetype::load("wiki.defaults", &site)["title"],
            json!("Wiki")
        );
        assert!(ConfigArchetype::load("missing", &site).is_empty());
        assert!(ConfigArchetype::load("scalar", &site).is_empty());
        assert!(ConfigArchetype::load("", &site).is_empty());
    }

    #[test]
    fn test_explicit_options_win() {
        let merged = resolve(
            "Test",
            &[Archetype::config("allGenerators")],
            &site(),
            &map(json!({ "layout": "custom", "theme": { "dark": true } })),
        )
        .expect("resolve");

        assert_eq!(merged["layout"], json!("custom"));
        assert_eq!(merged["theme"], json!({ "key": "default", "dark": true }));
    }

    #[test]
    fn test_chained_archetype_loads_base_first() {
        let merged = resolve("Test", &[Archetype::new::<Layered>("x")], &site(), &RawOptions::new())
            .expect("resolve");
        assert_eq!(merged["layout"], json!("layered"));
        assert_eq!(merged["theme"]["key"], json!("default"));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let err = resolve("Test", &[Archetype::new::<Ping>("ping")], &site(), &RawOptions::new())
            .unwrap_err();
        assert_eq!(
            err,
            OptionsError::ArchetypeCycle {
                holder: "Test".into(),
                chain: vec!["Ping".into(), "Pong".into(), "Ping".into()],
            }
        );
    }

    #[test]
    fn test_check_chains_matches_resolve() {
        assert!(check_chains("Test", &[Archetype::new::<Layered>("x")]).is_ok());
        let err = check_chains("Test", &[Archetype::new::<Pong>("pong")]).unwrap_err();
        assert_eq!(
            err,
            OptionsError::ArchetypeCycle {
                holder: "Test".into(),
                chain: vec!["Pong".into(), "Ping".into(), "Pong".into()],
            }
        );
    }

    #[test]
    fn test_same_archetype_twice_is_not_a_cycle() {
        let merged = resolve(
            "Test",
            &[Archetype::config("allGenerators"), Archetype::config("wiki.defaults")],
            &site(),
            &RawOptions::new(),
        )
        .expect("resolve");
        assert_eq!(merged["layout"], json!("base"));
        assert_eq!(merged["title"], json!("Wiki"));
    }

    #[test]
    fn test_deep_merge_replaces_non_maps() {
        let mut base = map(json!({ "a": { "b": 1 }, "list": [1, 2] }));
        deep_merge(&mut base, map(json!({ "a": 3, "list": [3] })));
        assert_eq!(Value::Object(base), json!({ "a": 3, "list": [3] }));
    }
}
