//! Binding installation and the [`FlagSet`] registry.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::binding::{Binding, Shared};
use crate::error::FlagtreeError;
use crate::reflect::Reflect;
use crate::traverse;

/// A sink for bindings. Receives one call per leaf, in traversal order.
pub trait Registry {
    fn register(
        &mut self,
        name: String,
        binding: Binding,
        help: Option<&'static str>,
    ) -> Result<(), FlagtreeError>;
}

/// A registered binding and its help text.
#[derive(Debug, Clone)]
pub struct Flag {
    pub binding: Binding,
    pub help: Option<&'static str>,
}

impl Flag {
    pub fn name(&self) -> &str {
        self.binding.name()
    }
}

/// A named set of bindings, kept in registration order.
///
/// The name is used as the environment variable prefix by
/// [`apply_env`](crate::env::apply_env).
#[derive(Debug, Clone, Default)]
pub struct FlagSet {
    name: String,
    flags: Vec<Flag>,
    index: HashMap<String, usize>,
}

impl FlagSet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lookup(&self, name: &str) -> Option<&Flag> {
        self.index.get(name).map(|&i| &self.flags[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.flags.iter()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Set the named binding from text.
    pub fn set(&self, name: &str, text: &str) -> Result<(), FlagtreeError> {
        let flag = self
            .lookup(name)
            .ok_or_else(|| FlagtreeError::UnknownFlag(name.to_string()))?;
        flag.binding.set(text)
    }

    /// Every binding's name and current text, in registration order.
    pub fn listing(&self) -> Result<Vec<(String, String)>, FlagtreeError> {
        self.flags
            .iter()
            .map(|flag| Ok((flag.name().to_string(), flag.binding.format()?)))
            .collect()
    }

    /// Snapshot every current value as a JSON object nested along the dotted
    /// names.
    pub fn to_json(&self) -> Result<serde_json::Value, FlagtreeError> {
        let mut root = serde_json::Map::new();
        for flag in &self.flags {
            let value = flag.binding.get()?;
            insert_nested(&mut root, flag.name(), serde_json::json!(value));
        }
        Ok(serde_json::Value::Object(root))
    }
}

impl Registry for FlagSet {
    fn register(
        &mut self,
        name: String,
        binding: Binding,
        help: Option<&'static str>,
    ) -> Result<(), FlagtreeError> {
        if self.index.contains_key(&name) {
            return Err(FlagtreeError::DuplicateBinding(name));
        }
        self.index.insert(name, self.flags.len());
        self.flags.push(Flag { binding, help });
        Ok(())
    }
}

/// Insert `value` at a dotted path. A name that collides with an existing
/// leaf is kept whole at the current level.
fn insert_nested(
    object: &mut serde_json::Map<String, serde_json::Value>,
    name: &str,
    value: serde_json::Value,
) {
    let Some((head, rest)) = name.split_once('.') else {
        object.insert(name.to_string(), value);
        return;
    };
    let slot = object
        .entry(head)
        .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
    match slot {
        serde_json::Value::Object(inner) => insert_nested(inner, rest, value),
        _ => {
            object.insert(name.to_string(), value);
        }
    }
}

/// Install one binding per leaf of `tree` into `registry`.
///
/// Stops at the first error. Bindings registered before it stay registered.
pub fn bind_into<T: Reflect>(
    registry: &mut dyn Registry,
    tree: &Shared<T>,
) -> Result<(), FlagtreeError> {
    let root: Rc<RefCell<dyn Reflect>> = tree.clone();
    traverse::walk(&root, registry)
}

/// Bind `tree` into a fresh, unnamed [`FlagSet`].
pub fn bind<T: Reflect>(tree: &Shared<T>) -> Result<FlagSet, FlagtreeError> {
    let mut flags = FlagSet::new("");
    bind_into(&mut flags, tree)?;
    Ok(flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::shared;
    use crate::fixtures::test::{
        Anchored, Coordinates, Hosts, Level, Narrow, Pinned, Routes, Sample, ServerConfig, Service,
        Unkeyed,
    };
    use crate::types::Value;
    use std::collections::{BTreeMap, HashSet};

    fn names(flags: &FlagSet) -> Vec<&str> {
        flags.iter().map(Flag::name).collect()
    }

    #[test]
    fn single_entry_mapping_scenario() {
        let tree = shared(HashMap::from([("Banana".to_string(), 7i64)]));
        let flags = bind(&tree).unwrap();
        assert_eq!(names(&flags), vec!["Banana"]);

        flags.set("Banana", "10").unwrap();
        assert_eq!(flags.lookup("Banana").unwrap().binding.get().unwrap(), Value::I64(10));
        assert_eq!(tree.borrow()["Banana"], 10);
    }

    #[test]
    fn nil_optional_record_is_materialized() {
        let tree = shared(Sample::default());
        let flags = bind(&tree).unwrap();
        assert_eq!(
            names(&flags),
            vec!["name", "index", "location.grid", "location.fraction"]
        );
        assert!(tree.borrow().location.is_some());

        flags.set("location.grid", "12").unwrap();
        assert_eq!(tree.borrow().location.as_ref().unwrap().grid, 12);
    }

    #[test]
    fn nil_required_record_fails_after_earlier_fields() {
        let tree = shared(Anchored::default());
        let mut flags = FlagSet::new("");
        let err = bind_into(&mut flags, &tree).unwrap_err();

        assert!(matches!(
            &err,
            FlagtreeError::NilUnallocatableReference { path } if path == "location"
        ));
        assert_eq!(
            err.to_string(),
            "cannot build bindings from nil reference for path `location`"
        );
        assert_eq!(names(&flags), vec!["name", "index"]);
        assert!(tree.borrow().location.is_none());
    }

    #[test]
    fn present_required_record_binds() {
        let tree = shared(Anchored {
            location: Some(Coordinates {
                grid: 3,
                fraction: 0.5,
            }),
            ..Anchored::default()
        });
        let flags = bind(&tree).unwrap();
        assert_eq!(flags.lookup("location.fraction").unwrap().binding.format().unwrap(), "0.5");
    }

    #[test]
    fn nil_mapping_entry_fails_at_first_offending_key() {
        let tree = shared(HashMap::from([
            (
                "alpha".to_string(),
                Some(Coordinates {
                    grid: 1,
                    fraction: 0.0,
                }),
            ),
            ("beta".to_string(), None),
            ("gamma".to_string(), None),
        ]));
        let mut flags = FlagSet::new("");
        let err = bind_into(&mut flags, &tree).unwrap_err();

        assert!(matches!(
            &err,
            FlagtreeError::NilUnallocatableReference { path } if path == "beta"
        ));
        assert_eq!(names(&flags), vec!["alpha.grid", "alpha.fraction"]);
        assert!(tree.borrow()["beta"].is_none());
    }

    #[test]
    fn flattened_record_adds_no_segment() {
        let tree = shared(Service::default());
        let flags = bind(&tree).unwrap();
        assert_eq!(names(&flags), vec!["domain", "port", "label"]);

        flags.set("port", "8443").unwrap();
        assert_eq!(tree.borrow().endpoint().port, 8443);
    }

    #[test]
    fn nested_mapping_of_records() {
        let mut hosts = HashMap::new();
        hosts.insert("secondary".to_string(), Coordinates::default());
        hosts.insert("primary".to_string(), Coordinates::default());
        let tree = shared(Hosts { hosts });
        let flags = bind(&tree).unwrap();

        assert_eq!(
            names(&flags),
            vec![
                "hosts.primary.grid",
                "hosts.primary.fraction",
                "hosts.secondary.grid",
                "hosts.secondary.fraction",
            ]
        );
        flags.set("hosts.primary.grid", "9").unwrap();
        assert_eq!(tree.borrow().hosts["primary"].grid, 9);
    }

    #[test]
    fn mapping_entries_can_repeat_or_extend() {
        let mut routes = Routes::default();
        routes.ports.insert("web".into(), vec![80]);
        routes.levels.insert("audit".into(), Level::Info);
        let tree = shared(routes);
        let flags = bind(&tree).unwrap();

        assert_eq!(names(&flags), vec!["ports.web", "levels.audit"]);
        assert!(flags.lookup("ports.web").unwrap().binding.is_repeated());

        flags.set("ports.web", "443").unwrap();
        flags.set("levels.audit", "warn").unwrap();
        assert!(flags.set("levels.audit", "loud").is_err());

        let routes = tree.borrow();
        assert_eq!(routes.ports["web"], vec![80, 443]);
        assert_eq!(routes.levels["audit"], Level::Warn);
    }

    #[test]
    fn non_string_keys_are_rejected() {
        let tree = shared(Unkeyed::default());
        let err = bind(&tree).unwrap_err();
        assert!(matches!(
            &err,
            FlagtreeError::NonStringMapKey { key_type: "i64", path } if path == "counts"
        ));

        let root = shared(HashMap::<u32, String>::new());
        assert!(matches!(
            bind(&root),
            Err(FlagtreeError::NonStringMapKey { path, .. }) if path.is_empty()
        ));
    }

    #[test]
    fn leaf_at_root_is_unsupported() {
        let tree = shared(5i64);
        let err = bind(&tree).unwrap_err();
        assert!(matches!(
            &err,
            FlagtreeError::UnsupportedType { type_name: "i64", path } if path.is_empty()
        ));
        assert_eq!(
            err.to_string(),
            "cannot build bindings from type `i64` for path ``"
        );
    }

    #[test]
    fn opaque_field_is_unsupported() {
        let tree = shared(Narrow::default());
        assert!(matches!(
            bind(&tree),
            Err(FlagtreeError::UnsupportedType { type_name: "u8", path }) if path == "small"
        ));
    }

    #[test]
    fn nil_root_is_nil_configuration() {
        let tree = shared(None::<Sample>);
        assert!(matches!(bind(&tree), Err(FlagtreeError::NilConfiguration)));
    }

    #[test]
    fn present_root_reference_is_followed() {
        let tree = shared(Some(Coordinates::default()));
        let flags = bind(&tree).unwrap();
        assert_eq!(names(&flags), vec!["grid", "fraction"]);
        flags.set("grid", "4").unwrap();
        assert_eq!(tree.borrow().as_ref().unwrap().grid, 4);
    }

    #[test]
    fn shared_pointer_is_unsettable() {
        let tree = shared(Pinned::default());
        let _alias = Rc::clone(&tree.borrow().origin);
        assert!(matches!(
            bind(&tree),
            Err(FlagtreeError::UnsettableLeaf { path, .. }) if path == "origin"
        ));
    }

    #[test]
    fn uniquely_owned_pointer_binds() {
        let tree = shared(Pinned::default());
        let flags = bind(&tree).unwrap();
        flags.set("origin.grid", "2").unwrap();
        assert_eq!(tree.borrow().origin.grid, 2);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let tree = shared(Sample::default());
        let mut flags = FlagSet::new("");
        bind_into(&mut flags, &tree).unwrap();
        assert!(matches!(
            bind_into(&mut flags, &tree),
            Err(FlagtreeError::DuplicateBinding(name)) if name == "name"
        ));
        assert_eq!(flags.len(), 4);
    }

    #[test]
    fn unknown_flag_is_an_error() {
        let flags = bind(&shared(Sample::default())).unwrap();
        assert!(matches!(
            flags.set("missing", "1"),
            Err(FlagtreeError::UnknownFlag(name)) if name == "missing"
        ));
    }

    #[test]
    fn every_binding_round_trips() {
        let tree = shared(ServerConfig::default());
        tree.borrow_mut().limits.insert("api".into(), -40);
        let flags = bind(&tree).unwrap();
        flags.set("port", "0x1F90").unwrap();
        flags.set("debug", "T").unwrap();
        flags.set("level", "warn").unwrap();
        flags.set("database.url", "pg://db").unwrap();

        for flag in flags.iter().filter(|flag| !flag.binding.is_repeated()) {
            let before = flag.binding.get().unwrap();
            let text = flag.binding.format().unwrap();
            flag.binding.set(&text).unwrap();
            assert_eq!(flag.binding.get().unwrap(), before, "{}", flag.name());
        }
    }

    #[test]
    fn names_are_unique_and_stable() {
        let first = shared(ServerConfig::default());
        first.borrow_mut().limits = BTreeMap::from([("b".into(), 1), ("a".into(), 2)]);
        let second = shared(ServerConfig::default());
        second.borrow_mut().limits = BTreeMap::from([("a".into(), 5), ("b".into(), 6)]);

        let a = bind(&first).unwrap();
        let b = bind(&second).unwrap();
        assert_eq!(names(&a), names(&b));
        let unique: HashSet<&str> = names(&a).into_iter().collect();
        assert_eq!(unique.len(), a.len());
        assert!(names(&a).contains(&"limits.a"));
    }

    #[test]
    fn repeated_binding_appends() {
        let tree = shared(ServerConfig::default());
        let flags = bind(&tree).unwrap();
        for tag in ["a", "b", "c"] {
            flags.set("tags", tag).unwrap();
        }
        assert_eq!(tree.borrow().tags, vec!["a", "b", "c"]);
        assert!(flags.lookup("tags").unwrap().binding.is_repeated());
        assert_eq!(flags.lookup("tags").unwrap().binding.to_string(), "[a, b, c]");
    }

    #[test]
    fn help_comes_from_doc_comments() {
        let flags = bind(&shared(ServerConfig::default())).unwrap();
        assert_eq!(
            flags.lookup("host").unwrap().help,
            Some("The host address to bind to.")
        );
        assert_eq!(
            flags.lookup("database.pool_size").unwrap().help,
            Some("Connection pool size.")
        );
    }

    #[test]
    fn toggles_are_marked() {
        let flags = bind(&shared(ServerConfig::default())).unwrap();
        assert!(flags.lookup("debug").unwrap().binding.is_toggle());
        assert!(!flags.lookup("port").unwrap().binding.is_toggle());
    }

    #[test]
    fn extension_field_is_a_leaf() {
        let tree = shared(ServerConfig::default());
        let flags = bind(&tree).unwrap();
        flags.set("level", "debug").unwrap();
        assert_eq!(tree.borrow().level, Level::Debug);
        assert!(flags.set("level", "chatty").is_err());
    }

    #[test]
    fn json_snapshot_nests_dotted_names() {
        let tree = shared(ServerConfig::default());
        let flags = bind(&tree).unwrap();
        flags.set("host", "example.com").unwrap();
        flags.set("database.pool_size", "8").unwrap();

        let json = flags.to_json().unwrap();
        assert_eq!(json["host"], "example.com");
        assert_eq!(json["database"]["pool_size"], 8);
        assert_eq!(json["tags"], serde_json::json!([]));
    }

    #[test]
    fn listing_follows_registration_order() {
        let flags = bind(&shared(Sample::default())).unwrap();
        let listing = flags.listing().unwrap();
        assert_eq!(listing[0], ("name".to_string(), String::new()));
        assert_eq!(listing[1], ("index".to_string(), "0".to_string()));
    }
}
