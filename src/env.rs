//! Environment variable overlay.
//!
//! For a [`FlagSet`] named `MYAPP`, the binding `database.pool_size` is read
//! from `MYAPP_DATABASE_POOL_SIZE`. Dots and spaces become `_` and both parts
//! are upper-cased. An unnamed set uses the bare key (`DATABASE_POOL_SIZE`).

use std::collections::HashMap;

use crate::error::FlagtreeError;
use crate::registry::FlagSet;

/// The variable consulted for binding `key` under `prefix`.
pub fn variable_name(prefix: &str, key: &str) -> String {
    let prefix = normalize(prefix);
    let key = normalize(key);
    if prefix.is_empty() {
        key
    } else {
        format!("{prefix}_{key}")
    }
}

fn normalize(part: &str) -> String {
    part.trim().replace(['.', ' '], "_").to_uppercase()
}

/// Set every binding whose variable is present in `vars`, in registration
/// order. The first failure aborts; earlier sets stay applied.
pub fn apply_env(
    flags: &FlagSet,
    vars: impl IntoIterator<Item = (String, String)>,
) -> Result<(), FlagtreeError> {
    let vars: HashMap<String, String> = vars.into_iter().collect();

    for flag in flags.iter() {
        let var = variable_name(flags.name(), flag.name());
        let Some(value) = vars.get(&var) else {
            continue;
        };
        tracing::debug!(%var, flag = flag.name(), "applying environment variable");
        flag.binding
            .set(value)
            .map_err(|e| FlagtreeError::EnvVar {
                var,
                source: Box::new(e),
            })?;
    }
    Ok(())
}

/// [`apply_env`] over the process environment.
pub fn apply_process_env(flags: &FlagSet) -> Result<(), FlagtreeError> {
    apply_env(flags, process_vars())
}

/// The process environment, skipping variables that are not valid UTF-8.
pub(crate) fn process_vars() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::shared;
    use crate::fixtures::test::{Sample, ServerConfig};
    use crate::registry::bind_into;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn names_are_normalized() {
        assert_eq!(variable_name("myapp", "database.pool_size"), "MYAPP_DATABASE_POOL_SIZE");
        assert_eq!(variable_name("", "host"), "HOST");
        assert_eq!(variable_name(" my app ", "a b.c"), "MY_APP_A_B_C");
    }

    #[test]
    fn prefixed_variables_set_bindings() {
        let tree = shared(ServerConfig::default());
        let mut flags = FlagSet::new("myapp");
        bind_into(&mut flags, &tree).unwrap();

        apply_env(
            &flags,
            vars(&[
                ("MYAPP_HOST", "0.0.0.0"),
                ("MYAPP_DATABASE_POOL_SIZE", "20"),
                ("MYAPP_DEBUG", "1"),
                ("HOST", "ignored"),
            ]),
        )
        .unwrap();

        let config = tree.borrow();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.database.pool_size, 20);
        assert!(config.debug);
    }

    #[test]
    fn unnamed_set_uses_bare_keys() {
        let tree = shared(Sample::default());
        let mut flags = FlagSet::new("");
        bind_into(&mut flags, &tree).unwrap();
        apply_env(&flags, vars(&[("LOCATION_GRID", "0x20")])).unwrap();
        assert_eq!(tree.borrow().location.as_ref().unwrap().grid, 32);
    }

    #[test]
    fn first_failure_aborts_with_variable_name() {
        let tree = shared(Sample::default());
        let mut flags = FlagSet::new("app");
        bind_into(&mut flags, &tree).unwrap();

        let err = apply_env(
            &flags,
            vars(&[
                ("APP_NAME", "kept"),
                ("APP_INDEX", "nope"),
                ("APP_LOCATION_GRID", "7"),
            ]),
        )
        .unwrap_err();

        assert!(matches!(&err, FlagtreeError::EnvVar { var, .. } if var == "APP_INDEX"));
        assert_eq!(err.path(), Some("index"));
        assert_eq!(tree.borrow().name, "kept");
        assert_eq!(tree.borrow().location.as_ref().unwrap().grid, 0);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_variables_are_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        // SAFETY: the names are unique to this test and no other thread reads them.
        unsafe {
            std::env::set_var("FLAGTREE_ENVTEST_GARBLED", OsStr::from_bytes(b"\xff\xfe"));
            std::env::set_var("FLAGTREE_ENVTEST_INDEX", "12");
        }

        let tree = shared(Sample::default());
        let mut flags = FlagSet::new("flagtree_envtest");
        bind_into(&mut flags, &tree).unwrap();
        let result = apply_process_env(&flags);

        unsafe {
            std::env::remove_var("FLAGTREE_ENVTEST_GARBLED");
            std::env::remove_var("FLAGTREE_ENVTEST_INDEX");
        }
        result.unwrap();
        assert_eq!(tree.borrow().index, 12);
    }

    #[test]
    fn absent_variables_leave_values_alone() {
        let tree = shared(Sample::default());
        let mut flags = FlagSet::new("app");
        bind_into(&mut flags, &tree).unwrap();
        apply_env(&flags, vars(&[])).unwrap();
        assert_eq!(tree.borrow().index, 0);
    }
}
