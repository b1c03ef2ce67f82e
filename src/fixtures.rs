#[cfg(test)]
pub mod test {
    use std::collections::{BTreeMap, HashMap};
    use std::fmt;
    use std::rc::Rc;

    use crate::error::BoxError;
    use crate::reflect::FlagValue;
    use crate::types::Value;
    use crate::Reflect;

    #[derive(Reflect, Debug, Default, Clone, PartialEq)]
    pub struct Coordinates {
        pub grid: u64,
        pub fraction: f64,
    }

    /// A record whose nested record starts out nil.
    #[derive(Reflect, Debug, Default)]
    pub struct Sample {
        pub name: String,
        pub index: i32,
        pub location: Option<Coordinates>,
    }

    #[derive(Reflect, Debug, Default)]
    pub struct Anchored {
        pub name: String,
        pub index: i32,
        #[flag(required)]
        pub location: Option<Coordinates>,
    }

    #[derive(Reflect, Debug, Default)]
    pub struct ServerConfig {
        /// The host address to bind to.
        pub host: String,

        /// The port number.
        pub port: u32,

        /// Enable debug mode.
        pub debug: bool,

        /// Tags attached to every request.
        pub tags: Vec<String>,

        /// Per-route request limits.
        pub limits: BTreeMap<String, i64>,

        /// Logging verbosity.
        pub level: Level,

        /// Database settings.
        pub database: DatabaseConfig,
    }

    #[derive(Reflect, Debug, Default)]
    pub struct DatabaseConfig {
        /// Connection string URL.
        pub url: Option<String>,

        /// Connection pool size.
        pub pool_size: u32,
    }

    // -- Fixtures for flattening and field visibility --------------------------

    #[derive(Reflect, Debug, Default)]
    pub struct Endpoint {
        pub domain: String,
        pub port: u32,
    }

    #[derive(Reflect, Debug, Default)]
    pub struct Service {
        #[flag(flatten)]
        endpoint: Endpoint,
        pub label: String,
        #[flag(skip)]
        pub cache: Vec<String>,
        secret: String,
    }

    impl Service {
        pub fn endpoint(&self) -> &Endpoint {
            &self.endpoint
        }

        pub fn secret(&self) -> &str {
            &self.secret
        }
    }

    // -- Fixtures for traversal failures ---------------------------------------

    #[derive(Reflect, Debug, Default)]
    pub struct Hosts {
        pub hosts: HashMap<String, Coordinates>,
    }

    #[derive(Reflect, Debug, Default)]
    pub struct Routes {
        pub ports: BTreeMap<String, Vec<u32>>,
        pub levels: BTreeMap<String, Level>,
    }

    #[derive(Reflect, Debug, Default)]
    pub struct Unkeyed {
        pub counts: HashMap<i64, String>,
    }

    #[derive(Reflect, Debug, Default)]
    pub struct Narrow {
        pub small: u8,
    }

    #[derive(Reflect, Debug, Default)]
    pub struct Pinned {
        pub origin: Rc<Coordinates>,
    }

    // -- Extension leaves ------------------------------------------------------

    #[derive(Reflect, Debug, Default, Clone, Copy, PartialEq, Eq)]
    #[flag(value)]
    pub enum Level {
        #[default]
        Info,
        Debug,
        Warn,
    }

    impl fmt::Display for Level {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let name = match self {
                Level::Info => "info",
                Level::Debug => "debug",
                Level::Warn => "warn",
            };
            f.write_str(name)
        }
    }

    impl FlagValue for Level {
        fn set(&mut self, text: &str) -> Result<(), BoxError> {
            *self = match text.to_ascii_lowercase().as_str() {
                "info" => Level::Info,
                "debug" => Level::Debug,
                "warn" => Level::Warn,
                _ => return Err(format!("unknown level {text:?}").into()),
            };
            Ok(())
        }

        fn get(&self) -> Value {
            Value::Text(self.to_string())
        }
    }

    /// An on/off extension that may be given as a bare flag.
    #[derive(Reflect, Debug, Default, Clone, Copy, PartialEq, Eq)]
    #[flag(value)]
    pub struct Switch(pub bool);

    impl fmt::Display for Switch {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(if self.0 { "on" } else { "off" })
        }
    }

    impl FlagValue for Switch {
        fn set(&mut self, text: &str) -> Result<(), BoxError> {
            self.0 = match text {
                "on" | "true" => true,
                "off" | "false" => false,
                _ => return Err(format!("expected on or off, found {text:?}").into()),
            };
            Ok(())
        }

        fn get(&self) -> Value {
            Value::Bool(self.0)
        }

        fn is_toggle(&self) -> bool {
            true
        }
    }

    #[test]
    fn service_hides_private_fields() {
        let service = Service::default();
        assert_eq!(service.secret(), "");
        assert_eq!(service.endpoint().port, 0);
    }
}
