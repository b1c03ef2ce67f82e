//! Configuration structs for the flagtree demo application.
//!
//! [`DemoConfig`] holds top-level scalars, a repeated `tags` setting and two
//! nested records. Every `pub` field becomes a binding named by its dotted
//! path, which is also the config file key, the `--option` name and (upper
//! cased, under the `FLAGTREE_DEMO` prefix) the environment variable:
//!
//! | Binding                  | Env var                                 |
//! |--------------------------|-----------------------------------------|
//! | `name`                   | `FLAGTREE_DEMO_NAME`                    |
//! | `verbose`                | `FLAGTREE_DEMO_VERBOSE`                 |
//! | `tags`                   | `FLAGTREE_DEMO_TAGS`                    |
//! | `server.host`            | `FLAGTREE_DEMO_SERVER_HOST`             |
//! | `server.port`            | `FLAGTREE_DEMO_SERVER_PORT`             |
//! | `server.max_connections` | `FLAGTREE_DEMO_SERVER_MAX_CONNECTIONS`  |
//! | `display.color`          | `FLAGTREE_DEMO_DISPLAY_COLOR`           |
//! | `display.format`         | `FLAGTREE_DEMO_DISPLAY_FORMAT`          |

use std::fmt;

use flagtree::{BoxError, FlagValue, Reflect, Value};

/// Root configuration for the demo application.
#[derive(Reflect, Debug)]
pub struct DemoConfig {
    /// Application name shown in the echo banner.
    pub name: String,

    /// Enable verbose output.
    pub verbose: bool,

    /// Labels printed after the banner. Repeat the option to add more.
    pub tags: Vec<String>,

    /// Server settings.
    pub server: ServerConfig,

    /// Display and formatting settings.
    pub display: DisplayConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            name: "flagtree-demo".into(),
            verbose: false,
            tags: Vec::new(),
            server: ServerConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

/// Server-related configuration, bound under `server.*`.
#[derive(Reflect, Debug)]
pub struct ServerConfig {
    /// Hostname to bind to.
    pub host: String,

    /// Port number.
    pub port: u32,

    /// Maximum number of allowed connections.
    pub max_connections: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            max_connections: 100,
        }
    }
}

/// Display and output formatting configuration, bound under `display.*`.
#[derive(Reflect, Debug)]
pub struct DisplayConfig {
    /// Terminal color for the echo command output.
    pub color: Color,

    /// Output format (pretty or plain).
    pub format: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color: Color::default(),
            format: "pretty".into(),
        }
    }
}

/// A terminal color, parsed from its name.
#[derive(Reflect, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[flag(value)]
pub enum Color {
    Red,
    Green,
    #[default]
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl Color {
    const ALL: [(Color, &'static str); 7] = [
        (Color::Red, "red"),
        (Color::Green, "green"),
        (Color::Yellow, "yellow"),
        (Color::Blue, "blue"),
        (Color::Magenta, "magenta"),
        (Color::Cyan, "cyan"),
        (Color::White, "white"),
    ];

    pub fn ansi_code(self) -> &'static str {
        match self {
            Color::Red => "\x1b[31m",
            Color::Green => "\x1b[32m",
            Color::Yellow => "\x1b[33m",
            Color::Blue => "\x1b[34m",
            Color::Magenta => "\x1b[35m",
            Color::Cyan => "\x1b[36m",
            Color::White => "\x1b[37m",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = Color::ALL
            .iter()
            .find(|(color, _)| color == self)
            .map_or("yellow", |(_, name)| *name);
        f.write_str(name)
    }
}

impl FlagValue for Color {
    fn set(&mut self, text: &str) -> Result<(), BoxError> {
        let wanted = text.trim().to_ascii_lowercase();
        let (color, _) = Color::ALL
            .iter()
            .find(|(_, name)| *name == wanted)
            .ok_or_else(|| format!("unknown color {text:?}"))?;
        *self = *color;
        Ok(())
    }

    fn get(&self) -> Value {
        Value::Text(self.to_string())
    }
}
