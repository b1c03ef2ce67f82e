//! # flagtree demo application
//!
//! A sample CLI tool that showcases how to integrate flagtree into a real
//! application. It exists purely to demonstrate and manually verify
//! flagtree's features.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example flagtree_demo -- echo
//! cargo run --example flagtree_demo -- config list
//! ```
//!
//! ## Features demonstrated
//!
//! | Feature                  | How to exercise it                                                        |
//! |--------------------------|---------------------------------------------------------------------------|
//! | Compiled defaults        | `cargo run --example flagtree_demo -- echo`                               |
//! | Config file (cwd)        | Create `flagtree-demo.conf` in cwd, then run `echo`                       |
//! | Config file (home)       | Place the file under `~/.flagtree-demo/` or the platform config dir       |
//! | Env var override         | `FLAGTREE_DEMO_DISPLAY_COLOR=red cargo run --example flagtree_demo -- echo` |
//! | Nested option            | `cargo run --example flagtree_demo -- --server.port 9999 echo`            |
//! | Bare toggle              | `cargo run --example flagtree_demo -- --verbose echo`                     |
//! | Repeated option          | `cargo run --example flagtree_demo -- --tags a --tags b echo`             |
//! | `config gen`             | `cargo run --example flagtree_demo -- config gen`                         |
//! | `config get`             | `cargo run --example flagtree_demo -- config get server.port`             |
//! | `config list`            | `cargo run --example flagtree_demo -- config list`                        |
//! | Single key echo          | `cargo run --example flagtree_demo -- echo --key display.color`           |

mod config;

use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};

use flagtree::{ConfigArgs, FlagSet, Flagtree, SearchPath, cli, shared};

use config::DemoConfig;

// ---------------------------------------------------------------------------
// CLI definitions
// ---------------------------------------------------------------------------

/// flagtree demo, a sample CLI app for showcasing flagtree integration.
///
/// Every configuration binding is also accepted as a top-level `--option`.
#[derive(Parser, Debug)]
#[command(name = "flagtree-demo")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print resolved configuration values (colored by display.color).
    Echo {
        /// Print only this dotted key instead of all values.
        #[arg(long)]
        key: Option<String>,
    },
    /// Inspect the configuration (gen, get, list).
    Config(ConfigArgs),
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";

fn echo_all(config: &DemoConfig, flags: &FlagSet) {
    let color = config.display.color.ansi_code();

    if config.verbose {
        println!(
            "{color}[verbose] Resolved configuration for {:?}{RESET}",
            config.name
        );
        println!();
    }

    let entries = flags.listing().unwrap_or_else(|e| fail("Failed to read config", e));
    if config.display.format == "plain" {
        for (key, value) in &entries {
            println!("{key}={value}");
        }
    } else {
        let max_key_len = entries.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        for (key, value) in &entries {
            println!("{color}{key:<max_key_len$}{RESET}  {value}");
        }
    }
}

fn echo_key(config: &DemoConfig, flags: &FlagSet, key: &str) {
    let color = config.display.color.ansi_code();
    let Some(flag) = flags.lookup(key) else {
        eprintln!("Unknown key: {key}");
        std::process::exit(1);
    };
    println!("{color}{key}{RESET}  {}", flag.binding);
}

fn fail(context: &str, err: flagtree::FlagtreeError) -> ! {
    eprintln!("{context}:\n{err}");
    std::process::exit(1);
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    let config = shared(DemoConfig::default());

    // Files and environment first; the command line is applied once clap has
    // seen the binding options.
    let flags = Flagtree::builder()
        .app_name("flagtree-demo")
        .env_prefix("FLAGTREE_DEMO")
        .search_paths(vec![
            SearchPath::Platform,
            SearchPath::Home(".flagtree-demo"),
            SearchPath::Cwd,
        ])
        .load(&config)
        .unwrap_or_else(|e| fail("Failed to load config", e));

    let matches = cli::augment(Cli::command(), &flags).get_matches();
    cli::apply_matches(&flags, &matches).unwrap_or_else(|e| fail("Invalid option", e));
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    match cli.command {
        Commands::Echo { key } => {
            let config = config.borrow();
            match key {
                Some(k) => echo_key(&config, &flags, &k),
                None => echo_all(&config, &flags),
            }
        }
        Commands::Config(args) => {
            let action = args.into_action();
            let result = flags
                .handle(&action)
                .unwrap_or_else(|e| fail("Config error", e));
            println!("{result}");
        }
    }
}
