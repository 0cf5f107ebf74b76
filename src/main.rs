//! AMT WS-Management command line client.
//!
//! Run with: `amt-wsman --config amt.yaml get AMT_GeneralSettings`

use std::path::PathBuf;

use amt_wsman::{Client, ClientConfig, ResourceUri, Schema, SelectorSet};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Query Intel AMT over WS-Management.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long, default_value = "amt.yaml")]
    config: PathBuf,

    /// Override the target host from the configuration
    #[arg(short, long)]
    target: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Get a class or a single instance
    Get {
        /// Class name, e.g. AMT_GeneralSettings
        class: String,

        /// Schema, inferred from the class prefix when omitted
        #[arg(long, value_enum)]
        schema: Option<SchemaArg>,

        /// Instance selector as NAME=VALUE (repeatable)
        #[arg(short, long = "selector")]
        selectors: Vec<String>,
    },
    /// Enumerate every instance of a class
    Enumerate {
        class: String,

        #[arg(long, value_enum)]
        schema: Option<SchemaArg>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SchemaArg {
    Amt,
    Cim,
    Ips,
}

impl From<SchemaArg> for Schema {
    fn from(arg: SchemaArg) -> Self {
        match arg {
            SchemaArg::Amt => Schema::Amt,
            SchemaArg::Cim => Schema::Cim,
            SchemaArg::Ips => Schema::Ips,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = args.log_level.parse().unwrap_or(Level::WARN);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let mut config = if args.config.exists() {
        let content = std::fs::read_to_string(&args.config).context("Failed to read config file")?;
        serde_yaml::from_str(&content).context("Failed to parse config file")?
    } else {
        info!("Config file {} not found, using defaults", args.config.display());
        ClientConfig::default()
    };
    if let Some(target) = args.target {
        config.connection.target = target;
    }

    info!(
        endpoint = %config.endpoint_url(),
        mode = ?config.auth.mode,
        self_signed_allowed = config.connection.self_signed_allowed,
        "Configuration loaded"
    );

    let client = Client::connect(config).context("Failed to connect to WS-Management endpoint")?;

    match args.command {
        Command::Get {
            class,
            schema,
            selectors,
        } => {
            let resource = resolve_resource(&class, schema)?;
            let selectors = parse_selectors(&selectors)?;
            let response = client
                .get(&resource, Some(&selectors))
                .with_context(|| format!("Get {class} failed"))?;
            println!("{}", response.text());
        }
        Command::Enumerate { class, schema } => {
            let resource = resolve_resource(&class, schema)?;
            let mut pages = client.enumerator(resource);
            let mut count = 0usize;
            while let Some(page) = pages
                .next_page()
                .with_context(|| format!("Enumerate {class} failed"))?
            {
                for item in page.items() {
                    println!("{item}");
                }
                count += page.items().len();
            }
            info!(class = %class, count, "Enumeration complete");
        }
    }

    Ok(())
}

fn resolve_resource(class: &str, schema: Option<SchemaArg>) -> Result<ResourceUri> {
    match schema {
        Some(schema) => Ok(ResourceUri::new(schema.into(), class)),
        None => ResourceUri::for_class(class).ok_or_else(|| {
            anyhow!("cannot infer schema for `{class}`; pass --schema amt|cim|ips")
        }),
    }
}

fn parse_selectors(raw: &[String]) -> Result<SelectorSet> {
    raw.iter().try_fold(SelectorSet::new(), |set, pair| {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("selector `{pair}` is not NAME=VALUE"))?;
        Ok(set.with(name.trim(), value))
    })
}
