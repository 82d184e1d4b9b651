use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use mailroom::api::credentials::list_profiles;
use mailroom::api::{load_catalog, ApiClient, Overrides};
use mailroom::resource::{Dispatcher, JsonItems};
use serde_json::Value;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Run newsletter API operations from a declarative catalog
#[derive(Parser, Debug)]
#[command(name = "mailroom", version, about)]
struct Args {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Credentials/config profile
    #[arg(long, global = true, env = "MAILROOM_PROFILE", default_value = "default")]
    profile: String,

    /// Catalog file to use instead of the built-in one
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute one operation for every input item
    Run {
        resource: String,
        operation: String,

        /// JSON file with one object or an array of objects; "-" reads stdin
        #[arg(long)]
        params: Option<String>,

        /// Parameter applied to every item (value parsed as JSON when possible)
        #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
        param: Vec<String>,

        /// Override the profile's base URL
        #[arg(long)]
        base_url: Option<String>,

        /// Emit an error record for a failing item instead of stopping
        #[arg(long)]
        continue_on_fail: bool,

        /// Include the originating item index with each record
        #[arg(long)]
        paired: bool,
    },

    /// List resources, or the operations of one resource
    Catalog { resource: Option<String> },

    /// List configured profiles
    Profiles,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);
    debug!("mailroom {} starting", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Run {
            resource,
            operation,
            params,
            param,
            base_url,
            continue_on_fail,
            paired,
        } => {
            let overrides = Overrides {
                base_url,
                catalog_path: args.catalog,
                continue_on_fail,
            };
            let items = read_items(params.as_deref(), &param).await?;
            run(&args.profile, &overrides, &resource, &operation, &items, paired).await
        }
        Command::Catalog { resource } => {
            let catalog = load_catalog(args.catalog.as_deref())?;
            let names = match resource.as_deref() {
                Some(resource) => {
                    let ops = catalog.operations(resource);
                    if ops.is_empty() {
                        return Err(anyhow!("Unknown resource: {}", resource));
                    }
                    ops
                }
                None => catalog.resources(),
            };
            for name in names {
                println!("{}", name);
            }
            Ok(())
        }
        Command::Profiles => {
            for profile in list_profiles() {
                println!("{}", profile);
            }
            Ok(())
        }
    }
}

async fn run(
    profile: &str,
    overrides: &Overrides,
    resource: &str,
    operation: &str,
    items: &JsonItems,
    paired: bool,
) -> Result<()> {
    let client = ApiClient::new(profile, overrides)?;
    let catalog = client.catalog()?;
    let dispatcher = Dispatcher::new(&catalog, &client.http, client.settings.dispatch_options());

    let records = dispatcher
        .execute(resource, operation, items, items.len())
        .await
        .map_err(|e| {
            let summary = e.summary();
            anyhow::Error::new(e).context(summary)
        })?;

    let output = if paired {
        serde_json::to_value(&records)?
    } else {
        Value::Array(records.into_iter().map(|r| r.json).collect())
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Load input items and apply `KEY=VALUE` overrides to each
async fn read_items(source: Option<&str>, overrides: &[String]) -> Result<JsonItems> {
    let mut items = match source {
        Some("-") => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Could not read parameters from stdin")?;
            parse_items(&buf)?
        }
        Some(path) => {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Could not read {}", path))?;
            parse_items(&content)?
        }
        None => JsonItems::from_value(Value::Object(Default::default())),
    };

    for pair in overrides {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected KEY=VALUE, got '{}'", pair))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        items.set_all(key.trim(), value);
    }

    Ok(items)
}

fn parse_items(content: &str) -> Result<JsonItems> {
    let value: Value = serde_json::from_str(content).context("Parameters must be JSON")?;
    Ok(JsonItems::from_value(value))
}
