//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use tracing::info;

use wikitrigger_core::{CursorCodec, TriggerEngine, error_body};
use wikitrigger_shared::{
    AppConfig, TriggerKind, TriggerRequest, cursor_secret, init_config, load_config,
    load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// WikiTrigger: poll Wikipedia-family feeds as automation triggers.
#[derive(Parser)]
#[command(
    name = "wikitrigger",
    version,
    about = "Evaluate wiki feed triggers and emit new events with a resumable cursor.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.wikitrigger/wikitrigger.toml).
    #[arg(long, global = true, env = "WIKITRIGGER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Evaluate a trigger once and print the JSON response.
    Poll {
        /// Trigger kind slug (see `wikitrigger kinds`).
        kind: TriggerKind,

        /// Cursor returned by the previous poll.
        #[arg(long)]
        cursor: Option<String>,

        /// Maximum number of events to return.
        #[arg(long, allow_hyphen_values = true)]
        limit: Option<i64>,

        /// Trigger field as key=value (repeatable), e.g. --field hashtag=1lib1ref.
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,

        /// Read the request body (platform JSON) from a file; flags override it.
        #[arg(long)]
        request: Option<PathBuf>,
    },

    /// List trigger kinds and their fields.
    Kinds,

    /// Cursor inspection.
    Cursor {
        #[command(subcommand)]
        action: CursorAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Cursor subcommands.
#[derive(Subcommand)]
pub(crate) enum CursorAction {
    /// Print the watermark a cursor token encodes.
    Decode {
        /// Cursor token.
        token: String,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

fn parse_field(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty field name in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout is
/// reserved for JSON output.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "wikitrigger=info",
        1 => "wikitrigger=debug",
        _ => "wikitrigger=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Poll {
            kind,
            cursor,
            limit,
            fields,
            request,
        } => {
            let config = resolve_config(config_path.as_ref())?;
            let mut req = match request {
                Some(path) => read_request(&path)?,
                None => TriggerRequest::default(),
            };
            if cursor.is_some() {
                req.cursor = cursor;
            }
            if limit.is_some() {
                req.limit = limit;
            }
            for (key, value) in fields {
                req.trigger_fields.insert(key, value);
            }
            cmd_poll(&config, kind, &req).await
        }
        Command::Kinds => cmd_kinds(),
        Command::Cursor { action } => match action {
            CursorAction::Decode { token } => {
                cmd_cursor_decode(&resolve_config(config_path.as_ref())?, &token)
            }
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_ref()),
        },
    }
}

fn resolve_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

fn read_request(path: &PathBuf) -> Result<TriggerRequest> {
    let body = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read request file {}", path.display()))?;
    serde_json::from_str(&body)
        .wrap_err_with(|| format!("invalid request JSON in {}", path.display()))
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

async fn cmd_poll(config: &AppConfig, kind: TriggerKind, request: &TriggerRequest) -> Result<()> {
    let engine = TriggerEngine::from_config(config)?;

    match engine.evaluate(kind, request).await {
        Ok(eval) => {
            println!("{}", serde_json::to_string_pretty(&eval.response)?);
            info!(
                delivered = eval.stats.delivered,
                malformed = eval.stats.malformed,
                cursor_reset = eval.stats.cursor_reset,
                "poll complete"
            );
            Ok(())
        }
        Err(err) => {
            println!("{}", serde_json::to_string_pretty(&error_body(&err))?);
            let hint = if err.is_retryable() {
                "upstream unavailable; retry later"
            } else {
                "request rejected"
            };
            Err(err).wrap_err(hint)
        }
    }
}

fn cmd_kinds() -> Result<()> {
    for kind in TriggerKind::ALL {
        let mut fields: Vec<&str> = Vec::new();
        if kind.takes_lang() {
            fields.push("lang");
        }
        fields.extend(kind.required_fields());
        let shape = if kind.is_singleton() { "daily" } else { "stream" };
        let fields = if fields.is_empty() {
            "-".to_string()
        } else {
            fields.join(", ")
        };
        println!("{:<20} {:<7} {fields}", kind.slug(), shape);
    }
    Ok(())
}

fn cmd_cursor_decode(config: &AppConfig, token: &str) -> Result<()> {
    let codec = CursorCodec::new(cursor_secret(config));
    let watermark = codec
        .decode(Some(token))
        .wrap_err("cursor would reset to the null watermark on the next poll")?;
    println!("{}", serde_json::to_string_pretty(&watermark)?);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&PathBuf>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
