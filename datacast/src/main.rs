//! # datacast
//!
//! A CLI for turning JSON record collections into csv, text, json,
//! spreadsheets or charts.
//!
//! ## Overview
//!
//! datacast is built on top of datacastlib. It reads a JSON array of flat
//! records, builds a table, applies transform directives and writes the
//! document for the first requested format that is enabled.
//!
//! ## Usage
//!
//! ```bash
//! # csv (the default) to stdout
//! datacast readings.json
//!
//! # Spreadsheet with one sheet per site
//! datacast readings.json --split-by site --format xlsx -o readings.xlsx
//!
//! # Pivot sites into columns, indexed by date
//! datacast readings.json --format txt \
//!     --transform '{"operation": "pivot", "key_column": "site", "value_column": "temp", "index_column": "date"}'
//!
//! # Formats resolve from ids or content types, first match wins
//! cat readings.json | datacast - --accept "image/svg+xml, text/csv"
//!
//! # List enabled formats
//! datacast formats --config datacast.toml
//! ```

use std::fs;
use std::io::{self, Read, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use console::Style;
use datacastlib::output::accept_tokens;
use datacastlib::{BuildOptions, Config, Envelope, Record, Transform};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Build the clap Command structure
fn build_command() -> Command {
    Command::new("datacast")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Encode JSON record collections as csv, text, json, spreadsheets or charts")
        .arg(
            Arg::new("input")
                .help("JSON array of records (`-` reads stdin)")
                .default_value("-"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .action(ArgAction::Append)
                .help("Requested format id or content type, in preference order (can be specified multiple times)"),
        )
        .arg(
            Arg::new("accept")
                .long("accept")
                .help("Accept-style list of content types (tried after --format)"),
        )
        .arg(
            Arg::new("columns")
                .short('c')
                .long("columns")
                .value_delimiter(',')
                .help("Declared columns, in order (comma-separated)"),
        )
        .arg(
            Arg::new("permissive")
                .long("permissive")
                .action(ArgAction::SetTrue)
                .help("Drop fields outside --columns instead of failing"),
        )
        .arg(
            Arg::new("index")
                .short('i')
                .long("index")
                .help("Field to use as the row index"),
        )
        .arg(
            Arg::new("split-by")
                .short('s')
                .long("split-by")
                .help("Split into one table per distinct value of this field"),
        )
        .arg(
            Arg::new("timestamp")
                .long("timestamp")
                .action(ArgAction::Append)
                .value_delimiter(',')
                .help("Parse these text fields as timestamps"),
        )
        .arg(
            Arg::new("transform")
                .short('t')
                .long("transform")
                .action(ArgAction::Append)
                .help("Transform directive as JSON (can be specified multiple times)"),
        )
        .arg(
            Arg::new("transforms")
                .long("transforms")
                .help("File holding a JSON array of transform directives"),
        )
        .arg(config_arg())
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Write the document to a file instead of stdout"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Log pipeline stages to stderr (-vv for more)"),
        )
        .subcommand(
            Command::new("formats")
                .about("List enabled formats in resolution order")
                .arg(config_arg()),
        )
}

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .help("TOML configuration file")
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `-v`.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(io::stderr)
                .compact(),
        )
        .init();
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    match matches.get_one::<String>("config") {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {path}"))?;
            Ok(Config::from_toml(&text)?)
        }
        None => Ok(Config::default()),
    }
}

fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read records from stdin")?;
        Ok(text)
    } else {
        fs::read_to_string(path).with_context(|| format!("Failed to read records from {path}"))
    }
}

/// Extract build options from matches
fn build_options(matches: &ArgMatches) -> BuildOptions {
    let mut options = BuildOptions::new().permissive(matches.get_flag("permissive"));
    if let Some(columns) = matches.get_many::<String>("columns") {
        options = options.columns(columns.cloned());
    }
    if let Some(index) = matches.get_one::<String>("index") {
        options = options.index(index.as_str());
    }
    if let Some(split) = matches.get_one::<String>("split-by") {
        options = options.split_by(split.as_str());
    }
    if let Some(fields) = matches.get_many::<String>("timestamp") {
        options = options.timestamps(fields.cloned());
    }
    options
}

fn load_transforms(matches: &ArgMatches) -> Result<Vec<Transform>> {
    let mut transforms = Vec::new();
    if let Some(path) = matches.get_one::<String>("transforms") {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read transforms file {path}"))?;
        transforms.extend(Transform::list_from_json(&text)?);
    }
    for directive in matches.get_many::<String>("transform").into_iter().flatten() {
        transforms.push(Transform::from_json(directive)?);
    }
    Ok(transforms)
}

fn requested_formats(matches: &ArgMatches) -> Vec<String> {
    let mut requested: Vec<String> = matches
        .get_many::<String>("format")
        .map(|v| v.cloned().collect())
        .unwrap_or_default();
    if let Some(accept) = matches.get_one::<String>("accept") {
        requested.extend(accept_tokens(accept));
    }
    requested
}

fn run_encode(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let registry = config.registry()?;

    let input = matches
        .get_one::<String>("input")
        .map(String::as_str)
        .unwrap_or("-");
    let records = Record::parse_json_array(&read_input(input)?)?;

    let encoded = Envelope::new(&registry)
        .options(build_options(matches))
        .transforms(load_transforms(matches)?)
        .render(&records, &requested_formats(matches))?;

    match matches.get_one::<String>("output") {
        Some(path) => fs::write(path, &encoded.bytes)
            .with_context(|| format!("Failed to write {path}"))?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&encoded.bytes)?;
            stdout.flush()?;
        }
    }
    info!(content_type = %encoded.content_type, bytes = encoded.bytes.len(), "wrote document");
    Ok(())
}

fn run_formats(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let registry = config.registry()?;
    let width = registry
        .formats()
        .iter()
        .map(|r| r.format_id().len())
        .max()
        .unwrap_or(0);
    let marker = Style::new().bold();
    for registration in registry.formats() {
        let default = registry.default_id() == Some(registration.format_id());
        println!(
            "{:<width$}  {}{}",
            registration.format_id(),
            registration.content_types().join(", "),
            if default {
                format!("  {}", marker.apply_to("(default)"))
            } else {
                String::new()
            }
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let matches = build_command().get_matches();
    init_logging(matches.get_count("verbose"));

    let result = match matches.subcommand() {
        Some(("formats", sub)) => run_formats(sub),
        _ => run_encode(&matches),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", Style::new().red().bold().for_stderr().apply_to("Error:"));
            ExitCode::FAILURE
        }
    }
}
