//! confmerge: run the parameter merge hook against a configuration tree and
//! print the resulting run parameters.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use confmerge::config::{coerce_value, merge_at_path};
use confmerge::hook::{PARAMETERS_KEY, RUNTIME_PARAMS_KEY};
use confmerge::{default_hooks, Error, HookRegistry, MergeSettings, RunParams};
use toml::{Table, Value};

/// Merge layered pipeline configuration into run parameters
#[derive(Debug, Parser)]
#[command(name = "confmerge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (TOML, YAML or JSON); CONFMERGE__* variables override it
    #[arg(long, env = "CONFMERGE_SETTINGS")]
    settings: Option<PathBuf>,

    /// Configuration root holding one directory per environment
    #[arg(long)]
    conf_source: Option<PathBuf>,

    /// Base environment label
    #[arg(long)]
    env: Option<String>,

    /// Environment layered over the base environment
    #[arg(long)]
    run_env: Option<String>,

    /// Additional top-level section to exclude (repeatable)
    #[arg(long = "exclude", value_name = "SECTION")]
    excluded: Vec<String>,

    /// Caller-supplied parameter, wins over configuration (repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    params: Vec<(String, Value)>,

    /// Runtime parameter passed to the loader (repeatable, dotted keys nest)
    #[arg(long = "runtime-param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    runtime_params: Vec<(String, Value)>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Toml,
}

fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    confmerge::logging::init(cli.verbose)?;

    let settings = settings_from(&cli)?;
    let mut run_params = RunParams::new();
    if !cli.params.is_empty() {
        run_params.insert(PARAMETERS_KEY.to_string(), Value::Table(nested(&cli.params)));
    }
    if !cli.runtime_params.is_empty() {
        run_params.insert(
            RUNTIME_PARAMS_KEY.to_string(),
            Value::Table(nested(&cli.runtime_params)),
        );
    }

    let hooks: HookRegistry<(), ()> = default_hooks(settings);
    hooks.before_pipeline_run(&mut run_params, &(), &());

    let parameters = match run_params.remove(PARAMETERS_KEY) {
        Some(Value::Table(parameters)) => parameters,
        _ => Table::new(),
    };
    let rendered = match cli.format {
        OutputFormat::Json => serde_json::to_string_pretty(&parameters)?,
        OutputFormat::Toml => toml::to_string_pretty(&parameters)?,
    };
    println!("{rendered}");
    Ok(())
}

fn settings_from(cli: &Cli) -> Result<MergeSettings, Error> {
    let mut settings = MergeSettings::load(cli.settings.as_deref())?;
    if let Some(conf_source) = &cli.conf_source {
        settings.conf_source.clone_from(conf_source);
    }
    if let Some(env) = &cli.env {
        settings.env.clone_from(env);
    }
    if let Some(run_env) = &cli.run_env {
        settings.run_env = Some(run_env.clone());
    }
    for section in &cli.excluded {
        settings.excluded_sections.insert(section.clone());
    }
    Ok(settings)
}

fn nested(pairs: &[(String, Value)]) -> Table {
    let mut table = Table::new();
    for (key, value) in pairs {
        let path: Vec<String> = key.split('.').map(str::to_string).collect();
        merge_at_path(&mut table, &path, value.clone());
    }
    table
}

fn parse_key_value(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() || key.split('.').any(str::is_empty) {
        return Err(format!("invalid key in '{raw}'"));
    }
    Ok((key.to_string(), coerce_value(value)))
}
