use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process;

use run_config::{overrides, schema, ConfigError, RunConfig};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Source {
    /// Path to the run configuration
    #[arg(short, long, default_value = "configs/config.yaml")]
    config: PathBuf,

    /// Overrides applied before validation, e.g. trainer.max_epochs=10
    #[arg(value_name = "KEY=VALUE")]
    overrides: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a configuration loads and validates
    Validate {
        #[command(flatten)]
        source: Source,
    },
    /// Print the resolved configuration
    Show {
        #[command(flatten)]
        source: Source,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Yaml)]
        format: Format,
    },
    /// Print a single value by dotted path
    Get {
        /// Dotted key path, e.g. dataset.train_dataloader_conf.batch_size
        #[arg(long)]
        key: String,

        #[command(flatten)]
        source: Source,
    },
    /// Print a configuration filled with default values
    Template,
}

fn load(source: &Source) -> Result<RunConfig, ConfigError> {
    let overrides = overrides::parse_all(source.overrides.as_slice())?;
    RunConfig::load(&source.config, &overrides)
}

fn load_or_exit(source: &Source) -> RunConfig {
    match load(source) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e.report());
            process::exit(1);
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { source } => {
            let config = load_or_exit(&source);
            for warning in config.consistency_warnings() {
                eprintln!("warning: {}", warning);
            }
            println!("{}: ok", source.config.display());
        }
        Commands::Show { source, format } => {
            let config = load_or_exit(&source);
            let rendered = match format {
                Format::Yaml => config.to_yaml_string()?,
                Format::Json => serde_json::to_string_pretty(&config)
                    .context("Failed to render configuration as JSON")?,
            };
            println!("{}", rendered);
        }
        Commands::Get { key, source } => {
            if schema::lookup(&key).is_none() && !schema::is_section(&key) {
                let err = ConfigError::Override {
                    path: key,
                    reason: "no such key".to_string(),
                };
                eprintln!("{}", err.report());
                process::exit(1);
            }
            let config = load_or_exit(&source);
            let document = serde_yaml::to_value(&config)?;
            let value = schema::get(&document, &key)
                .ok_or_else(|| anyhow!("no value at `{}`", key))?;
            print!("{}", serde_yaml::to_string(value)?);
        }
        Commands::Template => {
            print!("{}", RunConfig::default().to_yaml_string()?);
        }
    }

    Ok(())
}
