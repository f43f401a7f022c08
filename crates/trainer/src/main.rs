use clap::Parser;
use std::path::PathBuf;
use std::process;

use run_config::{overrides, ConfigError, RunConfig};
use trainer::{DryRun, Launcher};

#[derive(Parser)]
#[command(author, version, about = "Launch a commit-message-generation run", long_about = None)]
struct Cli {
    /// Path to the run configuration
    #[arg(short, long, default_value = "configs/config.yaml")]
    config: PathBuf,

    /// Overrides applied before validation, e.g. trainer.max_epochs=10
    #[arg(value_name = "KEY=VALUE")]
    overrides: Vec<String>,
}

fn load(cli: &Cli) -> Result<RunConfig, ConfigError> {
    let overrides = overrides::parse_all(cli.overrides.as_slice())?;
    RunConfig::load(&cli.config, &overrides)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e.report());
            process::exit(1);
        }
    };

    println!("==== Using config ====\n{}", config.to_yaml_string()?);

    let (mut data, mut model, mut logger, mut driver) = (DryRun, DryRun, DryRun, DryRun);
    Launcher::new(&config).launch(&mut data, &mut model, &mut logger, &mut driver)?;

    println!("Run configuration handed off.");
    Ok(())
}
