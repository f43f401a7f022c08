use anyhow::Result;
use log::info;
use run_config::{DatasetConfig, LoggerConfig, ModelConfig, TrainerConfig};

use crate::launch::Schedule;

/// Loads the commit datasets and builds the three loaders.
pub trait DataModule {
    fn prepare(&mut self, config: &DatasetConfig) -> Result<()>;
}

/// Builds the diff encoder and message decoder.
pub trait ModelBuilder {
    fn build(&mut self, config: &ModelConfig, schedule: &Schedule) -> Result<()>;
}

/// Experiment-tracking integration named by `logger._target_`.
pub trait ExperimentLogger {
    fn attach(&mut self, config: &LoggerConfig) -> Result<()>;
    /// Starts logging gradients every `log_freq` steps.
    fn watch(&mut self, log_freq: u32) -> Result<()>;
}

/// The framework's optimisation loop.
pub trait TrainingDriver {
    /// Seeds every RNG the framework touches; runs before anything is built.
    fn seed_everything(&mut self, seed: u64) -> Result<()>;
    /// Learning-rate and batch-size search ahead of `fit`.
    fn tune(&mut self, config: &TrainerConfig, schedule: &Schedule) -> Result<()>;
    fn fit(&mut self, config: &TrainerConfig, schedule: &Schedule) -> Result<()>;
    fn test(&mut self, config: &TrainerConfig) -> Result<()>;
}

/// Stands in for every collaborator and only reports what it was given.
#[derive(Debug, Default)]
pub struct DryRun;

impl DataModule for DryRun {
    fn prepare(&mut self, config: &DatasetConfig) -> Result<()> {
        info!(
            "data: root={} history={} (max {} tokens) tokenizers={} / {} rank={}/{}",
            config.dataset_root,
            config.with_history,
            config.history_max_len,
            config.encoder_name_or_path,
            config.decoder_name_or_path,
            config.local_rank,
            config.world_size,
        );
        for (split, loader) in [
            ("train", &config.train_dataloader_conf),
            ("val", &config.val_dataloader_conf),
            ("test", &config.test_dataloader_conf),
        ] {
            info!(
                "data: {split} loader batch_size={} num_workers={}",
                loader.batch_size, loader.num_workers
            );
        }
        Ok(())
    }
}

impl ModelBuilder for DryRun {
    fn build(&mut self, config: &ModelConfig, schedule: &Schedule) -> Result<()> {
        let layout = if config.encoder_decoder {
            "joint encoder-decoder"
        } else {
            "separate encoder and decoder"
        };
        info!(
            "model: {layout} {} -> {} lr={} epochs={} batches/epoch={}",
            config.encoder_name_or_path,
            config.decoder_name_or_path,
            config.learning_rate,
            schedule.num_epochs,
            schedule.num_batches,
        );
        Ok(())
    }
}

impl ExperimentLogger for DryRun {
    fn attach(&mut self, config: &LoggerConfig) -> Result<()> {
        info!(
            "logger: {} ({:?}) run={} project={}",
            config.target,
            config.integration(),
            config.name,
            config.project
        );
        Ok(())
    }

    fn watch(&mut self, log_freq: u32) -> Result<()> {
        info!("logger: watching gradients every {log_freq} steps");
        Ok(())
    }
}

impl TrainingDriver for DryRun {
    fn seed_everything(&mut self, seed: u64) -> Result<()> {
        info!("seed: {seed}");
        Ok(())
    }

    fn tune(&mut self, config: &TrainerConfig, schedule: &Schedule) -> Result<()> {
        info!(
            "tune: lr search over {} epochs on {} device(s)",
            schedule.num_epochs,
            config.gpus.max(1)
        );
        Ok(())
    }

    fn fit(&mut self, config: &TrainerConfig, schedule: &Schedule) -> Result<()> {
        info!(
            "fit: gpus={} accelerator={} precision={} amp_level={} max_epochs={} effective_batch={}",
            config.gpus,
            config.accelerator,
            u32::from(config.precision),
            config.amp_level,
            config.max_epochs,
            schedule.effective_batch_size,
        );
        Ok(())
    }

    fn test(&mut self, config: &TrainerConfig) -> Result<()> {
        info!("test: gpus={} accelerator={}", config.gpus, config.accelerator);
        Ok(())
    }
}
