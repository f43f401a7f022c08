use anyhow::{Context, Result};
use log::{info, warn};
use run_config::RunConfig;

use crate::collaborators::{DataModule, ExperimentLogger, ModelBuilder, TrainingDriver};

/// Batches per epoch the model's LR schedule is sized for.
pub const BATCHES_PER_EPOCH: u32 = 100;

/// Global seed applied before the data module or model exist.
pub const SEED: u64 = 42;

/// Steps between gradient snapshots sent to the experiment logger.
pub const GRADIENT_LOG_FREQ: u32 = 250;

/// Values derived from the run configuration that more than one collaborator needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub seed: u64,
    pub num_epochs: u32,
    pub num_batches: u32,
    /// Examples per optimizer step across all devices.
    pub effective_batch_size: u64,
    pub gradient_log_freq: u32,
}

pub struct Launcher<'a> {
    config: &'a RunConfig,
}

impl<'a> Launcher<'a> {
    pub fn new(config: &'a RunConfig) -> Self {
        for warning in config.consistency_warnings() {
            warn!("{}", warning);
        }
        Self { config }
    }

    pub fn schedule(&self) -> Schedule {
        let trainer = &self.config.trainer;
        let devices = u64::from(trainer.gpus.max(1));
        Schedule {
            seed: SEED,
            num_epochs: trainer.max_epochs,
            num_batches: BATCHES_PER_EPOCH,
            effective_batch_size: u64::from(self.config.dataset.train_dataloader_conf.batch_size)
                * u64::from(trainer.accumulate_grad_batches)
                * devices,
            gradient_log_freq: GRADIENT_LOG_FREQ,
        }
    }

    /// Seeds, hands each section to its collaborator (data, model, logger),
    /// then tunes, fits and tests.
    pub fn launch<D, M, L, T>(
        &self,
        data: &mut D,
        model: &mut M,
        logger: &mut L,
        driver: &mut T,
    ) -> Result<()>
    where
        D: DataModule,
        M: ModelBuilder,
        L: ExperimentLogger,
        T: TrainingDriver,
    {
        let schedule = self.schedule();
        info!("Launching with schedule: {:?}", schedule);

        driver
            .seed_everything(schedule.seed)
            .context("seeding failed")?;
        data.prepare(&self.config.dataset)
            .context("data module rejected the dataset section")?;
        model
            .build(&self.config.model, &schedule)
            .context("model builder rejected the model section")?;
        logger
            .attach(&self.config.logger)
            .context("experiment logger rejected the logger section")?;
        logger
            .watch(schedule.gradient_log_freq)
            .context("experiment logger cannot watch gradients")?;
        driver
            .tune(&self.config.trainer, &schedule)
            .context("tuning failed")?;
        driver
            .fit(&self.config.trainer, &schedule)
            .context("training failed")?;
        driver.test(&self.config.trainer).context("testing failed")?;

        info!("Launch complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::DryRun;
    use anyhow::bail;
    use run_config::{DatasetConfig, LoggerConfig, ModelConfig, TrainerConfig};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Every collaborator writes into one shared journal so the call order is visible.
    #[derive(Clone, Default)]
    struct Recorder {
        journal: Rc<RefCell<Vec<String>>>,
        fail_fit: bool,
    }

    impl Recorder {
        fn note(&self, event: String) {
            self.journal.borrow_mut().push(event);
        }

        fn events(&self) -> Vec<String> {
            self.journal.borrow().clone()
        }
    }

    impl DataModule for Recorder {
        fn prepare(&mut self, config: &DatasetConfig) -> Result<()> {
            self.note(format!("data:{}", config.dataset_root));
            Ok(())
        }
    }

    impl ModelBuilder for Recorder {
        fn build(&mut self, config: &ModelConfig, schedule: &Schedule) -> Result<()> {
            self.note(format!("model:{}:{}", config.learning_rate, schedule.num_epochs));
            Ok(())
        }
    }

    impl ExperimentLogger for Recorder {
        fn attach(&mut self, config: &LoggerConfig) -> Result<()> {
            self.note(format!("logger:{}", config.project));
            Ok(())
        }

        fn watch(&mut self, log_freq: u32) -> Result<()> {
            self.note(format!("watch:{log_freq}"));
            Ok(())
        }
    }

    impl TrainingDriver for Recorder {
        fn seed_everything(&mut self, seed: u64) -> Result<()> {
            self.note(format!("seed:{seed}"));
            Ok(())
        }

        fn tune(&mut self, config: &TrainerConfig, _schedule: &Schedule) -> Result<()> {
            self.note(format!("tune:{}", config.accelerator));
            Ok(())
        }

        fn fit(&mut self, config: &TrainerConfig, _schedule: &Schedule) -> Result<()> {
            if self.fail_fit {
                bail!("out of memory");
            }
            self.note(format!("fit:{}", config.max_epochs));
            Ok(())
        }

        fn test(&mut self, _config: &TrainerConfig) -> Result<()> {
            self.note("test".to_string());
            Ok(())
        }
    }

    fn launch_all(config: &RunConfig, driver: &mut Recorder) -> Result<()> {
        let mut data = driver.clone();
        let mut model = driver.clone();
        let mut logger = driver.clone();
        Launcher::new(config).launch(&mut data, &mut model, &mut logger, driver)
    }

    #[test]
    fn sections_reach_collaborators_in_order() {
        let config = RunConfig::default();
        let mut driver = Recorder::default();
        launch_all(&config, &mut driver).unwrap();

        assert_eq!(
            driver.events(),
            vec![
                "seed:42",
                "data:raw_data/CleanedJiang",
                "model:0.0001:5",
                "logger:commit_message_generation",
                "watch:250",
                "tune:ddp",
                "fit:5",
                "test",
            ]
        );
    }

    #[test]
    fn driver_failure_stops_the_launch() {
        let config = RunConfig::default();
        let mut driver = Recorder {
            fail_fit: true,
            ..Recorder::default()
        };
        let err = launch_all(&config, &mut driver).unwrap_err();
        assert!(format!("{err:#}").contains("out of memory"));

        let events = driver.events();
        assert_eq!(events.last().map(String::as_str), Some("tune:ddp"));
        assert!(!events.iter().any(|event| event == "test"));
    }

    #[test]
    fn schedule_carries_seed_and_watch_frequency() {
        let schedule = Launcher::new(&RunConfig::default()).schedule();
        assert_eq!(schedule.seed, SEED);
        assert_eq!(schedule.gradient_log_freq, GRADIENT_LOG_FREQ);
    }

    #[test]
    fn effective_batch_counts_devices_and_accumulation() {
        let mut config = RunConfig::default();
        config.dataset.train_dataloader_conf.batch_size = 8;
        config.trainer.accumulate_grad_batches = 4;
        config.trainer.gpus = 2;
        assert_eq!(Launcher::new(&config).schedule().effective_batch_size, 64);

        config.trainer.gpus = 0;
        let schedule = Launcher::new(&config).schedule();
        assert_eq!(schedule.effective_batch_size, 32);
        assert_eq!(schedule.num_batches, BATCHES_PER_EPOCH);
    }

    #[test]
    fn dry_run_accepts_every_section() {
        let config = RunConfig::default();
        let (mut data, mut model, mut logger, mut driver) = (DryRun, DryRun, DryRun, DryRun);
        Launcher::new(&config)
            .launch(&mut data, &mut model, &mut logger, &mut driver)
            .unwrap();
    }
}
