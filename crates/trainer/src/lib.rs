pub mod collaborators;
pub mod launch;

pub use collaborators::{DataModule, DryRun, ExperimentLogger, ModelBuilder, TrainingDriver};
pub use launch::{Launcher, Schedule};
