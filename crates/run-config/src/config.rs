use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fs;
use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::overrides::{self, Override};
use crate::schema;

/// Full parameter set for one training invocation.
///
/// Built once by [`RunConfig::load`] and handed out by shared reference; nothing
/// in the workspace mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub dataset: DatasetConfig,
    pub logger: LoggerConfig,
    pub model: ModelConfig,
    pub trainer: TrainerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    /// Directory holding the train/val/test splits.
    pub dataset_root: String,
    /// Feed the author's previous commit messages to the decoder.
    pub with_history: bool,
    /// Token budget for the history prefix.
    pub history_max_len: u32,
    /// Selects the source (diff) tokenizer.
    pub encoder_name_or_path: String,
    /// Selects the target (message) tokenizer.
    pub decoder_name_or_path: String,
    /// Process rank within a distributed job, `-1` when not distributed.
    pub local_rank: i64,
    pub world_size: u32,
    pub train_dataloader_conf: DataLoaderConfig,
    pub val_dataloader_conf: DataLoaderConfig,
    pub test_dataloader_conf: DataLoaderConfig,
    /// Maximum number of diff tokens fed to the encoder.
    #[serde(default = "default_diff_max_len")]
    pub diff_max_len: u32,
    /// Maximum number of message tokens produced by the decoder.
    #[serde(default = "default_msg_max_len")]
    pub msg_max_len: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataLoaderConfig {
    pub batch_size: u32,
    pub num_workers: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggerConfig {
    /// Fully qualified name of the logging integration to instantiate.
    #[serde(rename = "_target_")]
    pub target: String,
    pub name: String,
    pub project: String,
}

/// Experiment-tracking backends the launcher knows by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerIntegration {
    Wandb,
    TensorBoard,
    Csv,
    Other,
}

impl LoggerConfig {
    pub fn integration(&self) -> LoggerIntegration {
        let class = self.target.rsplit('.').next().unwrap_or_default();
        match class {
            "WandbLogger" => LoggerIntegration::Wandb,
            "TensorBoardLogger" => LoggerIntegration::TensorBoard,
            "CSVLogger" => LoggerIntegration::Csv,
            _ => LoggerIntegration::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// `true` trains a single joint encoder-decoder, `false` keeps the two
    /// halves as separate models.
    pub encoder_decoder: bool,
    pub learning_rate: f64,
    pub encoder_name_or_path: String,
    pub decoder_name_or_path: String,
    /// Keep only the first N encoder layers (all when unset).
    #[serde(default)]
    pub num_layers_encoder: Option<u32>,
    /// Keep only the first N decoder layers (all when unset).
    #[serde(default)]
    pub num_layers_decoder: Option<u32>,
    /// Run full generation during validation instead of teacher forcing.
    #[serde(default)]
    pub actual_generation: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainerConfig {
    pub gpus: u32,
    pub accelerator: String,
    pub max_epochs: u32,
    pub precision: Precision,
    pub amp_level: String,
    pub auto_select_gpus: bool,
    pub num_sanity_val_steps: u32,
    pub accumulate_grad_batches: u32,
}

/// Floating-point width used by the trainer. Serialized as `16` or `32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Precision {
    Half,
    Full,
}

impl TryFrom<u32> for Precision {
    type Error = String;

    fn try_from(bits: u32) -> std::result::Result<Self, Self::Error> {
        match bits {
            16 => Ok(Precision::Half),
            32 => Ok(Precision::Full),
            other => Err(format!("unsupported precision {other}, expected 16 or 32")),
        }
    }
}

impl From<Precision> for u32 {
    fn from(precision: Precision) -> Self {
        match precision {
            Precision::Half => 16,
            Precision::Full => 32,
        }
    }
}

fn default_diff_max_len() -> u32 {
    512
}

fn default_msg_max_len() -> u32 {
    128
}

impl Default for DataLoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 16,
            num_workers: 4,
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            dataset_root: "raw_data/CleanedJiang".to_string(),
            with_history: true,
            history_max_len: 200,
            encoder_name_or_path: "microsoft/codebert-base".to_string(),
            decoder_name_or_path: "distilgpt2".to_string(),
            local_rank: -1,
            world_size: 1,
            train_dataloader_conf: DataLoaderConfig::default(),
            val_dataloader_conf: DataLoaderConfig::default(),
            test_dataloader_conf: DataLoaderConfig::default(),
            diff_max_len: default_diff_max_len(),
            msg_max_len: default_msg_max_len(),
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            target: "pytorch_lightning.loggers.WandbLogger".to_string(),
            name: "codebert_distilgpt2".to_string(),
            project: "commit_message_generation".to_string(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            encoder_decoder: true,
            learning_rate: 0.0001,
            encoder_name_or_path: "microsoft/codebert-base".to_string(),
            decoder_name_or_path: "distilgpt2".to_string(),
            num_layers_encoder: None,
            num_layers_decoder: None,
            actual_generation: false,
        }
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            gpus: 1,
            accelerator: "ddp".to_string(),
            max_epochs: 5,
            precision: Precision::Half,
            amp_level: "O2".to_string(),
            auto_select_gpus: true,
            num_sanity_val_steps: 2,
            accumulate_grad_batches: 1,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetConfig::default(),
            logger: LoggerConfig::default(),
            model: ModelConfig::default(),
            trainer: TrainerConfig::default(),
        }
    }
}

impl RunConfig {
    /// Reads the document at `path`, applies `overrides` in order and
    /// validates the result.
    pub fn load<P: AsRef<Path>>(path: P, overrides: &[Override]) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content, overrides)
    }

    pub fn from_yaml_str(content: &str, overrides: &[Override]) -> Result<Self> {
        let mut document: Value = serde_yaml::from_str(content)?;
        schema::check_root(&document)?;
        overrides::apply(&mut document, overrides)?;
        schema::validate(&document)?;

        // Every shape problem is caught by the schema walk; anything left here
        // is a mismatch between the schema table and the structs.
        serde_yaml::from_value(document)
            .map_err(|err| ConfigError::validation("<document>", err.to_string()))
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Soft checks that never reject a document.
    pub fn consistency_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.model.encoder_name_or_path != self.dataset.encoder_name_or_path {
            warnings.push(format!(
                "model.encoder_name_or_path `{}` differs from dataset.encoder_name_or_path `{}`",
                self.model.encoder_name_or_path, self.dataset.encoder_name_or_path
            ));
        }
        if self.model.decoder_name_or_path != self.dataset.decoder_name_or_path {
            warnings.push(format!(
                "model.decoder_name_or_path `{}` differs from dataset.decoder_name_or_path `{}`",
                self.model.decoder_name_or_path, self.dataset.decoder_name_or_path
            ));
        }
        if self.dataset.local_rank >= i64::from(self.dataset.world_size) {
            warnings.push(format!(
                "dataset.local_rank {} is outside a world of size {}",
                self.dataset.local_rank, self.dataset.world_size
            ));
        }
        warnings
    }
}
