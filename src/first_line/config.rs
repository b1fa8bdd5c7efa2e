// Copyright 2024 The poem-generator Authors
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::common::error::PoemGeneratorError;
use crate::Config;
use rust_bert::resources::{LocalResource, RemoteResource, ResourceProvider};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tch::Device;

/// Identifier of the pretrained model the first-line checkpoint was fine-tuned from.
pub const BASE_MODEL: &str = "facebook/mbart-large-cc25";

/// Default location of the fine-tuned Finnish first-line checkpoint.
pub const CHECKPOINT_FILE: &str = "models/first-line-fi-20-epochs/rust_model.ot";

/// Default source and target language tag.
pub const LANGUAGE: &str = "fi_FI";

/// # MBart cc25 pretrained config files
pub struct MBartCc25ConfigResources;

/// # MBart cc25 pretrained vocab files
pub struct MBartCc25VocabResources;

impl MBartCc25ConfigResources {
    /// Shared under MIT license by the Facebook AI Research Fairseq team at https://github.com/pytorch/fairseq.
    pub const MBART_LARGE_CC25: (&'static str, &'static str) = (
        "mbart-large-cc25/config",
        "https://huggingface.co/facebook/mbart-large-cc25/resolve/main/config.json",
    );
}

impl MBartCc25VocabResources {
    /// Shared under MIT license by the Facebook AI Research Fairseq team at https://github.com/pytorch/fairseq.
    pub const MBART_LARGE_CC25: (&'static str, &'static str) = (
        "mbart-large-cc25/spiece",
        "https://huggingface.co/facebook/mbart-large-cc25/resolve/main/sentencepiece.bpe.model",
    );
}

/// Converts a language tag to the language code token of the MBart vocabulary.
///
/// Accepts fairseq tags (`fi_FI`), bare ISO codes (`fi`) and tokens that are already in the
/// vocabulary format (`>>fi<<`).
///
/// ```
/// use poem_generator::first_line::language_code_token;
///
/// assert_eq!(language_code_token("fi_FI").unwrap(), ">>fi<<");
/// assert_eq!(language_code_token(">>et<<").unwrap(), ">>et<<");
/// ```
pub fn language_code_token(language: &str) -> Result<String, PoemGeneratorError> {
    let language = language.trim();
    let code = if let Some(code) = language
        .strip_prefix(">>")
        .and_then(|code| code.strip_suffix("<<"))
    {
        code
    } else {
        language.split('_').next().unwrap_or_default()
    };
    if code.len() < 2 || !code.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(PoemGeneratorError::LoadFailure(format!(
            "invalid language tag {:?}",
            language
        )));
    }
    Ok(format!(">>{}<<", code))
}

/// # Compute device preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// First CUDA device if one is available, CPU otherwise
    #[default]
    Auto,
    Cpu,
    Cuda,
}

impl DevicePreference {
    pub fn to_device(self) -> Device {
        match self {
            DevicePreference::Auto => Device::cuda_if_available(),
            DevicePreference::Cpu => Device::Cpu,
            DevicePreference::Cuda => Device::Cuda(0),
        }
    }
}

/// # Configuration for the first-line generator
/// Contains information regarding the model to load and the generation parameters.
/// The default settings reproduce the Finnish first-line model: a `facebook/mbart-large-cc25`
/// base fine-tuned for 20 epochs, sampled with 5 beams into 5 candidates of at most 16 tokens.
pub struct FirstLineConfig {
    /// Name of the base model, used for logging
    pub model_name: String,
    /// Model configuration resource (default: mbart-large-cc25 config)
    pub config_resource: Box<dyn ResourceProvider + Send>,
    /// SentencePiece model resource (default: mbart-large-cc25 sentencepiece model)
    pub vocab_resource: Box<dyn ResourceProvider + Send>,
    /// Fine-tuned weights (default: local `models/first-line-fi-20-epochs/rust_model.ot`)
    pub checkpoint_resource: Box<dyn ResourceProvider + Send>,
    /// Source and target language tag (default: `fi_FI`)
    pub language: String,
    /// Device to place the model on (default: CUDA/GPU when available)
    pub device: Device,
    /// Length of the encoded keywords after padding or truncation (default: 32)
    pub max_source_length: usize,
    /// Maximum generated sequence length (default: 16)
    pub max_length: i64,
    /// Sampling flag. If true, will perform top-k and/or nucleus sampling on generated tokens (default: true)
    pub do_sample: bool,
    /// Early stopping flag indicating if the beam search should stop as soon as `num_beams` hypotheses have been generated (default: true)
    pub early_stopping: bool,
    /// Number of beams for beam search (default: 5)
    pub num_beams: i64,
    /// Number of candidates generated for each keyword input (default: 5)
    pub num_return_sequences: i64,
    /// Temperature setting (default: 1.0)
    pub temperature: f64,
    /// Top_k values for sampling tokens. Value higher than 0 will enable the feature (default: 50)
    pub top_k: i64,
    /// Top_p value for nucleus sampling (default: 1.0)
    pub top_p: f64,
}

impl FirstLineConfig {
    /// Create a new `FirstLineConfig` from the model resources, language and device.
    /// Generation parameters are set to their default values.
    ///
    /// # Arguments
    ///
    /// * `config_resource` - The `ResourceProvider` pointing to the MBart configuration
    /// * `vocab_resource` - The `ResourceProvider` pointing to the SentencePiece model
    /// * `checkpoint_resource` - The `ResourceProvider` pointing to the fine-tuned weights
    /// * `language` - Source and target language tag (e.g. `fi_FI`)
    /// * `device` - Device to place the model on
    pub fn new<RC, RV, RM>(
        config_resource: RC,
        vocab_resource: RV,
        checkpoint_resource: RM,
        language: &str,
        device: Device,
    ) -> FirstLineConfig
    where
        RC: ResourceProvider + Send + 'static,
        RV: ResourceProvider + Send + 'static,
        RM: ResourceProvider + Send + 'static,
    {
        FirstLineConfig {
            config_resource: Box::new(config_resource),
            vocab_resource: Box::new(vocab_resource),
            checkpoint_resource: Box::new(checkpoint_resource),
            language: language.to_string(),
            device,
            ..Default::default()
        }
    }

    /// Checks the generation parameters before any resource is resolved.
    pub fn validate(&self) -> Result<(), PoemGeneratorError> {
        let invalid = |message: &str| Err(PoemGeneratorError::LoadFailure(message.to_string()));
        if self.max_source_length < 2 {
            return invalid("max_source_length must leave room for the end and language tokens");
        }
        if self.max_length < 2 {
            return invalid("max_length must be at least 2");
        }
        if self.num_beams < 1 {
            return invalid("num_beams must be strictly greater than 0");
        }
        if self.num_return_sequences < 1 {
            return invalid("num_return_sequences must be strictly greater than 0");
        }
        if self.temperature <= 0f64 {
            return invalid("temperature must be positive");
        }
        if !(0f64..=1f64).contains(&self.top_p) {
            return invalid("top_p must be between 0 and 1");
        }
        if !self.do_sample && self.num_beams < self.num_return_sequences {
            return invalid("num_return_sequences must be lower than the number of beams");
        }
        Ok(())
    }
}

impl Default for FirstLineConfig {
    fn default() -> FirstLineConfig {
        FirstLineConfig {
            model_name: BASE_MODEL.to_string(),
            config_resource: Box::new(RemoteResource::from_pretrained(
                MBartCc25ConfigResources::MBART_LARGE_CC25,
            )),
            vocab_resource: Box::new(RemoteResource::from_pretrained(
                MBartCc25VocabResources::MBART_LARGE_CC25,
            )),
            checkpoint_resource: Box::new(LocalResource {
                local_path: PathBuf::from(CHECKPOINT_FILE),
            }),
            language: LANGUAGE.to_string(),
            device: Device::cuda_if_available(),
            max_source_length: 32,
            max_length: 16,
            do_sample: true,
            early_stopping: true,
            num_beams: 5,
            num_return_sequences: 5,
            temperature: 1.0,
            top_k: 50,
            top_p: 1.0,
        }
    }
}

/// # Serializable generator settings
///
/// JSON counterpart of [`FirstLineConfig`]. Missing fields take their default value, and the
/// config and vocab files are downloaded from the base model repository unless a local path is
/// given.
///
/// ```
/// use poem_generator::first_line::{DevicePreference, GeneratorSettings};
///
/// let settings: GeneratorSettings =
///     serde_json::from_str(r#"{"device": "cpu", "num_beams": 8}"#).unwrap();
/// assert_eq!(settings.device, DevicePreference::Cpu);
/// assert_eq!(settings.num_beams, 8);
/// assert_eq!(settings.language, "fi_FI");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    pub model_name: String,
    pub config_path: Option<PathBuf>,
    pub vocab_path: Option<PathBuf>,
    pub checkpoint_path: PathBuf,
    pub language: String,
    pub device: DevicePreference,
    pub max_source_length: usize,
    pub max_length: i64,
    pub do_sample: bool,
    pub early_stopping: bool,
    pub num_beams: i64,
    pub num_return_sequences: i64,
    pub temperature: f64,
    pub top_k: i64,
    pub top_p: f64,
}

impl Config for GeneratorSettings {}

impl Default for GeneratorSettings {
    fn default() -> Self {
        let defaults = FirstLineConfig::default();
        GeneratorSettings {
            model_name: defaults.model_name,
            config_path: None,
            vocab_path: None,
            checkpoint_path: PathBuf::from(CHECKPOINT_FILE),
            language: defaults.language,
            device: DevicePreference::Auto,
            max_source_length: defaults.max_source_length,
            max_length: defaults.max_length,
            do_sample: defaults.do_sample,
            early_stopping: defaults.early_stopping,
            num_beams: defaults.num_beams,
            num_return_sequences: defaults.num_return_sequences,
            temperature: defaults.temperature,
            top_k: defaults.top_k,
            top_p: defaults.top_p,
        }
    }
}

impl GeneratorSettings {
    pub fn into_config(self) -> FirstLineConfig {
        let config_resource: Box<dyn ResourceProvider + Send> = match self.config_path {
            Some(local_path) => Box::new(LocalResource { local_path }),
            None => Box::new(RemoteResource::from_pretrained(
                MBartCc25ConfigResources::MBART_LARGE_CC25,
            )),
        };
        let vocab_resource: Box<dyn ResourceProvider + Send> = match self.vocab_path {
            Some(local_path) => Box::new(LocalResource { local_path }),
            None => Box::new(RemoteResource::from_pretrained(
                MBartCc25VocabResources::MBART_LARGE_CC25,
            )),
        };
        FirstLineConfig {
            model_name: self.model_name,
            config_resource,
            vocab_resource,
            checkpoint_resource: Box::new(LocalResource {
                local_path: self.checkpoint_path,
            }),
            language: self.language,
            device: self.device.to_device(),
            max_source_length: self.max_source_length,
            max_length: self.max_length,
            do_sample: self.do_sample,
            early_stopping: self.early_stopping,
            num_beams: self.num_beams,
            num_return_sequences: self.num_return_sequences,
            temperature: self.temperature,
            top_k: self.top_k,
            top_p: self.top_p,
        }
    }
}
