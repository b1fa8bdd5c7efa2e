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

use crate::common::checkpoint;
use crate::common::error::PoemGeneratorError;
use crate::first_line::config::{language_code_token, FirstLineConfig};
use crate::Config;
use rust_bert::mbart::{MBartConfig, MBartGenerator};
use rust_bert::pipelines::common::{ModelResource, ModelType, TokenizerOption};
use rust_bert::pipelines::generation_utils::GenerateConfig;
use rust_bert::resources::{LocalResource, ResourceProvider};
use rust_tokenizers::tokenizer::MBart50Tokenizer;
use tch::Device;
use tracing::{debug, info};

/// Ids of the special tokens framing an encoded source sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokenIds {
    pub unk: i64,
    pub eos: i64,
    pub pad: i64,
    pub language_code: i64,
}

impl SpecialTokenIds {
    /// Looks up the unknown, end-of-sequence, padding and language code ids in the tokenizer
    /// vocabulary.
    pub fn from_tokenizer(
        tokenizer: &TokenizerOption,
        language: &str,
    ) -> Result<SpecialTokenIds, PoemGeneratorError> {
        let language_token = language_code_token(language)?;
        let tokens = [
            "<unk>".to_string(),
            "</s>".to_string(),
            "<pad>".to_string(),
            language_token,
        ];
        let ids = tokenizer.convert_tokens_to_ids(tokens.as_slice());
        SpecialTokenIds::from_ids(&ids, language)
    }

    /// Builds the special token ids from the vocabulary ids of `<unk>`, `</s>`, `<pad>` and the
    /// language code token, in that order.
    ///
    /// A language code resolving to the unknown token is not part of the vocabulary.
    pub fn from_ids(ids: &[i64], language: &str) -> Result<SpecialTokenIds, PoemGeneratorError> {
        match ids {
            [unk, _, _, language_code] if language_code == unk => {
                Err(PoemGeneratorError::LoadFailure(format!(
                    "language {} is not in the tokenizer vocabulary",
                    language
                )))
            }
            [unk, eos, pad, language_code] => Ok(SpecialTokenIds {
                unk: *unk,
                eos: *eos,
                pad: *pad,
                language_code: *language_code,
            }),
            _ => Err(PoemGeneratorError::LoadFailure(
                "tokenizer did not return an id for every special token".to_string(),
            )),
        }
    }

    /// Checks that every special token has a row in an embedding table of `vocab_size` rows.
    pub fn check_vocab_size(&self, vocab_size: i64) -> Result<(), PoemGeneratorError> {
        for (name, id) in [
            ("unknown", self.unk),
            ("end of sequence", self.eos),
            ("padding", self.pad),
            ("language code", self.language_code),
        ] {
            if id < 0 || id >= vocab_size {
                return Err(PoemGeneratorError::LoadFailure(format!(
                    "{} token id {} is outside of the model vocabulary ({} entries)",
                    name, id, vocab_size
                )));
            }
        }
        Ok(())
    }
}

impl Config for MBartConfig {}

/// # First-line generator
/// Owns the MBart model with its tokenizer, bound to a single language.
/// Created once with [`FirstLineGenerator::new`] and then used read-only.
pub struct FirstLineGenerator {
    pub(crate) model: MBartGenerator,
    pub(crate) special_token_ids: SpecialTokenIds,
    pub(crate) vocab_size: i64,
    pub(crate) max_source_length: usize,
    pub(crate) device: Device,
}

/// Loads the MBart SentencePiece tokenizer.
///
/// # Arguments
///
/// * `vocab_resource` - `ResourceProvider` pointing to the `sentencepiece.bpe.model` file
pub fn load_tokenizer(
    vocab_resource: &dyn ResourceProvider,
) -> Result<TokenizerOption, PoemGeneratorError> {
    let vocab_path = vocab_resource.get_local_path()?;
    let tokenizer = MBart50Tokenizer::from_file(&vocab_path, false).map_err(|e| {
        PoemGeneratorError::LoadFailure(format!(
            "could not load tokenizer from {}: {}",
            vocab_path.display(),
            e
        ))
    })?;
    Ok(TokenizerOption::MBart50(tokenizer))
}

/// Fails if `device` cannot be used on this machine.
pub fn check_device(device: Device) -> Result<(), PoemGeneratorError> {
    match device {
        Device::Cuda(index) if index as i64 >= tch::Cuda::device_count() => {
            Err(PoemGeneratorError::LoadFailure(format!(
                "CUDA device {} requested but {} device(s) available",
                index,
                tch::Cuda::device_count()
            )))
        }
        Device::Mps if !tch::utils::has_mps() => Err(PoemGeneratorError::LoadFailure(
            "MPS device requested but not available".to_string(),
        )),
        _ => Ok(()),
    }
}

impl FirstLineGenerator {
    /// Build a new `FirstLineGenerator`
    ///
    /// Resolves the resources, checks the checkpoint embedding table against the model
    /// configuration and the tokenizer, and loads the weights on the configured device.
    ///
    /// # Arguments
    ///
    /// * `config` - `FirstLineConfig` object containing the resource references and generation options
    ///
    /// # Example
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// use poem_generator::first_line::{FirstLineConfig, FirstLineGenerator};
    /// use tch::Device;
    ///
    /// let config = FirstLineConfig {
    ///     device: Device::Cpu,
    ///     ..Default::default()
    /// };
    /// let generator = FirstLineGenerator::new(config)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: FirstLineConfig) -> Result<FirstLineGenerator, PoemGeneratorError> {
        config.validate()?;
        check_device(config.device)?;

        info!("Loading base model {}", config.model_name);
        let config_path = config.config_resource.get_local_path()?;
        let vocab_path = config.vocab_resource.get_local_path()?;
        let checkpoint_path = config.checkpoint_resource.get_local_path()?;
        let embedding_rows = checkpoint::embedding_rows(&checkpoint_path)?;

        // Full parse: the model constructor does not report configuration errors.
        let model_config = <MBartConfig as Config>::from_file(&config_path)?;
        let vocab_size = model_config.vocab_size;
        match embedding_rows {
            Some(rows) if rows != vocab_size => {
                return Err(PoemGeneratorError::LoadFailure(format!(
                    "checkpoint {} has {} embedding rows but the model configuration expects {}",
                    checkpoint_path.display(),
                    rows,
                    vocab_size
                )));
            }
            Some(_) => {}
            // Shape mismatches in torch archives are reported when the weights are copied.
            None => debug!(
                "Embedding shape of {} checked at load time",
                checkpoint_path.display()
            ),
        }

        let tokenizer = load_tokenizer(&LocalResource {
            local_path: vocab_path.clone(),
        })?;
        let special_token_ids = SpecialTokenIds::from_tokenizer(&tokenizer, &config.language)?;
        special_token_ids.check_vocab_size(vocab_size)?;
        if model_config.decoder_start_token_id != Some(special_token_ids.language_code) {
            debug!(
                "Overriding decoder start token {:?} with language code {}",
                model_config.decoder_start_token_id, special_token_ids.language_code
            );
        }
        info!("Model vocab size is {}", vocab_size);

        let generate_config = GenerateConfig {
            model_type: ModelType::MBart,
            model_resource: ModelResource::Torch(Box::new(LocalResource {
                local_path: checkpoint_path,
            })),
            config_resource: Box::new(LocalResource {
                local_path: config_path,
            }),
            vocab_resource: Box::new(LocalResource {
                local_path: vocab_path,
            }),
            merges_resource: None,
            min_length: 0,
            max_length: Some(config.max_length),
            do_sample: config.do_sample,
            early_stopping: config.early_stopping,
            num_beams: config.num_beams,
            temperature: config.temperature,
            top_k: config.top_k,
            top_p: config.top_p,
            repetition_penalty: 1.0,
            length_penalty: 1.0,
            no_repeat_ngram_size: 0,
            num_return_sequences: config.num_return_sequences,
            device: config.device,
            ..Default::default()
        };
        let model = MBartGenerator::new_with_tokenizer(generate_config, tokenizer)?;

        Ok(FirstLineGenerator {
            model,
            special_token_ids,
            vocab_size,
            max_source_length: config.max_source_length,
            device: config.device,
        })
    }

    /// Number of rows of the model embedding table.
    pub fn vocab_size(&self) -> i64 {
        self.vocab_size
    }

    /// Token id the decoder is seeded with.
    pub fn decoder_start_token_id(&self) -> i64 {
        self.special_token_ids.language_code
    }
}
