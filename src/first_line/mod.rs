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

//! # First-line generation (MBart, Liu et al.)
//!
//! Generates candidate opening lines of a poem from a handful of keywords with an MBart model
//! ([Multilingual Denoising Pre-training for Neural Machine Translation](https://arxiv.org/abs/2001.08210))
//! fine-tuned from `facebook/mbart-large-cc25`.
//!
//! The keywords are encoded in the cc25 source layout (`tokens </s> <lang>`, padded to a fixed
//! length), the decoder is seeded with the same language code, and several sequences are sampled
//! with beam search. Decoded candidates that are empty once punctuation is removed are discarded
//! and duplicates are removed, keeping generation order.
//!
//! # Model set-up and weights loading
//!
//! The generator expects the following resources:
//! - Configuration file following the [Transformers library](https://github.com/huggingface/transformers) format
//! - `sentencepiece.bpe.model` SentencePiece model of the base model
//! - Fine-tuned weights in the `.ot` or `.safetensors` format. PyTorch `.bin` checkpoints are
//!   exported to `.npz` with numpy, then converted with the `convert-checkpoint` binary.
//!
//! The configuration and SentencePiece model of the base model are downloaded and cached on
//! first use unless local paths are provided.
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! use poem_generator::first_line::{FirstLineConfig, FirstLineGenerator};
//! use rust_bert::resources::LocalResource;
//! use std::path::PathBuf;
//! use tch::Device;
//!
//! let config = FirstLineConfig {
//!     checkpoint_resource: Box::new(LocalResource {
//!         local_path: PathBuf::from("path/to/rust_model.ot"),
//!     }),
//!     device: Device::Cpu,
//!     ..Default::default()
//! };
//! let generator = FirstLineGenerator::new(config)?;
//!
//! let lines = generator.generate_from_keywords(&["kissa", "ikkuna", "ilta"])?;
//! # Ok(())
//! # }
//! ```
//!
//! Example output: \
//! ```no_run
//! # let output =
//! [
//!     "Kissa istuu illalla ikkunalla",
//!     "Ikkunan takana ilta hämärtää",
//! ]
//! # ;
//! ```

mod config;
mod generator;
mod loader;

pub use config::{
    language_code_token, DevicePreference, FirstLineConfig, GeneratorSettings,
    MBartCc25ConfigResources, MBartCc25VocabResources, BASE_MODEL, CHECKPOINT_FILE, LANGUAGE,
};
pub use generator::{filter_candidates, join_keywords, SourceEncoding};
pub use loader::{check_device, load_tokenizer, FirstLineGenerator, SpecialTokenIds};
