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

//! # First-line poem generation from keywords
//!
//! Generates candidate opening lines for a poem from a few keywords, using an MBart
//! sequence-to-sequence model fine-tuned for the task. Model loading, tokenization and beam
//! search are provided by [rust-bert](https://docs.rs/rust-bert) on top of
//! [tch-rs](https://github.com/LaurentMazare/tch-rs) (libtorch bindings) and
//! [rust_tokenizers](https://github.com/guillaume-be/rust-tokenizers). This crate wires the
//! fine-tuned checkpoint into the generator and post-processes the sampled candidates.
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! use poem_generator::first_line::{FirstLineConfig, FirstLineGenerator};
//! use tch::Device;
//!
//! let config = FirstLineConfig {
//!     device: Device::cuda_if_available(),
//!     ..Default::default()
//! };
//! let generator = FirstLineGenerator::new(config)?;
//! let lines = generator.generate("meri tuuli syksy")?;
//! for line in &lines {
//!     println!("{}", line);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Output: \
//! ```no_run
//! # let output =
//! [
//!     "Syksyn tuuli meren yllä",
//!     "Meren tuuli syksyllä",
//!     "Tuuli kulkee meren yli",
//! ]
//! # ;
//! ```
//!
//! # Loading the pretrained models
//!
//! The base model configuration and SentencePiece model are downloaded from the Hugging Face
//! model hub and cached under `~/.cache/.rustbert` (or `$RUSTBERT_CACHE`). The fine-tuned weights
//! are read from a local file, by default `models/first-line-fi-20-epochs/rust_model.ot`.
//!
//! Weights saved with PyTorch need converting:
//! 1. Export the state dictionary to a numpy archive: `np.savez("model.npz", **{k: v.cpu().numpy() for k, v in torch.load("pytorch_model.bin").items()})`
//! 2. Convert the archive: `cargo run --bin=convert-checkpoint model.npz rust_model.ot`
//!
//! Weights in the `safetensors` format are loaded directly.
//!
//! # Logging
//!
//! Events are emitted with [tracing](https://docs.rs/tracing): the base model name and the
//! vocabulary size at load time, the raw candidates at generation time. No subscriber is installed
//! by the library; the `first-line` binary installs a formatting subscriber filtered by `RUST_LOG`.

pub mod candidates;
pub mod common;
pub mod first_line;

pub use common::error::PoemGeneratorError;
pub use common::Config;
