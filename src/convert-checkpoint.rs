// Copyright 2019-present, Laurent Mazare.
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

//! Converts a numpy export of a fine-tuned state dictionary into the `.ot` archive loaded by
//! the generator.

use clap::Parser;
use poem_generator::common::checkpoint::EMBEDDING_TENSOR_NAMES;
use poem_generator::PoemGeneratorError;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "convert-checkpoint", version)]
struct Args {
    /// `.npz` archive of the state dictionary
    source: PathBuf,

    /// Destination `.ot` file
    destination: PathBuf,
}

pub fn main() -> Result<(), PoemGeneratorError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let tensors = tch::Tensor::read_npz(&args.source)?;
    info!(
        "Read {} tensors from {}",
        tensors.len(),
        args.source.display()
    );

    match tensors
        .iter()
        .find(|(name, _)| EMBEDDING_TENSOR_NAMES.contains(&name.as_str()))
    {
        Some((name, tensor)) => info!("Embedding table {} has shape {:?}", name, tensor.size()),
        None => warn!("No token embedding found in {}", args.source.display()),
    }

    tch::Tensor::save_multi(&tensors, &args.destination)?;
    info!("Saved checkpoint to {}", args.destination.display());

    Ok(())
}
