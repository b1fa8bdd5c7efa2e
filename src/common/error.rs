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

use rust_bert::RustBertError;
use rust_tokenizers::error::TokenizerError;
use tch::TchError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PoemGeneratorError {
    #[error("Model loading error: {0}")]
    LoadFailure(String),

    #[error("Generation error: {0}")]
    GenerationFailure(String),
}

impl PoemGeneratorError {
    /// Wraps a lower-level error raised while resolving resources or building the model.
    pub fn load<E: std::fmt::Display>(error: E) -> Self {
        PoemGeneratorError::LoadFailure(error.to_string())
    }

    /// Wraps a lower-level error raised by the inference call.
    pub fn generation<E: std::fmt::Display>(error: E) -> Self {
        PoemGeneratorError::GenerationFailure(error.to_string())
    }
}

impl From<std::io::Error> for PoemGeneratorError {
    fn from(error: std::io::Error) -> Self {
        PoemGeneratorError::LoadFailure(error.to_string())
    }
}

impl From<serde_json::Error> for PoemGeneratorError {
    fn from(error: serde_json::Error) -> Self {
        PoemGeneratorError::LoadFailure(error.to_string())
    }
}

impl From<TokenizerError> for PoemGeneratorError {
    fn from(error: TokenizerError) -> Self {
        PoemGeneratorError::LoadFailure(error.to_string())
    }
}

impl From<TchError> for PoemGeneratorError {
    fn from(error: TchError) -> Self {
        PoemGeneratorError::LoadFailure(error.to_string())
    }
}

impl From<RustBertError> for PoemGeneratorError {
    fn from(error: RustBertError) -> Self {
        PoemGeneratorError::LoadFailure(error.to_string())
    }
}
