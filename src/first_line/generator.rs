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

use crate::candidates::{PoemLine, PoemLineList};
use crate::common::error::PoemGeneratorError;
use crate::common::punctuation::is_punctuation_only;
use crate::first_line::loader::{FirstLineGenerator, SpecialTokenIds};
use rust_bert::pipelines::generation_utils::{GenerateOptions, LanguageGenerator};
use std::collections::HashSet;
use tch::Tensor;
use tracing::info;

/// # Fixed-length source sequence
/// Keyword token ids in the MBart cc25 source layout (`tokens </s> <lang> <pad>...`)
/// with the matching attention mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEncoding {
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
}

impl SourceEncoding {
    /// Frames `token_ids` with the end-of-sequence and language code tokens and pads the result
    /// to exactly `max_length` positions. Keyword tokens that do not fit are dropped from the
    /// end, the special tokens are always kept.
    ///
    /// Ids without a row in an embedding table of `vocab_size` rows are replaced by the unknown
    /// token id.
    pub fn new(
        token_ids: &[i64],
        special_token_ids: &SpecialTokenIds,
        vocab_size: i64,
        max_length: usize,
    ) -> SourceEncoding {
        let kept = token_ids.len().min(max_length.saturating_sub(2));
        let mut input_ids = Vec::with_capacity(max_length);
        input_ids.extend(token_ids[..kept].iter().map(|&id| {
            if (0..vocab_size).contains(&id) {
                id
            } else {
                special_token_ids.unk
            }
        }));
        input_ids.push(special_token_ids.eos);
        input_ids.push(special_token_ids.language_code);
        input_ids.truncate(max_length);

        let mut attention_mask = vec![1; input_ids.len()];
        attention_mask.resize(max_length, 0);
        input_ids.resize(max_length, special_token_ids.pad);

        SourceEncoding {
            input_ids,
            attention_mask,
        }
    }
}

/// Joins keyword tokens with single spaces, skipping blank ones.
///
/// ```
/// use poem_generator::first_line::join_keywords;
///
/// assert_eq!(join_keywords(&[" kissa", "", "ilta "]), "kissa ilta");
/// ```
pub fn join_keywords<S: AsRef<str>>(keywords: &[S]) -> String {
    keywords
        .iter()
        .map(|keyword| keyword.as_ref().trim())
        .filter(|keyword| !keyword.is_empty())
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Drops candidates that are empty once punctuation is removed, then removes duplicates.
///
/// Duplicates are compared on the exact text and the first occurrence is kept, so the
/// surviving candidates stay in generation order.
///
/// ```
/// use poem_generator::first_line::filter_candidates;
///
/// let candidates = ["...", "kissa istuu", "kissa istuu", "??"];
/// assert_eq!(filter_candidates(candidates), vec!["kissa istuu"]);
/// ```
pub fn filter_candidates<I, S>(candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .map(|candidate| candidate.as_ref().to_string())
        .filter(|candidate| !is_punctuation_only(candidate))
        .filter(|candidate| seen.insert(candidate.clone()))
        .collect()
}

impl FirstLineGenerator {
    /// Encodes keyword text into the fixed-length source sequence fed to the encoder.
    pub fn encode(&self, keywords: &str) -> SourceEncoding {
        let tokenizer = self.model.get_tokenizer();
        let tokens = tokenizer.tokenize(keywords);
        let token_ids = tokenizer.convert_tokens_to_ids(tokens.as_slice());
        SourceEncoding::new(
            &token_ids,
            &self.special_token_ids,
            self.vocab_size,
            self.max_source_length,
        )
    }

    /// Generates first-line candidates from keywords
    ///
    /// # Arguments
    ///
    /// * `keywords` - `&str` keyword text. Inputs longer than the source length are truncated.
    ///
    /// # Returns
    /// * `PoemLineList` unique candidates that contain more than punctuation, possibly empty
    ///
    /// # Example
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// use poem_generator::first_line::{FirstLineConfig, FirstLineGenerator};
    ///
    /// let generator = FirstLineGenerator::new(FirstLineConfig::default())?;
    /// let lines = generator.generate("kissa ikkuna ilta")?;
    /// for line in &lines {
    ///     println!("{}", line);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn generate(&self, keywords: &str) -> Result<PoemLineList, PoemGeneratorError> {
        let candidates = self.generate_candidates(keywords)?;
        info!("Generated candidates {:?}", candidates);
        Ok(filter_candidates(candidates)
            .into_iter()
            .map(PoemLine::new)
            .collect())
    }

    /// Generates first-line candidates from a list of keyword tokens, joined with spaces.
    pub fn generate_from_keywords<S>(
        &self,
        keywords: &[S],
    ) -> Result<PoemLineList, PoemGeneratorError>
    where
        S: AsRef<str>,
    {
        self.generate(&join_keywords(keywords))
    }

    /// Raw decoded sequences, before filtering. Fewer sequences than configured may be returned.
    pub fn generate_candidates(&self, keywords: &str) -> Result<Vec<String>, PoemGeneratorError> {
        let source = self.encode(keywords);
        let input_ids = Tensor::from_slice(&source.input_ids)
            .unsqueeze(0)
            .to(self.device);
        let attention_mask = Tensor::from_slice(&source.attention_mask)
            .unsqueeze(0)
            .to(self.device);

        let generate_options = GenerateOptions {
            decoder_start_token_id: Some(self.special_token_ids.language_code),
            ..Default::default()
        };
        let outputs = self
            .model
            .generate_from_ids_and_past(input_ids, Some(attention_mask), Some(generate_options))
            .map_err(PoemGeneratorError::generation)?;

        let tokenizer = self.model.get_tokenizer();
        Ok(outputs
            .iter()
            .map(|output| {
                tokenizer
                    .decode(&output.indices, true, true)
                    .trim()
                    .to_string()
            })
            .collect())
    }
}
