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

use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;

lazy_static! {
    static ref PUNCTUATION: Regex = Regex::new(r"\p{P}+").unwrap();
}

/// Removes every character of the Unicode `Punctuation` general category from `text`.
///
/// This covers ASCII punctuation as well as typographic marks found in poetry
/// (`–`, `—`, `…`, `«`, `»`, `“`, `”`). Letters, digits, symbols and whitespace are kept.
///
/// # Example
///
/// ```
/// use poem_generator::common::punctuation::remove_punct;
///
/// assert_eq!(remove_punct("«Kissa», istuu…"), "Kissa istuu");
/// ```
pub fn remove_punct(text: &str) -> Cow<'_, str> {
    PUNCTUATION.replace_all(text, "")
}

/// Returns `true` if nothing but whitespace remains once punctuation is removed.
pub fn is_punctuation_only(text: &str) -> bool {
    remove_punct(text).trim().is_empty()
}
