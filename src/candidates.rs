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

//! # Poem line candidates
//!
//! Containers for the lines returned by the generators. Lists keep the order in which the
//! candidates were produced and serialize to plain JSON:
//!
//! ```
//! use poem_generator::candidates::{PoemLine, PoemLineList};
//!
//! let lines = PoemLineList::from(vec![PoemLine::new("kissa istuu ikkunalla")]);
//! let json = serde_json::to_string(&lines).unwrap();
//! assert_eq!(json, r#"[{"text":"kissa istuu ikkunalla"}]"#);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// # Single candidate line of generated text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoemLine {
    pub text: String,
}

impl PoemLine {
    pub fn new(text: impl Into<String>) -> PoemLine {
        PoemLine { text: text.into() }
    }
}

impl fmt::Display for PoemLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// # Ordered list of candidate lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoemLineList {
    lines: Vec<PoemLine>,
}

impl PoemLineList {
    pub fn new() -> PoemLineList {
        PoemLineList { lines: Vec::new() }
    }

    /// Text of every line, in list order.
    pub fn texts(&self) -> Vec<&str> {
        self.lines.iter().map(|line| line.text.as_str()).collect()
    }
}

impl Deref for PoemLineList {
    type Target = [PoemLine];

    fn deref(&self) -> &[PoemLine] {
        &self.lines
    }
}

impl From<Vec<PoemLine>> for PoemLineList {
    fn from(lines: Vec<PoemLine>) -> Self {
        PoemLineList { lines }
    }
}

impl FromIterator<PoemLine> for PoemLineList {
    fn from_iter<I: IntoIterator<Item = PoemLine>>(iter: I) -> Self {
        PoemLineList {
            lines: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for PoemLineList {
    type Item = PoemLine;
    type IntoIter = std::vec::IntoIter<PoemLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.into_iter()
    }
}

impl<'a> IntoIterator for &'a PoemLineList {
    type Item = &'a PoemLine;
    type IntoIter = std::slice::Iter<'a, PoemLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}
