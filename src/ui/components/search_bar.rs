// Copyright 2025 bakri (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Search bar component
//!
//! Free words match a mapping's source, target or description. A few
//! prefixed terms narrow the search further:
//!
//! - `is:on` / `is:off` - mappings enabled or disabled in the file
//! - `from:<text>` - text found in the source combo only
//! - `to:<text>` - text found in the replacement sequence only
//!
//! Every term has to match. Matching ignores case.

use gtk4::SearchEntry;

use crate::core::KeyMapping;

const PLACEHOLDER: &str = "Search keys, targets or notes...";
const TOOLTIP: &str = "Narrow with is:on, is:off, from:<key> or to:<key>";

/// One term of a search query
#[derive(Debug, Clone, PartialEq, Eq)]
enum Term {
    Enabled(bool),
    Source(String),
    Target(String),
    Anywhere(String),
}

/// Parsed search text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    terms: Vec<Term>,
}

impl SearchQuery {
    pub fn parse(text: &str) -> Self {
        let terms = text
            .split_whitespace()
            .map(|word| {
                let lower = word.to_lowercase();
                match lower.split_once(':') {
                    Some(("is", "on")) => Term::Enabled(true),
                    Some(("is", "off")) => Term::Enabled(false),
                    Some(("from", rest)) if !rest.is_empty() => Term::Source(rest.to_string()),
                    Some(("to", rest)) if !rest.is_empty() => Term::Target(rest.to_string()),
                    _ => Term::Anywhere(lower),
                }
            })
            .collect();

        Self { terms }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn matches(&self, mapping: &KeyMapping) -> bool {
        let source = mapping.source.to_string().to_lowercase();
        let target = mapping.target_label().to_lowercase();
        let description = mapping.description.to_lowercase();

        self.terms.iter().all(|term| match term {
            Term::Enabled(enabled) => mapping.enabled == *enabled,
            Term::Source(text) => source.contains(text.as_str()),
            Term::Target(text) => target.contains(text.as_str()),
            Term::Anywhere(text) => {
                source.contains(text.as_str())
                    || target.contains(text.as_str())
                    || description.contains(text.as_str())
            }
        })
    }
}

/// Search bar for filtering mappings
pub struct SearchBar {
    /// Root widget (search entry)
    widget: SearchEntry,
}

impl Default for SearchBar {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchBar {
    /// Creates a new search bar
    ///
    /// The parent wires `search-changed` to the controller, which parses
    /// the text with [`SearchQuery::parse`].
    pub fn new() -> Self {
        let widget = SearchEntry::builder()
            .placeholder_text(PLACEHOLDER)
            .tooltip_text(TOOLTIP)
            .build();

        Self { widget }
    }

    pub fn widget(&self) -> &SearchEntry {
        &self.widget
    }
}
