/* Copyright 2025 The NeoShell Contributors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Line editor helper that completes verbs, their sub-words, recent SQL, and table names.

use std::sync::Arc;

use neoshell_codec::context::BoxStyle;
use neoshell_codec::timeformat::SYMBOLIC_LAYOUTS;
use rustyline::Context;
use rustyline::Helper;
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;

use crate::dispatcher::{SqlHistory, VERBS, VerbKind, find_verb};

const SQL_KEYWORDS: &[&str] = &[
    "AND",
    "AVG",
    "BETWEEN",
    "COUNT",
    "CREATE TAG TABLE",
    "DELETE FROM",
    "DESC",
    "FROM",
    "GROUP BY",
    "INSERT INTO",
    "LIMIT",
    "MAX",
    "MIN",
    "ORDER BY",
    "SELECT",
    "SUM",
    "TRUNCATE TABLE",
    "VALUES",
    "WHERE",
];

const SWITCH_VALUES: &[&str] = &["on", "off"];

pub struct ShellHelper {
    history: Arc<SqlHistory>,
    table_names: Vec<String>,
}

impl ShellHelper {
    pub fn new(history: Arc<SqlHistory>, table_names: Vec<String>) -> Self {
        ShellHelper {
            history,
            table_names,
        }
    }

    /// Return the start of the text to replace in `line` and the candidates for the text between
    /// the start and `pos`.
    fn candidates(&self, line: &str, pos: usize) -> (usize, Vec<String>) {
        let (start, prefix) = current_word(line, pos);
        let previous_words: Vec<&str> = line[..start].split_whitespace().collect();

        let Some(first_word) = previous_words.first() else {
            let verb_names = VERBS
                .iter()
                .flat_map(|verb| std::iter::once(verb.name).chain(verb.aliases.iter().copied()));
            return (start, matching(verb_names, prefix));
        };

        let Some(verb) = find_verb(first_word) else {
            return (start, self.sql_candidates(prefix));
        };

        match (verb.kind, previous_words.len()) {
            (VerbKind::Sql | VerbKind::Walk, _) => {
                // Recent statements replace everything after the verb.
                let statement_start = line[..pos]
                    .find(first_word)
                    .map_or(start, |index| index + first_word.len());
                let statement_start = statement_start
                    + line[statement_start..pos].len()
                    - line[statement_start..pos].trim_start().len();

                let recent = matching(
                    self.history.entries().into_iter().rev(),
                    &line[statement_start..pos],
                );
                if recent.is_empty() {
                    (start, self.sql_candidates(prefix))
                } else {
                    (statement_start, recent)
                }
            }
            (VerbKind::Set, 2) => {
                let values = setting_values(previous_words[1]);
                (start, matching(values.into_iter(), prefix))
            }
            (VerbKind::Explain, _) => (start, self.sql_candidates(prefix)),
            (kind, word_count) => {
                let mut candidates = if word_count == 1 {
                    matching(verb.completions.iter().copied(), prefix)
                } else {
                    vec![]
                };

                if matches!(
                    kind,
                    VerbKind::Desc | VerbKind::Export | VerbKind::Import | VerbKind::Chart
                ) {
                    candidates.extend(matching(self.table_names.iter(), prefix));
                }

                (start, candidates)
            }
        }
    }

    fn sql_candidates(&self, prefix: &str) -> Vec<String> {
        let table_names = self.table_names.iter().map(String::as_str);
        matching(SQL_KEYWORDS.iter().copied().chain(table_names), prefix)
    }
}

/// Return the start and the text of the word that ends at `pos` in `line`.
fn current_word(line: &str, pos: usize) -> (usize, &str) {
    let start = line[..pos]
        .char_indices()
        .rev()
        .find(|(_index, c)| c.is_whitespace())
        .map_or(0, |(index, c)| index + c.len_utf8());

    (start, &line[start..pos])
}

/// Return the values of the setting `key` that `set key` completes.
fn setting_values(key: &str) -> Vec<&'static str> {
    match key.to_lowercase().as_str() {
        "vi-mode" | "heading" => SWITCH_VALUES.to_vec(),
        "box-style" => BoxStyle::NAMES.to_vec(),
        "tz" => vec!["Local", "UTC"],
        "timeformat" => ["ns", "us", "ms", "s"]
            .into_iter()
            .chain(SYMBOLIC_LAYOUTS.iter().map(|(name, _layout)| *name))
            .collect(),
        _ => vec![],
    }
}

/// Return the candidates that start with `prefix` ignoring case.
fn matching(candidates: impl Iterator<Item = impl AsRef<str>>, prefix: &str) -> Vec<String> {
    let uppercase_prefix = prefix.to_uppercase();
    candidates
        .filter(|candidate| candidate.as_ref().to_uppercase().starts_with(&uppercase_prefix))
        .map(|candidate| candidate.as_ref().to_owned())
        .collect()
}

impl Helper for ShellHelper {}

impl Completer for ShellHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> std::result::Result<(usize, Vec<Self::Candidate>), ReadlineError> {
        Ok(self.candidates(line, pos))
    }
}

impl Highlighter for ShellHelper {}

impl Hinter for ShellHelper {
    type Hint = String;
}

impl Validator for ShellHelper {}
