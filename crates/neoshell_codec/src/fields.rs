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

//! Quote-aware splitting of command lines into fields.

/// Code points with the Unicode `Quotation_Mark` property.
const QUOTATION_MARKS: &[char] = &[
    '"', '\'', '«', '»', '‘', '’', '‚', '‛', '“', '”', '„', '‟', '‹', '›', '⹂', '「', '」', '『',
    '』', '〝', '〞', '〟', '﹁', '﹂', '﹃', '﹄', '＂', '＇', '｢', '｣',
];

/// Return [`true`] if `c` is a quotation mark.
pub fn is_quotation_mark(c: char) -> bool {
    QUOTATION_MARKS.contains(&c)
}

/// Split `line` on whitespace outside of quoted regions. A quoted region starts at any quotation
/// mark and ends at the next occurrence of the same code point. If `strip_quotes` is set, fields
/// that start with a quotation mark have that mark removed from both ends.
pub fn split_fields(line: &str, strip_quotes: bool) -> Vec<String> {
    let mut fields = vec![];
    let mut field = String::new();
    let mut open_quote: Option<char> = None;

    for c in line.chars() {
        match open_quote {
            Some(quote) if c == quote => {
                open_quote = None;
                field.push(c);
            }
            Some(_quote) => field.push(c),
            None if is_quotation_mark(c) => {
                open_quote = Some(c);
                field.push(c);
            }
            None if c.is_whitespace() => {
                if !field.is_empty() {
                    fields.push(std::mem::take(&mut field));
                }
            }
            None => field.push(c),
        }
    }

    if !field.is_empty() {
        fields.push(field);
    }

    if strip_quotes {
        fields.iter_mut().for_each(|field| *field = strip_quote(field));
    }

    fields
}

/// Remove the quotation mark `field` starts with from both of its ends.
pub fn strip_quote(field: &str) -> String {
    match field.chars().next() {
        Some(quote) if is_quotation_mark(quote) => field.trim_matches(quote).to_owned(),
        _ => field.to_owned(),
    }
}
