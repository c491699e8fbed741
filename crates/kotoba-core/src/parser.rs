// Copyright 2025 Fernando Borretti
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

//! Deck files. One item per block:
//!
//! ```text
//! W: 訪問
//! R: ほうもん (houmon)
//! M: visit; call on
//! E: 友達の家を訪問した。 | I visited a friend's house.
//! ---
//! ```

use std::error::Error;
use std::fmt::Display;
use std::fmt::Formatter;

use serde::Deserialize;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::types::item::DeckName;
use crate::types::item::Example;
use crate::types::item::VocabItem;

/// Metadata that can be specified at the top of a deck file.
#[derive(Debug, Deserialize)]
struct DeckMetadata {
    name: Option<String>,
}

/// Splits off TOML frontmatter delimited by `---` lines. Returns the deck
/// name it sets, if any, and the rest of the text.
pub fn extract_frontmatter(text: &str) -> Fallible<(Option<String>, &str)> {
    let mut lines = text.split_inclusive('\n');
    match lines.next() {
        Some(line) if line.trim() == "---" => {}
        _ => return Ok((None, text)),
    }
    let mut offset = text.find('\n').map_or(text.len(), |i| i + 1);
    let mut frontmatter = String::new();
    for line in lines {
        offset += line.len();
        if line.trim() == "---" {
            let metadata: DeckMetadata = toml::from_str(&frontmatter)
                .map_err(|e| ErrorReport::new(format!("Failed to parse TOML frontmatter: {e}")))?;
            return Ok((metadata.name, &text[offset..]));
        }
        frontmatter.push_str(line);
    }
    Err(ErrorReport::new(
        "Frontmatter opening '---' found but no closing '---'",
    ))
}

/// Parse deck files given as `(filename, content)` pairs. Items are sorted
/// by id and duplicates removed.
pub fn parse_decks<'a>(
    files: impl Iterator<Item = (&'a str, &'a str)>,
) -> Fallible<Vec<VocabItem>> {
    let mut all_items = Vec::new();
    for (filename, text) in files {
        let (custom_name, content) = extract_frontmatter(text)?;
        let deck_name: DeckName = custom_name.unwrap_or_else(|| deck_name_of(filename));
        let parser = Parser::new(deck_name, filename.to_string());
        all_items.extend(parser.parse(content)?);
    }
    all_items.sort_by_key(|item| item.id());
    all_items.dedup_by_key(|item| item.id());
    Ok(all_items)
}

/// The file stem: `decks/n5.md` is the deck `n5`.
fn deck_name_of(filename: &str) -> DeckName {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    base.strip_suffix(".md").unwrap_or(base).to_string()
}

#[derive(Debug)]
pub struct ParserError {
    pub message: String,
    pub source_path: String,
    pub line_num: usize,
}

impl ParserError {
    fn new(message: impl Into<String>, source_path: String, line_num: usize) -> Self {
        ParserError {
            message: message.into(),
            source_path,
            line_num,
        }
    }
}

impl Display for ParserError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} Location: {}:{}",
            self.message,
            self.source_path,
            self.line_num + 1
        )
    }
}

impl Error for ParserError {}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Tag {
    Word,
    Reading,
    Meaning,
    Example,
}

impl Tag {
    fn name(self) -> &'static str {
        match self {
            Tag::Word => "word",
            Tag::Reading => "reading",
            Tag::Meaning => "meaning",
            Tag::Example => "example",
        }
    }
}

enum Line {
    Tagged(Tag, String),
    /// A line that's just `---`.
    Separator,
    Blank,
    Text(String),
}

impl Line {
    fn read(line: &str) -> Self {
        let tags = [
            ("W:", Tag::Word),
            ("R:", Tag::Reading),
            ("M:", Tag::Meaning),
            ("E:", Tag::Example),
        ];
        for (prefix, tag) in tags {
            if let Some(rest) = line.strip_prefix(prefix) {
                return Line::Tagged(tag, rest.trim().to_string());
            }
        }
        if line.trim() == "---" {
            Line::Separator
        } else if line.trim().is_empty() {
            Line::Blank
        } else {
            Line::Text(line.trim().to_string())
        }
    }
}

#[derive(Default)]
struct Draft {
    word: String,
    reading: Option<String>,
    meaning: Option<String>,
    examples: Vec<Example>,
}

enum State {
    Initial,
    ReadingItem {
        draft: Draft,
        start_line: usize,
        /// The most recent tag, which a text line continues.
        last: Tag,
    },
}

pub struct Parser {
    deck_name: DeckName,
    source_path: String,
}

impl Parser {
    pub fn new(deck_name: DeckName, source_path: String) -> Self {
        Parser {
            deck_name,
            source_path,
        }
    }

    pub fn parse(&self, text: &str) -> Result<Vec<VocabItem>, ParserError> {
        let mut items = Vec::new();
        let mut state = State::Initial;
        for (line_num, line) in text.lines().enumerate() {
            state = self.parse_line(state, Line::read(line), line_num, &mut items)?;
        }
        if let State::ReadingItem {
            draft, start_line, ..
        } = state
        {
            items.push(self.finish(draft, start_line)?);
        }
        Ok(items)
    }

    fn error(&self, message: impl Into<String>, line_num: usize) -> ParserError {
        ParserError::new(message, self.source_path.clone(), line_num)
    }

    fn parse_line(
        &self,
        state: State,
        line: Line,
        line_num: usize,
        items: &mut Vec<VocabItem>,
    ) -> Result<State, ParserError> {
        match state {
            State::Initial => match line {
                Line::Tagged(Tag::Word, word) => self.start(word, line_num),
                Line::Tagged(tag, _) => Err(self.error(
                    format!("Found {} tag without a word.", tag.name()),
                    line_num,
                )),
                // Headings and notes between items are allowed.
                Line::Separator | Line::Blank | Line::Text(_) => Ok(State::Initial),
            },
            State::ReadingItem {
                mut draft,
                start_line,
                last,
            } => match line {
                Line::Tagged(Tag::Word, word) => {
                    items.push(self.finish(draft, start_line)?);
                    self.start(word, line_num)
                }
                Line::Tagged(tag, text) => {
                    let slot = match tag {
                        Tag::Reading => Some(&mut draft.reading),
                        Tag::Meaning => Some(&mut draft.meaning),
                        Tag::Word | Tag::Example => None,
                    };
                    match slot {
                        Some(Some(_)) => {
                            return Err(self.error(
                                format!("Found a second {} tag for one word.", tag.name()),
                                line_num,
                            ));
                        }
                        Some(slot) => *slot = Some(text),
                        None if text.is_empty() => {}
                        None => draft.examples.push(parse_example(&text)),
                    }
                    Ok(State::ReadingItem {
                        draft,
                        start_line,
                        last: tag,
                    })
                }
                Line::Separator => {
                    items.push(self.finish(draft, start_line)?);
                    Ok(State::Initial)
                }
                Line::Blank => Ok(State::ReadingItem {
                    draft,
                    start_line,
                    last,
                }),
                Line::Text(text) => {
                    if last != Tag::Meaning {
                        return Err(self.error(
                            format!("Found text after the {} tag.", last.name()),
                            line_num,
                        ));
                    }
                    draft.meaning = Some(match draft.meaning {
                        Some(meaning) if !meaning.is_empty() => format!("{meaning}\n{text}"),
                        _ => text,
                    });
                    Ok(State::ReadingItem {
                        draft,
                        start_line,
                        last,
                    })
                }
            },
        }
    }

    fn start(&self, word: String, line_num: usize) -> Result<State, ParserError> {
        if word.is_empty() {
            return Err(self.error("Found an empty word.", line_num));
        }
        Ok(State::ReadingItem {
            draft: Draft {
                word,
                ..Draft::default()
            },
            start_line: line_num,
            last: Tag::Word,
        })
    }

    fn finish(&self, draft: Draft, start_line: usize) -> Result<VocabItem, ParserError> {
        VocabItem::new(
            self.deck_name.clone(),
            draft.word,
            draft.reading,
            draft.meaning,
            draft.examples,
        )
        .map_err(|e| self.error(e.message(), start_line))
    }
}

/// `sentence | translation`, the translation being optional.
fn parse_example(text: &str) -> Example {
    match text.split_once('|') {
        Some((sentence, translation)) => {
            let translation = translation.trim();
            Example {
                sentence: sentence.trim().to_string(),
                translation: (!translation.is_empty()).then(|| translation.to_string()),
            }
        }
        None => Example {
            sentence: text.to_string(),
            translation: None,
        },
    }
}
