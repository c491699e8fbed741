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

use std::fmt::Display;
use std::fmt::Formatter;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Fallible;
use crate::error::fail;
use crate::mastery::MasteryTier;
use crate::mastery::TierChange;
use crate::srs::Grade;
use crate::srs::SrsState;
use crate::srs::advance;
use crate::srs::due_date;
use crate::types::date::Date;
use crate::types::item_id::ItemId;

pub type DeckName = String;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub sentence: String,
    pub translation: Option<String>,
}

/// The text fields of an item.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Field {
    Term,
    Reading,
    Meaning,
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Term => write!(f, "term"),
            Field::Reading => write!(f, "reading"),
            Field::Meaning => write!(f, "meaning"),
        }
    }
}

/// Everything about an item that changes as it is studied.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Progress {
    pub srs: SrsState,
    /// `None` until the first review.
    pub due: Option<Date>,
    pub tier: MasteryTier,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VocabItem {
    id: ItemId,
    deck: DeckName,
    term: String,
    reading: Option<String>,
    meaning: Option<String>,
    examples: Vec<Example>,
    progress: Progress,
}

impl VocabItem {
    /// Blank optional fields are stored as `None`.
    pub fn new(
        deck: DeckName,
        term: impl Into<String>,
        reading: Option<String>,
        meaning: Option<String>,
        examples: Vec<Example>,
    ) -> Fallible<Self> {
        let term: String = term.into().trim().to_string();
        if term.is_empty() {
            return fail("vocabulary item has an empty term");
        }
        let reading = non_blank(reading);
        let meaning = non_blank(meaning);
        Ok(Self {
            id: ItemId::of(&term, reading.as_deref()),
            deck,
            term,
            reading,
            meaning,
            examples,
            progress: Progress::default(),
        })
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn deck(&self) -> &DeckName {
        &self.deck
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    /// The reading as written, romanization included.
    pub fn reading(&self) -> Option<&str> {
        self.reading.as_deref()
    }

    pub fn meaning(&self) -> Option<&str> {
        self.meaning.as_deref()
    }

    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn srs(&self) -> SrsState {
        self.progress.srs
    }

    pub fn due(&self) -> Option<Date> {
        self.progress.due
    }

    pub fn tier(&self) -> MasteryTier {
        self.progress.tier
    }

    /// New items are always due.
    pub fn is_due(&self, today: Date) -> bool {
        match self.progress.due {
            None => true,
            Some(due) => due <= today,
        }
    }

    /// The text shown and compared for a field. Readings lose their
    /// parenthetical romanization.
    pub fn field(&self, field: Field) -> Option<&str> {
        match field {
            Field::Term => Some(self.term.as_str()),
            Field::Reading => self
                .reading
                .as_deref()
                .map(strip_romanization)
                .filter(|s| !s.is_empty()),
            Field::Meaning => self.meaning.as_deref(),
        }
    }

    /// Applies one graded review to the scheduling state.
    pub(crate) fn review(&mut self, grade: Grade, today: Date) -> SrsState {
        let srs = advance(self.progress.srs, grade);
        self.progress.srs = srs;
        self.progress.due = Some(due_date(srs, today));
        srs
    }

    pub(crate) fn record_mastery(&mut self, correct: bool) -> TierChange {
        let before = self.progress.tier;
        let after = before.after(correct);
        self.progress.tier = after;
        TierChange { before, after }
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// `"ほうもん (houmon)"` becomes `"ほうもん"`.
pub fn strip_romanization(text: &str) -> &str {
    let end = text.find(['(', '（']).unwrap_or(text.len());
    text[..end].trim()
}
