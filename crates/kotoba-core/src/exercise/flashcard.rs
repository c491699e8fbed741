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

use crate::error::Fallible;
use crate::error::fail;
use crate::exercise::Scored;
use crate::exercise::Verdict;
use crate::srs::Grade;
use crate::srs::SrsState;
use crate::srs::preview;
use crate::types::item::Example;
use crate::types::item::VocabItem;
use crate::types::item_id::ItemId;

/// A self-graded card: the term on the front, everything else on the back.
#[derive(Clone, Debug)]
pub struct Flashcard {
    item: ItemId,
    term: String,
    reading: Option<String>,
    meaning: Option<String>,
    examples: Vec<Example>,
    srs: SrsState,
    revealed: bool,
    graded: bool,
}

impl Flashcard {
    pub fn present(target: &VocabItem) -> Self {
        Self {
            item: target.id(),
            term: target.term().to_string(),
            reading: target.reading().map(str::to_string),
            meaning: target.meaning().map(str::to_string),
            examples: target.examples().to_vec(),
            srs: target.srs(),
            revealed: false,
            graded: false,
        }
    }

    pub fn item(&self) -> ItemId {
        self.item
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn reading(&self) -> Option<&str> {
        self.reading.as_deref()
    }

    pub fn meaning(&self) -> Option<&str> {
        self.meaning.as_deref()
    }

    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// The interval in days each grade button would schedule.
    pub fn intervals(&self) -> [u32; 4] {
        preview(self.srs)
    }

    pub fn reveal(&mut self) -> Fallible<Verdict> {
        if self.revealed {
            return Ok(Verdict::Ignored);
        }
        self.revealed = true;
        Ok(Verdict::Pending)
    }

    pub fn grade(&mut self, grade: Grade) -> Fallible<Verdict> {
        if self.graded {
            return fail("this card has already been graded");
        }
        self.graded = true;
        self.revealed = true;
        Ok(Verdict::Complete(vec![Scored {
            item: self.item,
            correct: grade != Grade::Again,
            grade,
        }]))
    }
}
