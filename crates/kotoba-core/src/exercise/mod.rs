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

//! The exercise types. Each one is built from an item (or a batch of
//! items), accepts [`Response`]s, and reports a [`Verdict`]. Exercises know
//! nothing about scheduling: a completed exercise yields one [`Scored`]
//! record per item and the session does the rest.

pub mod choice;
pub mod flashcard;
pub mod matching;
pub mod typing;

use std::error::Error;
use std::fmt::Display;
use std::fmt::Formatter;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Fallible;
use crate::error::fail;
use crate::exercise::choice::MultipleChoice;
use crate::exercise::flashcard::Flashcard;
use crate::exercise::matching::MatchingBoard;
use crate::exercise::typing::TypedInput;
use crate::exercise::typing::TypedRecall;
use crate::srs::Grade;
use crate::types::item::Field;
use crate::types::item::VocabItem;
use crate::types::item_id::ItemId;

/// The field a multiple-choice question asks about.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ChoiceField {
    Meaning,
    Reading,
}

impl From<ChoiceField> for Field {
    fn from(field: ChoiceField) -> Field {
        match field {
            ChoiceField::Meaning => Field::Meaning,
            ChoiceField::Reading => Field::Reading,
        }
    }
}

/// Forward questions show the term; reverse questions show the field and
/// ask for the term.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

/// An item lacks the field an exercise needs.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MissingField {
    pub item: ItemId,
    pub term: String,
    pub field: Field,
}

impl MissingField {
    pub fn of(item: &VocabItem, field: Field) -> Self {
        Self {
            item: item.id(),
            term: item.term().to_string(),
            field,
        }
    }
}

impl Display for MissingField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' has no {}", self.term, self.field)
    }
}

impl Error for MissingField {}

/// Returns the field's text or the error naming it.
pub(crate) fn require(item: &VocabItem, field: Field) -> Result<&str, MissingField> {
    item.field(field).ok_or_else(|| MissingField::of(item, field))
}

#[derive(Clone, PartialEq, Debug)]
pub enum Response {
    /// Pick a multiple-choice option by index.
    Choose(usize),
    Type(TypedInput),
    /// Pick a matching tile by index.
    Pick(usize),
    /// Flip a flashcard.
    Reveal,
    /// Self-grade a flashcard.
    Grade(Grade),
}

/// The outcome of one graded item.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Scored {
    pub item: ItemId,
    pub correct: bool,
    pub grade: Grade,
}

impl Scored {
    pub fn new(item: ItemId, correct: bool) -> Self {
        Self {
            item,
            correct,
            grade: Grade::from_correctness(correct),
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum Verdict {
    /// Accepted, but the exercise is not done.
    Pending,
    /// Accepted and dropped without any effect.
    Ignored,
    /// Two tiles of different items were picked.
    Mismatch,
    /// A matching pair was found and the board is not yet cleared.
    Matched(ItemId),
    /// The exercise is done. One record per item, in batch order.
    Complete(Vec<Scored>),
}

#[derive(Clone, Debug)]
pub enum Exercise {
    Choice(MultipleChoice),
    Typing(TypedRecall),
    Matching(MatchingBoard),
    Flashcard(Flashcard),
}

impl Exercise {
    /// The items this exercise scores, in batch order.
    pub fn items(&self) -> Vec<ItemId> {
        match self {
            Exercise::Choice(e) => vec![e.item()],
            Exercise::Typing(e) => vec![e.item()],
            Exercise::Matching(e) => e.items().to_vec(),
            Exercise::Flashcard(e) => vec![e.item()],
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Exercise::Choice(_) => "choice",
            Exercise::Typing(_) => "typing",
            Exercise::Matching(_) => "matching",
            Exercise::Flashcard(_) => "flashcard",
        }
    }

    /// Errors leave the exercise unchanged.
    pub fn respond(&mut self, response: Response) -> Fallible<Verdict> {
        match (self, response) {
            (Exercise::Choice(e), Response::Choose(index)) => e.choose(index),
            (Exercise::Typing(e), Response::Type(input)) => e.submit(input),
            (Exercise::Matching(e), Response::Pick(index)) => e.pick(index),
            (Exercise::Flashcard(e), Response::Reveal) => e.reveal(),
            (Exercise::Flashcard(e), Response::Grade(grade)) => e.grade(grade),
            (exercise, response) => fail(format!(
                "a {} exercise does not accept {:?}",
                exercise.kind(),
                response
            )),
        }
    }
}
