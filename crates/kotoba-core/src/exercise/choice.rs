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
use crate::exercise::ChoiceField;
use crate::exercise::Direction;
use crate::exercise::MissingField;
use crate::exercise::Scored;
use crate::exercise::Verdict;
use crate::exercise::require;
use crate::rng::TinyRng;
use crate::rng::shuffle;
use crate::types::item::Field;
use crate::types::item::VocabItem;
use crate::types::item_id::ItemId;

/// Options shown per question, the correct one included.
pub const OPTION_COUNT: usize = 4;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ChoiceOption {
    Text(String),
    /// Fills a slot the pool could not. Never selectable.
    Placeholder,
}

#[derive(Clone, Debug)]
pub struct MultipleChoice {
    item: ItemId,
    term: String,
    field: ChoiceField,
    direction: Direction,
    prompt: String,
    answer: String,
    options: Vec<ChoiceOption>,
    chosen: Option<usize>,
}

impl MultipleChoice {
    pub fn present(
        target: &VocabItem,
        field: ChoiceField,
        direction: Direction,
        pool: &[VocabItem],
        rng: &mut TinyRng,
    ) -> Result<Self, MissingField> {
        let field_text = require(target, field.into())?.to_string();
        let term = target.term().to_string();
        let (prompt, answer) = match direction {
            Direction::Forward => (term.clone(), field_text),
            Direction::Reverse => (field_text, term.clone()),
        };

        let candidates: Vec<&str> = pool
            .iter()
            .filter(|other| other.id() != target.id())
            .filter_map(|other| {
                let text = other.field(field.into())?;
                Some(match direction {
                    Direction::Forward => text,
                    Direction::Reverse => other.term(),
                })
            })
            .collect();
        let mut distractors: Vec<&str> = Vec::with_capacity(OPTION_COUNT - 1);
        for text in shuffle(candidates, rng) {
            if distractors.len() == OPTION_COUNT - 1 {
                break;
            }
            if text != answer && !distractors.contains(&text) {
                distractors.push(text);
            }
        }

        let mut options = vec![ChoiceOption::Text(answer.clone())];
        options.extend(
            distractors
                .into_iter()
                .map(|t| ChoiceOption::Text(t.to_string())),
        );
        options.resize(OPTION_COUNT, ChoiceOption::Placeholder);
        let options = shuffle(options, rng);

        Ok(Self {
            item: target.id(),
            term,
            field,
            direction,
            prompt,
            answer,
            options,
            chosen: None,
        })
    }

    pub fn item(&self) -> ItemId {
        self.item
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn field(&self) -> ChoiceField {
        self.field
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// What the prompt is asking for, e.g. "meaning" or "term".
    pub fn asks_for(&self) -> Field {
        match self.direction {
            Direction::Forward => self.field.into(),
            Direction::Reverse => Field::Term,
        }
    }

    pub fn options(&self) -> &[ChoiceOption] {
        &self.options
    }

    pub fn chosen(&self) -> Option<usize> {
        self.chosen
    }

    pub fn choose(&mut self, index: usize) -> Fallible<Verdict> {
        if self.chosen.is_some() {
            return fail("this question has already been answered");
        }
        let correct = match self.options.get(index) {
            None => return fail(format!("no option at index {index}")),
            Some(ChoiceOption::Placeholder) => return fail("the placeholder cannot be chosen"),
            Some(ChoiceOption::Text(text)) => *text == self.answer,
        };
        self.chosen = Some(index);
        Ok(Verdict::Complete(vec![Scored::new(self.item, correct)]))
    }
}
