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

use serde::Serialize;

use crate::exercise::MissingField;
use crate::mastery::TierChange;
use crate::types::item::Field;
use crate::types::item::VocabItem;
use crate::types::item_id::ItemId;

/// An item left out of a session because it lacks a field.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct DataWarning {
    pub item: ItemId,
    pub term: String,
    pub missing: Field,
}

impl From<MissingField> for DataWarning {
    fn from(value: MissingField) -> Self {
        Self {
            item: value.item,
            term: value.term,
            missing: value.field,
        }
    }
}

impl Display for DataWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "skipped '{}': no {}", self.term, self.missing)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SessionResult {
    /// The item as it stands at the end of the session.
    pub item: VocabItem,
    pub correct_on_first_attempt: bool,
    /// Graded attempts, retries included.
    pub attempts: u32,
    /// Mastery tests only.
    pub tier: Option<TierChange>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SessionSummary {
    pub results: Vec<SessionResult>,
    pub warnings: Vec<DataWarning>,
    /// The test found nothing left to master.
    pub fully_mastered: bool,
}

impl SessionSummary {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn correct(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.correct_on_first_attempt)
            .count()
    }

    /// Rounded share of items right on the first attempt.
    pub fn percentage(&self) -> u32 {
        match self.total() {
            0 => 0,
            total => (self.correct() as f64 / total as f64 * 100.0).round() as u32,
        }
    }

    pub fn promotions(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.tier.is_some_and(|t| t.is_promotion()))
            .count()
    }
}
