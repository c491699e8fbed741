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

//! Mastery tiers gate which exercise an item gets in a mastery test.
//!
//! | Tier | Exercise        |
//! |------|-----------------|
//! | 0    | multiple choice |
//! | 1    | pair matching   |
//! | 2    | typed recall    |
//! | 3    | none (mastered) |

use std::fmt::Display;
use std::fmt::Formatter;

use serde::Deserialize;
use serde::Serialize;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::error::fail;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct MasteryTier(u8);

impl MasteryTier {
    pub const NEW: MasteryTier = MasteryTier(0);
    pub const MASTERED: MasteryTier = MasteryTier(3);

    pub fn new(value: u8) -> Fallible<Self> {
        if value > Self::MASTERED.0 {
            fail(format!("mastery tier out of range: {value}"))
        } else {
            Ok(Self(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn promote(self) -> Self {
        Self(u8::min(self.0 + 1, Self::MASTERED.0))
    }

    pub fn demote(self) -> Self {
        Self(self.0.saturating_sub(1))
    }

    /// The tier after one graded attempt.
    pub fn after(self, correct: bool) -> Self {
        if correct { self.promote() } else { self.demote() }
    }

    pub fn is_mastered(self) -> bool {
        self == Self::MASTERED
    }

    pub fn gate(self) -> Gate {
        match self.0 {
            0 => Gate::Choice,
            1 => Gate::Matching,
            2 => Gate::Typing,
            _ => Gate::Excluded,
        }
    }
}

impl Display for MasteryTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Lv.{}", self.0)
    }
}

impl TryFrom<u8> for MasteryTier {
    type Error = ErrorReport;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        MasteryTier::new(value)
    }
}

impl From<MasteryTier> for u8 {
    fn from(tier: MasteryTier) -> u8 {
        tier.0
    }
}

/// The exercise a tier allows.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Gate {
    Choice,
    Matching,
    Typing,
    Excluded,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct TierChange {
    pub before: MasteryTier,
    pub after: MasteryTier,
}

impl TierChange {
    pub fn is_promotion(&self) -> bool {
        self.after > self.before
    }
}

/// Number of items at each tier.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
pub struct TierHistogram {
    counts: [usize; 4],
}

impl TierHistogram {
    pub fn from_tiers(tiers: impl IntoIterator<Item = MasteryTier>) -> Self {
        let mut counts = [0; 4];
        for tier in tiers {
            counts[tier.0 as usize] += 1;
        }
        Self { counts }
    }

    pub fn count(&self, tier: MasteryTier) -> usize {
        self.counts[tier.0 as usize]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Items still eligible for a mastery test.
    pub fn unmastered(&self) -> usize {
        self.total() - self.count(MasteryTier::MASTERED)
    }

    /// Sum of tiers over the maximum possible sum, as a rounded percentage.
    pub fn progress_percent(&self) -> u32 {
        let total = self.total();
        if total == 0 {
            return 0;
        }
        let points: usize = self
            .counts
            .iter()
            .enumerate()
            .map(|(tier, count)| tier * count)
            .sum();
        let max = total * MasteryTier::MASTERED.0 as usize;
        (points as f64 / max as f64 * 100.0).round() as u32
    }
}
