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

//! A SuperMemo-2 variant. The ease factor is updated on every review,
//! failures included, and never drops below [`MIN_EASE`].

use serde::Deserialize;
use serde::Serialize;

use crate::error::ErrorReport;
use crate::error::fail;
use crate::types::date::Date;

/// The ease factor floor.
pub const MIN_EASE: f64 = 1.3;

/// The ease factor of a new item.
pub const INITIAL_EASE: f64 = 2.5;

/// The interval after the second successful review.
const SECOND_INTERVAL: u32 = 6;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Grade {
    Again,
    Hard,
    Good,
    Easy,
}

impl Grade {
    pub const ALL: [Grade; 4] = [Grade::Again, Grade::Hard, Grade::Good, Grade::Easy];

    /// The grade an exercise produces: exercises only know right or wrong.
    pub fn from_correctness(correct: bool) -> Self {
        if correct { Grade::Easy } else { Grade::Again }
    }

    /// The button value, 1 to 4.
    pub fn value(self) -> u8 {
        match self {
            Grade::Again => 1,
            Grade::Hard => 2,
            Grade::Good => 3,
            Grade::Easy => 4,
        }
    }

    /// The SM-2 performance rating, 0 to 5.
    pub fn rating(self) -> u8 {
        match self {
            Grade::Again => 0,
            Grade::Hard => 3,
            Grade::Good => 4,
            Grade::Easy => 5,
        }
    }

    pub fn is_failure(self) -> bool {
        self.rating() < 3
    }

    pub fn as_str(&self) -> &str {
        match self {
            Grade::Again => "again",
            Grade::Hard => "hard",
            Grade::Good => "good",
            Grade::Easy => "easy",
        }
    }
}

impl TryFrom<String> for Grade {
    type Error = ErrorReport;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "again" | "1" => Ok(Grade::Again),
            "hard" | "2" => Ok(Grade::Hard),
            "good" | "3" => Ok(Grade::Good),
            "easy" | "4" => Ok(Grade::Easy),
            _ => fail(format!("invalid grade string: {value}")),
        }
    }
}

/// Scheduling state of one item.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SrsState {
    /// Days until the next review. Zero only for a never-reviewed item.
    pub interval: u32,
    /// Multiplier applied to the interval after a success.
    pub ease_factor: f64,
    /// Number of failed reviews.
    pub lapses: u32,
}

impl Default for SrsState {
    fn default() -> Self {
        Self {
            interval: 0,
            ease_factor: INITIAL_EASE,
            lapses: 0,
        }
    }
}

pub fn advance(current: SrsState, grade: Grade) -> SrsState {
    let rating = grade.rating();
    let SrsState {
        interval,
        ease_factor,
        lapses,
    } = current;
    let (interval, lapses) = if grade.is_failure() {
        (1, lapses.saturating_add(1))
    } else {
        let interval = match interval {
            0 => 1,
            1 => SECOND_INTERVAL,
            n => (n as f64 * ease_factor).round() as u32,
        };
        (interval, lapses)
    };
    SrsState {
        interval,
        ease_factor: new_ease(ease_factor, rating),
        lapses,
    }
}

fn new_ease(ease: f64, rating: u8) -> f64 {
    let q = (5 - rating) as f64;
    let ease = ease + (0.1 - q * (0.08 + q * 0.02));
    f64::max(ease, MIN_EASE)
}

pub fn due_date(state: SrsState, today: Date) -> Date {
    today.add_days(state.interval)
}

/// The interval each grade would produce, in `Grade::ALL` order.
pub fn preview(state: SrsState) -> [u32; 4] {
    Grade::ALL.map(|g| advance(state, g).interval)
}
