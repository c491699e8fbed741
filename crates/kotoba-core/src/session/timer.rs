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

//! The session never sleeps. It arms a timer, the caller waits out the
//! delay, and then hands the token back. Only the most recently armed
//! timer is live.

use std::fmt::Display;
use std::fmt::Formatter;
use std::time::Duration;

/// How long the answer stays on screen after a multiple-choice question.
pub const CHOICE_REVEAL: Duration = Duration::from_millis(1000);

/// After a correct typed answer.
pub const TYPING_REVEAL_CORRECT: Duration = Duration::from_millis(700);

/// After a wrong typed answer.
pub const TYPING_REVEAL_WRONG: Duration = Duration::from_millis(3000);

/// How long a wrong matching pair stays selected.
pub const MISMATCH_COOLDOWN: Duration = Duration::from_millis(800);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TimerToken(u64);

impl TimerToken {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl Display for TimerToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TimerKind {
    /// Hides the answer overlay.
    Reveal,
    /// Clears a wrong matching pair.
    Cooldown,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Timer {
    pub token: TimerToken,
    pub kind: TimerKind,
    pub delay: Duration,
}

#[derive(Default)]
pub(crate) struct TimerSlot {
    issued: u64,
    armed: Option<Timer>,
}

impl TimerSlot {
    /// Replaces whatever timer was armed.
    pub fn arm(&mut self, kind: TimerKind, delay: Duration) -> Timer {
        self.issued += 1;
        let timer = Timer {
            token: TimerToken(self.issued),
            kind,
            delay,
        };
        self.armed = Some(timer);
        timer
    }

    pub fn armed(&self) -> Option<Timer> {
        self.armed
    }

    pub fn cancel(&mut self) {
        self.armed = None;
    }

    /// Disarms and returns the timer if `token` is the live one.
    pub fn fire(&mut self, token: TimerToken) -> Option<Timer> {
        match self.armed {
            Some(timer) if timer.token == token => self.armed.take(),
            _ => None,
        }
    }
}
