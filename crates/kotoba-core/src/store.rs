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

//! The collaborators a session talks to: where items come from, where
//! progress goes, and who pronounces the words.

use std::sync::Mutex;

use serde::Serialize;

use crate::error::Fallible;
use crate::error::fail;
use crate::mastery::MasteryTier;
use crate::srs::Grade;
use crate::srs::SrsState;
use crate::types::date::Date;
use crate::types::item::VocabItem;
use crate::types::item_id::ItemId;
use crate::types::timestamp::Timestamp;

/// One progress change to persist.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum ProgressUpdate {
    Srs {
        state: SrsState,
        due: Date,
        reviewed_at: Timestamp,
        grade: Grade,
    },
    Mastery {
        tier: MasteryTier,
    },
}

/// Receives progress changes. Saving the same item twice keeps the last
/// write.
pub trait ProgressSink {
    fn save_progress(&self, item: ItemId, update: &ProgressUpdate) -> Fallible<()>;
}

impl<T: ProgressSink + ?Sized> ProgressSink for &T {
    fn save_progress(&self, item: ItemId, update: &ProgressUpdate) -> Fallible<()> {
        (**self).save_progress(item, update)
    }
}

pub trait ItemStore: ProgressSink {
    /// Items with their current progress, optionally limited to one deck.
    fn load_items(&self, deck: Option<&str>) -> Fallible<Vec<VocabItem>>;
}

pub trait Speaker {
    fn speak(&self, text: &str);
}

/// A speaker that says nothing.
pub struct Mute;

impl Speaker for Mute {
    fn speak(&self, _text: &str) {}
}

/// Keeps items and progress in memory. Every write is recorded in order.
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<Vec<VocabItem>>,
    writes: Mutex<Vec<(ItemId, ProgressUpdate)>>,
}

impl MemoryStore {
    pub fn new(items: Vec<VocabItem>) -> Self {
        Self {
            items: Mutex::new(items),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn writes(&self) -> Vec<(ItemId, ProgressUpdate)> {
        match self.writes.lock() {
            Ok(writes) => writes.clone(),
            Err(_) => Vec::new(),
        }
    }
}

impl ProgressSink for MemoryStore {
    fn save_progress(&self, item: ItemId, update: &ProgressUpdate) -> Fallible<()> {
        let Ok(mut items) = self.items.lock() else {
            return fail("memory store lock poisoned");
        };
        let Some(stored) = items.iter_mut().find(|i| i.id() == item) else {
            return fail(format!("no item with id {item}"));
        };
        let mut progress = stored.progress();
        match update {
            ProgressUpdate::Srs { state, due, .. } => {
                progress.srs = *state;
                progress.due = Some(*due);
            }
            ProgressUpdate::Mastery { tier } => {
                progress.tier = *tier;
            }
        }
        *stored = stored.clone().with_progress(progress);
        drop(items);
        let Ok(mut writes) = self.writes.lock() else {
            return fail("memory store lock poisoned");
        };
        writes.push((item, *update));
        Ok(())
    }
}

impl ItemStore for MemoryStore {
    fn load_items(&self, deck: Option<&str>) -> Fallible<Vec<VocabItem>> {
        let Ok(items) = self.items.lock() else {
            return fail("memory store lock poisoned");
        };
        Ok(items
            .iter()
            .filter(|item| deck.is_none_or(|d| item.deck() == d))
            .cloned()
            .collect())
    }
}
