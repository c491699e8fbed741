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
use crate::exercise::MissingField;
use crate::exercise::Scored;
use crate::exercise::Verdict;
use crate::exercise::require;
use crate::rng::TinyRng;
use crate::rng::shuffle;
use crate::types::item::Field;
use crate::types::item::VocabItem;
use crate::types::item_id::ItemId;

/// The largest batch a board holds.
pub const MAX_PAIRS: usize = 6;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Side {
    Term,
    Meaning,
}

#[derive(Clone, Debug)]
pub struct Tile {
    /// Index into the board's batch.
    slot: usize,
    side: Side,
    text: String,
    matched: bool,
}

impl Tile {
    pub fn side(&self) -> Side {
        self.side
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_matched(&self) -> bool {
        self.matched
    }
}

/// Term tiles and meaning tiles for a batch of items, to be paired up.
///
/// A wrong pair marks both of its items as mistaken and freezes the board
/// until [`MatchingBoard::clear_selection`] is called.
#[derive(Clone, Debug)]
pub struct MatchingBoard {
    items: Vec<ItemId>,
    mistaken: Vec<bool>,
    tiles: Vec<Tile>,
    selected: Vec<usize>,
    cooling: bool,
    last_match: Option<ItemId>,
}

impl MatchingBoard {
    pub fn present(batch: &[&VocabItem], rng: &mut TinyRng) -> Result<Self, MissingField> {
        let mut tiles = Vec::with_capacity(batch.len() * 2);
        for (slot, item) in batch.iter().enumerate() {
            let meaning = require(item, Field::Meaning)?;
            tiles.push(Tile {
                slot,
                side: Side::Term,
                text: item.term().to_string(),
                matched: false,
            });
            tiles.push(Tile {
                slot,
                side: Side::Meaning,
                text: meaning.to_string(),
                matched: false,
            });
        }
        Ok(Self {
            items: batch.iter().map(|item| item.id()).collect(),
            mistaken: vec![false; batch.len()],
            tiles: shuffle(tiles, rng),
            selected: Vec::new(),
            cooling: false,
            last_match: None,
        })
    }

    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    /// True while a wrong pair is on display.
    pub fn is_cooling(&self) -> bool {
        self.cooling
    }

    /// True if the item behind the tile at `index` was part of a wrong pair.
    pub fn is_mistaken(&self, index: usize) -> bool {
        self.tiles
            .get(index)
            .is_some_and(|tile| self.mistaken[tile.slot])
    }

    /// The item of the most recently matched pair.
    pub fn last_match(&self) -> Option<ItemId> {
        self.last_match
    }

    pub fn is_complete(&self) -> bool {
        self.tiles.iter().all(|t| t.matched)
    }

    pub fn pick(&mut self, index: usize) -> Fallible<Verdict> {
        let Some(tile) = self.tiles.get(index) else {
            return fail(format!("no tile at index {index}"));
        };
        if self.cooling || tile.matched || self.selected.contains(&index) {
            return Ok(Verdict::Ignored);
        }
        let Some(&first) = self.selected.first() else {
            self.selected.push(index);
            return Ok(Verdict::Pending);
        };
        let a = self.tiles[first].slot;
        let b = self.tiles[index].slot;
        if a == b {
            self.tiles[first].matched = true;
            self.tiles[index].matched = true;
            self.selected.clear();
            self.last_match = Some(self.items[a]);
            if self.is_complete() {
                Ok(Verdict::Complete(self.score()))
            } else {
                Ok(Verdict::Matched(self.items[a]))
            }
        } else {
            self.mistaken[a] = true;
            self.mistaken[b] = true;
            self.selected.push(index);
            self.cooling = true;
            Ok(Verdict::Mismatch)
        }
    }

    /// Ends the cooldown after a wrong pair.
    pub fn clear_selection(&mut self) {
        self.selected.clear();
        self.cooling = false;
    }

    fn score(&self) -> Vec<Scored> {
        self.items
            .iter()
            .zip(&self.mistaken)
            .map(|(item, mistaken)| Scored::new(*item, !mistaken))
            .collect()
    }
}
