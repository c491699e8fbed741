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

use std::collections::BTreeMap;
use std::fmt::Display;
use std::fmt::Formatter;

use clap::ValueEnum;
use kotoba_core::error::Fallible;
use kotoba_core::mastery::MasteryTier;
use kotoba_core::mastery::TierHistogram;
use kotoba_core::store::ItemStore;
use kotoba_core::types::date::Date;
use kotoba_core::types::item::VocabItem;
use serde::Serialize;

use crate::collection::Collection;

#[derive(ValueEnum, Clone, Copy, PartialEq)]
pub enum StatsFormat {
    /// One line per deck.
    Text,
    /// Machine-readable output.
    Json,
}

impl Display for StatsFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StatsFormat::Text => write!(f, "text"),
            StatsFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Serialize)]
struct DeckStats {
    deck: String,
    words: usize,
    due_today: usize,
    tiers: TierHistogram,
    mastery_progress: u32,
}

impl DeckStats {
    fn new(deck: String, items: &[&VocabItem], today: Date) -> Self {
        let tiers = TierHistogram::from_tiers(items.iter().map(|item| item.tier()));
        Self {
            deck,
            words: items.len(),
            due_today: items.iter().filter(|item| item.is_due(today)).count(),
            tiers,
            mastery_progress: tiers.progress_percent(),
        }
    }
}

impl Display for DeckStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} words, {} due today, tiers",
            self.deck, self.words, self.due_today
        )?;
        let mut tier = MasteryTier::NEW;
        loop {
            write!(f, " {}", self.tiers.count(tier))?;
            if tier.is_mastered() {
                break;
            }
            tier = tier.promote();
        }
        write!(f, ", {}% mastered", self.mastery_progress)
    }
}

#[derive(Serialize)]
struct CollectionStats {
    decks: Vec<DeckStats>,
    total: DeckStats,
}

pub fn print_stats(directory: Option<String>, format: StatsFormat) -> Fallible<()> {
    let collection = Collection::new(directory)?;
    let stats = collect_stats(&collection.load_items(None)?, Date::today());
    match format {
        StatsFormat::Text => {
            for deck in &stats.decks {
                println!("{deck}");
            }
            println!("{}", stats.total);
        }
        StatsFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}

fn collect_stats(items: &[VocabItem], today: Date) -> CollectionStats {
    let mut by_deck: BTreeMap<&str, Vec<&VocabItem>> = BTreeMap::new();
    for item in items {
        by_deck.entry(item.deck().as_str()).or_default().push(item);
    }
    let decks = by_deck
        .into_iter()
        .map(|(deck, items)| DeckStats::new(deck.to_string(), &items, today))
        .collect();
    let all: Vec<&VocabItem> = items.iter().collect();
    CollectionStats {
        decks,
        total: DeckStats::new("total".to_string(), &all, today),
    }
}
