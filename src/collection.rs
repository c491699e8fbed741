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

use std::path::Path;
use std::path::PathBuf;

use kotoba_core::error::Fallible;
use kotoba_core::parser::parse_decks;
use kotoba_core::store::ItemStore;
use kotoba_core::store::ProgressSink;
use kotoba_core::store::ProgressUpdate;
use kotoba_core::types::item::VocabItem;
use kotoba_core::types::item_id::ItemId;
use kotoba_core::types::timestamp::Timestamp;
use walkdir::DirEntry;
use walkdir::WalkDir;

use crate::db::Database;
use crate::utils::resolve_directory;

pub const DATABASE_FILE: &str = "kotoba.db";

/// A directory of deck files plus the database next to them.
pub struct Collection {
    pub directory: PathBuf,
    pub db: Database,
    pub items: Vec<VocabItem>,
}

impl Collection {
    /// Reads the decks, registers words the database has not seen, and
    /// attaches the stored progress to every word.
    pub fn new(directory: Option<String>) -> Fallible<Self> {
        let directory = resolve_directory(directory)?;
        let items = read_decks(&directory)?;
        let db = Database::new(&directory.join(DATABASE_FILE))?;

        let known = db.item_ids()?;
        let now = Timestamp::now();
        let mut added = 0;
        for item in items.iter() {
            if !known.contains(&item.id()) {
                db.insert_item(item.id(), now)?;
                added += 1;
            }
        }
        if added > 0 {
            log::debug!("Registered {added} new words");
        }

        let progress = db.progress()?;
        let items = items
            .into_iter()
            .map(|item| match progress.get(&item.id()) {
                Some(p) => item.with_progress(*p),
                None => item,
            })
            .collect();
        Ok(Self {
            directory,
            db,
            items,
        })
    }
}

impl ProgressSink for Collection {
    fn save_progress(&self, item: ItemId, update: &ProgressUpdate) -> Fallible<()> {
        self.db.save(item, update)
    }
}

impl ItemStore for Collection {
    fn load_items(&self, deck: Option<&str>) -> Fallible<Vec<VocabItem>> {
        Ok(self
            .items
            .iter()
            .filter(|item| deck.is_none_or(|d| item.deck() == d))
            .cloned()
            .collect())
    }
}

/// Parses every `.md` file under `directory`. Hidden files and directories
/// are skipped.
pub fn read_decks(directory: &Path) -> Fallible<Vec<VocabItem>> {
    let mut files: Vec<(String, String)> = Vec::new();
    let walker = WalkDir::new(directory)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));
    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "md") {
            let text = std::fs::read_to_string(path)?;
            let name = path
                .strip_prefix(directory)
                .unwrap_or(path)
                .display()
                .to_string();
            files.push((name, text));
        }
    }
    log::debug!("Found {} deck files in {}", files.len(), directory.display());
    parse_decks(files.iter().map(|(name, text)| (name.as_str(), text.as_str())))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}
