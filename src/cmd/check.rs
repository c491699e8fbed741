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

use kotoba_core::error::Fallible;
use kotoba_core::exercise::MissingField;
use kotoba_core::types::item::Field;
use kotoba_core::types::item::VocabItem;

use crate::collection::read_decks;
use crate::utils::resolve_directory;

/// Parses the collection and lists words that some exercises will skip.
pub fn check_collection(directory: Option<String>) -> Fallible<()> {
    let directory = resolve_directory(directory)?;
    let items = read_decks(&directory)?;
    let missing = missing_fields(&items);
    println!("Parsed {} words.", items.len());
    for problem in &missing {
        println!("{problem}");
    }
    if !missing.is_empty() {
        println!("{} words are incomplete.", missing.len());
    }
    Ok(())
}

/// The first missing field of each incomplete word.
fn missing_fields(items: &[VocabItem]) -> Vec<MissingField> {
    items
        .iter()
        .filter_map(|item| {
            [Field::Reading, Field::Meaning]
                .into_iter()
                .find(|field| item.field(*field).is_none())
                .map(|field| MissingField::of(item, field))
        })
        .collect()
}
