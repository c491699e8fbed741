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

//! kotoba-core: the review and test engine behind kotoba.
//!
//! - [`srs`]: a SuperMemo-2 scheduler
//! - [`mastery`]: four mastery tiers that gate the exercise types
//! - [`exercise`]: multiple choice, typed recall, pair matching and flashcards
//! - [`session`]: the session state machine with retry queueing
//! - [`parser`]: the deck file format
//! - [`store`]: the persistence and speech interfaces

pub mod error;
pub mod exercise;
pub mod mastery;
pub mod parser;
pub mod rng;
pub mod session;
pub mod srs;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use error::{ErrorReport, Fallible, fail};
pub use exercise::{Exercise, Response};
pub use mastery::{MasteryTier, TierHistogram};
pub use parser::parse_decks;
pub use session::{Session, SessionConfig};
pub use srs::{Grade, SrsState};
pub use store::{ItemStore, MemoryStore, ProgressSink, ProgressUpdate, Speaker};
pub use types::date::Date;
pub use types::item::VocabItem;
pub use types::item_id::ItemId;
pub use types::timestamp::Timestamp;
