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

use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;

use kotoba_core::error::ErrorReport;
use kotoba_core::error::Fallible;
use kotoba_core::error::fail;
use kotoba_core::mastery::MasteryTier;
use kotoba_core::srs::SrsState;
use kotoba_core::store::ProgressUpdate;
use kotoba_core::types::date::Date;
use kotoba_core::types::item::Progress;
use kotoba_core::types::item_id::ItemId;
use kotoba_core::types::timestamp::Timestamp;
use rusqlite::Connection;
use rusqlite::params;

const SCHEMA: &str = r#"
create table if not exists items (
    item_id text primary key,
    added_at text not null,
    interval integer not null default 0,
    ease_factor real not null default 2.5,
    lapses integer not null default 0,
    due_date text,
    mastery_tier integer not null default 0
) strict;

create table if not exists reviews (
    review_id integer primary key,
    item_id text not null references items(item_id),
    reviewed_at text not null,
    grade text not null,
    interval integer not null,
    ease_factor real not null,
    lapses integer not null,
    due_date text not null
) strict;

create index if not exists reviews_by_item on reviews(item_id);
"#;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn new(path: &Path) -> Fallible<Self> {
        let conn = Connection::open(path).map_err(sql)?;
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn in_memory() -> Fallible<Self> {
        let conn = Connection::open_in_memory().map_err(sql)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Fallible<Self> {
        conn.execute_batch(SCHEMA).map_err(sql)?;
        Ok(Self { conn })
    }

    pub fn item_ids(&self) -> Fallible<HashSet<ItemId>> {
        let mut stmt = self
            .conn
            .prepare("select item_id from items")
            .map_err(sql)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(sql)?;
        let mut ids = HashSet::new();
        for row in rows {
            ids.insert(ItemId::from_hex(&row.map_err(sql)?)?);
        }
        Ok(ids)
    }

    /// Adds a never-reviewed item at tier 0.
    pub fn insert_item(&self, id: ItemId, added_at: Timestamp) -> Fallible<()> {
        self.conn
            .execute(
                "insert into items (item_id, added_at) values (?1, ?2)",
                params![id.to_hex(), added_at.to_string()],
            )
            .map_err(sql)?;
        Ok(())
    }

    /// The stored progress of every item.
    pub fn progress(&self) -> Fallible<HashMap<ItemId, Progress>> {
        let mut stmt = self
            .conn
            .prepare(
                "select item_id, interval, ease_factor, lapses, due_date, mastery_tier from items",
            )
            .map_err(sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ProgressRow {
                    item_id: row.get(0)?,
                    interval: row.get(1)?,
                    ease_factor: row.get(2)?,
                    lapses: row.get(3)?,
                    due_date: row.get(4)?,
                    mastery_tier: row.get(5)?,
                })
            })
            .map_err(sql)?;
        let mut progress = HashMap::new();
        for row in rows {
            let row = row.map_err(sql)?;
            progress.insert(ItemId::from_hex(&row.item_id)?, row.parse()?);
        }
        Ok(progress)
    }

    /// Applies one progress change. SRS changes are also appended to the
    /// review log.
    pub fn save(&self, id: ItemId, update: &ProgressUpdate) -> Fallible<()> {
        match update {
            ProgressUpdate::Srs {
                state,
                due,
                reviewed_at,
                grade,
            } => {
                let tx = self.conn.unchecked_transaction().map_err(sql)?;
                let changed = tx
                    .execute(
                        "update items set interval = ?1, ease_factor = ?2, lapses = ?3, due_date = ?4 where item_id = ?5",
                        params![
                            state.interval,
                            state.ease_factor,
                            state.lapses,
                            due.to_string(),
                            id.to_hex()
                        ],
                    )
                    .map_err(sql)?;
                if changed == 0 {
                    return fail(format!("no item with id {id} in the database"));
                }
                tx.execute(
                    "insert into reviews (item_id, reviewed_at, grade, interval, ease_factor, lapses, due_date) values (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        id.to_hex(),
                        reviewed_at.to_string(),
                        grade.as_str(),
                        state.interval,
                        state.ease_factor,
                        state.lapses,
                        due.to_string()
                    ],
                )
                .map_err(sql)?;
                tx.commit().map_err(sql)?;
            }
            ProgressUpdate::Mastery { tier } => {
                let changed = self
                    .conn
                    .execute(
                        "update items set mastery_tier = ?1 where item_id = ?2",
                        params![tier.value(), id.to_hex()],
                    )
                    .map_err(sql)?;
                if changed == 0 {
                    return fail(format!("no item with id {id} in the database"));
                }
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn review_count(&self, id: ItemId) -> Fallible<usize> {
        let count: i64 = self
            .conn
            .query_row(
                "select count(*) from reviews where item_id = ?1",
                params![id.to_hex()],
                |row| row.get(0),
            )
            .map_err(sql)?;
        Ok(count as usize)
    }
}

struct ProgressRow {
    item_id: String,
    interval: u32,
    ease_factor: f64,
    lapses: u32,
    due_date: Option<String>,
    mastery_tier: u8,
}

impl ProgressRow {
    fn parse(self) -> Fallible<Progress> {
        Ok(Progress {
            srs: SrsState {
                interval: self.interval,
                ease_factor: self.ease_factor,
                lapses: self.lapses,
            },
            due: self.due_date.map(Date::try_from).transpose()?,
            tier: MasteryTier::new(self.mastery_tier)?,
        })
    }
}

fn sql(e: rusqlite::Error) -> ErrorReport {
    ErrorReport::new(format!("database error: {e}"))
}

#[cfg(test)]
mod tests {
    use kotoba_core::srs::Grade;

    use super::*;

    fn id(term: &str) -> ItemId {
        ItemId::of(term, None)
    }

    #[test]
    fn test_insert_and_read_back() -> Fallible<()> {
        let db = Database::in_memory()?;
        db.insert_item(id("猫"), Timestamp::now())?;
        db.insert_item(id("犬"), Timestamp::now())?;
        let ids = db.item_ids()?;
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&id("猫")));
        let progress = db.progress()?;
        assert_eq!(progress[&id("猫")], Progress::default());
        Ok(())
    }

    #[test]
    fn test_duplicate_insert_fails() -> Fallible<()> {
        let db = Database::in_memory()?;
        db.insert_item(id("猫"), Timestamp::now())?;
        assert!(db.insert_item(id("猫"), Timestamp::now()).is_err());
        Ok(())
    }

    #[test]
    fn test_save_srs_logs_review() -> Fallible<()> {
        let db = Database::in_memory()?;
        let cat = id("猫");
        db.insert_item(cat, Timestamp::now())?;
        let state = SrsState {
            interval: 6,
            ease_factor: 2.36,
            lapses: 1,
        };
        let due = Date::try_from("2026-03-01".to_string())?;
        let update = ProgressUpdate::Srs {
            state,
            due,
            reviewed_at: Timestamp::now(),
            grade: Grade::Hard,
        };
        db.save(cat, &update)?;
        db.save(cat, &update)?;
        let progress = db.progress()?[&cat];
        assert_eq!(progress.srs, state);
        assert_eq!(progress.due, Some(due));
        assert_eq!(progress.tier, MasteryTier::NEW);
        assert_eq!(db.review_count(cat)?, 2);
        Ok(())
    }

    #[test]
    fn test_save_mastery_leaves_schedule() -> Fallible<()> {
        let db = Database::in_memory()?;
        let cat = id("猫");
        db.insert_item(cat, Timestamp::now())?;
        let tier = MasteryTier::new(2)?;
        db.save(cat, &ProgressUpdate::Mastery { tier })?;
        let progress = db.progress()?[&cat];
        assert_eq!(progress.tier, tier);
        assert_eq!(progress.due, None);
        assert_eq!(db.review_count(cat)?, 0);
        Ok(())
    }

    #[test]
    fn test_save_unknown_item() -> Fallible<()> {
        let db = Database::in_memory()?;
        let update = ProgressUpdate::Mastery {
            tier: MasteryTier::NEW,
        };
        assert!(db.save(id("猫"), &update).is_err());
        Ok(())
    }

    #[test]
    fn test_reopen_keeps_progress() -> Fallible<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("kotoba.db");
        let cat = id("猫");
        {
            let db = Database::new(&path)?;
            db.insert_item(cat, Timestamp::now())?;
            db.save(
                cat,
                &ProgressUpdate::Mastery {
                    tier: MasteryTier::MASTERED,
                },
            )?;
        }
        let db = Database::new(&path)?;
        assert_eq!(db.progress()?[&cat].tier, MasteryTier::MASTERED);
        Ok(())
    }
}
