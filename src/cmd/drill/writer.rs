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

use kotoba_core::error::ErrorReport;
use kotoba_core::error::Fallible;
use kotoba_core::store::ProgressSink;
use kotoba_core::store::ProgressUpdate;
use kotoba_core::types::item_id::ItemId;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::unbounded_channel;
use tokio::task::JoinHandle;
use tokio::task::spawn_blocking;

use crate::db::Database;

enum Message {
    Save(ItemId, ProgressUpdate),
    Stop,
}

/// A progress sink that never blocks the caller. Updates go through a
/// channel to a blocking task that owns the database connection and
/// applies them in order.
#[derive(Clone)]
pub struct ProgressWriter {
    tx: UnboundedSender<Message>,
}

impl ProgressWriter {
    /// Starts the writer task. The handle resolves to the number of updates
    /// written once [`ProgressWriter::stop`] is called or every sender is
    /// dropped.
    pub fn spawn(db: Database) -> (Self, JoinHandle<usize>) {
        let (tx, mut rx) = unbounded_channel();
        let handle = spawn_blocking(move || {
            let mut written = 0;
            while let Some(message) = rx.blocking_recv() {
                match message {
                    Message::Save(item, update) => match db.save(item, &update) {
                        Ok(()) => written += 1,
                        Err(e) => log::warn!("Failed to save progress of {}: {e}", item.short()),
                    },
                    Message::Stop => break,
                }
            }
            log::debug!("Progress writer stopped after {written} writes");
            written
        });
        (Self { tx }, handle)
    }

    /// Asks the writer to finish. Updates sent before this are still written.
    pub fn stop(&self) {
        let _ = self.tx.send(Message::Stop);
    }
}

impl ProgressSink for ProgressWriter {
    fn save_progress(&self, item: ItemId, update: &ProgressUpdate) -> Fallible<()> {
        self.tx
            .send(Message::Save(item, *update))
            .map_err(|_| ErrorReport::new("the progress writer has stopped"))
    }
}
