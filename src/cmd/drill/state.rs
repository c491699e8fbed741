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

use std::sync::Arc;
use std::sync::Mutex;

use kotoba_core::session::Session;
use tokio::sync::oneshot::Sender;

use crate::cmd::drill::voice::BrowserVoice;
use crate::cmd::drill::writer::ProgressWriter;

#[derive(Clone)]
pub struct ServerState {
    pub session: Arc<Mutex<Session<ProgressWriter>>>,
    pub voice: BrowserVoice,
    pub shutdown_tx: Arc<Mutex<Option<Sender<()>>>>,
}
