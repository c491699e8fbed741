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

use kotoba_core::store::Speaker;

/// Queues phrases until the next page render hands them to the browser's
/// speech synthesis.
#[derive(Clone, Default)]
pub struct BrowserVoice {
    queue: Arc<Mutex<Vec<String>>>,
}

impl BrowserVoice {
    /// Drains the queue.
    pub fn take(&self) -> Vec<String> {
        match self.queue.lock() {
            Ok(mut queue) => std::mem::take(&mut *queue),
            Err(_) => Vec::new(),
        }
    }
}

impl Speaker for BrowserVoice {
    fn speak(&self, text: &str) {
        match self.queue.lock() {
            Ok(mut queue) => queue.push(text.to_string()),
            Err(_) => log::warn!("Dropped phrase '{text}': voice queue poisoned"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_drains() {
        let voice = BrowserVoice::default();
        let speaker: Box<dyn Speaker + Send> = Box::new(voice.clone());
        speaker.speak("猫");
        speaker.speak("犬");
        assert_eq!(voice.take(), vec!["猫".to_string(), "犬".to_string()]);
        assert!(voice.take().is_empty());
    }
}
