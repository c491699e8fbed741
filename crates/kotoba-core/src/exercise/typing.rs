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
use crate::types::item::Field;
use crate::types::item::VocabItem;
use crate::types::item_id::ItemId;

/// Text from an input method. While an IME is composing, the text is not
/// yet what the user means to type.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TypedInput {
    Composing(String),
    Committed(String),
}

#[derive(Clone, Debug)]
pub struct TypedRecall {
    item: ItemId,
    term: String,
    hint: Option<String>,
    expected: String,
    answered: Option<String>,
}

impl TypedRecall {
    pub fn present(target: &VocabItem) -> Result<Self, MissingField> {
        let expected = require(target, Field::Reading)?.to_string();
        Ok(Self {
            item: target.id(),
            term: target.term().to_string(),
            hint: target.meaning().map(str::to_string),
            expected,
            answered: None,
        })
    }

    pub fn item(&self) -> ItemId {
        self.item
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn expected(&self) -> &str {
        &self.expected
    }

    pub fn answered(&self) -> Option<&str> {
        self.answered.as_deref()
    }

    /// Submit without waiting for the user once the committed text is right.
    pub fn should_auto_submit(&self, input: &TypedInput) -> bool {
        match input {
            TypedInput::Composing(_) => false,
            TypedInput::Committed(text) => text.trim() == self.expected,
        }
    }

    pub fn submit(&mut self, input: TypedInput) -> Fallible<Verdict> {
        if self.answered.is_some() {
            return fail("this question has already been answered");
        }
        let text = match input {
            TypedInput::Composing(_) => return Ok(Verdict::Ignored),
            TypedInput::Committed(text) => text.trim().to_string(),
        };
        if text.is_empty() {
            return Ok(Verdict::Ignored);
        }
        let correct = text == self.expected;
        self.answered = Some(text);
        Ok(Verdict::Complete(vec![Scored::new(self.item, correct)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::tests::vocab;

    fn committed(s: &str) -> TypedInput {
        TypedInput::Committed(s.to_string())
    }

    #[test]
    fn test_expected_is_normalized() -> Fallible<()> {
        let item = vocab("訪問", Some("ほうもん（houmon）"), Some("visit"));
        let recall = TypedRecall::present(&item)?;
        assert_eq!(recall.expected(), "ほうもん");
        assert_eq!(recall.hint(), Some("visit"));
        Ok(())
    }

    #[test]
    fn test_composing_is_never_graded() -> Fallible<()> {
        let item = vocab("猫", Some("ねこ"), Some("cat"));
        let mut recall = TypedRecall::present(&item)?;
        let composing = TypedInput::Composing("ねこ".to_string());
        assert!(!recall.should_auto_submit(&composing));
        assert_eq!(recall.submit(composing)?, Verdict::Ignored);
        assert_eq!(recall.answered(), None);
        Ok(())
    }

    #[test]
    fn test_empty_input_is_ignored() -> Fallible<()> {
        let item = vocab("猫", Some("ねこ"), Some("cat"));
        let mut recall = TypedRecall::present(&item)?;
        assert_eq!(recall.submit(committed("   "))?, Verdict::Ignored);
        assert_eq!(recall.answered(), None);
        Ok(())
    }

    #[test]
    fn test_committed_input_is_trimmed_and_compared() -> Fallible<()> {
        let item = vocab("猫", Some("ねこ"), Some("cat"));
        let mut recall = TypedRecall::present(&item)?;
        assert!(recall.should_auto_submit(&committed(" ねこ ")));
        assert!(!recall.should_auto_submit(&committed("ね")));
        assert_eq!(
            recall.submit(committed(" ねこ "))?,
            Verdict::Complete(vec![Scored::new(item.id(), true)])
        );
        assert!(recall.submit(committed("ねこ")).is_err());
        Ok(())
    }

    #[test]
    fn test_wrong_answer() -> Fallible<()> {
        let item = vocab("猫", Some("ねこ"), None);
        let mut recall = TypedRecall::present(&item)?;
        assert_eq!(recall.hint(), None);
        assert_eq!(
            recall.submit(committed("いぬ"))?,
            Verdict::Complete(vec![Scored::new(item.id(), false)])
        );
        assert_eq!(recall.answered(), Some("いぬ"));
        Ok(())
    }

    #[test]
    fn test_requires_reading() {
        let item = vocab("猫", None, Some("cat"));
        assert!(TypedRecall::present(&item).is_err());
    }
}
