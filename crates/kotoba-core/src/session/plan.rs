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

//! Turning a working set of items into a queue of exercises.
//!
//! A [`Plan`] names an exercise without its random parts. Options and tile
//! orders are drawn when the plan reaches the front of the queue, so a retry
//! of a multiple-choice question gets fresh distractors.

use std::collections::HashMap;

use crate::error::Fallible;
use crate::error::fail;
use crate::exercise::ChoiceField;
use crate::exercise::Direction;
use crate::exercise::Exercise;
use crate::exercise::MissingField;
use crate::exercise::Scored;
use crate::exercise::choice::MultipleChoice;
use crate::exercise::flashcard::Flashcard;
use crate::exercise::matching::MAX_PAIRS;
use crate::exercise::matching::MatchingBoard;
use crate::exercise::typing::TypedRecall;
use crate::mastery::Gate;
use crate::rng::TinyRng;
use crate::rng::choose;
use crate::session::ReviewKind;
use crate::session::summary::DataWarning;
use crate::types::item::Field;
use crate::types::item::VocabItem;
use crate::types::item_id::ItemId;

/// Mixed review only offers a matching batch when at least this many items
/// are left.
pub const MIN_MIXED_MATCHING: usize = 4;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Plan {
    Choice {
        item: ItemId,
        field: ChoiceField,
        direction: Direction,
    },
    Typing(ItemId),
    Matching(Vec<ItemId>),
    Flashcard(ItemId),
}

impl Plan {
    pub fn items(&self) -> Vec<ItemId> {
        match self {
            Plan::Choice { item, .. } | Plan::Typing(item) | Plan::Flashcard(item) => vec![*item],
            Plan::Matching(items) => items.clone(),
        }
    }

    fn meaning_choice(item: ItemId) -> Self {
        Plan::Choice {
            item,
            field: ChoiceField::Meaning,
            direction: Direction::Forward,
        }
    }
}

/// The session's copy of the deck, with lookup by id.
pub(crate) struct Deck {
    items: Vec<VocabItem>,
    index: HashMap<ItemId, usize>,
}

impl Deck {
    /// Later duplicates of an id are dropped.
    pub fn new(items: Vec<VocabItem>) -> Self {
        let mut kept = Vec::with_capacity(items.len());
        let mut index = HashMap::new();
        for item in items {
            if !index.contains_key(&item.id()) {
                index.insert(item.id(), kept.len());
                kept.push(item);
            }
        }
        Self { items: kept, index }
    }

    pub fn items(&self) -> &[VocabItem] {
        &self.items
    }

    pub fn get(&self, id: ItemId) -> Fallible<&VocabItem> {
        match self.index.get(&id) {
            Some(i) => Ok(&self.items[*i]),
            None => fail(format!("no item with id {id}")),
        }
    }

    pub fn get_mut(&mut self, id: ItemId) -> Fallible<&mut VocabItem> {
        match self.index.get(&id) {
            Some(i) => Ok(&mut self.items[*i]),
            None => fail(format!("no item with id {id}")),
        }
    }
}

pub(crate) fn build(plan: &Plan, deck: &Deck, rng: &mut TinyRng) -> Fallible<Exercise> {
    let exercise = match plan {
        Plan::Choice {
            item,
            field,
            direction,
        } => Exercise::Choice(MultipleChoice::present(
            deck.get(*item)?,
            *field,
            *direction,
            deck.items(),
            rng,
        )?),
        Plan::Typing(item) => Exercise::Typing(TypedRecall::present(deck.get(*item)?)?),
        Plan::Matching(items) => {
            let batch: Vec<&VocabItem> = items
                .iter()
                .map(|id| deck.get(*id))
                .collect::<Fallible<_>>()?;
            Exercise::Matching(MatchingBoard::present(&batch, rng)?)
        }
        Plan::Flashcard(item) => Exercise::Flashcard(Flashcard::present(deck.get(*item)?)),
    };
    Ok(exercise)
}

/// What to queue after a completed exercise with wrong answers in it.
pub(crate) fn retry(exercise: &Exercise, scored: &[Scored]) -> Option<Plan> {
    let missed: Vec<ItemId> = scored.iter().filter(|s| !s.correct).map(|s| s.item).collect();
    if missed.is_empty() {
        return None;
    }
    let plan = match exercise {
        Exercise::Choice(mc) => Plan::Choice {
            item: mc.item(),
            field: mc.field(),
            direction: mc.direction(),
        },
        Exercise::Typing(t) => Plan::Typing(t.item()),
        Exercise::Flashcard(card) => Plan::Flashcard(card.item()),
        Exercise::Matching(_) => match missed.as_slice() {
            [item] => Plan::meaning_choice(*item),
            _ => Plan::Matching(missed),
        },
    };
    Some(plan)
}

/// Collects the items skipped for missing data.
pub(crate) struct Planner<'a> {
    rng: &'a mut TinyRng,
    warnings: Vec<DataWarning>,
}

impl<'a> Planner<'a> {
    pub fn new(rng: &'a mut TinyRng) -> Self {
        Self {
            rng,
            warnings: Vec::new(),
        }
    }

    pub fn warnings(self) -> Vec<DataWarning> {
        self.warnings
    }

    fn skip(&mut self, item: &VocabItem, field: Field) {
        self.warnings.push(MissingField::of(item, field).into());
    }

    fn has(&mut self, item: &VocabItem, field: Field) -> bool {
        if item.field(field).is_some() {
            true
        } else {
            self.skip(item, field);
            false
        }
    }

    pub fn review(
        &mut self,
        kind: ReviewKind,
        direction: Direction,
        items: &[&VocabItem],
    ) -> Vec<Plan> {
        let choice = |item: &VocabItem, field: ChoiceField| Plan::Choice {
            item: item.id(),
            field,
            direction,
        };
        match kind {
            ReviewKind::Flashcards => items.iter().map(|i| Plan::Flashcard(i.id())).collect(),
            ReviewKind::Meaning => items
                .iter()
                .filter(|i| self.has(i, Field::Meaning))
                .map(|i| choice(*i, ChoiceField::Meaning))
                .collect(),
            ReviewKind::Reading => items
                .iter()
                .filter(|i| self.has(i, Field::Reading))
                .map(|i| choice(*i, ChoiceField::Reading))
                .collect(),
            ReviewKind::Typing => items
                .iter()
                .filter(|i| self.has(i, Field::Reading))
                .map(|i| Plan::Typing(i.id()))
                .collect(),
            ReviewKind::Matching => self.matching(items),
            ReviewKind::Mixed => self.mixed(direction, items),
        }
    }

    fn mixed(&mut self, direction: Direction, items: &[&VocabItem]) -> Vec<Plan> {
        #[derive(Clone, Copy)]
        enum Pick {
            Meaning,
            Reading,
            Typing,
            Matching,
        }

        let has_meaning = |item: &VocabItem| item.field(Field::Meaning).is_some();
        let mut planned = vec![false; items.len()];
        let mut plans = Vec::new();
        for i in 0..items.len() {
            if planned[i] {
                continue;
            }
            let item = items[i];
            let has_reading = item.field(Field::Reading).is_some();
            let mut picks = Vec::with_capacity(4);
            if has_meaning(item) {
                picks.push(Pick::Meaning);
            }
            if has_reading {
                picks.push(Pick::Reading);
                picks.push(Pick::Typing);
            }
            if picks.is_empty() {
                self.skip(item, Field::Meaning);
                continue;
            }
            // Later items with a meaning that can join this item on a board.
            let pairable: Vec<usize> = (i..items.len())
                .filter(|j| !planned[*j] && has_meaning(items[*j]))
                .take(MAX_PAIRS)
                .collect();
            if has_meaning(item) && pairable.len() >= MIN_MIXED_MATCHING {
                picks.push(Pick::Matching);
            }
            let pick = choose(&picks, self.rng).copied().unwrap_or(Pick::Typing);
            let single = |field| Plan::Choice {
                item: item.id(),
                field,
                direction,
            };
            match pick {
                Pick::Meaning => plans.push(single(ChoiceField::Meaning)),
                Pick::Reading => plans.push(single(ChoiceField::Reading)),
                Pick::Typing => plans.push(Plan::Typing(item.id())),
                Pick::Matching => {
                    for j in &pairable {
                        planned[*j] = true;
                    }
                    plans.push(Plan::Matching(
                        pairable.iter().map(|j| items[*j].id()).collect(),
                    ));
                }
            }
            planned[i] = true;
        }
        plans
    }

    /// Batches of up to [`MAX_PAIRS`]; a lone leftover becomes a meaning
    /// question.
    fn matching(&mut self, items: &[&VocabItem]) -> Vec<Plan> {
        let valid: Vec<ItemId> = items
            .iter()
            .filter(|i| self.has(i, Field::Meaning))
            .map(|i| i.id())
            .collect();
        valid
            .chunks(MAX_PAIRS)
            .map(|chunk| match chunk {
                [item] => Plan::meaning_choice(*item),
                _ => Plan::Matching(chunk.to_vec()),
            })
            .collect()
    }

    /// One exercise per item, chosen by its mastery tier.
    pub fn test(&mut self, items: &[&VocabItem]) -> Vec<Plan> {
        let mut plans = Vec::new();
        let mut pooled = Vec::new();
        for item in items {
            match item.tier().gate() {
                Gate::Choice => {
                    let mut fields = Vec::with_capacity(2);
                    if item.field(Field::Meaning).is_some() {
                        fields.push(ChoiceField::Meaning);
                    }
                    if item.field(Field::Reading).is_some() {
                        fields.push(ChoiceField::Reading);
                    }
                    match choose(&fields, self.rng) {
                        Some(field) => plans.push(Plan::Choice {
                            item: item.id(),
                            field: *field,
                            direction: Direction::Forward,
                        }),
                        None => self.skip(item, Field::Meaning),
                    }
                }
                Gate::Matching => pooled.push(*item),
                Gate::Typing => {
                    if self.has(item, Field::Reading) {
                        plans.push(Plan::Typing(item.id()));
                    }
                }
                Gate::Excluded => {}
            }
        }
        plans.extend(self.matching(&pooled));
        plans
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::exercise::tests::sample_deck;
    use crate::exercise::tests::vocab;
    use crate::mastery::MasteryTier;
    use crate::types::item::Progress;

    fn refs(items: &[VocabItem]) -> Vec<&VocabItem> {
        items.iter().collect()
    }

    fn at_tier(item: VocabItem, tier: u8) -> VocabItem {
        item.with_progress(Progress {
            tier: MasteryTier::new(tier).unwrap(),
            ..Progress::default()
        })
    }

    /// Every item appears in exactly one plan.
    fn assert_partition(plans: &[Plan], items: &[VocabItem]) {
        let ids: Vec<ItemId> = plans.iter().flat_map(|p| p.items()).collect();
        let unique: HashSet<ItemId> = ids.iter().copied().collect();
        assert_eq!(ids.len(), unique.len());
        let expected: HashSet<ItemId> = items.iter().map(|i| i.id()).collect();
        assert_eq!(unique, expected);
    }

    #[test]
    fn test_single_kind_review() {
        let deck = sample_deck();
        let mut rng = TinyRng::from_seed(1);
        let mut planner = Planner::new(&mut rng);
        let plans = planner.review(ReviewKind::Reading, Direction::Reverse, &refs(&deck));
        assert_eq!(plans.len(), deck.len());
        assert!(plans.iter().all(|p| matches!(
            p,
            Plan::Choice {
                field: ChoiceField::Reading,
                direction: Direction::Reverse,
                ..
            }
        )));
        assert!(planner.warnings().is_empty());
    }

    #[test]
    fn test_review_skips_items_without_the_field() {
        let deck = vec![
            vocab("猫", Some("ねこ"), Some("cat")),
            vocab("犬", None, Some("dog")),
        ];
        let mut rng = TinyRng::from_seed(1);
        let mut planner = Planner::new(&mut rng);
        let plans = planner.review(ReviewKind::Typing, Direction::Forward, &refs(&deck));
        assert_eq!(plans, vec![Plan::Typing(deck[0].id())]);
        let warnings = planner.warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].item, deck[1].id());
        assert_eq!(warnings[0].missing, Field::Reading);
    }

    #[test]
    fn test_matching_review_chunks() {
        let mut deck = sample_deck();
        deck.push(vocab("牛", Some("うし"), Some("cow")));
        let mut rng = TinyRng::from_seed(1);
        let mut planner = Planner::new(&mut rng);
        let plans = planner.review(ReviewKind::Matching, Direction::Forward, &refs(&deck));
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].items().len(), 6);
        // The seventh item is alone, so it gets a meaning question.
        assert_eq!(plans[1], Plan::meaning_choice(deck[6].id()));
        assert_partition(&plans, &deck);
    }

    #[test]
    fn test_mixed_review_covers_every_item_once() {
        let mut deck = sample_deck();
        for (term, meaning) in [("牛", "cow"), ("羊", "sheep"), ("豚", "pig"), ("虎", "tiger")] {
            deck.push(vocab(term, Some("よみ"), Some(meaning)));
        }
        for seed in 0..50 {
            let mut rng = TinyRng::from_seed(seed);
            let mut planner = Planner::new(&mut rng);
            let plans = planner.review(ReviewKind::Mixed, Direction::Forward, &refs(&deck));
            assert_partition(&plans, &deck);
            for plan in &plans {
                if let Plan::Matching(batch) = plan {
                    assert!((MIN_MIXED_MATCHING..=MAX_PAIRS).contains(&batch.len()));
                }
            }
        }
    }

    #[test]
    fn test_mixed_review_never_batches_fewer_than_four() {
        let deck: Vec<VocabItem> = sample_deck().into_iter().take(3).collect();
        for seed in 0..30 {
            let mut rng = TinyRng::from_seed(seed);
            let mut planner = Planner::new(&mut rng);
            let plans = planner.review(ReviewKind::Mixed, Direction::Forward, &refs(&deck));
            assert_eq!(plans.len(), 3);
            assert!(!plans.iter().any(|p| matches!(p, Plan::Matching(_))));
        }
    }

    #[test]
    fn test_mixed_review_keeps_items_without_a_meaning() {
        let deck = vec![
            vocab("猫", Some("ねこ"), Some("cat")),
            vocab("読", Some("よみ"), None),
            vocab("犬", Some("いぬ"), Some("dog")),
            vocab("鳥", Some("とり"), Some("bird")),
            vocab("牛", Some("うし"), Some("cow")),
        ];
        let reading_only = deck[1].id();
        for seed in 0..100 {
            let mut rng = TinyRng::from_seed(seed);
            let mut planner = Planner::new(&mut rng);
            let plans = planner.review(ReviewKind::Mixed, Direction::Forward, &refs(&deck));
            assert_partition(&plans, &deck);
            assert!(planner.warnings().is_empty());
            for plan in &plans {
                match plan {
                    Plan::Matching(batch) => assert!(!batch.contains(&reading_only)),
                    Plan::Choice {
                        item,
                        field: ChoiceField::Meaning,
                        ..
                    } => assert_ne!(*item, reading_only),
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn test_mixed_review_skips_empty_items() {
        let deck = vec![vocab("猫", None, None)];
        let mut rng = TinyRng::from_seed(1);
        let mut planner = Planner::new(&mut rng);
        let plans = planner.review(ReviewKind::Mixed, Direction::Forward, &refs(&deck));
        assert!(plans.is_empty());
        assert_eq!(planner.warnings().len(), 1);
    }

    #[test]
    fn test_flashcards_need_no_fields() {
        let deck = vec![vocab("猫", None, None)];
        let mut rng = TinyRng::from_seed(1);
        let mut planner = Planner::new(&mut rng);
        let plans = planner.review(ReviewKind::Flashcards, Direction::Forward, &refs(&deck));
        assert_eq!(plans, vec![Plan::Flashcard(deck[0].id())]);
    }

    #[test]
    fn test_mastery_plan_by_tier() {
        let deck = sample_deck();
        let deck: Vec<VocabItem> = vec![
            at_tier(deck[0].clone(), 0),
            at_tier(deck[1].clone(), 1),
            at_tier(deck[2].clone(), 1),
            at_tier(deck[3].clone(), 1),
            at_tier(deck[4].clone(), 2),
        ];
        let mut rng = TinyRng::from_seed(4);
        let mut planner = Planner::new(&mut rng);
        let plans = planner.test(&refs(&deck));
        assert_eq!(plans.len(), 3);
        assert!(matches!(
            plans[0],
            Plan::Choice {
                direction: Direction::Forward,
                ..
            }
        ));
        assert_eq!(plans[1], Plan::Typing(deck[4].id()));
        assert_eq!(
            plans[2],
            Plan::Matching(vec![deck[1].id(), deck[2].id(), deck[3].id()])
        );
    }

    #[test]
    fn test_mastery_lone_matching_item() {
        let deck = vec![at_tier(vocab("猫", Some("ねこ"), Some("cat")), 1)];
        let mut rng = TinyRng::from_seed(4);
        let mut planner = Planner::new(&mut rng);
        assert_eq!(
            planner.test(&refs(&deck)),
            vec![Plan::meaning_choice(deck[0].id())]
        );
    }

    #[test]
    fn test_mastery_choice_uses_available_field() {
        let deck = vec![vocab("猫", Some("ねこ"), None)];
        for seed in 0..10 {
            let mut rng = TinyRng::from_seed(seed);
            let mut planner = Planner::new(&mut rng);
            assert_eq!(
                planner.test(&refs(&deck)),
                vec![Plan::Choice {
                    item: deck[0].id(),
                    field: ChoiceField::Reading,
                    direction: Direction::Forward,
                }]
            );
        }
    }

    #[test]
    fn test_retry_rules() -> Fallible<()> {
        let deck = Deck::new(sample_deck());
        let mut rng = TinyRng::from_seed(2);
        let ids: Vec<ItemId> = deck.items().iter().map(|i| i.id()).collect();

        let choice = Plan::Choice {
            item: ids[0],
            field: ChoiceField::Reading,
            direction: Direction::Reverse,
        };
        let exercise = build(&choice, &deck, &mut rng)?;
        assert_eq!(retry(&exercise, &[Scored::new(ids[0], true)]), None);
        assert_eq!(
            retry(&exercise, &[Scored::new(ids[0], false)]),
            Some(choice)
        );

        let board = build(&Plan::Matching(ids.clone()), &deck, &mut rng)?;
        let mut scored: Vec<Scored> = ids.iter().map(|id| Scored::new(*id, true)).collect();
        scored[1].correct = false;
        assert_eq!(
            retry(&board, &scored),
            Some(Plan::meaning_choice(ids[1]))
        );
        scored[4].correct = false;
        assert_eq!(
            retry(&board, &scored),
            Some(Plan::Matching(vec![ids[1], ids[4]]))
        );
        Ok(())
    }

    #[test]
    fn test_build_unknown_item() {
        let deck = Deck::new(vec![]);
        let mut rng = TinyRng::from_seed(2);
        let plan = Plan::Typing(ItemId::of("猫", None));
        assert!(build(&plan, &deck, &mut rng).is_err());
    }

    #[test]
    fn test_deck_drops_duplicates() {
        let deck = Deck::new(vec![
            vocab("猫", Some("ねこ"), Some("cat")),
            vocab("猫", Some("ねこ"), Some("kitty")),
        ]);
        assert_eq!(deck.items().len(), 1);
        assert_eq!(deck.items()[0].meaning(), Some("cat"));
    }
}
