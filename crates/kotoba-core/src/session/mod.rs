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

//! A study session: a queue of exercises over a working set of items.
//!
//! The queue only grows at the tail and the cursor only moves forward. A
//! wrong answer queues a retry at the tail, so the session ends once every
//! item has been answered correctly at least once, or when it is ended
//! early. Only the first attempt at an item counts towards the score, but
//! every attempt updates its scheduling state and, in a mastery test, its
//! tier.

pub mod plan;
pub mod summary;
pub mod timer;

use std::fmt::Display;
use std::fmt::Formatter;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::error::fail;
use crate::exercise::Direction;
use crate::exercise::Exercise;
use crate::exercise::Response;
use crate::exercise::Scored;
use crate::exercise::Verdict;
use crate::mastery::MasteryTier;
use crate::mastery::TierChange;
use crate::rng::TinyRng;
use crate::rng::shuffle;
use crate::session::plan::Deck;
use crate::session::plan::Plan;
use crate::session::plan::Planner;
use crate::session::plan::build;
use crate::session::plan::retry;
use crate::session::summary::DataWarning;
use crate::session::summary::SessionResult;
use crate::session::summary::SessionSummary;
use crate::session::timer::CHOICE_REVEAL;
use crate::session::timer::MISMATCH_COOLDOWN;
use crate::session::timer::TYPING_REVEAL_CORRECT;
use crate::session::timer::TYPING_REVEAL_WRONG;
use crate::session::timer::Timer;
use crate::session::timer::TimerKind;
use crate::session::timer::TimerSlot;
use crate::session::timer::TimerToken;
use crate::srs::due_date;
use crate::store::Mute;
use crate::store::ProgressSink;
use crate::store::ProgressUpdate;
use crate::store::Speaker;
use crate::types::date::Date;
use crate::types::item::VocabItem;
use crate::types::item_id::ItemId;
use crate::types::timestamp::Timestamp;

/// Default working batch of a mastery test.
pub const DEFAULT_TEST_BATCH: usize = 10;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ReviewKind {
    Flashcards,
    Meaning,
    Reading,
    Typing,
    Matching,
    Mixed,
}

impl ReviewKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewKind::Flashcards => "flashcards",
            ReviewKind::Meaning => "meaning",
            ReviewKind::Reading => "reading",
            ReviewKind::Typing => "typing",
            ReviewKind::Matching => "matching",
            ReviewKind::Mixed => "mixed",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    /// Free review: exercises by kind, scheduling only.
    Review(ReviewKind),
    /// Mastery test: exercises by tier, scheduling and tiers.
    Test,
}

/// Which items a free review draws from.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Scope {
    All,
    /// Items never reviewed or due on or before the date.
    DueBy(Date),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BatchSize {
    Limited(usize),
    All,
}

impl BatchSize {
    fn apply<T>(self, mut items: Vec<T>) -> Vec<T> {
        if let BatchSize::Limited(n) = self {
            items.truncate(n);
        }
        items
    }
}

impl Default for BatchSize {
    fn default() -> Self {
        BatchSize::Limited(DEFAULT_TEST_BATCH)
    }
}

impl FromStr for BatchSize {
    type Err = ErrorReport;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(BatchSize::All);
        }
        match s.parse::<usize>()? {
            0 => fail("batch size must be positive"),
            n => Ok(BatchSize::Limited(n)),
        }
    }
}

impl Display for BatchSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchSize::Limited(n) => write!(f, "{n}"),
            BatchSize::All => write!(f, "all"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SessionConfig {
    pub mode: Mode,
    /// Direction of multiple-choice questions in free review.
    pub direction: Direction,
    pub scope: Scope,
    pub limit: BatchSize,
    /// Fixed seed for a reproducible session.
    pub seed: Option<u64>,
}

impl SessionConfig {
    pub fn review(kind: ReviewKind) -> Self {
        Self {
            mode: Mode::Review(kind),
            direction: Direction::Forward,
            scope: Scope::All,
            limit: BatchSize::All,
            seed: None,
        }
    }

    pub fn test(limit: BatchSize) -> Self {
        Self {
            mode: Mode::Test,
            direction: Direction::Forward,
            scope: Scope::All,
            limit,
            seed: None,
        }
    }

    pub fn with_direction(self, direction: Direction) -> Self {
        Self { direction, ..self }
    }

    pub fn with_scope(self, scope: Scope) -> Self {
        Self { scope, ..self }
    }

    pub fn with_limit(self, limit: BatchSize) -> Self {
        Self { limit, ..self }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..self
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SessionState {
    Initializing,
    Running,
    Finished,
}

/// The answer overlay shown after a question is graded.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Reveal {
    pub item: ItemId,
    pub term: String,
    pub correct: bool,
    pub answer: String,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Feedback {
    Ignored,
    Pending,
    Mismatch,
    Matched(ItemId),
    Graded { correct: bool, retry_queued: bool },
}

struct Queued {
    plan: Plan,
    retry: bool,
}

/// First-attempt bookkeeping for one item.
struct Record {
    item: ItemId,
    correct_on_first_attempt: bool,
    attempts: u32,
    tier_before: Option<MasteryTier>,
}

pub struct Session<P: ProgressSink> {
    config: SessionConfig,
    sink: P,
    speaker: Box<dyn Speaker + Send>,
    rng: TinyRng,
    deck: Deck,
    state: SessionState,
    queue: Vec<Queued>,
    cursor: usize,
    current: Option<Exercise>,
    records: Vec<Record>,
    warnings: Vec<DataWarning>,
    timers: TimerSlot,
    reveal: Option<Reveal>,
    fully_mastered: bool,
}

impl<P: ProgressSink> Session<P> {
    /// `deck` is both the candidate set and the distractor pool.
    pub fn new(deck: Vec<VocabItem>, config: SessionConfig, sink: P) -> Self {
        let rng = match config.seed {
            Some(seed) => TinyRng::from_seed(seed),
            None => TinyRng::from_time(),
        };
        Self {
            config,
            sink,
            speaker: Box::new(Mute),
            rng,
            deck: Deck::new(deck),
            state: SessionState::Initializing,
            queue: Vec::new(),
            cursor: 0,
            current: None,
            records: Vec::new(),
            warnings: Vec::new(),
            timers: TimerSlot::default(),
            reveal: None,
            fully_mastered: false,
        }
    }

    pub fn with_speaker(mut self, speaker: Box<dyn Speaker + Send>) -> Self {
        self.speaker = speaker;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The deck with its current progress.
    pub fn items(&self) -> &[VocabItem] {
        self.deck.items()
    }

    pub fn item(&self, id: ItemId) -> Option<&VocabItem> {
        self.deck.get(id).ok()
    }

    pub fn start(&mut self) -> Fallible<()> {
        if self.state != SessionState::Initializing {
            return fail("the session has already started");
        }
        let candidates: Vec<&VocabItem> = match self.config.mode {
            Mode::Review(_) => self
                .deck
                .items()
                .iter()
                .filter(|item| match self.config.scope {
                    Scope::All => true,
                    Scope::DueBy(date) => item.is_due(date),
                })
                .collect(),
            Mode::Test => self
                .deck
                .items()
                .iter()
                .filter(|item| !item.tier().is_mastered())
                .collect(),
        };
        if self.config.mode == Mode::Test && candidates.is_empty() {
            log::debug!("Every item is mastered, nothing to test");
            self.fully_mastered = true;
            self.state = SessionState::Finished;
            return Ok(());
        }
        let candidates = self.config.limit.apply(shuffle(candidates, &mut self.rng));

        let mut planner = Planner::new(&mut self.rng);
        let plans = match self.config.mode {
            Mode::Review(kind) => planner.review(kind, self.config.direction, &candidates),
            Mode::Test => planner.test(&candidates),
        };
        let warnings = planner.warnings();
        for warning in &warnings {
            log::warn!("{warning}");
        }
        self.warnings = warnings;

        let plans = shuffle(plans, &mut self.rng);
        log::debug!(
            "Starting session with {} exercises over {} items",
            plans.len(),
            candidates.len()
        );
        self.queue = plans
            .into_iter()
            .map(|plan| Queued { plan, retry: false })
            .collect();
        self.state = SessionState::Running;
        self.load_current();
        Ok(())
    }

    /// The exercise awaiting a response.
    pub fn current(&self) -> Option<&Exercise> {
        self.current.as_ref()
    }

    pub fn reveal(&self) -> Option<&Reveal> {
        self.reveal.as_ref()
    }

    /// The live timer. The caller waits `delay`, then calls [`Session::expire`].
    pub fn timer(&self) -> Option<Timer> {
        self.timers.armed()
    }

    /// Exercises done and exercises queued so far.
    pub fn position(&self) -> (usize, usize) {
        (self.cursor, self.queue.len())
    }

    /// Whether the current exercise is a retry.
    pub fn is_retry(&self) -> bool {
        self.queue.get(self.cursor).is_some_and(|q| q.retry)
    }

    pub fn submit(&mut self, response: Response, now: Timestamp) -> Fallible<Feedback> {
        if self.state != SessionState::Running {
            return fail("the session is not running");
        }
        let Some(exercise) = self.current.as_mut() else {
            return fail("there is no exercise to answer");
        };
        let verdict = exercise.respond(response)?;
        if verdict != Verdict::Ignored {
            self.dismiss_reveal();
        }
        let matched = match &self.current {
            Some(Exercise::Matching(board))
                if matches!(verdict, Verdict::Matched(_) | Verdict::Complete(_)) =>
            {
                board.last_match()
            }
            _ => None,
        };
        if let Some(item) = matched {
            self.speak(item);
        }
        match verdict {
            Verdict::Ignored => Ok(Feedback::Ignored),
            Verdict::Pending => Ok(Feedback::Pending),
            Verdict::Mismatch => {
                self.timers.arm(TimerKind::Cooldown, MISMATCH_COOLDOWN);
                Ok(Feedback::Mismatch)
            }
            Verdict::Matched(item) => Ok(Feedback::Matched(item)),
            Verdict::Complete(scored) => self.complete(scored, now),
        }
    }

    /// Fires a timer. Returns false for a token that is no longer live.
    pub fn expire(&mut self, token: TimerToken) -> bool {
        let Some(timer) = self.timers.fire(token) else {
            return false;
        };
        match timer.kind {
            TimerKind::Reveal => self.reveal = None,
            TimerKind::Cooldown => {
                if let Some(Exercise::Matching(board)) = self.current.as_mut() {
                    board.clear_selection();
                }
            }
        }
        true
    }

    /// Stops the session. Items never attempted are left out of the summary.
    pub fn end(&mut self) {
        if self.state == SessionState::Finished {
            return;
        }
        log::debug!("Session ended at exercise {} of {}", self.cursor, self.queue.len());
        self.timers.cancel();
        self.reveal = None;
        self.current = None;
        self.state = SessionState::Finished;
    }

    /// Available once the session is finished.
    pub fn summary(&self) -> Option<SessionSummary> {
        if self.state != SessionState::Finished {
            return None;
        }
        let results = self
            .records
            .iter()
            .filter_map(|record| {
                let item = self.deck.get(record.item).ok()?;
                Some(SessionResult {
                    item: item.clone(),
                    correct_on_first_attempt: record.correct_on_first_attempt,
                    attempts: record.attempts,
                    tier: record.tier_before.map(|before| TierChange {
                        before,
                        after: item.tier(),
                    }),
                })
            })
            .collect();
        Some(SessionSummary {
            results,
            warnings: self.warnings.clone(),
            fully_mastered: self.fully_mastered,
        })
    }

    fn complete(&mut self, scored: Vec<Scored>, now: Timestamp) -> Fallible<Feedback> {
        let is_retry = self.is_retry();
        let Some(exercise) = self.current.take() else {
            return fail("there is no exercise to complete");
        };
        for s in &scored {
            self.score(*s, is_retry, now);
        }
        let correct = scored.iter().all(|s| s.correct);

        let retry = retry(&exercise, &scored);
        let retry_queued = retry.is_some();
        if let Some(plan) = retry {
            self.queue.push(Queued { plan, retry: true });
        }

        self.timers.cancel();
        match &exercise {
            Exercise::Choice(mc) => {
                self.show(mc.item(), correct, mc.answer().to_string(), CHOICE_REVEAL);
            }
            Exercise::Typing(t) => {
                let delay = if correct {
                    TYPING_REVEAL_CORRECT
                } else {
                    TYPING_REVEAL_WRONG
                };
                self.show(t.item(), correct, t.expected().to_string(), delay);
            }
            Exercise::Flashcard(card) => {
                if correct {
                    self.speak(card.item());
                }
            }
            Exercise::Matching(_) => {}
        }

        self.cursor += 1;
        self.load_current();
        Ok(Feedback::Graded {
            correct,
            retry_queued,
        })
    }

    /// Applies one graded attempt to an item and hands the changes to the
    /// sink.
    fn score(&mut self, scored: Scored, is_retry: bool, now: Timestamp) {
        let test = self.config.mode == Mode::Test;
        let today = now.date();
        let item = match self.deck.get_mut(scored.item) {
            Ok(item) => item,
            Err(e) => {
                log::warn!("Cannot score item: {e}");
                return;
            }
        };
        let tier_before = item.tier();
        let state = item.review(scored.grade, today);
        let change = test.then(|| item.record_mastery(scored.correct));

        self.save(
            scored.item,
            ProgressUpdate::Srs {
                state,
                due: due_date(state, today),
                reviewed_at: now,
                grade: scored.grade,
            },
        );
        if let Some(change) = change {
            self.save(scored.item, ProgressUpdate::Mastery { tier: change.after });
        }

        match self.records.iter_mut().find(|r| r.item == scored.item) {
            Some(record) => record.attempts += 1,
            None if !is_retry => self.records.push(Record {
                item: scored.item,
                correct_on_first_attempt: scored.correct,
                attempts: 1,
                tier_before: test.then_some(tier_before),
            }),
            None => log::debug!("Retry of {} has no first attempt", scored.item),
        }
    }

    fn save(&self, item: ItemId, update: ProgressUpdate) {
        if let Err(e) = self.sink.save_progress(item, &update) {
            log::warn!("Failed to save progress for {item}: {e}");
        }
    }

    fn speak(&self, item: ItemId) {
        if let Ok(item) = self.deck.get(item) {
            self.speaker.speak(item.term());
        }
    }

    fn show(&mut self, item: ItemId, correct: bool, answer: String, delay: Duration) {
        let term = match self.deck.get(item) {
            Ok(item) => item.term().to_string(),
            Err(_) => return,
        };
        self.speaker.speak(&term);
        self.timers.arm(TimerKind::Reveal, delay);
        self.reveal = Some(Reveal {
            item,
            term,
            correct,
            answer,
        });
    }

    fn dismiss_reveal(&mut self) {
        if self.reveal.take().is_some()
            && self
                .timers
                .armed()
                .is_some_and(|t| t.kind == TimerKind::Reveal)
        {
            self.timers.cancel();
        }
    }

    /// Builds the exercise at the cursor, skipping any that cannot be built.
    fn load_current(&mut self) {
        while let Some(queued) = self.queue.get(self.cursor) {
            match build(&queued.plan, &self.deck, &mut self.rng) {
                Ok(exercise) => {
                    self.current = Some(exercise);
                    return;
                }
                Err(e) => {
                    log::warn!("Skipping exercise: {e}");
                    self.cursor += 1;
                }
            }
        }
        self.current = None;
        self.state = SessionState::Finished;
        log::debug!("Session finished after {} exercises", self.cursor);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::Mutex;

    use super::*;
    use crate::exercise::ChoiceField;
    use crate::exercise::choice::ChoiceOption;
    use crate::exercise::matching::MatchingBoard;
    use crate::exercise::matching::Side;
    use crate::exercise::tests::sample_deck;
    use crate::exercise::tests::vocab;
    use crate::exercise::typing::TypedInput;
    use crate::srs::Grade;
    use crate::store::ItemStore;
    use crate::store::MemoryStore;
    use crate::types::item::Progress;

    fn now() -> Timestamp {
        Timestamp::try_from("2024-06-01T09:00:00.000".to_string()).unwrap()
    }

    fn tile_index(board: &MatchingBoard, side: Side, text: &str) -> usize {
        board
            .tiles()
            .iter()
            .position(|t| t.side() == side && t.text() == text)
            .unwrap()
    }

    fn correct_responses<P: ProgressSink>(session: &Session<P>) -> Vec<Response> {
        match session.current().unwrap() {
            Exercise::Choice(mc) => {
                let answer = ChoiceOption::Text(mc.answer().to_string());
                let index = mc.options().iter().position(|o| *o == answer).unwrap();
                vec![Response::Choose(index)]
            }
            Exercise::Typing(t) => vec![Response::Type(TypedInput::Committed(
                t.expected().to_string(),
            ))],
            Exercise::Flashcard(_) => vec![Response::Grade(Grade::Good)],
            Exercise::Matching(board) => board
                .items()
                .iter()
                .flat_map(|id| {
                    let item = session.item(*id).unwrap();
                    [
                        Response::Pick(tile_index(board, Side::Term, item.term())),
                        Response::Pick(tile_index(board, Side::Meaning, item.meaning().unwrap())),
                    ]
                })
                .collect(),
        }
    }

    fn answer_correctly<P: ProgressSink>(session: &mut Session<P>) -> Fallible<Feedback> {
        let mut last = Feedback::Ignored;
        for response in correct_responses(session) {
            last = session.submit(response, now())?;
        }
        Ok(last)
    }

    /// A wrong answer to a single-item exercise.
    fn wrong_response<P: ProgressSink>(session: &Session<P>) -> Response {
        match session.current().unwrap() {
            Exercise::Choice(mc) => {
                let index = mc
                    .options()
                    .iter()
                    .position(|o| matches!(o, ChoiceOption::Text(t) if t != mc.answer()))
                    .unwrap();
                Response::Choose(index)
            }
            Exercise::Typing(_) => Response::Type(TypedInput::Committed("まちがい".to_string())),
            Exercise::Flashcard(_) => Response::Grade(Grade::Again),
            Exercise::Matching(_) => panic!("no single wrong answer for a board"),
        }
    }

    fn run_to_end<P: ProgressSink>(session: &mut Session<P>) -> Fallible<()> {
        while session.state() == SessionState::Running {
            answer_correctly(session)?;
        }
        Ok(())
    }

    fn at_tier(item: VocabItem, tier: u8) -> VocabItem {
        item.with_progress(Progress {
            tier: MasteryTier::new(tier).unwrap(),
            ..Progress::default()
        })
    }

    struct FailingSink;

    impl ProgressSink for FailingSink {
        fn save_progress(&self, _item: ItemId, _update: &ProgressUpdate) -> Fallible<()> {
            fail("disk full")
        }
    }

    #[derive(Clone, Default)]
    struct Recorder {
        spoken: Arc<Mutex<Vec<String>>>,
    }

    impl Speaker for Recorder {
        fn speak(&self, text: &str) {
            self.spoken.lock().unwrap().push(text.to_string());
        }
    }

    #[test]
    fn test_mastery_test_all_correct() -> Fallible<()> {
        let deck: Vec<VocabItem> = sample_deck().into_iter().take(5).collect();
        let store = MemoryStore::new(deck.clone());
        let config = SessionConfig::test(BatchSize::default()).with_seed(7);
        let mut session = Session::new(deck.clone(), config, &store);
        session.start()?;
        assert_eq!(session.position(), (0, 5));
        run_to_end(&mut session)?;

        let summary = session.summary().unwrap();
        assert_eq!(summary.total(), 5);
        assert_eq!(summary.correct(), 5);
        assert_eq!(summary.percentage(), 100);
        assert_eq!(summary.promotions(), 5);
        for result in &summary.results {
            assert!(result.correct_on_first_attempt);
            assert_eq!(result.attempts, 1);
            assert_eq!(result.item.tier().value(), 1);
            assert_eq!(
                result.tier,
                Some(TierChange {
                    before: MasteryTier::NEW,
                    after: MasteryTier::NEW.promote(),
                })
            );
        }
        // One scheduling write and one tier write per item.
        assert_eq!(store.writes().len(), 10);
        for item in store.load_items(None)? {
            assert_eq!(item.tier().value(), 1);
            assert_eq!(item.srs().interval, 1);
        }
        Ok(())
    }

    #[test]
    fn test_mixed_review_with_one_wrong_typed_answer() -> Fallible<()> {
        let deck: Vec<VocabItem> = sample_deck().into_iter().take(3).collect();
        for seed in 0..20 {
            let config = SessionConfig::review(ReviewKind::Mixed).with_seed(seed);
            let mut session = Session::new(deck.clone(), config, MemoryStore::new(deck.clone()));
            session.start()?;
            let (_, planned) = session.position();
            if !session.queue.iter().any(|q| matches!(q.plan, Plan::Typing(_))) {
                continue;
            }
            let mut missed = None;
            while session.state() == SessionState::Running {
                let typing = matches!(session.current(), Some(Exercise::Typing(_)));
                if typing && missed.is_none() {
                    let item = session.current().unwrap().items()[0];
                    let feedback = session.submit(wrong_response(&session), now())?;
                    assert_eq!(
                        feedback,
                        Feedback::Graded {
                            correct: false,
                            retry_queued: true,
                        }
                    );
                    assert_eq!(session.position().1, planned + 1);
                    missed = Some(item);
                } else {
                    answer_correctly(&mut session)?;
                }
            }
            let missed = missed.unwrap();
            let summary = session.summary().unwrap();
            assert_eq!(summary.total(), 3);
            let result: Vec<&SessionResult> = summary
                .results
                .iter()
                .filter(|r| r.item.id() == missed)
                .collect();
            assert_eq!(result.len(), 1);
            assert!(!result[0].correct_on_first_attempt);
            assert_eq!(result[0].attempts, 2);
            assert_eq!(result[0].tier, None);
            assert_eq!(summary.correct(), 2);
            return Ok(());
        }
        panic!("no seed produced a typing exercise");
    }

    #[test]
    fn test_matching_batch_with_one_wrong_pick() -> Fallible<()> {
        let deck = sample_deck();
        let config = SessionConfig::review(ReviewKind::Matching).with_seed(3);
        let mut session = Session::new(deck.clone(), config, MemoryStore::new(deck.clone()));
        session.start()?;
        assert_eq!(session.position(), (0, 1));

        let Some(Exercise::Matching(board)) = session.current() else {
            panic!("expected a matching board");
        };
        let cat = tile_index(board, Side::Term, "猫");
        let dog = tile_index(board, Side::Meaning, "dog");
        let bird = tile_index(board, Side::Term, "鳥");
        assert_eq!(session.submit(Response::Pick(cat), now())?, Feedback::Pending);
        assert_eq!(session.submit(Response::Pick(dog), now())?, Feedback::Mismatch);
        let timer = session.timer().unwrap();
        assert_eq!(timer.kind, TimerKind::Cooldown);
        assert_eq!(timer.delay, MISMATCH_COOLDOWN);
        assert_eq!(session.submit(Response::Pick(bird), now())?, Feedback::Ignored);
        assert!(session.expire(timer.token));

        let feedback = answer_correctly(&mut session)?;
        assert_eq!(
            feedback,
            Feedback::Graded {
                correct: false,
                retry_queued: true,
            }
        );
        assert_eq!(session.position(), (1, 2));
        let Some(Exercise::Matching(retry)) = session.current() else {
            panic!("expected a retry board");
        };
        let retried: HashSet<ItemId> = retry.items().iter().copied().collect();
        assert_eq!(retried, HashSet::from([deck[1].id(), deck[2].id()]));
        assert!(session.is_retry());

        run_to_end(&mut session)?;
        let summary = session.summary().unwrap();
        assert_eq!(summary.total(), 6);
        assert_eq!(summary.correct(), 4);
        for result in &summary.results {
            let missed = result.item.id() == deck[1].id() || result.item.id() == deck[2].id();
            assert_eq!(result.correct_on_first_attempt, !missed);
            assert_eq!(result.attempts, if missed { 2 } else { 1 });
        }
        Ok(())
    }

    #[test]
    fn test_two_item_board_retries_as_a_board() -> Fallible<()> {
        let deck: Vec<VocabItem> = sample_deck().into_iter().take(2).collect();
        let config = SessionConfig::review(ReviewKind::Matching).with_seed(3);
        let mut session = Session::new(deck.clone(), config, MemoryStore::new(deck.clone()));
        session.start()?;
        let Some(Exercise::Matching(board)) = session.current() else {
            panic!("expected a matching board");
        };
        // A wrong pick within a two-item board marks both items.
        let a = tile_index(board, Side::Term, deck[0].term());
        let b = tile_index(board, Side::Term, deck[1].term());
        session.submit(Response::Pick(a), now())?;
        session.submit(Response::Pick(b), now())?;
        let token = session.timer().unwrap().token;
        session.expire(token);
        answer_correctly(&mut session)?;
        let Some(Exercise::Matching(retry)) = session.current() else {
            panic!("expected a retry board");
        };
        assert_eq!(retry.items().len(), 2);
        Ok(())
    }

    #[test]
    fn test_retry_completeness() -> Fallible<()> {
        let mut deck = sample_deck();
        for (term, meaning) in [("牛", "cow"), ("羊", "sheep"), ("豚", "pig")] {
            deck.push(vocab(term, Some("よみ"), Some(meaning)));
        }
        for seed in 0..10 {
            let config = SessionConfig::review(ReviewKind::Mixed).with_seed(seed);
            let mut session = Session::new(deck.clone(), config, MemoryStore::new(deck.clone()));
            session.start()?;
            while session.state() == SessionState::Running {
                let board = matches!(session.current(), Some(Exercise::Matching(_)));
                if board || session.is_retry() {
                    answer_correctly(&mut session)?;
                } else {
                    session.submit(wrong_response(&session), now())?;
                }
            }
            let summary = session.summary().unwrap();
            let ids: Vec<ItemId> = summary.results.iter().map(|r| r.item.id()).collect();
            let unique: HashSet<ItemId> = ids.iter().copied().collect();
            assert_eq!(ids.len(), deck.len());
            assert_eq!(unique.len(), deck.len());
        }
        Ok(())
    }

    #[test]
    fn test_fully_mastered() -> Fallible<()> {
        let deck: Vec<VocabItem> = sample_deck().into_iter().map(|i| at_tier(i, 3)).collect();
        let mut session = Session::new(deck, SessionConfig::test(BatchSize::All), MemoryStore::default());
        session.start()?;
        assert_eq!(session.state(), SessionState::Finished);
        let summary = session.summary().unwrap();
        assert!(summary.fully_mastered);
        assert!(summary.results.is_empty());
        Ok(())
    }

    #[test]
    fn test_mastery_batch_is_bounded_and_skips_mastered() -> Fallible<()> {
        let mut deck = sample_deck();
        deck[0] = at_tier(deck[0].clone(), 3);
        let config = SessionConfig::test(BatchSize::Limited(2)).with_seed(1);
        let mut session = Session::new(deck.clone(), config, MemoryStore::new(deck.clone()));
        session.start()?;
        run_to_end(&mut session)?;
        let summary = session.summary().unwrap();
        assert_eq!(summary.total(), 2);
        assert!(summary.results.iter().all(|r| r.item.id() != deck[0].id()));
        Ok(())
    }

    #[test]
    fn test_wrong_answer_demotes_each_attempt() -> Fallible<()> {
        let deck = vec![at_tier(vocab("猫", Some("ねこ"), Some("cat")), 2)];
        let config = SessionConfig::test(BatchSize::All).with_seed(1);
        let mut session = Session::new(deck.clone(), config, MemoryStore::new(deck));
        session.start()?;
        assert!(matches!(session.current(), Some(Exercise::Typing(_))));
        session.submit(wrong_response(&session), now())?;
        // Demoted to tier 1, yet the retry keeps its exercise type.
        assert!(matches!(session.current(), Some(Exercise::Typing(_))));
        answer_correctly(&mut session)?;
        let summary = session.summary().unwrap();
        let result = &summary.results[0];
        assert_eq!(result.item.tier().value(), 2);
        assert_eq!(result.attempts, 2);
        assert!(!result.correct_on_first_attempt);
        assert!(!result.tier.unwrap().is_promotion());
        Ok(())
    }

    #[test]
    fn test_free_review_leaves_tiers_alone() -> Fallible<()> {
        let deck = sample_deck();
        let store = MemoryStore::new(deck.clone());
        let config = SessionConfig::review(ReviewKind::Meaning).with_seed(9);
        let mut session = Session::new(deck, config, &store);
        session.start()?;
        run_to_end(&mut session)?;
        let summary = session.summary().unwrap();
        assert!(summary.results.iter().all(|r| r.tier.is_none()));
        assert!(summary.results.iter().all(|r| r.item.tier() == MasteryTier::NEW));
        assert!(
            store
                .writes()
                .iter()
                .all(|(_, u)| matches!(u, ProgressUpdate::Srs { .. }))
        );
        Ok(())
    }

    #[test]
    fn test_due_scope() -> Fallible<()> {
        let today = now().date();
        let mut deck = sample_deck();
        deck[0] = deck[0].clone().with_progress(Progress {
            due: Some(today.add_days(3)),
            ..Progress::default()
        });
        deck[1] = deck[1].clone().with_progress(Progress {
            due: Some(today),
            ..Progress::default()
        });
        let config = SessionConfig::review(ReviewKind::Flashcards)
            .with_scope(Scope::DueBy(today))
            .with_seed(1);
        let mut session = Session::new(deck.clone(), config, MemoryStore::new(deck.clone()));
        session.start()?;
        assert_eq!(session.position(), (0, 5));
        run_to_end(&mut session)?;
        let summary = session.summary().unwrap();
        assert!(summary.results.iter().all(|r| r.item.id() != deck[0].id()));
        Ok(())
    }

    #[test]
    fn test_limit() -> Fallible<()> {
        let deck = sample_deck();
        let config = SessionConfig::review(ReviewKind::Typing)
            .with_limit(BatchSize::Limited(3))
            .with_seed(1);
        let mut session = Session::new(deck.clone(), config, MemoryStore::new(deck));
        session.start()?;
        assert_eq!(session.position(), (0, 3));
        Ok(())
    }

    #[test]
    fn test_reveal_timers() -> Fallible<()> {
        let deck = sample_deck();
        let config = SessionConfig::review(ReviewKind::Typing).with_seed(5);
        let mut session = Session::new(deck.clone(), config, MemoryStore::new(deck));
        session.start()?;

        let expected = match session.current() {
            Some(Exercise::Typing(t)) => t.expected().to_string(),
            _ => panic!("expected typing"),
        };
        session.submit(wrong_response(&session), now())?;
        let reveal = session.reveal().unwrap().clone();
        assert!(!reveal.correct);
        assert_eq!(reveal.answer, expected);
        let first = session.timer().unwrap();
        assert_eq!(first.kind, TimerKind::Reveal);
        assert_eq!(first.delay, TYPING_REVEAL_WRONG);

        answer_correctly(&mut session)?;
        let second = session.timer().unwrap();
        assert_eq!(second.delay, TYPING_REVEAL_CORRECT);
        assert!(session.reveal().unwrap().correct);
        // The first overlay was replaced, so its token is stale.
        assert!(!session.expire(first.token));
        assert!(session.expire(second.token));
        assert_eq!(session.reveal(), None);
        assert!(!session.expire(second.token));
        Ok(())
    }

    #[test]
    fn test_choice_reveal_delay() -> Fallible<()> {
        let deck = sample_deck();
        let config = SessionConfig::review(ReviewKind::Reading).with_seed(5);
        let mut session = Session::new(deck.clone(), config, MemoryStore::new(deck));
        session.start()?;
        answer_correctly(&mut session)?;
        assert_eq!(session.timer().unwrap().delay, CHOICE_REVEAL);
        Ok(())
    }

    #[test]
    fn test_end_cancels_timers() -> Fallible<()> {
        let deck = sample_deck();
        let config = SessionConfig::review(ReviewKind::Meaning).with_seed(5);
        let mut session = Session::new(deck.clone(), config, MemoryStore::new(deck));
        session.start()?;
        answer_correctly(&mut session)?;
        session.submit(wrong_response(&session), now())?;
        let token = session.timer().unwrap().token;
        session.end();
        assert_eq!(session.state(), SessionState::Finished);
        assert!(!session.expire(token));
        assert!(session.submit(Response::Choose(0), now()).is_err());
        // Only the two attempted items are reported.
        let summary = session.summary().unwrap();
        assert_eq!(summary.total(), 2);
        assert_eq!(summary.correct(), 1);
        assert_eq!(summary.percentage(), 50);
        Ok(())
    }

    #[test]
    fn test_invalid_calls_leave_state_unchanged() -> Fallible<()> {
        let deck = sample_deck();
        let config = SessionConfig::review(ReviewKind::Typing).with_seed(5);
        let mut session = Session::new(deck.clone(), config, MemoryStore::new(deck));
        assert!(session.submit(Response::Reveal, now()).is_err());
        assert!(session.summary().is_none());
        session.start()?;
        assert!(session.start().is_err());
        assert!(session.submit(Response::Choose(0), now()).is_err());
        assert!(session.submit(Response::Reveal, now()).is_err());
        let composing = Response::Type(TypedInput::Composing("ね".to_string()));
        assert_eq!(session.submit(composing, now())?, Feedback::Ignored);
        assert_eq!(session.position(), (0, 6));
        assert!(session.summary().is_none());
        Ok(())
    }

    #[test]
    fn test_persistence_failure_does_not_stop_the_session() -> Fallible<()> {
        let deck = sample_deck();
        let config = SessionConfig::test(BatchSize::All).with_seed(2);
        let mut session = Session::new(deck, config, FailingSink);
        session.start()?;
        run_to_end(&mut session)?;
        let summary = session.summary().unwrap();
        assert_eq!(summary.total(), 6);
        for item in session.items() {
            assert_eq!(item.srs().interval, 1);
            assert_eq!(item.tier().value(), 1);
        }
        Ok(())
    }

    #[test]
    fn test_flashcard_grades_pass_through() -> Fallible<()> {
        let deck = vec![vocab("猫", Some("ねこ"), Some("cat"))];
        let store = MemoryStore::new(deck.clone());
        let config = SessionConfig::review(ReviewKind::Flashcards).with_seed(5);
        let mut session = Session::new(deck, config, &store);
        session.start()?;
        assert_eq!(session.submit(Response::Reveal, now())?, Feedback::Pending);
        session.submit(Response::Grade(Grade::Hard), now())?;
        assert_eq!(session.state(), SessionState::Finished);
        let writes = store.writes();
        assert!(matches!(
            writes[0].1,
            ProgressUpdate::Srs {
                grade: Grade::Hard,
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn test_speaker() -> Fallible<()> {
        let deck: Vec<VocabItem> = sample_deck().into_iter().take(2).collect();
        let recorder = Recorder::default();
        let config = SessionConfig::review(ReviewKind::Meaning).with_seed(5);
        let mut session = Session::new(deck.clone(), config, MemoryStore::new(deck))
            .with_speaker(Box::new(recorder.clone()));
        session.start()?;
        let first = session.current().unwrap().items()[0];
        session.submit(wrong_response(&session), now())?;
        let term = session.item(first).unwrap().term().to_string();
        assert_eq!(*recorder.spoken.lock().unwrap(), vec![term.clone()]);
        answer_correctly(&mut session)?;
        assert_eq!(recorder.spoken.lock().unwrap().len(), 2);
        Ok(())
    }

    #[test]
    fn test_malformed_items_become_warnings() -> Fallible<()> {
        let mut deck = sample_deck();
        deck.push(vocab("謎", None, None));
        let config = SessionConfig::review(ReviewKind::Mixed).with_seed(5);
        let mut session = Session::new(deck.clone(), config, MemoryStore::new(deck.clone()));
        session.start()?;
        run_to_end(&mut session)?;
        let summary = session.summary().unwrap();
        assert_eq!(summary.total(), 6);
        assert_eq!(summary.warnings.len(), 1);
        assert_eq!(summary.warnings[0].term, "謎");
        Ok(())
    }

    #[test]
    fn test_reverse_direction() -> Fallible<()> {
        let deck = sample_deck();
        let config = SessionConfig::review(ReviewKind::Meaning)
            .with_direction(Direction::Reverse)
            .with_seed(5);
        let mut session = Session::new(deck.clone(), config, MemoryStore::new(deck));
        session.start()?;
        let Some(Exercise::Choice(mc)) = session.current() else {
            panic!("expected a choice");
        };
        assert_eq!(mc.field(), ChoiceField::Meaning);
        assert_eq!(mc.direction(), Direction::Reverse);
        Ok(())
    }

    #[test]
    fn test_empty_deck_finishes_at_once() -> Fallible<()> {
        let config = SessionConfig::review(ReviewKind::Mixed);
        let mut session = Session::new(vec![], config, MemoryStore::default());
        session.start()?;
        assert_eq!(session.state(), SessionState::Finished);
        assert!(!session.summary().unwrap().fully_mastered);
        Ok(())
    }

    #[test]
    fn test_batch_size() -> Fallible<()> {
        assert_eq!("all".parse::<BatchSize>()?, BatchSize::All);
        assert_eq!("ALL".parse::<BatchSize>()?, BatchSize::All);
        assert_eq!("25".parse::<BatchSize>()?, BatchSize::Limited(25));
        assert!("0".parse::<BatchSize>().is_err());
        assert!("some".parse::<BatchSize>().is_err());
        assert_eq!(BatchSize::default().to_string(), "10");
        Ok(())
    }
}
