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

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use kotoba_core::error::Fallible;
use kotoba_core::error::fail;
use kotoba_core::exercise::Exercise;
use kotoba_core::exercise::choice::ChoiceOption;
use kotoba_core::exercise::choice::MultipleChoice;
use kotoba_core::exercise::flashcard::Flashcard;
use kotoba_core::exercise::matching::MatchingBoard;
use kotoba_core::exercise::matching::Side;
use kotoba_core::exercise::typing::TypedRecall;
use kotoba_core::session::Mode;
use kotoba_core::session::Reveal;
use kotoba_core::session::Session;
use kotoba_core::session::summary::SessionSummary;
use kotoba_core::srs::Grade;
use kotoba_core::store::ProgressSink;
use maud::Markup;
use maud::html;

use crate::cmd::drill::state::ServerState;
use crate::cmd::drill::template::page_template;

pub async fn get_handler(State(state): State<ServerState>) -> (StatusCode, Html<String>) {
    match render_page(&state) {
        Ok(page) => (StatusCode::OK, Html(page.into_string())),
        Err(e) => error_page(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

pub fn error_page(status: StatusCode, message: &str) -> (StatusCode, Html<String>) {
    let body = html! {
        div.error {
            p { (message) }
            a href="/" { "Back" }
        }
    };
    (status, Html(page_template(body).into_string()))
}

pub fn render_page(state: &ServerState) -> Fallible<Markup> {
    let Ok(session) = state.session.lock() else {
        return fail("session lock poisoned");
    };
    let phrases = state.voice.take();
    Ok(page_template(render_session(&session, &phrases)?))
}

pub fn render_session<P: ProgressSink>(
    session: &Session<P>,
    phrases: &[String],
) -> Fallible<Markup> {
    let speech = if phrases.is_empty() {
        None
    } else {
        Some(serde_json::to_string(phrases)?)
    };
    let main = match (session.summary(), session.current()) {
        (Some(summary), _) => render_summary(&summary),
        (None, Some(exercise)) => render_exercise(exercise),
        (None, None) => html! { p { "Loading..." } },
    };
    let mode = match session.config().mode {
        Mode::Review(kind) => kind.as_str(),
        Mode::Test => "test",
    };
    let (done, queued) = session.position();
    let html = html! {
        div.root {
            @if let Some(speech) = speech {
                div #speech data-phrases=(speech) {}
            }
            @if let Some(timer) = session.timer() {
                div #timer
                    data-token=(timer.token.value())
                    data-delay=(timer.delay.as_millis() as u64) {}
            }
            @if session.summary().is_none() {
                div.header {
                    span.mode { (mode) }
                    span.progress { (done) " / " (queued) }
                    @if session.is_retry() {
                        span.retry { "retry" }
                    }
                    form.end method="post" {
                        input type="hidden" name="action" value="End";
                        input #end type="submit" value="End" title="End the session";
                    }
                }
            }
            @if let Some(reveal) = session.reveal() {
                (render_reveal(reveal))
            }
            (main)
        }
    };
    Ok(html)
}

fn render_reveal(reveal: &Reveal) -> Markup {
    let class = if reveal.correct { "reveal correct" } else { "reveal incorrect" };
    html! {
        div class=(class) {
            span.term { (reveal.term) }
            span.answer { (reveal.answer) }
        }
    }
}

fn render_exercise(exercise: &Exercise) -> Markup {
    match exercise {
        Exercise::Choice(question) => render_choice(question),
        Exercise::Typing(question) => render_typing(question),
        Exercise::Matching(board) => render_matching(board),
        Exercise::Flashcard(card) => render_flashcard(card),
    }
}

fn render_choice(question: &MultipleChoice) -> Markup {
    html! {
        div.exercise.choice {
            p.instruction { "Pick the " (question.asks_for().to_string()) }
            div.prompt { (question.prompt()) }
            form.options method="post" {
                input type="hidden" name="action" value="Choose";
                @for (index, option) in question.options().iter().enumerate() {
                    @match option {
                        ChoiceOption::Text(text) => {
                            button.option type="submit" name="index" value=(index) { (text) }
                        }
                        ChoiceOption::Placeholder => {
                            button.option.placeholder type="button" disabled { "-" }
                        }
                    }
                }
            }
        }
    }
}

fn render_typing(question: &TypedRecall) -> Markup {
    html! {
        div.exercise.typing {
            p.instruction { "Type the reading" }
            div.prompt { (question.term()) }
            @if let Some(hint) = question.hint() {
                p.hint { (hint) }
            }
            form #typing method="post" autocomplete="off" {
                input type="hidden" name="action" value="Type";
                input #answer type="text" name="text" autofocus;
                input type="submit" value="Check";
            }
        }
    }
}

fn render_matching(board: &MatchingBoard) -> Markup {
    html! {
        div.exercise.matching {
            p.instruction { "Match each word to its meaning" }
            form.tiles method="post" {
                input type="hidden" name="action" value="Pick";
                @for (index, tile) in board.tiles().iter().enumerate() {
                    button
                        class=(tile_class(board, index))
                        type="submit"
                        name="index"
                        value=(index)
                        disabled[tile.is_matched()] {
                        (tile.text())
                    }
                }
            }
        }
    }
}

fn tile_class(board: &MatchingBoard, index: usize) -> String {
    let mut class = String::from("tile");
    if let Some(tile) = board.tiles().get(index) {
        class.push_str(match tile.side() {
            Side::Term => " term",
            Side::Meaning => " meaning",
        });
        if tile.is_matched() {
            class.push_str(" matched");
        } else if board.is_mistaken(index) {
            class.push_str(" missed");
        }
    }
    if board.is_selected(index) {
        class.push_str(if board.is_cooling() { " wrong" } else { " selected" });
    }
    class
}

fn render_flashcard(card: &Flashcard) -> Markup {
    html! {
        div.exercise.flashcard {
            div.prompt { (card.term()) }
            @if card.is_revealed() {
                div.back {
                    @if let Some(reading) = card.reading() {
                        p.reading { (reading) }
                    }
                    @if let Some(meaning) = card.meaning() {
                        @for line in meaning.lines() {
                            p.meaning { (line) }
                        }
                    }
                    @if !card.examples().is_empty() {
                        ul.examples {
                            @for example in card.examples() {
                                li {
                                    span.sentence { (example.sentence) }
                                    @if let Some(translation) = &example.translation {
                                        span.translation { (translation) }
                                    }
                                }
                            }
                        }
                    }
                }
                form.grades method="post" {
                    input type="hidden" name="action" value="Grade";
                    @for (grade, days) in Grade::ALL.iter().zip(card.intervals()) {
                        button.grade type="submit" name="grade" value=(grade.as_str()) {
                            (grade.as_str()) " (" (days) "d)"
                        }
                    }
                }
            } @else {
                form method="post" {
                    input type="hidden" name="action" value="Reveal";
                    input #reveal type="submit" value="Reveal";
                }
            }
        }
    }
}

fn render_summary(summary: &SessionSummary) -> Markup {
    html! {
        div.summary {
            h1 { "Session Completed" }
            @if summary.fully_mastered {
                p { "Every word is mastered." }
            } @else {
                p.score {
                    (summary.correct()) " / " (summary.total())
                    " correct on the first try (" (summary.percentage()) "%)"
                }
                @if summary.promotions() > 0 {
                    p.promotions { (summary.promotions()) " words moved up a tier." }
                }
                @if !summary.results.is_empty() {
                    table.results {
                        tr {
                            th { "Word" }
                            th { "Meaning" }
                            th { "Attempts" }
                            th { "Tier" }
                        }
                        @for result in &summary.results {
                            tr.correct[result.correct_on_first_attempt] {
                                td { (result.item.term()) }
                                td { (result.item.meaning().unwrap_or("")) }
                                td { (result.attempts) }
                                td {
                                    @if let Some(change) = result.tier {
                                        (change.before.to_string()) " -> " (change.after.to_string())
                                    }
                                }
                            }
                        }
                    }
                }
            }
            @if !summary.warnings.is_empty() {
                h2 { "Skipped" }
                ul.warnings {
                    @for warning in &summary.warnings {
                        li { (warning.to_string()) }
                    }
                }
            }
            form method="post" {
                input type="hidden" name="action" value="Shutdown";
                input #shutdown type="submit" value="Shutdown";
            }
        }
    }
}
