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

use axum::Form;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::response::IntoResponse;
use axum::response::Response as HttpResponse;
use kotoba_core::error::Fallible;
use kotoba_core::error::fail;
use kotoba_core::exercise::Exercise;
use kotoba_core::exercise::Response;
use kotoba_core::exercise::typing::TypedInput;
use kotoba_core::session::Feedback;
use kotoba_core::session::timer::TimerToken;
use kotoba_core::srs::Grade;
use kotoba_core::types::timestamp::Timestamp;
use serde::Deserialize;

use crate::cmd::drill::get::error_page;
use crate::cmd::drill::get::render_page;
use crate::cmd::drill::state::ServerState;

#[derive(Deserialize, Clone, Copy, Debug)]
pub enum Action {
    Choose,
    Type,
    Pick,
    Reveal,
    Grade,
    Expire,
    End,
    Shutdown,
}

#[derive(Deserialize)]
pub struct FormData {
    action: Action,
    /// Option or tile index.
    index: Option<usize>,
    /// Typed answer.
    text: Option<String>,
    /// The typed answer is still being composed by an input method.
    composing: Option<bool>,
    /// Sent by the page while the user types: only submit if the answer
    /// is already right.
    auto: Option<bool>,
    grade: Option<String>,
    token: Option<u64>,
}

enum Outcome {
    Render,
    NoContent,
}

pub async fn post_handler(
    State(state): State<ServerState>,
    Form(form): Form<FormData>,
) -> HttpResponse {
    let action = form.action;
    match action_handler(&state, form) {
        Ok(Outcome::NoContent) => StatusCode::NO_CONTENT.into_response(),
        Ok(Outcome::Render) => match render_page(&state) {
            Ok(page) => (StatusCode::OK, Html(page.into_string())).into_response(),
            Err(e) => error_page(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()).into_response(),
        },
        Err(e) => {
            log::debug!("Rejected {action:?}: {e}");
            error_page(StatusCode::BAD_REQUEST, &e.to_string()).into_response()
        }
    }
}

fn action_handler(state: &ServerState, form: FormData) -> Fallible<Outcome> {
    let Ok(mut session) = state.session.lock() else {
        return fail("session lock poisoned");
    };
    let now = Timestamp::now();
    let response = match form.action {
        Action::Choose => Response::Choose(required(form.index, "index")?),
        Action::Pick => Response::Pick(required(form.index, "index")?),
        Action::Reveal => Response::Reveal,
        Action::Grade => Response::Grade(Grade::try_from(required(form.grade, "grade")?)?),
        Action::Type => {
            let text = required(form.text, "text")?;
            let input = if form.composing.unwrap_or(false) {
                TypedInput::Composing(text)
            } else {
                TypedInput::Committed(text)
            };
            if form.auto.unwrap_or(false) {
                let ready = match session.current() {
                    Some(Exercise::Typing(question)) => question.should_auto_submit(&input),
                    _ => false,
                };
                if !ready {
                    return Ok(Outcome::NoContent);
                }
            }
            Response::Type(input)
        }
        Action::Expire => {
            let token = TimerToken::new(required(form.token, "token")?);
            if !session.expire(token) {
                log::debug!("Ignored stale timer {token}");
            }
            return Ok(Outcome::Render);
        }
        Action::End => {
            session.end();
            return Ok(Outcome::Render);
        }
        Action::Shutdown => {
            drop(session);
            if let Ok(mut tx) = state.shutdown_tx.lock() {
                if let Some(tx) = tx.take() {
                    let _ = tx.send(());
                }
            }
            return Ok(Outcome::Render);
        }
    };
    let feedback = session.submit(response, now)?;
    if let Feedback::Graded {
        correct,
        retry_queued,
    } = feedback
    {
        log::debug!("Graded: correct={correct} retry={retry_queued}");
    }
    Ok(Outcome::Render)
}

fn required<T>(value: Option<T>, name: &str) -> Fallible<T> {
    match value {
        Some(value) => Ok(value),
        None => fail(format!("missing form field: {name}")),
    }
}
