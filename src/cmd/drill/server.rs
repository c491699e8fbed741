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

use axum::Router;
use axum::http::HeaderName;
use axum::http::StatusCode;
use axum::http::header::CACHE_CONTROL;
use axum::http::header::CONTENT_TYPE;
use axum::response::Html;
use axum::routing::get;
use axum::routing::post;
use kotoba_core::error::ErrorReport;
use kotoba_core::error::Fallible;
use kotoba_core::error::fail;
use kotoba_core::session::Session;
use kotoba_core::session::SessionConfig;
use kotoba_core::session::SessionState;
use kotoba_core::store::ItemStore;
use kotoba_core::types::timestamp::Timestamp;
use tokio::net::TcpListener;
use tokio::select;
use tokio::signal;
use tokio::sync::oneshot::Receiver;
use tokio::sync::oneshot::channel;
use tokio::task::JoinHandle;

use crate::cmd::drill::get::get_handler;
use crate::cmd::drill::post::post_handler;
use crate::cmd::drill::state::ServerState;
use crate::cmd::drill::voice::BrowserVoice;
use crate::cmd::drill::writer::ProgressWriter;
use crate::collection::Collection;
use crate::utils::CACHE_CONTROL_IMMUTABLE;

pub struct ServerConfig {
    pub directory: Option<String>,
    pub host: String,
    pub port: u16,
    pub session_started_at: Timestamp,
    pub session: SessionConfig,
    pub deck_filter: Option<String>,
}

pub async fn start_server(config: ServerConfig) -> Fallible<()> {
    let collection = Collection::new(config.directory)?;
    let items = collection.load_items(config.deck_filter.as_deref())?;
    if items.is_empty() {
        println!("No words found.");
        return Ok(());
    }
    let total_words = items.len();
    log::debug!(
        "Loaded {total_words} words from {}",
        collection.directory.display()
    );
    let Collection { db, .. } = collection;

    let (writer, writer_handle) = ProgressWriter::spawn(db);
    let voice = BrowserVoice::default();
    let mut session =
        Session::new(items, config.session, writer.clone()).with_speaker(Box::new(voice.clone()));
    session.start()?;
    log::debug!(
        "Session started at {} with {total_words} words",
        config.session_started_at
    );

    if session.state() == SessionState::Finished {
        match session.summary() {
            Some(summary) if summary.fully_mastered => println!("Every word is mastered."),
            _ => println!("No words due today."),
        }
        return stop_writer(writer, writer_handle).await;
    }

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = channel();

    let state = ServerState {
        session: Arc::new(Mutex::new(session)),
        voice,
        shutdown_tx: Arc::new(Mutex::new(Some(shutdown_tx))),
    };
    let app = Router::new();
    let app = app.route("/", get(get_handler));
    let app = app.route("/", post(post_handler));
    let app = app.route("/script.js", get(script_handler));
    let app = app.route("/style.css", get(style_handler));
    let app = app.fallback(not_found_handler);
    let app = app.with_state(state.clone());
    let bind = format!("{}:{}", config.host, config.port);

    // Start the server with graceful shutdown on Ctrl+C or shutdown button.
    log::debug!("Starting server on {bind}");
    let listener = TcpListener::bind(bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_rx))
        .await?;

    // Updates queued before shutdown are written before we return.
    stop_writer(writer, writer_handle).await?;

    let finished = match state.session.lock() {
        Ok(session) => session.state() == SessionState::Finished,
        Err(_) => false,
    };
    if finished {
        Ok(())
    } else {
        fail("Session interrupted before completion")
    }
}

async fn stop_writer(writer: ProgressWriter, handle: JoinHandle<usize>) -> Fallible<()> {
    writer.stop();
    handle
        .await
        .map_err(|e| ErrorReport::new(format!("progress writer failed: {e}")))?;
    Ok(())
}

async fn script_handler() -> (StatusCode, [(HeaderName, &'static str); 2], &'static [u8]) {
    let bytes = include_bytes!("script.js");
    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, "text/javascript"),
            (CACHE_CONTROL, CACHE_CONTROL_IMMUTABLE),
        ],
        bytes,
    )
}

async fn style_handler() -> (StatusCode, [(HeaderName, &'static str); 2], &'static [u8]) {
    let bytes = include_bytes!("style.css");
    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, "text/css"),
            (CACHE_CONTROL, CACHE_CONTROL_IMMUTABLE),
        ],
        bytes,
    )
}

async fn not_found_handler() -> (StatusCode, Html<String>) {
    (StatusCode::NOT_FOUND, Html("Not Found".to_string()))
}

async fn shutdown_signal(shutdown_rx: Receiver<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    let shutdown = async {
        shutdown_rx.await.ok();
    };

    select! {
        _ = ctrl_c => {
            log::debug!("Received Ctrl+C, shutting down gracefully");
        },
        _ = shutdown => {
            log::debug!("Received shutdown signal, shutting down gracefully");
        },
    }
}
