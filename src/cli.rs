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

use std::fmt::Display;
use std::fmt::Formatter;
use std::process::exit;

use clap::Parser;
use clap::ValueEnum;
use kotoba_core::error::Fallible;
use kotoba_core::exercise::Direction;
use kotoba_core::session::BatchSize;
use kotoba_core::session::ReviewKind;
use kotoba_core::session::Scope;
use kotoba_core::session::SessionConfig;
use kotoba_core::types::timestamp::Timestamp;
use tokio::spawn;

use crate::cmd::check::check_collection;
use crate::cmd::drill::server::ServerConfig;
use crate::cmd::drill::server::start_server;
use crate::cmd::stats::StatsFormat;
use crate::cmd::stats::print_stats;
use crate::utils::wait_for_server;

#[derive(Parser)]
#[command(version, about, long_about = None)]
enum Command {
    /// Review vocabulary through a web interface.
    Review {
        /// Path to the collection directory. By default, the current working directory is used.
        directory: Option<String>,
        /// Which exercises to drill.
        #[arg(long, default_value_t = ExerciseMode::Mixed)]
        mode: ExerciseMode,
        /// Whether multiple-choice questions show the word or the answer.
        #[arg(long, default_value_t = QuestionDirection::Forward)]
        direction: QuestionDirection,
        /// Maximum number of words in a session, or "all".
        #[arg(long, default_value_t = BatchSize::All)]
        limit: BatchSize,
        /// Only review words from this deck.
        #[arg(long)]
        from_deck: Option<String>,
        /// Review every word, not only the ones due today.
        #[arg(long)]
        all: bool,
        /// The host address to bind to. Default is 127.0.0.1.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// The port to use for the web server. Default is 8000.
        #[arg(long, default_value_t = 8000)]
        port: u16,
        /// Whether to open the browser automatically. Default is true.
        #[arg(long)]
        open_browser: Option<bool>,
    },
    /// Take a mastery test through a web interface.
    Test {
        /// Path to the collection directory. By default, the current working directory is used.
        directory: Option<String>,
        /// Number of unmastered words to test, or "all".
        #[arg(long, default_value_t = BatchSize::default())]
        batch_size: BatchSize,
        /// Only test words from this deck.
        #[arg(long)]
        from_deck: Option<String>,
        /// The host address to bind to. Default is 127.0.0.1.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// The port to use for the web server. Default is 8000.
        #[arg(long, default_value_t = 8000)]
        port: u16,
        /// Whether to open the browser automatically. Default is true.
        #[arg(long)]
        open_browser: Option<bool>,
    },
    /// Check a collection for parse errors and incomplete words.
    Check {
        /// Path to the collection directory. By default, the current working directory is used.
        directory: Option<String>,
    },
    /// Print collection statistics.
    Stats {
        /// Path to the collection directory. By default, the current working directory is used.
        directory: Option<String>,
        /// Which output format to use.
        #[arg(long, default_value_t = StatsFormat::Text)]
        format: StatsFormat,
    },
}

#[derive(ValueEnum, Clone, Copy, PartialEq)]
enum ExerciseMode {
    /// Self-graded flashcards.
    Flashcards,
    /// Multiple choice on the meaning.
    Meaning,
    /// Multiple choice on the reading.
    Reading,
    /// Type the reading.
    Typing,
    /// Match words to meanings.
    Matching,
    /// A random exercise per word.
    Mixed,
}

impl From<ExerciseMode> for ReviewKind {
    fn from(value: ExerciseMode) -> Self {
        match value {
            ExerciseMode::Flashcards => ReviewKind::Flashcards,
            ExerciseMode::Meaning => ReviewKind::Meaning,
            ExerciseMode::Reading => ReviewKind::Reading,
            ExerciseMode::Typing => ReviewKind::Typing,
            ExerciseMode::Matching => ReviewKind::Matching,
            ExerciseMode::Mixed => ReviewKind::Mixed,
        }
    }
}

impl Display for ExerciseMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", ReviewKind::from(*self).as_str())
    }
}

#[derive(ValueEnum, Clone, Copy, PartialEq)]
enum QuestionDirection {
    /// Show the word, pick the answer.
    Forward,
    /// Show the answer, pick the word.
    Reverse,
}

impl From<QuestionDirection> for Direction {
    fn from(value: QuestionDirection) -> Self {
        match value {
            QuestionDirection::Forward => Direction::Forward,
            QuestionDirection::Reverse => Direction::Reverse,
        }
    }
}

impl Display for QuestionDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            QuestionDirection::Forward => write!(f, "forward"),
            QuestionDirection::Reverse => write!(f, "reverse"),
        }
    }
}

pub async fn entrypoint() -> Fallible<()> {
    let cli: Command = Command::parse();
    match cli {
        Command::Review {
            directory,
            mode,
            direction,
            limit,
            from_deck,
            all,
            host,
            port,
            open_browser,
        } => {
            let session_started_at = Timestamp::now();
            let scope = if all {
                Scope::All
            } else {
                Scope::DueBy(session_started_at.date())
            };
            let session = SessionConfig::review(mode.into())
                .with_direction(direction.into())
                .with_scope(scope)
                .with_limit(limit);
            let config = ServerConfig {
                directory,
                host,
                port,
                session_started_at,
                session,
                deck_filter: from_deck,
            };
            drill(config, open_browser.unwrap_or(true)).await
        }
        Command::Test {
            directory,
            batch_size,
            from_deck,
            host,
            port,
            open_browser,
        } => {
            let config = ServerConfig {
                directory,
                host,
                port,
                session_started_at: Timestamp::now(),
                session: SessionConfig::test(batch_size),
                deck_filter: from_deck,
            };
            drill(config, open_browser.unwrap_or(true)).await
        }
        Command::Check { directory } => check_collection(directory),
        Command::Stats { directory, format } => print_stats(directory, format),
    }
}

async fn drill(config: ServerConfig, open_browser: bool) -> Fallible<()> {
    if open_browser {
        // Start a separate task to open the browser once the server is up.
        let browser_host = config.host.clone();
        let port = config.port;
        spawn(async move {
            match wait_for_server(&browser_host, port).await {
                Ok(_) => {
                    let _ = open::that(format!("http://{browser_host}:{port}/"));
                }
                Err(e) => {
                    eprintln!("Failed to connect to server: {e}");
                    exit(-1)
                }
            }
        });
    }
    start_server(config).await
}
