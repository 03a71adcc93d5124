//! Interactive review loop: renders the session and feeds it user input.

use std::{fmt::Write as _, io::Write, sync::Arc, time::Instant};

use anyhow::Result;
use client_core::{ActionOutcome, FetchOutcome, ReviewSession, SessionView};
use shared::protocol::DailyProgress;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use crate::controller::commands::{LearnCommand, HELP};

const PROGRESS_BAR_WIDTH: usize = 20;

pub const RESET_REFUSED: &str = "Starting over is only possible once today's words are done.";
const BACKEND_UNREACHABLE: &str = "Could not reach the backend; try again.";

pub async fn run_learn<R, W>(session: Arc<ReviewSession>, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut status: Option<String> = None;

    loop {
        let view = session.view().await;
        write!(
            out,
            "{}",
            render(&view, session.progress(), Instant::now(), status.as_deref())
        )?;
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let Some(command) = LearnCommand::parse(&line) else {
            status = Some(format!("Unknown input '{}'. Type h for help.", line.trim()));
            continue;
        };
        debug!(command = command.name(), "learn input");
        if command == LearnCommand::Quit {
            break;
        }
        status = dispatch(&session, command).await;
    }

    writeln!(out)?;
    Ok(())
}

/// Applies one command and returns a status line when there is something to
/// tell the user beyond the re-rendered card.
pub async fn dispatch(session: &Arc<ReviewSession>, command: LearnCommand) -> Option<String> {
    match command {
        LearnCommand::Know => ignored_hint(
            session.mark_known().await,
            "Already answered; press Enter for the next word.",
        ),
        LearnCommand::DontKnow => ignored_hint(
            session.mark_not_known().await,
            "Already answered; press Enter for the next word.",
        ),
        LearnCommand::Undo => ignored_hint(session.undo().await, "Nothing to undo."),
        LearnCommand::Next => {
            if session.view().await == SessionView::Loading {
                return fetch_status(session.load_initial().await, "");
            }
            let outcome = session.proceed().await;
            if matches!(outcome, FetchOutcome::Item | FetchOutcome::Complete) {
                session.refresh_progress().await;
            }
            fetch_status(
                outcome,
                "Answer first: [k] I know this word or [n] I don't know.",
            )
        }
        LearnCommand::Reset => {
            let outcome = session.reset().await;
            if matches!(outcome, FetchOutcome::Item | FetchOutcome::Complete) {
                session.refresh_progress().await;
            }
            fetch_status(outcome, RESET_REFUSED)
        }
        LearnCommand::Help => Some(HELP.to_string()),
        LearnCommand::Quit => None,
    }
}

fn ignored_hint(outcome: ActionOutcome, message: &str) -> Option<String> {
    match outcome {
        ActionOutcome::Applied => None,
        ActionOutcome::Ignored => Some(message.to_string()),
    }
}

fn fetch_status(outcome: FetchOutcome, ignored: &str) -> Option<String> {
    match outcome {
        FetchOutcome::Item | FetchOutcome::Complete => None,
        FetchOutcome::Ignored => Some(ignored.to_string()).filter(|m| !m.is_empty()),
        FetchOutcome::Failed => Some(BACKEND_UNREACHABLE.to_string()),
    }
}

/// Resets today's review outside the interactive loop. The backend must have
/// nothing left to serve, same as pressing `r` on the completion screen.
pub async fn reset_if_complete(session: &Arc<ReviewSession>) -> Result<(), &'static str> {
    match session.load_initial().await {
        FetchOutcome::Complete => {}
        FetchOutcome::Failed => return Err(BACKEND_UNREACHABLE),
        FetchOutcome::Item | FetchOutcome::Ignored => return Err(RESET_REFUSED),
    }
    match session.reset().await {
        FetchOutcome::Item | FetchOutcome::Complete => Ok(()),
        FetchOutcome::Failed => Err(BACKEND_UNREACHABLE),
        FetchOutcome::Ignored => Err(RESET_REFUSED),
    }
}

pub fn render(
    view: &SessionView,
    progress: Option<DailyProgress>,
    now: Instant,
    status: Option<&str>,
) -> String {
    let mut screen = String::new();
    screen.push('\n');
    if let Some(progress) = progress {
        let _ = writeln!(screen, "{}", render_progress(&progress));
    }

    match view {
        SessionView::Loading => {
            screen.push_str("Loading today's words... (press Enter to retry)\n");
        }
        SessionView::Complete => {
            screen.push_str("You've done your daily goal!\n");
            screen.push_str("[r] start today over   [q] quit\n");
        }
        SessionView::Reviewing(turn) => {
            let _ = writeln!(screen, "  {}", turn.item.name());
            if turn.hint_visible() {
                if let Some(hint) = turn.item.hint() {
                    let _ = writeln!(screen, "  ({hint})");
                }
            }
            if turn.definition_visible() {
                if let Some(definition) = turn.item.definition() {
                    let _ = writeln!(screen, "  = {definition}");
                }
            }
            screen.push('\n');

            if turn.can_mark() {
                screen.push_str("[k] I know this word   [n] I don't know\n");
            }
            if turn.busy {
                screen.push_str("(saving...)\n");
            } else if turn.can_proceed() {
                screen.push_str("[Enter] next\n");
            }
            if turn.undo_available_at(now) {
                screen.push_str("Marked as known. [u] undo\n");
            }
        }
    }

    if let Some(status) = status {
        let _ = writeln!(screen, "{status}");
    }
    screen
}

pub fn render_progress(progress: &DailyProgress) -> String {
    let filled = (progress.completion_ratio() * PROGRESS_BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(PROGRESS_BAR_WIDTH);
    format!(
        "[{}{}] {}/{} finished ({} learning, {} remaining)",
        "#".repeat(filled),
        "-".repeat(PROGRESS_BAR_WIDTH - filled),
        progress.finished,
        progress.total(),
        progress.learning,
        progress.remaining
    )
}

#[cfg(test)]
#[path = "tests/learn_tests.rs"]
mod tests;
