//! Review session controller: walks one review item at a time through
//! question, hint and answer, and submits the user's judgment to the backend.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use shared::{
    domain::{Judgment, RecallClassification},
    protocol::{DailyProgress, ReviewItem},
};
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use crate::LearningBackend;

/// How long "undo" stays offered after marking a question-phase word as known.
pub const UNDO_WINDOW: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReviewPhase {
    Question,
    Hint,
    Answer,
}

impl ReviewPhase {
    /// Brand-new words start with their hint already revealed.
    pub fn initial_for(classification: RecallClassification) -> Self {
        if classification.is_unseen() {
            Self::Hint
        } else {
            Self::Question
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewTurn {
    pub item: ReviewItem,
    pub phase: ReviewPhase,
    pub judgment: Option<Judgment>,
    pub busy: bool,
    undo_deadline: Option<Instant>,
}

impl ReviewTurn {
    pub fn new(item: ReviewItem) -> Self {
        let phase = ReviewPhase::initial_for(item.classification());
        Self {
            item,
            phase,
            judgment: None,
            busy: false,
            undo_deadline: None,
        }
    }

    pub fn hint_visible(&self) -> bool {
        self.phase != ReviewPhase::Question
    }

    pub fn definition_visible(&self) -> bool {
        self.phase == ReviewPhase::Answer
    }

    pub fn can_mark(&self) -> bool {
        self.phase != ReviewPhase::Answer && !self.busy
    }

    pub fn can_proceed(&self) -> bool {
        self.phase == ReviewPhase::Answer && self.judgment.is_some() && !self.busy
    }

    pub fn undo_available_at(&self, now: Instant) -> bool {
        !self.busy
            && self.judgment == Some(Judgment::Known)
            && self.undo_deadline.is_some_and(|deadline| now <= deadline)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionView {
    Loading,
    Reviewing(ReviewTurn),
    /// Nothing left for today.
    Complete,
}

impl SessionView {
    pub fn turn(&self) -> Option<&ReviewTurn> {
        match self {
            Self::Reviewing(turn) => Some(turn),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied,
    Ignored,
}

/// Result of an operation that asks the backend for the next item.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Item,
    Complete,
    /// The action was not enabled in the current state.
    Ignored,
    /// The backend call failed; the view was left as it was.
    Failed,
}

pub struct ReviewSession {
    backend: Arc<dyn LearningBackend>,
    view: Mutex<SessionView>,
    progress: watch::Sender<Option<DailyProgress>>,
}

impl ReviewSession {
    pub fn new(backend: Arc<dyn LearningBackend>) -> Arc<Self> {
        let (progress, _) = watch::channel(None);
        Arc::new(Self {
            backend,
            view: Mutex::new(SessionView::Loading),
            progress,
        })
    }

    pub async fn view(&self) -> SessionView {
        self.view.lock().await.clone()
    }

    pub fn progress(&self) -> Option<DailyProgress> {
        *self.progress.borrow()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<Option<DailyProgress>> {
        self.progress.subscribe()
    }

    pub async fn load_initial(&self) -> FetchOutcome {
        if self
            .view
            .lock()
            .await
            .turn()
            .is_some_and(|turn| turn.busy)
        {
            return FetchOutcome::Ignored;
        }

        match self.backend.current_item().await {
            Ok(next) => {
                let mut view = self.view.lock().await;
                apply_next_item(&mut view, next)
            }
            Err(err) => {
                warn!("review: failed to load current item: {err}");
                FetchOutcome::Failed
            }
        }
    }

    pub async fn mark_known(&self) -> ActionOutcome {
        self.mark_known_at(Instant::now()).await
    }

    /// Records "known" unless a judgment is already pending, and reveals the
    /// answer.
    pub async fn mark_known_at(&self, now: Instant) -> ActionOutcome {
        let mut view = self.view.lock().await;
        let SessionView::Reviewing(turn) = &mut *view else {
            return ActionOutcome::Ignored;
        };
        if !turn.can_mark() {
            return ActionOutcome::Ignored;
        }

        if turn.judgment.is_none() {
            turn.judgment = Some(Judgment::Known);
            if turn.phase == ReviewPhase::Question {
                turn.undo_deadline = Some(now + UNDO_WINDOW);
            }
        }
        turn.phase = ReviewPhase::Answer;
        ActionOutcome::Applied
    }

    pub async fn mark_not_known(&self) -> ActionOutcome {
        let mut view = self.view.lock().await;
        let SessionView::Reviewing(turn) = &mut *view else {
            return ActionOutcome::Ignored;
        };
        if !turn.can_mark() {
            return ActionOutcome::Ignored;
        }

        turn.judgment = Some(Judgment::NotKnown);
        turn.undo_deadline = None;
        turn.phase = match turn.phase {
            ReviewPhase::Question => ReviewPhase::Hint,
            ReviewPhase::Hint | ReviewPhase::Answer => ReviewPhase::Answer,
        };
        ActionOutcome::Applied
    }

    pub async fn undo(&self) -> ActionOutcome {
        self.undo_at(Instant::now()).await
    }

    /// Turns a just-recorded "known" back into "not known". The phase stays.
    pub async fn undo_at(&self, now: Instant) -> ActionOutcome {
        let mut view = self.view.lock().await;
        let SessionView::Reviewing(turn) = &mut *view else {
            return ActionOutcome::Ignored;
        };
        if !turn.undo_available_at(now) {
            turn.undo_deadline = None;
            return ActionOutcome::Ignored;
        }

        turn.judgment = Some(Judgment::NotKnown);
        turn.undo_deadline = None;
        ActionOutcome::Applied
    }

    /// Submits the pending judgment and moves on to whatever the backend
    /// serves next. At most one submission per item is in flight.
    pub async fn proceed(self: &Arc<Self>) -> FetchOutcome {
        let judgment = {
            let mut view = self.view.lock().await;
            let SessionView::Reviewing(turn) = &mut *view else {
                return FetchOutcome::Ignored;
            };
            if !turn.can_proceed() {
                return FetchOutcome::Ignored;
            }
            let Some(judgment) = turn.judgment else {
                return FetchOutcome::Ignored;
            };
            turn.busy = true;
            turn.undo_deadline = None;
            judgment
        };

        let result = self.backend.proceed(judgment.is_known()).await;

        let outcome = {
            let mut view = self.view.lock().await;
            match result {
                Ok(next) => apply_next_item(&mut view, next),
                Err(err) => {
                    warn!("review: failed to submit judgment {judgment:?}: {err}");
                    if let SessionView::Reviewing(turn) = &mut *view {
                        turn.busy = false;
                    }
                    return FetchOutcome::Failed;
                }
            }
        };

        self.spawn_progress_refresh();
        outcome
    }

    /// Asks the backend to forget today's finished words, then reloads.
    /// Only available once the session is complete.
    pub async fn reset(self: &Arc<Self>) -> FetchOutcome {
        if !self.view.lock().await.is_complete() {
            return FetchOutcome::Ignored;
        }

        if let Err(err) = self.backend.reset().await {
            warn!("review: failed to reset session: {err}");
            return FetchOutcome::Failed;
        }
        info!("review: session reset");

        let outcome = self.load_initial().await;
        self.spawn_progress_refresh();
        outcome
    }

    pub async fn refresh_progress(&self) {
        match self.backend.progress().await {
            Ok(progress) => {
                self.progress.send_replace(Some(progress));
            }
            Err(err) => warn!("review: failed to refresh daily progress: {err}"),
        }
    }

    fn spawn_progress_refresh(self: &Arc<Self>) {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            session.refresh_progress().await;
        });
    }
}

fn apply_next_item(view: &mut SessionView, next: Option<ReviewItem>) -> FetchOutcome {
    match next {
        Some(item) => {
            let turn = ReviewTurn::new(item);
            info!("review: word={} phase={:?}", turn.item.id().0, turn.phase);
            *view = SessionView::Reviewing(turn);
            FetchOutcome::Item
        }
        None => {
            info!("review: no words left for today");
            *view = SessionView::Complete;
            FetchOutcome::Complete
        }
    }
}

#[cfg(test)]
#[path = "tests/review_session_tests.rs"]
mod tests;
