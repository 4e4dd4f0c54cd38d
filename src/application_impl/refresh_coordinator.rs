use crate::application_port::*;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

pub type RefreshResult = Result<RefreshedSession, RefreshError>;
type SharedRound = Shared<BoxFuture<'static, RefreshResult>>;

enum RoundState {
    Idle,
    Refreshing { round: u64, outcome: SharedRound },
}

/// Single-flight guard for token refresh.
///
/// The first caller starts a round; everyone arriving while it is in flight
/// awaits the same shared outcome. The round puts the state back to idle
/// before handing out its result, so a later failure starts a fresh round.
pub struct RefreshCoordinator {
    state: Arc<Mutex<RoundState>>,
    rounds: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RoundState::Idle)),
            rounds: AtomicU64::new(0),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*lock_state(&self.state), RoundState::Refreshing { .. })
    }

    pub fn rounds_started(&self) -> u64 {
        self.rounds.load(Ordering::SeqCst)
    }

    /// Join the in-flight round, or start one with `start`.
    pub async fn run_or_join<F>(&self, start: F) -> RefreshResult
    where
        F: FnOnce() -> BoxFuture<'static, RefreshResult>,
    {
        let outcome = {
            let mut state = lock_state(&self.state);
            match &*state {
                RoundState::Refreshing { round, outcome } => {
                    debug!(round, "joining in-flight token refresh");
                    outcome.clone()
                }
                RoundState::Idle => {
                    let round = self.rounds.fetch_add(1, Ordering::SeqCst) + 1;
                    debug!(round, "starting token refresh round");
                    let work = start();
                    let state_handle = Arc::clone(&self.state);
                    let outcome = async move {
                        let result = work.await;
                        settle(&state_handle, round);
                        result
                    }
                    .boxed()
                    .shared();
                    *state = RoundState::Refreshing {
                        round,
                        outcome: outcome.clone(),
                    };
                    outcome
                }
            }
        };
        outcome.await
    }
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

fn settle(state: &Mutex<RoundState>, round: u64) {
    let mut state = lock_state(state);
    if matches!(&*state, RoundState::Refreshing { round: current, .. } if *current == round) {
        *state = RoundState::Idle;
    }
}

fn lock_state(state: &Mutex<RoundState>) -> MutexGuard<'_, RoundState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
