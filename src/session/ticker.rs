//! Auto-commit ticker.
//!
//! A tokio task that wakes every `period` and asks the
//! [`CommitMachine`](crate::commit::CommitMachine) for exactly one decision.
//! It only reads the hand count and snapshot; it writes only text and the
//! next deadline.  Cancel it by aborting the returned handle.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::commit::TickOutcome;
use crate::config::CommitMode;

use super::clock::Clock;
use super::state::{lock, SessionEvent, SharedState};

pub fn spawn_ticker(
    runtime: &Handle,
    state: SharedState,
    clock: Arc<dyn Clock>,
    period: Duration,
    events: Option<UnboundedSender<SessionEvent>>,
) -> JoinHandle<()> {
    {
        let mut st = lock(&state);
        st.commit.schedule_next(clock.now_ms());
    }
    log::debug!("session: auto-commit ticker every {} ms", period.as_millis());

    runtime.spawn(async move {
        let period = period.max(Duration::from_millis(1));
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let now_ms = clock.now_ms();

            let outcome = {
                let mut st = lock(&state);
                if !st.status.is_running() || st.mode() != CommitMode::AutoCommit {
                    continue;
                }
                let (pipeline, hands) = (st.pipeline, st.hands);
                st.commit.tick(pipeline, hands, now_ms)
            };

            if let (TickOutcome::Committed(appended), Some(tx)) = (outcome, &events) {
                let _ = tx.send(SessionEvent::Committed(appended));
            }
        }
    })
}
