use log::debug;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::MIN_POLL_INTERVAL;
use crate::events::AppEvent;

/// Sends [`AppEvent::PollTick`] every `period` until stopped or dropped.
///
/// The first tick fires one full period after start. A zero period is
/// raised to [`MIN_POLL_INTERVAL`].
pub struct Poller {
    handle: JoinHandle<()>,
}

impl Poller {
    pub fn start(period: Duration, events: mpsc::Sender<AppEvent>) -> Self {
        let period = period.max(MIN_POLL_INTERVAL);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if events.send(AppEvent::PollTick).await.is_err() {
                    debug!("Event channel closed, poller exiting");
                    break;
                }
            }
        });
        debug!("Poller started with period {:?}", period);
        Poller { handle }
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
