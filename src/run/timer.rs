use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Counts elapsed ticks while a run is active
///
/// Observational only: nothing in the run reads it to make a decision.
pub struct ElapsedTimer {
    interval: Duration,
    ticks: Arc<AtomicU64>,
    ticks_tx: watch::Sender<u64>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ElapsedTimer {
    pub fn new(interval: Duration) -> Self {
        let (ticks_tx, _) = watch::channel(0);
        Self {
            interval,
            ticks: Arc::new(AtomicU64::new(0)),
            ticks_tx,
            task: Mutex::new(None),
        }
    }

    /// Reset to zero and start ticking. Must be called within a tokio runtime.
    pub fn start(&self) {
        self.stop();
        self.ticks.store(0, Ordering::SeqCst);
        self.ticks_tx.send_replace(0);

        let period = self.interval;
        let ticks = Arc::clone(&self.ticks);
        let ticks_tx = self.ticks_tx.clone();

        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let n = ticks.fetch_add(1, Ordering::SeqCst) + 1;
                ticks_tx.send_replace(n);
            }
        });

        if let Ok(mut task) = self.task.lock() {
            *task = Some(handle);
        }
    }

    /// Stop ticking; the elapsed value is kept until the next `start`.
    pub fn stop(&self) {
        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .map(|task| task.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    pub fn elapsed(&self) -> Duration {
        let ticks = u32::try_from(self.ticks()).unwrap_or(u32::MAX);
        self.interval.saturating_mul(ticks)
    }

    /// Tick count updates, for displays
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.ticks_tx.subscribe()
    }
}

impl Drop for ElapsedTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// `MM:SS`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_saturates_instead_of_wrapping() {
        let timer = ElapsedTimer::new(Duration::from_secs(1));
        timer.ticks.store(u64::from(u32::MAX) + 5, Ordering::SeqCst);
        assert_eq!(timer.elapsed(), Duration::from_secs(u64::from(u32::MAX)));
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00");
        assert_eq!(format_elapsed(Duration::from_secs(75)), "01:15");
        assert_eq!(format_elapsed(Duration::from_secs(3600)), "60:00");
    }
}
