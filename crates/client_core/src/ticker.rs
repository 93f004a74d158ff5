use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::MissedTickBehavior};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

pub trait TimeSource: Send + Sync {
    fn time_of_day(&self) -> String;
}

/// Wall clock in the local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTimeSource;

impl TimeSource for LocalTimeSource {
    fn time_of_day(&self) -> String {
        chrono::Local::now().format("%H:%M:%S").to_string()
    }
}

/// Recurring task publishing the time of day. The first tick fires immediately.
///
/// The task is aborted by [`ClockTicker::stop`] or when the ticker is dropped.
pub struct ClockTicker {
    task: JoinHandle<()>,
}

impl ClockTicker {
    pub fn start<F>(source: Arc<dyn TimeSource>, period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut(String) + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                on_tick(source.time_of_day());
            }
        });
        Self { task }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for ClockTicker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use super::*;

    struct FixedTime(&'static str);

    impl TimeSource for FixedTime {
        fn time_of_day(&self) -> String {
            self.0.to_string()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_every_period_until_stopped() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let ticker = ClockTicker::start(Arc::new(FixedTime("09:00:00")), TICK_PERIOD, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 4);
        assert!(ticker.is_running());

        ticker.stop();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_ticker_stops_it() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let ticker = ClockTicker::start(Arc::new(FixedTime("17:45:10")), TICK_PERIOD, move |now| {
            sink.lock().expect("lock").push(now);
        });

        tokio::time::sleep(Duration::from_millis(1500)).await;
        drop(ticker);
        tokio::time::sleep(Duration::from_secs(3)).await;

        let seen = seen.lock().expect("lock");
        assert_eq!(seen.as_slice(), ["17:45:10", "17:45:10"]);
    }

    #[test]
    fn local_time_source_uses_clock_format() {
        let now = LocalTimeSource.time_of_day();
        assert_eq!(now.len(), 8);
        assert_eq!(now.as_bytes()[2], b':');
        assert_eq!(now.as_bytes()[5], b':');
    }
}
