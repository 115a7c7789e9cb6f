//! Fixed quiet gap between consecutive provider requests.

use std::time::{Duration, Instant};

/// Holds each request back until `interval` has passed since the previous one
/// finished, so a slow response never lets the next request go out early.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    last_done: Option<Instant>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_done: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until `interval` has passed since the last [`Pacer::done`].
    ///
    /// Never waits before the first request.
    pub fn wait(&self) {
        if let Some(last) = self.last_done {
            let remaining = self.interval.saturating_sub(last.elapsed());
            if !remaining.is_zero() {
                std::thread::sleep(remaining);
            }
        }
    }

    /// Mark the end of a request.
    pub fn done(&mut self) {
        self.last_done = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_call_is_immediate() {
        let p = Pacer::new(Duration::from_secs(60));
        let t = Instant::now();
        p.wait();
        assert!(t.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn spaces_consecutive_requests() {
        let mut p = Pacer::new(Duration::from_millis(30));
        let t = Instant::now();
        for _ in 0..3 {
            p.wait();
            p.done();
        }
        assert!(t.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn gap_counts_from_end_of_slow_request() {
        let mut p = Pacer::new(Duration::from_millis(40));
        p.wait();
        // a request that outlasts the interval
        std::thread::sleep(Duration::from_millis(60));
        p.done();

        let t = Instant::now();
        p.wait();
        assert!(t.elapsed() >= Duration::from_millis(35));
    }

    #[test]
    fn zero_interval_never_sleeps() {
        let mut p = Pacer::new(Duration::ZERO);
        let t = Instant::now();
        for _ in 0..100 {
            p.wait();
            p.done();
        }
        assert!(t.elapsed() < Duration::from_secs(1));
    }
}
