//! Wall-clock timing for probes and rounds

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Timer {
    started: Instant,
    label: String,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            started: Instant::now(),
            label: label.into(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Milliseconds so far, saturating at `u64::MAX`
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Consume the timer, log the measurement and return it in milliseconds
    pub fn finish(self) -> u64 {
        let ms = self.elapsed_ms();
        tracing::debug!("{} took {}ms", self.label, ms);
        ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_timer_measures_sleep() {
        let timer = Timer::start("deepseek");
        sleep(Duration::from_millis(10));
        assert!(timer.elapsed_ms() >= 10);
        assert!(timer.finish() >= 10);
    }
}
