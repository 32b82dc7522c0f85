// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use super::MonotonicClock;
use std::time::Instant;

/// Clock backed by `std::time::Instant` (CLOCK_MONOTONIC on Linux).
pub struct SoftwareClock {
    start_time: Instant,
    description: String,
}

impl SoftwareClock {
    pub fn new() -> Self {
        Self::with_description("Software Monotonic Clock".to_string())
    }

    pub fn with_description(description: String) -> Self {
        Self {
            start_time: Instant::now(),
            description,
        }
    }
}

impl Default for SoftwareClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SoftwareClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch(&self) -> Instant {
        self.start_time
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_software_clock_now() {
        let clock = SoftwareClock::new();
        let t1 = clock.now_ns();

        thread::sleep(Duration::from_millis(10));

        let t2 = clock.now_ns();
        assert!(t2 > t1, "Time should increase");
        assert!(t2 - t1 >= 10_000_000, "Should be at least 10ms");
    }

    #[test]
    fn test_software_clock_monotonic() {
        let clock = SoftwareClock::new();
        let mut last_time = clock.now_ns();

        for _ in 0..100 {
            let current_time = clock.now_ns();
            assert!(current_time >= last_time, "Time must be monotonic");
            last_time = current_time;
        }
    }

    #[test]
    fn test_instants_before_epoch_saturate() {
        let before = Instant::now();
        thread::sleep(Duration::from_millis(1));
        let clock = SoftwareClock::new();
        assert_eq!(clock.ns_since_epoch(before), 0);
    }

    #[test]
    fn test_clock_descriptions() {
        let clock = SoftwareClock::new();
        assert_eq!(clock.description(), "Software Monotonic Clock");

        let custom = SoftwareClock::with_description("Custom Clock".to_string());
        assert_eq!(custom.description(), "Custom Clock");
    }
}
