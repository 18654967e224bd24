// nettick - Tick-driven TCP application host over a pluggable wire protocol
// Copyright (C) 2026  nettick contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::time::{Duration, Instant};

/// Monotonic tick timer.
///
/// `tick()` snapshots the time since the previous `tick()` into `elapsed`,
/// accumulates it into `total`, and increments `ticks`. Precision is
/// whatever `std::time::Instant` gives on the host platform; the clock
/// never moves backward.
pub struct Clock {
    last_tick: Instant,
    elapsed: Duration,
    total: Duration,
    ticks: u64,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            last_tick: Instant::now(),
            elapsed: Duration::ZERO,
            total: Duration::ZERO,
            ticks: 0,
        }
    }

    /// Duration of the last completed tick.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Duration elapsed since the last `tick()` call, i.e. time spent in
    /// the current in-flight tick so far.
    pub fn current(&self) -> Duration {
        self.last_tick.elapsed()
    }

    /// Sum of every completed tick's `elapsed`.
    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn tick(&mut self) {
        let now = Instant::now();
        self.elapsed = now.saturating_duration_since(self.last_tick);
        self.total += self.elapsed;
        self.ticks += 1;
        self.last_tick = now;
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_accumulates_total_and_count() {
        let mut clock = Clock::new();

        clock.tick();
        clock.tick();
        clock.tick();

        assert_eq!(clock.ticks(), 3);
        assert!(clock.total() >= Duration::ZERO);
    }

    #[test]
    fn elapsed_never_exceeds_total() {
        let mut clock = Clock::new();

        clock.tick();

        assert!(clock.elapsed() <= clock.total());
    }
}
