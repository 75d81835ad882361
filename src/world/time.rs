use std::time::Duration;

/// Monotonic tick counter advanced by the server's ticker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GameTick(pub u64);

/// World clock. Operations that rate-limit (yelling) measure elapsed time in
/// ticks; tests advance the clock by hand instead of sleeping.
#[derive(Debug, Clone)]
pub struct GameClock {
    tick_length: Duration,
    tick: GameTick,
}

impl GameClock {
    pub fn new(tick_length: Duration) -> Self {
        let tick_length = if tick_length.is_zero() {
            Duration::from_millis(1)
        } else {
            tick_length
        };
        Self {
            tick_length,
            tick: GameTick(0),
        }
    }

    pub fn tick_length(&self) -> Duration {
        self.tick_length
    }

    pub fn now(&self) -> GameTick {
        self.tick
    }

    pub fn advance(&mut self, ticks: u64) -> GameTick {
        self.tick.0 = self.tick.0.saturating_add(ticks);
        self.tick
    }

    pub fn advance_duration(&mut self, duration: Duration) -> GameTick {
        let ticks = self.ticks_from_duration_round_up(duration);
        self.advance(ticks)
    }

    pub fn ticks_from_duration_round_up(&self, duration: Duration) -> u64 {
        if duration.is_zero() {
            return 0;
        }
        let tick_nanos = self.tick_length.as_nanos().max(1);
        let duration_nanos = duration.as_nanos();
        let ticks = (duration_nanos + tick_nanos - 1) / tick_nanos;
        ticks.min(u64::MAX as u128) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_duration_rounds_up_to_whole_ticks() {
        let mut clock = GameClock::new(Duration::from_millis(50));
        clock.advance_duration(Duration::from_millis(75));
        assert_eq!(clock.now(), GameTick(2));
    }

    #[test]
    fn zero_tick_length_is_clamped() {
        let clock = GameClock::new(Duration::ZERO);
        assert_eq!(clock.tick_length(), Duration::from_millis(1));
    }
}
