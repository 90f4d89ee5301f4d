use std::time::{Duration, Instant};

/// Time between two inference runs.
// TODO: confirm the intended interval with product. The app has always been
// described as classifying "every 1 second" but has shipped with 3000 ms.
pub const INFERENCE_INTERVAL: Duration = Duration::from_millis(3_000);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateState {
    Idle,
    Armed { since: Instant },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    /// First frame seen; the reference time was just recorded.
    Armed,
    Waiting { remaining: Duration },
    /// The interval has elapsed. Call [`RateGate::rearm`] once the frame
    /// has been classified.
    Due,
}

/// Fixed-interval sampler over the free-running frame stream.
#[derive(Clone, Debug)]
pub struct RateGate {
    interval: Duration,
    state: GateState,
}

impl RateGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: GateState::Idle,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn poll(&mut self, now: Instant) -> GateDecision {
        match self.state {
            GateState::Idle => {
                self.state = GateState::Armed { since: now };
                GateDecision::Armed
            }
            GateState::Armed { since } => {
                let elapsed = now.saturating_duration_since(since);
                if elapsed >= self.interval {
                    GateDecision::Due
                } else {
                    GateDecision::Waiting {
                        remaining: self.interval - elapsed,
                    }
                }
            }
        }
    }

    pub fn rearm(&mut self, now: Instant) {
        self.state = GateState::Armed { since: now };
    }
}

impl Default for RateGate {
    fn default() -> Self {
        Self::new(INFERENCE_INTERVAL)
    }
}
