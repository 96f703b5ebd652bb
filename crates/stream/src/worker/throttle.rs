/// Trailing-edge throttle: at most one computation in flight and at most one
/// queued behind it, however many requests arrive meanwhile.
#[derive(Debug, Default, Clone, Copy)]
pub struct SortThrottle {
    in_flight: bool,
    pending: bool,
}

impl SortThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self) -> bool {
        if self.in_flight {
            self.pending = true;
            false
        } else {
            self.in_flight = true;
            true
        }
    }

    /// Marks the current computation done. Returns `true` if a follow-up
    /// should run; the throttle then stays in flight.
    pub fn complete(&mut self) -> bool {
        if self.pending {
            self.pending = false;
            true
        } else {
            self.in_flight = false;
            false
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_request_starts_immediately() {
        let mut throttle = SortThrottle::new();
        assert!(throttle.request());
        assert!(throttle.is_in_flight());
        assert!(!throttle.complete());
        assert!(!throttle.is_in_flight());
    }

    #[test]
    fn burst_coalesces_into_one_follow_up() {
        let mut throttle = SortThrottle::new();
        assert!(throttle.request());
        for _ in 0..10 {
            assert!(!throttle.request());
        }

        assert!(throttle.complete());
        assert!(throttle.is_in_flight());
        assert!(!throttle.complete());
        assert!(!throttle.is_in_flight());
    }
}
