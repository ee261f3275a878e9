use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Process-wide flag ensuring at most one acquisition job runs at a time.
///
/// Clones share the same flag. A second `try_acquire` while a guard is
/// alive fails synchronously instead of queueing.
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    busy: Arc<AtomicBool>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a guard if no job is running. The flag is cleared when
    /// the guard drops, on every exit path.
    pub fn try_acquire(&self) -> Option<SingleFlightGuard> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Some(SingleFlightGuard {
                busy: self.busy.clone(),
            })
        } else {
            None
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct SingleFlightGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for SingleFlightGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_rejected_while_guard_held() {
        let flight = SingleFlight::new();
        let guard = flight.try_acquire();
        assert!(guard.is_some());
        assert!(flight.try_acquire().is_none());
        assert!(flight.is_busy());
    }

    #[test]
    fn test_released_on_drop() {
        let flight = SingleFlight::new();
        {
            let _guard = flight.try_acquire().unwrap();
        }
        assert!(!flight.is_busy());
        assert!(flight.try_acquire().is_some());
    }

    #[test]
    fn test_clones_share_flag() {
        let flight = SingleFlight::new();
        let other = flight.clone();
        let _guard = flight.try_acquire().unwrap();
        assert!(other.try_acquire().is_none());
    }
}
