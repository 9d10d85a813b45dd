// Per-IP sliding-window rate limiting for contact submissions. The window
// map is bounded (LRU) and check-and-increment runs as one critical section,
// so concurrent submissions from the same address cannot exceed the cap.

use std::collections::VecDeque;
use std::net::IpAddr;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

pub struct RateLimiter {
    max_events: u32,
    window: Duration,
    entries: Mutex<LruCache<IpAddr, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_events: u32, window: Duration, capacity: usize) -> Self {
        Self {
            max_events,
            window,
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity.max(1)).unwrap(),
            )),
        }
    }

    /// Record one event for the address if it is still under the cap.
    /// Returns false (and records nothing) once the cap is reached.
    pub fn try_acquire(&self, addr: IpAddr) -> bool {
        self.try_acquire_at(addr, Instant::now())
    }

    pub fn try_acquire_at(&self, addr: IpAddr, now: Instant) -> bool {
        let mut entries = self.entries.lock().expect("rate limiter lock poisoned");
        let window = self.window;
        if !entries.contains(&addr) {
            entries.put(addr, VecDeque::new());
        }
        let events = entries.get_mut(&addr).expect("entry just inserted");

        while let Some(&front) = events.front() {
            if now.duration_since(front) >= window {
                events.pop_front();
            } else {
                break;
            }
        }

        if events.len() >= self.max_events as usize {
            return false;
        }
        events.push_back(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn caps_at_max_events() {
        let limiter = RateLimiter::new(10, Duration::from_secs(3600), 64);
        let now = Instant::now();
        for _ in 0..10 {
            assert!(limiter.try_acquire_at(ip(1), now));
        }
        assert!(!limiter.try_acquire_at(ip(1), now));
    }

    #[test]
    fn window_elapse_frees_capacity() {
        let limiter = RateLimiter::new(10, Duration::from_secs(3600), 64);
        let start = Instant::now();
        for _ in 0..10 {
            assert!(limiter.try_acquire_at(ip(2), start));
        }
        assert!(!limiter.try_acquire_at(ip(2), start + Duration::from_secs(10)));
        assert!(limiter.try_acquire_at(ip(2), start + Duration::from_secs(3601)));
    }

    #[test]
    fn addresses_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(3600), 64);
        let now = Instant::now();
        assert!(limiter.try_acquire_at(ip(3), now));
        assert!(!limiter.try_acquire_at(ip(3), now));
        assert!(limiter.try_acquire_at(ip(4), now));
    }
}
