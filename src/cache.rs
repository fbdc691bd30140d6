use std::time::{Duration, Instant};

/// Where an entity's cached state sits relative to the TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Never fetched or mutated.
    Uninitialized,
    Stale,
    Fresh,
}

/// Decides whether cached entity state can be served without a fetch.
///
/// The same policy backs both the async and the blocking client. A zero TTL
/// disables caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    ttl: Duration,
}

impl CachePolicy {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn freshness(&self, last_updated: Option<Instant>) -> Freshness {
        self.freshness_at(last_updated, Instant::now())
    }

    pub fn freshness_at(&self, last_updated: Option<Instant>, now: Instant) -> Freshness {
        match last_updated {
            None => Freshness::Uninitialized,
            Some(at) if now.saturating_duration_since(at) < self.ttl => Freshness::Fresh,
            Some(_) => Freshness::Stale,
        }
    }

    pub fn needs_refresh(&self, last_updated: Option<Instant>) -> bool {
        self.freshness(last_updated) != Freshness::Fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uninitialized_until_stamped() {
        let policy = CachePolicy::new(Duration::from_secs(3));
        assert_eq!(policy.freshness(None), Freshness::Uninitialized);
        assert!(policy.needs_refresh(None));
    }

    #[test]
    fn fresh_within_ttl_then_stale() {
        let policy = CachePolicy::new(Duration::from_secs(3));
        let stamped = Instant::now();
        assert_eq!(
            policy.freshness_at(Some(stamped), stamped + Duration::from_secs(2)),
            Freshness::Fresh
        );
        assert_eq!(
            policy.freshness_at(Some(stamped), stamped + Duration::from_secs(3)),
            Freshness::Stale
        );
    }

    #[test]
    fn zero_ttl_is_always_stale() {
        let policy = CachePolicy::new(Duration::ZERO);
        let now = Instant::now();
        assert_eq!(policy.freshness_at(Some(now), now), Freshness::Stale);
    }
}
