//! Filler-content cadence.
//!
//! Every Nth successfully published regular item is followed by a filler
//! cycle on the next run: an evergreen freight-logistics piece instead of a
//! news item. The counter only counts regular items; filler publications
//! never advance it, so the cadence cannot drift.

use rand::Rng;
use rand::seq::SliceRandom;

/// Whether the next cycle should produce filler instead of news.
///
/// `count` is the number of regular items published so far. The very first
/// cycle (count 0) is never a filler cycle.
pub fn is_filler_cycle(count: u64, interval: u64) -> bool {
    interval > 0 && count > 0 && count % interval == 0
}

/// Draw a filler topic uniformly from `pool`, excluding topics already in
/// `log`. When every topic has been used, the full pool is eligible again.
/// Returns `None` only for an empty pool.
pub fn pick_topic<R: Rng>(pool: &[String], log: &[String], rng: &mut R) -> Option<String> {
    if pool.is_empty() {
        return None;
    }

    let available: Vec<&String> = pool.iter().filter(|t| !log.contains(t)).collect();
    if available.is_empty() {
        tracing::warn!("filler topic pool exhausted, drawing from full pool");
        return pool.choose(rng).cloned();
    }
    available.choose(rng).map(|t| (*t).clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn cadence_boundaries() {
        for (count, expected) in [
            (0, false),
            (1, false),
            (5, false),
            (6, true),
            (7, false),
            (12, true),
            (18, true),
        ] {
            assert_eq!(is_filler_cycle(count, 6), expected, "count {count}");
        }
    }

    #[test]
    fn zero_interval_never_fires() {
        assert!(!is_filler_cycle(6, 0));
    }

    #[test]
    fn pick_excludes_logged_topics() {
        let pool: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        let log: Vec<String> = vec!["a".into(), "c".into()];
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(pick_topic(&pool, &log, &mut rng).as_deref(), Some("b"));
        }
    }

    #[test]
    fn exhausted_pool_falls_back_to_full_pool() {
        let pool: Vec<String> = vec!["a".into(), "b".into()];
        let log = pool.clone();
        let mut rng = StdRng::seed_from_u64(7);
        let picked = pick_topic(&pool, &log, &mut rng).expect("fallback pick");
        assert!(pool.contains(&picked));
    }

    #[test]
    fn empty_pool_yields_none() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(pick_topic(&[], &[], &mut rng), None);
    }

    #[test]
    fn seeded_pick_is_reproducible() {
        let pool: Vec<String> = (0..10).map(|i| format!("topic-{i}")).collect();
        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);
        assert_eq!(
            pick_topic(&pool, &[], &mut rng_a),
            pick_topic(&pool, &[], &mut rng_b)
        );
    }
}
