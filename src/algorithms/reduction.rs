//! Window reduction: tiered accuracy filter followed by a trimmed mean
//!
//! Given every fix collected in one capture window, the reducer picks a
//! working pool by accuracy tier, ranks it best-first, drops the worst
//! fraction as outliers and averages what is left.

use crate::core::{
    CorrectedFix, PoolTier, ReducedCoordinate, HIGH_ACCURACY_THRESHOLD_M, KEEP_FRACTION,
    MID_ACCURACY_THRESHOLD_M, MIN_HIGH_TIER_FIXES,
};
use crate::validation::error::{CaptureError, CaptureResult};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Thresholds controlling pool selection and trimming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReductionPolicy {
    /// Preferred-pool accuracy bar (meters)
    pub high_threshold_m: f64,
    /// Fallback-pool accuracy bar (meters)
    pub mid_threshold_m: f64,
    /// Minimum size of the high tier before it is used
    pub min_high_tier_fixes: usize,
    /// Fraction of the ranked pool that is kept (0, 1]
    pub keep_fraction: f64,
}

impl Default for ReductionPolicy {
    fn default() -> Self {
        Self {
            high_threshold_m: HIGH_ACCURACY_THRESHOLD_M,
            mid_threshold_m: MID_ACCURACY_THRESHOLD_M,
            min_high_tier_fixes: MIN_HIGH_TIER_FIXES,
            keep_fraction: KEEP_FRACTION,
        }
    }
}

/// Turns a window's fix buffer into one coordinate
#[derive(Debug, Clone, Default)]
pub struct Reducer {
    policy: ReductionPolicy,
}

impl Reducer {
    pub fn new(policy: ReductionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ReductionPolicy {
        &self.policy
    }

    /// Reduce the buffer, stamping the result with the current time
    pub fn reduce(&self, fixes: &[CorrectedFix]) -> CaptureResult<ReducedCoordinate> {
        self.reduce_at(fixes, Utc::now())
    }

    /// Reduce the buffer with an explicit production time
    pub fn reduce_at(
        &self,
        fixes: &[CorrectedFix],
        produced_at: DateTime<Utc>,
    ) -> CaptureResult<ReducedCoordinate> {
        if fixes.is_empty() {
            return Err(CaptureError::NoData);
        }

        let (pool_tier, mut pool) = self.select_pool(fixes);
        if pool_tier.is_degraded() {
            warn!(
                "no fix within {} m, reducing over all {} fixes",
                self.policy.mid_threshold_m,
                fixes.len()
            );
        }

        // Stable: equal accuracies keep arrival order
        pool.sort_by(|a, b| a.rank_accuracy().total_cmp(&b.rank_accuracy()));
        let kept = &pool[..self.keep_count(pool.len())];

        let n = kept.len() as f64;
        let centroid = kept
            .iter()
            .map(|f| Vector2::new(f.lat(), f.lon()))
            .sum::<Vector2<f64>>()
            / n;

        let accuracy_m = mean(kept.iter().filter_map(|f| f.accuracy_m()));
        let orthometric_altitude_m = mean(kept.iter().filter_map(|f| f.orthometric_altitude_m));

        debug!(
            "reduced {} fixes ({:?} pool of {}, kept {}) to ({:.7}, {:.7})",
            fixes.len(),
            pool_tier,
            pool.len(),
            kept.len(),
            centroid.x,
            centroid.y
        );

        Ok(ReducedCoordinate {
            lat: centroid.x,
            lon: centroid.y,
            accuracy_m,
            orthometric_altitude_m,
            produced_at,
            sample_count: fixes.len(),
            pool_tier,
            kept_count: kept.len(),
        })
    }

    /// Choose the working pool by accuracy tier. Arrival order is preserved.
    pub fn select_pool<'a>(&self, fixes: &'a [CorrectedFix]) -> (PoolTier, Vec<&'a CorrectedFix>) {
        let high: Vec<&CorrectedFix> = fixes
            .iter()
            .filter(|f| f.rank_accuracy() <= self.policy.high_threshold_m)
            .collect();
        if high.len() >= self.policy.min_high_tier_fixes {
            return (PoolTier::High, high);
        }

        let medium: Vec<&CorrectedFix> = fixes
            .iter()
            .filter(|f| f.rank_accuracy() <= self.policy.mid_threshold_m)
            .collect();
        if !medium.is_empty() {
            return (PoolTier::Medium, medium);
        }

        (PoolTier::Degraded, fixes.iter().collect())
    }

    /// Number of ranked fixes kept from a pool of the given size (never zero)
    pub fn keep_count(&self, pool_len: usize) -> usize {
        ((pool_len as f64 * self.policy.keep_fraction).floor() as usize).max(1)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count > 0 {
        Some(sum / count as f64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RawFix;
    use chrono::TimeZone;

    const EPS: f64 = 1e-9;

    fn fix(lat: f64, lon: f64, accuracy: Option<f64>, altitude: Option<f64>) -> CorrectedFix {
        CorrectedFix {
            raw: RawFix {
                lat,
                lon,
                accuracy_m: accuracy,
                ellipsoidal_altitude_m: altitude,
                timestamp_ms: 0,
            },
            undulation_m: 0.0,
            orthometric_altitude_m: altitude,
        }
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    #[test]
    fn test_empty_buffer_fails() {
        let reducer = Reducer::default();
        assert_eq!(reducer.reduce(&[]), Err(CaptureError::NoData));
    }

    #[test]
    fn test_singleton_is_identity() {
        let reducer = Reducer::default();
        let single = fix(39.92077, 32.85411, Some(7.5), Some(880.0));
        let result = reducer.reduce(&[single]).unwrap();

        assert_eq!(result.lat, 39.92077);
        assert_eq!(result.lon, 32.85411);
        assert_eq!(result.accuracy_m, Some(7.5));
        assert_eq!(result.orthometric_altitude_m, Some(880.0));
        assert_eq!(result.kept_count, 1);
    }

    #[test]
    fn test_keep_count() {
        let reducer = Reducer::default();
        assert_eq!(reducer.keep_count(1), 1);
        assert_eq!(reducer.keep_count(2), 1);
        assert_eq!(reducer.keep_count(3), 2);
        assert_eq!(reducer.keep_count(5), 4);
        assert_eq!(reducer.keep_count(10), 8);
    }

    #[test]
    fn test_high_tier_with_outlier() {
        // 40 m misses the high bar, leaving four high-tier fixes; 80% of four keeps three
        let reducer = Reducer::default();
        let fixes = vec![
            fix(10.0, 20.0, Some(12.0), Some(100.0)),
            fix(10.3, 20.3, Some(40.0), Some(400.0)),
            fix(10.1, 20.1, Some(3.0), Some(110.0)),
            fix(10.2, 20.2, Some(8.0), Some(120.0)),
            fix(10.4, 20.4, Some(5.0), Some(130.0)),
        ];
        let result = reducer.reduce(&fixes).unwrap();

        assert_eq!(result.pool_tier, PoolTier::High);
        assert_eq!(result.sample_count, 5);
        assert_eq!(result.kept_count, 3);
        // Kept: 3 m, 5 m, 8 m
        assert!((result.lat - (10.1 + 10.4 + 10.2) / 3.0).abs() < EPS);
        assert!((result.lon - (20.1 + 20.4 + 20.2) / 3.0).abs() < EPS);
        assert!((result.accuracy_m.unwrap() - 16.0 / 3.0).abs() < EPS);
        assert!((result.orthometric_altitude_m.unwrap() - 120.0).abs() < EPS);
    }

    #[test]
    fn test_all_high_tier_only_trims() {
        let reducer = Reducer::default();
        let fixes: Vec<CorrectedFix> = [3.0, 5.0, 8.0, 12.0, 19.0]
            .iter()
            .enumerate()
            .map(|(i, &acc)| fix(i as f64, i as f64, Some(acc), None))
            .collect();

        let (tier, pool) = reducer.select_pool(&fixes);
        assert_eq!(tier, PoolTier::High);
        assert_eq!(pool.len(), fixes.len());

        let result = reducer.reduce(&fixes).unwrap();
        assert_eq!(result.kept_count, 4);
        assert!((result.lat - 1.5).abs() < EPS);
        assert!((result.accuracy_m.unwrap() - 7.0).abs() < EPS);
        assert!(result.orthometric_altitude_m.is_none());
    }

    #[test]
    fn test_medium_tier_fallback() {
        let reducer = Reducer::default();
        let fixes = vec![
            fix(1.0, 1.0, Some(45.0), Some(10.0)),
            fix(2.0, 2.0, Some(60.0), Some(20.0)),
            fix(3.0, 3.0, Some(30.0), Some(30.0)),
        ];
        let result = reducer.reduce(&fixes).unwrap();

        assert_eq!(result.pool_tier, PoolTier::Medium);
        assert_eq!(result.kept_count, 2);
        assert!((result.lat - 2.0).abs() < EPS);
        assert!((result.accuracy_m.unwrap() - 37.5).abs() < EPS);
        assert!((result.orthometric_altitude_m.unwrap() - 20.0).abs() < EPS);
    }

    #[test]
    fn test_single_high_fix_falls_to_medium() {
        // One high-tier fix is not enough; the medium pool includes it
        let reducer = Reducer::default();
        let fixes = vec![
            fix(1.0, 1.0, Some(4.0), None),
            fix(2.0, 2.0, Some(70.0), None),
            fix(3.0, 3.0, Some(250.0), None),
        ];
        let (tier, pool) = reducer.select_pool(&fixes);
        assert_eq!(tier, PoolTier::Medium);
        assert_eq!(pool.len(), 2);

        let result = reducer.reduce(&fixes).unwrap();
        assert_eq!(result.kept_count, 1);
        assert_eq!(result.lat, 1.0);
    }

    #[test]
    fn test_degraded_pool() {
        let reducer = Reducer::default();
        let fixes = vec![fix(38.5, 27.1, Some(500.0), Some(42.0))];
        let result = reducer.reduce(&fixes).unwrap();

        assert_eq!(result.pool_tier, PoolTier::Degraded);
        assert_eq!(result.lat, 38.5);
        assert_eq!(result.lon, 27.1);
        assert_eq!(result.accuracy_m, Some(500.0));
        assert_eq!(result.orthometric_altitude_m, Some(42.0));
    }

    #[test]
    fn test_missing_accuracy_ranks_last() {
        let reducer = Reducer::default();
        let fixes = vec![
            fix(9.0, 9.0, None, None),
            fix(1.0, 1.0, Some(300.0), None),
            fix(2.0, 2.0, Some(200.0), None),
        ];
        let result = reducer.reduce(&fixes).unwrap();

        assert_eq!(result.pool_tier, PoolTier::Degraded);
        assert_eq!(result.kept_count, 2);
        assert!((result.lat - 1.5).abs() < EPS);
        assert!((result.accuracy_m.unwrap() - 250.0).abs() < EPS);
    }

    #[test]
    fn test_only_missing_accuracy() {
        let reducer = Reducer::default();
        let result = reducer.reduce(&[fix(5.0, 6.0, None, None)]).unwrap();
        assert_eq!(result.pool_tier, PoolTier::Degraded);
        assert!(result.accuracy_m.is_none());
    }

    #[test]
    fn test_missing_altitude_excluded_from_altitude_mean_only() {
        let reducer = Reducer::default();
        let fixes = vec![
            fix(1.0, 1.0, Some(5.0), Some(100.0)),
            fix(3.0, 3.0, Some(5.0), None),
            fix(5.0, 5.0, Some(5.0), Some(200.0)),
            fix(7.0, 7.0, Some(5.0), None),
            fix(9.0, 9.0, Some(6.0), Some(900.0)),
        ];
        let result = reducer.reduce(&fixes).unwrap();

        assert_eq!(result.kept_count, 4);
        assert!((result.lat - 4.0).abs() < EPS);
        assert!((result.orthometric_altitude_m.unwrap() - 150.0).abs() < EPS);
    }

    #[test]
    fn test_ties_keep_arrival_order() {
        let reducer = Reducer::default();
        let fixes = vec![
            fix(1.0, 0.0, Some(10.0), None),
            fix(2.0, 0.0, Some(10.0), None),
            fix(3.0, 0.0, Some(10.0), None),
        ];
        // keep 2 of 3 equal-accuracy fixes: the first two to arrive
        let result = reducer.reduce(&fixes).unwrap();
        assert!((result.lat - 1.5).abs() < EPS);
    }

    #[test]
    fn test_reduction_is_deterministic() {
        let reducer = Reducer::default();
        let fixes = vec![
            fix(41.0151, 28.9795, Some(14.0), Some(50.0)),
            fix(41.0153, 28.9791, Some(9.0), None),
            fix(41.0149, 28.9799, Some(22.0), Some(55.0)),
            fix(41.0150, 28.9794, Some(6.0), Some(52.0)),
        ];
        let a = reducer.reduce_at(&fixes, fixed_time()).unwrap();
        let b = reducer.reduce_at(&fixes, fixed_time()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_custom_policy() {
        let reducer = Reducer::new(ReductionPolicy {
            high_threshold_m: 25.0,
            keep_fraction: 1.0,
            ..ReductionPolicy::default()
        });
        let fixes = vec![
            fix(1.0, 1.0, Some(24.0), None),
            fix(3.0, 3.0, Some(22.0), None),
        ];
        let result = reducer.reduce(&fixes).unwrap();
        assert_eq!(result.pool_tier, PoolTier::High);
        assert_eq!(result.kept_count, 2);
        assert!((result.lat - 2.0).abs() < EPS);
    }
}
