//! Node pool utilization math

use crate::models::NodePoolUsage;

/// Percentage of the autoscaling ceiling in use; 0 when there is no ceiling.
///
/// Not rounded. Rounding to two decimals happens only when logging.
pub fn usage_percent(current_node_count: u64, max_node_count: u32) -> f64 {
    if max_node_count == 0 {
        return 0.0;
    }
    current_node_count as f64 / max_node_count as f64 * 100.0
}

impl NodePoolUsage {
    pub fn compute(current_node_count: u64, max_node_count: u32) -> Self {
        Self {
            current_node_count,
            max_node_count,
            usage_percent: usage_percent(current_node_count, max_node_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_percent() {
        assert!((usage_percent(7, 10) - 70.0).abs() < 1e-9);
        assert!((usage_percent(1, 3) - 33.333_333_333).abs() < 1e-6);
        assert!((usage_percent(12, 10) - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_usage_percent_matches_formula() {
        for max in 1..50u32 {
            for current in 0..60u64 {
                let expected = current as f64 / max as f64 * 100.0;
                assert!((usage_percent(current, max) - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_zero_ceiling_is_zero_percent() {
        assert_eq!(usage_percent(0, 0), 0.0);
        assert_eq!(usage_percent(5, 0), 0.0);
    }

    #[test]
    fn test_compute_usage() {
        let usage = NodePoolUsage::compute(3, 4);
        assert_eq!(usage.current_node_count, 3);
        assert_eq!(usage.max_node_count, 4);
        assert!((usage.usage_percent - 75.0).abs() < 1e-9);
    }
}
