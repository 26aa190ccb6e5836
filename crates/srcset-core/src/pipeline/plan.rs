//! Derivative width planning. Pure functions, no I/O.

/// Widths to produce for one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidthPlan {
    /// Responsive widths, ascending and unique, none above the intrinsic width
    pub responsive: Vec<u32>,
    /// Width of the unsuffixed full-size derivative
    pub full: u32,
}

impl WidthPlan {
    /// Plan widths for a source of `intrinsic_width` pixels.
    ///
    /// Targets wider than the source collapse to the source width, so a 1200px
    /// photo with targets `[960, 1440, 1920]` yields `[960, 1200]`.
    pub fn new(intrinsic_width: u32, target_widths: &[u32], max_full_width: u32) -> Self {
        let mut responsive: Vec<u32> = target_widths
            .iter()
            .map(|&w| w.min(intrinsic_width))
            .filter(|&w| w > 0)
            .collect();
        responsive.sort_unstable();
        responsive.dedup();

        Self {
            responsive,
            full: max_full_width.min(intrinsic_width),
        }
    }

    /// Every distinct width that needs a resized copy of the source.
    pub fn distinct_widths(&self) -> Vec<u32> {
        let mut widths = self.responsive.clone();
        if !widths.contains(&self.full) {
            widths.push(self.full);
            widths.sort_unstable();
        }
        widths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_large_source_keeps_all_targets() {
        let plan = WidthPlan::new(2400, &[960, 1440, 1920], 1920);
        assert_eq!(plan.responsive, vec![960, 1440, 1920]);
        assert_eq!(plan.full, 1920);
        assert_eq!(plan.distinct_widths(), vec![960, 1440, 1920]);
    }

    #[test]
    fn test_small_source_clamps_and_dedups() {
        let plan = WidthPlan::new(1200, &[960, 1440, 1920], 1920);
        assert_eq!(plan.responsive, vec![960, 1200]);
        assert_eq!(plan.full, 1200);
    }

    #[test]
    fn test_unordered_targets_are_sorted() {
        let plan = WidthPlan::new(5000, &[1920, 640, 1280], 2560);
        assert_eq!(plan.responsive, vec![640, 1280, 1920]);
        assert_eq!(plan.distinct_widths(), vec![640, 1280, 1920, 2560]);
    }

    #[test]
    fn test_never_exceeds_intrinsic() {
        for intrinsic in [1, 500, 959, 960, 961, 3000] {
            let plan = WidthPlan::new(intrinsic, &[960, 1440, 1920], 1920);
            assert!(plan.responsive.iter().all(|&w| w <= intrinsic));
            assert_eq!(plan.full, intrinsic.min(1920));
        }
    }
}
