//! Integer category weights and the weighted draw.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::content::ContentCategory;

/// Points per unit of configured weight. Keeps proportional scaling in
/// integers with two decimal places of headroom.
pub const WEIGHT_SCALE: u64 = 100;

/// Category → weight points.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryWeights {
    points: BTreeMap<ContentCategory, u64>,
}

impl CategoryWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a weight in configured units.
    pub fn set(&mut self, category: ContentCategory, weight: u32) {
        self.points.insert(category, weight as u64 * WEIGHT_SCALE);
    }

    /// Add configured units to a category.
    pub fn add(&mut self, category: ContentCategory, weight: u32) {
        *self.points.entry(category).or_insert(0) += weight as u64 * WEIGHT_SCALE;
    }

    pub fn points(&self, category: ContentCategory) -> u64 {
        self.points.get(&category).copied().unwrap_or(0)
    }

    /// Weight in configured units (points / scale).
    pub fn weight(&self, category: ContentCategory) -> f64 {
        self.points(category) as f64 / WEIGHT_SCALE as f64
    }

    pub fn total(&self) -> u64 {
        self.points.values().sum()
    }

    /// Share of the total in percent.
    pub fn share(&self, category: ContentCategory) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.points(category) as f64 * 100.0 / total as f64
        }
    }

    /// Multiply one category's weight, rounding to the nearest point.
    pub fn scale(&mut self, category: ContentCategory, multiplier: f64) {
        if let Some(points) = self.points.get_mut(&category) {
            *points = (*points as f64 * multiplier.max(0.0)).round() as u64;
        }
    }

    /// Raise `category` to `percent` of the current total, scaling every
    /// other category down proportionally so the total is preserved.
    /// A category already at or above the target is left alone.
    pub fn raise_to_share(&mut self, category: ContentCategory, percent: u32) {
        let percent = percent.min(100) as u128;
        let total = self.total() as u128;
        let current = self.points(category) as u128;
        let target = total * percent / 100;
        if current >= target {
            return;
        }

        let others = total - current;
        let remaining = total - target;
        for (c, points) in self.points.iter_mut() {
            if *c != category && others > 0 {
                *points = (*points as u128 * remaining / others) as u64;
            }
        }
        self.points.insert(category, target as u64);
    }

    pub fn retain(&mut self, mut keep: impl FnMut(ContentCategory) -> bool) {
        self.points.retain(|c, _| keep(*c));
    }

    pub fn categories(&self) -> impl Iterator<Item = ContentCategory> + '_ {
        self.points.keys().copied()
    }

    /// Per-category weight in configured units.
    pub fn as_map(&self) -> BTreeMap<ContentCategory, f64> {
        self.points
            .keys()
            .map(|c| (*c, self.weight(*c)))
            .collect()
    }

    /// Draw a uniform integer in `[0, total)` and walk the cumulative bands.
    /// `None` when every weight is zero.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<ContentCategory> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let mut ticket = rng.gen_range(0..total);
        for (category, points) in &self.points {
            if ticket < *points {
                return Some(*category);
            }
            ticket -= points;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Mcg128Xsl64;

    fn base() -> CategoryWeights {
        let mut w = CategoryWeights::new();
        w.set(ContentCategory::Reflection, 40);
        w.set(ContentCategory::TimeAlternative, 30);
        w.set(ContentCategory::Breathing, 20);
        w.set(ContentCategory::UsageStats, 10);
        w
    }

    #[test]
    fn test_raise_scales_others_proportionally() {
        let mut w = base();
        w.raise_to_share(ContentCategory::Breathing, 50);

        assert_eq!(w.weight(ContentCategory::Breathing), 50.0);
        assert_eq!(w.weight(ContentCategory::Reflection), 25.0);
        assert_eq!(w.weight(ContentCategory::TimeAlternative), 18.75);
        assert_eq!(w.weight(ContentCategory::UsageStats), 6.25);
        assert_eq!(w.total(), 100 * WEIGHT_SCALE);
    }

    #[test]
    fn test_raise_never_lowers() {
        let mut w = base();
        w.raise_to_share(ContentCategory::Reflection, 30);
        assert_eq!(w, base());
    }

    #[test]
    fn test_scale_and_share() {
        let mut w = base();
        w.scale(ContentCategory::UsageStats, 2.0);
        assert_eq!(w.weight(ContentCategory::UsageStats), 20.0);
        assert!((w.share(ContentCategory::UsageStats) - 20.0 / 110.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_draw_skips_zero_weight() {
        let mut w = CategoryWeights::new();
        w.set(ContentCategory::Reflection, 0);
        w.set(ContentCategory::Quote, 1);
        let mut rng = Mcg128Xsl64::seed_from_u64(7);
        for _ in 0..200 {
            assert_eq!(w.draw(&mut rng), Some(ContentCategory::Quote));
        }
    }

    #[test]
    fn test_draw_empty_is_none() {
        let mut rng = Mcg128Xsl64::seed_from_u64(7);
        assert_eq!(CategoryWeights::new().draw(&mut rng), None);
    }

    #[test]
    fn test_draw_frequencies_follow_weights() {
        let w = base();
        let mut rng = Mcg128Xsl64::seed_from_u64(42);
        let mut reflection = 0;
        for _ in 0..10_000 {
            if w.draw(&mut rng) == Some(ContentCategory::Reflection) {
                reflection += 1;
            }
        }
        assert!((3_600..4_400).contains(&reflection), "got {reflection}");
    }
}
