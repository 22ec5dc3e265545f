//! Vice geometry and parallel plate selection.
//!
//! Heights are measured upward from the machine table. The part rests on
//! `base_height + plate_height` and is gripped by the jaws up to
//! `base_height + jaw_height`.

use tracing::debug;

/// A machine vice, optionally with a parallel plate under the part
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vice {
    max_opening: f64,
    jaw_height: f64,
    base_height: f64,
    plate_height: Option<f64>,
}

impl Default for Vice {
    fn default() -> Self {
        Self {
            max_opening: 6.0,
            jaw_height: 1.75,
            base_height: 0.0,
            plate_height: None,
        }
    }
}

impl Vice {
    pub fn new(max_opening: f64, jaw_height: f64, base_height: f64) -> Self {
        Self {
            max_opening,
            jaw_height,
            base_height,
            plate_height: None,
        }
    }

    pub fn with_plate(mut self, height: f64) -> Self {
        self.plate_height = (height > 0.0).then_some(height);
        self
    }

    pub fn without_plate(mut self) -> Self {
        self.plate_height = None;
        self
    }

    pub fn max_opening(&self) -> f64 {
        self.max_opening
    }

    pub fn jaw_height(&self) -> f64 {
        self.jaw_height
    }

    pub fn base_height(&self) -> f64 {
        self.base_height
    }

    pub fn plate(&self) -> Option<f64> {
        self.plate_height
    }

    /// Plate height, zero without a plate
    pub fn plate_height(&self) -> f64 {
        self.plate_height.unwrap_or(0.0)
    }

    /// Height the part rests on
    pub fn part_floor(&self) -> f64 {
        self.base_height + self.plate_height()
    }

    pub fn jaw_top(&self) -> f64 {
        self.base_height + self.jaw_height
    }

    /// How much of the part sits between the jaws
    pub fn grip_depth(&self) -> f64 {
        self.jaw_height - self.plate_height()
    }

    /// How far a part of `part_height` sticks out above the jaws
    pub fn protrusion(&self, part_height: f64) -> f64 {
        self.plate_height() + part_height - self.jaw_height
    }

    /// A part spanning `span` between its clamp faces fits between the jaws
    pub fn fits_opening(&self, span: f64, tolerance: f64) -> bool {
        span <= self.max_opening + tolerance
    }
}

/// A vice and the parallel plates available for it
#[derive(Debug, Clone, PartialEq)]
pub struct ViceSetup {
    vice: Vice,
    plates: Vec<f64>,
    min_grip_depth: f64,
    min_protrusion: f64,
}

impl Default for ViceSetup {
    fn default() -> Self {
        Self::new(Vice::default(), Vec::new())
    }
}

impl ViceSetup {
    /// Plates that are not positive and finite are ignored
    pub fn new(vice: Vice, plates: impl IntoIterator<Item = f64>) -> Self {
        let mut plates: Vec<f64> = plates.into_iter().filter(|h| h.is_finite() && *h > 0.0).collect();
        plates.sort_by(f64::total_cmp);
        plates.dedup_by(|a, b| (*a - *b).abs() <= 1e-9);
        Self {
            vice: vice.without_plate(),
            plates,
            min_grip_depth: 0.1,
            min_protrusion: 0.1,
        }
    }

    pub fn with_min_grip_depth(mut self, depth: f64) -> Self {
        self.min_grip_depth = depth;
        self
    }

    pub fn with_min_protrusion(mut self, height: f64) -> Self {
        self.min_protrusion = height;
        self
    }

    pub fn vice(&self) -> &Vice {
        &self.vice
    }

    /// Available plate heights, ascending
    pub fn plates(&self) -> &[f64] {
        &self.plates
    }

    pub fn min_grip_depth(&self) -> f64 {
        self.min_grip_depth
    }

    pub fn min_protrusion(&self) -> f64 {
        self.min_protrusion
    }

    /// Vice configurations that hold a part of `part_height`, highest plate first.
    ///
    /// Running without a plate is a candidate like any other.
    pub fn feasible_vices(&self, part_height: f64) -> Vec<Vice> {
        let mut out: Vec<Vice> = self
            .plates
            .iter()
            .rev()
            .map(|&h| self.vice.with_plate(h))
            .chain(std::iter::once(self.vice))
            .filter(|v| v.grip_depth() >= self.min_grip_depth && v.protrusion(part_height) >= self.min_protrusion)
            .collect();
        out.dedup_by(|a, b| a.plate_height() == b.plate_height());
        debug!(
            "{} of {} vice configurations hold a part {:.3} tall",
            out.len(),
            self.plates.len() + 1,
            part_height
        );
        out
    }

    /// Highest plate that still holds the part
    pub fn best_vice(&self, part_height: f64) -> Option<Vice> {
        self.feasible_vices(part_height).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vice_heights() {
        let vice = Vice::new(6.0, 2.0, 1.0).with_plate(0.5);
        assert_eq!(vice.part_floor(), 1.5);
        assert_eq!(vice.jaw_top(), 3.0);
        assert_eq!(vice.grip_depth(), 1.5);
        assert_eq!(vice.protrusion(4.0), 2.5);
        assert!(vice.fits_opening(6.0, 1e-3));
        assert!(!vice.fits_opening(6.1, 1e-3));
        assert_eq!(Vice::default().with_plate(0.0).plate(), None);
    }

    #[test]
    fn test_plates_are_cleaned() {
        let setup = ViceSetup::new(Vice::default(), [0.7, 0.5, -1.0, 0.5, f64::NAN]);
        assert_eq!(setup.plates(), &[0.5, 0.7]);
    }

    #[test]
    fn test_highest_feasible_plate_wins() {
        let setup = ViceSetup::new(Vice::new(6.0, 1.0, 0.0), [0.5, 0.7]);
        let best = setup.best_vice(4.0).unwrap();
        assert_eq!(best.plate(), Some(0.7));
        let heights: Vec<f64> = setup.feasible_vices(4.0).iter().map(|v| v.plate_height()).collect();
        assert_eq!(heights, vec![0.7, 0.5, 0.0]);
    }

    #[test]
    fn test_grip_and_protrusion_limits() {
        let setup = ViceSetup::new(Vice::new(6.0, 1.0, 0.0), [0.5, 0.95]).with_min_grip_depth(0.2);
        // The 0.95 plate leaves too little in the jaws.
        assert_eq!(setup.best_vice(4.0).unwrap().plate(), Some(0.5));
        // A short part needs the plate to clear the jaws.
        let heights: Vec<f64> = setup.feasible_vices(0.8).iter().map(|v| v.plate_height()).collect();
        assert_eq!(heights, vec![0.5]);
        assert!(setup.best_vice(0.1).is_none());
    }
}
