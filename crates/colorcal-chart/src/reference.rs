use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Linear-RGB ColorChecker values (0-255), raster order. The last row is
/// the neutral series from white to black.
const MACBETH_LINEAR: [[u8; 3]; 24] = [
    [44, 22, 15],
    [138, 78, 57],
    [31, 50, 86],
    [24, 38, 14],
    [60, 55, 112],
    [35, 130, 103],
    [171, 53, 6],
    [20, 27, 97],
    [136, 26, 32],
    [29, 12, 38],
    [86, 128, 13],
    [190, 93, 7],
    [10, 12, 78],
    [16, 76, 17],
    [109, 9, 12],
    [204, 146, 3],
    [127, 24, 77],
    [1, 60, 91],
    [229, 229, 226],
    [147, 147, 147],
    [90, 90, 90],
    [50, 50, 49],
    [23, 23, 23],
    [9, 9, 9],
];

const NEUTRAL_COUNT: usize = 6;

/// Known colors of a physical chart, one per patch in raster order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceChart {
    pub name: String,
    pub colors: Vec<[u8; 3]>,
}

impl Default for ReferenceChart {
    fn default() -> Self {
        Self::macbeth()
    }
}

impl ReferenceChart {
    /// 24-patch ColorChecker, 6 columns by 4 rows.
    pub fn macbeth() -> Self {
        Self {
            name: "macbeth".to_string(),
            colors: MACBETH_LINEAR.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// First-channel values of the trailing gray patches, darkest first.
    pub fn neutral_series(&self) -> Vec<u8> {
        self.colors
            .iter()
            .rev()
            .take(NEUTRAL_COUNT)
            .map(|c| c[0])
            .collect()
    }

    /// Colors scaled to `[0, 1]`.
    pub fn normalized(&self) -> Vec<Vector3<f32>> {
        self.colors
            .iter()
            .map(|c| Vector3::new(c[0] as f32, c[1] as f32, c[2] as f32) / 255.0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_series_is_darkest_first() {
        let chart = ReferenceChart::macbeth();
        assert_eq!(chart.len(), 24);
        assert_eq!(chart.neutral_series(), vec![9, 23, 50, 90, 147, 229]);
    }

    #[test]
    fn normalized_white_is_near_one() {
        let chart = ReferenceChart::macbeth();
        let white = chart.normalized()[18];
        assert!((white.x - 229.0 / 255.0).abs() < 1e-6);
    }
}
