use crate::{CalibError, ColorResponse};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Everything an ISP needs to reproduce the calibrated color pipeline.
/// Values are normalized to `[0, 1]` where they are levels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationParameters {
    pub black_level: [f32; 3],
    pub white_balance_gain: [f32; 3],
    pub clamp_min: [f32; 3],
    pub clamp_max: [f32; 3],
    /// Row-major.
    pub ccm: [[f32; 3]; 3],
    pub gamma: [f32; 3],
}

impl Default for CalibrationParameters {
    fn default() -> Self {
        Self {
            black_level: [0.0; 3],
            white_balance_gain: [1.0; 3],
            clamp_min: [0.0; 3],
            clamp_max: [1.0; 3],
            ccm: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            gamma: [1.0; 3],
        }
    }
}

impl CalibrationParameters {
    pub fn ccm_matrix(&self) -> Matrix3<f32> {
        Matrix3::from_fn(|r, c| self.ccm[r][c])
    }

    pub fn set_ccm(&mut self, m: &Matrix3<f32>) {
        for (r, row) in self.ccm.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = m[(r, c)];
            }
        }
    }
}

pub(crate) fn to_array(v: &Vector3<f32>) -> [f32; 3] {
    [v.x, v.y, v.z]
}

fn format_triple(v: &[f32; 3]) -> String {
    format!("[{}, {}, {}]", v[0], v[1], v[2])
}

/// Write `[r, g, b]` to `path`.
pub fn write_black_level(path: impl AsRef<Path>, black_level: &[f32; 3]) -> Result<(), CalibError> {
    fs::write(path, format_triple(black_level))?;
    Ok(())
}

/// Write `[[min r, g, b],[max r, g, b]]` x-intercepts of `response` to `path`.
pub fn write_intercept_x(path: impl AsRef<Path>, response: &ColorResponse) -> Result<(), CalibError> {
    let text = format!(
        "[{},{}]",
        format_triple(&to_array(&response.intercept_x_min)),
        format_triple(&to_array(&response.intercept_x_max))
    );
    fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_a_no_op_pipeline() {
        let p = CalibrationParameters::default();
        assert_eq!(p.ccm_matrix(), Matrix3::identity());
        assert_eq!(p.white_balance_gain, [1.0; 3]);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let p: CalibrationParameters =
            serde_json::from_str(r#"{ "black_level": [0.03, 0.03, 0.031] }"#).unwrap();
        assert_eq!(p.black_level, [0.03, 0.03, 0.031]);
        assert_eq!(p.gamma, [1.0; 3]);
    }

    #[test]
    fn text_files_use_bracketed_triples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("black_level.txt");
        write_black_level(&path, &[0.25, 0.5, 1.0]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[0.25, 0.5, 1]");

        let response = ColorResponse::from_anchors(
            0.0,
            Vector3::new(-0.5, -0.25, -1.0),
            1.0,
            Vector3::new(0.5, 0.75, 1.0),
        );
        let path = dir.path().join("intercept_x.txt");
        write_intercept_x(&path, &response).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "[[0.5, 0.25, 0.5],[1.5, 1.25, 1]]"
        );
    }

    #[test]
    fn ccm_round_trips_through_rows() {
        let m = Matrix3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0);
        let mut p = CalibrationParameters::default();
        p.set_ccm(&m);
        assert_eq!(p.ccm[1], [4.0, 5.0, 6.0]);
        assert_eq!(p.ccm_matrix(), m);
    }
}
