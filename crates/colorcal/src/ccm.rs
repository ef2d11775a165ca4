use crate::regression::solve_linear_regression;
use crate::CalibError;
use colorcal_chart::{patch_medians, ColorPatch, ReferenceChart};
use nalgebra::{DMatrix, Matrix3, Vector3};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Gradient-descent schedule of the matrix regression.
const ITERATIONS: usize = 100_000;
const STEP: f64 = 0.1;

/// Regresses the 3x3 matrix taking measured patch colors to reference colors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ColorMatrixSolver;

impl ColorMatrixSolver {
    /// Solve on ordered, measured patches against `chart` (normalized to `[0, 1]`).
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, patches, chart), fields(patches = patches.len()))
    )]
    pub fn solve(
        &self,
        patches: &[ColorPatch],
        chart: &ReferenceChart,
    ) -> Result<Matrix3<f32>, CalibError> {
        if patches.len() != chart.len() {
            return Err(CalibError::CountMismatch {
                patches: patches.len(),
                reference: chart.len(),
            });
        }
        let measured = patch_medians(patches)?;
        let ccm = self.solve_pairs(&measured, &chart.normalized())?;
        log::info!("ccm {:?}", ccm.row_iter().map(|r| [r[0], r[1], r[2]]).collect::<Vec<_>>());
        Ok(ccm)
    }

    /// `measured[i]` is the regressor and `reference[i]` the target.
    pub fn solve_pairs(
        &self,
        measured: &[Vector3<f32>],
        reference: &[Vector3<f32>],
    ) -> Result<Matrix3<f32>, CalibError> {
        let n = measured.len().min(reference.len());
        let inputs = DMatrix::from_fn(n, 3, |i, j| measured[i][j] as f64);
        let outputs = DMatrix::from_fn(n, 3, |i, j| reference[i][j] as f64);
        let w = solve_linear_regression(&inputs, &outputs, ITERATIONS, STEP);
        if w.shape() != (3, 3) {
            return Err(CalibError::DimensionMismatch {
                rows: w.nrows(),
                cols: w.ncols(),
            });
        }
        Ok(Matrix3::from_fn(|r, c| w[(r, c)] as f32))
    }
}
