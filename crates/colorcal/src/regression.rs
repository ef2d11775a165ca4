//! Multivariate linear regression by batch gradient descent.

use nalgebra::DMatrix;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Fit `W` (`dout x din`) minimizing the mean squared error of
/// `outputs[i] ~ W * inputs[i]` over the rows of `inputs` (`N x din`) and
/// `outputs` (`N x dout`).
///
/// `W` starts at zero and takes `iterations` fixed-size steps along the
/// negative gradient. Returns a zero matrix when there are no samples.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(inputs, outputs), fields(samples = inputs.nrows()))
)]
pub fn solve_linear_regression(
    inputs: &DMatrix<f64>,
    outputs: &DMatrix<f64>,
    iterations: usize,
    step: f64,
) -> DMatrix<f64> {
    let n = inputs.nrows().min(outputs.nrows());
    let mut w = DMatrix::<f64>::zeros(outputs.ncols(), inputs.ncols());
    if n == 0 {
        return w;
    }
    let x = inputs.rows(0, n);
    let y = outputs.rows(0, n);
    let xtx = x.transpose() * x;
    let ytx = y.transpose() * x;
    let scale = 2.0 / n as f64;

    for _ in 0..iterations {
        let grad = (&w * &xtx - &ytx) * scale;
        w -= grad * step;
    }
    w
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn recovers_a_known_linear_map() {
        let truth = DMatrix::from_row_slice(2, 3, &[0.5, -0.2, 0.1, 0.3, 0.9, -0.4]);
        let inputs = DMatrix::from_row_slice(
            5,
            3,
            &[
                1.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, //
                0.0, 0.0, 1.0, //
                0.5, 0.5, 0.0, //
                0.2, 0.3, 0.9,
            ],
        );
        let outputs = &inputs * truth.transpose();
        let w = solve_linear_regression(&inputs, &outputs, 20_000, 0.2);
        assert_eq!(w.shape(), (2, 3));
        assert_relative_eq!(w, truth, epsilon = 1e-6);
    }

    #[test]
    fn no_samples_gives_zero() {
        let w = solve_linear_regression(&DMatrix::zeros(0, 3), &DMatrix::zeros(0, 3), 10, 0.1);
        assert_eq!(w, DMatrix::zeros(3, 3));
    }
}
