use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Singular values below this are treated as zero in the least-squares solve.
const SVD_EPSILON: f64 = 1e-12;

/// Least-squares polynomial in a shifted basis.
///
/// `coefficients[i]` multiplies `(x - shift)^i`. The shift is the mean of
/// the fitted x values, which keeps the design matrix well conditioned for
/// data such as bitumen contents clustered around 5 %.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolynomialFit {
    pub coefficients: Vec<f64>,
    pub shift: f64,
    pub x_min: f64,
    pub x_max: f64,
}

impl PolynomialFit {
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Evaluate the polynomial at `x` (Horner's scheme).
    pub fn evaluate(&self, x: f64) -> f64 {
        let t = x - self.shift;
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * t + c)
    }

    /// `samples` evenly spaced points over the fitted x range.
    pub fn sample(&self, samples: usize) -> Vec<(f64, f64)> {
        if samples < 2 || self.x_max <= self.x_min {
            return vec![(self.x_min, self.evaluate(self.x_min))];
        }
        let step = (self.x_max - self.x_min) / (samples - 1) as f64;
        (0..samples)
            .map(|i| {
                let x = self.x_min + step * i as f64;
                (x, self.evaluate(x))
            })
            .collect()
    }
}

/// Fit a polynomial of `degree` to the finite `(x, y)` pairs.
///
/// Returns `None` when there are not more finite pairs than the degree, or
/// when the solve does not produce finite coefficients. Pairs where either
/// value is NaN or infinite are ignored.
///
/// # Examples
///
/// ```
/// use mixvol::algorithms::trend::fit_polynomial;
///
/// let xs = [4.5, 5.0, 5.5, 6.0];
/// let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x * x - x + 1.0).collect();
/// let fit = fit_polynomial(&xs, &ys, 2).unwrap();
/// assert!((fit.evaluate(5.25) - (2.0 * 5.25 * 5.25 - 5.25 + 1.0)).abs() < 1e-9);
///
/// assert!(fit_polynomial(&xs[..2], &ys[..2], 2).is_none());
/// ```
pub fn fit_polynomial(xs: &[f64], ys: &[f64], degree: usize) -> Option<PolynomialFit> {
    let points: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(x, y)| (*x, *y))
        .collect();

    if points.len() <= degree {
        return None;
    }

    let n = points.len();
    let shift = points.iter().map(|(x, _)| x).sum::<f64>() / n as f64;
    let x_min = points.iter().map(|(x, _)| *x).fold(f64::INFINITY, f64::min);
    let x_max = points.iter().map(|(x, _)| *x).fold(f64::NEG_INFINITY, f64::max);

    let design = DMatrix::from_fn(n, degree + 1, |row, col| {
        (points[row].0 - shift).powi(col as i32)
    });
    let targets = DVector::from_iterator(n, points.iter().map(|(_, y)| *y));

    let solution = design.svd(true, true).solve(&targets, SVD_EPSILON).ok()?;
    let coefficients: Vec<f64> = solution.iter().copied().collect();
    if coefficients.iter().any(|c| !c.is_finite()) {
        return None;
    }

    Some(PolynomialFit {
        coefficients,
        shift,
        x_min,
        x_max,
    })
}
