use serde::Serialize;

/// Least-squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Fits a line through `(x, y)` pairs, skipping pairs with a missing coordinate.
    ///
    /// Returns `None` with fewer than two usable points or when all `x` are equal.
    ///
    /// ```
    /// # use tapstat_stats::fit::LinearFit;
    /// let fit = LinearFit::new(&[0.0, 1.0, 2.0], &[1.0, 3.0, 5.0]).unwrap();
    /// assert!((fit.slope - 2.0).abs() < 1e-12);
    /// assert!((fit.intercept - 1.0).abs() < 1e-12);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new(xs: &[f64], ys: &[f64]) -> Option<Self> {
        let points = xs
            .iter()
            .zip(ys)
            .filter(|(x, y)| !x.is_nan() && !y.is_nan())
            .map(|(&x, &y)| (x, y))
            .collect::<Vec<_>>();
        if points.len() < 2 {
            return None;
        }
        let n = points.len() as f64;
        let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
        let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
        let sxx = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum::<f64>();
        if sxx == 0.0 {
            return None;
        }
        let sxy = points
            .iter()
            .map(|(x, y)| (x - mean_x) * (y - mean_y))
            .sum::<f64>();
        let slope = sxy / sxx;
        Some(Self {
            slope,
            intercept: mean_y - slope * mean_x,
        })
    }

    /// Fits `ys` against their positions `0, 1, 2, ...`.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn over_index(ys: &[f64]) -> Option<Self> {
        let xs = (0..ys.len()).map(|i| i as f64).collect::<Vec<_>>();
        Self::new(&xs, ys)
    }

    #[must_use]
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}
