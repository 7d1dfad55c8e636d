//! Goodness of fit between handicap-implied and actual margins.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Correlation {
    Defined { coefficient: f64, samples: usize },
    /// Fewer than two pairs, or one series never varies.
    Undefined { samples: usize },
}

impl Correlation {
    pub fn coefficient(&self) -> Option<f64> {
        match self {
            Correlation::Defined { coefficient, .. } => Some(*coefficient),
            Correlation::Undefined { .. } => None,
        }
    }

    pub fn samples(&self) -> usize {
        match self {
            Correlation::Defined { samples, .. } | Correlation::Undefined { samples } => *samples,
        }
    }
}

/// Pearson correlation over paired samples. Extra elements in the longer
/// slice are ignored.
pub fn correlate(expected: &[f64], actual: &[f64]) -> Correlation {
    let samples = expected.len().min(actual.len());
    if samples < 2 {
        return Correlation::Undefined { samples };
    }
    let (xs, ys) = (&expected[..samples], &actual[..samples]);

    let n = samples as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return Correlation::Undefined { samples };
    }
    let coefficient = (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0);
    Correlation::Defined { coefficient, samples }
}
