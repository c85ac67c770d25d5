//! Numeric helpers shared by the classifier and detectors.
//!
//! Implements from first principles:
//! - Descriptive statistics (mean, sample stdev, z-scores, drawdown)
//! - Pearson correlation and lag-1 autocorrelation
//! - Ordinary least squares with slope t-statistic and R²
//! - Lanczos ln(Gamma), regularized incomplete beta, Student's t CDF
//! - Linear resampling of a series to a target length
//!
//! Degenerate inputs (too short, zero variance) return `None` or 0.0 rather
//! than NaN so callers can treat them as "no evidence".

/// Arithmetic mean. 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1). 0.0 for fewer than 2 values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Log returns of a positive price series: ln(p[t] / p[t-1]).
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .map(|w| {
            if w[0] > 0.0 && w[1] > 0.0 {
                (w[1] / w[0]).ln()
            } else {
                0.0
            }
        })
        .collect()
}

/// Standardize to zero mean, unit variance. All zeros if variance is zero.
pub fn z_scores(values: &[f64]) -> Vec<f64> {
    let m = mean(values);
    let s = std_dev(values);
    if s < 1e-15 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - m) / s).collect()
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if the series never falls below a prior peak.
pub fn max_drawdown(prices: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &p in prices {
        if p > peak {
            peak = p;
        }
        if peak > 0.0 {
            max_dd = max_dd.min((p - peak) / peak);
        }
    }
    max_dd
}

/// Pearson correlation of two equal-length series.
///
/// `None` if lengths differ, fewer than 3 points, or either side is constant.
pub fn correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 3 {
        return None;
    }
    let ma = mean(a);
    let mb = mean(b);
    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (x, y) in a.iter().zip(b) {
        cov += (x - ma) * (y - mb);
        va += (x - ma).powi(2);
        vb += (y - mb).powi(2);
    }
    if va < 1e-15 || vb < 1e-15 {
        return None;
    }
    Some((cov / (va.sqrt() * vb.sqrt())).clamp(-1.0, 1.0))
}

/// Lag-1 autocorrelation. 0.0 when undefined.
pub fn autocorrelation_lag1(values: &[f64]) -> f64 {
    if values.len() < 4 {
        return 0.0;
    }
    correlation(&values[..values.len() - 1], &values[1..]).unwrap_or(0.0)
}

/// Ordinary least squares fit `y = intercept + slope * x`.
#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    pub intercept: f64,
    pub slope: f64,
    /// Standard error of the slope.
    pub slope_std_err: f64,
    /// Coefficient of determination, in [0, 1].
    pub r_squared: f64,
    pub residuals: Vec<f64>,
}

impl OlsFit {
    /// t-statistic of the slope. Infinite for a perfect non-flat fit.
    pub fn slope_t(&self) -> f64 {
        if self.slope_std_err < 1e-300 {
            if self.slope.abs() < 1e-300 {
                0.0
            } else {
                self.slope.signum() * f64::INFINITY
            }
        } else {
            self.slope / self.slope_std_err
        }
    }

    /// Residual degrees of freedom.
    pub fn dof(&self) -> usize {
        self.residuals.len().saturating_sub(2)
    }
}

/// Fit `y` on `x`. `None` for fewer than 3 points or constant `x`.
pub fn ols(x: &[f64], y: &[f64]) -> Option<OlsFit> {
    let n = x.len();
    if n != y.len() || n < 3 {
        return None;
    }
    let mx = mean(x);
    let my = mean(y);
    let sxx: f64 = x.iter().map(|v| (v - mx).powi(2)).sum();
    if sxx < 1e-15 {
        return None;
    }
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    let slope = sxy / sxx;
    let intercept = my - slope * mx;

    let residuals: Vec<f64> = x.iter().zip(y).map(|(a, b)| b - (intercept + slope * a)).collect();
    let sse: f64 = residuals.iter().map(|r| r * r).sum();
    let sst: f64 = y.iter().map(|v| (v - my).powi(2)).sum();
    let r_squared = if sst < 1e-15 {
        0.0
    } else {
        (1.0 - sse / sst).clamp(0.0, 1.0)
    };
    let slope_std_err = (sse / (n - 2) as f64 / sxx).sqrt();

    Some(OlsFit {
        intercept,
        slope,
        slope_std_err,
        r_squared,
        residuals,
    })
}

/// Two-sided p-value of a t-statistic with `df` degrees of freedom.
pub fn two_sided_p(t: f64, df: f64) -> f64 {
    if t.is_infinite() {
        return 0.0;
    }
    if t.is_nan() || df <= 0.0 {
        return 1.0;
    }
    (2.0 * (1.0 - t_cdf(t.abs(), df))).clamp(0.0, 1.0)
}

/// Resample a series to `len` points by linear interpolation.
pub fn resample(values: &[f64], len: usize) -> Vec<f64> {
    if len == 0 || values.is_empty() {
        return Vec::new();
    }
    if values.len() == 1 || len == 1 {
        return vec![values[values.len() - 1]; len];
    }
    if values.len() == len {
        return values.to_vec();
    }
    let scale = (values.len() - 1) as f64 / (len - 1) as f64;
    (0..len)
        .map(|i| {
            let pos = i as f64 * scale;
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(values.len() - 1);
            let frac = pos - lo as f64;
            values[lo] * (1.0 - frac) + values[hi] * frac
        })
        .collect()
}

// ─── Distribution functions ──────────────────────────────────────────

/// Lanczos approximation for ln(Gamma(x)), g=7, n=9.
fn ln_gamma(x: f64) -> f64 {
    #[allow(clippy::excessive_precision)]
    const COEFFICIENTS: [f64; 9] = [
        0.99999999999980993,
        676.5203681218851,
        -1259.1392167224028,
        771.32342877765313,
        -176.61502916214059,
        12.507343278686905,
        -0.13857109526572012,
        9.9843695780195716e-6,
        1.5056327351493116e-7,
    ];
    const G: f64 = 7.0;

    if x < 0.5 {
        // Reflection: Gamma(x) * Gamma(1-x) = pi / sin(pi*x)
        let sin_val = (std::f64::consts::PI * x).sin();
        if sin_val.abs() < 1e-300 {
            return f64::INFINITY;
        }
        return std::f64::consts::PI.ln() - sin_val.abs().ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let sum = COEFFICIENTS
        .iter()
        .enumerate()
        .skip(1)
        .fold(COEFFICIENTS[0], |acc, (i, &c)| acc + c / (x + i as f64));
    let t = x + G + 0.5;
    (2.0 * std::f64::consts::PI).sqrt().ln() + t.ln() * (x + 0.5) - t + sum.ln()
}

/// Regularized incomplete beta I_x(a, b), modified Lentz continued fraction.
fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if !(0.0..=1.0).contains(&x) {
        return f64::NAN;
    }
    if x == 0.0 || x == 1.0 {
        return x;
    }
    if x > (a + 1.0) / (a + b + 2.0) {
        return 1.0 - regularized_incomplete_beta(b, a, 1.0 - x);
    }

    let ln_prefix =
        a * x.ln() + b * (1.0 - x).ln() - ln_gamma(a) - ln_gamma(b) + ln_gamma(a + b) - a.ln();
    const TINY: f64 = 1e-30;
    let guard = |v: f64| if v.abs() < TINY { TINY } else { v };

    let mut c = 1.0_f64;
    let mut d = 1.0 / guard(1.0 - (a + b) * x / (a + 1.0));
    let mut f = d;

    for m in 1..=200 {
        let m = m as f64;
        let even = m * (b - m) * x / ((a + 2.0 * m - 1.0) * (a + 2.0 * m));
        d = 1.0 / guard(1.0 + even * d);
        c = guard(1.0 + even / c);
        f *= c * d;

        let odd = -((a + m) * (a + b + m) * x) / ((a + 2.0 * m) * (a + 2.0 * m + 1.0));
        d = 1.0 / guard(1.0 + odd * d);
        c = guard(1.0 + odd / c);
        let delta = c * d;
        f *= delta;
        if (delta - 1.0).abs() < 1e-14 {
            break;
        }
    }

    ln_prefix.exp() * f
}

/// Student's t-distribution CDF: P(T <= t) for df degrees of freedom.
pub fn t_cdf(t: f64, df: f64) -> f64 {
    if df <= 0.0 {
        return f64::NAN;
    }
    if t == 0.0 {
        return 0.5;
    }
    let ib = regularized_incomplete_beta(df / 2.0, 0.5, df / (df + t * t));
    if t > 0.0 {
        1.0 - 0.5 * ib
    } else {
        0.5 * ib
    }
}
