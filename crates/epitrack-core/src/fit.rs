//! Trend projection engine: exponential and logistic growth fitting.
//!
//! Two fitting modes are provided, selected by horizon:
//!
//! * [`ExponentialFit`] — ordinary least-squares regression of `ln(value)`
//!   against day index over the most recent points; models the short-horizon
//!   growth phase and yields a doubling time.
//! * [`LogisticFitter`] — nonlinear least-squares fit of three-parameter
//!   sigmoids jointly to the confirmed, deaths and recovered series; models
//!   the longer horizon where growth saturates and yields asymptotic totals.
//!
//! The simplex search used by the logistic mode is implemented here: the
//! optimisation problem is small (eight parameters, a few dozen data points)
//! and fixed, so a dedicated solver dependency would buy nothing.

use thiserror::Error;
use tracing::debug;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Why a fit is unavailable for a metric.
///
/// These are reported, never fatal: a figure whose exponential window dips to
/// zero still renders, it just carries no projection for that metric.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FitError {
    /// Fewer data points than the fit requires.
    #[error("fit window has only {0} points")]
    WindowTooShort(usize),

    /// The log-linear fit saw a zero or negative value at the given window
    /// position; the logarithm is undefined there.
    #[error("non-positive value at window position {0}")]
    NonPositiveWindow(usize),

    /// The simplex search exhausted its iteration budget without meeting the
    /// convergence tolerance. The parameters at that point are not returned:
    /// a non-converged curve must not be mistaken for a valid one.
    #[error("logistic fit did not converge within {0} iterations")]
    NonConvergence(usize),
}

// ── Exponential (short horizon) ───────────────────────────────────────────────

/// Result of a log-linear regression over a recent window of values.
///
/// The regression axis is the window-local day index `0..window`, so
/// `intercept` is `ln(value)` at the first window point and the most recent
/// observation sits at index `window − 1`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExponentialFit {
    /// Fitted growth rate per day (slope of `ln(value)`).
    pub growth_rate: f64,
    /// Fitted `ln(value)` at window index 0.
    pub intercept: f64,
    /// Number of points the fit used.
    pub window: usize,
}

impl ExponentialFit {
    /// Fit the last `window` values of `values` by ordinary least squares on
    /// `ln(value)`.
    ///
    /// Every value in the window must be strictly positive; a window of less
    /// than two points cannot determine a slope.
    pub fn fit(values: &[f64], window: usize) -> Result<Self, FitError> {
        let window = window.min(values.len());
        if window < 2 {
            return Err(FitError::WindowTooShort(window));
        }
        let tail = &values[values.len() - window..];
        for (i, &v) in tail.iter().enumerate() {
            if v <= 0.0 {
                return Err(FitError::NonPositiveWindow(i));
            }
        }

        let n = window as f64;
        let mut sx = 0.0;
        let mut sy = 0.0;
        let mut sxx = 0.0;
        let mut sxy = 0.0;
        for (i, &v) in tail.iter().enumerate() {
            let x = i as f64;
            let y = v.ln();
            sx += x;
            sy += y;
            sxx += x * x;
            sxy += x * y;
        }
        let denom = n * sxx - sx * sx;
        let growth_rate = (n * sxy - sx * sy) / denom;
        let intercept = (sy - growth_rate * sx) / n;

        Ok(Self {
            growth_rate,
            intercept,
            window,
        })
    }

    /// Fitted value at a window-local day index (may lie beyond the window).
    pub fn value_at(&self, index: f64) -> f64 {
        (self.intercept + self.growth_rate * index).exp()
    }

    /// Fitted value `days_ahead` days after the most recent observation.
    pub fn project(&self, days_ahead: f64) -> f64 {
        self.value_at(self.window as f64 - 1.0 + days_ahead)
    }

    /// Days for the fitted curve to double, `ln 2 / growth_rate`.
    ///
    /// `None` when the fitted growth rate is zero or negative: the metric is
    /// flat or shrinking and a doubling time is not computable.
    pub fn doubling_time(&self) -> Option<f64> {
        if self.growth_rate > 0.0 {
            Some(std::f64::consts::LN_2 / self.growth_rate)
        } else {
            None
        }
    }
}

// ── Logistic (long horizon) ───────────────────────────────────────────────────

/// A three-parameter sigmoid `A / (1 + exp((b − x) / a))`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Sigmoid {
    /// Limiting total as `x → ∞`.
    pub asymptote: f64,
    /// Time scale of the transition, in days.
    pub scale: f64,
    /// Day offset of the inflection point.
    pub offset: f64,
}

impl Sigmoid {
    /// Curve value at day offset `x`.
    pub fn value_at(&self, x: f64) -> f64 {
        self.asymptote / (1.0 + ((self.offset - x) / self.scale).exp())
    }

    /// First derivative at day offset `x` (new cases per day under the model).
    pub fn derivative_at(&self, x: f64) -> f64 {
        let e = ((self.offset - x) / self.scale).exp();
        self.asymptote / (1.0 + e).powi(2) * e / self.scale
    }
}

/// The jointly fitted logistic model for one figure.
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticFit {
    pub confirmed: Sigmoid,
    pub deaths: Sigmoid,
    /// Asymptote re-derived as `confirmed.asymptote − deaths.asymptote` so
    /// that recovered + deaths + active ≡ confirmed under the model.
    pub recovered: Sigmoid,
    /// Simplex iterations spent across all rounds.
    pub iterations: usize,
    /// Sum of squared residuals at the fitted parameters.
    pub residual: f64,
}

/// Nonlinear least-squares fitter for the joint sigmoid model.
#[derive(Debug, Clone)]
pub struct LogisticFitter {
    /// Initial guess for the inflection offset, in days past the last point.
    pub future_days: f64,
    /// Iteration budget per simplex round.
    pub max_iterations: usize,
    /// Number of restart rounds; each restarts the simplex around the current
    /// best point to escape premature collapse.
    pub restarts: usize,
    /// Relative tolerance on the objective spread used as the convergence
    /// criterion.
    pub tolerance: f64,
}

impl Default for LogisticFitter {
    fn default() -> Self {
        Self {
            future_days: 7.0,
            max_iterations: 5_000,
            restarts: 3,
            tolerance: 1e-10,
        }
    }
}

impl LogisticFitter {
    /// Fit sigmoids jointly to the three cumulative series.
    ///
    /// `days` is the day-offset axis (zero at the most recent observation,
    /// negative into the past); the three series must be aligned to it.
    ///
    /// The free parameters are `(A_c, a_c, b_c, A_d, a_d, b_d, a_r, b_r)`:
    /// the recovered asymptote is tied to `A_c − A_d` inside the objective
    /// and re-derived the same way afterwards. Initial guesses are twice the
    /// last observed totals with unit time-scale; asymptotes are bounded
    /// below by the last observed totals and time-scales by one day.
    pub fn fit(
        &self,
        days: &[f64],
        confirmed: &[f64],
        deaths: &[f64],
        recovered: &[f64],
    ) -> Result<LogisticFit, FitError> {
        debug_assert_eq!(days.len(), confirmed.len());
        debug_assert_eq!(days.len(), deaths.len());
        debug_assert_eq!(days.len(), recovered.len());
        if days.len() < 4 {
            return Err(FitError::WindowTooShort(days.len()));
        }

        let last_c = confirmed[confirmed.len() - 1];
        let last_d = deaths[deaths.len() - 1];

        let objective = |p: &[f64]| -> f64 {
            let c = Sigmoid {
                asymptote: p[0],
                scale: p[1],
                offset: p[2],
            };
            let d = Sigmoid {
                asymptote: p[3],
                scale: p[4],
                offset: p[5],
            };
            let r = Sigmoid {
                asymptote: p[0] - p[3],
                scale: p[6],
                offset: p[7],
            };
            let mut err = 0.0;
            for (i, &x) in days.iter().enumerate() {
                err += (confirmed[i] - c.value_at(x)).powi(2);
                err += (deaths[i] - d.value_at(x)).powi(2);
                err += (recovered[i] - r.value_at(x)).powi(2);
            }
            err
        };

        let x0 = [
            2.0 * last_c,
            1.0,
            self.future_days,
            2.0 * last_d,
            1.0,
            self.future_days,
            1.0,
            self.future_days,
        ];
        let lower = [
            last_c,
            1.0,
            f64::NEG_INFINITY,
            last_d,
            1.0,
            f64::NEG_INFINITY,
            1.0,
            f64::NEG_INFINITY,
        ];

        let mut best = x0.to_vec();
        let mut best_f = objective(&best);
        let mut total_iterations = 0;
        let mut converged = false;

        for round in 0..self.restarts.max(1) {
            let outcome = nelder_mead(
                &objective,
                &best,
                &lower,
                self.max_iterations,
                self.tolerance,
            );
            total_iterations += outcome.iterations;
            let improved = outcome.best_f < best_f - self.tolerance * (1.0 + best_f.abs());
            if outcome.best_f < best_f {
                best = outcome.best_x;
                best_f = outcome.best_f;
            }
            converged = outcome.converged;
            debug!(
                round,
                iterations = outcome.iterations,
                residual = best_f,
                "logistic fit round finished"
            );
            if outcome.converged && !improved && round > 0 {
                break;
            }
        }

        if !converged {
            return Err(FitError::NonConvergence(total_iterations));
        }

        let confirmed_curve = Sigmoid {
            asymptote: best[0],
            scale: best[1],
            offset: best[2],
        };
        let deaths_curve = Sigmoid {
            asymptote: best[3],
            scale: best[4],
            offset: best[5],
        };
        let recovered_curve = Sigmoid {
            asymptote: best[0] - best[3],
            scale: best[6],
            offset: best[7],
        };

        Ok(LogisticFit {
            confirmed: confirmed_curve,
            deaths: deaths_curve,
            recovered: recovered_curve,
            iterations: total_iterations,
            residual: best_f,
        })
    }
}

// ── Simplex search ────────────────────────────────────────────────────────────

struct SimplexOutcome {
    best_x: Vec<f64>,
    best_f: f64,
    iterations: usize,
    converged: bool,
}

/// Nelder–Mead downhill simplex with lower-bound clamping.
///
/// Standard coefficients (reflection 1, expansion 2, contraction ½, shrink
/// ½); every candidate point is clamped onto the feasible box before
/// evaluation. Converged when the objective spread across the simplex falls
/// below `tolerance` relative to the best value.
fn nelder_mead(
    f: &impl Fn(&[f64]) -> f64,
    x0: &[f64],
    lower: &[f64],
    max_iterations: usize,
    tolerance: f64,
) -> SimplexOutcome {
    let n = x0.len();
    let clamp = |x: &mut [f64]| {
        for (v, &lo) in x.iter_mut().zip(lower.iter()) {
            if *v < lo {
                *v = lo;
            }
        }
    };

    // Initial simplex: x0 plus one vertex per axis, stepped proportionally.
    let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
    let mut p0 = x0.to_vec();
    clamp(&mut p0);
    let f0 = f(&p0);
    simplex.push((p0.clone(), f0));
    for i in 0..n {
        let mut p = p0.clone();
        let step = if p[i].abs() > 1e-6 {
            0.05 * p[i].abs()
        } else {
            0.25
        };
        p[i] += step;
        clamp(&mut p);
        let fp = f(&p);
        simplex.push((p, fp));
    }

    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iterations {
        iterations += 1;
        simplex.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let f_best = simplex[0].1;
        let f_worst = simplex[n].1;
        if (f_worst - f_best).abs() <= tolerance * (1.0 + f_best.abs()) {
            converged = true;
            break;
        }

        // Centroid of all vertices except the worst.
        let mut centroid = vec![0.0; n];
        for (p, _) in simplex.iter().take(n) {
            for (c, &v) in centroid.iter_mut().zip(p.iter()) {
                *c += v;
            }
        }
        for c in centroid.iter_mut() {
            *c /= n as f64;
        }

        let worst = simplex[n].0.clone();
        let mut reflected: Vec<f64> = centroid
            .iter()
            .zip(worst.iter())
            .map(|(&c, &w)| c + (c - w))
            .collect();
        clamp(&mut reflected);
        let f_reflected = f(&reflected);

        if f_reflected < simplex[0].1 {
            // Try to expand further along the same direction.
            let mut expanded: Vec<f64> = centroid
                .iter()
                .zip(worst.iter())
                .map(|(&c, &w)| c + 2.0 * (c - w))
                .collect();
            clamp(&mut expanded);
            let f_expanded = f(&expanded);
            if f_expanded < f_reflected {
                simplex[n] = (expanded, f_expanded);
            } else {
                simplex[n] = (reflected, f_reflected);
            }
        } else if f_reflected < simplex[n - 1].1 {
            simplex[n] = (reflected, f_reflected);
        } else {
            let mut contracted: Vec<f64> = centroid
                .iter()
                .zip(worst.iter())
                .map(|(&c, &w)| c + 0.5 * (w - c))
                .collect();
            clamp(&mut contracted);
            let f_contracted = f(&contracted);
            if f_contracted < simplex[n].1 {
                simplex[n] = (contracted, f_contracted);
            } else {
                // Shrink every vertex toward the best.
                let best = simplex[0].0.clone();
                for entry in simplex.iter_mut().skip(1) {
                    for (v, &b) in entry.0.iter_mut().zip(best.iter()) {
                        *v = b + 0.5 * (*v - b);
                    }
                    clamp(&mut entry.0);
                    entry.1 = f(&entry.0);
                }
            }
        }
    }

    simplex.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    SimplexOutcome {
        best_x: simplex[0].0.clone(),
        best_f: simplex[0].1,
        iterations,
        converged,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
