//! Secondary metrics computed from aggregated cumulative series.

// ── Active cases ──────────────────────────────────────────────────────────────

/// Compute the active-case series `confirmed − recovered − deaths`.
///
/// All three inputs must be aligned to the same date axis. The result is
/// signed: a regression artifact in an uncorrected feed can momentarily push
/// recoveries past confirmations.
pub fn active_series(confirmed: &[u64], recovered: &[u64], deaths: &[u64]) -> Vec<i64> {
    debug_assert_eq!(confirmed.len(), recovered.len());
    debug_assert_eq!(confirmed.len(), deaths.len());
    confirmed
        .iter()
        .zip(recovered.iter().zip(deaths.iter()))
        .map(|(&c, (&r, &d))| c as i64 - r as i64 - d as i64)
        .collect()
}

// ── New daily cases ───────────────────────────────────────────────────────────

/// First difference of the cumulative confirmed series.
///
/// `new_daily[0]` is defined as zero (no prior day); later entries may be
/// negative when an uncorrected feed revises its totals downward.
pub fn new_daily_series(confirmed: &[u64]) -> Vec<i64> {
    let mut out = Vec::with_capacity(confirmed.len());
    for (i, &value) in confirmed.iter().enumerate() {
        if i == 0 {
            out.push(0);
        } else {
            out.push(value as i64 - confirmed[i - 1] as i64);
        }
    }
    out
}

// ── Day-over-day delta ────────────────────────────────────────────────────────

/// Relative day-over-day change of the two most recent values,
/// `(m[n−1] − m[n−2]) / m[n−2]`.
///
/// Returns `None` when fewer than two values exist or the prior value is
/// zero; the ratio is undefined in both cases and callers print it as
/// unavailable rather than as an infinity.
pub fn day_over_day_delta(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let last = values[values.len() - 1];
    let prev = values[values.len() - 2];
    if prev == 0.0 {
        return None;
    }
    Some((last - prev) / prev)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
