//! Dual-channel load normalizer.
//!
//! Converts one raw activity (sport, duration, RPE) into two load scalars:
//! systemic load and lower-body load, in arbitrary units (AU). The model is
//! session RPE: `duration_minutes x effort_factor(rpe) x sport_multiplier`,
//! applied once per channel with sport-specific multipliers.

use crate::{Activity, Error, Result, Sport};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use uuid::Uuid;

/// Per-sport multiplier pair: (systemic, lower_body)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SportFactors {
    pub systemic: f64,
    pub lower_body: f64,
}

/// Conservative fallback for sports not in the table
pub const DEFAULT_FACTORS: SportFactors = SportFactors {
    systemic: 0.7,
    lower_body: 0.3,
};

static SPORT_FACTORS: Lazy<HashMap<Sport, SportFactors>> = Lazy::new(|| {
    let mut factors = HashMap::new();

    factors.insert(
        Sport::Run,
        SportFactors {
            systemic: 1.0,
            lower_body: 1.0,
        },
    );
    factors.insert(
        Sport::Bike,
        SportFactors {
            systemic: 0.85,
            lower_body: 0.35,
        },
    );
    factors.insert(
        Sport::Swim,
        SportFactors {
            systemic: 0.8,
            lower_body: 0.1,
        },
    );
    factors.insert(
        Sport::Climb,
        SportFactors {
            systemic: 0.6,
            lower_body: 0.1,
        },
    );
    factors.insert(
        Sport::Strength,
        SportFactors {
            systemic: 0.5,
            lower_body: 0.4,
        },
    );
    factors.insert(
        Sport::Hike,
        SportFactors {
            systemic: 0.6,
            lower_body: 0.7,
        },
    );
    factors.insert(
        Sport::Row,
        SportFactors {
            systemic: 0.85,
            lower_body: 0.3,
        },
    );
    factors.insert(
        Sport::XcSki,
        SportFactors {
            systemic: 0.9,
            lower_body: 0.5,
        },
    );

    factors
});

/// Look up the multiplier pair for a sport
///
/// Unknown sports fall back to a conservative default pair with a warning;
/// this never fails.
pub fn sport_factors(sport: &Sport) -> SportFactors {
    match SPORT_FACTORS.get(sport) {
        Some(factors) => *factors,
        None => {
            tracing::warn!(
                "Unknown sport {:?}, using conservative default multipliers",
                sport
            );
            DEFAULT_FACTORS
        }
    }
}

/// Effort factor as a function of session RPE
///
/// Monotonic over the 1-10 scale with no zero or negative output; values
/// outside the scale are clamped before use.
pub fn effort_factor(rpe: u8) -> f64 {
    f64::from(rpe.clamp(1, 10))
}

/// Normalize a raw activity into (systemic_load_au, lower_body_load_au)
///
/// The only fatal input is a negative or non-finite duration; everything
/// else degrades to a conservative value.
pub fn normalize(sport: &Sport, duration_minutes: f64, rpe: u8) -> Result<(f64, f64)> {
    if !duration_minutes.is_finite() || duration_minutes < 0.0 {
        return Err(Error::Input(format!(
            "Invalid activity duration: {} minutes",
            duration_minutes
        )));
    }

    let factors = sport_factors(sport);
    let effort = effort_factor(rpe);

    let systemic = duration_minutes * effort * factors.systemic;
    let lower_body = duration_minutes * effort * factors.lower_body;

    Ok((systemic, lower_body))
}

impl Activity {
    /// Record a new activity with loads derived from (sport, duration, rpe)
    pub fn record(
        date: NaiveDate,
        sport: Sport,
        duration_minutes: f64,
        rpe: u8,
        notes: Option<String>,
    ) -> Result<Self> {
        let (systemic_load_au, lower_body_load_au) = normalize(&sport, duration_minutes, rpe)?;

        Ok(Activity {
            id: Uuid::new_v4(),
            date,
            sport,
            duration_minutes,
            rpe: rpe.clamp(1, 10),
            notes,
            systemic_load_au,
            lower_body_load_au,
        })
    }

    /// Recompute the load scalars from the raw fields
    ///
    /// Loads are a pure function of (sport, duration, rpe); this makes a
    /// hand-edited record consistent again.
    pub fn renormalize(&mut self) -> Result<()> {
        let (systemic, lower_body) = normalize(&self.sport, self.duration_minutes, self.rpe)?;
        self.systemic_load_au = systemic;
        self.lower_body_load_au = lower_body;
        Ok(())
    }
}
