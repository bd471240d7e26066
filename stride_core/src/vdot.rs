//! VDOT-derived training paces and heart-rate zones.
//!
//! Uses the Daniels-Gilbert oxygen-cost polynomial to turn a VDOT score
//! into a maximal aerobic velocity, then derives the five Daniels training
//! intensities (E/M/T/I/R) as fractions of that velocity.

use crate::{HrZone, PaceRange, Result, WorkoutType};

/// Supported VDOT range; values outside are clamped
pub const VDOT_MIN: f64 = 20.0;
pub const VDOT_MAX: f64 = 85.0;

/// Oxygen cost of running at `velocity` m/min (Daniels-Gilbert)
pub fn oxygen_cost(velocity: f64) -> f64 {
    -4.60 + 0.182258 * velocity + 0.000104 * velocity * velocity
}

/// Velocity in m/min whose oxygen cost equals `vo2` (inverse of the
/// cost polynomial, positive root)
pub fn velocity_at_vo2(vo2: f64) -> f64 {
    let a = 0.000104;
    let b = 0.182258;
    let c = -(4.60 + vo2);
    (-b + (b * b - 4.0 * a * c).sqrt()) / (2.0 * a)
}

/// Fractions of maximal aerobic velocity per intensity (low, high)
fn velocity_fractions(workout_type: WorkoutType) -> Result<(f64, f64)> {
    match workout_type {
        WorkoutType::Recovery => Ok((0.55, 0.62)),
        WorkoutType::Easy | WorkoutType::Long => Ok((0.62, 0.74)),
        WorkoutType::Threshold => Ok((0.86, 0.88)),
        WorkoutType::Interval => Ok((0.95, 1.00)),
        WorkoutType::Repetition => Ok((1.05, 1.10)),
        WorkoutType::Rest => Err(crate::Error::Validation(
            "Rest has no pace prescription".into(),
        )),
    }
}

/// Heart-rate zone associated with a workout type
pub fn hr_zone(workout_type: WorkoutType) -> HrZone {
    match workout_type {
        WorkoutType::Recovery | WorkoutType::Rest => HrZone::Z1,
        WorkoutType::Easy | WorkoutType::Long => HrZone::Z2,
        WorkoutType::Threshold => HrZone::Z4,
        WorkoutType::Interval | WorkoutType::Repetition => HrZone::Z5,
    }
}

/// Target pace window in min/km for a workout type at a given VDOT
pub fn pace_range(vdot: f64, workout_type: WorkoutType) -> Result<PaceRange> {
    let vdot = vdot.clamp(VDOT_MIN, VDOT_MAX);
    let v_max = velocity_at_vo2(vdot);
    let (low_fraction, high_fraction) = velocity_fractions(workout_type)?;

    // Higher velocity fraction means a faster (smaller) pace
    Ok(PaceRange {
        fast_min_per_km: 1000.0 / (v_max * high_fraction),
        slow_min_per_km: 1000.0 / (v_max * low_fraction),
    })
}
