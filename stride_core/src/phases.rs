//! Periodization phase allocation.
//!
//! Splits a plan's total weeks into base/build/peak/taper using
//! goal-specific percentage templates, rounding to whole weeks with ties
//! favoring the base phase.

use crate::{Error, PhaseAllocation, RaceDistance, Result};

/// Percentage template (base, build, peak, taper) for a goal
fn phase_template(race: RaceDistance) -> (f64, f64, f64, f64) {
    match race {
        RaceDistance::FiveK => (0.35, 0.40, 0.15, 0.10),
        RaceDistance::TenK => (0.30, 0.45, 0.15, 0.10),
        RaceDistance::HalfMarathon => (0.30, 0.45, 0.15, 0.10),
        RaceDistance::Marathon => (0.40, 0.35, 0.15, 0.10),
    }
}

/// Allocate training phases over `total_weeks` for the given goal
///
/// Fails with `InsufficientTime` when `total_weeks` is below the goal's
/// documented minimum (5K: 6, 10K: 8, half: 12, marathon: 16). Build, peak
/// and taper round to whole weeks with a floor of one week each; whatever
/// rounding leaves over lands in base.
pub fn allocate_phases(total_weeks: usize, race: RaceDistance) -> Result<PhaseAllocation> {
    let minimum = race.minimum_weeks();
    if total_weeks < minimum {
        return Err(Error::InsufficientTime {
            goal: race.name().to_string(),
            required: minimum,
            available: total_weeks,
        });
    }

    let (_, build_pct, peak_pct, taper_pct) = phase_template(race);
    let weeks = total_weeks as f64;

    let build = ((weeks * build_pct).round() as usize).max(1);
    let peak = ((weeks * peak_pct).round() as usize).max(1);
    let taper = ((weeks * taper_pct).round() as usize).max(1);

    let allocated = build + peak + taper;
    if allocated >= total_weeks {
        // Rounding ate the base phase; shrink build until base gets a week
        let overshoot = allocated - total_weeks + 1;
        let build = build.saturating_sub(overshoot).max(1);
        let base = total_weeks - build - peak - taper;
        if base == 0 {
            return Err(Error::InsufficientTime {
                goal: race.name().to_string(),
                required: minimum,
                available: total_weeks,
            });
        }
        return Ok(PhaseAllocation {
            base,
            build,
            peak,
            taper,
        });
    }

    let base = total_weeks - allocated;

    tracing::debug!(
        "Allocated {} weeks for {}: base {}, build {}, peak {}, taper {}",
        total_weeks,
        race.name(),
        base,
        build,
        peak,
        taper
    );

    Ok(PhaseAllocation {
        base,
        build,
        peak,
        taper,
    })
}
