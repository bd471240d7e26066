//! Weekly volume progression and CTL-capacity volume recommendation.

use crate::config::VolumeConfig;
use crate::{Error, RaceDistance, Result, VolumeRecommendation, WeeklyVolume};

/// Usable weekly growth fraction when projecting a peak from the start
const WEEKLY_GROWTH_HEADROOM: f64 = 0.065;

/// Typical peak weekly volume in km for a goal distance
fn goal_peak_km(race: RaceDistance) -> f64 {
    match race {
        RaceDistance::FiveK => 42.0,
        RaceDistance::TenK => 48.0,
        RaceDistance::HalfMarathon => 58.0,
        RaceDistance::Marathon => 75.0,
    }
}

/// Generate a weekly volume curve from `start_km` to `peak_km`
///
/// The trend climbs linearly from start to peak across the non-recovery
/// weeks. Each index listed in `recovery_weeks` is reduced to
/// `recovery_week_factor` (~0.7) of the un-reduced trend value at that
/// point; the following week's increase is computed from the last
/// non-recovery week's volume, not from the recovery week's reduced volume,
/// so one trend step never exceeds the progression limit.
pub fn progress_volume(
    start_km: f64,
    peak_km: f64,
    weeks: usize,
    recovery_weeks: &[usize],
    cfg: &VolumeConfig,
) -> Result<Vec<WeeklyVolume>> {
    if weeks == 0 {
        return Err(Error::Validation("Volume curve needs at least one week".into()));
    }
    if start_km <= 0.0 || peak_km <= 0.0 {
        return Err(Error::Validation(format!(
            "Volumes must be positive: start {} km, peak {} km",
            start_km, peak_km
        )));
    }
    if let Some(&bad) = recovery_weeks.iter().find(|&&i| i >= weeks) {
        return Err(Error::Validation(format!(
            "Recovery week index {} outside a {}-week curve",
            bad, weeks
        )));
    }

    let non_recovery = (0..weeks).filter(|i| !recovery_weeks.contains(i)).count();
    if non_recovery == 0 {
        return Err(Error::Validation(
            "A volume curve cannot be all recovery weeks".into(),
        ));
    }
    let step = if non_recovery > 1 {
        (peak_km - start_km) / (non_recovery - 1) as f64
    } else {
        0.0
    };

    let mut curve = Vec::with_capacity(weeks);
    let mut rank = 0usize; // trend rank of the next non-recovery week
    for i in 0..weeks {
        let trend = start_km + step * rank as f64;
        if recovery_weeks.contains(&i) {
            // The volume the trend would reach this week, reduced
            curve.push(WeeklyVolume {
                week_index: i,
                target_km: round_km(trend * cfg.recovery_week_factor),
                recovery: true,
            });
        } else {
            curve.push(WeeklyVolume {
                week_index: i,
                target_km: round_km(trend),
                recovery: false,
            });
            rank += 1;
        }
    }

    Ok(curve)
}

/// Recommend starting and peak weekly volume from the athlete's CTL
///
/// Starting volume is bounded to the CTL-implied capacity band and never
/// exceeds `recent_volume_cap_factor` (110%) of recent actual volume, the
/// 10% rule applied at the recommendation stage, not only at validation.
pub fn suggest_volume(
    current_ctl: f64,
    race: RaceDistance,
    weeks_available: usize,
    recent_weekly_km: Option<f64>,
    cfg: &VolumeConfig,
) -> VolumeRecommendation {
    let capacity_mid = (current_ctl * cfg.km_per_ctl_point).max(10.0);
    let band_low = capacity_mid * (1.0 - cfg.capacity_band_fraction);
    let band_high = capacity_mid * (1.0 + cfg.capacity_band_fraction);

    let mut start_km = capacity_mid.clamp(band_low, band_high);
    let mut capped_by_recent = false;

    if let Some(recent) = recent_weekly_km {
        let cap = recent * cfg.recent_volume_cap_factor;
        if cap < start_km {
            start_km = cap.max(10.0);
            capped_by_recent = true;
            tracing::debug!(
                "Start volume capped at {:.1} km by recent actual volume {:.1} km",
                start_km,
                recent
            );
        }
    }

    // Peak cannot outrun what the 10% rule allows from the start volume.
    // The per-week headroom is below 10% because recovery weeks and the
    // taper shorten the climbing portion of the plan.
    let growth_ceiling =
        start_km * (1.0 + WEEKLY_GROWTH_HEADROOM * weeks_available.saturating_sub(1) as f64);
    let peak_km = goal_peak_km(race).min(growth_ceiling).max(start_km);

    VolumeRecommendation {
        start_km: round_km(start_km),
        peak_km: round_km(peak_km),
        capped_by_recent,
    }
}

fn round_km(km: f64) -> f64 {
    (km * 10.0).round() / 10.0
}
