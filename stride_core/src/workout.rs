//! Workout prescription construction and plan assembly.
//!
//! `construct_workout` turns a (type, day, distance) request into a fully
//! populated prescription using VDOT-derived paces; nothing is returned
//! half-filled. `build_plan` composes phase allocation, the volume curve and
//! per-week workout construction into a complete `TrainingPlan`.

use crate::config::Config;
use crate::phases::allocate_phases;
use crate::volume::{progress_volume, suggest_volume};
use crate::{
    vdot, AthleteProfile, Error, Phase, Result, TrainingPlan, WeekPlan, WeeklyVolume,
    WorkoutPrescription, WorkoutStructure, WorkoutType,
};
use chrono::{NaiveDate, Utc, Weekday};
use uuid::Uuid;

/// Warmup plus cooldown distance wrapped around quality work
const QUALITY_WRAPPER_KM: f64 = 4.0;

/// Quality work below this size is not worth scheduling
const MIN_QUALITY_WORK_KM: f64 = 2.0;

/// Smallest long run worth designating as such
const MIN_LONG_RUN_KM: f64 = 8.0;

fn target_rpe(workout_type: WorkoutType) -> u8 {
    match workout_type {
        WorkoutType::Rest => 1,
        WorkoutType::Recovery => 2,
        WorkoutType::Easy => 3,
        WorkoutType::Long => 5,
        WorkoutType::Threshold => 7,
        WorkoutType::Repetition => 8,
        WorkoutType::Interval => 9,
    }
}

fn mid_pace(range: &crate::PaceRange) -> f64 {
    (range.fast_min_per_km + range.slow_min_per_km) / 2.0
}

/// Construct a fully-populated workout prescription
///
/// The distance is the total for the session, warmup and cooldown included
/// for quality types. Requesting a `Rest` prescription or a non-positive
/// distance is a validation error, not a silent default.
pub fn construct_workout(
    workout_type: WorkoutType,
    day: Weekday,
    distance_km: f64,
    profile: &AthleteProfile,
) -> Result<WorkoutPrescription> {
    if workout_type == WorkoutType::Rest {
        return Err(Error::Validation(
            "Rest days carry no workout prescription".into(),
        ));
    }
    if !distance_km.is_finite() || distance_km <= 0.0 {
        return Err(Error::Validation(format!(
            "Workout distance must be positive: {} km",
            distance_km
        )));
    }

    let pace = vdot::pace_range(profile.vdot, workout_type)?;
    let easy_pace = vdot::pace_range(profile.vdot, WorkoutType::Easy)?;

    let (structure, duration_minutes) = match workout_type {
        WorkoutType::Recovery | WorkoutType::Easy | WorkoutType::Long => {
            (WorkoutStructure::Continuous, distance_km * mid_pace(&pace))
        }
        WorkoutType::Threshold => {
            let work_km = quality_work_km(distance_km);
            let work_minutes = round1(work_km * mid_pace(&pace));
            let wrapper_minutes = (distance_km - work_km) * mid_pace(&easy_pace);
            (
                WorkoutStructure::Tempo { work_minutes },
                work_minutes + wrapper_minutes,
            )
        }
        WorkoutType::Interval => {
            let work_km = quality_work_km(distance_km);
            // Floor keeps the interval work under the distance allocated to it
            let reps = (work_km.floor() as u32).clamp(2, 8);
            let recovery_minutes = 3.0;
            let work_minutes = f64::from(reps) * mid_pace(&pace);
            let wrapper_minutes = (distance_km - f64::from(reps)) * mid_pace(&easy_pace);
            (
                WorkoutStructure::Intervals {
                    reps,
                    work_meters: 1000,
                    recovery_minutes,
                },
                work_minutes + f64::from(reps - 1) * recovery_minutes + wrapper_minutes,
            )
        }
        WorkoutType::Repetition => {
            let work_km = quality_work_km(distance_km);
            let reps = ((work_km * 1000.0 / 400.0).floor() as u32).clamp(4, 12);
            let recovery_minutes = 2.0;
            let work_minutes = f64::from(reps) * 0.4 * mid_pace(&pace);
            let wrapper_minutes = (distance_km - f64::from(reps) * 0.4) * mid_pace(&easy_pace);
            (
                WorkoutStructure::Intervals {
                    reps,
                    work_meters: 400,
                    recovery_minutes,
                },
                work_minutes + f64::from(reps - 1) * recovery_minutes + wrapper_minutes,
            )
        }
        WorkoutType::Rest => unreachable!("rejected above"),
    };

    Ok(WorkoutPrescription {
        id: Uuid::new_v4(),
        day,
        workout_type,
        distance_km: round1(distance_km),
        duration_minutes: round1(duration_minutes.max(0.0)),
        structure,
        pace,
        hr_zone: vdot::hr_zone(workout_type),
        long_run: workout_type == WorkoutType::Long,
        quality: workout_type.is_quality(),
        target_rpe: target_rpe(workout_type),
    })
}

/// Work portion of a quality session's total distance
pub fn quality_work_km(distance_km: f64) -> f64 {
    (distance_km - QUALITY_WRAPPER_KM).max(distance_km * 0.3)
}

// ============================================================================
// Plan assembly
// ============================================================================

/// Inputs for generating a plan, supplied by the metrics/profile collaborators
#[derive(Clone, Debug)]
pub struct PlanRequest {
    pub start_date: NaiveDate,
    pub total_weeks: usize,
    pub current_ctl: f64,
    pub recent_weekly_km: Option<f64>,
}

/// Generate a complete training plan for the athlete
///
/// Composes `allocate_phases` -> `suggest_volume` -> `progress_volume` ->
/// per-week workout construction. Recovery weeks land every 4th week of the
/// growth period; taper weeks step the volume down from peak.
pub fn build_plan(
    profile: &AthleteProfile,
    request: &PlanRequest,
    cfg: &Config,
) -> Result<TrainingPlan> {
    let available = ordered_available_days(profile);
    if available.len() < usize::from(profile.constraints.min_run_days) {
        return Err(Error::Validation(format!(
            "Only {} available days for at least {} run days",
            available.len(),
            profile.constraints.min_run_days
        )));
    }

    let alloc = allocate_phases(request.total_weeks, profile.goal.race)?;
    let recommendation = suggest_volume(
        request.current_ctl,
        profile.goal.race,
        request.total_weeks,
        request.recent_weekly_km,
        &cfg.volume,
    );

    let growth_weeks = request.total_weeks - alloc.taper;
    let recovery_indices: Vec<usize> = (0..growth_weeks)
        .filter(|i| (i + 1) % 4 == 0 && *i != growth_weeks - 1)
        .collect();

    let mut curve = progress_volume(
        recommendation.start_km,
        recommendation.peak_km,
        growth_weeks,
        &recovery_indices,
        &cfg.volume,
    )?;

    for (k, index) in (growth_weeks..request.total_weeks).enumerate() {
        curve.push(WeeklyVolume {
            week_index: index,
            target_km: round1(recommendation.peak_km * 0.6 * 0.75_f64.powi(k as i32)),
            recovery: false,
        });
    }

    let mut weeks = Vec::with_capacity(request.total_weeks);
    for entry in &curve {
        let phase = alloc.phase_of(entry.week_index);
        weeks.push(build_week(entry, phase, &available, profile)?);
    }

    tracing::info!(
        "Built {}-week {} plan: {:.0} -> {:.0} km/week",
        request.total_weeks,
        profile.goal.race.name(),
        recommendation.start_km,
        recommendation.peak_km
    );

    Ok(TrainingPlan {
        id: Uuid::new_v4(),
        start_date: request.start_date,
        created_at: Utc::now(),
        weeks,
    })
}

/// Quality session types scheduled for a phase
fn phase_quality(phase: Phase, run_days: usize) -> Vec<WorkoutType> {
    match phase {
        Phase::Base => vec![],
        Phase::Build => vec![WorkoutType::Threshold],
        Phase::Peak => {
            if run_days >= 5 {
                vec![WorkoutType::Interval, WorkoutType::Threshold]
            } else {
                vec![WorkoutType::Interval]
            }
        }
        Phase::Taper => vec![WorkoutType::Threshold],
    }
}

/// Quality work volume as a share of the weekly target
fn quality_work_share(workout_type: WorkoutType, phase: Phase) -> f64 {
    match (workout_type, phase) {
        (WorkoutType::Threshold, Phase::Taper) => 0.06,
        // Exactly the documented caps: T <= 10%, I <= 8% of weekly volume
        (WorkoutType::Threshold, _) => 0.10,
        (WorkoutType::Interval, _) => 0.08,
        (WorkoutType::Repetition, _) => 0.05,
        _ => 0.0,
    }
}

fn build_week(
    volume: &WeeklyVolume,
    phase: Phase,
    available: &[Weekday],
    profile: &AthleteProfile,
) -> Result<WeekPlan> {
    let target = volume.target_km;
    let desired = if target < 30.0 {
        3
    } else if target < 45.0 {
        4
    } else {
        5
    };
    let run_days = desired
        .clamp(
            usize::from(profile.constraints.min_run_days),
            usize::from(profile.constraints.max_run_days),
        )
        .min(available.len());

    let chosen = spread_days(available, run_days);
    let long_day = *chosen.last().ok_or_else(|| {
        Error::Plan("Cannot build a week with no run days".into())
    })?;

    // Long run: ~26% of volume, capped by the session duration limits
    let easy_pace = vdot::pace_range(profile.vdot, WorkoutType::Easy)?;
    let minutes_cap = profile.constraints.max_session_minutes.min(150.0);
    let duration_cap_km = minutes_cap / mid_pace(&easy_pace);
    let mut long_km = (target * 0.26).min(duration_cap_km);
    if long_km < MIN_LONG_RUN_KM {
        long_km = 0.0;
    }

    // Quality sessions, skipped entirely on recovery weeks
    let quality_types = if volume.recovery {
        vec![]
    } else {
        phase_quality(phase, run_days)
    };

    let mut quality: Vec<(WorkoutType, Weekday, f64)> = Vec::new();
    let candidates: Vec<Weekday> = chosen
        .iter()
        .copied()
        .filter(|d| *d != long_day)
        .collect();
    let mut used: Vec<Weekday> = Vec::new();

    for workout_type in quality_types {
        let work_km = target * quality_work_share(workout_type, phase);
        if work_km < MIN_QUALITY_WORK_KM {
            continue;
        }
        let total_km = work_km + QUALITY_WRAPPER_KM;
        if let Some(day) = pick_spaced_day(&candidates, &used) {
            used.push(day);
            quality.push((workout_type, day, total_km));
        }
    }

    let quality_km: f64 = quality.iter().map(|(_, _, km)| km).sum();
    let mut easy_total = target - long_km - quality_km;
    if easy_total < 0.0 {
        // Small weeks: shrink the long run rather than overshoot the target
        long_km = (long_km + easy_total).max(0.0);
        easy_total = 0.0;
    }

    let mut easy_days: Vec<Weekday> = chosen
        .iter()
        .copied()
        .filter(|d| *d != long_day && !used.contains(d))
        .collect();
    if long_km == 0.0 {
        // No long run this week; the slot becomes an ordinary easy day
        easy_days.push(long_day);
    }

    // Keep easy runs above the feasibility floor by dropping days
    let fixed_days = used.len() + usize::from(long_km > 0.0);
    while easy_days.len() > 1
        && (easy_total / easy_days.len() as f64) < 5.0
        && fixed_days + easy_days.len() > usize::from(profile.constraints.min_run_days)
    {
        easy_days.pop();
    }

    let mut workouts = Vec::new();

    if long_km > 0.0 {
        workouts.push(construct_workout(
            WorkoutType::Long,
            long_day,
            long_km,
            profile,
        )?);
    }

    for (workout_type, day, km) in &quality {
        workouts.push(construct_workout(*workout_type, *day, *km, profile)?);
    }

    if !easy_days.is_empty() && easy_total > 0.0 {
        let per_day = easy_total / easy_days.len() as f64;
        for (i, day) in easy_days.iter().enumerate() {
            // Put rounding drift on the last easy run so the week sums exactly
            let km = if i == easy_days.len() - 1 {
                let so_far: f64 = workouts.iter().map(|w| w.distance_km).sum();
                round1(target - so_far)
            } else {
                round1(per_day)
            };
            if km > 0.0 {
                workouts.push(construct_workout(WorkoutType::Easy, *day, km, profile)?);
            }
        }
    }

    workouts.sort_by_key(|w| w.day.num_days_from_monday());

    Ok(WeekPlan {
        index: volume.week_index,
        phase,
        target_volume_km: target,
        recovery: volume.recovery,
        workouts,
    })
}

/// Available days sorted Monday-first with duplicates removed
fn ordered_available_days(profile: &AthleteProfile) -> Vec<Weekday> {
    let mut days = profile.constraints.available_days.clone();
    days.sort_by_key(|d| d.num_days_from_monday());
    days.dedup();
    days
}

/// Pick `count` days spread evenly across the available set
fn spread_days(available: &[Weekday], count: usize) -> Vec<Weekday> {
    let n = available.len();
    if count >= n {
        return available.to_vec();
    }
    if count == 1 {
        return vec![available[n - 1]];
    }
    let mut chosen: Vec<Weekday> = (0..count)
        .map(|j| available[j * (n - 1) / (count - 1)])
        .collect();
    chosen.dedup();
    chosen
}

/// First candidate day at least two days away from every already-used day
fn pick_spaced_day(candidates: &[Weekday], used: &[Weekday]) -> Option<Weekday> {
    candidates.iter().copied().find(|day| {
        used.iter().all(|u| {
            let gap = i64::from(day.num_days_from_monday())
                - i64::from(u.num_days_from_monday());
            gap.abs() >= 2
        })
    })
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConflictPolicy, Constraints, Goal, RaceDistance};

    fn test_profile() -> AthleteProfile {
        AthleteProfile {
            goal: Goal {
                race: RaceDistance::HalfMarathon,
                target_date: NaiveDate::from_ymd_opt(2024, 10, 6).unwrap(),
                target_time_minutes: Some(105.0),
            },
            constraints: Constraints::default(),
            vdot: 48.0,
            conflict_policy: ConflictPolicy::RunPriority,
            typical_easy_km: None,
            typical_long_km: None,
            lower_body_weekly_threshold_au: None,
        }
    }

    fn test_request() -> PlanRequest {
        PlanRequest {
            start_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            total_weeks: 14,
            current_ctl: 42.0,
            recent_weekly_km: Some(38.0),
        }
    }

    #[test]
    fn test_construct_easy_is_fully_populated() {
        let w = construct_workout(WorkoutType::Easy, Weekday::Tue, 8.0, &test_profile()).unwrap();

        assert_eq!(w.workout_type, WorkoutType::Easy);
        assert_eq!(w.distance_km, 8.0);
        assert!(w.duration_minutes > 0.0);
        assert_eq!(w.structure, WorkoutStructure::Continuous);
        assert!(w.pace.fast_min_per_km < w.pace.slow_min_per_km);
        assert!(!w.quality);
        assert!(!w.long_run);
    }

    #[test]
    fn test_construct_threshold_has_tempo_structure() {
        let w =
            construct_workout(WorkoutType::Threshold, Weekday::Tue, 9.0, &test_profile()).unwrap();

        assert!(w.quality);
        assert!(w.target_rpe >= 7);
        match w.structure {
            WorkoutStructure::Tempo { work_minutes } => assert!(work_minutes > 0.0),
            ref other => panic!("Expected tempo structure, got {:?}", other),
        }
    }

    #[test]
    fn test_construct_interval_counts_reps() {
        let w =
            construct_workout(WorkoutType::Interval, Weekday::Thu, 8.0, &test_profile()).unwrap();

        match w.structure {
            WorkoutStructure::Intervals {
                reps, work_meters, ..
            } => {
                assert_eq!(work_meters, 1000);
                assert_eq!(reps, 4); // 8 km total minus 4 km wrapper
            }
            ref other => panic!("Expected intervals, got {:?}", other),
        }
    }

    #[test]
    fn test_construct_rejects_rest_and_bad_distance() {
        let profile = test_profile();
        assert!(construct_workout(WorkoutType::Rest, Weekday::Mon, 5.0, &profile).is_err());
        assert!(construct_workout(WorkoutType::Easy, Weekday::Mon, 0.0, &profile).is_err());
        assert!(construct_workout(WorkoutType::Easy, Weekday::Mon, -2.0, &profile).is_err());
    }

    #[test]
    fn test_build_plan_has_requested_weeks() {
        let plan = build_plan(&test_profile(), &test_request(), &Config::default()).unwrap();
        assert_eq!(plan.weeks.len(), 14);

        // Phases appear in order
        assert_eq!(plan.weeks[0].phase, Phase::Base);
        assert_eq!(plan.weeks.last().unwrap().phase, Phase::Taper);
    }

    #[test]
    fn test_week_volume_sums_to_target_within_tolerance() {
        let plan = build_plan(&test_profile(), &test_request(), &Config::default()).unwrap();

        for week in &plan.weeks {
            let prescribed = week.prescribed_km();
            let tolerance = week.target_volume_km * 0.05;
            assert!(
                (prescribed - week.target_volume_km).abs() <= tolerance,
                "week {}: {} km prescribed vs {} km target",
                week.index,
                prescribed,
                week.target_volume_km
            );
        }
    }

    #[test]
    fn test_recovery_weeks_carry_no_quality() {
        let plan = build_plan(&test_profile(), &test_request(), &Config::default()).unwrap();

        let recovery_weeks: Vec<_> = plan.weeks.iter().filter(|w| w.recovery).collect();
        assert!(!recovery_weeks.is_empty());
        for week in recovery_weeks {
            assert!(
                week.workouts.iter().all(|w| !w.quality),
                "recovery week {} has quality work",
                week.index
            );
        }
    }

    #[test]
    fn test_build_weeks_have_quality() {
        let plan = build_plan(&test_profile(), &test_request(), &Config::default()).unwrap();

        let build_week = plan
            .weeks
            .iter()
            .find(|w| w.phase == Phase::Build && !w.recovery)
            .unwrap();
        assert!(build_week.workouts.iter().any(|w| w.quality));
    }

    #[test]
    fn test_quality_days_are_spaced() {
        let plan = build_plan(&test_profile(), &test_request(), &Config::default()).unwrap();

        for week in &plan.weeks {
            let hard_days: Vec<i64> = week
                .workouts
                .iter()
                .filter(|w| w.target_rpe >= 7)
                .map(|w| i64::from(w.day.num_days_from_monday()))
                .collect();
            for pair in hard_days.windows(2) {
                assert!(
                    (pair[1] - pair[0]).abs() >= 2,
                    "week {} quality days too close",
                    week.index
                );
            }
        }
    }

    #[test]
    fn test_plan_rejects_insufficient_weeks() {
        let mut request = test_request();
        request.total_weeks = 8;
        let err = build_plan(&test_profile(), &request, &Config::default()).unwrap_err();
        assert!(matches!(err, Error::InsufficientTime { .. }));
    }

    #[test]
    fn test_taper_volume_steps_down() {
        let plan = build_plan(&test_profile(), &test_request(), &Config::default()).unwrap();
        let peak_volume = plan
            .weeks
            .iter()
            .filter(|w| !w.recovery && w.phase != Phase::Taper)
            .map(|w| w.target_volume_km)
            .fold(0.0, f64::max);

        for week in plan.weeks.iter().filter(|w| w.phase == Phase::Taper) {
            assert!(week.target_volume_km < peak_volume * 0.75);
        }
    }
}
