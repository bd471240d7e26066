//! Evidence-based guardrail validation for plans and weeks.
//!
//! Every rule in the table is evaluated independently and without
//! short-circuiting; a week can fail several rules at once and each failed
//! rule contributes exactly one violation. Violations are structured data,
//! never exceptions; the caller decides whether to block or proceed.
//!
//! Rules and sources:
//! - Intensity distribution: >=80% low intensity at 3+ run days (80/20)
//! - T-pace work <= 10% of weekly volume (Daniels)
//! - I-pace work <= min(10 km, 8%) (Daniels)
//! - R-pace work <= min(8 km, 5%) (Daniels)
//! - Long-run share <= 25-30% of weekly volume (Pfitzinger)
//! - Long-run duration <= 150 minutes (Pfitzinger)
//! - Weekly progression <= 10% over previous non-recovery week (10% rule)
//! - Minimum session length: easy >= 5 km, long >= 8 km, or 80% of the
//!   athlete's observed typical distances
//! - Quality spacing >= 48 h between RPE>=7 sessions

use crate::{
    AthleteProfile, GuardrailRule, GuardrailViolation, Severity, TrainingPlan, WeekPlan,
    WorkoutPrescription, WorkoutStructure, WorkoutType,
};

const LOW_INTENSITY_FLOOR: f64 = 0.80;
const LONG_SHARE_SOFT_LIMIT: f64 = 0.25;
const LONG_SHARE_HARD_LIMIT: f64 = 0.30;
const LONG_DURATION_LIMIT_MIN: f64 = 150.0;
const PROGRESSION_LIMIT: f64 = 1.10;
const MIN_EASY_KM: f64 = 5.0;
const MIN_LONG_KM: f64 = 8.0;
const QUALITY_SPACING_HOURS: f64 = 48.0;

/// Severity from the relative magnitude of the breach
fn escalate(breach_fraction: f64) -> Severity {
    if breach_fraction < 0.05 {
        Severity::Info
    } else if breach_fraction < 0.20 {
        Severity::Warning
    } else {
        Severity::Danger
    }
}

/// Distance run at the workout's quality pace, derived from the structure
fn quality_work_km(workout: &WorkoutPrescription) -> f64 {
    match &workout.structure {
        WorkoutStructure::Tempo { work_minutes } => {
            let mid_pace = (workout.pace.fast_min_per_km + workout.pace.slow_min_per_km) / 2.0;
            work_minutes / mid_pace
        }
        WorkoutStructure::Intervals {
            reps, work_meters, ..
        } => f64::from(*reps) * f64::from(*work_meters) / 1000.0,
        WorkoutStructure::Continuous => workout.distance_km,
    }
}

/// Validate one week against every guardrail rule
///
/// `prev_non_recovery_km` is the previous non-recovery week's volume for
/// the progression rule; pass `None` for the first week or when validating
/// a week in isolation.
pub fn validate_week(
    week: &WeekPlan,
    prev_non_recovery_km: Option<f64>,
    profile: &AthleteProfile,
) -> Vec<GuardrailViolation> {
    let mut violations = Vec::new();
    let total_km: f64 = week.prescribed_km();
    let total_minutes: f64 = week.workouts.iter().map(|w| w.duration_minutes).sum();
    let week_index = Some(week.index);

    if total_km <= 0.0 {
        return violations;
    }

    // Intensity distribution (80/20) at 3+ run days. Warmups and cooldowns
    // inside quality sessions count as low-intensity time, so the hard share
    // is derived from each structure's work portion.
    if week.workouts.len() >= 3 && total_minutes > 0.0 {
        let hard_minutes: f64 = week
            .workouts
            .iter()
            .filter(|w| w.workout_type.is_quality())
            .map(hard_work_minutes)
            .sum();
        let share = 1.0 - hard_minutes / total_minutes;
        if share < LOW_INTENSITY_FLOOR {
            violations.push(GuardrailViolation {
                rule: GuardrailRule::IntensityDistribution,
                severity: escalate((LOW_INTENSITY_FLOOR - share) / LOW_INTENSITY_FLOOR),
                actual: share,
                limit: LOW_INTENSITY_FLOOR,
                week_index,
                message: format!(
                    "Only {:.0}% of training time is low intensity; 80% is the floor",
                    share * 100.0
                ),
            });
        }
    }

    // Daniels quality-volume caps
    let pace_caps = [
        (
            GuardrailRule::ThresholdVolume,
            WorkoutType::Threshold,
            0.10 * total_km,
        ),
        (
            GuardrailRule::IntervalVolume,
            WorkoutType::Interval,
            (0.08 * total_km).min(10.0),
        ),
        (
            GuardrailRule::RepetitionVolume,
            WorkoutType::Repetition,
            (0.05 * total_km).min(8.0),
        ),
    ];
    for (rule, workout_type, limit) in pace_caps {
        let work: f64 = week
            .workouts
            .iter()
            .filter(|w| w.workout_type == workout_type)
            .map(quality_work_km)
            .sum();
        if work > limit && limit > 0.0 {
            violations.push(GuardrailViolation {
                rule,
                severity: escalate((work - limit) / limit),
                actual: work,
                limit,
                week_index,
                message: format!(
                    "{} work of {:.1} km exceeds the {:.1} km cap",
                    rule.name(),
                    work,
                    limit
                ),
            });
        }
    }

    // Long-run share and duration
    if let Some(long) = week.workouts.iter().find(|w| w.long_run) {
        let share = long.distance_km / total_km;
        if share > LONG_SHARE_HARD_LIMIT {
            violations.push(GuardrailViolation {
                rule: GuardrailRule::LongRunShare,
                severity: escalate((share - LONG_SHARE_HARD_LIMIT) / LONG_SHARE_HARD_LIMIT),
                actual: share,
                limit: LONG_SHARE_HARD_LIMIT,
                week_index,
                message: format!(
                    "Long run is {:.0}% of weekly volume; cap is 30%",
                    share * 100.0
                ),
            });
        } else if share > LONG_SHARE_SOFT_LIMIT {
            violations.push(GuardrailViolation {
                rule: GuardrailRule::LongRunShare,
                severity: Severity::Info,
                actual: share,
                limit: LONG_SHARE_SOFT_LIMIT,
                week_index,
                message: format!(
                    "Long run is {:.0}% of weekly volume; 25-30% is the upper band",
                    share * 100.0
                ),
            });
        }

        if long.duration_minutes > LONG_DURATION_LIMIT_MIN {
            violations.push(GuardrailViolation {
                rule: GuardrailRule::LongRunDuration,
                severity: escalate(
                    (long.duration_minutes - LONG_DURATION_LIMIT_MIN) / LONG_DURATION_LIMIT_MIN,
                ),
                actual: long.duration_minutes,
                limit: LONG_DURATION_LIMIT_MIN,
                week_index,
                message: format!(
                    "Long run of {:.0} minutes exceeds the 150-minute cap",
                    long.duration_minutes
                ),
            });
        }
    }

    // Weekly progression (10% rule) against the last non-recovery week
    if let Some(prev) = prev_non_recovery_km {
        if !week.recovery && prev > 0.0 {
            let ratio = week.target_volume_km / prev;
            if ratio > PROGRESSION_LIMIT {
                violations.push(GuardrailViolation {
                    rule: GuardrailRule::WeeklyProgression,
                    severity: escalate((ratio - PROGRESSION_LIMIT) / PROGRESSION_LIMIT),
                    actual: ratio,
                    limit: PROGRESSION_LIMIT,
                    week_index,
                    message: format!(
                        "Volume rises {:.0}% over the previous non-recovery week; 10% is the cap",
                        (ratio - 1.0) * 100.0
                    ),
                });
            }
        }
    }

    // Minimum session lengths (feasibility), worst offender per rule
    let min_easy = profile
        .typical_easy_km
        .map_or(MIN_EASY_KM, |typical| (typical * 0.8).max(MIN_EASY_KM));
    let min_long = profile
        .typical_long_km
        .map_or(MIN_LONG_KM, |typical| (typical * 0.8).max(MIN_LONG_KM));
    let worst_short = week
        .workouts
        .iter()
        .filter_map(|w| {
            let floor = match w.workout_type {
                WorkoutType::Easy => min_easy,
                WorkoutType::Long => min_long,
                _ => return None,
            };
            (w.distance_km < floor).then_some((floor - w.distance_km, w.distance_km, floor))
        })
        .max_by(|a, b| a.0.total_cmp(&b.0));
    if let Some((deficit, actual, floor)) = worst_short {
        violations.push(GuardrailViolation {
            rule: GuardrailRule::MinimumSession,
            severity: escalate(deficit / floor),
            actual,
            limit: floor,
            week_index,
            message: format!(
                "Session of {:.1} km is below the {:.1} km feasibility floor",
                actual, floor
            ),
        });
    }

    // Quality spacing within the week
    if let Some(gap_hours) = min_hard_gap_hours(&week.workouts) {
        if gap_hours < QUALITY_SPACING_HOURS {
            violations.push(GuardrailViolation {
                rule: GuardrailRule::QualitySpacing,
                severity: escalate((QUALITY_SPACING_HOURS - gap_hours) / QUALITY_SPACING_HOURS),
                actual: gap_hours,
                limit: QUALITY_SPACING_HOURS,
                week_index,
                message: format!(
                    "Hard sessions are {:.0} h apart; 48 h is the minimum",
                    gap_hours
                ),
            });
        }
    }

    violations
}

/// Minutes spent at the workout's quality pace
fn hard_work_minutes(workout: &WorkoutPrescription) -> f64 {
    let mid_pace = (workout.pace.fast_min_per_km + workout.pace.slow_min_per_km) / 2.0;
    match &workout.structure {
        WorkoutStructure::Tempo { work_minutes } => *work_minutes,
        WorkoutStructure::Intervals {
            reps, work_meters, ..
        } => f64::from(*reps) * f64::from(*work_meters) / 1000.0 * mid_pace,
        WorkoutStructure::Continuous => workout.duration_minutes,
    }
}

/// Smallest gap in hours between RPE>=7 sessions in one week
fn min_hard_gap_hours(workouts: &[WorkoutPrescription]) -> Option<f64> {
    let mut days: Vec<i64> = workouts
        .iter()
        .filter(|w| w.target_rpe >= 7)
        .map(|w| i64::from(w.day.num_days_from_monday()))
        .collect();
    days.sort_unstable();
    days.windows(2)
        .map(|pair| (pair[1] - pair[0]) as f64 * 24.0)
        .min_by(f64::total_cmp)
}

/// Validate a whole plan: every week plus the cross-week rules
pub fn validate_plan(plan: &TrainingPlan, profile: &AthleteProfile) -> Vec<GuardrailViolation> {
    let mut violations = Vec::new();
    let mut prev_non_recovery: Option<f64> = None;

    for week in &plan.weeks {
        violations.extend(validate_week(week, prev_non_recovery, profile));
        if !week.recovery {
            prev_non_recovery = Some(week.target_volume_km);
        }
    }

    // Quality spacing across week boundaries, all weeks flattened by date
    let mut hard_dates: Vec<(chrono::NaiveDate, usize)> = plan
        .weeks
        .iter()
        .flat_map(|week| {
            week.workouts
                .iter()
                .filter(|w| w.target_rpe >= 7)
                .map(move |w| (plan.scheduled_date(week.index, w.day), week.index))
        })
        .collect();
    hard_dates.sort_by_key(|(date, _)| *date);

    for pair in hard_dates.windows(2) {
        let (first_date, first_week) = pair[0];
        let (second_date, second_week) = pair[1];
        if first_week == second_week {
            continue; // already covered by the per-week check
        }
        let gap_hours = (second_date - first_date).num_days() as f64 * 24.0;
        if gap_hours < QUALITY_SPACING_HOURS {
            violations.push(GuardrailViolation {
                rule: GuardrailRule::QualitySpacing,
                severity: escalate((QUALITY_SPACING_HOURS - gap_hours) / QUALITY_SPACING_HOURS),
                actual: gap_hours,
                limit: QUALITY_SPACING_HOURS,
                week_index: Some(second_week),
                message: format!(
                    "Hard sessions across weeks {} and {} are {:.0} h apart; 48 h is the minimum",
                    first_week, second_week, gap_hours
                ),
            });
        }
    }

    tracing::debug!(
        "Validated plan {}: {} violations across {} weeks",
        plan.id,
        violations.len(),
        plan.weeks.len()
    );

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workout::construct_workout;
    use crate::{ConflictPolicy, Constraints, Goal, Phase, RaceDistance};
    use chrono::{NaiveDate, Weekday};

    fn test_profile() -> AthleteProfile {
        AthleteProfile {
            goal: Goal {
                race: RaceDistance::HalfMarathon,
                target_date: NaiveDate::from_ymd_opt(2024, 10, 6).unwrap(),
                target_time_minutes: None,
            },
            constraints: Constraints::default(),
            vdot: 48.0,
            conflict_policy: ConflictPolicy::RunPriority,
            typical_easy_km: None,
            typical_long_km: None,
            lower_body_weekly_threshold_au: None,
        }
    }

    fn week_from(workouts: Vec<WorkoutPrescription>, target: f64) -> WeekPlan {
        WeekPlan {
            index: 0,
            phase: Phase::Build,
            target_volume_km: target,
            recovery: false,
            workouts,
        }
    }

    #[test]
    fn test_overloaded_week_returns_all_breached_rules() {
        let profile = test_profile();
        // 40 km week: T work 6 km (15%), I work 4 km (10%), long 16 km (40%)
        let workouts = vec![
            construct_workout(WorkoutType::Threshold, Weekday::Tue, 10.0, &profile).unwrap(),
            construct_workout(WorkoutType::Interval, Weekday::Thu, 8.0, &profile).unwrap(),
            construct_workout(WorkoutType::Long, Weekday::Sun, 16.0, &profile).unwrap(),
            construct_workout(WorkoutType::Easy, Weekday::Sat, 6.0, &profile).unwrap(),
        ];
        let week = week_from(workouts, 40.0);

        let violations = validate_week(&week, None, &profile);
        let rules: std::collections::HashSet<_> =
            violations.iter().map(|v| v.rule).collect();

        assert!(rules.contains(&GuardrailRule::ThresholdVolume));
        assert!(rules.contains(&GuardrailRule::IntervalVolume));
        assert!(rules.contains(&GuardrailRule::LongRunShare));
        assert!(rules.len() >= 3, "expected at least 3 distinct rules");
    }

    #[test]
    fn test_clean_week_passes() {
        let profile = test_profile();
        let workouts = vec![
            construct_workout(WorkoutType::Easy, Weekday::Mon, 8.0, &profile).unwrap(),
            construct_workout(WorkoutType::Threshold, Weekday::Wed, 7.5, &profile).unwrap(),
            construct_workout(WorkoutType::Easy, Weekday::Fri, 8.5, &profile).unwrap(),
            construct_workout(WorkoutType::Long, Weekday::Sun, 11.0, &profile).unwrap(),
        ];
        let week = week_from(workouts, 35.0);

        let violations = validate_week(&week, Some(33.0), &profile);
        assert!(
            violations.iter().all(|v| v.severity == Severity::Info),
            "unexpected violations: {:?}",
            violations
        );
    }

    #[test]
    fn test_progression_rule_uses_non_recovery_baseline() {
        let profile = test_profile();
        let workouts = vec![
            construct_workout(WorkoutType::Easy, Weekday::Mon, 15.0, &profile).unwrap(),
            construct_workout(WorkoutType::Easy, Weekday::Wed, 15.0, &profile).unwrap(),
            construct_workout(WorkoutType::Easy, Weekday::Fri, 15.0, &profile).unwrap(),
        ];
        let week = week_from(workouts, 45.0);

        // Against last non-recovery week of 40 km -> 12.5% jump
        let violations = validate_week(&week, Some(40.0), &profile);
        assert!(violations
            .iter()
            .any(|v| v.rule == GuardrailRule::WeeklyProgression));

        // Same week against a 42 km baseline is fine
        let violations = validate_week(&week, Some(42.0), &profile);
        assert!(!violations
            .iter()
            .any(|v| v.rule == GuardrailRule::WeeklyProgression));
    }

    #[test]
    fn test_severity_escalates_with_breach() {
        let profile = test_profile();

        let mild = vec![
            construct_workout(WorkoutType::Easy, Weekday::Mon, 14.0, &profile).unwrap(),
            construct_workout(WorkoutType::Easy, Weekday::Wed, 14.0, &profile).unwrap(),
            construct_workout(WorkoutType::Easy, Weekday::Fri, 14.0, &profile).unwrap(),
        ];
        let severe = mild.clone();

        let mild_week = week_from(mild, 42.0);
        let severe_week = week_from(severe, 42.0);

        let mild_violation = validate_week(&mild_week, Some(37.0), &profile)
            .into_iter()
            .find(|v| v.rule == GuardrailRule::WeeklyProgression)
            .unwrap();
        let severe_violation = validate_week(&severe_week, Some(28.0), &profile)
            .into_iter()
            .find(|v| v.rule == GuardrailRule::WeeklyProgression)
            .unwrap();

        assert!(severe_violation.severity > mild_violation.severity);
    }

    #[test]
    fn test_quality_spacing_within_week() {
        let profile = test_profile();
        let workouts = vec![
            construct_workout(WorkoutType::Threshold, Weekday::Tue, 8.0, &profile).unwrap(),
            construct_workout(WorkoutType::Interval, Weekday::Wed, 7.0, &profile).unwrap(),
            construct_workout(WorkoutType::Easy, Weekday::Fri, 8.0, &profile).unwrap(),
            construct_workout(WorkoutType::Long, Weekday::Sun, 10.0, &profile).unwrap(),
        ];
        let week = week_from(workouts, 33.0);

        let violations = validate_week(&week, None, &profile);
        assert!(violations
            .iter()
            .any(|v| v.rule == GuardrailRule::QualitySpacing));
    }

    #[test]
    fn test_short_sessions_flagged_once() {
        let profile = test_profile();
        let workouts = vec![
            construct_workout(WorkoutType::Easy, Weekday::Mon, 3.0, &profile).unwrap(),
            construct_workout(WorkoutType::Easy, Weekday::Wed, 4.0, &profile).unwrap(),
            construct_workout(WorkoutType::Easy, Weekday::Fri, 8.0, &profile).unwrap(),
        ];
        let week = week_from(workouts, 15.0);

        let violations = validate_week(&week, None, &profile);
        let minimum: Vec<_> = violations
            .iter()
            .filter(|v| v.rule == GuardrailRule::MinimumSession)
            .collect();
        assert_eq!(minimum.len(), 1);
        assert_eq!(minimum[0].actual, 3.0); // worst offender reported
    }

    #[test]
    fn test_long_run_duration_cap() {
        let mut profile = test_profile();
        profile.vdot = 30.0; // slow paces push duration over the cap
        let long = construct_workout(WorkoutType::Long, Weekday::Sun, 24.0, &profile).unwrap();
        assert!(long.duration_minutes > 150.0);

        let week = week_from(vec![long], 24.0);
        let violations = validate_week(&week, None, &profile);
        assert!(violations
            .iter()
            .any(|v| v.rule == GuardrailRule::LongRunDuration));
    }
}
