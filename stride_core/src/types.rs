//! Core domain types for the Stride training engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Activities and their dual-channel loads
//! - Daily metrics (CTL/ATL/TSB/ACWR/readiness)
//! - Athlete profile and constraints
//! - Training plans, weeks and workout prescriptions
//! - Guardrail violations and adaptation suggestions

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Activity Types
// ============================================================================

/// Sport discipline of a recorded activity
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Sport {
    Run,
    Bike,
    Swim,
    Climb,
    Strength,
    Hike,
    Row,
    XcSki,
    Other(String),
}

impl std::fmt::Display for Sport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Sport::Run => "run",
            Sport::Bike => "bike",
            Sport::Swim => "swim",
            Sport::Climb => "climb",
            Sport::Strength => "strength",
            Sport::Hike => "hike",
            Sport::Row => "row",
            Sport::XcSki => "xc_ski",
            Sport::Other(s) => s,
        };
        write!(f, "{}", name)
    }
}

impl Sport {
    /// Parse a sport string into the enum, preserving unknown names
    pub fn parse(s: &str) -> Sport {
        match s.to_lowercase().as_str() {
            "run" | "running" => Sport::Run,
            "bike" | "ride" | "cycling" => Sport::Bike,
            "swim" | "swimming" => Sport::Swim,
            "climb" | "climbing" | "bouldering" => Sport::Climb,
            "strength" | "weights" | "gym" => Sport::Strength,
            "hike" | "hiking" => Sport::Hike,
            "row" | "rowing" => Sport::Row,
            "xc_ski" | "nordic_ski" => Sport::XcSki,
            other => Sport::Other(other.to_string()),
        }
    }
}

/// A recorded activity, immutable once logged
///
/// The two load scalars are a pure function of (sport, duration, rpe) and
/// are recomputable at any time; they are never hand-edited.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub date: NaiveDate,
    pub sport: Sport,
    pub duration_minutes: f64,
    /// Session RPE on the 1-10 scale
    pub rpe: u8,
    pub notes: Option<String>,
    pub systemic_load_au: f64,
    pub lower_body_load_au: f64,
}

/// Per-day aggregated load across both channels
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DayLoad {
    pub systemic_au: f64,
    pub lower_body_au: f64,
}

// ============================================================================
// Metrics Types
// ============================================================================

/// ACWR risk zone classification
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AcwrZone {
    /// ACWR < 0.8: load low relative to base
    Undertrained,
    /// 0.8 <= ACWR < 1.3
    Safe,
    /// 1.3 <= ACWR < 1.5
    Caution,
    /// ACWR >= 1.5
    Danger,
}

/// Derived metrics for one calendar day
///
/// Fully recomputable from the activity history up to that day. `acwr` and
/// `readiness` are `None` while there is not enough history to make the
/// value meaningful, never a misleading zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyMetrics {
    pub date: NaiveDate,
    pub systemic_load_au: f64,
    pub lower_body_load_au: f64,
    pub ctl: f64,
    pub atl: f64,
    pub tsb: f64,
    pub acwr: Option<f64>,
    pub acwr_zone: Option<AcwrZone>,
    pub readiness: Option<f64>,
}

// ============================================================================
// Athlete Profile
// ============================================================================

/// Goal race distance
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RaceDistance {
    FiveK,
    TenK,
    HalfMarathon,
    Marathon,
}

impl RaceDistance {
    pub fn distance_km(&self) -> f64 {
        match self {
            RaceDistance::FiveK => 5.0,
            RaceDistance::TenK => 10.0,
            RaceDistance::HalfMarathon => 21.1,
            RaceDistance::Marathon => 42.2,
        }
    }

    /// Minimum plan length in weeks for this goal
    pub fn minimum_weeks(&self) -> usize {
        match self {
            RaceDistance::FiveK => 6,
            RaceDistance::TenK => 8,
            RaceDistance::HalfMarathon => 12,
            RaceDistance::Marathon => 16,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RaceDistance::FiveK => "5K",
            RaceDistance::TenK => "10K",
            RaceDistance::HalfMarathon => "half marathon",
            RaceDistance::Marathon => "marathon",
        }
    }
}

/// Race goal with target date and optional target time
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Goal {
    pub race: RaceDistance,
    pub target_date: NaiveDate,
    pub target_time_minutes: Option<f64>,
}

/// Scheduling constraints from the athlete
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Constraints {
    pub min_run_days: u8,
    pub max_run_days: u8,
    pub max_session_minutes: f64,
    pub available_days: Vec<Weekday>,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            min_run_days: 3,
            max_run_days: 5,
            max_session_minutes: 150.0,
            available_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Thu,
                Weekday::Sat,
                Weekday::Sun,
            ],
        }
    }
}

/// How to resolve run/other-sport scheduling conflicts
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Run workouts win the slot
    RunPriority,
    /// Alternate between sports when both want a day
    BalanceSports,
    /// Drop the conflicting session entirely
    ProtectRecovery,
}

/// Athlete profile snapshot, read-only per engine call
///
/// Mutated only by explicit profile-update operations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AthleteProfile {
    pub goal: Goal,
    pub constraints: Constraints,
    /// VDOT baseline (Daniels)
    pub vdot: f64,
    pub conflict_policy: ConflictPolicy,
    /// Observed typical easy-run distance, if known
    pub typical_easy_km: Option<f64>,
    /// Observed typical long-run distance, if known
    pub typical_long_km: Option<f64>,
    /// Athlete-specific weekly lower-body load gate (AU over trailing 7 days)
    pub lower_body_weekly_threshold_au: Option<f64>,
}

// ============================================================================
// Plan Types
// ============================================================================

/// Periodization phase
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Base,
    Build,
    Peak,
    Taper,
}

/// Week counts per phase produced by phase allocation
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhaseAllocation {
    pub base: usize,
    pub build: usize,
    pub peak: usize,
    pub taper: usize,
}

impl PhaseAllocation {
    pub fn total(&self) -> usize {
        self.base + self.build + self.peak + self.taper
    }

    /// Phase that a given zero-based week index falls in
    pub fn phase_of(&self, week_index: usize) -> Phase {
        if week_index < self.base {
            Phase::Base
        } else if week_index < self.base + self.build {
            Phase::Build
        } else if week_index < self.base + self.build + self.peak {
            Phase::Peak
        } else {
            Phase::Taper
        }
    }
}

/// One entry of a weekly volume curve
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeeklyVolume {
    pub week_index: usize,
    pub target_km: f64,
    pub recovery: bool,
}

/// Starting/peak volume recommendation from CTL capacity
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct VolumeRecommendation {
    pub start_km: f64,
    pub peak_km: f64,
    /// True when the 110%-of-recent-actual cap bounded the start volume
    pub capped_by_recent: bool,
}

/// Target pace window in minutes per kilometre (fast bound first)
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct PaceRange {
    pub fast_min_per_km: f64,
    pub slow_min_per_km: f64,
}

/// Heart-rate training zone
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HrZone {
    Z1,
    Z2,
    Z3,
    Z4,
    Z5,
}

/// Workout category, maps to Daniels pace families
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutType {
    Recovery,
    Easy,
    Long,
    Threshold,
    Interval,
    Repetition,
    Rest,
}

impl WorkoutType {
    /// Parse a workout type string; unknown types are a validation error,
    /// not a silent default.
    pub fn parse(s: &str) -> crate::Result<WorkoutType> {
        match s.to_lowercase().as_str() {
            "recovery" => Ok(WorkoutType::Recovery),
            "easy" => Ok(WorkoutType::Easy),
            "long" => Ok(WorkoutType::Long),
            "threshold" | "tempo" => Ok(WorkoutType::Threshold),
            "interval" => Ok(WorkoutType::Interval),
            "repetition" | "reps" => Ok(WorkoutType::Repetition),
            "rest" => Ok(WorkoutType::Rest),
            other => Err(crate::Error::Validation(format!(
                "Unknown workout type: {}",
                other
            ))),
        }
    }

    /// Quality sessions carry intensity that demands recovery spacing
    pub fn is_quality(&self) -> bool {
        matches!(
            self,
            WorkoutType::Threshold | WorkoutType::Interval | WorkoutType::Repetition
        )
    }

    /// Low-intensity time for the 80/20 distribution rule
    pub fn is_low_intensity(&self) -> bool {
        matches!(
            self,
            WorkoutType::Recovery | WorkoutType::Easy | WorkoutType::Long
        )
    }
}

/// Internal structure of a workout, closed over the shapes that exist
///
/// Fields that differ by workout type live here rather than as optional
/// fields checked ad hoc.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkoutStructure {
    /// Steady continuous running (easy, long, recovery)
    Continuous,
    /// Warmup + sustained tempo block + cooldown
    Tempo { work_minutes: f64 },
    /// Repeated work bouts with timed recoveries
    Intervals {
        reps: u32,
        work_meters: u32,
        recovery_minutes: f64,
    },
}

/// A fully-populated workout prescription
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkoutPrescription {
    pub id: Uuid,
    pub day: Weekday,
    pub workout_type: WorkoutType,
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub structure: WorkoutStructure,
    pub pace: PaceRange,
    pub hr_zone: HrZone,
    pub long_run: bool,
    pub quality: bool,
    pub target_rpe: u8,
}

/// One week of a training plan
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WeekPlan {
    pub index: usize,
    pub phase: Phase,
    pub target_volume_km: f64,
    pub recovery: bool,
    pub workouts: Vec<WorkoutPrescription>,
}

impl WeekPlan {
    /// Sum of prescribed running distance for the week
    pub fn prescribed_km(&self) -> f64 {
        self.workouts.iter().map(|w| w.distance_km).sum()
    }
}

/// A multi-week training plan, an explicit value passed into and returned
/// from toolkit functions
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainingPlan {
    pub id: Uuid,
    /// First day of week 0; week days are resolved against this
    pub start_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub weeks: Vec<WeekPlan>,
}

impl TrainingPlan {
    /// Concrete calendar date of a workout slot
    pub fn scheduled_date(&self, week_index: usize, day: Weekday) -> NaiveDate {
        let week_start = self.start_date + Duration::weeks(week_index as i64);
        let offset = (7 + day.num_days_from_monday() as i64
            - self.start_date.weekday().num_days_from_monday() as i64)
            % 7;
        week_start + Duration::days(offset)
    }

    /// Look up a workout by reference
    pub fn workout(&self, workout_ref: &WorkoutRef) -> Option<&WorkoutPrescription> {
        self.weeks
            .get(workout_ref.week_index)
            .and_then(|w| w.workouts.iter().find(|p| p.id == workout_ref.workout_id))
    }

    /// Next workout scheduled on or after the given date matching the filter
    pub fn next_workout_where<F>(&self, on_or_after: NaiveDate, filter: F) -> Option<WorkoutRef>
    where
        F: Fn(&WorkoutPrescription) -> bool,
    {
        let mut best: Option<(NaiveDate, WorkoutRef)> = None;
        for week in &self.weeks {
            for workout in &week.workouts {
                if !filter(workout) {
                    continue;
                }
                let date = self.scheduled_date(week.index, workout.day);
                if date < on_or_after {
                    continue;
                }
                let candidate = (
                    date,
                    WorkoutRef {
                        week_index: week.index,
                        workout_id: workout.id,
                    },
                );
                match &best {
                    Some((d, _)) if *d <= date => {}
                    _ => best = Some(candidate),
                }
            }
        }
        best.map(|(_, r)| r)
    }
}

// ============================================================================
// Guardrail Types
// ============================================================================

/// Named guardrail rules, one per evidence-based limit
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GuardrailRule {
    IntensityDistribution,
    ThresholdVolume,
    IntervalVolume,
    RepetitionVolume,
    LongRunShare,
    LongRunDuration,
    WeeklyProgression,
    MinimumSession,
    QualitySpacing,
}

impl GuardrailRule {
    pub fn name(&self) -> &'static str {
        match self {
            GuardrailRule::IntensityDistribution => "intensity_distribution",
            GuardrailRule::ThresholdVolume => "threshold_volume",
            GuardrailRule::IntervalVolume => "interval_volume",
            GuardrailRule::RepetitionVolume => "repetition_volume",
            GuardrailRule::LongRunShare => "long_run_share",
            GuardrailRule::LongRunDuration => "long_run_duration",
            GuardrailRule::WeeklyProgression => "weekly_progression",
            GuardrailRule::MinimumSession => "minimum_session",
            GuardrailRule::QualitySpacing => "quality_spacing",
        }
    }
}

/// Violation severity, escalating with magnitude of breach
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Danger,
}

/// Transient validation result; never persisted, always a toolkit output
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GuardrailViolation {
    pub rule: GuardrailRule,
    pub severity: Severity,
    pub actual: f64,
    pub limit: f64,
    pub week_index: Option<usize>,
    pub message: String,
}

// ============================================================================
// Suggestion Types
// ============================================================================

/// Adaptation trigger classes, fixed table
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    AcwrElevated,
    AcwrHigh,
    ReadinessLow,
    ReadinessVeryLow,
    LowerBodyOverload,
    InjurySignal,
    SessionDensity,
}

impl TriggerKind {
    pub fn name(&self) -> &'static str {
        match self {
            TriggerKind::AcwrElevated => "acwr_elevated",
            TriggerKind::AcwrHigh => "acwr_high",
            TriggerKind::ReadinessLow => "readiness_low",
            TriggerKind::ReadinessVeryLow => "readiness_very_low",
            TriggerKind::LowerBodyOverload => "lower_body_overload",
            TriggerKind::InjurySignal => "injury_signal",
            TriggerKind::SessionDensity => "session_density",
        }
    }

    /// Safety-override triggers bypass the pending state
    pub fn is_safety_override(&self) -> bool {
        matches!(self, TriggerKind::InjurySignal)
    }
}

/// Kind of plan modification a suggestion proposes
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Downgrade,
    Skip,
    Move,
    Substitute,
    Rest,
}

/// Suggestion lifecycle: pending is the only non-terminal state
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

/// The fields of a prescription that suggestions may rewrite
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionFragment {
    pub workout_type: WorkoutType,
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub target_rpe: u8,
}

impl From<&WorkoutPrescription> for PrescriptionFragment {
    fn from(w: &WorkoutPrescription) -> Self {
        Self {
            workout_type: w.workout_type,
            distance_km: w.distance_km,
            duration_minutes: w.duration_minutes,
            target_rpe: w.target_rpe,
        }
    }
}

/// Reference to a workout slot inside a plan
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkoutRef {
    pub week_index: usize,
    pub workout_id: Uuid,
}

/// A proposed, reversible plan modification
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: Uuid,
    pub trigger: TriggerKind,
    pub trigger_value: f64,
    pub workout: WorkoutRef,
    pub kind: SuggestionKind,
    pub original: PrescriptionFragment,
    pub proposed: PrescriptionFragment,
    pub rationale: String,
    pub status: SuggestionStatus,
    pub created_at: DateTime<Utc>,
    /// End of the affected workout's day
    pub expires_at: DateTime<Utc>,
    /// True for safety overrides applied without approval
    pub auto_applied: bool,
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sport_parse() {
        assert_eq!(Sport::parse("Run"), Sport::Run);
        assert_eq!(Sport::parse("cycling"), Sport::Bike);
        assert_eq!(Sport::parse("bouldering"), Sport::Climb);

        match Sport::parse("parkour") {
            Sport::Other(s) => assert_eq!(s, "parkour"),
            _ => panic!("Expected Other variant"),
        }
    }

    #[test]
    fn test_workout_type_parse_rejects_unknown() {
        assert!(WorkoutType::parse("tempo").is_ok());
        assert!(WorkoutType::parse("fartlek").is_err());
    }

    #[test]
    fn test_race_minimum_weeks() {
        assert_eq!(RaceDistance::FiveK.minimum_weeks(), 6);
        assert_eq!(RaceDistance::TenK.minimum_weeks(), 8);
        assert_eq!(RaceDistance::HalfMarathon.minimum_weeks(), 12);
        assert_eq!(RaceDistance::Marathon.minimum_weeks(), 16);
    }

    #[test]
    fn test_scheduled_date_resolution() {
        let plan = TrainingPlan {
            id: Uuid::new_v4(),
            start_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(), // a Monday
            created_at: Utc::now(),
            weeks: vec![],
        };

        assert_eq!(
            plan.scheduled_date(0, Weekday::Mon),
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
        );
        assert_eq!(
            plan.scheduled_date(0, Weekday::Sat),
            NaiveDate::from_ymd_opt(2024, 6, 8).unwrap()
        );
        assert_eq!(
            plan.scheduled_date(2, Weekday::Tue),
            NaiveDate::from_ymd_opt(2024, 6, 18).unwrap()
        );
    }

    #[test]
    fn test_phase_allocation_lookup() {
        let alloc = PhaseAllocation {
            base: 4,
            build: 5,
            peak: 2,
            taper: 1,
        };
        assert_eq!(alloc.total(), 12);
        assert_eq!(alloc.phase_of(0), Phase::Base);
        assert_eq!(alloc.phase_of(3), Phase::Base);
        assert_eq!(alloc.phase_of(4), Phase::Build);
        assert_eq!(alloc.phase_of(9), Phase::Peak);
        assert_eq!(alloc.phase_of(11), Phase::Taper);
    }
}
