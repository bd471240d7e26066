//! Adaptation engine: trigger evaluation and the suggestion lifecycle.
//!
//! Runs once per metrics-refresh cycle against a fixed trigger table and
//! emits `Suggestion` values with a pending -> accepted/declined/expired
//! lifecycle. Ordinary triggers never touch the plan; only an explicit
//! accept commits a change through `apply_suggestion`. The injury-signal
//! safety override is the one exception: it rewrites the targeted
//! prescription immediately and records an already-accepted suggestion.
//!
//! Duplicate suppression is an explicit indexed store keyed by
//! (trigger-class, workout-id): a pair with an open suggestion, or with any
//! suggestion created in the current evaluation cycle (same calendar day),
//! does not fire again. Re-running a refresh with unchanged inputs
//! therefore creates no new suggestions.

use crate::config::TriggerConfig;
use crate::metrics::trailing_lower_body_load;
use crate::{
    Activity, AthleteProfile, DailyMetrics, DayLoad, Error, PrescriptionFragment, Result,
    Suggestion, SuggestionKind, SuggestionStatus, TrainingPlan, TriggerKind, WorkoutRef,
    WorkoutStructure, WorkoutType,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

// ============================================================================
// Suggestion store
// ============================================================================

/// Indexed store of all suggestions, open and terminal
///
/// Terminal suggestions are retained for audit; only `pending()` filters
/// them out.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct SuggestionStore {
    suggestions: Vec<Suggestion>,
}

impl SuggestionStore {
    pub fn all(&self) -> &[Suggestion] {
        &self.suggestions
    }

    pub fn get(&self, id: Uuid) -> Option<&Suggestion> {
        self.suggestions.iter().find(|s| s.id == id)
    }

    /// Open suggestions, oldest first
    pub fn pending(&self) -> impl Iterator<Item = &Suggestion> {
        self.suggestions
            .iter()
            .filter(|s| s.status == SuggestionStatus::Pending)
    }

    /// Move past-due pending suggestions to `Expired`; returns how many
    pub fn expire_due(&mut self, now: DateTime<Utc>) -> usize {
        let mut expired = 0;
        for suggestion in &mut self.suggestions {
            if suggestion.status == SuggestionStatus::Pending && suggestion.expires_at <= now {
                suggestion.status = SuggestionStatus::Expired;
                expired += 1;
            }
        }
        if expired > 0 {
            tracing::debug!("Expired {} stale suggestions", expired);
        }
        expired
    }

    /// Whether a (trigger-class, workout) pair may not fire right now
    ///
    /// Blocked while an unexpired pending suggestion targets the pair, and
    /// for the rest of the evaluation cycle (same calendar day) once any
    /// suggestion for the pair was created, declined and expired ones
    /// included, so a dismissal is not immediately re-proposed.
    pub fn is_blocked(&self, trigger: TriggerKind, workout_id: Uuid, now: DateTime<Utc>) -> bool {
        self.suggestions.iter().any(|s| {
            s.trigger == trigger
                && s.workout.workout_id == workout_id
                && ((s.status == SuggestionStatus::Pending && s.expires_at > now)
                    || s.created_at.date_naive() == now.date_naive())
        })
    }

    pub fn insert(&mut self, suggestion: Suggestion) {
        self.suggestions.push(suggestion);
    }

    /// Accept a pending suggestion, returning a clone for the apply step
    pub fn accept(&mut self, id: Uuid, now: DateTime<Utc>) -> Result<Suggestion> {
        let suggestion = self
            .suggestions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::State(format!("No suggestion with id {}", id)))?;

        if suggestion.status == SuggestionStatus::Pending && suggestion.expires_at <= now {
            suggestion.status = SuggestionStatus::Expired;
        }
        if suggestion.status != SuggestionStatus::Pending {
            return Err(Error::State(format!(
                "Suggestion {} is {:?}, not pending",
                id, suggestion.status
            )));
        }

        suggestion.status = SuggestionStatus::Accepted;
        Ok(suggestion.clone())
    }

    /// Decline a pending suggestion; it is retained for audit
    pub fn decline(&mut self, id: Uuid) -> Result<()> {
        let suggestion = self
            .suggestions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::State(format!("No suggestion with id {}", id)))?;

        if suggestion.status != SuggestionStatus::Pending {
            return Err(Error::State(format!(
                "Suggestion {} is {:?}, not pending",
                id, suggestion.status
            )));
        }

        suggestion.status = SuggestionStatus::Declined;
        Ok(())
    }
}

// ============================================================================
// Apply (the one mutation boundary)
// ============================================================================

/// Merge a suggestion's proposed fragment into the plan
///
/// The plan is a value in, a value out; this is the only place prescription
/// fields are rewritten.
pub fn apply_suggestion(mut plan: TrainingPlan, suggestion: &Suggestion) -> Result<TrainingPlan> {
    let week = plan
        .weeks
        .get_mut(suggestion.workout.week_index)
        .ok_or_else(|| {
            Error::Plan(format!(
                "Plan has no week {}",
                suggestion.workout.week_index
            ))
        })?;
    let workout = week
        .workouts
        .iter_mut()
        .find(|w| w.id == suggestion.workout.workout_id)
        .ok_or_else(|| Error::Plan("Suggested workout is no longer in the plan".into()))?;

    let proposed = &suggestion.proposed;
    workout.workout_type = proposed.workout_type;
    workout.distance_km = proposed.distance_km;
    workout.duration_minutes = proposed.duration_minutes;
    workout.target_rpe = proposed.target_rpe;
    workout.quality = proposed.workout_type.is_quality();
    workout.long_run = proposed.workout_type == WorkoutType::Long;
    if !proposed.workout_type.is_quality() {
        workout.structure = WorkoutStructure::Continuous;
    }

    tracing::info!(
        "Applied {} suggestion to workout {} (week {})",
        suggestion.trigger.name(),
        suggestion.workout.workout_id,
        suggestion.workout.week_index
    );

    Ok(plan)
}

// ============================================================================
// Trigger evaluation
// ============================================================================

/// Inputs for one evaluation cycle, materialized by the collaborators
pub struct TriggerInputs<'a> {
    pub now: DateTime<Utc>,
    pub today: &'a DailyMetrics,
    pub loads: &'a BTreeMap<NaiveDate, DayLoad>,
    pub recent_activities: &'a [Activity],
    pub profile: &'a AthleteProfile,
}

/// What one evaluation cycle did
#[derive(Clone, Debug, Default)]
pub struct EvaluationReport {
    /// New pending suggestions
    pub created: Vec<Uuid>,
    /// Safety overrides applied to the plan this cycle
    pub auto_applied: Vec<Uuid>,
    /// Every trigger condition that evaluated true, with its value
    pub fired: Vec<(TriggerKind, f64)>,
}

/// Evaluate the trigger table against the current metrics and plan
///
/// Returns the (possibly safety-modified) plan and a report. Ordinary
/// triggers only add pending suggestions to the store.
pub fn evaluate_triggers(
    plan: TrainingPlan,
    inputs: &TriggerInputs<'_>,
    store: &mut SuggestionStore,
    cfg: &TriggerConfig,
) -> (TrainingPlan, EvaluationReport) {
    let mut report = EvaluationReport::default();
    store.expire_due(inputs.now);

    let mut plan = plan;
    let today = inputs.today.date;

    // Safety override first: injury signals force rest immediately
    if let Some(value) = injury_signal(inputs.recent_activities, today, cfg) {
        report.fired.push((TriggerKind::InjurySignal, value));
        plan = force_rest_for_injury(plan, inputs, store, &mut report);
    }

    for (trigger, value) in ordinary_triggers(inputs, cfg) {
        report.fired.push((trigger, value));

        let target = match trigger_target(&plan, trigger, today) {
            Some(target) => target,
            None => continue,
        };
        if store.is_blocked(trigger, target.workout_id, inputs.now) {
            tracing::debug!(
                "Trigger {} already has an open suggestion for workout {}",
                trigger.name(),
                target.workout_id
            );
            continue;
        }

        let workout = match plan.workout(&target) {
            Some(w) => w,
            None => continue,
        };
        let original = PrescriptionFragment::from(workout);
        let (kind, proposed, rationale) = proposal_for(trigger, value, &original);

        let suggestion = Suggestion {
            id: Uuid::new_v4(),
            trigger,
            trigger_value: value,
            workout: target,
            kind,
            original,
            proposed,
            rationale,
            status: SuggestionStatus::Pending,
            created_at: inputs.now,
            expires_at: end_of_day(plan.scheduled_date(target.week_index, workout.day)),
            auto_applied: false,
            note: None,
        };

        tracing::info!(
            "Trigger {} fired (value {:.2}): proposing {:?} for workout {}",
            trigger.name(),
            value,
            kind,
            target.workout_id
        );
        report.created.push(suggestion.id);
        store.insert(suggestion);
    }

    (plan, report)
}

/// Evaluate the non-safety rows of the trigger table
fn ordinary_triggers(inputs: &TriggerInputs<'_>, cfg: &TriggerConfig) -> Vec<(TriggerKind, f64)> {
    let mut fired = Vec::new();
    let today = inputs.today;

    if let Some(acwr) = today.acwr {
        if acwr >= cfg.acwr_high_threshold {
            fired.push((TriggerKind::AcwrHigh, acwr));
        } else if acwr >= cfg.acwr_elevated_threshold {
            fired.push((TriggerKind::AcwrElevated, acwr));
        }
    }

    if let Some(readiness) = today.readiness {
        if readiness < cfg.readiness_very_low_threshold {
            fired.push((TriggerKind::ReadinessVeryLow, readiness));
        } else if readiness < cfg.readiness_low_threshold {
            fired.push((TriggerKind::ReadinessLow, readiness));
        }
    }

    let threshold = inputs
        .profile
        .lower_body_weekly_threshold_au
        .unwrap_or(cfg.lower_body_weekly_threshold_au);
    let lower_body = trailing_lower_body_load(inputs.loads, today.date, 7);
    if lower_body > threshold {
        fired.push((TriggerKind::LowerBodyOverload, lower_body));
    }

    if let Some(count) = crowded_hard_sessions(inputs.recent_activities, today.date, cfg) {
        fired.push((TriggerKind::SessionDensity, count as f64));
    }

    fired
}

/// Injury keyword scan over the last two days of activity notes
fn injury_signal(
    activities: &[Activity],
    today: NaiveDate,
    cfg: &TriggerConfig,
) -> Option<f64> {
    let cutoff = today - Duration::days(2);
    let hits = activities
        .iter()
        .filter(|a| a.date >= cutoff)
        .filter_map(|a| a.notes.as_deref())
        .map(str::to_lowercase)
        .filter(|notes| cfg.injury_keywords.iter().any(|kw| notes.contains(kw)))
        .count();
    (hits > 0).then_some(hits as f64)
}

/// Hard sessions in the trailing 7 days that violate the spacing rule
///
/// Counts RPE>=7 sessions across all sports; fires when two or more land
/// without the configured spacing between them.
fn crowded_hard_sessions(
    activities: &[Activity],
    today: NaiveDate,
    cfg: &TriggerConfig,
) -> Option<usize> {
    let cutoff = today - Duration::days(6);
    let mut hard_dates: Vec<NaiveDate> = activities
        .iter()
        .filter(|a| a.date >= cutoff && a.date <= today && a.rpe >= cfg.hard_session_rpe)
        .map(|a| a.date)
        .collect();
    hard_dates.sort_unstable();

    let spacing_days = (cfg.quality_spacing_hours as f64 / 24.0).ceil() as i64;
    let crowded = hard_dates
        .windows(2)
        .any(|pair| (pair[1] - pair[0]).num_days() < spacing_days);
    (hard_dates.len() >= 2 && crowded).then_some(hard_dates.len())
}

/// Which workout a trigger targets
fn trigger_target(plan: &TrainingPlan, trigger: TriggerKind, today: NaiveDate) -> Option<WorkoutRef> {
    match trigger {
        TriggerKind::AcwrElevated | TriggerKind::AcwrHigh | TriggerKind::SessionDensity => {
            plan.next_workout_where(today, |w| w.quality)
        }
        TriggerKind::LowerBodyOverload => {
            plan.next_workout_where(today, |w| w.quality || w.long_run)
        }
        TriggerKind::ReadinessLow | TriggerKind::ReadinessVeryLow | TriggerKind::InjurySignal => {
            plan.next_workout_where(today, |w| w.workout_type != WorkoutType::Rest)
        }
    }
}

/// Proposed modification per trigger class
fn proposal_for(
    trigger: TriggerKind,
    value: f64,
    original: &PrescriptionFragment,
) -> (SuggestionKind, PrescriptionFragment, String) {
    match trigger {
        TriggerKind::AcwrElevated => (
            SuggestionKind::Downgrade,
            easy_fragment(original.distance_km, original.duration_minutes),
            format!("Workload ratio {:.2} is in the caution zone", value),
        ),
        TriggerKind::AcwrHigh => (
            SuggestionKind::Downgrade,
            easy_fragment(original.distance_km * 0.7, original.duration_minutes * 0.7),
            format!(
                "Workload ratio {:.2} signals high injury risk; consider a full rest day",
                value
            ),
        ),
        TriggerKind::ReadinessLow => (
            SuggestionKind::Downgrade,
            if original.workout_type.is_quality() {
                easy_fragment(original.distance_km, original.duration_minutes)
            } else {
                easy_fragment(original.distance_km * 0.7, original.duration_minutes * 0.7)
            },
            format!("Readiness {:.0} is below the downgrade threshold", value),
        ),
        TriggerKind::ReadinessVeryLow => (
            SuggestionKind::Rest,
            rest_fragment(),
            format!("Readiness {:.0} calls for a rest day", value),
        ),
        TriggerKind::LowerBodyOverload => (
            SuggestionKind::Move,
            *original,
            format!(
                "Trailing lower-body load of {:.0} AU exceeds the gate; defer this session",
                value
            ),
        ),
        TriggerKind::SessionDensity => (
            SuggestionKind::Move,
            *original,
            format!(
                "{:.0} hard sessions in the last week without 48 h spacing",
                value
            ),
        ),
        TriggerKind::InjurySignal => (
            SuggestionKind::Rest,
            rest_fragment(),
            "Injury signal detected in activity notes".to_string(),
        ),
    }
}

fn easy_fragment(distance_km: f64, duration_minutes: f64) -> PrescriptionFragment {
    PrescriptionFragment {
        workout_type: WorkoutType::Easy,
        distance_km: (distance_km * 10.0).round() / 10.0,
        duration_minutes: (duration_minutes * 10.0).round() / 10.0,
        target_rpe: 3,
    }
}

fn rest_fragment() -> PrescriptionFragment {
    PrescriptionFragment {
        workout_type: WorkoutType::Rest,
        distance_km: 0.0,
        duration_minutes: 0.0,
        target_rpe: 1,
    }
}

/// Apply the injury safety override: rest the next workout immediately and
/// record an already-accepted suggestion explaining the auto-apply
fn force_rest_for_injury(
    plan: TrainingPlan,
    inputs: &TriggerInputs<'_>,
    store: &mut SuggestionStore,
    report: &mut EvaluationReport,
) -> TrainingPlan {
    // At most one forced rest per evaluation day, or a repeated sync would
    // walk the override through every following workout
    let already_applied_today = store.all().iter().any(|s| {
        s.trigger == TriggerKind::InjurySignal
            && s.created_at.date_naive() == inputs.now.date_naive()
    });
    if already_applied_today {
        return plan;
    }

    let today = inputs.today.date;
    let target = match trigger_target(&plan, TriggerKind::InjurySignal, today) {
        Some(target) => target,
        None => return plan,
    };
    if store.is_blocked(TriggerKind::InjurySignal, target.workout_id, inputs.now) {
        return plan;
    }
    let workout = match plan.workout(&target) {
        Some(w) => w,
        None => return plan,
    };

    let original = PrescriptionFragment::from(workout);
    let expires_at = end_of_day(plan.scheduled_date(target.week_index, workout.day));
    let suggestion = Suggestion {
        id: Uuid::new_v4(),
        trigger: TriggerKind::InjurySignal,
        trigger_value: 1.0,
        workout: target,
        kind: SuggestionKind::Rest,
        original,
        proposed: rest_fragment(),
        rationale: "Injury signal detected in activity notes".to_string(),
        status: SuggestionStatus::Accepted,
        created_at: inputs.now,
        expires_at,
        auto_applied: true,
        note: Some("Safety override: rest applied without approval".to_string()),
    };

    tracing::warn!(
        "Injury signal: forcing rest on workout {} (week {})",
        target.workout_id,
        target.week_index
    );

    match apply_suggestion(plan.clone(), &suggestion) {
        Ok(updated) => {
            report.auto_applied.push(suggestion.id);
            store.insert(suggestion);
            updated
        }
        Err(e) => {
            tracing::warn!("Failed to apply safety override: {}", e);
            plan
        }
    }
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    // 23:59:59 is a valid wall-clock time on every date
    date.and_hms_opt(23, 59, 59)
        .map(|ndt| ndt.and_utc())
        .unwrap_or_else(Utc::now)
}
