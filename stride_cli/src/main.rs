use chrono::{Datelike, Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stride_core::*;

#[derive(Parser)]
#[command(name = "stride")]
#[command(about = "Training load and adaptive planning engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record an activity
    Log {
        /// Sport (run, bike, swim, climb, strength, ...)
        #[arg(long)]
        sport: String,

        /// Duration in minutes
        #[arg(long)]
        minutes: f64,

        /// Session RPE, 1-10
        #[arg(long)]
        rpe: u8,

        /// Activity date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Free-form notes (scanned for injury signals)
        #[arg(long)]
        notes: Option<String>,
    },

    /// Recompute metrics and run trigger evaluation against the plan
    Refresh,

    /// Training plan operations
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },

    /// Suggestion lifecycle operations
    Suggest {
        #[command(subcommand)]
        command: SuggestCommands,
    },

    /// Roll up WAL activities to CSV
    Rollup {
        /// Clean up processed WAL files after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Generate and store a new plan
    New {
        /// Goal race (5k, 10k, half, marathon)
        #[arg(long)]
        race: String,

        /// Plan length in weeks
        #[arg(long)]
        weeks: usize,

        /// VDOT baseline
        #[arg(long)]
        vdot: f64,

        /// Plan start date (YYYY-MM-DD), defaults to next Monday
        #[arg(long)]
        start: Option<NaiveDate>,
    },

    /// Validate the stored plan against the guardrails
    Check,

    /// Show the stored plan week by week
    Show,
}

#[derive(Subcommand)]
enum SuggestCommands {
    /// List pending suggestions
    List,

    /// Accept a pending suggestion and apply it to the plan
    Accept {
        /// Suggestion id
        id: uuid::Uuid,
    },

    /// Decline a pending suggestion
    Decline {
        /// Suggestion id
        id: uuid::Uuid,
    },
}

struct Paths {
    wal: PathBuf,
    csv: PathBuf,
    state: PathBuf,
}

fn data_paths(data_dir: &std::path::Path) -> Paths {
    Paths {
        wal: data_dir.join("wal").join("activities.wal"),
        csv: data_dir.join("activities.csv"),
        state: data_dir.join("state.json"),
    }
}

fn main() -> Result<()> {
    stride_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let paths = data_paths(&data_dir);

    match cli.command {
        Commands::Log {
            sport,
            minutes,
            rpe,
            date,
            notes,
        } => cmd_log(&paths, sport, minutes, rpe, date, notes),
        Commands::Refresh => cmd_refresh(&paths, &config),
        Commands::Plan { command } => match command {
            PlanCommands::New {
                race,
                weeks,
                vdot,
                start,
            } => cmd_plan_new(&paths, &config, race, weeks, vdot, start),
            PlanCommands::Check => cmd_plan_check(&paths),
            PlanCommands::Show => cmd_plan_show(&paths),
        },
        Commands::Suggest { command } => match command {
            SuggestCommands::List => cmd_suggest_list(&paths),
            SuggestCommands::Accept { id } => cmd_suggest_accept(&paths, id),
            SuggestCommands::Decline { id } => cmd_suggest_decline(&paths, id),
        },
        Commands::Rollup { cleanup } => cmd_rollup(&data_dir, &paths, cleanup),
    }
}

fn cmd_log(
    paths: &Paths,
    sport: String,
    minutes: f64,
    rpe: u8,
    date: Option<NaiveDate>,
    notes: Option<String>,
) -> Result<()> {
    let date = date.unwrap_or_else(|| Utc::now().date_naive());
    let sport = Sport::parse(&sport);

    let activity = Activity::record(date, sport, minutes, rpe, notes)?;

    let mut sink = JsonlSink::new(&paths.wal);
    sink.append(&activity)?;

    println!("✓ Logged {} on {}", activity.sport, activity.date);
    println!(
        "  Systemic load: {:.0} AU, lower-body load: {:.0} AU",
        activity.systemic_load_au, activity.lower_body_load_au
    );

    Ok(())
}

fn cmd_refresh(paths: &Paths, config: &Config) -> Result<()> {
    let activities = load_all_activities(&paths.wal, &paths.csv)?;
    if activities.is_empty() {
        println!("No activities recorded yet - nothing to refresh.");
        return Ok(());
    }

    let loads = daily_loads(&activities);
    let all_metrics = recompute(&loads, &config.metrics);
    let today = all_metrics
        .last()
        .ok_or_else(|| Error::State("Metrics recompute produced no days".into()))?;

    display_metrics(today);

    let mut state = AthleteState::load(&paths.state)?;

    if let (Some(profile), Some(plan)) = (state.profile.clone(), state.plan.clone()) {
        let window_start = today.date - Duration::days(6);
        let recent: Vec<Activity> = activities
            .iter()
            .filter(|a| a.date >= window_start)
            .cloned()
            .collect();

        let inputs = TriggerInputs {
            now: Utc::now(),
            today,
            loads: &loads,
            recent_activities: &recent,
            profile: &profile,
        };

        let (plan, report) =
            evaluate_triggers(plan, &inputs, &mut state.suggestions, &config.triggers);
        state.plan = Some(plan);

        if report.fired.is_empty() {
            println!("\nNo adaptation triggers fired.");
        } else {
            println!();
            for (trigger, value) in &report.fired {
                println!("  ! {} (value {:.2})", trigger.name(), value);
            }
        }
        if !report.auto_applied.is_empty() {
            println!(
                "\n⚠ Safety override applied: {} workout(s) forced to rest.",
                report.auto_applied.len()
            );
        }
        if !report.created.is_empty() {
            println!(
                "\n{} new suggestion(s) pending - review with `stride suggest list`.",
                report.created.len()
            );
        }
    } else {
        println!("\nNo active plan - metrics only. Create one with `stride plan new`.");
    }

    state.save(&paths.state)?;

    Ok(())
}

fn parse_race(s: &str) -> Result<RaceDistance> {
    match s.to_lowercase().as_str() {
        "5k" => Ok(RaceDistance::FiveK),
        "10k" => Ok(RaceDistance::TenK),
        "half" | "half_marathon" | "hm" => Ok(RaceDistance::HalfMarathon),
        "marathon" | "full" => Ok(RaceDistance::Marathon),
        other => Err(Error::Validation(format!("Unknown race distance: {}", other))),
    }
}

/// Next Monday strictly after today
fn next_monday() -> NaiveDate {
    let today = Utc::now().date_naive();
    let days_ahead = 7 - i64::from(today.weekday().num_days_from_monday());
    today + Duration::days(days_ahead)
}

fn cmd_plan_new(
    paths: &Paths,
    config: &Config,
    race: String,
    weeks: usize,
    vdot: f64,
    start: Option<NaiveDate>,
) -> Result<()> {
    let race = parse_race(&race)?;
    let start_date = start.unwrap_or_else(next_monday);

    // Current CTL from whatever history exists
    let activities = load_all_activities(&paths.wal, &paths.csv)?;
    let loads = daily_loads(&activities);
    let current_ctl = recompute(&loads, &config.metrics)
        .last()
        .map_or(0.0, |m| m.ctl);

    let mut state = AthleteState::load(&paths.state)?;
    let profile = state.profile.take().map_or_else(
        || AthleteProfile {
            goal: Goal {
                race,
                target_date: start_date + Duration::weeks(weeks as i64),
                target_time_minutes: None,
            },
            constraints: Constraints::default(),
            vdot,
            conflict_policy: ConflictPolicy::RunPriority,
            typical_easy_km: None,
            typical_long_km: None,
            lower_body_weekly_threshold_au: None,
        },
        |mut p| {
            p.goal.race = race;
            p.goal.target_date = start_date + Duration::weeks(weeks as i64);
            p.vdot = vdot;
            p
        },
    );

    let request = PlanRequest {
        start_date,
        total_weeks: weeks,
        current_ctl,
        recent_weekly_km: None,
    };

    let plan = build_plan(&profile, &request, config)?;
    let violations = validate_plan(&plan, &profile);

    display_plan(&plan);
    display_violations(&violations);

    state.profile = Some(profile);
    state.plan = Some(plan);
    state.save(&paths.state)?;

    println!("\n✓ Plan stored.");
    Ok(())
}

fn load_plan_and_profile(paths: &Paths) -> Result<(AthleteState, TrainingPlan, AthleteProfile)> {
    let state = AthleteState::load(&paths.state)?;
    let plan = state
        .plan
        .clone()
        .ok_or_else(|| Error::State("No stored plan - create one with `stride plan new`".into()))?;
    let profile = state
        .profile
        .clone()
        .ok_or_else(|| Error::State("No athlete profile stored".into()))?;
    Ok((state, plan, profile))
}

fn cmd_plan_check(paths: &Paths) -> Result<()> {
    let (_, plan, profile) = load_plan_and_profile(paths)?;
    let violations = validate_plan(&plan, &profile);

    if violations.is_empty() {
        println!("✓ Plan passes all guardrails.");
    } else {
        display_violations(&violations);
    }
    Ok(())
}

fn cmd_plan_show(paths: &Paths) -> Result<()> {
    let (_, plan, _) = load_plan_and_profile(paths)?;
    display_plan(&plan);
    Ok(())
}

fn cmd_suggest_list(paths: &Paths) -> Result<()> {
    let state = AthleteState::load(&paths.state)?;
    let pending: Vec<_> = state.suggestions.pending().collect();

    if pending.is_empty() {
        println!("No pending suggestions.");
        return Ok(());
    }

    println!("Pending suggestions:");
    for suggestion in pending {
        println!();
        println!("  {} [{:?}]", suggestion.id, suggestion.kind);
        println!("    Trigger: {} ({:.2})", suggestion.trigger.name(), suggestion.trigger_value);
        println!("    {}", suggestion.rationale);
        println!(
            "    {:?} {:.1} km -> {:?} {:.1} km",
            suggestion.original.workout_type,
            suggestion.original.distance_km,
            suggestion.proposed.workout_type,
            suggestion.proposed.distance_km
        );
        println!("    Expires: {}", suggestion.expires_at.format("%Y-%m-%d %H:%M"));
    }
    Ok(())
}

fn cmd_suggest_accept(paths: &Paths, id: uuid::Uuid) -> Result<()> {
    let mut state = AthleteState::load(&paths.state)?;
    let plan = state
        .plan
        .take()
        .ok_or_else(|| Error::State("No stored plan to apply suggestions to".into()))?;

    let accepted = state.suggestions.accept(id, Utc::now())?;
    let updated = apply_suggestion(plan, &accepted)?;
    state.plan = Some(updated);
    state.save(&paths.state)?;

    println!(
        "✓ Accepted: workout is now {:?} {:.1} km",
        accepted.proposed.workout_type, accepted.proposed.distance_km
    );
    Ok(())
}

fn cmd_suggest_decline(paths: &Paths, id: uuid::Uuid) -> Result<()> {
    let mut state = AthleteState::load(&paths.state)?;
    state.suggestions.decline(id)?;
    state.save(&paths.state)?;

    println!("✓ Declined suggestion {}", id);
    Ok(())
}

fn cmd_rollup(data_dir: &std::path::Path, paths: &Paths, cleanup: bool) -> Result<()> {
    if !paths.wal.exists() {
        println!("No WAL file found - nothing to roll up.");
        return Ok(());
    }

    let count = stride_core::csv_rollup::wal_to_csv_and_archive(&paths.wal, &paths.csv)?;

    println!("✓ Rolled up {} activities to CSV", count);
    println!("  CSV: {}", paths.csv.display());

    if cleanup {
        let wal_dir = data_dir.join("wal");
        let cleaned = stride_core::csv_rollup::cleanup_processed_wals(&wal_dir)?;
        if cleaned > 0 {
            println!("✓ Cleaned up {} processed WAL files", cleaned);
        }
    }

    Ok(())
}

fn display_metrics(metrics: &DailyMetrics) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  DAILY METRICS  {}", metrics.date);
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  CTL (fitness):  {:.1}", metrics.ctl);
    println!("  ATL (fatigue):  {:.1}", metrics.atl);
    println!("  TSB (balance):  {:+.1}", metrics.tsb);

    match (metrics.acwr, metrics.acwr_zone) {
        (Some(acwr), Some(zone)) => println!("  ACWR:           {:.2} ({:?})", acwr, zone),
        _ => println!("  ACWR:           unavailable (<28 days of history)"),
    }
    match metrics.readiness {
        Some(readiness) => println!("  Readiness:      {:.0}/100", readiness),
        None => println!("  Readiness:      unavailable (insufficient history)"),
    }
}

fn display_plan(plan: &TrainingPlan) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  TRAINING PLAN  starts {}", plan.start_date);
    println!("╰─────────────────────────────────────────╯");

    for week in &plan.weeks {
        let marker = if week.recovery { " (recovery)" } else { "" };
        println!(
            "\n  Week {:>2}  {:?}{}  {:.1} km",
            week.index + 1,
            week.phase,
            marker,
            week.target_volume_km
        );
        for workout in &week.workouts {
            println!(
                "    {:<3} {:?} {:.1} km (~{:.0} min)",
                format!("{:?}", workout.day),
                workout.workout_type,
                workout.distance_km,
                workout.duration_minutes
            );
        }
    }
}

fn display_violations(violations: &[GuardrailViolation]) {
    if violations.is_empty() {
        println!("\n  No guardrail violations.");
        return;
    }

    println!("\n  Guardrail violations:");
    for violation in violations {
        let week = violation
            .week_index
            .map_or_else(String::new, |i| format!(" [week {}]", i + 1));
        println!(
            "    {:?}{}: {} ({})",
            violation.severity,
            week,
            violation.message,
            violation.rule.name()
        );
    }
}
