//! Activity history loading from WAL and CSV archive.
//!
//! The metrics engine wants the full ordered history; the adaptation engine
//! wants a trailing window. Both views merge the live WAL with the CSV
//! archive, deduplicating activities that appear in both.

use crate::{Activity, Result, Sport};
use chrono::{Duration, NaiveDate, Utc};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

/// CSV row format for reading archived activities
#[derive(Debug, Deserialize)]
struct CsvRow {
    id: String,
    date: String,
    sport: String,
    duration_minutes: f64,
    rpe: u8,
    notes: Option<String>,
    systemic_load_au: f64,
    lower_body_load_au: f64,
}

impl TryFrom<CsvRow> for Activity {
    type Error = crate::Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| crate::Error::Other(format!("Invalid UUID: {}", e)))?;

        let date = row
            .date
            .parse::<NaiveDate>()
            .map_err(|e| crate::Error::Other(format!("Invalid date: {}", e)))?;

        Ok(Activity {
            id,
            date,
            sport: Sport::parse(&row.sport),
            duration_minutes: row.duration_minutes,
            rpe: row.rpe,
            notes: row.notes.filter(|n| !n.is_empty()),
            systemic_load_au: row.systemic_load_au,
            lower_body_load_au: row.lower_body_load_au,
        })
    }
}

/// Load the complete activity history from both WAL and CSV
///
/// Returns activities sorted by date ascending (the order the metrics fold
/// consumes them in). Automatically deduplicates activities that appear in
/// both WAL and CSV.
pub fn load_all_activities(wal_path: &Path, csv_path: &Path) -> Result<Vec<Activity>> {
    let mut activities = Vec::new();
    let mut seen_ids = HashSet::new();

    // Load from WAL first (most recent)
    if wal_path.exists() {
        let wal_activities = crate::wal::read_activities(wal_path)?;
        for activity in wal_activities {
            seen_ids.insert(activity.id);
            activities.push(activity);
        }
        tracing::debug!("Loaded {} activities from WAL", activities.len());
    }

    // Load from CSV (archived)
    if csv_path.exists() {
        let csv_activities = load_activities_from_csv(csv_path)?;
        let mut csv_count = 0;
        for activity in csv_activities {
            if !seen_ids.contains(&activity.id) {
                seen_ids.insert(activity.id);
                activities.push(activity);
                csv_count += 1;
            }
        }
        tracing::debug!("Loaded {} activities from CSV", csv_count);
    }

    // Sort by date ascending for the metrics fold
    activities.sort_by_key(|a| a.date);

    tracing::info!("Loaded {} total activities", activities.len());

    Ok(activities)
}

/// Load activities from the trailing `days` window
///
/// The window ends today; used for trigger evaluation (hard-session
/// density, injury keywords).
pub fn load_recent_activities(
    wal_path: &Path,
    csv_path: &Path,
    days: i64,
) -> Result<Vec<Activity>> {
    let cutoff = Utc::now().date_naive() - Duration::days(days);
    let mut activities = load_all_activities(wal_path, csv_path)?;
    activities.retain(|a| a.date >= cutoff);
    Ok(activities)
}

/// Load all activities from a CSV file
fn load_activities_from_csv(path: &Path) -> Result<Vec<Activity>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut activities = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        match result {
            Ok(row) => match Activity::try_from(row) {
                Ok(activity) => activities.push(activity),
                Err(e) => {
                    tracing::warn!("Failed to parse CSV row: {}", e);
                    // Continue processing other rows
                }
            },
            Err(e) => {
                tracing::warn!("Failed to deserialize CSV row: {}", e);
            }
        }
    }

    Ok(activities)
}
