//! Read-only views over the stored history: the typing leaderboard and the
//! consolidated FCR (first contact resolution) board built from weekly
//! sheets. Nothing here writes back to a store.

use crate::error::{GincanaError, Result};
use crate::record::ResultRecord;
use crate::util::mean;
use chrono::{DateTime, Local};
use itertools::Itertools;
use serde::{Deserialize, Deserializer};
use std::cmp::Ordering;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct RankingEntry {
    pub agent_id: String,
    pub best_wpm: f64,
    /// Accuracy of the attempt that set `best_wpm`
    pub accuracy: f64,
    pub attempts: usize,
    pub average_wpm: f64,
    pub last_attempt: DateTime<Local>,
}

/// Best WPM per agent, fastest first. Ties go to the more accurate attempt.
pub fn leaderboard(records: &[ResultRecord]) -> Vec<RankingEntry> {
    records
        .iter()
        .into_group_map_by(|r| r.agent_id.clone())
        .into_iter()
        .filter_map(|(agent_id, attempts)| {
            let best = attempts.iter().copied().max_by(|a, b| {
                a.wpm
                    .partial_cmp(&b.wpm)
                    .unwrap_or(Ordering::Equal)
                    .then(a.accuracy.partial_cmp(&b.accuracy).unwrap_or(Ordering::Equal))
            })?;
            let wpms: Vec<f64> = attempts.iter().map(|r| r.wpm).collect();
            let last_attempt = attempts.iter().map(|r| r.timestamp).max()?;

            Some(RankingEntry {
                agent_id,
                best_wpm: best.wpm,
                accuracy: best.accuracy,
                attempts: attempts.len(),
                average_wpm: mean(&wpms).unwrap_or(0.0),
                last_attempt,
            })
        })
        .sorted_by(|a, b| {
            b.best_wpm
                .partial_cmp(&a.best_wpm)
                .unwrap_or(Ordering::Equal)
                .then(b.accuracy.partial_cmp(&a.accuracy).unwrap_or(Ordering::Equal))
                .then_with(|| a.agent_id.cmp(&b.agent_id))
        })
        .collect()
}

/// One row of a weekly FCR sheet
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FcrRow {
    #[serde(alias = "Empleado", alias = "empleado", alias = "Employee")]
    pub employee: String,
    #[serde(alias = "Positivas", alias = "positivas", alias = "Positives")]
    pub positives: u64,
    #[serde(
        alias = "% Positivo",
        alias = "%Positivo",
        alias = "Positive %",
        deserialize_with = "deserialize_percent"
    )]
    pub positive_pct: f64,
}

/// Accepts `85`, `85.5`, `85,5` and `85%`
fn deserialize_percent<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<f64, D::Error> {
    let raw = String::deserialize(d)?;
    parse_percent(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid percentage: {raw}")))
}

fn parse_percent(raw: &str) -> Option<f64> {
    raw.trim()
        .trim_end_matches('%')
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
}

pub fn read_fcr_sheet<P: AsRef<Path>>(path: P) -> Result<Vec<FcrRow>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| {
        GincanaError::ConfigurationUnavailable(format!("FCR sheet {}: {e}", path.display()))
    })?;
    read_fcr_rows(file).map_err(|e| {
        GincanaError::ConfigurationUnavailable(format!("FCR sheet {}: {e}", path.display()))
    })
}

pub fn read_fcr_rows<R: Read>(reader: R) -> std::result::Result<Vec<FcrRow>, csv::Error> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
        .deserialize()
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct FcrEntry {
    pub employee: String,
    pub positives: u64,
    pub positive_pct: f64,
    pub weeks: usize,
}

/// Merge weekly sheets: positives are summed, percentages averaged.
/// Ordered by total positives, then percentage, both descending.
pub fn consolidate_fcr(sheets: &[Vec<FcrRow>]) -> Vec<FcrEntry> {
    sheets
        .iter()
        .flatten()
        .filter(|row| !row.employee.trim().is_empty())
        .into_group_map_by(|row| row.employee.trim().to_string())
        .into_iter()
        .map(|(employee, rows)| {
            let pcts: Vec<f64> = rows.iter().map(|r| r.positive_pct).collect();
            FcrEntry {
                employee,
                positives: rows.iter().map(|r| r.positives).sum(),
                positive_pct: mean(&pcts).unwrap_or(0.0),
                weeks: rows.len(),
            }
        })
        .sorted_by(|a, b| {
            b.positives
                .cmp(&a.positives)
                .then(
                    b.positive_pct
                        .partial_cmp(&a.positive_pct)
                        .unwrap_or(Ordering::Equal),
                )
                .then_with(|| a.employee.cmp(&b.employee))
        })
        .collect()
}
