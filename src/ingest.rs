// This file reads submitted brackets from a CSV file and turns them into validated predictions
// Expected header: student,bracket_name,g1,...,g63 where every gK is a 1-based team id (seed)

use csv::StringRecord;
use fnv::FnvHashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::bracket::Prediction;
use crate::error::{PoolError, Result};
use crate::topology::BracketTopology;

/// Parse a 1-based team id in `[1, num_teams]` into a 0-based team index.
pub fn parse_team_id(raw: &str, num_teams: usize) -> Option<usize> {
    match raw.trim().parse::<usize>() {
        Ok(id) if (1..=num_teams).contains(&id) => Some(id - 1),
        _ => None,
    }
}

/// Game column names in canonical game order: g1, g2, ...
pub fn game_columns(num_games: usize) -> Vec<String> {
    (1..=num_games).map(|g| format!("g{}", g)).collect()
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| PoolError::MissingColumn(name.to_string()))
}

/// Read and validate every bracket in a CSV stream. The first bad row aborts the read.
pub fn read_predictions<R: Read>(reader: R, topology: &BracketTopology) -> Result<Vec<Prediction>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();

    let student_col = column_index(&headers, "student")?;
    let bracket_col = column_index(&headers, "bracket_name")?;
    let game_cols: Vec<(String, usize)> = game_columns(topology.num_games())
        .into_iter()
        .map(|name| column_index(&headers, &name).map(|idx| (name, idx)))
        .collect::<Result<_>>()?;

    let mut predictions = Vec::new();
    let mut seen: FnvHashSet<(String, String)> = FnvHashSet::default();

    for result in rdr.records() {
        let record = result?;
        let student = record.get(student_col).unwrap_or("").trim();
        let bracket = record.get(bracket_col).unwrap_or("").trim();

        let winners = game_cols
            .iter()
            .map(|(name, idx)| {
                let raw = record.get(*idx).unwrap_or("");
                parse_team_id(raw, topology.num_teams()).ok_or_else(|| PoolError::InvalidIdentifier {
                    student: student.to_string(),
                    bracket: bracket.to_string(),
                    column: name.clone(),
                    value: raw.to_string(),
                })
            })
            .collect::<Result<Vec<usize>>>()?;

        let prediction = Prediction::new(student, bracket, winners, topology)?;
        if !seen.insert((student.to_string(), bracket.to_string())) {
            return Err(PoolError::DuplicatePrediction {
                student: student.to_string(),
                bracket: bracket.to_string(),
            });
        }
        debug!(student, bracket, "accepted bracket");
        predictions.push(prediction);
    }

    if predictions.is_empty() {
        return Err(PoolError::NoPredictions);
    }
    info!(count = predictions.len(), students = students(&predictions), "read brackets");
    Ok(predictions)
}

/// Read and validate every bracket in the CSV file at `path`.
pub fn read_predictions_from_path<P: AsRef<Path>>(path: P, topology: &BracketTopology) -> Result<Vec<Prediction>> {
    let file = File::open(path)?;
    read_predictions(file, topology)
}

fn students(predictions: &[Prediction]) -> usize {
    predictions
        .iter()
        .map(|p| p.student.as_str())
        .collect::<FnvHashSet<_>>()
        .len()
}
