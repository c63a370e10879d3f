//! Fitness matrix file parser.
//!
//! ```text
//! # neutral everywhere except site 3
//! default-> 0.0, 0.0
//! 3: 0.0, 1.5
//! motif: 11 @ 0 = 2.0
//! ```
//!
//! `default->` supplies the per-state value row for unlisted positions;
//! without it unlisted positions are all-zero. Values are log-space for
//! multiplicative models and linear for the additive family. `motif:`
//! lines (additive_motif models only) add a bonus when the given states,
//! written in the seed-file alphabet, appear at the anchor position.

use crate::error::{IoError, Result};
use contagium_core::models::{FitnessTable, Motif};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub fn parse_fitness_file(
    path: &Path,
    num_sites: usize,
    alphabet_size: usize,
    translation: &HashMap<char, u8>,
) -> Result<FitnessTable> {
    let content = fs::read_to_string(path).map_err(|e| {
        IoError::from(e).with_context(format!("opening fitness file {}", path.display()))
    })?;
    parse_fitness_str(&content, num_sites, alphabet_size, translation)
        .map_err(|e| e.with_context(format!("parsing fitness file {}", path.display())))
}

pub fn parse_fitness_str(
    content: &str,
    num_sites: usize,
    alphabet_size: usize,
    translation: &HashMap<char, u8>,
) -> Result<FitnessTable> {
    let mut default_row: Option<Vec<f64>> = None;
    let mut listed: Vec<(usize, Vec<f64>)> = Vec::new();
    let mut motifs: Vec<Motif> = Vec::new();

    for (line_no, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(values) = line.strip_prefix("default->") {
            default_row = Some(parse_values(values, alphabet_size, line_no + 1)?);
            continue;
        }
        if let Some(motif) = line.strip_prefix("motif:") {
            motifs.push(parse_motif(motif, translation, line_no + 1)?);
            continue;
        }
        let (pos, values) = line.split_once(':').ok_or_else(|| {
            IoError::parse(format!("line {}: expected pos: v0, v1, ...", line_no + 1))
        })?;
        let pos: usize = pos.trim().parse().map_err(|_| {
            IoError::parse(format!("line {}: bad position {pos:?}", line_no + 1))
        })?;
        if pos >= num_sites {
            return Err(IoError::parse(format!(
                "line {}: position {pos} is outside the {num_sites}-site sequence",
                line_no + 1
            )));
        }
        listed.push((pos, parse_values(values, alphabet_size, line_no + 1)?));
    }

    let base = default_row.unwrap_or_else(|| vec![0.0; alphabet_size]);
    let mut site_values = vec![base; num_sites];
    for (pos, values) in listed {
        site_values[pos] = values;
    }
    Ok(FitnessTable { site_values, motifs })
}

fn parse_values(raw: &str, alphabet_size: usize, line_no: usize) -> Result<Vec<f64>> {
    let values = raw
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse::<f64>()
                .map_err(|_| IoError::parse(format!("line {line_no}: bad value {v:?}")))
        })
        .collect::<Result<Vec<f64>>>()?;
    if values.len() != alphabet_size {
        return Err(IoError::parse(format!(
            "line {line_no}: {} values for a {alphabet_size}-state alphabet",
            values.len()
        )));
    }
    Ok(values)
}

/// `<states> @ <start> = <value>`, states in the seed-file alphabet.
fn parse_motif(raw: &str, translation: &HashMap<char, u8>, line_no: usize) -> Result<Motif> {
    let (states_part, rest) = raw.split_once('@').ok_or_else(|| {
        IoError::parse(format!("line {line_no}: motif missing @ anchor"))
    })?;
    let (start_part, value_part) = rest.split_once('=').ok_or_else(|| {
        IoError::parse(format!("line {line_no}: motif missing = value"))
    })?;
    let states = states_part
        .trim()
        .chars()
        .map(|c| {
            translation.get(&c).copied().ok_or_else(|| {
                IoError::parse(format!("line {line_no}: unknown motif character {c:?}"))
            })
        })
        .collect::<Result<Vec<u8>>>()?;
    if states.is_empty() {
        return Err(IoError::parse(format!("line {line_no}: empty motif")));
    }
    let start: usize = start_part.trim().parse().map_err(|_| {
        IoError::parse(format!("line {line_no}: bad motif anchor {start_part:?}"))
    })?;
    let value: f64 = value_part.trim().parse().map_err(|_| {
        IoError::parse(format!("line {line_no}: bad motif value {value_part:?}"))
    })?;
    Ok(Motif { start, states, value })
}
