//! Pathogen seed file parser.
//!
//! FASTA-like format:
//!
//! ```text
//! % A:0, C:1, G:2, T:3
//! # patient zero
//! >sample-1 h:0
//! ACGTACGT
//! GGTA
//! >sample-2 h:3
//! ACGTACGTACGT
//! ```
//!
//! An optional `%` line maps characters to integer states and overrides
//! the default mapping derived from `expected_characters`. Record headers
//! must carry the target host as `h:<int>`; bodies may span lines.

use crate::error::{IoError, Result};
use contagium_core::epidemic::HostSeed;
use contagium_data::Sequence;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Default character translation: index in `expected_characters` is the
/// state.
#[must_use]
pub fn translation_from_characters(expected: &[String]) -> HashMap<char, u8> {
    expected
        .iter()
        .enumerate()
        .filter_map(|(state, s)| s.chars().next().map(|c| (c, state as u8)))
        .collect()
}

pub fn parse_seed_file(path: &Path, translation: &HashMap<char, u8>) -> Result<Vec<HostSeed>> {
    let content = fs::read_to_string(path)
        .map_err(|e| IoError::from(e).with_context(format!("opening seed file {}", path.display())))?;
    parse_seed_str(&content, translation)
        .map_err(|e| e.with_context(format!("parsing seed file {}", path.display())))
}

pub fn parse_seed_str(
    content: &str,
    default_translation: &HashMap<char, u8>,
) -> Result<Vec<HostSeed>> {
    let mut translation = default_translation.clone();
    let mut seeds = Vec::new();
    let mut current: Option<(u32, Vec<u8>)> = None;

    for (line_no, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(pairs) = line.strip_prefix('%') {
            parse_translation_line(pairs, line_no + 1, &mut translation)?;
            continue;
        }
        if let Some(header) = line.strip_prefix('>') {
            if let Some((host, states)) = current.take() {
                seeds.push(HostSeed {
                    host,
                    sequence: Sequence::new(states),
                });
            }
            let host = host_id_from_header(header).ok_or_else(|| {
                IoError::parse(format!(
                    "line {}: record header {header:?} has no h:<int> tag",
                    line_no + 1
                ))
            })?;
            current = Some((host, Vec::new()));
            continue;
        }
        let Some((_, states)) = current.as_mut() else {
            return Err(IoError::parse(format!(
                "line {}: sequence data before any record header",
                line_no + 1
            )));
        };
        for c in line.chars() {
            let state = translation.get(&c).ok_or_else(|| {
                IoError::parse(format!("line {}: unknown state character {c:?}", line_no + 1))
            })?;
            states.push(*state);
        }
    }
    if let Some((host, states)) = current.take() {
        seeds.push(HostSeed {
            host,
            sequence: Sequence::new(states),
        });
    }
    Ok(seeds)
}

fn parse_translation_line(
    pairs: &str,
    line_no: usize,
    translation: &mut HashMap<char, u8>,
) -> Result<()> {
    for pair in pairs.split([',', ' ', '\t']).filter(|p| !p.is_empty()) {
        let (c, value) = pair.split_once(':').ok_or_else(|| {
            IoError::parse(format!("line {line_no}: bad translation pair {pair:?}"))
        })?;
        let c = c.trim();
        if c.chars().count() != 1 {
            return Err(IoError::parse(format!(
                "line {line_no}: translation key {c:?} is not a single character"
            )));
        }
        let state: u8 = value.trim().parse().map_err(|_| {
            IoError::parse(format!("line {line_no}: bad translation state {value:?}"))
        })?;
        translation.insert(c.chars().next().expect("length checked"), state);
    }
    Ok(())
}

/// Extract the `h:<int>` tag from a record header.
fn host_id_from_header(header: &str) -> Option<u32> {
    let start = header.find("h:")? + 2;
    let digits: String = header[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}
