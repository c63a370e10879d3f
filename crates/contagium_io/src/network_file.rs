//! Host network file parser.
//!
//! One directed edge per line as `src,dst,weight`. Comments start with
//! `#`. Structural rules (self-loops, duplicates, id range, positive
//! weight) are enforced by the network builder in the engine; this parser
//! only cares about syntax.

use crate::error::{IoError, Result};
use std::fs;
use std::path::Path;

pub fn parse_network_file(path: &Path) -> Result<Vec<(u32, u32, f64)>> {
    let content = fs::read_to_string(path).map_err(|e| {
        IoError::from(e).with_context(format!("opening network file {}", path.display()))
    })?;
    parse_network_str(&content)
        .map_err(|e| e.with_context(format!("parsing network file {}", path.display())))
}

pub fn parse_network_str(content: &str) -> Result<Vec<(u32, u32, f64)>> {
    let mut edges = Vec::new();
    for (line_no, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split(',').map(str::trim);
        let (src, dst, weight) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(s), Some(d), Some(w), None) => (s, d, w),
            _ => {
                return Err(IoError::parse(format!(
                    "line {}: expected src,dst,weight, got {line:?}",
                    line_no + 1
                )))
            }
        };
        let src: u32 = src.parse().map_err(|_| {
            IoError::parse(format!("line {}: bad source host {src:?}", line_no + 1))
        })?;
        let dst: u32 = dst.parse().map_err(|_| {
            IoError::parse(format!("line {}: bad destination host {dst:?}", line_no + 1))
        })?;
        let weight: f64 = weight.parse().map_err(|_| {
            IoError::parse(format!("line {}: bad weight {weight:?}", line_no + 1))
        })?;
        edges.push((src, dst, weight));
    }
    Ok(edges)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_edges() {
        let edges = parse_network_str("# ring\n0,1,1.0\n1,2,0.5\n2,0,0.25\n").unwrap();
        assert_eq!(edges, vec![(0, 1, 1.0), (1, 2, 0.5), (2, 0, 0.25)]);
    }

    #[test]
    fn test_whitespace_tolerated() {
        let edges = parse_network_str(" 0 , 1 , 0.75 \n").unwrap();
        assert_eq!(edges, vec![(0, 1, 0.75)]);
    }

    #[test]
    fn test_wrong_arity_fails() {
        assert!(parse_network_str("0,1\n").is_err());
        assert!(parse_network_str("0,1,0.5,9\n").is_err());
    }

    #[test]
    fn test_bad_numbers_fail() {
        assert!(parse_network_str("a,1,0.5\n").is_err());
        assert!(parse_network_str("0,1,heavy\n").is_err());
    }
}
