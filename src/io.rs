//! Textual input parsing and output emission. Deliberately thin: the parser
//! and writer are external collaborators around the detection core, not part
//! of it.

use crate::error::{CrateError, Result};
use crate::geometry::{Point, Segment};
use crate::pairs::IndexPair;
use std::io::{BufRead, Write};

/// Parses one segment per line: four whitespace-separated fields `p0 p1 q0
/// q1`. The 0-based line number becomes the segment's stable index. Empty or
/// malformed lines are a [`CrateError::Parse`].
pub fn parse_segments<R: BufRead>(reader: R) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(CrateError::Parse { line: line_no, found: line });
        }

        let mut values = [0.0f64; 4];
        for (i, field) in fields.iter().enumerate() {
            let value = field
                .parse::<f64>()
                .map_err(|_| CrateError::Parse { line: line_no, found: line.clone() })?;
            if !value.is_finite() {
                return Err(CrateError::Parse { line: line_no, found: line.clone() });
            }
            values[i] = value;
        }

        let p = Point::new(values[0], values[1]);
        let q = Point::new(values[2], values[3]);
        segments.push(Segment::new(line_no, p, q));
    }
    Ok(segments)
}

/// Writes one `a_b` pair per line, in the order given (callers are expected
/// to have sorted with [`crate::pairs::sorted`]).
pub fn write_pairs<W: Write>(mut writer: W, pairs: &[IndexPair]) -> Result<()> {
    for pair in pairs {
        writeln!(writer, "{pair}")?;
    }
    Ok(())
}
