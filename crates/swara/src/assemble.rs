//! Map the winning symbol sequence onto wall-clock time.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::quantize::CandidateResult;
use crate::symbol::Symbol;
use crate::{Error, Result};

/// Header of the exported note table.
pub const CSV_HEADER: [&str; 3] = ["start", "end", "note"];

/// One symbol placed on the timeline, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedNote {
    pub start: f64,
    pub end: f64,
    #[serde(rename = "note")]
    pub symbol: Symbol,
}

/// Spread `symbols` uniformly over `[0, duration_secs]`.
///
/// Every slot has the same width, rests included. Slot `i` ends exactly
/// where slot `i + 1` starts, and the last slot ends at the duration.
pub fn assemble(symbols: &[Symbol], duration_secs: f64) -> Result<Vec<TimedNote>> {
    check_duration(duration_secs)?;

    let count = symbols.len();
    let step = duration_secs / count as f64;

    Ok(symbols
        .iter()
        .enumerate()
        .map(|(i, &symbol)| {
            let end = if i + 1 == count {
                duration_secs
            } else {
                (i + 1) as f64 * step
            };
            TimedNote {
                start: i as f64 * step,
                end,
                symbol,
            }
        })
        .collect())
}

pub(crate) fn check_duration(duration_secs: f64) -> Result<()> {
    if duration_secs.is_finite() && duration_secs >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidDuration(format!(
            "duration must be finite and non-negative, got {}",
            duration_secs
        )))
    }
}

/// Note length handed to the notation renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteValue {
    Half,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NotationEvent {
    pub symbol: Symbol,
    pub value: NoteValue,
}

/// Input for a notation renderer: one event per symbol at a fixed tempo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub tempo_bpm: f64,
    pub events: Vec<NotationEvent>,
}

/// Everything the pipeline produces for one recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub duration_secs: f64,
    pub ideal_offset: f64,
    pub best: CandidateResult,
    pub notes: Vec<TimedNote>,
    /// False when a deadline stopped the search early.
    pub complete: bool,
}

impl Transcription {
    pub fn tempo_bpm(&self) -> f64 {
        self.best.tempo_bpm()
    }

    pub fn score(&self) -> Score {
        Score {
            tempo_bpm: self.tempo_bpm(),
            events: self
                .best
                .symbols
                .iter()
                .map(|&symbol| NotationEvent {
                    symbol,
                    value: NoteValue::Half,
                })
                .collect(),
        }
    }

    /// Rows of the note table, header first.
    pub fn csv_rows(&self) -> Vec<[String; 3]> {
        let mut rows = Vec::with_capacity(self.notes.len() + 1);
        rows.push(CSV_HEADER.map(String::from));
        rows.extend(self.notes.iter().map(|note| {
            [
                format!("{:?}", note.start),
                format!("{:?}", note.end),
                note.symbol.to_string(),
            ]
        }));
        rows
    }

    /// Write the note table as CSV with CRLF line endings.
    ///
    /// Labels never contain commas or quotes, so no field needs quoting.
    pub fn write_csv<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        for row in self.csv_rows() {
            write!(writer, "{}\r\n", row.join(","))?;
        }
        writer.flush()
    }
}
