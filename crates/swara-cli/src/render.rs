//! Output formats for a finished transcription.

use std::io::Write;

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use swara::{Score, Transcription};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Aligned columns with a summary header
    Table,
    /// `start,end,note` rows
    Csv,
    /// Full result, including the notation score
    Json,
}

#[derive(Serialize)]
struct Report<'a> {
    tempo_bpm: f64,
    #[serde(flatten)]
    transcription: &'a Transcription,
    score: Score,
}

pub fn render(transcription: &Transcription, format: Format) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    match format {
        Format::Table => write_table(transcription, &mut out)?,
        Format::Csv => transcription.write_csv(&mut out)?,
        Format::Json => {
            let report = Report {
                tempo_bpm: transcription.tempo_bpm(),
                transcription,
                score: transcription.score(),
            };
            serde_json::to_writer_pretty(&mut out, &report)?;
            out.push(b'\n');
        }
    }
    Ok(out)
}

fn write_table<W: Write>(transcription: &Transcription, out: &mut W) -> std::io::Result<()> {
    let best = &transcription.best;
    writeln!(
        out,
        "grid   {} frames/note, phase {}",
        best.predictions_per_note, best.start_offset
    )?;
    writeln!(out, "tempo  {:.1} bpm", transcription.tempo_bpm())?;
    writeln!(out, "error  {:.4}", best.total_error)?;
    writeln!(out, "drift  {:+.4} semitones", transcription.ideal_offset)?;
    if !transcription.complete {
        writeln!(out, "note   search hit its deadline; best grid so far")?;
    }
    writeln!(out)?;

    writeln!(out, "{:>9}  {:>9}  note", "start", "end")?;
    for note in &transcription.notes {
        writeln!(out, "{:>9.3}  {:>9.3}  {}", note.start, note.end, note.symbol)?;
    }
    Ok(())
}
