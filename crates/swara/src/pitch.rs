//! Pitch mapping between model output, Hz, and the chromatic grid.

use crate::{Error, Result};

/// Constant-Q bins per unit of model output.
const PT_SLOPE: f64 = 63.07;
/// Constant-Q bin at model output zero.
const PT_OFFSET: f64 = 25.58;
/// Frequency of constant-Q bin zero.
const FMIN_HZ: f64 = 10.0;
const BINS_PER_OCTAVE: f64 = 12.0;

pub const A4_HZ: f64 = 440.0;

/// Frequency of scale degree 0 in octave 0, 4.75 octaves below A4 (~16.35 Hz).
pub fn c0_hz() -> f64 {
    A4_HZ * 2.0_f64.powf(-4.75)
}

/// Convert the model's raw pitch scalar to Hz.
///
/// Total over finite input and strictly increasing.
pub fn output_to_hz(pitch_output: f64) -> f64 {
    let cqt_bin = pitch_output * PT_SLOPE + PT_OFFSET;
    FMIN_HZ * 2.0_f64.powf(cqt_bin / BINS_PER_OCTAVE)
}

/// Position of a positive frequency in semitones above C0.
///
/// Finite for every positive finite `freq`, subnormals included.
pub fn semitones_above_c0(freq: f64) -> f64 {
    BINS_PER_OCTAVE * (freq.log2() - c0_hz().log2())
}

/// Nearest whole semitone. Exact halves go down, which keeps every
/// residual `x - nearest_semitone(x)` inside (-0.5, 0.5].
pub fn nearest_semitone(semitones: f64) -> i64 {
    (semitones - 0.5).ceil() as i64
}

/// Semitone chosen by a group's mean vote. Exact halves go to the even
/// neighbour, so 2.5 votes for 2 and 3.5 for 4.
pub fn vote_semitone(mean: f64) -> i64 {
    mean.round_ties_even() as i64
}

/// Signed distance in semitones from `freq` to the nearest chromatic degree.
///
/// Zero is the rest marker and maps to `None`. Negative or non-finite
/// input is a contract violation and is rejected.
pub fn hz_to_offset(freq: f64) -> Result<Option<f64>> {
    check_frequency(freq)?;
    if freq == 0.0 {
        return Ok(None);
    }

    let semitones = semitones_above_c0(freq);
    Ok(Some(semitones - nearest_semitone(semitones) as f64))
}

pub(crate) fn check_frequency(freq: f64) -> Result<()> {
    if freq.is_finite() && freq >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidFrequency(freq))
    }
}
