use crate::pitch::hz_to_offset;
use crate::Result;

/// Mean fractional-semitone offset over all voiced frames.
///
/// Estimates the pitch model's constant tuning bias for one recording.
/// Rest frames are skipped; a sequence with no voiced frames has no
/// measurable drift and yields 0.0.
pub fn ideal_offset(voiced_freqs: &[f64]) -> Result<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;

    for &freq in voiced_freqs {
        if let Some(offset) = hz_to_offset(freq)? {
            sum += offset;
            count += 1;
        }
    }

    if count == 0 {
        return Ok(0.0);
    }

    Ok(sum / count as f64)
}
