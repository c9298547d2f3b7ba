use serde::{Deserialize, Serialize};

use crate::pitch::{check_frequency, output_to_hz, semitones_above_c0};
use crate::policy::QuantizePolicy;
use crate::{Error, Result};

/// Per-frame pitch scalars and confidences, as emitted by the pitch model.
///
/// Both series are in time order and have equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSequence {
    pitch: Vec<f64>,
    confidence: Vec<f64>,
}

impl FrameSequence {
    pub fn new(pitch: Vec<f64>, confidence: Vec<f64>) -> Result<Self> {
        if pitch.len() != confidence.len() {
            return Err(Error::LengthMismatch {
                pitch: pitch.len(),
                confidence: confidence.len(),
            });
        }

        if let Some(index) = pitch.iter().position(|p| !p.is_finite()) {
            return Err(Error::InvalidFrame {
                index,
                reason: format!("pitch {} is not finite", pitch[index]),
            });
        }

        if let Some(index) = confidence.iter().position(|c| !(0.0..=1.0).contains(c)) {
            return Err(Error::InvalidFrame {
                index,
                reason: format!("confidence {} is outside [0, 1]", confidence[index]),
            });
        }

        Ok(Self { pitch, confidence })
    }

    pub fn pitch(&self) -> &[f64] {
        &self.pitch
    }

    pub fn confidence(&self) -> &[f64] {
        &self.confidence
    }

    pub fn len(&self) -> usize {
        self.pitch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pitch.is_empty()
    }
}

/// Serialized hand-off from the pitch model and audio ingestion.
///
/// Duration is either stated or derived from the sample count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameCapture {
    pub pitch: Vec<f64>,
    pub confidence: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
}

impl FrameCapture {
    pub fn frames(&self) -> Result<FrameSequence> {
        FrameSequence::new(self.pitch.clone(), self.confidence.clone())
    }

    pub fn duration_secs(&self) -> Result<f64> {
        match (self.duration_secs, self.sample_count, self.sample_rate) {
            (Some(duration), _, _) => Ok(duration),
            (None, Some(_), Some(0)) => {
                Err(Error::InvalidDuration("sample_rate is zero".to_string()))
            }
            (None, Some(samples), Some(rate)) => Ok(samples as f64 / rate as f64),
            _ => Err(Error::InvalidDuration(
                "capture needs duration_secs or sample_count with sample_rate".to_string(),
            )),
        }
    }
}

/// Frame-aligned frequencies in Hz with 0.0 marking unvoiced frames.
///
/// Each voiced frame's position above C0 is computed once on
/// construction; the grid search reads those instead of taking a
/// logarithm per frame per candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct VoicedSequence {
    hz: Vec<f64>,
    semitones: Vec<Option<f64>>,
}

impl VoicedSequence {
    /// Keep frames whose confidence reaches the voicing threshold.
    pub fn from_frames(frames: &FrameSequence, policy: &QuantizePolicy) -> Self {
        let hz = frames
            .pitch()
            .iter()
            .zip(frames.confidence())
            .map(|(&pitch, &confidence)| {
                if confidence >= policy.voicing_threshold {
                    output_to_hz(pitch)
                } else {
                    0.0
                }
            })
            .collect();

        Self::index(hz)
    }

    /// Build from Hz values directly. Zero is a rest; negative or
    /// non-finite values are rejected.
    pub fn from_hz(hz: Vec<f64>) -> Result<Self> {
        for &freq in &hz {
            check_frequency(freq)?;
        }
        Ok(Self::index(hz))
    }

    fn index(hz: Vec<f64>) -> Self {
        let semitones = hz
            .iter()
            .map(|&freq| (freq != 0.0).then(|| semitones_above_c0(freq)))
            .collect();
        Self { hz, semitones }
    }

    pub fn hz(&self) -> &[f64] {
        &self.hz
    }

    pub(crate) fn semitones(&self) -> &[Option<f64>] {
        &self.semitones
    }

    pub fn len(&self) -> usize {
        self.hz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hz.is_empty()
    }

    pub fn voiced_count(&self) -> usize {
        self.semitones.iter().filter(|s| s.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejects_length_mismatch() {
        let err = FrameSequence::new(vec![0.1, 0.2], vec![1.0]).unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                pitch: 2,
                confidence: 1
            }
        ));
    }

    #[test]
    fn rejects_bad_frames() {
        let err = FrameSequence::new(vec![0.1, f64::NAN], vec![1.0, 1.0]).unwrap_err();
        assert!(matches!(err, Error::InvalidFrame { index: 1, .. }));

        let err = FrameSequence::new(vec![0.1, 0.2], vec![1.0, 1.5]).unwrap_err();
        assert!(matches!(err, Error::InvalidFrame { index: 1, .. }));
    }

    #[test]
    fn empty_sequence_is_accepted() {
        let frames = FrameSequence::new(vec![], vec![]).unwrap();
        assert!(frames.is_empty());
    }

    #[test]
    fn voicing_threshold_is_inclusive() {
        let frames = FrameSequence::new(vec![0.5, 0.5, 0.5], vec![0.9, 0.89, 1.0]).unwrap();
        let voiced = VoicedSequence::from_frames(&frames, &QuantizePolicy::default());

        assert_eq!(voiced.len(), 3);
        assert_eq!(voiced.voiced_count(), 2);
        assert_eq!(voiced.hz()[1], 0.0);
        assert_eq!(voiced.hz()[0], output_to_hz(0.5));
    }

    #[test]
    fn from_hz_rejects_negative() {
        assert!(matches!(
            VoicedSequence::from_hz(vec![220.0, -1.0]),
            Err(Error::InvalidFrequency(_))
        ));
    }

    #[test]
    fn capture_duration_from_samples() {
        let capture = FrameCapture {
            pitch: vec![],
            confidence: vec![],
            duration_secs: None,
            sample_count: Some(48_000),
            sample_rate: Some(16_000),
        };
        assert_eq!(capture.duration_secs().unwrap(), 3.0);
    }

    #[test]
    fn capture_without_duration_is_an_error() {
        let json = r#"{ "pitch": [0.1], "confidence": [1.0], "sample_count": 10 }"#;
        let capture: FrameCapture = serde_json::from_str(json).unwrap();
        assert!(matches!(
            capture.duration_secs(),
            Err(Error::InvalidDuration(_))
        ));

        let zero_rate = FrameCapture {
            sample_rate: Some(0),
            ..capture
        };
        assert!(zero_rate.duration_secs().is_err());
    }
}
