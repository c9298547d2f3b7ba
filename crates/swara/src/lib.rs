//! Turn a sung pitch track into a rhythmically quantized note sequence.
//!
//! The input is one pitch scalar and one confidence per analysis frame,
//! as produced by an external pitch model. The pipeline runs:
//!
//! 1. voicing: confident frames become Hz, the rest become 0.0
//! 2. drift: the mean fractional-semitone offset of all voiced frames
//! 3. search: every (frames per note, phase) grid is scored and the
//!    lowest-error grid wins
//! 4. assembly: the winning symbols are spread over the audio duration
//!
//! ```
//! use swara::{FrameSequence, QuantizePolicy, Transcriber};
//!
//! let frames = FrameSequence::new(vec![0.4; 60], vec![1.0; 60]).unwrap();
//! let transcriber = Transcriber::new(QuantizePolicy::default()).unwrap();
//! let result = transcriber.transcribe(&frames, 1.92).unwrap();
//!
//! assert_eq!(result.notes.last().unwrap().end, 1.92);
//! ```

pub mod assemble;
pub mod drift;
pub mod pitch;
pub mod policy;
pub mod quantize;
pub mod search;
pub mod symbol;
pub mod types;

pub use assemble::{assemble, NotationEvent, NoteValue, Score, TimedNote, Transcription};
pub use drift::ideal_offset;
pub use pitch::{hz_to_offset, output_to_hz};
pub use policy::QuantizePolicy;
pub use quantize::{quantize_group, quantize_sequence, CandidateResult, GroupQuantization};
pub use search::{search, search_parallel, search_until, SearchOutcome};
pub use symbol::Symbol;
pub use types::{FrameCapture, FrameSequence, VoicedSequence};

use std::time::{Duration, Instant};

use tracing::{info, warn};

/// Errors from quantization.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid frequency {0} Hz: must be finite and non-negative")]
    InvalidFrequency(f64),

    #[error("empty frame sequence: nothing to quantize")]
    EmptyInput,

    #[error("pitch and confidence lengths differ ({pitch} vs {confidence})")]
    LengthMismatch { pitch: usize, confidence: usize },

    #[error("invalid frame {index}: {reason}")]
    InvalidFrame { index: usize, reason: String },

    #[error("invalid grid candidate: {predictions_per_note} frames per note, phase {start_offset}")]
    InvalidCandidate {
        predictions_per_note: usize,
        start_offset: usize,
    },

    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("unrecognized note label {0:?}")]
    InvalidSymbol(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Runs the full pipeline under one policy.
///
/// With a deadline the search runs sequentially and may return a
/// best-so-far result; otherwise it fans out over `workers` threads.
#[derive(Debug, Clone)]
pub struct Transcriber {
    policy: QuantizePolicy,
    workers: usize,
    deadline: Option<Duration>,
}

impl Transcriber {
    pub fn new(policy: QuantizePolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self {
            policy,
            workers: 1,
            deadline: None,
        })
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn policy(&self) -> &QuantizePolicy {
        &self.policy
    }

    pub fn transcribe(&self, frames: &FrameSequence, duration_secs: f64) -> Result<Transcription> {
        assemble::check_duration(duration_secs)?;
        let started = Instant::now();

        let voiced = VoicedSequence::from_frames(frames, &self.policy);
        let ideal_offset = drift::ideal_offset(voiced.hz())?;
        info!(
            frames = voiced.len(),
            voiced = voiced.voiced_count(),
            ideal_offset,
            "estimated tuning drift"
        );

        let (best, complete) = match self.deadline {
            Some(budget) => {
                let outcome =
                    search::search_until(&voiced, ideal_offset, &self.policy, started + budget)?;
                if !outcome.complete {
                    warn!(
                        evaluated = outcome.evaluated,
                        total = outcome.total,
                        "search deadline reached, returning best so far"
                    );
                }
                (outcome.best, outcome.complete)
            }
            None => (
                search::search_parallel(&voiced, ideal_offset, &self.policy, self.workers)?,
                true,
            ),
        };

        info!(
            predictions_per_note = best.predictions_per_note,
            start_offset = best.start_offset,
            total_error = best.total_error,
            symbols = best.symbols.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "selected rhythmic grid"
        );

        let notes = assemble::assemble(&best.symbols, duration_secs)?;

        Ok(Transcription {
            duration_secs,
            ideal_offset,
            best,
            notes,
            complete,
        })
    }

    pub fn transcribe_capture(&self, capture: &FrameCapture) -> Result<Transcription> {
        let duration_secs = capture.duration_secs()?;
        let frames = capture.frames()?;
        self.transcribe(&frames, duration_secs)
    }
}
