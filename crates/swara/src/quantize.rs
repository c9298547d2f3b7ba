//! Reduce fixed-size frame groups to one note or rest each.

use serde::{Deserialize, Serialize};

use crate::pitch::{check_frequency, semitones_above_c0, vote_semitone};
use crate::policy::QuantizePolicy;
use crate::symbol::Symbol;
use crate::types::VoicedSequence;
use crate::{Error, Result};

/// Outcome of reducing one group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupQuantization {
    pub error: f64,
    pub symbol: Symbol,
}

/// One scored grid hypothesis: a group size and a phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub predictions_per_note: usize,
    pub start_offset: usize,
    /// Summed over all groups, so larger inputs carry larger totals.
    pub total_error: f64,
    pub symbols: Vec<Symbol>,
}

impl CandidateResult {
    /// Nominal tempo for notation: 3600 / frames per note.
    pub fn tempo_bpm(&self) -> f64 {
        tempo_bpm(self.predictions_per_note)
    }
}

pub fn tempo_bpm(predictions_per_note: usize) -> f64 {
    60.0 * 60.0 / predictions_per_note as f64
}

/// Reduce a group of Hz values (0.0 = rest) to a single symbol.
///
/// A group whose rest share exceeds `policy.rest_majority` becomes a rest
/// and is charged `rest_penalty` per voiced frame it discards. Otherwise
/// the drift-corrected voiced frames vote by mean for one semitone, and
/// the error is their total absolute distance from it.
pub fn quantize_group(
    group: &[f64],
    ideal_offset: f64,
    policy: &QuantizePolicy,
) -> Result<GroupQuantization> {
    let mut voiced = Vec::with_capacity(group.len());
    for &freq in group {
        check_frequency(freq)?;
        if freq != 0.0 {
            voiced.push(semitones_above_c0(freq));
        }
    }

    let rest_count = group.len() - voiced.len();
    Ok(reduce_group(
        rest_count,
        voiced.iter().copied(),
        ideal_offset,
        policy,
    ))
}

fn reduce_group<I>(
    rest_count: usize,
    voiced: I,
    ideal_offset: f64,
    policy: &QuantizePolicy,
) -> GroupQuantization
where
    I: Iterator<Item = f64> + Clone,
{
    let voiced_count = voiced.clone().count();
    let len = rest_count + voiced_count;

    if voiced_count == 0 || rest_count as f64 > policy.rest_majority * len as f64 {
        return GroupQuantization {
            error: policy.rest_penalty * voiced_count as f64,
            symbol: Symbol::Rest,
        };
    }

    let mean = voiced.clone().map(|s| s - ideal_offset).sum::<f64>() / voiced_count as f64;
    let semitone = vote_semitone(mean);
    let error = voiced
        .map(|s| (s - ideal_offset - semitone as f64).abs())
        .sum();

    GroupQuantization {
        error,
        symbol: Symbol::from_semitone(semitone),
    }
}

/// Walk the left-padded sequence in groups of `predictions_per_note`.
///
/// The first `start_offset` padded positions are rests; the final group
/// may be short and is reduced as is.
pub(crate) fn for_each_group<F>(
    voiced: &VoicedSequence,
    predictions_per_note: usize,
    start_offset: usize,
    ideal_offset: f64,
    policy: &QuantizePolicy,
    mut visit: F,
) where
    F: FnMut(GroupQuantization),
{
    let semitones = voiced.semitones();
    let padded_len = start_offset + semitones.len();

    let mut group_start = 0;
    while group_start < padded_len {
        let group_end = (group_start + predictions_per_note).min(padded_len);
        let padding = start_offset
            .saturating_sub(group_start)
            .min(group_end - group_start);
        let frames = &semitones[group_start + padding - start_offset..group_end - start_offset];

        let rest_count = padding + frames.iter().filter(|s| s.is_none()).count();
        visit(reduce_group(
            rest_count,
            frames.iter().flatten().copied(),
            ideal_offset,
            policy,
        ));

        group_start = group_end;
    }
}

/// Total error of one candidate without materializing its symbols.
pub(crate) fn score_sequence(
    voiced: &VoicedSequence,
    predictions_per_note: usize,
    start_offset: usize,
    ideal_offset: f64,
    policy: &QuantizePolicy,
) -> f64 {
    let mut total = 0.0;
    for_each_group(
        voiced,
        predictions_per_note,
        start_offset,
        ideal_offset,
        policy,
        |group| total += group.error,
    );
    total
}

/// Quantize the whole sequence under one grid hypothesis.
pub fn quantize_sequence(
    voiced: &VoicedSequence,
    predictions_per_note: usize,
    start_offset: usize,
    ideal_offset: f64,
    policy: &QuantizePolicy,
) -> Result<CandidateResult> {
    if predictions_per_note == 0 || start_offset >= predictions_per_note {
        return Err(Error::InvalidCandidate {
            predictions_per_note,
            start_offset,
        });
    }

    Ok(build_candidate(
        voiced,
        predictions_per_note,
        start_offset,
        ideal_offset,
        policy,
    ))
}

pub(crate) fn build_candidate(
    voiced: &VoicedSequence,
    predictions_per_note: usize,
    start_offset: usize,
    ideal_offset: f64,
    policy: &QuantizePolicy,
) -> CandidateResult {
    let mut total_error = 0.0;
    let mut symbols =
        Vec::with_capacity((start_offset + voiced.len()).div_ceil(predictions_per_note));

    for_each_group(
        voiced,
        predictions_per_note,
        start_offset,
        ideal_offset,
        policy,
        |group| {
            total_error += group.error;
            symbols.push(group.symbol);
        },
    );

    CandidateResult {
        predictions_per_note,
        start_offset,
        total_error,
        symbols,
    }
}
