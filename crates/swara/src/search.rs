//! Exhaustive search over (grid size, phase) hypotheses.
//!
//! Candidates are enumerated by ascending grid size, then ascending phase.
//! The winner is the first candidate reaching the minimum total error, so
//! every variant below returns the same result for the same input.

use std::cmp::Ordering;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::policy::QuantizePolicy;
use crate::quantize::{build_candidate, score_sequence, CandidateResult};
use crate::types::VoicedSequence;
use crate::{Error, Result};

/// Result of a search that may have stopped early.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub best: CandidateResult,
    pub evaluated: usize,
    pub total: usize,
    /// False when a deadline cut the search short.
    pub complete: bool,
}

#[derive(Debug, Clone, Copy)]
struct Leader {
    predictions_per_note: usize,
    start_offset: usize,
    error: f64,
}

impl Leader {
    /// Error first, then enumeration order.
    fn cmp_rank(&self, other: &Leader) -> Ordering {
        self.error
            .total_cmp(&other.error)
            .then(self.predictions_per_note.cmp(&other.predictions_per_note))
            .then(self.start_offset.cmp(&other.start_offset))
    }
}

/// Score candidates for `grid_sizes` in order until `keep_going` says stop.
///
/// Only the running leader is tracked; symbols are built once at the end.
/// Returns the leader and how many candidates were scored.
fn scan<S, K>(
    voiced: &VoicedSequence,
    ideal_offset: f64,
    policy: &QuantizePolicy,
    grid_sizes: S,
    mut keep_going: K,
) -> (Option<Leader>, usize)
where
    S: IntoIterator<Item = usize>,
    K: FnMut() -> bool,
{
    let mut leader: Option<Leader> = None;
    let mut evaluated = 0usize;

    'sizes: for predictions_per_note in grid_sizes {
        for start_offset in 0..predictions_per_note {
            if evaluated > 0 && !keep_going() {
                break 'sizes;
            }

            let error = score_sequence(
                voiced,
                predictions_per_note,
                start_offset,
                ideal_offset,
                policy,
            );
            evaluated += 1;

            if leader.map_or(true, |l| error < l.error) {
                debug!(predictions_per_note, start_offset, error, "new best grid candidate");
                leader = Some(Leader {
                    predictions_per_note,
                    start_offset,
                    error,
                });
            }
        }
    }

    (leader, evaluated)
}

fn check_inputs(voiced: &VoicedSequence, policy: &QuantizePolicy) -> Result<()> {
    policy.validate()?;
    if voiced.is_empty() {
        return Err(Error::EmptyInput);
    }
    Ok(())
}

fn materialize(
    voiced: &VoicedSequence,
    ideal_offset: f64,
    policy: &QuantizePolicy,
    leader: Option<Leader>,
) -> Result<CandidateResult> {
    let leader = leader.ok_or(Error::EmptyInput)?;
    Ok(build_candidate(
        voiced,
        leader.predictions_per_note,
        leader.start_offset,
        ideal_offset,
        policy,
    ))
}

/// Score every candidate and return the minimum-error one.
///
/// Fails on an empty sequence, where no grid is meaningful.
pub fn search(
    voiced: &VoicedSequence,
    ideal_offset: f64,
    policy: &QuantizePolicy,
) -> Result<CandidateResult> {
    check_inputs(voiced, policy)?;
    let (leader, _) = scan(voiced, ideal_offset, policy, policy.grid_sizes(), || true);
    materialize(voiced, ideal_offset, policy, leader)
}

/// Same result as [`search`], with grid sizes spread over `workers` threads.
///
/// Sizes are dealt round-robin so each worker gets a similar share of the
/// larger (costlier) grids. The reduction breaks error ties by enumeration
/// order, matching the sequential winner.
pub fn search_parallel(
    voiced: &VoicedSequence,
    ideal_offset: f64,
    policy: &QuantizePolicy,
    workers: usize,
) -> Result<CandidateResult> {
    if workers <= 1 {
        return search(voiced, ideal_offset, policy);
    }
    check_inputs(voiced, policy)?;

    let sizes: Vec<usize> = policy.grid_sizes().collect();
    let workers = workers.min(sizes.len());

    let leaders: Vec<Option<Leader>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let share: Vec<usize> =
                    sizes.iter().copied().skip(worker).step_by(workers).collect();
                scope.spawn(move || scan(voiced, ideal_offset, policy, share, || true).0)
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect()
    });

    let leader = leaders
        .into_iter()
        .flatten()
        .min_by(|a, b| a.cmp_rank(b));

    materialize(voiced, ideal_offset, policy, leader)
}

/// Sequential search that stops at `deadline` with the best result so far.
///
/// At least one candidate is always scored.
pub fn search_until(
    voiced: &VoicedSequence,
    ideal_offset: f64,
    policy: &QuantizePolicy,
    deadline: Instant,
) -> Result<SearchOutcome> {
    check_inputs(voiced, policy)?;

    let total = policy.candidate_count();
    let (leader, evaluated) = scan(voiced, ideal_offset, policy, policy.grid_sizes(), || {
        Instant::now() < deadline
    });
    let best = materialize(voiced, ideal_offset, policy, leader)?;

    Ok(SearchOutcome {
        best,
        evaluated,
        total,
        complete: evaluated == total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::c0_hz;
    use crate::symbol::Symbol;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn semitone_hz(semitone: f64) -> f64 {
        c0_hz() * 2.0_f64.powf(semitone / 12.0)
    }

    /// Two notes, a rest long enough to hold a whole group at any grid
    /// size, then a third note.
    fn melody() -> VoicedSequence {
        let mut hz = Vec::new();
        hz.extend(std::iter::repeat(semitone_hz(50.1)).take(40));
        hz.extend(std::iter::repeat(semitone_hz(52.05)).take(40));
        hz.extend(std::iter::repeat(0.0).take(130));
        hz.extend(std::iter::repeat(semitone_hz(55.0)).take(40));
        VoicedSequence::from_hz(hz).unwrap()
    }

    #[test]
    fn empty_input_is_an_error() {
        let voiced = VoicedSequence::from_hz(vec![]).unwrap();
        let policy = QuantizePolicy::default();
        assert!(matches!(search(&voiced, 0.0, &policy), Err(Error::EmptyInput)));
        assert!(matches!(
            search_parallel(&voiced, 0.0, &policy, 4),
            Err(Error::EmptyInput)
        ));
        assert!(search_until(&voiced, 0.0, &policy, Instant::now()).is_err());
    }

    #[test]
    fn all_rest_input_picks_first_candidate() {
        let voiced = VoicedSequence::from_hz(vec![0.0; 100]).unwrap();
        let best = search(&voiced, 0.0, &QuantizePolicy::default()).unwrap();

        assert_eq!(best.predictions_per_note, 20);
        assert_eq!(best.start_offset, 0);
        assert_eq!(best.total_error, 0.0);
        assert_eq!(best.symbols, vec![Symbol::Rest; 5]);
    }

    #[test]
    fn search_finds_the_melody_grid() {
        let voiced = melody();
        let best = search(&voiced, 0.0, &QuantizePolicy::default()).unwrap();

        let mut notes: Vec<i64> = best.symbols.iter().filter_map(|s| s.semitone()).collect();
        notes.dedup();
        assert_eq!(notes, vec![50, 52, 55]);
        assert!(best.symbols.contains(&Symbol::Rest));
        // 40 frames 0.1 sharp plus 40 frames 0.05 sharp
        assert!((best.total_error - 6.0).abs() < 1e-6, "error {}", best.total_error);
    }

    #[test]
    fn best_is_minimal_over_all_candidates() {
        let voiced = melody();
        let policy = QuantizePolicy::default();
        let best = search(&voiced, 0.0, &policy).unwrap();

        for size in policy.grid_sizes() {
            for offset in 0..size {
                let error = score_sequence(&voiced, size, offset, 0.0, &policy);
                assert!(error >= best.total_error);
            }
        }
    }

    #[test]
    fn search_is_deterministic() {
        let voiced = melody();
        let policy = QuantizePolicy::default();
        let first = search(&voiced, 0.02, &policy).unwrap();
        let second = search(&voiced, 0.02, &policy).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn parallel_matches_sequential() {
        let voiced = melody();
        let policy = QuantizePolicy::default();
        let sequential = search(&voiced, 0.0, &policy).unwrap();

        for workers in [1, 2, 3, 8, 100] {
            let parallel = search_parallel(&voiced, 0.0, &policy, workers).unwrap();
            assert_eq!(parallel, sequential, "workers = {}", workers);
        }
    }

    #[test]
    fn parallel_keeps_enumeration_tie_break() {
        // Every candidate ties at zero error; the first must win.
        let voiced = VoicedSequence::from_hz(vec![0.0; 70]).unwrap();
        let best = search_parallel(&voiced, 0.0, &QuantizePolicy::default(), 4).unwrap();
        assert_eq!((best.predictions_per_note, best.start_offset), (20, 0));
    }

    #[test]
    fn expired_deadline_returns_first_candidate() {
        let voiced = melody();
        let policy = QuantizePolicy::default();
        let outcome = search_until(&voiced, 0.0, &policy, Instant::now()).unwrap();

        assert_eq!(outcome.evaluated, 1);
        assert!(!outcome.complete);
        assert_eq!(outcome.total, policy.candidate_count());
        assert_eq!(outcome.best.predictions_per_note, 20);
        assert_eq!(outcome.best.start_offset, 0);
    }

    #[test]
    fn generous_deadline_completes() {
        let voiced = melody();
        let policy = QuantizePolicy::default();
        let deadline = Instant::now() + Duration::from_secs(3600);
        let outcome = search_until(&voiced, 0.0, &policy, deadline).unwrap();

        assert!(outcome.complete);
        assert_eq!(outcome.evaluated, outcome.total);
        assert_eq!(outcome.best, search(&voiced, 0.0, &policy).unwrap());
    }

    #[test]
    fn narrow_policy_limits_the_search() {
        let voiced = melody();
        let policy = QuantizePolicy {
            min_predictions_per_note: 30,
            max_predictions_per_note: 30,
            ..Default::default()
        };
        let best = search(&voiced, 0.0, &policy).unwrap();
        assert_eq!(best.predictions_per_note, 30);
        assert_eq!(best.tempo_bpm(), 120.0);
    }
}
