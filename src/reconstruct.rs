//! Turn a decoded state path back into a sequence.
use crate::model::State;

/// Consecutive windows overlap by all but one symbol, so the sequence is the first
/// window followed by the last symbol of every later state.
pub fn reconstruct(path: &[State]) -> Vec<u8> {
    let (first, rest) = match path.split_first() {
        Some(res) => res,
        None => return vec![],
    };
    let mut seq = Vec::with_capacity(first.window.len() + rest.len());
    seq.extend_from_slice(&first.window);
    seq.extend(rest.iter().filter_map(|state| state.window.last().copied()));
    seq
}
