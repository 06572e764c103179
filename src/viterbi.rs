//! Maximum-probability path through a sparse hidden Markov model.
//!
//! Weights are plain products, not logarithms: the builder's weights may be zero or
//! even negative, and ties are resolved by the order of `states()`, so the scores
//! must be compared exactly as they are multiplied.
//!
//! The trellis keeps only nonzero scores. A state missing from a column scores
//! zero, and its predecessor is worked out again only if the best path passes
//! through it.
use std::collections::HashMap;
use std::hash::Hash;

/// A model the decoder can walk. Any weight that was never recorded is zero.
/// The states returned by `states()` are expected to be distinct.
pub trait HiddenMarkovModel {
    type State: Copy + Eq + Hash;
    type Observation;
    /// Every state, in the order used to break ties.
    fn states(&self) -> &[Self::State];
    fn start(&self, state: &Self::State) -> f64;
    fn transition(&self, from: &Self::State, to: &Self::State) -> f64;
    /// Recorded outgoing transitions of `from`. Unlisted targets weigh zero.
    fn successors(&self, from: &Self::State) -> Vec<(Self::State, f64)>;
    fn emission(&self, state: &Self::State, obs: &Self::Observation) -> f64;
}

/// The optimal path and its probability.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<S> {
    pub probability: f64,
    pub path: Vec<S>,
}

#[derive(Debug, Clone, Copy)]
struct Cell {
    state: usize,
    prob: f64,
    prev: usize,
}

// Nonzero cells of one trellis column, sorted by state index.
#[derive(Debug, Clone, Default)]
struct Column {
    cells: Vec<Cell>,
}

// The first index in `0..size` absent from the sorted, distinct `indices`.
fn first_missing<I: Iterator<Item = usize>>(indices: I, size: usize) -> Option<usize> {
    let mut expected = 0;
    for i in indices {
        if i != expected {
            return Some(expected);
        }
        expected += 1;
    }
    Some(expected).filter(|&k| k < size)
}

impl Column {
    fn get(&self, state: usize) -> Option<&Cell> {
        self.cells
            .binary_search_by_key(&state, |c| c.state)
            .ok()
            .map(|i| &self.cells[i])
    }
    fn prob(&self, state: usize) -> f64 {
        self.get(state).map(|c| c.prob).unwrap_or(0f64)
    }
    // The maximum over all `size` states and the first state attaining it.
    fn best(&self, size: usize) -> (f64, usize) {
        let stored = self
            .cells
            .iter()
            .fold(std::f64::NEG_INFINITY, |x, c| x.max(c.prob));
        let first_stored = |max: f64| {
            self.cells
                .iter()
                .find(|c| c.prob == max)
                .map(|c| c.state)
                .unwrap_or(0)
        };
        if 0f64 < stored {
            return (stored, first_stored(stored));
        }
        match first_missing(self.cells.iter().map(|c| c.state), size) {
            Some(zero) => (0f64, zero),
            None => (stored, first_stored(stored)),
        }
    }
}

// Recorded transitions by state index, both ways. Lists are sorted by the other end.
struct Edges {
    outgoing: Vec<Vec<(usize, f64)>>,
    incoming: Vec<Vec<(usize, f64)>>,
}

impl Edges {
    fn new<M: HiddenMarkovModel>(model: &M) -> Self {
        let states = model.states();
        let index: HashMap<M::State, usize> =
            states.iter().enumerate().map(|(i, &s)| (s, i)).collect();
        let mut incoming = vec![vec![]; states.len()];
        let mut outgoing = Vec::with_capacity(states.len());
        for (from, state) in states.iter().enumerate() {
            let mut targets: Vec<_> = model
                .successors(state)
                .into_iter()
                .filter_map(|(to, w)| index.get(&to).map(|&to| (to, w)))
                .collect();
            targets.sort_by_key(|x| x.0);
            targets.dedup_by_key(|x| x.0);
            for &(to, w) in targets.iter() {
                incoming[to].push((from, w));
            }
            outgoing.push(targets);
        }
        Self { outgoing, incoming }
    }
    // The next column. Only targets with a positive incoming product can score
    // anything but zero, and their first best predecessor is kept.
    fn forward<M: HiddenMarkovModel>(&self, model: &M, prev: &Column, obs: &M::Observation) -> Column {
        let states = model.states();
        let mut best: HashMap<usize, (f64, usize)> = HashMap::new();
        for cell in prev.cells.iter() {
            for &(to, w) in self.outgoing[cell.state].iter() {
                let product = cell.prob * w;
                if product <= 0f64 {
                    continue;
                }
                let slot = best.entry(to).or_insert((product, cell.state));
                if slot.0 < product {
                    *slot = (product, cell.state);
                }
            }
        }
        let mut cells: Vec<_> = best
            .into_iter()
            .map(|(to, (max, from))| Cell {
                state: to,
                prob: max * model.emission(&states[to], obs),
                prev: from,
            })
            .filter(|c| c.prob != 0f64)
            .collect();
        cells.sort_by_key(|c| c.state);
        Column { cells }
    }
    // Predecessor of `to`, given the previous column: the first state whose product
    // equals the incoming score, which is never below zero. States without a
    // recorded transition always give zero.
    fn predecessor(&self, to: usize, prev: &Column, size: usize) -> usize {
        let edges = &self.incoming[to];
        let products = edges.iter().map(|&(i, w)| (i, prev.prob(i) * w));
        let max = products.clone().fold(0f64, |max, (_, p)| max.max(p));
        let first_edge = products.clone().find(|&(_, p)| p == max).map(|x| x.0);
        let open = || first_missing(edges.iter().map(|x| x.0), size);
        let first = match first_edge {
            Some(e) if 0f64 < max => Some(e),
            Some(e) => Some(open().map_or(e, |o| o.min(e))),
            None => open(),
        };
        match first {
            Some(i) => i,
            None => {
                // Every product is negative. Keep the largest one as the predecessor.
                let argmax = products.fold(None, |acc: Option<(usize, f64)>, (i, p)| match acc {
                    Some((_, q)) if p <= q => acc,
                    _ => Some((i, p)),
                });
                argmax.map(|x| x.0).unwrap_or(0)
            }
        }
    }
}

/// Decode the most probable path emitting `obs`.
/// Returns `None` if the model has no state or `obs` is empty.
pub fn viterbi<M: HiddenMarkovModel>(model: &M, obs: &[M::Observation]) -> Option<Decoded<M::State>> {
    let states = model.states();
    if states.is_empty() || obs.is_empty() {
        return None;
    }
    let edges = Edges::new(model);
    let mut trellis: Vec<Column> = Vec::with_capacity(obs.len());
    let cells: Vec<_> = states
        .iter()
        .enumerate()
        .map(|(i, s)| Cell {
            state: i,
            prob: model.start(s) * model.emission(s, &obs[0]),
            prev: 0,
        })
        .filter(|c| c.prob != 0f64)
        .collect();
    trellis.push(Column { cells });
    for o in obs.iter().skip(1) {
        let column = match trellis.last() {
            Some(prev) => edges.forward(model, prev, o),
            None => Column::default(),
        };
        trellis.push(column);
    }
    let (probability, mut current) = trellis.last()?.best(states.len());
    let mut path = Vec::with_capacity(obs.len());
    path.push(states[current]);
    for t in (1..trellis.len()).rev() {
        current = match trellis[t].get(current) {
            Some(cell) => cell.prev,
            None => edges.predecessor(current, &trellis[t - 1], states.len()),
        };
        path.push(states[current]);
    }
    path.reverse();
    Some(Decoded { probability, path })
}
