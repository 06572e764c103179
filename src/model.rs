//! Profile hidden Markov model built column by column from a normalized alignment.
//!
//! A state is a context of `WINDOW` symbols anchored at an alignment column. Where
//! the query has a symbol, the model moves forward deterministically. Where the
//! query has a gap, the model branches into every symbol proposed by the
//! profile rows at that column, weighted by how close each row is to the current
//! context.
use crate::alignment::{AlignedSequence, Profile};
use crate::error::{ConfigurationError, CorrectionError};
use crate::viterbi::HiddenMarkovModel;
use crate::{GAP, WINDOW};
use std::collections::{HashMap, HashSet};

pub type Window = [u8; WINDOW];

/// A hidden state: the last `WINDOW` emitted symbols, anchored at `column`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct State {
    pub column: usize,
    pub window: Window,
}

impl State {
    pub fn new(column: usize, window: Window) -> Self {
        Self { column, window }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.column, String::from_utf8_lossy(&self.window))
    }
}

/// The query's literal window at a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Observation {
    pub column: usize,
    pub window: Window,
}

impl Observation {
    fn at(query: &[u8], column: usize) -> Self {
        Self {
            column,
            window: window_at(query, column),
        }
    }
}

fn window_at(seq: &[u8], start: usize) -> Window {
    let mut window = [GAP; WINDOW];
    window.copy_from_slice(&seq[start..start + WINDOW]);
    window
}

fn shift(window: &Window, next: u8) -> Window {
    let mut shifted = [next; WINDOW];
    shifted[..WINDOW - 1].copy_from_slice(&window[1..]);
    shifted
}

fn hamming(xs: &[u8], ys: &[u8]) -> usize {
    xs.iter().zip(ys.iter()).filter(|(x, y)| x != y).count()
}

/// Sparse weights. A key never recorded weighs zero.
#[derive(Debug, Clone)]
pub struct WeightTable<K: std::hash::Hash + Eq> {
    weights: HashMap<K, f64>,
}

impl<K: std::hash::Hash + Eq> Default for WeightTable<K> {
    fn default() -> Self {
        Self {
            weights: HashMap::new(),
        }
    }
}

impl<K: std::hash::Hash + Eq> WeightTable<K> {
    pub fn get_or_zero(&self, key: &K) -> f64 {
        self.weights.get(key).copied().unwrap_or(0f64)
    }
    pub fn insert(&mut self, key: K, weight: f64) {
        self.weights.insert(key, weight);
    }
    pub fn len(&self) -> usize {
        self.weights.len()
    }
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&K, &f64)> {
        self.weights.iter()
    }
}

// Unique frontier windows in two orders: by first and by last occurrence
// among the contexts reaching this column. Registration and transitions follow
// the first order; emissions are overwritten in the last order.
#[derive(Debug, Clone)]
struct Frontier {
    first: Vec<Window>,
    last: Vec<Window>,
}

impl Frontier {
    fn new(window: Window) -> Self {
        Self {
            first: vec![window],
            last: vec![window],
        }
    }
    fn is_empty(&self) -> bool {
        self.first.is_empty()
    }
    fn advance<F: Fn(&Window) -> Vec<Window>>(&self, successors: F) -> Self {
        let mut seen = HashSet::new();
        let first: Vec<_> = self
            .first
            .iter()
            .flat_map(|w| successors(w))
            .filter(|w| seen.insert(*w))
            .collect();
        let mut seen = HashSet::new();
        let mut last: Vec<_> = self.last.iter().flat_map(|w| successors(w)).collect();
        last.reverse();
        last.retain(|w| seen.insert(*w));
        last.reverse();
        Self { first, last }
    }
}

/// The generated model. `states` is in creation order, which is the order the
/// decoder uses to break ties.
#[derive(Debug, Clone)]
pub struct ProfileHmm {
    start: WeightTable<State>,
    states: Vec<State>,
    transitions: HashMap<State, WeightTable<State>>,
    emissions: HashMap<State, WeightTable<Observation>>,
    observations: Vec<Observation>,
}

impl ProfileHmm {
    /// Build the model of `query` against the normalized `profile`.
    /// Fails if the widths differ, if the alignment is narrower than `WINDOW`,
    /// or if more than `max_states` states are created.
    pub fn build(
        profile: &Profile,
        query: &AlignedSequence,
        max_states: usize,
    ) -> Result<Self, CorrectionError> {
        let width = query.width();
        if profile.width() != width {
            let mismatch = ConfigurationError::QueryWidthMismatch {
                id: query.id.clone(),
                expected: profile.width(),
                found: width,
            };
            return Err(mismatch.into());
        }
        let query = query.seq.as_slice();
        if width < WINDOW {
            return Err(CorrectionError::TooShort {
                width,
                window: WINDOW,
            });
        }
        let mut builder = Builder::new(profile, query, max_states);
        let steps = width - WINDOW;
        for column in 0..steps {
            builder.step(column)?;
        }
        if steps == 0 {
            // Nothing to walk; the initial state is the whole model.
            builder.register(builder.initial)?;
        }
        builder.observations.push(Observation::at(query, steps));
        trace!(
            "Model:{} states, {} observations",
            builder.states.len(),
            builder.observations.len()
        );
        Ok(builder.finish())
    }
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }
}

impl HiddenMarkovModel for ProfileHmm {
    type State = State;
    type Observation = Observation;
    fn states(&self) -> &[State] {
        &self.states
    }
    fn start(&self, state: &State) -> f64 {
        self.start.get_or_zero(state)
    }
    fn transition(&self, from: &State, to: &State) -> f64 {
        self.transitions
            .get(from)
            .map(|targets| targets.get_or_zero(to))
            .unwrap_or(0f64)
    }
    fn successors(&self, from: &State) -> Vec<(State, f64)> {
        match self.transitions.get(from) {
            Some(targets) => targets.iter().map(|(&to, &w)| (to, w)).collect(),
            None => vec![],
        }
    }
    fn emission(&self, state: &State, obs: &Observation) -> f64 {
        self.emissions
            .get(state)
            .map(|obss| obss.get_or_zero(obs))
            .unwrap_or(0f64)
    }
}

struct Builder<'a> {
    profile: &'a Profile,
    query: &'a [u8],
    max_states: usize,
    initial: State,
    start: WeightTable<State>,
    states: Vec<State>,
    registered: HashSet<State>,
    transitions: HashMap<State, WeightTable<State>>,
    emissions: HashMap<State, WeightTable<Observation>>,
    observations: Vec<Observation>,
    frontier: Frontier,
}

impl<'a> Builder<'a> {
    fn new(profile: &'a Profile, query: &'a [u8], max_states: usize) -> Self {
        let width = query.len();
        let initial = State::new(0, window_at(query, 0));
        let mut start = WeightTable::default();
        start.insert(initial, 1f64);
        let mut emissions = HashMap::with_capacity(width);
        let mut emit = WeightTable::default();
        emit.insert(Observation::at(query, 0), 1f64);
        emissions.insert(initial, emit);
        Self {
            profile,
            query,
            max_states,
            initial,
            start,
            states: Vec::with_capacity(width),
            registered: HashSet::with_capacity(width),
            transitions: HashMap::with_capacity(width),
            emissions,
            observations: Vec::with_capacity(width - WINDOW + 1),
            frontier: Frontier::new(initial.window),
        }
    }
    fn register(&mut self, state: State) -> Result<(), CorrectionError> {
        if self.registered.insert(state) {
            self.states.push(state);
            if self.max_states < self.states.len() {
                return Err(CorrectionError::StateLimit {
                    limit: self.max_states,
                });
            }
        }
        Ok(())
    }
    // Successor windows of `window` at `column + 1` with their weights, in creation order.
    fn successors(&self, column: usize, window: &Window) -> Vec<(Window, f64)> {
        let next = self.query[column + WINDOW];
        if next != GAP {
            return vec![(shift(window, next), 1f64)];
        }
        let mut extended = window.to_vec();
        extended.push(GAP);
        let rows = self.profile.rows();
        let distances: Vec<(u8, usize)> = rows
            .iter()
            .map(|row| {
                let context = &row.seq[column..column + WINDOW + 1];
                (row.seq[column + WINDOW], hamming(&extended, context))
            })
            .collect();
        let total: usize = distances.iter().map(|x| x.1).sum();
        let base = 2f64 / rows.len() as f64;
        // Every row adds its own term to the symbol it proposes. Over all symbols
        // the terms add up to one, unless no row differs from the context at all.
        let mut proposals: Vec<(u8, f64)> = vec![];
        for &(symbol, dist) in distances.iter() {
            let term = match total {
                0 => base,
                _ => base - dist as f64 / total as f64,
            };
            match proposals.iter_mut().find(|(s, _)| *s == symbol) {
                Some(slot) => slot.1 += term,
                None => proposals.push((symbol, term)),
            }
        }
        proposals
            .into_iter()
            .map(|(symbol, weight)| (shift(window, symbol), weight))
            .collect()
    }
    fn step(&mut self, column: usize) -> Result<(), CorrectionError> {
        self.observations.push(Observation::at(self.query, column));
        let is_last = column + 1 == self.query.len() - WINDOW;
        if self.frontier.is_empty() {
            return Ok(());
        }
        let emitted = Observation::at(self.query, column + 1);
        let first = std::mem::take(&mut self.frontier.first);
        for window in first.iter() {
            let from = State::new(column, *window);
            self.register(from)?;
            let mut targets = WeightTable::default();
            for (next, weight) in self.successors(column, window) {
                let to = State::new(column + 1, next);
                targets.insert(to, weight);
                if is_last {
                    self.register(to)?;
                }
            }
            self.transitions.insert(from, targets);
        }
        self.frontier.first = first;
        for window in self.frontier.last.iter() {
            for (next, weight) in self.successors(column, window) {
                let mut emit = WeightTable::default();
                emit.insert(emitted, weight);
                self.emissions.insert(State::new(column + 1, next), emit);
            }
        }
        let frontier = self.frontier.advance(|window| {
            self.successors(column, window)
                .into_iter()
                .map(|x| x.0)
                .filter(|w| !w.contains(&GAP))
                .collect()
        });
        self.frontier = frontier;
        Ok(())
    }
    fn finish(self) -> ProfileHmm {
        ProfileHmm {
            start: self.start,
            states: self.states,
            transitions: self.transitions,
            emissions: self.emissions,
            observations: self.observations,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    fn query(seq: &[u8]) -> AlignedSequence {
        AlignedSequence::new("bad", seq)
    }
    fn profile(rows: &[&[u8]]) -> Profile {
        let rows = rows
            .iter()
            .enumerate()
            .map(|(i, row)| AlignedSequence::new(format!("good{}", i), *row))
            .collect();
        Profile::new(rows).unwrap()
    }
    fn state(column: usize, window: &[u8]) -> State {
        State::new(column, window_at(window, 0))
    }
    fn obs(column: usize, window: &[u8]) -> Observation {
        Observation {
            column,
            window: window_at(window, 0),
        }
    }
    #[test]
    fn deterministic_chain() {
        let goods = profile(&[b"ACGTACGT"]);
        let model = ProfileHmm::build(&goods, &query(b"ACGTACGT"), 100).unwrap();
        assert_eq!(model.observations().len(), 8 - WINDOW + 1);
        assert_eq!(model.states().len(), 6);
        for (i, s) in model.states().iter().enumerate() {
            assert_eq!(*s, state(i, &b"ACGTACGT"[i..i + WINDOW]));
        }
        assert_eq!(model.start(&state(0, b"ACG")), 1f64);
        assert_eq!(model.transition(&state(0, b"ACG"), &state(1, b"CGT")), 1f64);
        assert_eq!(model.emission(&state(1, b"CGT"), &obs(1, b"CGT")), 1f64);
        assert_eq!(model.emission(&state(0, b"ACG"), &obs(0, b"ACG")), 1f64);
    }
    #[test]
    fn absent_entries_weigh_zero() {
        let goods = profile(&[b"ACGTACGT"]);
        let model = ProfileHmm::build(&goods, &query(b"ACGTACGT"), 100).unwrap();
        let unknown = state(3, b"TTT");
        assert_eq!(model.start(&unknown), 0f64);
        assert_eq!(model.start(&state(1, b"CGT")), 0f64);
        assert_eq!(model.transition(&unknown, &state(4, b"TTA")), 0f64);
        assert_eq!(model.transition(&state(0, b"ACG"), &unknown), 0f64);
        assert_eq!(model.emission(&unknown, &obs(3, b"TAC")), 0f64);
        assert_eq!(model.emission(&state(1, b"CGT"), &obs(2, b"GTA")), 0f64);
        assert!(model.successors(&unknown).is_empty());
    }
    #[test]
    fn branching_weight_boundary() {
        // Row0 proposes `T` and carries the whole distance (2 of 2), row1 proposes a gap.
        let goods = profile(&[b"AGGTA", b"ACG-A"]);
        let model = ProfileHmm::build(&goods, &query(b"ACG-A"), 100).unwrap();
        let from = state(0, b"ACG");
        let to = state(1, b"CGT");
        assert_eq!(model.transition(&from, &to), 2f64 / 2f64 - 2f64 / 2f64);
        assert_eq!(model.transition(&from, &to), 0f64);
        assert_eq!(model.emission(&to, &obs(1, b"CG-")), 0f64);
        assert_eq!(model.transition(&from, &state(1, b"CG-")), 1f64);
        assert_eq!(model.successors(&from).len(), 2);
    }
    #[test]
    fn branching_weights() {
        // Distances to ACG-: row0 ACGT=1, row1 ACGC=1, row2 TCGT=2. Total 4.
        let goods = profile(&[b"ACGTA", b"ACGCA", b"TCGTA"]);
        let model = ProfileHmm::build(&goods, &query(b"ACG-A"), 100).unwrap();
        let from = state(0, b"ACG");
        let to_t = state(1, b"CGT");
        let to_c = state(1, b"CGC");
        let base = 2f64 / 3f64;
        let weight_t = (base - 1f64 / 4f64) + (base - 2f64 / 4f64);
        let weight_c = base - 1f64 / 4f64;
        assert_eq!(model.transition(&from, &to_t), weight_t);
        assert_eq!(model.transition(&from, &to_c), weight_c);
        assert_eq!(model.emission(&to_c, &obs(1, b"CG-")), weight_c);
        assert_eq!(model.emission(&to_t, &obs(1, b"CG-")), weight_t);
        let total: f64 = model.successors(&from).iter().map(|x| x.1).sum();
        assert!((total - 1f64).abs() < 1e-12);
        // Each parent is followed by the successors it creates at the last step.
        let expected = [from, to_t, state(2, b"GTA"), to_c, state(2, b"GCA")];
        assert_eq!(model.states(), &expected);
    }
    #[test]
    fn shared_symbols_accumulate() {
        // Two rows propose `T`, each one mismatch (the gap itself) off the context.
        let goods = profile(&[b"ACGTA", b"ACGTA"]);
        let model = ProfileHmm::build(&goods, &query(b"ACG-A"), 100).unwrap();
        let from = state(0, b"ACG");
        let to = state(1, b"CGT");
        assert_eq!(model.successors(&from), vec![(to, 1f64)]);
    }
    #[test]
    fn zero_total_distance() {
        let goods = profile(&[b"ACG-A", b"ACG-A"]);
        let model = ProfileHmm::build(&goods, &query(b"ACG-A"), 100).unwrap();
        let to = state(1, b"CG-");
        assert_eq!(model.transition(&state(0, b"ACG"), &to), 2f64);
    }
    #[test]
    fn gapped_successors_leave_the_frontier() {
        // Row1 proposes a gap, so only the `T` branch is walked further.
        let goods = profile(&[b"ACGTAC", b"ACG-AC"]);
        let model = ProfileHmm::build(&goods, &query(b"ACG-AC"), 100).unwrap();
        let from = state(0, b"ACG");
        assert_eq!(model.successors(&from).len(), 2);
        assert!(model.states().contains(&state(1, b"CGT")));
        assert!(!model.states().contains(&state(1, b"CG-")));
        assert!(model.transition(&state(1, b"CGT"), &state(2, b"GTA")) == 1f64);
        assert!(model.states().contains(&state(2, b"GTA")));
        assert!(model.successors(&state(1, b"CG-")).is_empty());
    }
    #[test]
    fn converging_branches_are_not_duplicated() {
        let goods = profile(&[b"ACGTAAAC", b"ACGCAAAC"]);
        let model = ProfileHmm::build(&goods, &query(b"ACG-AAAC"), 100).unwrap();
        let unique: HashSet<_> = model.states().iter().collect();
        assert_eq!(unique.len(), model.states().len());
        // CGT/CGC -> GTA/GCA -> TAA/CAA -> AAA (both) -> AAC
        assert!(model.states().contains(&state(4, b"AAA")));
        assert!(model.states().contains(&state(5, b"AAC")));
        assert_eq!(model.observations().len(), 6);
    }
    #[test]
    fn narrow_alignments() {
        let goods = profile(&[b"AC"]);
        assert!(matches!(
            ProfileHmm::build(&goods, &query(b"AC"), 100),
            Err(CorrectionError::TooShort { width: 2, .. })
        ));
        let goods = profile(&[b"ACG"]);
        let model = ProfileHmm::build(&goods, &query(b"ACG"), 100).unwrap();
        assert_eq!(model.states(), &[state(0, b"ACG")]);
        assert_eq!(model.observations(), &[obs(0, b"ACG")]);
    }
    #[test]
    fn width_mismatch_is_a_configuration_error() {
        let goods = profile(&[b"ACGT"]);
        match ProfileHmm::build(&goods, &query(b"ACGTA-GT"), 100) {
            Err(CorrectionError::Configuration(ConfigurationError::QueryWidthMismatch {
                id,
                expected,
                found,
            })) => {
                assert_eq!(id, "bad");
                assert_eq!((expected, found), (4, 8));
            }
            other => panic!("{:?}", other.map(|m| m.states().len())),
        }
    }
    #[test]
    fn state_limit() {
        let goods = profile(&[b"ACGTACGTACGT"]);
        assert!(matches!(
            ProfileHmm::build(&goods, &query(b"ACGTACGTACGT"), 4),
            Err(CorrectionError::StateLimit { limit: 4 })
        ));
    }
}
