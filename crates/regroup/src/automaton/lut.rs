//! Bitmask lookup tables over a homomorphic NFA.
//!
//! In a homomorphic NFA the symbol read decides which states may be entered,
//! independently of where the edge comes from. A subset step is therefore
//! "union of successors, masked by the states the symbol can enter".

use std::collections::BTreeSet;

use indexmap::IndexSet;

use crate::automaton::nfa::Nfa;
use crate::automaton::state::{AcceptId, StateId, StateSet};
use crate::charset::{ALPHABET_SIZE, CharSet, Symbol};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct HomoLut {
    states: usize,
    forward: Vec<StateSet>,
    backward: Vec<StateSet>,
    /// Per symbol: the states entered by edges containing it.
    char_masks: Vec<StateSet>,
    /// Per state: the set carried by every edge entering it.
    csets: Vec<CharSet>,
    accepts: Vec<Vec<AcceptId>>,
    accept_mask: StateSet,
}

impl HomoLut {
    /// Build the tables of a homomorphic NFA numbered `0..n`, as produced by
    /// [`Nfa::reorganize`].
    pub fn new(nfa: &Nfa) -> Result<Self> {
        if let Some(state) = nfa.non_homomorphic_state() {
            return Err(Error::NotHomomorphic { state });
        }
        let states = nfa.state_count();
        if nfa.states().last().is_some_and(|&max| max as usize + 1 != states) {
            return Err(Error::Invariant(format!(
                "{states} states are not numbered 0..{states}"
            )));
        }

        let empty = StateSet::with_capacity(states);
        let mut forward = vec![empty.clone(); states];
        let mut backward = vec![empty.clone(); states];
        let mut csets = vec![CharSet::EMPTY; states];
        for (from, to, set) in nfa.transitions() {
            forward[from as usize].insert(to);
            backward[to as usize].insert(from);
            csets[to as usize] = set;
        }

        let mut char_masks = vec![empty.clone(); ALPHABET_SIZE];
        for (state, set) in csets.iter().enumerate() {
            for symbol in set.iter() {
                char_masks[symbol as usize].insert(state as StateId);
            }
        }

        let mut accepts = vec![Vec::new(); states];
        let mut accept_mask = empty;
        for (state, id) in nfa.accepts() {
            accepts[state as usize].push(id);
            accept_mask.insert(state);
        }

        Ok(Self {
            states,
            forward,
            backward,
            char_masks,
            csets,
            accepts,
            accept_mask,
        })
    }

    pub fn state_count(&self) -> usize {
        self.states
    }

    /// The start subset `{0}`.
    pub fn initial(&self) -> StateSet {
        StateSet::singleton(0, self.states)
    }

    pub fn forward(&self, state: StateId) -> &StateSet {
        &self.forward[state as usize]
    }

    pub fn backward(&self, state: StateId) -> &StateSet {
        &self.backward[state as usize]
    }

    pub fn char_mask(&self, symbol: Symbol) -> &StateSet {
        &self.char_masks[symbol as usize]
    }

    pub fn cset(&self, state: StateId) -> CharSet {
        self.csets[state as usize]
    }

    pub fn accept_ids(&self, state: StateId) -> &[AcceptId] {
        &self.accepts[state as usize]
    }

    /// States carrying an accept marker.
    pub fn accept_mask(&self) -> &StateSet {
        &self.accept_mask
    }

    fn union_of(&self, subset: &StateSet, table: &[StateSet]) -> StateSet {
        let mut next = StateSet::with_capacity(self.states);
        for state in subset.iter() {
            next.union_with(&table[state as usize]);
        }
        next
    }

    /// States one edge after some state of `subset`.
    pub fn successors(&self, subset: &StateSet) -> StateSet {
        self.union_of(subset, &self.forward)
    }

    /// States one edge before some state of `subset`.
    pub fn predecessors(&self, subset: &StateSet) -> StateSet {
        self.union_of(subset, &self.backward)
    }

    /// Subset reached from `subset` on `symbol`.
    pub fn step(&self, subset: &StateSet, symbol: Symbol) -> StateSet {
        let mut next = self.successors(subset);
        next.intersect_with(self.char_mask(symbol));
        next
    }

    /// Grow `subset` with its predecessors until it has no incoming edge
    /// from outside.
    pub fn close_by_expand(&self, subset: &StateSet) -> StateSet {
        let mut closed = subset.clone();
        loop {
            let mut grown = self.predecessors(&closed);
            grown.union_with(&closed);
            if grown == closed {
                return closed;
            }
            closed = grown;
        }
    }

    /// Whether no edge enters `subset` from outside it.
    pub fn is_closed(&self, subset: &StateSet) -> bool {
        self.predecessors(subset).is_subset(subset)
    }

    /// Regexes accepted by some state of `subset`.
    pub fn accepts_of(&self, subset: &StateSet) -> BTreeSet<AcceptId> {
        let mut accepting = subset.clone();
        accepting.intersect_with(&self.accept_mask);
        accepting
            .iter()
            .flat_map(|state| self.accept_ids(state).iter().copied())
            .collect()
    }

    /// Every accept id reached while reading `symbols`, at any position.
    pub fn run(&self, symbols: &[Symbol]) -> BTreeSet<AcceptId> {
        let mut current = self.initial();
        let mut found = self.accepts_of(&current);
        for &symbol in symbols {
            current = self.step(&current, symbol);
            found.extend(self.accepts_of(&current));
        }
        found
    }

    /// Character masks with duplicates removed; symbols sharing a mask move
    /// every subset to the same place.
    pub fn distinct_char_masks(&self) -> Vec<&StateSet> {
        let masks: IndexSet<&StateSet> = self.char_masks.iter().collect();
        masks.into_iter().collect()
    }
}
