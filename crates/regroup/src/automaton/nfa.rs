//! ε-free NFA: simplification, homomorphic conversion and renumbering.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::time::Instant;

use indexmap::IndexMap;

use crate::automaton::dual_key::DualKeyMap;
use crate::automaton::epsilon_nfa::EpsilonNfa;
use crate::automaton::state::{AcceptId, StateId, StateSet};
use crate::charset::{CharSet, Symbol};
use crate::error::{Error, Result};
use crate::syntax::SyntaxNode;

/// A node of the exported graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub id: StateId,
    pub start: bool,
    /// Regexes accepted in this state; empty for a regular state.
    pub accepts: Vec<AcceptId>,
}

/// An edge of the exported graph, labelled with its character set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEdge {
    pub from: StateId,
    pub to: StateId,
    pub label: String,
}

/// Renderer-agnostic view of an NFA.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NfaGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// An NFA without ε-edges.
///
/// `transitions` maps `(from, to)` to the non-empty set of symbols moving
/// between the two states; `accepts` marks the states accepting each regex.
#[derive(Debug, Clone)]
pub struct Nfa {
    transitions: DualKeyMap<StateId, StateId, CharSet>,
    accepts: DualKeyMap<StateId, AcceptId, ()>,
    rules: u32,
}

impl Nfa {
    pub(crate) fn from_parts(
        transitions: DualKeyMap<StateId, StateId, CharSet>,
        accepts: DualKeyMap<StateId, AcceptId, ()>,
        rules: u32,
    ) -> Self {
        Self {
            transitions,
            accepts,
            rules,
        }
    }

    /// Parse `regexes` and run the whole pipeline, see
    /// [`Nfa::homomorphic_from_trees`].
    pub fn homomorphic_from_regexes<S: AsRef<str>>(regexes: &[S]) -> Result<Self> {
        let trees = regexes
            .iter()
            .enumerate()
            .map(|(index, regex)| {
                let regex = regex.as_ref();
                crate::syntax::build_syntax_tree(regex).map_err(|source| Error::Regex {
                    index,
                    regex: regex.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::homomorphic_from_trees(&trees))
    }

    /// Build a simplified, homomorphic, compactly numbered NFA.
    ///
    /// Stages: ε-NFA construction and elimination, simplification,
    /// homomorphic conversion, simplification again, renumbering.
    pub fn homomorphic_from_trees<'t, I>(trees: I) -> Self
    where
        I: IntoIterator<Item = &'t SyntaxNode>,
    {
        let started = Instant::now();
        let mut nfa = EpsilonNfa::from_trees(trees).eliminate_epsilon();
        nfa.log_stage("build", started);
        nfa.simplify();
        nfa.log_stage("simplify", started);
        nfa.to_homomorphic();
        nfa.log_stage("to_homo", started);
        nfa.simplify();
        nfa.log_stage("simplify", started);
        nfa.reorganize();
        nfa.log_stage("reorganize", started);
        nfa
    }

    fn log_stage(&self, stage: &str, started: Instant) {
        log::debug!("[{:>8} ms] {stage:<10} {self}", started.elapsed().as_millis());
        if cfg!(debug_assertions) {
            if let Err(err) = self.self_check() {
                panic!("NFA broken after {stage}: {err}");
            }
        }
    }

    /// Add `set` to the edge `from -> to`, creating it if needed.
    pub fn add_transition(&mut self, from: StateId, to: StateId, set: CharSet) {
        let merged = self.transitions.get(from, to).map_or(set, |&old| old | set);
        self.transitions.insert(from, to, merged);
    }

    /// Number of regexes.
    pub fn rules(&self) -> u32 {
        self.rules
    }

    /// Every state that has an edge or an accept marker.
    pub fn states(&self) -> BTreeSet<StateId> {
        self.transitions
            .a_keys()
            .chain(self.transitions.b_keys())
            .chain(self.accepts.a_keys())
            .collect()
    }

    pub fn state_count(&self) -> usize {
        self.states().len()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    pub fn accept_count(&self) -> usize {
        self.accepts.len()
    }

    pub fn transition(&self, from: StateId, to: StateId) -> Option<CharSet> {
        self.transitions.get(from, to).copied()
    }

    pub fn transitions(&self) -> impl Iterator<Item = (StateId, StateId, CharSet)> + '_ {
        self.transitions.iter().map(|(from, to, &set)| (from, to, set))
    }

    pub fn accepts(&self) -> impl Iterator<Item = (StateId, AcceptId)> + '_ {
        self.accepts.iter().map(|(state, id, ())| (state, id))
    }

    pub fn accept_ids(&self, state: StateId) -> Vec<AcceptId> {
        self.accepts
            .by_a(state)
            .map(|ids| ids.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Edges leaving `state` as `(to, set)`.
    pub fn outgoing(&self, state: StateId) -> Vec<(StateId, CharSet)> {
        self.transitions
            .by_a(state)
            .map(|targets| targets.iter().map(|(&to, &set)| (to, set)).collect())
            .unwrap_or_default()
    }

    /// Edges entering `state` as `(from, set)`.
    pub fn incoming(&self, state: StateId) -> Vec<(StateId, CharSet)> {
        self.transitions
            .by_b(state)
            .map(|sources| sources.iter().map(|(&from, &set)| (from, set)).collect())
            .unwrap_or_default()
    }

    fn targets(&self, state: StateId) -> Vec<StateId> {
        self.transitions
            .by_a(state)
            .map(|targets| targets.keys().copied().collect())
            .unwrap_or_default()
    }

    fn sources(&self, state: StateId) -> Vec<StateId> {
        self.transitions
            .by_b(state)
            .map(|sources| sources.keys().copied().collect())
            .unwrap_or_default()
    }

    /// The first state entered by edges carrying different character sets.
    pub fn non_homomorphic_state(&self) -> Option<StateId> {
        self.transitions.b_keys().find(|&state| {
            self.transitions.by_b(state).is_some_and(|sources| {
                let mut sets = sources.values();
                let first = sets.next();
                sets.any(|set| Some(set) != first)
            })
        })
    }

    /// Whether all edges entering any given state carry the same set.
    pub fn is_homomorphic(&self) -> bool {
        self.non_homomorphic_state().is_none()
    }

    /// Verify the automaton invariants: every accept id `1..=rules` is
    /// present, no edge is empty, and every state has an incoming edge and
    /// either an outgoing edge or an accept marker.
    pub fn self_check(&self) -> Result<()> {
        self.transitions.check_consistency().map_err(Error::Invariant)?;
        self.accepts.check_consistency().map_err(Error::Invariant)?;

        let present: BTreeSet<u32> = self.accepts.b_keys().map(|id| id.0).collect();
        let expected: BTreeSet<u32> = (1..=self.rules).collect();
        if present != expected {
            return Err(Error::Invariant(format!(
                "accept ids {present:?} do not match {} rules",
                self.rules
            )));
        }
        if let Some((from, to, _)) = self.transitions.iter().find(|(_, _, set)| set.is_empty()) {
            return Err(Error::Invariant(format!("empty edge {from} -> {to}")));
        }
        for state in self.states() {
            if !self.transitions.has_a(state) && !self.accepts.has_a(state) {
                return Err(Error::Invariant(format!("state {state} leads nowhere")));
            }
            if !self.transitions.has_b(state) {
                return Err(Error::Invariant(format!("state {state} is never entered")));
            }
        }
        Ok(())
    }

    /// Delete a state with every edge and accept marker touching it.
    pub fn remove_state(&mut self, state: StateId) {
        self.transitions.remove_a(state);
        self.transitions.remove_b(state);
        self.accepts.remove_a(state);
    }

    /// States reachable from `seeds` following edges forwards or backwards.
    fn reachable(&self, seeds: impl IntoIterator<Item = StateId>, forwards: bool) -> StateSet {
        let capacity = self.states().last().map_or(0, |&max| max as usize + 1);
        let mut reached = StateSet::with_capacity(capacity);
        let mut queue: VecDeque<StateId> = seeds.into_iter().collect();
        while let Some(state) = queue.pop_front() {
            if reached.contains(state) {
                continue;
            }
            reached.insert(state);
            let next = if forwards {
                self.targets(state)
            } else {
                self.sources(state)
            };
            queue.extend(next.into_iter().filter(|&s| !reached.contains(s)));
        }
        reached
    }

    /// Delete states unreachable from state 0 or unable to reach an accept
    /// marker. State 0 itself is always kept.
    pub fn prune(&mut self) {
        let reachable = self.reachable([0], true);
        let productive = self.reachable(self.accepts.a_keys().collect::<Vec<_>>(), false);
        for state in self.states() {
            if state != 0 && !(reachable.contains(state) && productive.contains(state)) {
                self.remove_state(state);
            }
        }
    }

    /// Merge equivalent states until no merge applies.
    ///
    /// Three passes, each run to a fixed point: siblings entered from the
    /// same state with identical incoming edges, then states accepting the
    /// same regex with identical outgoing edges, then states entering the
    /// same state with identical outgoing edges. The surviving state is the
    /// lower-numbered one, so state 0 is never merged away.
    pub fn simplify(&mut self) {
        loop {
            let mut merged = false;
            let sources: Vec<StateId> = self.transitions.a_keys().collect();
            for source in sources {
                let siblings = self.targets(source);
                merged |= self.merge_siblings(&siblings, Self::merge_when_same_in);
            }
            if !merged {
                break;
            }
        }
        loop {
            let mut merged = false;
            let ids: Vec<AcceptId> = self.accepts.b_keys().collect();
            for id in ids {
                let siblings: Vec<StateId> = self
                    .accepts
                    .by_b(id)
                    .map(|states| states.keys().copied().collect())
                    .unwrap_or_default();
                merged |= self.merge_siblings(&siblings, Self::merge_when_same_out);
            }
            if !merged {
                break;
            }
        }
        loop {
            let mut merged = false;
            let targets: Vec<StateId> = self.transitions.b_keys().collect();
            for target in targets {
                let siblings = self.sources(target);
                merged |= self.merge_siblings(&siblings, Self::merge_when_same_out);
            }
            if !merged {
                break;
            }
        }
    }

    fn merge_siblings(
        &mut self,
        siblings: &[StateId],
        merge: fn(&mut Self, StateId, StateId) -> bool,
    ) -> bool {
        let mut merged = false;
        for &n1 in siblings {
            for &n2 in siblings {
                if n1 < n2 && merge(self, n1, n2) {
                    merged = true;
                }
            }
        }
        merged
    }

    /// Edges entering `state`, with an edge from `n2` counted as an edge
    /// from `n1`.
    fn folded_incoming(
        &self,
        state: StateId,
        n1: StateId,
        n2: StateId,
    ) -> BTreeMap<StateId, CharSet> {
        let mut incoming: BTreeMap<StateId, CharSet> = self.incoming(state).into_iter().collect();
        if let Some(set) = incoming.remove(&n2) {
            let folded = incoming.entry(n1).or_insert(CharSet::EMPTY);
            *folded = *folded | set;
        }
        incoming
    }

    /// Merge `n2` into `n1` if both are entered by the same edges.
    fn merge_when_same_in(&mut self, n1: StateId, n2: StateId) -> bool {
        if n1 == n2 || !self.transitions.has_b(n1) || !self.transitions.has_b(n2) {
            return false;
        }
        if self.folded_incoming(n1, n1, n2) != self.folded_incoming(n2, n1, n2) {
            return false;
        }
        for (to, set) in self.outgoing(n2) {
            self.add_transition(n1, to, set);
        }
        for id in self.accept_ids(n2) {
            self.accepts.insert(n1, id, ());
        }
        self.remove_state(n2);
        true
    }

    /// Merge `n2` into `n1` if both lead to the same edges and accept the
    /// same regexes, and every edge entering either carries one set.
    fn merge_when_same_out(&mut self, n1: StateId, n2: StateId) -> bool {
        if n1 == n2 || !self.transitions.has_b(n1) || !self.transitions.has_b(n2) {
            return false;
        }
        let accepts_of =
            |state| -> BTreeSet<AcceptId> { self.accept_ids(state).into_iter().collect() };
        let outgoing_of =
            |state| -> BTreeMap<StateId, CharSet> { self.outgoing(state).into_iter().collect() };
        if accepts_of(n1) != accepts_of(n2) || outgoing_of(n1) != outgoing_of(n2) {
            return false;
        }
        let into_n2 = self.incoming(n2);
        let into_n1 = self.incoming(n1);
        let mut sets = into_n1.iter().chain(&into_n2).map(|&(_, set)| set);
        if let Some(first) = sets.next() {
            if sets.any(|set| set != first) {
                return false;
            }
        }
        for (from, set) in into_n2 {
            self.add_transition(from, n1, set);
        }
        self.remove_state(n2);
        true
    }

    /// Split states so that all edges entering a state carry the same set.
    ///
    /// The edges entering a state are grouped by set. The first group keeps
    /// the state; every other group is redirected to a new copy sharing the
    /// state's outgoing edges and accept markers. A self-loop leads to the
    /// copy of its own set. Copies only add edges with sets their targets
    /// already receive, so one sweep over the states suffices.
    pub fn to_homomorphic(&mut self) {
        let mut next = self.states().last().map_or(0, |&max| max + 1);
        let targets: Vec<StateId> = self.transitions.b_keys().collect();
        for target in targets {
            let incoming = self.incoming(target);
            let mut copy_of: IndexMap<CharSet, StateId> = IndexMap::new();
            for &(_, set) in &incoming {
                if copy_of.is_empty() {
                    copy_of.insert(set, target);
                } else if !copy_of.contains_key(&set) {
                    copy_of.insert(set, next);
                    next += 1;
                }
            }
            if copy_of.len() < 2 {
                continue;
            }

            let outgoing: Vec<(StateId, CharSet)> = self
                .outgoing(target)
                .into_iter()
                .map(|(to, set)| match copy_of.get(&set) {
                    Some(&copy) if to == target => (copy, set),
                    _ => (to, set),
                })
                .collect();
            let accepts = self.accept_ids(target);

            self.transitions.remove(target, target);
            for (from, set) in incoming {
                let copy = copy_of.get(&set).copied().unwrap_or(target);
                if from != target && copy != target {
                    self.transitions.remove(from, target);
                    self.add_transition(from, copy, set);
                }
            }
            for &state in copy_of.values() {
                for &(to, set) in &outgoing {
                    self.add_transition(state, to, set);
                }
                if state != target {
                    for &id in &accepts {
                        self.accepts.insert(state, id, ());
                    }
                }
            }
        }
    }

    /// Renumber states `0..n` in breadth-first order from state 0, visiting
    /// successors by ascending old number. States unreachable from 0 are
    /// dropped.
    pub fn reorganize(&mut self) {
        let mut renamed: HashMap<StateId, StateId> = HashMap::new();
        let mut queue = VecDeque::from([0]);
        while let Some(state) = queue.pop_front() {
            if renamed.contains_key(&state) {
                continue;
            }
            renamed.insert(state, renamed.len() as StateId);
            let mut targets = self.targets(state);
            targets.sort_unstable();
            queue.extend(targets.into_iter().filter(|t| !renamed.contains_key(t)));
        }

        let mut transitions = DualKeyMap::new();
        for (from, to, &set) in self.transitions.iter() {
            if let (Some(&from), Some(&to)) = (renamed.get(&from), renamed.get(&to)) {
                transitions.insert(from, to, set);
            }
        }
        let mut accepts = DualKeyMap::new();
        for (state, id, ()) in self.accepts.iter() {
            if let Some(&state) = renamed.get(&state) {
                accepts.insert(state, id, ());
            }
        }
        self.transitions = transitions;
        self.accepts = accepts;
    }

    /// Every accept id reached while reading `symbols`, at any position.
    pub fn run(&self, symbols: &[Symbol]) -> BTreeSet<AcceptId> {
        let mut found = BTreeSet::new();
        let mut current = BTreeSet::from([0]);
        for &state in &current {
            found.extend(self.accept_ids(state));
        }
        for &symbol in symbols {
            let mut next = BTreeSet::new();
            for &state in &current {
                for (to, set) in self.outgoing(state) {
                    if set.contains(symbol) {
                        next.insert(to);
                    }
                }
            }
            for &state in &next {
                found.extend(self.accept_ids(state));
            }
            current = next;
        }
        found
    }

    /// Export nodes and labelled edges for an external renderer.
    pub fn to_graph(&self) -> NfaGraph {
        let nodes = self
            .states()
            .into_iter()
            .map(|id| GraphNode {
                id,
                start: id == 0,
                accepts: self.accept_ids(id),
            })
            .collect();
        let edges = self
            .transitions()
            .map(|(from, to, set)| GraphEdge {
                from,
                to,
                label: set.to_string(),
            })
            .collect();
        NfaGraph { nodes, edges }
    }
}

impl fmt::Display for Nfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<NFA: {} rules, {} states, {} transitions, homo={}>",
            self.rules,
            self.state_count(),
            self.transition_count(),
            self.is_homomorphic()
        )
    }
}
