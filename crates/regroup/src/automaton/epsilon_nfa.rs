//! ε-NFA construction from syntax trees, and ε-elimination.

use std::collections::BTreeSet;

use crate::automaton::dual_key::DualKeyMap;
use crate::automaton::nfa::Nfa;
use crate::automaton::state::{AcceptId, StateId, StateSet};
use crate::charset::{CharSet, Symbol};
use crate::error::{Error, Result};
use crate::syntax::{Content, Repeat, SyntaxNode, build_syntax_tree};

/// An edge still to be expanded: `node` repeated `repeat` times leads from
/// `from` to `to`. When `chained`, the node's successors follow it.
struct Pending<'t> {
    from: StateId,
    to: StateId,
    node: &'t SyntaxNode,
    repeat: Repeat,
    chained: bool,
}

impl<'t> Pending<'t> {
    /// The node and its successors, with the node's own repetition.
    fn chain(from: StateId, to: StateId, node: &'t SyntaxNode) -> Self {
        Self {
            from,
            to,
            node,
            repeat: node.repeat,
            chained: true,
        }
    }

    /// The node alone, repeated `repeat` times.
    fn single(from: StateId, to: StateId, node: &'t SyntaxNode, repeat: Repeat) -> Self {
        Self {
            from,
            to,
            node,
            repeat,
            chained: false,
        }
    }
}

/// An NFA with ε-edges, as built from a list of regexes.
///
/// State 0 carries a self-loop over the whole alphabet, so every regex may
/// start matching at any position. The regex at index `i` accepts with
/// `AcceptId::from_index(i)`.
#[derive(Debug, Clone)]
pub struct EpsilonNfa {
    transitions: DualKeyMap<StateId, StateId, CharSet>,
    epsilons: DualKeyMap<StateId, StateId, ()>,
    accepts: DualKeyMap<StateId, AcceptId, ()>,
    rules: u32,
    states: StateId,
}

impl EpsilonNfa {
    fn empty() -> Self {
        let mut nfa = Self {
            transitions: DualKeyMap::new(),
            epsilons: DualKeyMap::new(),
            accepts: DualKeyMap::new(),
            rules: 0,
            states: 1,
        };
        nfa.add_transition(0, 0, CharSet::FULL);
        nfa
    }

    /// Parse every regex and build the combined ε-NFA.
    pub fn from_regexes<S: AsRef<str>>(regexes: &[S]) -> Result<Self> {
        let trees = regexes
            .iter()
            .enumerate()
            .map(|(index, regex)| {
                let regex = regex.as_ref();
                build_syntax_tree(regex).map_err(|source| Error::Regex {
                    index,
                    regex: regex.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_trees(&trees))
    }

    /// Build the combined ε-NFA of already parsed regexes.
    pub fn from_trees<'t, I>(trees: I) -> Self
    where
        I: IntoIterator<Item = &'t SyntaxNode>,
    {
        let mut nfa = Self::empty();
        let mut pending = Vec::new();
        for tree in trees {
            let end = nfa.new_state();
            nfa.rules += 1;
            nfa.accepts.insert(end, AcceptId(nfa.rules), ());
            pending.push(Pending::chain(0, end, tree));
        }

        while let Some(Pending {
            from,
            mut to,
            node,
            repeat,
            chained,
        }) = pending.pop()
        {
            // Successors get their own edge so that the repetition below
            // applies to this node alone.
            if let Some(next) = node.next.as_deref().filter(|_| chained) {
                let middle = nfa.new_state();
                pending.push(Pending::chain(middle, to, next));
                to = middle;
            }

            let Repeat { min, max } = repeat;
            match max {
                None if min <= 2 => {
                    let looped = nfa.new_state();
                    if min == 2 {
                        pending.push(Pending::single(from, looped, node, Repeat::ONCE));
                    } else {
                        nfa.add_epsilon(from, looped);
                    }
                    if min >= 1 {
                        pending.push(Pending::single(looped, to, node, Repeat::ONCE));
                    } else {
                        nfa.add_epsilon(looped, to);
                    }
                    pending.push(Pending::single(looped, looped, node, Repeat::ONCE));
                }
                _ if min > 1 => {
                    let middle = nfa.new_state();
                    let rest = Repeat::new(min - 1, max.map(|max| max.saturating_sub(1)));
                    pending.push(Pending::single(from, middle, node, rest));
                    pending.push(Pending::single(middle, to, node, Repeat::ONCE));
                }
                Some(_) if min == 0 => {
                    pending.push(Pending::single(from, to, node, Repeat::new(1, max)));
                    nfa.add_epsilon(from, to);
                }
                Some(max) if max >= 2 => {
                    pending.push(Pending::single(from, to, node, Repeat::new(2, Some(max))));
                    pending.push(Pending::single(from, to, node, Repeat::ONCE));
                }
                _ => match &node.content {
                    Content::Group(alternatives) => {
                        for alternative in alternatives {
                            pending.push(Pending::chain(from, to, alternative));
                        }
                    }
                    Content::Set(set) => nfa.add_transition(from, to, *set),
                },
            }
        }
        nfa
    }

    fn new_state(&mut self) -> StateId {
        let state = self.states;
        self.states += 1;
        state
    }

    /// Add `set` to the edge `from -> to`, creating it if needed.
    fn add_transition(&mut self, from: StateId, to: StateId, set: CharSet) {
        let merged = self.transitions.get(from, to).map_or(set, |&old| old | set);
        self.transitions.insert(from, to, merged);
    }

    fn add_epsilon(&mut self, from: StateId, to: StateId) {
        if from != to {
            self.epsilons.insert(from, to, ());
        }
    }

    /// Number of regexes.
    pub fn rules(&self) -> u32 {
        self.rules
    }

    pub fn epsilon_count(&self) -> usize {
        self.epsilons.len()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// `states` plus everything reachable from them through ε-edges.
    pub fn closure(&self, states: &StateSet) -> StateSet {
        let mut closure = states.clone();
        let mut stack: Vec<StateId> = states.iter().collect();
        while let Some(state) = stack.pop() {
            let Some(targets) = self.epsilons.by_a(state) else {
                continue;
            };
            for &target in targets.keys() {
                if !closure.contains(target) {
                    closure.insert(target);
                    stack.push(target);
                }
            }
        }
        closure
    }

    /// States entered from `states` on `symbol`, closed under ε-edges.
    pub fn step(&self, states: &StateSet, symbol: Symbol) -> StateSet {
        let mut reached = StateSet::with_capacity(self.states as usize);
        for state in states.iter() {
            let Some(targets) = self.transitions.by_a(state) else {
                continue;
            };
            for (&target, set) in targets {
                if set.contains(symbol) {
                    reached.insert(target);
                }
            }
        }
        self.closure(&reached)
    }

    fn accepts_of(&self, states: &StateSet, found: &mut BTreeSet<AcceptId>) {
        for state in states.iter() {
            if let Some(accepts) = self.accepts.by_a(state) {
                found.extend(accepts.keys().copied());
            }
        }
    }

    /// Every accept id reached while reading `symbols`, at any position.
    pub fn run(&self, symbols: &[Symbol]) -> BTreeSet<AcceptId> {
        let mut found = BTreeSet::new();
        let mut current = self.closure(&StateSet::singleton(0, self.states as usize));
        self.accepts_of(&current, &mut found);
        for &symbol in symbols {
            current = self.step(&current, symbol);
            self.accepts_of(&current, &mut found);
        }
        found
    }

    /// Remove every ε-edge, producing an NFA for the same language.
    ///
    /// Every state with ε-edges inherits the edges and accept markers of the
    /// states in its ε-closure, taken from the edges as built. All ε-edges
    /// are then dropped, and states left unreachable from 0 or unable to
    /// reach an accept marker are pruned.
    pub fn eliminate_epsilon(mut self) -> Nfa {
        let mut edges: Vec<(StateId, StateId, CharSet)> = Vec::new();
        let mut accepts: Vec<(StateId, AcceptId)> = Vec::new();
        for state in self.epsilons.a_keys() {
            let closure = self.closure(&StateSet::singleton(state, self.states as usize));
            for reached in closure.iter().filter(|&reached| reached != state) {
                if let Some(targets) = self.transitions.by_a(reached) {
                    edges.extend(targets.iter().map(|(&to, &set)| (state, to, set)));
                }
                if let Some(ids) = self.accepts.by_a(reached) {
                    accepts.extend(ids.keys().map(|&id| (state, id)));
                }
            }
        }

        for (from, to, set) in edges {
            self.add_transition(from, to, set);
        }
        for (state, id) in accepts {
            self.accepts.insert(state, id, ());
        }
        self.epsilons = DualKeyMap::new();

        let mut nfa = Nfa::from_parts(self.transitions, self.accepts, self.rules);
        nfa.prune();
        nfa
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::framed;

    fn accepted(nfa: &EpsilonNfa, input: &[u8]) -> Vec<u32> {
        nfa.run(&framed(input)).into_iter().map(|id| id.0).collect()
    }

    #[test]
    fn test_literal_sequence() {
        let nfa = EpsilonNfa::from_regexes(&["abc"]).unwrap();
        assert_eq!(nfa.rules(), 1);
        assert_eq!(nfa.epsilon_count(), 0);
        assert_eq!(accepted(&nfa, b"xxabcxx"), vec![1]);
        assert!(accepted(&nfa, b"abxc").is_empty());
    }

    #[test]
    fn test_repetitions() {
        let nfa = EpsilonNfa::from_regexes(&["^a{2,3}$", "^b*c$", "^d+$", "^e{3,}$"]).unwrap();
        assert!(nfa.epsilon_count() > 0);
        assert!(accepted(&nfa, b"a").is_empty());
        assert_eq!(accepted(&nfa, b"aa"), vec![1]);
        assert_eq!(accepted(&nfa, b"aaa"), vec![1]);
        assert!(accepted(&nfa, b"aaaa").is_empty());
        assert_eq!(accepted(&nfa, b"c"), vec![2]);
        assert_eq!(accepted(&nfa, b"bbbc"), vec![2]);
        assert!(accepted(&nfa, b"").is_empty());
        assert_eq!(accepted(&nfa, b"ddd"), vec![3]);
        assert!(accepted(&nfa, b"ee").is_empty());
        assert_eq!(accepted(&nfa, b"eeeee"), vec![4]);
    }

    #[test]
    fn test_alternation_with_successor() {
        let nfa = EpsilonNfa::from_regexes(&["^(ab|c)d"]).unwrap();
        assert_eq!(accepted(&nfa, b"abd"), vec![1]);
        assert_eq!(accepted(&nfa, b"cd"), vec![1]);
        assert!(accepted(&nfa, b"ad").is_empty());
        assert!(accepted(&nfa, b"xcd").is_empty());
    }

    #[test]
    fn test_parse_error_names_regex() {
        let err = EpsilonNfa::from_regexes(&["ok", "a)"]).unwrap_err();
        assert!(matches!(err, Error::Regex { index: 1, .. }));
    }

    #[test]
    fn test_elimination_leaves_no_epsilon() {
        let regexes = ["a*b", "(x|y?)z", "^q{0,2}r$", "m(n|o)*"];
        let eps = EpsilonNfa::from_regexes(&regexes).unwrap();
        let nfa = eps.clone().eliminate_epsilon();
        nfa.self_check().unwrap();
        let inputs = [
            &b"b"[..], b"aab", b"z", b"xz", b"yz", b"r", b"qqr", b"qqqr", b"m", b"mnon", b"",
        ];
        for input in inputs {
            let framed = framed(input);
            assert_eq!(eps.run(&framed), nfa.run(&framed), "{input:?}");
        }
    }

    #[test]
    fn test_nested_nullable_repeats() {
        // ε-cycles through loop states of nested nullable repetitions.
        let regexes = [
            "((a|b*)+){2}",
            "(a*)*b",
            "c{3,}",
            "([ab].{0,2}|[ab]+c|a*){3,}",
            "[ab]([ab]*){2,3}(.{3,}|b{0,2}a{0,2}a*){3,}",
        ];
        let eps = EpsilonNfa::from_regexes(&regexes).unwrap();
        assert!(eps.epsilon_count() > 0);
        let nfa = eps.clone().eliminate_epsilon();
        nfa.self_check().unwrap();

        let mut inputs: Vec<Vec<u8>> = vec![Vec::new()];
        for _ in 0..5 {
            let longer: Vec<Vec<u8>> = inputs
                .iter()
                .filter(|input| input.len() == inputs.last().map_or(0, Vec::len))
                .flat_map(|input| {
                    b"abc".iter().map(move |&byte| {
                        let mut next = input.clone();
                        next.push(byte);
                        next
                    })
                })
                .collect();
            inputs.extend(longer);
        }
        assert_eq!(inputs.len(), 1 + 3 + 9 + 27 + 81 + 243);
        for input in &inputs {
            let framed = framed(input);
            assert_eq!(eps.run(&framed), nfa.run(&framed), "{input:?}");
        }
        assert_eq!(accepted(&eps, b"b"), vec![1, 2, 4, 5]);
    }

    #[test]
    fn test_empty_match_accepts_at_start() {
        let nfa = EpsilonNfa::from_regexes(&["a*"]).unwrap();
        assert_eq!(accepted(&nfa, b""), vec![1]);
        let nfa = nfa.eliminate_epsilon();
        assert_eq!(nfa.run(&framed(b"")).len(), 1);
    }
}
