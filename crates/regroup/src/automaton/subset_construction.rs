//! Bounded subset construction over a homomorphic NFA.
//!
//! No DFA is materialised: the construction only counts the distinct
//! subsets reachable from `{0}`, and gives up once a budget is exceeded.

use indexmap::IndexSet;

use crate::automaton::lut::HomoLut;
use crate::automaton::state::StateSet;

/// Outcome of [`count_dfa_states`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DfaStateCount {
    /// Distinct subsets seen. When the budget was exceeded this is
    /// `budget + 1`, not the full count.
    pub states: usize,
    pub within_budget: bool,
}

/// Count the DFA states of the NFA behind `lut`, stopping as soon as more
/// than `budget` states have been discovered. `None` means no budget.
pub fn count_dfa_states(lut: &HomoLut, budget: Option<usize>) -> DfaStateCount {
    let masks = lut.distinct_char_masks();
    let mut seen: IndexSet<StateSet> = IndexSet::new();
    seen.insert(lut.initial());
    if exceeds(seen.len(), budget) {
        return aborted(seen.len(), budget);
    }

    let mut worklist = vec![lut.initial()];
    while let Some(subset) = worklist.pop() {
        let successors = lut.successors(&subset);
        for mask in &masks {
            let mut next = successors.clone();
            next.intersect_with(mask);
            if seen.insert(next.clone()) {
                if exceeds(seen.len(), budget) {
                    return aborted(seen.len(), budget);
                }
                worklist.push(next);
            }
        }
    }

    DfaStateCount {
        states: seen.len(),
        within_budget: true,
    }
}

fn exceeds(states: usize, budget: Option<usize>) -> bool {
    budget.is_some_and(|budget| states > budget)
}

fn aborted(states: usize, budget: Option<usize>) -> DfaStateCount {
    log::trace!("subset construction aborted: {states} states over a budget of {budget:?}");
    DfaStateCount {
        states,
        within_budget: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::nfa::Nfa;

    fn lut(regexes: &[&str]) -> HomoLut {
        HomoLut::new(&Nfa::homomorphic_from_regexes(regexes).unwrap()).unwrap()
    }

    #[test]
    fn test_literal_chain() {
        // Subsets {0}, {0,1}, {0,2} and {0,3}, one per matched prefix.
        let count = count_dfa_states(&lut(&["abc"]), None);
        assert_eq!(count, DfaStateCount { states: 4, within_budget: true });
    }

    #[test]
    fn test_budget_is_inclusive() {
        let lut = lut(&["abc"]);
        assert!(count_dfa_states(&lut, Some(4)).within_budget);
        let over = count_dfa_states(&lut, Some(3));
        assert!(!over.within_budget);
        assert_eq!(over.states, 4);
    }

    #[test]
    fn test_zero_budget_always_fails() {
        let count = count_dfa_states(&lut(&["a"]), Some(0));
        assert_eq!(count, DfaStateCount { states: 1, within_budget: false });
    }

    #[test]
    fn test_blowup_is_cut_short() {
        // `.` followed by n symbols needs 2^n subsets to track.
        let lut = lut(&["a.{8}b"]);
        let count = count_dfa_states(&lut, Some(lut.state_count() * 2));
        assert!(!count.within_budget);
        assert_eq!(count.states, lut.state_count() * 2 + 1);
    }
}
