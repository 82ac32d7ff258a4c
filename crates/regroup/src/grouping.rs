//! Greedy grouping of a regex set into groups that determinize cheaply.
//!
//! Each regex joins the first group whose combined automaton still has at
//! most `floor(nfa_states * dfa_coefficient)` DFA states. Regexes that fit
//! nowhere, and groups beyond `max_groups`, share one residual NFA.

use crate::automaton::{HomoLut, Nfa, count_dfa_states};
use crate::error::{Error, Result};
use crate::syntax::{SyntaxNode, build_syntax_tree};

/// Knobs of [`group_regexes`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupingConfig {
    /// Largest acceptable ratio of DFA states to NFA states.
    pub dfa_coefficient: f64,
    /// Number of groups kept; the smallest groups beyond it are demoted.
    pub max_groups: usize,
    /// Skip regexes that fail to parse instead of failing the whole set.
    pub skip_invalid: bool,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            dfa_coefficient: 2.0,
            max_groups: 8,
            skip_invalid: false,
        }
    }
}

impl GroupingConfig {
    pub fn with_dfa_coefficient(mut self, dfa_coefficient: f64) -> Self {
        self.dfa_coefficient = dfa_coefficient;
        self
    }

    pub fn with_max_groups(mut self, max_groups: usize) -> Self {
        self.max_groups = max_groups;
        self
    }

    pub fn with_skip_invalid(mut self, skip_invalid: bool) -> Self {
        self.skip_invalid = skip_invalid;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.dfa_coefficient.is_finite() || self.dfa_coefficient < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "DFA coefficient must be a non-negative number, got {}",
                self.dfa_coefficient
            )));
        }
        Ok(())
    }

    /// DFA state budget of a group whose NFA has `nfa_states` states.
    pub fn budget(&self, nfa_states: usize) -> usize {
        (nfa_states as f64 * self.dfa_coefficient).floor() as usize
    }
}

/// Regexes meant to be compiled into one DFA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexGroup {
    pub regexes: Vec<String>,
    /// States of the group's homomorphic NFA.
    pub nfa_states: usize,
    /// States of the DFA obtained by subset construction.
    pub dfa_states: usize,
}

#[derive(Debug, Clone)]
pub struct Grouping {
    /// Groups by descending NFA state count.
    pub groups: Vec<RegexGroup>,
    /// Sorted regexes left to the shared NFA.
    pub residual: Vec<String>,
    pub residual_nfa: Nfa,
    /// Regexes that failed to parse, when skipping is enabled.
    pub skipped: Vec<String>,
}

/// A group under construction, as indexes into the parsed regexes.
#[derive(Debug, Default)]
struct Candidate {
    members: Vec<usize>,
    nfa_states: usize,
    dfa_states: usize,
}

/// Partition `regexes` into DFA groups and a residual NFA.
///
/// The input is sorted and de-duplicated first, and the outcome only depends
/// on that sorted list. A parse failure is reported with the regex's index in
/// the sorted list unless `config.skip_invalid` is set.
pub fn group_regexes<S: AsRef<str>>(regexes: &[S], config: &GroupingConfig) -> Result<Grouping> {
    config.validate()?;

    let mut sorted: Vec<&str> = regexes.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut parsed: Vec<(&str, SyntaxNode)> = Vec::with_capacity(sorted.len());
    let mut skipped = Vec::new();
    for (index, regex) in sorted.into_iter().enumerate() {
        match build_syntax_tree(regex) {
            Ok(tree) => parsed.push((regex, tree)),
            Err(source) if config.skip_invalid => {
                log::warn!("skipping regex #{index} `{regex}`: {source}");
                skipped.push(regex.to_string());
            }
            Err(source) => {
                return Err(Error::Regex {
                    index,
                    regex: regex.to_string(),
                    source,
                });
            }
        }
    }

    // The last candidate is always empty, so a regex can start a new group.
    let mut groups = vec![Candidate::default()];
    let mut residual: Vec<usize> = Vec::new();
    for index in 0..parsed.len() {
        let mut joined = false;
        for slot in 0..groups.len() {
            let members = groups[slot].members.iter().chain([&index]);
            let nfa = Nfa::homomorphic_from_trees(members.map(|&member| &parsed[member].1));
            let lut = HomoLut::new(&nfa)?;
            let nfa_states = lut.state_count();
            let count = count_dfa_states(&lut, Some(config.budget(nfa_states)));
            if !count.within_budget {
                continue;
            }

            log::debug!(
                "regex #{index} -> DFA group: NFA states {nfa_states}, DFA states {}",
                count.states
            );
            let group = &mut groups[slot];
            group.members.push(index);
            group.nfa_states = nfa_states;
            group.dfa_states = count.states;
            groups.sort_by(|a, b| b.nfa_states.cmp(&a.nfa_states));
            if groups.last().is_none_or(|last| !last.members.is_empty()) {
                groups.push(Candidate::default());
            }
            joined = true;
            break;
        }
        if !joined {
            residual.push(index);
        }
    }
    groups.retain(|group| !group.members.is_empty());

    if groups.len() > config.max_groups {
        for demoted in groups.drain(config.max_groups..) {
            log::info!(
                "moving DFA group to NFA: {} regexes, NFA states {}, DFA states {}",
                demoted.members.len(),
                demoted.nfa_states,
                demoted.dfa_states
            );
            residual.extend(demoted.members);
        }
    }
    residual.sort_unstable();

    let (mut total_regexes, mut total_nfa, mut total_dfa) = (0, 0, 0);
    for (i, group) in groups.iter().enumerate() {
        log::info!(
            "DFA group #{i}: {} regexes, NFA states {}, DFA states {}",
            group.members.len(),
            group.nfa_states,
            group.dfa_states
        );
        total_regexes += group.members.len();
        total_nfa += group.nfa_states;
        total_dfa += group.dfa_states;
    }
    log::info!(
        "{} DFA groups total: {total_regexes} regexes, NFA states {total_nfa}, \
         DFA states {total_dfa}",
        groups.len()
    );

    let residual_nfa = Nfa::homomorphic_from_trees(residual.iter().map(|&index| &parsed[index].1));
    log::info!("NFA group: {residual_nfa}");

    let regex_of = |index: usize| parsed[index].0.to_string();
    Ok(Grouping {
        groups: groups
            .into_iter()
            .map(|group| RegexGroup {
                regexes: group.members.into_iter().map(regex_of).collect(),
                nfa_states: group.nfa_states,
                dfa_states: group.dfa_states,
            })
            .collect(),
        residual: residual.into_iter().map(regex_of).collect(),
        residual_nfa,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseErrorKind;

    #[test]
    fn test_config_defaults_and_validation() {
        let config = GroupingConfig::default();
        assert_eq!(config.max_groups, 8);
        config.validate().unwrap();
        assert_eq!(config.budget(7), 14);

        let config = config.with_dfa_coefficient(1.5).with_max_groups(2);
        assert_eq!(config.budget(5), 7);
        assert!(config.with_dfa_coefficient(-1.0).validate().is_err());
        assert!(config.with_dfa_coefficient(f64::NAN).validate().is_err());
        config.with_dfa_coefficient(0.0).validate().unwrap();
    }

    #[test]
    fn test_similar_regexes_share_a_group() {
        let config = GroupingConfig::default().with_dfa_coefficient(10.0).with_max_groups(2);
        let grouping = group_regexes(&["xyz", "abd", "abc", "abc"], &config).unwrap();
        let abc = grouping.groups.iter().position(|g| g.regexes.contains(&"abc".to_string()));
        let abd = grouping.groups.iter().position(|g| g.regexes.contains(&"abd".to_string()));
        assert!(abc.is_some());
        assert_eq!(abc, abd);
        for group in &grouping.groups {
            assert!(group.dfa_states <= config.budget(group.nfa_states));
        }
    }

    #[test]
    fn test_zero_coefficient_leaves_everything_residual() {
        let config = GroupingConfig::default().with_dfa_coefficient(0.0);
        let grouping = group_regexes(&["b", "a", "c"], &config).unwrap();
        assert!(grouping.groups.is_empty());
        assert_eq!(grouping.residual, vec!["a", "b", "c"]);
        assert_eq!(grouping.residual_nfa.rules(), 3);
    }

    #[test]
    fn test_excess_groups_are_demoted() {
        // Groups form, but none may be kept.
        let config = GroupingConfig::default().with_dfa_coefficient(1.0).with_max_groups(0);
        let grouping = group_regexes(&["abc", "xyz"], &config).unwrap();
        assert!(grouping.groups.is_empty());
        assert_eq!(grouping.residual, vec!["abc", "xyz"]);
    }

    #[test]
    fn test_invalid_regex() {
        let config = GroupingConfig::default();
        let err = group_regexes(&["ok", "(bad))"], &config).unwrap_err();
        match err {
            Error::Regex { index, regex, source } => {
                assert_eq!(index, 0);
                assert_eq!(regex, "(bad))");
                assert_eq!(source.kind, ParseErrorKind::UnbalancedParen);
            }
            other => panic!("unexpected error {other:?}"),
        }

        let grouping = group_regexes(&["ok", "(bad))"], &config.with_skip_invalid(true)).unwrap();
        assert_eq!(grouping.skipped, vec!["(bad))"]);
        assert_eq!(grouping.groups.len() + grouping.residual.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        let grouping = group_regexes::<&str>(&[], &GroupingConfig::default()).unwrap();
        assert!(grouping.groups.is_empty());
        assert!(grouping.residual.is_empty());
        assert_eq!(grouping.residual_nfa.state_count(), 1);
    }
}
