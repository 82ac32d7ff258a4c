//! Compile regex sets into homomorphic NFAs and split them into groups that
//! can be determinized without a state explosion.
//!
//! ```
//! use regroup::{GroupingConfig, group_regexes};
//!
//! let config = GroupingConfig::default().with_max_groups(2);
//! let grouping = group_regexes(&["abc", "abd", "x[0-9]+y"], &config).unwrap();
//! let placed = grouping.groups.iter().map(|g| g.regexes.len()).sum::<usize>();
//! assert_eq!(placed + grouping.residual.len(), 3);
//! ```

pub mod automaton;
pub mod charset;
pub mod error;
pub mod grouping;
pub mod partition;
pub mod syntax;

pub use automaton::{AcceptId, DfaStateCount, EpsilonNfa, HomoLut, Nfa, StateId, count_dfa_states};
pub use charset::CharSet;
pub use error::{Error, ParseError, ParseErrorKind, Result};
pub use grouping::{Grouping, GroupingConfig, RegexGroup, group_regexes};
