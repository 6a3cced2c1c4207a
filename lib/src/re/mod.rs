/*! This module builds, analyzes and evaluates patterns.

Patterns are trees of typed nodes ([`pattern::Node`]) assembled with a
[`pattern::PatternBuilder`]. There's no parser for patterns in text form,
the caller builds the tree directly. Before evaluation a pattern goes
through a few static analyses:

* [`optimizer`] rewrites the tree into an equivalent one that is cheaper to
  evaluate.
* [`first`] computes FIRST sets, which are used for turning greedy
  repetitions into possessive ones when backtracking into them is useless,
  and for skipping alternation branches that can't match.
* [`limits`] computes the minimum and maximum length of the text matched
  by the pattern, and whether every match is anchored to the start or to
  the end of the input.

The evaluation itself is done by the backtracking engine in [`backtrack`].
Patterns that start with a literal string use the searchers in [`literal`]
for locating the positions where a match can start.
*/

use thiserror::Error;

pub mod atoms;
pub mod backtrack;
pub mod limits;
pub mod literal;
pub mod pattern;

pub(crate) mod first;
pub(crate) mod optimizer;

/// Errors returned while building or preparing a pattern.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The pattern has more nodes than the engine can address.
    #[error("pattern too large")]
    TooLarge,

    /// A node id that doesn't belong to the pattern, or that doesn't
    /// precede its parent.
    #[error("invalid node id {0}")]
    InvalidNode(usize),

    /// A repetition with a maximum lower than its minimum.
    #[error("invalid repetition {{{min},{max}}}")]
    InvalidRepetition {
        /// Minimum number of iterations.
        min: usize,
        /// Maximum number of iterations.
        max: usize,
    },

    /// A character range where the lower bound is greater than the upper
    /// one.
    #[error("invalid character range {lo:#x}-{hi:#x}")]
    InvalidRange {
        /// Lower bound.
        lo: u32,
        /// Upper bound.
        hi: u32,
    },

    /// Captures are numbered starting at 1, 0 is the whole match.
    #[error("capture id 0 is reserved for the whole match")]
    InvalidCaptureId,

    /// A back reference to a capture that doesn't exist.
    #[error("back reference to undefined capture {0}")]
    UndefinedCapture(usize),

    /// A back reference to a capture name that doesn't exist.
    #[error("back reference to undefined capture `{0}`")]
    UndefinedCaptureName(String),

    /// The same name was given to captures with different ids.
    #[error("duplicate capture name `{0}`")]
    DuplicateCaptureName(String),

    /// The pattern looks at the character before the current position,
    /// which is not possible with forward-only inputs.
    #[error("pattern needs to look behind the current position")]
    RequiresBidirectional,
}
