/*! Static analysis of pattern lengths and anchors.

[`Limits`] tells the minimum and maximum number of characters that a
pattern can consume. Counts saturate instead of overflowing: a count that is
finite but doesn't fit in a `usize` becomes [`Count::Huge`], and unbounded
repetitions produce [`Count::Infinite`]. The two sentinels are kept apart
so that a huge-but-finite maximum is never mistaken for an unbounded one.

The limits are advisory. They are used for rejecting inputs that are too
short for the pattern and for skipping start positions during searches,
never for deciding the outcome of a match.
*/

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::ops::{Add, Mul};

use rustc_hash::FxHashSet;

use crate::re::pattern::{Node, NodeId, Pattern};

/// A character count that saturates.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Count {
    /// An exact number of characters.
    Exact(usize),
    /// A finite number of characters that doesn't fit in a `usize`.
    Huge,
    /// No upper bound.
    Infinite,
}

impl Count {
    /// Returns the exact count, if there's one.
    pub fn exact(self) -> Option<usize> {
        match self {
            Count::Exact(n) => Some(n),
            _ => None,
        }
    }
}

impl Add for Count {
    type Output = Count;

    fn add(self, rhs: Count) -> Count {
        match (self, rhs) {
            (Count::Infinite, _) | (_, Count::Infinite) => Count::Infinite,
            (Count::Exact(a), Count::Exact(b)) => {
                a.checked_add(b).map_or(Count::Huge, Count::Exact)
            }
            _ => Count::Huge,
        }
    }
}

impl Mul for Count {
    type Output = Count;

    fn mul(self, rhs: Count) -> Count {
        match (self, rhs) {
            // Zero times anything, even infinity, is zero.
            (Count::Exact(0), _) | (_, Count::Exact(0)) => Count::Exact(0),
            (Count::Infinite, _) | (_, Count::Infinite) => Count::Infinite,
            (Count::Exact(a), Count::Exact(b)) => {
                a.checked_mul(b).map_or(Count::Huge, Count::Exact)
            }
            _ => Count::Huge,
        }
    }
}

impl Ord for Count {
    fn cmp(&self, other: &Self) -> Ordering {
        fn rank(c: &Count) -> (u8, usize) {
            match c {
                Count::Exact(n) => (0, *n),
                Count::Huge => (1, 0),
                Count::Infinite => (2, 0),
            }
        }
        rank(self).cmp(&rank(other))
    }
}

impl PartialOrd for Count {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Count {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Count::Exact(n) => write!(f, "{}", n),
            Count::Huge => write!(f, "huge"),
            Count::Infinite => write!(f, "inf"),
        }
    }
}

/// Lower and upper bounds for the number of characters a pattern consumes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Limits {
    /// Minimum number of characters.
    pub min: Count,
    /// Maximum number of characters.
    pub max: Count,
}

impl Limits {
    const ZERO: Limits =
        Limits { min: Count::Exact(0), max: Count::Exact(0) };

    const ONE: Limits = Limits { min: Count::Exact(1), max: Count::Exact(1) };

    /// Limits of a pattern that never matches. The minimum is infinite so
    /// that any input is rejected, and the maximum is zero so that the
    /// limits are neutral in alternations.
    const NEVER: Limits =
        Limits { min: Count::Infinite, max: Count::Exact(0) };

    fn exact(n: usize) -> Limits {
        Limits { min: Count::Exact(n), max: Count::Exact(n) }
    }

    /// Returns `true` if no input of `len` characters can match.
    pub fn rejects_len(&self, len: usize) -> bool {
        self.min > Count::Exact(len)
    }

    /// Alternation: the shortest minimum and the longest maximum.
    fn or(self, other: Limits) -> Limits {
        Limits { min: self.min.min(other.min), max: self.max.max(other.max) }
    }
}

impl Add for Limits {
    type Output = Limits;

    fn add(self, rhs: Limits) -> Limits {
        Limits { min: self.min + rhs.min, max: self.max + rhs.max }
    }
}

impl Display for Limits {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{},{}}}", self.min, self.max)
    }
}

/// Computes the length limits of a pattern.
pub(crate) fn limits(pattern: &Pattern) -> Limits {
    Analyzer { pattern, in_progress: FxHashSet::default() }
        .limits(pattern.root())
}

struct Analyzer<'a> {
    pattern: &'a Pattern,
    /// Captures whose body is being analyzed because of a back reference.
    in_progress: FxHashSet<usize>,
}

impl<'a> Analyzer<'a> {
    fn limits(&mut self, id: NodeId) -> Limits {
        match self.pattern.node(id) {
            Node::Empty
            | Node::LookaheadPositive(_)
            | Node::LookaheadNegative(_)
            | Node::SubjectBegin
            | Node::SubjectEnd
            | Node::LineBegin
            | Node::LineEnd
            | Node::Boundary(_)
            | Node::NotBoundary(_) => Limits::ZERO,
            Node::Reject => Limits::NEVER,
            Node::Atom(_) => Limits::ONE,
            Node::String(chars) => Limits::exact(chars.len()),
            Node::Sequence(children) => children
                .iter()
                .fold(Limits::ZERO, |acc, child| acc + self.limits(*child)),
            Node::Select(branches) => branches
                .iter()
                .map(|branch| self.limits(*branch))
                .reduce(Limits::or)
                .unwrap_or(Limits::NEVER),
            Node::Repeat { body, min, max, .. } => {
                let body = self.limits(*body);
                Limits {
                    min: body.min * Count::Exact(*min),
                    max: body.max * max.map_or(Count::Infinite, Count::Exact),
                }
            }
            Node::Capture { body, .. } => self.limits(*body),
            Node::BackReference(capture_id)
            | Node::BackReferenceWithName { id: capture_id, .. } => {
                self.back_reference(*capture_id)
            }
        }
    }

    /// A back reference matches the text of whichever capture with the id
    /// was set last, so it's bounded by all of them.
    fn back_reference(&mut self, capture_id: usize) -> Limits {
        let pattern = self.pattern;
        let bodies = pattern.capture_bodies(capture_id);
        // A back reference inside the capture it refers to can't be bounded
        // by the capture itself.
        if bodies.is_empty() || !self.in_progress.insert(capture_id) {
            return Limits { min: Count::Exact(0), max: Count::Infinite };
        }
        let limits = bodies
            .iter()
            .map(|body| self.limits(*body))
            .reduce(Limits::or)
            .unwrap_or(Limits::NEVER);
        self.in_progress.remove(&capture_id);
        limits
    }
}

/// Returns `true` if every path through the pattern starts by asserting
/// that the current position is the beginning of the input.
pub(crate) fn starts_with_anchor(pattern: &Pattern, multiline: bool) -> bool {
    anchored_at_start(pattern, pattern.root(), multiline) == Anchored::Yes
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Anchored {
    /// Every path starts with the anchor.
    Yes,
    /// Some path starts by consuming input or with another assertion.
    No,
    /// The node can match without consuming input or asserting anything,
    /// whatever follows it decides.
    Transparent,
}

fn anchored_at_start(
    pattern: &Pattern,
    id: NodeId,
    multiline: bool,
) -> Anchored {
    match pattern.node(id) {
        Node::SubjectBegin => Anchored::Yes,
        Node::LineBegin if !multiline => Anchored::Yes,
        // A pattern that never matches is anchored anywhere.
        Node::Reject => Anchored::Yes,
        Node::Empty => Anchored::Transparent,
        Node::Sequence(children) => {
            for child in children {
                match anchored_at_start(pattern, *child, multiline) {
                    Anchored::Transparent => continue,
                    other => return other,
                }
            }
            Anchored::Transparent
        }
        Node::Select(branches) => {
            let mut result = Anchored::Yes;
            for branch in branches {
                match anchored_at_start(pattern, *branch, multiline) {
                    Anchored::Yes => {}
                    other => result = other,
                }
                if result == Anchored::No {
                    break;
                }
            }
            result
        }
        Node::Capture { body, .. } => {
            anchored_at_start(pattern, *body, multiline)
        }
        Node::Repeat { body, min, .. } if *min > 0 => {
            anchored_at_start(pattern, *body, multiline)
        }
        _ => Anchored::No,
    }
}

/// Returns `true` if every path through the pattern ends by asserting that
/// the current position is the end of the input.
pub(crate) fn ends_with_anchor(pattern: &Pattern, multiline: bool) -> bool {
    anchored_at_end(pattern, pattern.root(), multiline) == Anchored::Yes
}

fn anchored_at_end(
    pattern: &Pattern,
    id: NodeId,
    multiline: bool,
) -> Anchored {
    match pattern.node(id) {
        Node::SubjectEnd => Anchored::Yes,
        Node::LineEnd if !multiline => Anchored::Yes,
        Node::Reject => Anchored::Yes,
        // Zero-width assertions that don't move the end.
        Node::Empty
        | Node::Boundary(_)
        | Node::NotBoundary(_)
        | Node::LineBegin
        | Node::SubjectBegin => Anchored::Transparent,
        Node::Sequence(children) => {
            for child in children.iter().rev() {
                match anchored_at_end(pattern, *child, multiline) {
                    Anchored::Transparent => continue,
                    other => return other,
                }
            }
            Anchored::Transparent
        }
        Node::Select(branches) => {
            let mut result = Anchored::Yes;
            for branch in branches {
                match anchored_at_end(pattern, *branch, multiline) {
                    Anchored::Yes => {}
                    other => result = other,
                }
                if result == Anchored::No {
                    break;
                }
            }
            result
        }
        Node::Capture { body, .. } => {
            anchored_at_end(pattern, *body, multiline)
        }
        Node::Repeat { body, min, .. } => {
            match anchored_at_end(pattern, *body, multiline) {
                // With zero iterations whatever precedes the repetition
                // decides.
                Anchored::Yes if *min == 0 => Anchored::Transparent,
                other => other,
            }
        }
        _ => Anchored::No,
    }
}
