/*! FIRST-set analysis.

The FIRST set of a pattern fragment is the set of characters that can be
consumed first when the fragment matches. It is used for two things:

* Deciding whether a greedy repetition can be turned into a possessive one.
  If no character that can start an iteration of the body can also start
  whatever follows the repetition, then giving back iterations can't help
  the rest of the pattern to match, and the engine doesn't need to try.

* Skipping alternation branches that can't start with the character at the
  current position, without altering the order in which the remaining
  branches are tried.

The analysis is conservative. Whenever the first character can't be bounded
statically (lookarounds, back references, opaque classes, assertions that
depend on the previous character) the set is marked as "anything", which
collides with every non-empty set and never allows skipping a branch.
*/

use rustc_hash::FxHashMap;

use crate::re::atoms::normalize;
use crate::re::pattern::{Node, NodeId, Pattern, RepeatMode};

/// Characters that can start a match of a pattern fragment.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct FirstSet {
    /// Sorted, non-overlapping inclusive ranges.
    ranges: Vec<(u32, u32)>,
    /// The first character can't be bounded.
    anything: bool,
    /// The fragment can match without consuming anything.
    nullable: bool,
    /// The fragment can match without consuming anything, but only at the
    /// end of the input.
    at_end: bool,
}

impl FirstSet {
    /// Returns `true` if no character can be consumed first.
    pub fn is_empty(&self) -> bool {
        !self.anything && self.ranges.is_empty()
    }

    /// Returns `true` if the fragment can match without consuming input.
    #[cfg(test)]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Returns `true` if `c` can be the first character consumed.
    pub fn contains(&self, c: u32) -> bool {
        if self.anything {
            return true;
        }
        self.ranges
            .binary_search_by(|(lo, hi)| {
                if *hi < c {
                    std::cmp::Ordering::Less
                } else if *lo > c {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Returns `false` only when the fragment certainly can't match at a
    /// position where the next character is `next` (`None` at the end of
    /// the input).
    pub fn may_match_at(&self, next: Option<u32>) -> bool {
        if self.anything || self.nullable {
            return true;
        }
        match next {
            Some(c) => self.contains(c),
            None => self.at_end,
        }
    }

    fn add_ranges(&mut self, ranges: Vec<(u32, u32)>) {
        if !ranges.is_empty() {
            self.ranges.extend(ranges);
            self.ranges = normalize(std::mem::take(&mut self.ranges));
        }
    }
}

/// Returns `true` if some character can start both `a` and `b`.
///
/// Sets marked as "anything" collide with every non-empty set.
pub(crate) fn collides(a: &FirstSet, b: &FirstSet) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a.anything || b.anything {
        return true;
    }
    let (mut i, mut j) = (0, 0);
    while i < a.ranges.len() && j < b.ranges.len() {
        let (a_lo, a_hi) = a.ranges[i];
        let (b_lo, b_hi) = b.ranges[j];
        if a_lo <= b_hi && b_lo <= a_hi {
            return true;
        }
        if a_hi < b_hi {
            i += 1;
        } else {
            j += 1;
        }
    }
    false
}

/// What follows a node in the static structure of the pattern. Iterations
/// of a repetition and lookaround bodies are evaluated on their own, so
/// their continuation ends at the end of the body.
enum Follow<'a> {
    End,
    Then(&'a [NodeId], &'a Follow<'a>),
}

struct Walker<'p> {
    pattern: &'p Pattern,
    multiline: bool,
}

impl<'p> Walker<'p> {
    /// Adds the FIRST set of node `id` to `set`. Returns `true` if the node
    /// can match without consuming input, in which case whatever follows
    /// the node contributes to the set too.
    fn first(&self, id: NodeId, set: &mut FirstSet) -> bool {
        match self.pattern.node(id) {
            Node::Empty => true,
            Node::Reject => false,
            Node::Atom(atom) => {
                match atom.ranges(self.multiline) {
                    Some(ranges) => set.add_ranges(ranges),
                    None => set.anything = true,
                }
                false
            }
            Node::String(chars) => match chars.first() {
                Some(c) => {
                    set.add_ranges(vec![(*c, *c)]);
                    false
                }
                None => true,
            },
            Node::Sequence(children) => {
                children.iter().all(|child| self.first(*child, set))
            }
            Node::Select(branches) => {
                let mut nullable = false;
                for branch in branches {
                    nullable |= self.first(*branch, set);
                }
                nullable
            }
            Node::Repeat { body, min, .. } => {
                let body_nullable = self.first(*body, set);
                *min == 0 || body_nullable
            }
            Node::Capture { body, .. } => self.first(*body, set),
            Node::SubjectEnd => {
                set.at_end = true;
                false
            }
            Node::LineEnd if !self.multiline => {
                set.at_end = true;
                false
            }
            Node::LineEnd
            | Node::LineBegin
            | Node::SubjectBegin
            | Node::Boundary(_)
            | Node::NotBoundary(_)
            | Node::LookaheadPositive(_)
            | Node::LookaheadNegative(_)
            | Node::BackReference(_)
            | Node::BackReferenceWithName { .. } => {
                set.anything = true;
                false
            }
        }
    }

    /// FIRST set of a single node.
    fn first_of(&self, id: NodeId) -> FirstSet {
        let mut set = FirstSet::default();
        set.nullable = self.first(id, &mut set);
        set
    }

    /// FIRST set of a continuation.
    fn first_of_follow(&self, mut follow: &Follow) -> FirstSet {
        let mut set = FirstSet::default();
        loop {
            match follow {
                Follow::End => {
                    set.nullable = true;
                    return set;
                }
                Follow::Then(nodes, next) => {
                    for node in nodes.iter() {
                        if !self.first(*node, &mut set) {
                            return set;
                        }
                    }
                    follow = next;
                }
            }
        }
    }

    /// Visits every repetition reachable from `id`, recording in
    /// `possessive` whether each greedy repetition can be made possessive
    /// given what follows it.
    fn visit(
        &self,
        id: NodeId,
        follow: &Follow,
        possessive: &mut FxHashMap<NodeId, bool>,
    ) {
        match self.pattern.node(id) {
            Node::Sequence(children) => {
                for (i, child) in children.iter().enumerate() {
                    self.visit(
                        *child,
                        &Follow::Then(&children[i + 1..], follow),
                        possessive,
                    );
                }
            }
            Node::Select(branches) => {
                for branch in branches {
                    self.visit(*branch, follow, possessive);
                }
            }
            Node::Capture { body, .. } => {
                self.visit(*body, follow, possessive)
            }
            Node::LookaheadPositive(body) | Node::LookaheadNegative(body) => {
                self.visit(*body, &Follow::End, possessive)
            }
            Node::Repeat { body, mode, .. } => {
                if *mode == RepeatMode::Greedy {
                    let no_collision = !collides(
                        &self.first_of(*body),
                        &self.first_of_follow(follow),
                    );
                    // Shared repetitions are converted only if all their
                    // occurrences allow it.
                    possessive
                        .entry(id)
                        .and_modify(|ok| *ok &= no_collision)
                        .or_insert(no_collision);
                }
                self.visit(*body, &Follow::End, possessive);
            }
            _ => {}
        }
    }
}

/// FIRST set of the node `id`.
#[cfg(test)]
pub(crate) fn first_of(
    pattern: &Pattern,
    id: NodeId,
    multiline: bool,
) -> FirstSet {
    Walker { pattern, multiline }.first_of(id)
}

/// Turns into possessive every greedy repetition whose body can't start
/// with a character that can also start the rest of the pattern. Returns
/// the number of repetitions converted.
pub(crate) fn convert_to_possessive(
    pattern: &mut Pattern,
    multiline: bool,
) -> usize {
    let mut possessive = FxHashMap::default();

    Walker { pattern: &*pattern, multiline }.visit(
        pattern.root(),
        &Follow::End,
        &mut possessive,
    );

    let mut converted = 0;

    for (id, ok) in possessive {
        if let (true, Node::Repeat { mode, .. }) = (ok, pattern.node_mut(id))
        {
            *mode = RepeatMode::Possessive;
            converted += 1;
        }
    }

    converted
}

/// Computes the FIRST set of every branch for the alternations where at
/// least one branch could be skipped.
pub(crate) fn select_first_sets(
    pattern: &Pattern,
    multiline: bool,
) -> FxHashMap<NodeId, Box<[FirstSet]>> {
    let walker = Walker { pattern, multiline };
    let mut result = FxHashMap::default();

    for id in pattern.reachable() {
        if let Node::Select(branches) = pattern.node(id) {
            if branches.len() < 2 {
                continue;
            }
            let sets: Box<[FirstSet]> =
                branches.iter().map(|b| walker.first_of(*b)).collect();
            if sets.iter().any(|s| !s.anything && !s.nullable) {
                result.insert(id, sets);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::re::atoms::{Atom, DIGIT};
    use crate::re::pattern::PatternBuilder;

    fn set(ranges: &[(char, char)]) -> FirstSet {
        FirstSet {
            ranges: ranges
                .iter()
                .map(|(a, b)| (*a as u32, *b as u32))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn first_sets() {
        // (a|b?)c*d
        let mut b = PatternBuilder::new();
        let a = b.char('a');
        let bb = b.char('b');
        let opt = b.optional(bb);
        let sel = b.select([a, opt]);
        let c = b.char('c');
        let star = b.star(c);
        let d = b.char('d');
        let root = b.sequence([sel, star, d]);
        let pattern = b.build(root).unwrap();

        let first = first_of(&pattern, root, false);
        assert_eq!(first.ranges, vec![('a' as u32, 'd' as u32)]);
        assert!(!first.is_nullable());

        let first = first_of(&pattern, sel, false);
        assert_eq!(first.ranges, vec![('a' as u32, 'b' as u32)]);
        assert!(first.is_nullable());
    }

    #[test]
    fn conservative_nodes() {
        let mut b = PatternBuilder::new();
        let x = b.char('x');
        let la = b.lookahead_positive(x);
        let class = b.class(DIGIT);
        let bnd = b.boundary();
        let root = b.select([la, class, bnd]);
        let pattern = b.build(root).unwrap();

        for id in [la, class, bnd] {
            assert!(first_of(&pattern, id, false).anything);
        }
    }

    #[test]
    fn collisions() {
        assert!(collides(&set(&[('a', 'f')]), &set(&[('f', 'z')])));
        assert!(!collides(&set(&[('a', 'e')]), &set(&[('f', 'z')])));
        assert!(collides(
            &set(&[('a', 'a'), ('m', 'm')]),
            &set(&[('b', 'c'), ('k', 'n')])
        ));

        let anything = FirstSet { anything: true, ..Default::default() };
        assert!(collides(&anything, &set(&[('a', 'a')])));
        assert!(!collides(&anything, &FirstSet::default()));
    }

    #[test]
    fn negated_sets() {
        let mut b = PatternBuilder::new();
        let not_a = b.negated_set(vec![Atom::char('a')]);
        let pattern = b.build(not_a).unwrap();
        let first = first_of(&pattern, not_a, false);
        assert!(!first.contains('a' as u32));
        assert!(first.contains('b' as u32));
        assert!(first.contains(0));
    }

    #[test]
    fn possessive_conversion() {
        // a*b  ->  a*+b
        let mut b = PatternBuilder::new();
        let a = b.char('a');
        let star = b.star(a);
        let bb = b.char('b');
        let root = b.sequence([star, bb]);
        let mut pattern = b.build(root).unwrap();
        assert_eq!(convert_to_possessive(&mut pattern, false), 1);
        assert!(matches!(
            pattern.node(star),
            Node::Repeat { mode: RepeatMode::Possessive, .. }
        ));

        // a*ab stays greedy
        let mut b = PatternBuilder::new();
        let a = b.char('a');
        let star = b.star(a);
        let ab = b.string("ab");
        let root = b.sequence([star, ab]);
        let mut pattern = b.build(root).unwrap();
        assert_eq!(convert_to_possessive(&mut pattern, false), 0);

        // (a*)a : the repetition is followed by the end of the capture and
        // then by `a`.
        let mut b = PatternBuilder::new();
        let a = b.char('a');
        let star = b.star(a);
        let cap = b.capture(1, star);
        let root = b.sequence([cap, a]);
        let mut pattern = b.build(root).unwrap();
        assert_eq!(convert_to_possessive(&mut pattern, false), 0);

        // [a-c]+ at the end of the pattern.
        let mut b = PatternBuilder::new();
        let abc = b.range('a', 'c');
        let root = b.plus(abc);
        let mut pattern = b.build(root).unwrap();
        assert_eq!(convert_to_possessive(&mut pattern, false), 1);

        // a*^ must keep backtracking.
        let mut b = PatternBuilder::new();
        let a = b.char('a');
        let star = b.star(a);
        let sb = b.subject_begin();
        let root = b.sequence([star, sb]);
        let mut pattern = b.build(root).unwrap();
        assert_eq!(convert_to_possessive(&mut pattern, false), 0);
    }

    #[test]
    fn inner_repetitions_end_with_the_iteration() {
        // (b*c)*b : the inner b* is followed by `c`, not by the outer tail.
        let mut b = PatternBuilder::new();
        let bb = b.char('b');
        let inner = b.star(bb);
        let c = b.char('c');
        let body = b.sequence([inner, c]);
        let outer = b.star(body);
        let root = b.sequence([outer, bb]);
        let mut pattern = b.build(root).unwrap();

        assert_eq!(convert_to_possessive(&mut pattern, false), 1);
        assert!(matches!(
            pattern.node(inner),
            Node::Repeat { mode: RepeatMode::Possessive, .. }
        ));
        assert!(matches!(
            pattern.node(outer),
            Node::Repeat { mode: RepeatMode::Greedy, .. }
        ));
    }

    #[test]
    fn branch_culling() {
        // cat|dog|\z|x?
        let mut b = PatternBuilder::new();
        let cat = b.string("cat");
        let dog = b.string("dog");
        let end = b.subject_end();
        let x = b.char('x');
        let opt = b.optional(x);
        let root = b.select([cat, dog, end, opt]);
        let pattern = b.build(root).unwrap();

        let sets = select_first_sets(&pattern, false);
        let sets = sets.get(&root).unwrap();

        assert!(sets[0].may_match_at(Some('c' as u32)));
        assert!(!sets[0].may_match_at(Some('d' as u32)));
        assert!(!sets[0].may_match_at(None));
        assert!(sets[1].may_match_at(Some('d' as u32)));
        assert!(sets[2].may_match_at(None));
        assert!(!sets[2].may_match_at(Some('c' as u32)));
        assert!(sets[3].may_match_at(Some('z' as u32)));
    }
}
