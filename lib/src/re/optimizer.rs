/*! Rewrites that make patterns cheaper to evaluate without changing what
they match.

The optimizer produces a new [`Pattern`] where:

* Nested sequences are flattened and empty nodes inside sequences dropped.
* Adjacent literal characters and strings are joined into a single string.
* Adjacent greedy repetitions of the same atom are merged (`a+a*` becomes
  `a{1,}`).
* Alternations where every branch is a single atom become a set.
* A character shared by the start of every branch of an alternation is
  moved in front of it (`cat|car` becomes `ca(t|r)`).
* Alternations with a single branch are replaced by the branch, and empty
  alternations by [`Node::Reject`].

All of these preserve the ordered-choice semantics of alternations and the
capture positions, since none of them crosses a capture boundary.
*/

use rustc_hash::FxHashMap;

use crate::re::atoms::Atom;
use crate::re::pattern::{Node, NodeId, Pattern, PatternBuilder, RepeatMode};
use crate::re::Error;

/// Returns an optimized copy of `pattern`.
pub(crate) fn optimize(pattern: &Pattern) -> Result<Pattern, Error> {
    let mut optimizer = Optimizer {
        pattern,
        builder: PatternBuilder::new(),
        memo: FxHashMap::default(),
    };
    let root = optimizer.rewrite(pattern.root());
    optimizer.builder.build(root)
}

struct Optimizer<'a> {
    pattern: &'a Pattern,
    builder: PatternBuilder,
    /// Maps nodes in the original pattern to their rewritten counterparts,
    /// so that shared subtrees remain shared.
    memo: FxHashMap<NodeId, NodeId>,
}

impl<'a> Optimizer<'a> {
    fn rewrite(&mut self, id: NodeId) -> NodeId {
        if let Some(new_id) = self.memo.get(&id) {
            return *new_id;
        }

        let new_id = match self.pattern.node(id) {
            Node::Sequence(children) => {
                let children = children
                    .iter()
                    .map(|child| self.rewrite(*child))
                    .collect::<Vec<_>>();
                self.make_sequence(children)
            }
            Node::Select(branches) => {
                let branches = branches
                    .iter()
                    .map(|branch| self.rewrite(*branch))
                    .collect::<Vec<_>>();
                self.make_select(branches)
            }
            Node::Repeat { body, min, max, mode } => {
                let (min, max, mode) = (*min, *max, *mode);
                let body = self.rewrite(*body);
                self.builder.push(Node::Repeat { body, min, max, mode })
            }
            Node::Capture { id, name, body } => {
                let (id, name) = (*id, name.clone());
                let body = self.rewrite(*body);
                self.builder.push(Node::Capture { id, name, body })
            }
            Node::LookaheadPositive(body) => {
                let body = self.rewrite(*body);
                self.builder.push(Node::LookaheadPositive(body))
            }
            Node::LookaheadNegative(body) => {
                let body = self.rewrite(*body);
                self.builder.push(Node::LookaheadNegative(body))
            }
            leaf => self.builder.push(leaf.clone()),
        };

        self.memo.insert(id, new_id);
        new_id
    }

    fn make_sequence(&mut self, children: Vec<NodeId>) -> NodeId {
        let mut items: Vec<NodeId> = Vec::with_capacity(children.len());

        for child in children {
            match self.builder.get(child) {
                Node::Empty => continue,
                Node::Sequence(inner) => {
                    for inner_child in inner.clone() {
                        self.push_merging(&mut items, inner_child);
                    }
                }
                _ => self.push_merging(&mut items, child),
            }
        }

        match items.len() {
            0 => self.builder.empty(),
            1 => items[0],
            _ => self.builder.push(Node::Sequence(items)),
        }
    }

    /// Appends `id` to a sequence, merging it with the last item when
    /// possible.
    fn push_merging(&mut self, items: &mut Vec<NodeId>, id: NodeId) {
        let merged = match items.last() {
            Some(last) => self.merge(*last, id),
            None => None,
        };
        match merged {
            Some(merged) => {
                if let Some(last) = items.last_mut() {
                    *last = merged;
                }
            }
            None => items.push(id),
        }
    }

    fn merge(&mut self, a: NodeId, b: NodeId) -> Option<NodeId> {
        if let (Some(mut a), Some(b)) = (self.literal(a), self.literal(b)) {
            a.extend(b);
            return Some(self.builder.push(Node::String(a)));
        }

        if let (
            Node::Repeat {
                body: body_a,
                min: min_a,
                max: max_a,
                mode: RepeatMode::Greedy,
            },
            Node::Repeat {
                body: body_b,
                min: min_b,
                max: max_b,
                mode: RepeatMode::Greedy,
            },
        ) = (self.builder.get(a), self.builder.get(b))
        {
            let atom_a = self.builder.get(*body_a);
            let atom_b = self.builder.get(*body_b);

            if !matches!(atom_a, Node::Atom(_)) || atom_a != atom_b {
                return None;
            }

            let min = min_a.checked_add(*min_b)?;
            let max = match (max_a, max_b) {
                (Some(a), Some(b)) => Some(a.checked_add(*b)?),
                _ => None,
            };
            let body = *body_a;

            return Some(self.builder.push(Node::Repeat {
                body,
                min,
                max,
                mode: RepeatMode::Greedy,
            }));
        }

        None
    }

    /// Characters matched by a node that matches exactly one string.
    fn literal(&self, id: NodeId) -> Option<Vec<u32>> {
        match self.builder.get(id) {
            Node::String(chars) => Some(chars.clone()),
            Node::Atom(Atom::Char(c)) => Some(vec![*c]),
            _ => None,
        }
    }

    fn make_select(&mut self, branches: Vec<NodeId>) -> NodeId {
        match branches.len() {
            0 => return self.builder.reject(),
            1 => return branches[0],
            _ => {}
        }

        let atoms = branches
            .iter()
            .map(|branch| match self.builder.get(*branch) {
                Node::Atom(atom) => Some(atom.clone()),
                Node::String(chars) if chars.len() == 1 => {
                    Some(Atom::Char(chars[0]))
                }
                _ => None,
            })
            .collect::<Option<Vec<_>>>();

        if let Some(atoms) = atoms {
            return self.builder.atom(Atom::Set(atoms));
        }

        let mut common = None;
        let mut rests = Vec::with_capacity(branches.len());

        for branch in branches.iter() {
            match self.split_first_char(*branch) {
                Some((c, rest)) if common.is_none() || common == Some(c) => {
                    common = Some(c);
                    rests.push(rest);
                }
                _ => {
                    common = None;
                    break;
                }
            }
        }

        match common {
            Some(c) => {
                let first = self.builder.atom(Atom::Char(c));
                let rest = self.make_select(rests);
                self.make_sequence(vec![first, rest])
            }
            None => self.builder.push(Node::Select(branches)),
        }
    }

    /// Splits a node that must start with a specific character into that
    /// character and the node that matches the rest.
    fn split_first_char(&mut self, id: NodeId) -> Option<(u32, NodeId)> {
        match self.builder.get(id) {
            Node::Atom(Atom::Char(c)) => {
                let c = *c;
                Some((c, self.builder.empty()))
            }
            Node::String(chars) if !chars.is_empty() => {
                let c = chars[0];
                let rest = chars[1..].to_vec();
                let rest = match rest.len() {
                    0 => self.builder.empty(),
                    1 => self.builder.atom(Atom::Char(rest[0])),
                    _ => self.builder.push(Node::String(rest)),
                };
                Some((c, rest))
            }
            Node::Sequence(items) if !items.is_empty() => {
                let mut items = items.clone();
                let (c, first_rest) = self.split_first_char(items[0])?;
                items[0] = first_rest;
                Some((c, self.make_sequence(items)))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::re::atoms::{is_digit, Class};
    use crate::re::pattern::PatternBuilder;

    fn chars(s: &str) -> Vec<u32> {
        s.chars().map(|c| c as u32).collect()
    }

    #[test]
    fn flatten_and_join_literals() {
        // (a(bc)d)
        let mut b = PatternBuilder::new();
        let a = b.char('a');
        let bc = b.string("bc");
        let e = b.empty();
        let d = b.char('d');
        let inner = b.sequence([bc, e]);
        let root = b.sequence([a, inner, d]);
        let pattern = optimize(&b.build(root).unwrap()).unwrap();

        assert_eq!(
            pattern.node(pattern.root()),
            &Node::String(chars("abcd"))
        );
    }

    #[test]
    fn select_of_atoms_becomes_set() {
        let mut b = PatternBuilder::new();
        let a = b.char('a');
        let d = b.range('0', '9');
        let root = b.select([a, d]);
        let pattern = optimize(&b.build(root).unwrap()).unwrap();

        assert_eq!(
            pattern.node(pattern.root()),
            &Node::Atom(Atom::Set(vec![
                Atom::char('a'),
                Atom::range('0', '9')
            ]))
        );
    }

    #[test]
    fn common_prefix() {
        // cat|car  ->  ca[tr]
        let mut b = PatternBuilder::new();
        let cat = b.string("cat");
        let car = b.string("car");
        let root = b.select([cat, car]);
        let pattern = optimize(&b.build(root).unwrap()).unwrap();

        let Node::Sequence(items) = pattern.node(pattern.root()) else {
            panic!("expecting a sequence")
        };

        assert_eq!(items.len(), 2);
        assert_eq!(pattern.node(items[0]), &Node::String(chars("ca")));
        assert_eq!(
            pattern.node(items[1]),
            &Node::Atom(Atom::Set(vec![Atom::char('t'), Atom::char('r')]))
        );
    }

    #[test]
    fn captures_are_not_crossed() {
        // (a)b|(a)c
        let mut b = PatternBuilder::new();
        let a = b.char('a');
        let cap1 = b.capture(1, a);
        let bb = b.char('b');
        let br1 = b.sequence([cap1, bb]);
        let cap2 = b.capture(2, a);
        let c = b.char('c');
        let br2 = b.sequence([cap2, c]);
        let root = b.select([br1, br2]);
        let pattern = optimize(&b.build(root).unwrap()).unwrap();

        assert!(matches!(pattern.node(pattern.root()), Node::Select(_)));
        assert_eq!(pattern.capture_count(), 2);
    }

    #[test]
    fn merge_repetitions() {
        // a+a*
        let mut b = PatternBuilder::new();
        let a = b.char('a');
        let plus = b.plus(a);
        let star = b.star(a);
        let root = b.sequence([plus, star]);
        let pattern = optimize(&b.build(root).unwrap()).unwrap();

        assert!(matches!(
            pattern.node(pattern.root()),
            Node::Repeat { min: 1, max: None, mode: RepeatMode::Greedy, .. }
        ));

        // a{1,2}b{1,2} is left alone.
        let mut b = PatternBuilder::new();
        let a = b.char('a');
        let bb = b.char('b');
        let ra = b.repeat(a, 1, 2);
        let rb = b.repeat(bb, 1, 2);
        let root = b.sequence([ra, rb]);
        let pattern = optimize(&b.build(root).unwrap()).unwrap();

        assert!(matches!(pattern.node(pattern.root()), Node::Sequence(_)));
    }

    #[test]
    fn classes_sharing_a_name_are_not_merged() {
        fn vowel(c: u32) -> bool {
            "aeiou".chars().any(|v| v as u32 == c)
        }

        // [:x:]+[:x:]* where each class has its own predicate
        let mut b = PatternBuilder::new();
        let vowels = b.class(Class::new("x", vowel));
        let digits = b.class(Class::new("x", is_digit));
        let plus = b.plus(vowels);
        let star = b.star(digits);
        let root = b.sequence([plus, star]);
        let pattern = optimize(&b.build(root).unwrap()).unwrap();

        assert!(matches!(pattern.node(pattern.root()), Node::Sequence(_)));

        // Same name and predicate are still merged.
        let mut b = PatternBuilder::new();
        let d1 = b.class(Class::new("x", is_digit));
        let d2 = b.class(Class::new("x", is_digit));
        let plus = b.plus(d1);
        let star = b.star(d2);
        let root = b.sequence([plus, star]);
        let pattern = optimize(&b.build(root).unwrap()).unwrap();

        assert!(matches!(
            pattern.node(pattern.root()),
            Node::Repeat { min: 1, max: None, .. }
        ));
    }

    #[test]
    fn degenerate_selects() {
        let mut b = PatternBuilder::new();
        let root = b.select([]);
        let pattern = optimize(&b.build(root).unwrap()).unwrap();
        assert_eq!(pattern.node(pattern.root()), &Node::Reject);

        let mut b = PatternBuilder::new();
        let x = b.string("xy");
        let root = b.select([x]);
        let pattern = optimize(&b.build(root).unwrap()).unwrap();
        assert_eq!(pattern.node(pattern.root()), &Node::String(chars("xy")));
    }
}
