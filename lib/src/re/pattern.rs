/*! Pattern trees.

A [`Pattern`] is an immutable tree of [`Node`]s stored in an arena and
addressed by [`NodeId`]. Patterns are assembled bottom-up with a
[`PatternBuilder`]: every builder method creates a node and returns its id,
which is then passed as a child to the methods that build the parent
nodes. Because children must exist before their parents, the tree can't
contain cycles. The same id can be used as a child more than once, in
which case the subtree is shared.

```
# use retrack::{Atom, PatternBuilder};
let mut b = PatternBuilder::new();
let a = b.char('a');
let cap = b.capture(1, a);
let tail = b.char('b');
let root = b.sequence([cap, tail]);
let pattern = b.build(root).unwrap();

assert_eq!(pattern.capture_count(), 1);
```
*/

use std::fmt::{Debug, Formatter};

use ascii_tree::Tree;
use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::re::atoms::{Atom, Class, WORD};
use crate::re::Error;

/// Identifies a node within a [`Pattern`] or [`PatternBuilder`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// How a repetition explores the number of iterations.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RepeatMode {
    /// Prefers more iterations, gives them back one by one if the rest of
    /// the pattern fails.
    Greedy,
    /// Prefers fewer iterations, takes one more each time the rest of the
    /// pattern fails.
    Lazy,
    /// Takes as many iterations as possible and never gives them back.
    Possessive,
}

/// A node in a pattern tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// Matches the empty string.
    Empty,
    /// Never matches. An alternation without branches is equivalent.
    Reject,
    /// Consumes one character accepted by the atom.
    Atom(Atom),
    /// Consumes exactly the given sequence of characters.
    String(Vec<u32>),
    /// Matches its children one after another.
    Sequence(Vec<NodeId>),
    /// Ordered choice, the first branch that leads to a match wins.
    Select(Vec<NodeId>),
    /// Repeats the body between `min` and `max` times. A `max` of `None`
    /// means that there's no upper bound.
    Repeat {
        /// Repeated pattern.
        body: NodeId,
        /// Minimum number of iterations.
        min: usize,
        /// Maximum number of iterations, `None` means unbounded.
        max: Option<usize>,
        /// Exploration strategy.
        mode: RepeatMode,
    },
    /// Records the text matched by the body under the capture `id`.
    Capture {
        /// Capture identifier, starting at 1.
        id: usize,
        /// Optional capture name.
        name: Option<String>,
        /// Captured pattern.
        body: NodeId,
    },
    /// Succeeds if the body matches at the current position, without
    /// consuming input.
    LookaheadPositive(NodeId),
    /// Succeeds if the body doesn't match at the current position.
    LookaheadNegative(NodeId),
    /// Matches the text previously captured by the capture `id`.
    BackReference(usize),
    /// Matches the text previously captured by the named capture.
    BackReferenceWithName {
        /// Capture name.
        name: String,
        /// Identifier the name resolves to. Assigned by
        /// [`PatternBuilder::build`].
        id: usize,
    },
    /// Matches at the beginning of the input.
    SubjectBegin,
    /// Matches at the end of the input.
    SubjectEnd,
    /// Matches at the beginning of the input or, in multiline mode, right
    /// after a `\n`.
    LineBegin,
    /// Matches at the end of the input or, in multiline mode, right before
    /// a `\n`.
    LineEnd,
    /// Matches where the atom's result differs between the character
    /// before and the character after the current position.
    Boundary(Atom),
    /// Matches where the atom's result is the same for the character
    /// before and the character after the current position.
    NotBoundary(Atom),
}

impl Node {
    /// Returns `true` for the nodes that inspect the character that precedes
    /// the current position, when multiline mode is `multiline`.
    pub(crate) fn looks_behind(&self, multiline: bool) -> bool {
        match self {
            Node::LineBegin => multiline,
            Node::Boundary(_) | Node::NotBoundary(_) => true,
            _ => false,
        }
    }
}

/// An immutable pattern tree.
#[derive(Clone)]
pub struct Pattern {
    nodes: Vec<Node>,
    root: NodeId,
    capture_count: usize,
    capture_bodies: FxHashMap<usize, Vec<NodeId>>,
    capture_names: FxHashMap<String, usize>,
}

impl Pattern {
    /// Root of the tree.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the node with the given id.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Number of capture slots, which is the largest capture id in the
    /// pattern.
    pub fn capture_count(&self) -> usize {
        self.capture_count
    }

    /// Returns the id of a named capture.
    pub fn capture_id(&self, name: &str) -> Option<usize> {
        self.capture_names.get(name).copied()
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Bodies of every capture with the given id, in the order they are
    /// reached from the root. Empty if there's no such capture.
    pub(crate) fn capture_bodies(&self, id: usize) -> &[NodeId] {
        self.capture_bodies.get(&id).map_or(&[], |bodies| bodies.as_slice())
    }

    /// Number of nodes in the arena, including the ones not reachable from
    /// the root.
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if any node reachable from the root looks behind the
    /// current position.
    pub(crate) fn looks_behind(&self, multiline: bool) -> bool {
        self.reachable().any(|id| self.node(id).looks_behind(multiline))
    }

    /// Iterator over the ids of the nodes reachable from the root, each of
    /// them visited once, parents before children.
    pub(crate) fn reachable(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![self.root];
        std::iter::from_fn(move || loop {
            let id = stack.pop()?;
            if std::mem::replace(&mut visited[id.index()], true) {
                continue;
            }
            stack.extend(self.children(id).rev());
            return Some(id);
        })
    }

    /// Children of a node, in order.
    pub(crate) fn children(
        &self,
        id: NodeId,
    ) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        let children: &[NodeId] = match self.node(id) {
            Node::Sequence(children) | Node::Select(children) => children,
            Node::Repeat { body, .. }
            | Node::Capture { body, .. }
            | Node::LookaheadPositive(body)
            | Node::LookaheadNegative(body) => std::slice::from_ref(body),
            _ => &[],
        };
        children.iter().copied()
    }

    /// Returns a representation of the pattern as an ASCII tree.
    pub fn ascii_tree(&self) -> Tree {
        self.node_ascii_tree(self.root)
    }

    fn node_ascii_tree(&self, id: NodeId) -> Tree {
        let children =
            || self.children(id).map(|c| self.node_ascii_tree(c)).collect();

        match self.node(id) {
            Node::Empty => Tree::Leaf(vec!["empty".to_string()]),
            Node::Reject => Tree::Leaf(vec!["reject".to_string()]),
            Node::Atom(atom) => Tree::Leaf(vec![format!("atom {}", atom)]),
            Node::String(chars) => Tree::Leaf(vec![format!(
                "string {:?}",
                chars
                    .iter()
                    .map(|c| char::from_u32(*c).unwrap_or('\u{fffd}'))
                    .collect::<String>()
            )]),
            Node::Sequence(_) => {
                Tree::Node("sequence".to_string(), children())
            }
            Node::Select(_) => Tree::Node("select".to_string(), children()),
            Node::Repeat { min, max, mode, .. } => Tree::Node(
                format!(
                    "repeat {{{},{}}} {:?}",
                    min,
                    max.map(|m| m.to_string()).unwrap_or_default(),
                    mode
                ),
                children(),
            ),
            Node::Capture { id, name: Some(name), .. } => {
                Tree::Node(format!("capture {} <{}>", id, name), children())
            }
            Node::Capture { id, name: None, .. } => {
                Tree::Node(format!("capture {}", id), children())
            }
            Node::LookaheadPositive(_) => {
                Tree::Node("lookahead".to_string(), children())
            }
            Node::LookaheadNegative(_) => {
                Tree::Node("negative lookahead".to_string(), children())
            }
            Node::BackReference(id) => {
                Tree::Leaf(vec![format!("backref {}", id)])
            }
            Node::BackReferenceWithName { name, id } => {
                Tree::Leaf(vec![format!("backref {} <{}>", id, name)])
            }
            Node::SubjectBegin => {
                Tree::Leaf(vec!["subject begin".to_string()])
            }
            Node::SubjectEnd => Tree::Leaf(vec!["subject end".to_string()]),
            Node::LineBegin => Tree::Leaf(vec!["line begin".to_string()]),
            Node::LineEnd => Tree::Leaf(vec!["line end".to_string()]),
            Node::Boundary(atom) => {
                Tree::Leaf(vec![format!("boundary {}", atom)])
            }
            Node::NotBoundary(atom) => {
                Tree::Leaf(vec![format!("not boundary {}", atom)])
            }
        }
    }
}

impl Debug for Pattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        ascii_tree::write_tree(f, &self.ascii_tree())
    }
}

/// Builds [`Pattern`]s node by node.
#[derive(Default)]
pub struct PatternBuilder {
    nodes: Vec<Node>,
}

impl PatternBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a node previously added to the builder.
    pub(crate) fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Adds an arbitrary node and returns its id.
    pub fn push(&mut self, node: Node) -> NodeId {
        // Ids that don't fit in 32 bits are caught by `build`.
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Matches the empty string.
    pub fn empty(&mut self) -> NodeId {
        self.push(Node::Empty)
    }

    /// Never matches.
    pub fn reject(&mut self) -> NodeId {
        self.push(Node::Reject)
    }

    /// Single-character atom.
    pub fn atom(&mut self, atom: Atom) -> NodeId {
        self.push(Node::Atom(atom))
    }

    /// Exactly one character.
    pub fn char(&mut self, c: char) -> NodeId {
        self.atom(Atom::char(c))
    }

    /// Any character in the inclusive range.
    pub fn range(&mut self, lo: char, hi: char) -> NodeId {
        self.atom(Atom::range(lo, hi))
    }

    /// Any of the characters in `chars`.
    pub fn enumeration(&mut self, chars: &str) -> NodeId {
        self.atom(Atom::enumeration(chars))
    }

    /// Union of the member atoms.
    pub fn set(&mut self, members: Vec<Atom>) -> NodeId {
        self.atom(Atom::Set(members))
    }

    /// Complement of the union of the member atoms.
    pub fn negated_set(&mut self, members: Vec<Atom>) -> NodeId {
        self.atom(Atom::NegatedSet(members))
    }

    /// Characters accepted by a classification predicate.
    pub fn class(&mut self, class: Class) -> NodeId {
        self.atom(Atom::Class(class))
    }

    /// Any character.
    pub fn any(&mut self) -> NodeId {
        self.atom(Atom::Any)
    }

    /// Literal string.
    pub fn string(&mut self, s: &str) -> NodeId {
        self.push(Node::String(s.chars().map(|c| c as u32).collect()))
    }

    /// Literal string given as bytes, each byte is a character.
    pub fn bytes(&mut self, s: &[u8]) -> NodeId {
        self.push(Node::String(s.iter().map(|b| *b as u32).collect()))
    }

    /// Concatenation.
    pub fn sequence<I>(&mut self, children: I) -> NodeId
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.push(Node::Sequence(children.into_iter().collect()))
    }

    /// Ordered alternation.
    pub fn select<I>(&mut self, branches: I) -> NodeId
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.push(Node::Select(branches.into_iter().collect()))
    }

    /// Greedy repetition. A `max` of 0 means unbounded.
    pub fn repeat(&mut self, body: NodeId, min: usize, max: usize) -> NodeId {
        self.repeat_with_mode(body, min, max, RepeatMode::Greedy)
    }

    /// Lazy repetition. A `max` of 0 means unbounded.
    pub fn lazy_repeat(
        &mut self,
        body: NodeId,
        min: usize,
        max: usize,
    ) -> NodeId {
        self.repeat_with_mode(body, min, max, RepeatMode::Lazy)
    }

    /// Possessive repetition. A `max` of 0 means unbounded.
    pub fn possessive_repeat(
        &mut self,
        body: NodeId,
        min: usize,
        max: usize,
    ) -> NodeId {
        self.repeat_with_mode(body, min, max, RepeatMode::Possessive)
    }

    /// Repetition with explicit mode. A `max` of 0 means unbounded.
    pub fn repeat_with_mode(
        &mut self,
        body: NodeId,
        min: usize,
        max: usize,
        mode: RepeatMode,
    ) -> NodeId {
        let max = if max == 0 { None } else { Some(max) };
        self.push(Node::Repeat { body, min, max, mode })
    }

    /// `body*`
    pub fn star(&mut self, body: NodeId) -> NodeId {
        self.repeat(body, 0, 0)
    }

    /// `body+`
    pub fn plus(&mut self, body: NodeId) -> NodeId {
        self.repeat(body, 1, 0)
    }

    /// `body?`
    pub fn optional(&mut self, body: NodeId) -> NodeId {
        self.repeat(body, 0, 1)
    }

    /// Numbered capture. Ids start at 1.
    pub fn capture(&mut self, id: usize, body: NodeId) -> NodeId {
        self.push(Node::Capture { id, name: None, body })
    }

    /// Numbered capture that can also be referred to by name.
    pub fn capture_with_name(
        &mut self,
        id: usize,
        name: &str,
        body: NodeId,
    ) -> NodeId {
        self.push(Node::Capture { id, name: Some(name.to_string()), body })
    }

    /// Positive lookahead.
    pub fn lookahead_positive(&mut self, body: NodeId) -> NodeId {
        self.push(Node::LookaheadPositive(body))
    }

    /// Negative lookahead.
    pub fn lookahead_negative(&mut self, body: NodeId) -> NodeId {
        self.push(Node::LookaheadNegative(body))
    }

    /// Back reference to a numbered capture.
    pub fn back_reference(&mut self, id: usize) -> NodeId {
        self.push(Node::BackReference(id))
    }

    /// Back reference to a named capture.
    pub fn back_reference_with_name(&mut self, name: &str) -> NodeId {
        let name = name.to_string();
        self.push(Node::BackReferenceWithName { name, id: 0 })
    }

    /// `\A`
    pub fn subject_begin(&mut self) -> NodeId {
        self.push(Node::SubjectBegin)
    }

    /// `\z`
    pub fn subject_end(&mut self) -> NodeId {
        self.push(Node::SubjectEnd)
    }

    /// `^`
    pub fn line_begin(&mut self) -> NodeId {
        self.push(Node::LineBegin)
    }

    /// `$`
    pub fn line_end(&mut self) -> NodeId {
        self.push(Node::LineEnd)
    }

    /// `\b`
    pub fn boundary(&mut self) -> NodeId {
        self.push(Node::Boundary(Atom::Class(WORD)))
    }

    /// `\B`
    pub fn not_boundary(&mut self) -> NodeId {
        self.push(Node::NotBoundary(Atom::Class(WORD)))
    }

    /// Validates the nodes reachable from `root` and produces the pattern.
    pub fn build(mut self, root: NodeId) -> Result<Pattern, Error> {
        if u32::try_from(self.nodes.len()).is_err() {
            return Err(Error::TooLarge);
        }

        if root.index() >= self.nodes.len() {
            return Err(Error::InvalidNode(root.index()));
        }

        let mut capture_count = 0;
        let mut capture_bodies: FxHashMap<usize, Vec<NodeId>> =
            FxHashMap::default();
        let mut capture_names: FxHashMap<String, usize> =
            FxHashMap::default();

        let mut pattern = Pattern {
            nodes: Vec::new(),
            root,
            capture_count: 0,
            capture_bodies: FxHashMap::default(),
            capture_names: FxHashMap::default(),
        };

        std::mem::swap(&mut pattern.nodes, &mut self.nodes);

        // Child ids are always lower than their parent's, except for ids
        // coming from another builder.
        for (index, node) in pattern.nodes.iter().enumerate() {
            let children: &[NodeId] = match node {
                Node::Sequence(c) | Node::Select(c) => c,
                Node::Repeat { body, .. }
                | Node::Capture { body, .. }
                | Node::LookaheadPositive(body)
                | Node::LookaheadNegative(body) => std::slice::from_ref(body),
                _ => &[],
            };
            if let Some(child) = children.iter().find(|c| c.index() >= index)
            {
                return Err(Error::InvalidNode(child.index()));
            }
        }

        let reachable = pattern.reachable().collect_vec();

        for id in reachable.iter() {
            match pattern.node(*id) {
                Node::Atom(atom)
                | Node::Boundary(atom)
                | Node::NotBoundary(atom) => validate_atom(atom)?,
                Node::Repeat { min, max: Some(max), .. } if max < min => {
                    return Err(Error::InvalidRepetition {
                        min: *min,
                        max: *max,
                    })
                }
                Node::Capture { id: 0, .. } => {
                    return Err(Error::InvalidCaptureId)
                }
                Node::Capture { id: capture_id, name, body } => {
                    capture_count = capture_count.max(*capture_id);
                    capture_bodies.entry(*capture_id).or_default().push(*body);
                    if let Some(name) = name {
                        match capture_names.get(name) {
                            Some(prev) if prev != capture_id => {
                                return Err(Error::DuplicateCaptureName(
                                    name.clone(),
                                ))
                            }
                            _ => {
                                capture_names
                                    .insert(name.clone(), *capture_id);
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        for id in reachable {
            match &mut pattern.nodes[id.index()] {
                Node::BackReference(capture_id) => {
                    if !capture_bodies.contains_key(&*capture_id) {
                        return Err(Error::UndefinedCapture(*capture_id));
                    }
                }
                Node::BackReferenceWithName { name, id: capture_id } => {
                    *capture_id =
                        *capture_names.get(name.as_str()).ok_or_else(|| {
                            Error::UndefinedCaptureName(name.clone())
                        })?;
                }
                _ => {}
            }
        }

        pattern.capture_count = capture_count;
        pattern.capture_bodies = capture_bodies;
        pattern.capture_names = capture_names;

        Ok(pattern)
    }
}

fn validate_atom(atom: &Atom) -> Result<(), Error> {
    match atom {
        Atom::Range(lo, hi) if lo > hi => {
            Err(Error::InvalidRange { lo: *lo, hi: *hi })
        }
        Atom::Set(members) | Atom::NegatedSet(members) => {
            members.iter().try_for_each(validate_atom)
        }
        _ => Ok(()),
    }
}
