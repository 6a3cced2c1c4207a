/*! Recursive backtracking evaluation of pattern trees.

The evaluator walks the pattern tree together with an explicit stack of
continuations: the items that still need to match after the current one.
The stack is a linked list that lives in the call stack, every level of
recursion pushes at most a few items on top of the stack it received, so
backtracking is just returning from a call and no item is ever popped.

A match is attempted with the stack `[start mark, pattern, end mark,
accept]`, which is `[start mark, pattern, assert end, end mark, accept]`
when the whole input must be matched.

Iterations of a repetition are evaluated on their own, with a stack that
ends with an end-of-cycle item. Once an iteration succeeds its outcome is
committed, and what is backtracked is the number of iterations. Iterations
beyond the minimum must consume input, otherwise they are rejected, which
guarantees that repetitions of patterns that can match the empty string
terminate.
*/

use bitmask::bitmask;
use rustc_hash::FxHashMap;

use crate::re::backtrack::captures::Captures;
use crate::re::backtrack::cursor::Cursor;
use crate::re::first::FirstSet;
use crate::re::pattern::{Node, NodeId, Pattern, RepeatMode};

bitmask! {
    pub mask EvalFlagSet: u8 where flags EvalFlags {
        Multiline       = 0x01,
        BlockEmptyMatch = 0x02,
        Consumed        = 0x04,
    }
}

/// Reads the character that precedes a cursor's position.
pub(crate) type LookBehind<C> = fn(&C) -> Option<u32>;

#[derive(Clone, Copy, Debug)]
enum Item {
    StartMark,
    Node(NodeId),
    /// The `n`-th child of a sequence and the ones that follow it.
    Seq(NodeId, usize),
    CaptureEnd(usize),
    AssertEnd,
    EndMark,
    EndCycle,
    EndLookahead,
    Accept,
}

struct Stack<'s> {
    item: Item,
    next: Option<&'s Stack<'s>>,
}

impl<'s> Stack<'s> {
    fn push(&'s self, item: Item) -> Stack<'s> {
        Stack { item, next: Some(self) }
    }
}

/// Where a successful evaluation ended.
#[derive(Debug)]
pub(crate) struct Outcome<C> {
    pub cursor: C,
    pub captures: Captures,
}

/// How much of the input the pattern must match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Anchoring {
    /// The match must reach the end of the input.
    Whole,
    /// The match can end anywhere.
    Prefix,
}

pub(crate) struct Evaluator<'r, C: Cursor> {
    pattern: &'r Pattern,
    first_sets: &'r FxHashMap<NodeId, Box<[FirstSet]>>,
    /// Flags every evaluation starts with.
    flags: EvalFlagSet,
    /// `None` for cursors that can't look behind. Nodes that need to are
    /// then treated as not matching.
    look_behind: Option<LookBehind<C>>,
}

impl<'r, C: Cursor> Evaluator<'r, C> {
    pub fn new(
        pattern: &'r Pattern,
        first_sets: &'r FxHashMap<NodeId, Box<[FirstSet]>>,
        multiline: bool,
        look_behind: Option<LookBehind<C>>,
    ) -> Self {
        let mut flags = EvalFlagSet::none();
        if multiline {
            flags.set(EvalFlags::Multiline);
        }
        Self { pattern, first_sets, flags, look_behind }
    }

    /// Tries to match the pattern starting at `cursor`.
    pub fn run(&self, cursor: C, anchoring: Anchoring) -> Option<Outcome<C>> {
        let accept = Stack { item: Item::Accept, next: None };
        let end_mark = accept.push(Item::EndMark);
        let assert_end = end_mark.push(Item::AssertEnd);

        let after = match anchoring {
            Anchoring::Whole => &assert_end,
            Anchoring::Prefix => &end_mark,
        };

        let pattern = after.push(Item::Node(self.pattern.root()));
        let start = pattern.push(Item::StartMark);

        let captures = Captures::new(self.pattern.capture_count());

        self.eval(cursor, self.flags, captures, &start)
    }

    fn eval(
        &self,
        mut cursor: C,
        mut flags: EvalFlagSet,
        mut captures: Captures,
        stack: &Stack<'_>,
    ) -> Option<Outcome<C>> {
        match stack.item {
            Item::Accept => {
                captures.matched();
                Some(Outcome { cursor, captures })
            }
            Item::StartMark => {
                captures.set_start_mark(cursor.offset());
                self.eval(cursor, flags, captures, stack.next?)
            }
            Item::EndMark => {
                captures.set_end_mark(cursor.offset());
                self.eval(cursor, flags, captures, stack.next?)
            }
            Item::AssertEnd => {
                if cursor.current().is_some() {
                    return None;
                }
                self.eval(cursor, flags, captures, stack.next?)
            }
            Item::EndCycle => {
                if flags.contains(EvalFlags::BlockEmptyMatch)
                    && !flags.contains(EvalFlags::Consumed)
                {
                    return None;
                }
                captures.matched();
                Some(Outcome { cursor, captures })
            }
            Item::EndLookahead => {
                captures.matched();
                Some(Outcome { cursor, captures })
            }
            Item::CaptureEnd(id) => {
                captures.end_capture(id, cursor.offset());
                self.eval(cursor, flags, captures, stack.next?)
            }
            Item::Seq(id, n) => {
                let next = stack.next?;
                let Node::Sequence(children) = self.pattern.node(id) else {
                    return None;
                };
                match children.get(n) {
                    Some(child) => {
                        let rest = next.push(Item::Seq(id, n + 1));
                        let child = rest.push(Item::Node(*child));
                        self.eval(cursor, flags, captures, &child)
                    }
                    None => self.eval(cursor, flags, captures, next),
                }
            }
            Item::Node(id) => {
                let next = stack.next?;
                match self.pattern.node(id) {
                    Node::Empty => self.eval(cursor, flags, captures, next),
                    Node::Reject => None,
                    Node::Atom(atom) => {
                        let c = cursor.current()?;
                        let multiline = flags.contains(EvalFlags::Multiline);
                        if !atom.is_match(c, multiline) {
                            return None;
                        }
                        cursor.advance();
                        flags.set(EvalFlags::Consumed);
                        self.eval(cursor, flags, captures, next)
                    }
                    Node::String(chars) => {
                        for ch in chars {
                            if cursor.current()? != *ch {
                                return None;
                            }
                            cursor.advance();
                        }
                        if !chars.is_empty() {
                            flags.set(EvalFlags::Consumed);
                        }
                        self.eval(cursor, flags, captures, next)
                    }
                    Node::Sequence(_) => {
                        let seq = next.push(Item::Seq(id, 0));
                        self.eval(cursor, flags, captures, &seq)
                    }
                    Node::Select(branches) => self.select(
                        id, branches, cursor, flags, captures, next,
                    ),
                    Node::Repeat { body, min, max, mode } => {
                        let (body, min, max) = (*body, *min, *max);
                        match mode {
                            RepeatMode::Greedy => self.greedy(
                                body, min, max, cursor, flags, captures, next,
                            ),
                            RepeatMode::Lazy => self.lazy(
                                body, min, max, cursor, flags, captures, next,
                            ),
                            RepeatMode::Possessive => self.possessive(
                                body, min, max, cursor, flags, captures, next,
                            ),
                        }
                    }
                    Node::Capture { id, body, .. } => {
                        captures.start_capture(*id, cursor.offset());
                        let end = next.push(Item::CaptureEnd(*id));
                        let body = end.push(Item::Node(*body));
                        self.eval(cursor, flags, captures, &body)
                    }
                    Node::LookaheadPositive(body) => {
                        let mut outcome =
                            self.lookahead(*body, &cursor, flags, &captures)?;
                        // Captures set inside the lookahead are kept.
                        outcome.captures.unmatch();
                        self.eval(cursor, flags, outcome.captures, next)
                    }
                    Node::LookaheadNegative(body) => {
                        if self
                            .lookahead(*body, &cursor, flags, &captures)
                            .is_some()
                        {
                            return None;
                        }
                        self.eval(cursor, flags, captures, next)
                    }
                    Node::BackReference(id)
                    | Node::BackReferenceWithName { id, .. } => {
                        let range = captures.get(*id)?;
                        let mut captured = cursor.at(range.start);
                        while captured.offset() < range.end {
                            if cursor.current()? != captured.current()? {
                                return None;
                            }
                            cursor.advance();
                            captured.advance();
                        }
                        if !range.is_empty() {
                            flags.set(EvalFlags::Consumed);
                        }
                        self.eval(cursor, flags, captures, next)
                    }
                    Node::SubjectBegin => {
                        if cursor.offset() != 0 {
                            return None;
                        }
                        self.eval(cursor, flags, captures, next)
                    }
                    Node::SubjectEnd => {
                        if cursor.current().is_some() {
                            return None;
                        }
                        self.eval(cursor, flags, captures, next)
                    }
                    Node::LineBegin => {
                        if !self.at_line_begin(&cursor, flags) {
                            return None;
                        }
                        self.eval(cursor, flags, captures, next)
                    }
                    Node::LineEnd => {
                        let at_line_end = match cursor.current() {
                            None => true,
                            Some(c) => {
                                flags.contains(EvalFlags::Multiline)
                                    && c == '\n' as u32
                            }
                        };
                        if !at_line_end {
                            return None;
                        }
                        self.eval(cursor, flags, captures, next)
                    }
                    Node::Boundary(atom) | Node::NotBoundary(atom) => {
                        let prev = if cursor.offset() == 0 {
                            None
                        } else {
                            (self.look_behind?)(&cursor)
                        };
                        let multiline = flags.contains(EvalFlags::Multiline);
                        let before =
                            prev.is_some_and(|c| atom.is_match(c, multiline));
                        let after = cursor
                            .current()
                            .is_some_and(|c| atom.is_match(c, multiline));
                        let boundary =
                            matches!(self.pattern.node(id), Node::Boundary(_));
                        if (before != after) != boundary {
                            return None;
                        }
                        self.eval(cursor, flags, captures, next)
                    }
                }
            }
        }
    }

    fn at_line_begin(&self, cursor: &C, flags: EvalFlagSet) -> bool {
        if cursor.offset() == 0 {
            return true;
        }
        if !flags.contains(EvalFlags::Multiline) {
            return false;
        }
        match self.look_behind {
            Some(previous) => previous(cursor) == Some('\n' as u32),
            None => false,
        }
    }

    /// Tries the branches in order, skipping the ones that can't start with
    /// the current character.
    fn select(
        &self,
        id: NodeId,
        branches: &[NodeId],
        cursor: C,
        flags: EvalFlagSet,
        captures: Captures,
        next: &Stack<'_>,
    ) -> Option<Outcome<C>> {
        let first_sets = self.first_sets.get(&id);
        let current = cursor.current();

        for (i, branch) in branches.iter().enumerate() {
            if let Some(sets) = first_sets {
                if !sets[i].may_match_at(current) {
                    continue;
                }
            }
            let stack = next.push(Item::Node(*branch));
            let outcome =
                self.eval(cursor.clone(), flags, captures.clone(), &stack);
            if outcome.is_some() {
                return outcome;
            }
        }

        None
    }

    /// Evaluates the body of a lookahead on its own.
    fn lookahead(
        &self,
        body: NodeId,
        cursor: &C,
        flags: EvalFlagSet,
        captures: &Captures,
    ) -> Option<Outcome<C>> {
        let end = Stack { item: Item::EndLookahead, next: None };
        let body = end.push(Item::Node(body));
        self.eval(cursor.clone(), flags, captures.clone(), &body)
    }

    /// Evaluates a single iteration of a repetition. When `block_empty` is
    /// `true` the iteration must consume input.
    fn iteration(
        &self,
        body: NodeId,
        cursor: &C,
        mut flags: EvalFlagSet,
        captures: &Captures,
        block_empty: bool,
    ) -> Option<Outcome<C>> {
        flags.unset(EvalFlags::Consumed);

        if block_empty {
            flags.set(EvalFlags::BlockEmptyMatch);
        } else {
            flags.unset(EvalFlags::BlockEmptyMatch);
        }

        let end = Stack { item: Item::EndCycle, next: None };
        let body = end.push(Item::Node(body));

        let mut outcome =
            self.eval(cursor.clone(), flags, captures.clone(), &body)?;

        outcome.captures.unmatch();
        Some(outcome)
    }

    /// Evaluates the first `min` iterations, which are mandatory for every
    /// mode.
    fn mandatory(
        &self,
        body: NodeId,
        min: usize,
        mut cursor: C,
        mut flags: EvalFlagSet,
        mut captures: Captures,
    ) -> Option<(C, EvalFlagSet, Captures)> {
        for _ in 0..min {
            let outcome =
                self.iteration(body, &cursor, flags, &captures, false)?;
            if outcome.cursor.offset() != cursor.offset() {
                flags.set(EvalFlags::Consumed);
            }
            cursor = outcome.cursor;
            captures = outcome.captures;
        }
        Some((cursor, flags, captures))
    }

    #[allow(clippy::too_many_arguments)]
    fn greedy(
        &self,
        body: NodeId,
        min: usize,
        max: Option<usize>,
        cursor: C,
        flags: EvalFlagSet,
        captures: Captures,
        next: &Stack<'_>,
    ) -> Option<Outcome<C>> {
        let (cursor, flags, captures) =
            self.mandatory(body, min, cursor, flags, captures)?;
        self.greedy_rest(body, min, max, cursor, flags, captures, next)
    }

    /// Tries one more iteration followed by the rest of the repetition,
    /// and the continuation if that fails.
    #[allow(clippy::too_many_arguments)]
    fn greedy_rest(
        &self,
        body: NodeId,
        count: usize,
        max: Option<usize>,
        cursor: C,
        flags: EvalFlagSet,
        captures: Captures,
        next: &Stack<'_>,
    ) -> Option<Outcome<C>> {
        if max.map_or(true, |max| count < max) {
            if let Some(outcome) =
                self.iteration(body, &cursor, flags, &captures, true)
            {
                let mut flags = flags;
                flags.set(EvalFlags::Consumed);
                let result = self.greedy_rest(
                    body,
                    count + 1,
                    max,
                    outcome.cursor,
                    flags,
                    outcome.captures,
                    next,
                );
                if result.is_some() {
                    return result;
                }
            }
        }
        self.eval(cursor, flags, captures, next)
    }

    #[allow(clippy::too_many_arguments)]
    fn lazy(
        &self,
        body: NodeId,
        min: usize,
        max: Option<usize>,
        cursor: C,
        flags: EvalFlagSet,
        captures: Captures,
        next: &Stack<'_>,
    ) -> Option<Outcome<C>> {
        let (mut cursor, mut flags, mut captures) =
            self.mandatory(body, min, cursor, flags, captures)?;

        let mut count = min;

        loop {
            let result =
                self.eval(cursor.clone(), flags, captures.clone(), next);
            if result.is_some() {
                return result;
            }
            if max.is_some_and(|max| count >= max) {
                return None;
            }
            let outcome =
                self.iteration(body, &cursor, flags, &captures, true)?;
            flags.set(EvalFlags::Consumed);
            cursor = outcome.cursor;
            captures = outcome.captures;
            count += 1;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn possessive(
        &self,
        body: NodeId,
        min: usize,
        max: Option<usize>,
        cursor: C,
        flags: EvalFlagSet,
        captures: Captures,
        next: &Stack<'_>,
    ) -> Option<Outcome<C>> {
        let (mut cursor, mut flags, mut captures) =
            self.mandatory(body, min, cursor, flags, captures)?;

        let mut count = min;

        while max.map_or(true, |max| count < max) {
            match self.iteration(body, &cursor, flags, &captures, true) {
                Some(outcome) => {
                    flags.set(EvalFlags::Consumed);
                    cursor = outcome.cursor;
                    captures = outcome.captures;
                    count += 1;
                }
                None => break,
            }
        }

        self.eval(cursor, flags, captures, next)
    }
}
