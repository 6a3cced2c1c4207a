use std::fmt::{Debug, Display, Formatter};
use std::ops::Range;

use log::debug;
use rustc_hash::FxHashMap;

use crate::config::Config;
use crate::re::backtrack::{
    Anchoring, Bidirectional, ByteCursor, Captures, Cursor, Evaluator,
    IterCursor, StrCursor,
};
use crate::re::first::{convert_to_possessive, select_first_sets, FirstSet};
use crate::re::limits::{
    ends_with_anchor, limits, starts_with_anchor, Count, Limits,
};
use crate::re::literal::{ByteClasses, LiteralSearcher};
use crate::re::optimizer::optimize;
use crate::re::pattern::{Node, NodeId, Pattern};
use crate::re::Error;

/// Literal that every match starts with.
struct Prefix {
    chars: Vec<u32>,
    /// Searcher for byte inputs, `None` if some character in the literal
    /// doesn't fit in a byte, and therefore can't appear in a byte input.
    bytes: Option<LiteralSearcher>,
    /// Searcher for the UTF-8 form of the literal, `None` if some character
    /// is not a valid Unicode scalar value.
    utf8: Option<LiteralSearcher>,
    /// The pattern is the literal and nothing else.
    pure: bool,
}

impl Prefix {
    /// Minimum length for a literal to be worth searching.
    const MIN_LEN: usize = 2;

    fn new(pattern: &Pattern, config: &Config) -> Option<Self> {
        let mut chars = Vec::new();
        let complete = literal_prefix(pattern, pattern.root(), &mut chars);

        if chars.len() < Self::MIN_LEN {
            return None;
        }

        let bytes = chars
            .iter()
            .map(|c| u8::try_from(*c).ok())
            .collect::<Option<Vec<u8>>>()
            .map(|lit| LiteralSearcher::with_config(&lit, &config.search));

        let utf8 = chars
            .iter()
            .map(|c| char::from_u32(*c))
            .collect::<Option<String>>()
            .map(|lit| {
                LiteralSearcher::with_config(lit.as_bytes(), &config.search)
            });

        Some(Self {
            chars,
            bytes,
            utf8,
            pure: complete && pattern.capture_count() == 0,
        })
    }
}

impl Display for Prefix {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for c in &self.chars {
            match char::from_u32(*c) {
                Some(c) => write!(f, "{}", c.escape_debug())?,
                None => write!(f, "\\x{{{:x}}}", c)?,
            }
        }
        Ok(())
    }
}

/// Appends to `out` the literal characters that every match of node `id`
/// starts with. Returns `true` if the node matches exactly those
/// characters and nothing else.
fn literal_prefix(
    pattern: &Pattern,
    id: NodeId,
    out: &mut Vec<u32>,
) -> bool {
    match pattern.node(id) {
        Node::Empty => true,
        Node::String(chars) => {
            out.extend(chars);
            true
        }
        Node::Atom(atom) => match atom.single_char() {
            Some(c) => {
                out.push(c);
                true
            }
            None => false,
        },
        Node::Capture { body, .. } => literal_prefix(pattern, *body, out),
        Node::Sequence(items) => {
            items.iter().all(|item| literal_prefix(pattern, *item, out))
        }
        Node::Repeat { body, min, max, .. } if *min > 0 => {
            let complete = literal_prefix(pattern, *body, out);
            complete && *min == 1 && *max == Some(1)
        }
        _ => false,
    }
}

/// A pattern prepared for evaluation.
///
/// Preparing a pattern validates it, optimizes it and runs the static
/// analyses used during evaluation. A `Regex` can be shared between threads
/// and used for any number of evaluations.
///
/// Byte inputs are seen as sequences of Latin-1 characters, where every
/// byte is the character with the same code point. For `&str` inputs the
/// reported positions are byte offsets.
///
/// ```
/// # use retrack::{PatternBuilder, Regex};
/// let mut b = PatternBuilder::new();
/// let c = b.char('c');
/// let a = b.char('a');
/// let t = b.char('t');
/// let r = b.char('r');
/// let tr = b.select([t, r]);
/// let root = b.sequence([c, a, tr]);
///
/// let regex = Regex::new(b.build(root).unwrap()).unwrap();
///
/// assert!(regex.is_match(b"cat"));
/// assert!(regex.is_match(b"car"));
/// assert!(!regex.is_match(b"cab"));
/// assert_eq!(regex.search_str("a cart").get(0), Some(2..5));
/// ```
pub struct Regex {
    pattern: Pattern,
    first_sets: FxHashMap<NodeId, Box<[FirstSet]>>,
    multiline: bool,
    limits: Limits,
    starts_with_anchor: bool,
    ends_with_anchor: bool,
    byte_classes: ByteClasses,
    prefix: Option<Prefix>,
    /// `false` if evaluation must not be skipped based on `limits`.
    check_limits: bool,
}

impl Regex {
    /// Prepares a pattern with the default configuration.
    pub fn new(pattern: Pattern) -> Result<Self, Error> {
        Self::with_config(pattern, &Config::default())
    }

    /// Prepares a pattern with the given configuration.
    pub fn with_config(
        pattern: Pattern,
        config: &Config,
    ) -> Result<Self, Error> {
        let multiline = config.eval.multiline;

        let mut pattern = if config.eval.optimize_pattern {
            optimize(&pattern)?
        } else {
            pattern
        };

        let possessive = if config.eval.possessive_optimization {
            convert_to_possessive(&mut pattern, multiline)
        } else {
            0
        };

        let analyze = config.eval.static_analysis;

        let first_sets = select_first_sets(&pattern, multiline);
        let limits = limits(&pattern);
        let starts_with_anchor =
            analyze && starts_with_anchor(&pattern, multiline);
        let ends_with_anchor =
            analyze && ends_with_anchor(&pattern, multiline);
        let byte_classes = ByteClasses::for_pattern(&pattern, multiline);
        let prefix =
            if analyze { Prefix::new(&pattern, config) } else { None };

        debug!(
            "prepared regex: {} nodes, limits {}, {} possessive, \
             anchored at start: {}, anchored at end: {}, prefix: {:?}",
            pattern.len(),
            limits,
            possessive,
            starts_with_anchor,
            ends_with_anchor,
            prefix.as_ref().map(|p| (p.to_string(), p.pure)),
        );

        Ok(Self {
            pattern,
            first_sets,
            multiline,
            limits,
            starts_with_anchor,
            ends_with_anchor,
            byte_classes,
            prefix,
            check_limits: analyze,
        })
    }

    /// Returns a regex for evaluating the pattern over forward-only inputs.
    ///
    /// Fails with [`Error::RequiresBidirectional`] if the pattern needs to
    /// look at the character before the current position: word boundaries,
    /// and line-begin in multiline mode.
    pub fn forward_only(self) -> Result<ForwardRegex, Error> {
        if self.pattern.looks_behind(self.multiline) {
            return Err(Error::RequiresBidirectional);
        }
        Ok(ForwardRegex { regex: self })
    }

    /// The prepared pattern.
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Minimum and maximum number of characters matched by the pattern.
    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Number of capture groups, not including the whole match.
    pub fn capture_count(&self) -> usize {
        self.pattern.capture_count()
    }

    /// Id of the capture group with the given name.
    pub fn capture_id(&self, name: &str) -> Option<usize> {
        self.pattern.capture_id(name)
    }

    /// Equivalence classes of bytes that the pattern can't tell apart.
    pub fn byte_classes(&self) -> &ByteClasses {
        &self.byte_classes
    }

    /// Returns `true` if the pattern matches the whole input.
    pub fn is_match(&self, input: &[u8]) -> bool {
        self.match_bytes(input).is_match()
    }

    /// Matches the pattern against the whole input.
    pub fn match_bytes(&self, input: &[u8]) -> Captures {
        if let Some(prefix) = &self.prefix {
            let Some(searcher) = &prefix.bytes else {
                return self.no_match();
            };
            if !input.starts_with(searcher.literal()) {
                return self.no_match();
            }
            if prefix.pure {
                return self.whole_literal_match(searcher, input.len());
            }
        }
        self.anchored::<ByteCursor>(
            ByteCursor::new(input, 0),
            input.len(),
            Anchoring::Whole,
        )
    }

    /// Matches the pattern against the whole input.
    pub fn match_str(&self, input: &str) -> Captures {
        if let Some(prefix) = &self.prefix {
            let Some(searcher) = &prefix.utf8 else {
                return self.no_match();
            };
            if !input.as_bytes().starts_with(searcher.literal()) {
                return self.no_match();
            }
            if prefix.pure {
                return self.whole_literal_match(searcher, input.len());
            }
        }
        self.anchored::<StrCursor>(
            StrCursor::new(input, 0),
            input.len(),
            Anchoring::Whole,
        )
    }

    /// Matches the pattern at the start of the input, the match doesn't
    /// need to reach the end.
    pub fn starts_with_bytes(&self, input: &[u8]) -> Captures {
        if let Some(prefix) = &self.prefix {
            let Some(searcher) = &prefix.bytes else {
                return self.no_match();
            };
            if !input.starts_with(searcher.literal()) {
                return self.no_match();
            }
            if prefix.pure {
                return self.literal_match(0..searcher.literal().len());
            }
        }
        self.anchored::<ByteCursor>(
            ByteCursor::new(input, 0),
            input.len(),
            Anchoring::Prefix,
        )
    }

    /// Matches the pattern at the start of the input, the match doesn't
    /// need to reach the end.
    pub fn starts_with_str(&self, input: &str) -> Captures {
        if let Some(prefix) = &self.prefix {
            let Some(searcher) = &prefix.utf8 else {
                return self.no_match();
            };
            if !input.as_bytes().starts_with(searcher.literal()) {
                return self.no_match();
            }
            if prefix.pure {
                return self.literal_match(0..searcher.literal().len());
            }
        }
        self.anchored::<StrCursor>(
            StrCursor::new(input, 0),
            input.len(),
            Anchoring::Prefix,
        )
    }

    /// Finds the leftmost match of the pattern in the input.
    pub fn search_bytes(&self, input: &[u8]) -> Captures {
        let searcher = match &self.prefix {
            Some(Prefix { bytes: None, .. }) => return self.no_match(),
            Some(Prefix { bytes: Some(searcher), .. }) => Some(searcher),
            None => None,
        };
        self.search(
            input,
            |pos| ByteCursor::new(input, pos),
            |_| true,
            1,
            searcher,
        )
    }

    /// Finds the leftmost match of the pattern in the input.
    pub fn search_str(&self, input: &str) -> Captures {
        let searcher = match &self.prefix {
            Some(Prefix { utf8: None, .. }) => return self.no_match(),
            Some(Prefix { utf8: Some(searcher), .. }) => Some(searcher),
            None => None,
        };
        self.search(
            input.as_bytes(),
            |pos| StrCursor::new(input, pos),
            |pos| input.is_char_boundary(pos),
            4,
            searcher,
        )
    }

    fn rejects_len(&self, len: usize) -> bool {
        self.check_limits && self.limits.rejects_len(len)
    }

    fn no_match(&self) -> Captures {
        Captures::new(self.pattern.capture_count())
    }

    /// Result for a pattern that is nothing but a literal, found at
    /// `range`.
    fn literal_match(&self, range: Range<usize>) -> Captures {
        let mut captures = self.no_match();
        captures.set_start_mark(range.start);
        captures.set_end_mark(range.end);
        captures.matched();
        captures
    }

    /// Result for a pattern that is nothing but a literal, matched against
    /// a whole input of length `len` that starts with the literal.
    fn whole_literal_match(
        &self,
        searcher: &LiteralSearcher,
        len: usize,
    ) -> Captures {
        if searcher.literal().len() != len {
            return self.no_match();
        }
        self.literal_match(0..len)
    }

    fn evaluator<C: Bidirectional>(&self) -> Evaluator<'_, C> {
        Evaluator::new(
            &self.pattern,
            &self.first_sets,
            self.multiline,
            Some(C::previous),
        )
    }

    fn anchored<C: Bidirectional>(
        &self,
        cursor: C,
        len: usize,
        anchoring: Anchoring,
    ) -> Captures {
        if self.rejects_len(len) {
            return self.no_match();
        }
        match self.evaluator::<C>().run(cursor, anchoring) {
            Some(outcome) => outcome.captures,
            None => self.no_match(),
        }
    }

    /// Tries the pattern at every candidate start position, from left to
    /// right, including the end of the input.
    ///
    /// `max_unit_len` is the maximum number of bytes taken by a character.
    fn search<C: Bidirectional>(
        &self,
        input: &[u8],
        cursor_at: impl Fn(usize) -> C,
        is_start: impl Fn(usize) -> bool,
        max_unit_len: usize,
        prefix: Option<&LiteralSearcher>,
    ) -> Captures {
        if self.rejects_len(input.len()) {
            return self.no_match();
        }

        // Matches that must end at the end of the input can't start too far
        // away from it.
        let first = match (self.ends_with_anchor, self.limits.max) {
            (true, Count::Exact(max)) => input
                .len()
                .saturating_sub(max.saturating_mul(max_unit_len)),
            _ => 0,
        };

        let last = if self.starts_with_anchor { 0 } else { input.len() };

        let pure = self.prefix.as_ref().is_some_and(|p| p.pure);
        let evaluator = self.evaluator::<C>();
        let mut pos = first;

        while pos <= last {
            if let Some(searcher) = prefix {
                match searcher.find_at(input, pos) {
                    Some(found) if found.start <= last => {
                        if pure {
                            return self.literal_match(found);
                        }
                        pos = found.start;
                    }
                    _ => break,
                }
            }

            if is_start(pos) {
                if let Some(outcome) =
                    evaluator.run(cursor_at(pos), Anchoring::Prefix)
                {
                    return outcome.captures;
                }
            }

            pos += 1;
        }

        self.no_match()
    }
}

impl Debug for Regex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.pattern)
    }
}

/// A [`Regex`] that can be evaluated over inputs that can only be read
/// forward, like iterators of characters.
///
/// Positions are UTF-8 byte offsets, as if the characters produced by the
/// iterator were collected into a `String`.
///
/// ```
/// # use retrack::{PatternBuilder, Regex};
/// let mut b = PatternBuilder::new();
/// let a = b.char('a');
/// let star = b.star(a);
/// let tail = b.char('b');
/// let root = b.sequence([star, tail]);
///
/// let regex = Regex::new(b.build(root).unwrap())
///     .unwrap()
///     .forward_only()
///     .unwrap();
///
/// assert!(regex.match_iter("aaab".chars()).is_match());
/// assert_eq!(regex.search_iter("xxab".chars()).get(0), Some(2..4));
/// ```
#[derive(Debug)]
pub struct ForwardRegex {
    regex: Regex,
}

impl ForwardRegex {
    /// The underlying regex.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Matches the pattern against the whole input.
    pub fn match_iter<I>(&self, input: I) -> Captures
    where
        I: Iterator<Item = char> + Clone,
    {
        self.run(IterCursor::new(input), Anchoring::Whole)
    }

    /// Matches the pattern at the start of the input.
    pub fn starts_with_iter<I>(&self, input: I) -> Captures
    where
        I: Iterator<Item = char> + Clone,
    {
        self.run(IterCursor::new(input), Anchoring::Prefix)
    }

    /// Finds the leftmost match of the pattern in the input.
    pub fn search_iter<I>(&self, input: I) -> Captures
    where
        I: Iterator<Item = char> + Clone,
    {
        let evaluator = self.evaluator();
        let mut cursor = IterCursor::new(input);

        loop {
            if let Some(outcome) =
                evaluator.run(cursor.clone(), Anchoring::Prefix)
            {
                return outcome.captures;
            }
            if self.regex.starts_with_anchor || cursor.current().is_none() {
                return self.regex.no_match();
            }
            cursor.advance();
        }
    }

    fn evaluator<C: Cursor>(&self) -> Evaluator<'_, C> {
        Evaluator::new(
            &self.regex.pattern,
            &self.regex.first_sets,
            self.regex.multiline,
            None,
        )
    }

    fn run<C: Cursor>(&self, cursor: C, anchoring: Anchoring) -> Captures {
        match self.evaluator().run(cursor, anchoring) {
            Some(outcome) => outcome.captures,
            None => self.regex.no_match(),
        }
    }
}
