/*! Input positions.

The evaluator reads its input through a [`Cursor`], which yields one
character at a time as a `u32`. Positions are reported in input units:
bytes for `&[u8]`, and UTF-8 byte offsets for `&str` and for iterators of
`char`.

Cursors over slices can also look at the character that precedes the
current position ([`Bidirectional`]), which is needed by word boundaries
and by line-begin in multiline mode. Cursors over iterators can't.
*/

/// A position in the input that can only move forward.
pub(crate) trait Cursor: Clone {
    /// Character at the current position, `None` at the end of the input.
    fn current(&self) -> Option<u32>;

    /// Moves past the current character. Does nothing at the end of the
    /// input.
    fn advance(&mut self);

    /// Current position.
    fn offset(&self) -> usize;

    /// Returns a cursor at `offset`, which must be the position of some
    /// character boundary in the input.
    fn at(&self, offset: usize) -> Self;
}

/// A cursor that can also read the character before the current position.
pub(crate) trait Bidirectional: Cursor {
    /// Character right before the current position, `None` at the start of
    /// the input.
    fn previous(&self) -> Option<u32>;
}

#[derive(Clone, Debug)]
pub(crate) struct ByteCursor<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(input: &'a [u8], pos: usize) -> Self {
        Self { input, pos }
    }
}

impl Cursor for ByteCursor<'_> {
    #[inline]
    fn current(&self) -> Option<u32> {
        self.input.get(self.pos).map(|b| *b as u32)
    }

    #[inline]
    fn advance(&mut self) {
        if self.pos < self.input.len() {
            self.pos += 1;
        }
    }

    #[inline]
    fn offset(&self) -> usize {
        self.pos
    }

    fn at(&self, offset: usize) -> Self {
        Self { input: self.input, pos: offset }
    }
}

impl Bidirectional for ByteCursor<'_> {
    #[inline]
    fn previous(&self) -> Option<u32> {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.input.get(i))
            .map(|b| *b as u32)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct StrCursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> StrCursor<'a> {
    /// `pos` must be at a character boundary.
    pub fn new(input: &'a str, pos: usize) -> Self {
        debug_assert!(input.is_char_boundary(pos));
        Self { input, pos }
    }

    #[inline]
    fn current_char(&self) -> Option<char> {
        self.input.get(self.pos..).and_then(|s| s.chars().next())
    }
}

impl Cursor for StrCursor<'_> {
    #[inline]
    fn current(&self) -> Option<u32> {
        self.current_char().map(|c| c as u32)
    }

    #[inline]
    fn advance(&mut self) {
        if let Some(c) = self.current_char() {
            self.pos += c.len_utf8();
        }
    }

    #[inline]
    fn offset(&self) -> usize {
        self.pos
    }

    fn at(&self, offset: usize) -> Self {
        Self::new(self.input, offset)
    }
}

impl Bidirectional for StrCursor<'_> {
    #[inline]
    fn previous(&self) -> Option<u32> {
        self.input
            .get(..self.pos)
            .and_then(|s| s.chars().next_back())
            .map(|c| c as u32)
    }
}

/// Cursor over any cloneable iterator of characters.
///
/// Cloning the cursor clones the iterator, and going back to a previous
/// position replays the input from the start.
#[derive(Clone, Debug)]
pub(crate) struct IterCursor<I> {
    origin: I,
    rest: I,
    current: Option<char>,
    pos: usize,
}

impl<I> IterCursor<I>
where
    I: Iterator<Item = char> + Clone,
{
    pub fn new(iter: I) -> Self {
        let mut rest = iter.clone();
        let current = rest.next();
        Self { origin: iter, rest, current, pos: 0 }
    }
}

impl<I> Cursor for IterCursor<I>
where
    I: Iterator<Item = char> + Clone,
{
    #[inline]
    fn current(&self) -> Option<u32> {
        self.current.map(|c| c as u32)
    }

    #[inline]
    fn advance(&mut self) {
        if let Some(c) = self.current {
            self.pos += c.len_utf8();
            self.current = self.rest.next();
        }
    }

    #[inline]
    fn offset(&self) -> usize {
        self.pos
    }

    fn at(&self, offset: usize) -> Self {
        let mut cursor = Self::new(self.origin.clone());
        while cursor.pos < offset && cursor.current.is_some() {
            cursor.advance();
        }
        cursor
    }
}
