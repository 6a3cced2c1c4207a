/*! DFA for literal substring search.

For a literal of length `L` the automaton has `L + 1` states. State `i`
means that the last `i` bytes seen are the first `i` bytes of the literal,
and state `L` is the accepting state. The transitions are built with the
Knuth-Morris-Pratt failure function: on a mismatch at state `i` the
automaton falls back to the longest prefix of the literal that is also a
suffix of what was seen, replaying the transitions of that prefix.

The accepting state is absorbing, and is the only state with an id `>= L`,
so detecting a match is a single comparison that can be postponed until
the end of a block of bytes.
*/

use std::fmt::Debug;

use crate::re::literal::classes::ByteClasses;

/// Unsigned integer used for storing state ids in a transition table.
pub(crate) trait StateId: Copy + Debug + Eq + Ord {
    /// Largest state id representable.
    const MAX: usize;

    fn from_usize(n: usize) -> Self;

    fn as_usize(self) -> usize;
}

macro_rules! impl_state_id {
    ($($ty:ty),+) => {
        $(
            impl StateId for $ty {
                const MAX: usize = <$ty>::MAX as usize;

                #[inline]
                fn from_usize(n: usize) -> Self {
                    debug_assert!(n <= <Self as StateId>::MAX);
                    n as $ty
                }

                #[inline]
                fn as_usize(self) -> usize {
                    self as usize
                }
            }
        )+
    };
}

impl_state_id!(u8, u16, u32, u64);

/// KMP automaton for a non-empty literal, with states of type `S`.
#[derive(Debug)]
pub(crate) struct Dfa<S: StateId> {
    classes: ByteClasses,
    /// `table[state * stride + class]` is the next state.
    table: Vec<S>,
    stride: usize,
    /// Length of the literal, which is also the accepting state.
    accept: usize,
}

impl<S: StateId> Dfa<S> {
    /// Builds the automaton. The literal must not be empty and its length
    /// must fit in `S`.
    pub fn new(literal: &[u8]) -> Self {
        debug_assert!(!literal.is_empty());
        debug_assert!(literal.len() <= S::MAX);

        let classes = ByteClasses::for_literal(literal);
        let stride = classes.len();
        let len = literal.len();

        let mut table = vec![S::from_usize(0); (len + 1) * stride];

        let class = |b: u8| classes.get(b) as usize;

        table[class(literal[0])] = S::from_usize(1);

        // State that the automaton would be in after reading the literal
        // without its first byte. Mismatches at state `j` behave like
        // state `x`.
        let mut x = 0;

        for j in 1..len {
            let c = class(literal[j]);
            for k in 0..stride {
                table[j * stride + k] = table[x * stride + k];
            }
            table[j * stride + c] = S::from_usize(j + 1);
            x = table[x * stride + c].as_usize();
        }

        for k in 0..stride {
            table[len * stride + k] = S::from_usize(len);
        }

        Self { classes, table, stride, accept: len }
    }

    /// Number of states, including the accepting one.
    pub fn states(&self) -> usize {
        self.accept + 1
    }

    pub fn classes(&self) -> &ByteClasses {
        &self.classes
    }

    /// Next state from `state` for input bytes of class `class`.
    #[inline]
    pub fn transition(&self, state: usize, class: usize) -> usize {
        self.table[state * self.stride + class].as_usize()
    }

    #[inline(always)]
    fn next(&self, state: S, b: u8) -> S {
        self.table
            [state.as_usize() * self.stride + self.classes.get(b) as usize]
    }

    #[inline]
    fn is_accepting(&self, state: S) -> bool {
        state.as_usize() >= self.accept
    }

    /// Returns the position right after the first occurrence of the literal
    /// in `haystack`.
    pub fn find_end(&self, haystack: &[u8]) -> Option<usize> {
        let mut state = S::from_usize(0);
        let mut chunks = haystack.chunks_exact(8);
        let mut offset = 0;

        // The accepting state is absorbing, it's enough to check it once
        // every 8 bytes. When found, the chunk is walked again from the
        // state it started with for locating the exact position.
        for chunk in &mut chunks {
            let start = state;
            state = self.next(state, chunk[0]);
            state = self.next(state, chunk[1]);
            state = self.next(state, chunk[2]);
            state = self.next(state, chunk[3]);
            state = self.next(state, chunk[4]);
            state = self.next(state, chunk[5]);
            state = self.next(state, chunk[6]);
            state = self.next(state, chunk[7]);
            if self.is_accepting(state) {
                return Some(offset + self.rewalk(start, chunk));
            }
            offset += 8;
        }

        self.rewalk_partial(state, chunks.remainder()).map(|end| offset + end)
    }

    fn rewalk(&self, state: S, chunk: &[u8]) -> usize {
        self.rewalk_partial(state, chunk).unwrap_or(chunk.len())
    }

    fn rewalk_partial(&self, mut state: S, bytes: &[u8]) -> Option<usize> {
        for (i, b) in bytes.iter().enumerate() {
            state = self.next(state, *b);
            if self.is_accepting(state) {
                return Some(i + 1);
            }
        }
        None
    }
}

/// A literal DFA with the narrowest state type that can hold the literal
/// length.
#[derive(Debug)]
pub(crate) enum LiteralDfa {
    U8(Dfa<u8>),
    U16(Dfa<u16>),
    U32(Dfa<u32>),
    U64(Dfa<u64>),
}

impl LiteralDfa {
    pub fn new(literal: &[u8]) -> Self {
        let len = literal.len();
        if len <= u8::MAX as usize {
            Self::U8(Dfa::new(literal))
        } else if len <= u16::MAX as usize {
            Self::U16(Dfa::new(literal))
        } else if len as u64 <= u32::MAX as u64 {
            Self::U32(Dfa::new(literal))
        } else {
            Self::U64(Dfa::new(literal))
        }
    }

    /// Size in bytes of the state ids.
    pub fn state_size(&self) -> usize {
        match self {
            Self::U8(_) => 1,
            Self::U16(_) => 2,
            Self::U32(_) => 4,
            Self::U64(_) => 8,
        }
    }

    pub fn find_end(&self, haystack: &[u8]) -> Option<usize> {
        match self {
            Self::U8(dfa) => dfa.find_end(haystack),
            Self::U16(dfa) => dfa.find_end(haystack),
            Self::U32(dfa) => dfa.find_end(haystack),
            Self::U64(dfa) => dfa.find_end(haystack),
        }
    }
}
