/*! Fast search of literal byte strings.

[`LiteralSearcher`] picks one of several strategies when created, based on
the length of the literal and on what the CPU supports:

* Empty literals are found at the start of the haystack.
* Single bytes are searched with `memchr`.
* Literals of length 2 up to `dfa_max_len` are searched by walking a
  [KMP][1] automaton whose alphabet is compressed into equivalence classes.
  When the automaton is small enough, the walk uses vector shuffles that
  advance 16 bytes per step.
* Longer literals use Boyer-Moore-Horspool, or a naive scan when they are
  shorter than `horspool_min_len`.

All the strategies produce exactly the same results as
[`LiteralSearcher::find_naive`]. The choice is only a matter of speed.

[1]: https://en.wikipedia.org/wiki/Knuth%E2%80%93Morris%E2%80%93Pratt_algorithm
*/

use std::ops::Range;

use log::trace;
use memchr::memchr;

use crate::config::SearchConfig;

pub(crate) mod classes;
mod dfa;
mod horspool;
mod naive;
mod simd;


pub use classes::ByteClasses;
pub use naive::find_literal;

use dfa::{Dfa, LiteralDfa};
use horspool::Horspool;
use simd::SimdDfa;

/// Algorithm used by a [`LiteralSearcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// The literal is empty.
    Empty,
    /// Single byte search with `memchr`.
    Byte,
    /// DFA walked with vector instructions.
    Simd,
    /// DFA walked one byte at a time.
    Dfa,
    /// Boyer-Moore-Horspool.
    Horspool,
    /// First byte scan followed by a comparison.
    Naive,
}

/// Outcome of [`LiteralSearcher::search`].
///
/// When the literal is not found, both `start` and `end` are the length of
/// the haystack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    /// Position where the literal starts.
    pub start: usize,
    /// Position right after the literal.
    pub end: usize,
    /// `true` if the literal was found.
    pub found: bool,
}

#[derive(Debug)]
enum Searcher {
    Empty,
    Byte(u8),
    Simd(SimdDfa),
    Dfa(LiteralDfa),
    Horspool(Horspool),
    Naive,
}

/// Searches for a fixed sequence of bytes.
///
/// ```
/// # use retrack::LiteralSearcher;
/// let searcher = LiteralSearcher::new(b"needle");
/// assert_eq!(searcher.find(b"...needle..."), Some(3..9));
/// assert_eq!(searcher.find(b"...noodle..."), None);
/// ```
#[derive(Debug)]
pub struct LiteralSearcher {
    literal: Vec<u8>,
    searcher: Searcher,
}

impl LiteralSearcher {
    /// Creates a searcher for `literal` with the default settings.
    pub fn new(literal: &[u8]) -> Self {
        Self::with_config(literal, &SearchConfig::default())
    }

    /// Creates a searcher for `literal` with the given settings.
    pub fn with_config(literal: &[u8], config: &SearchConfig) -> Self {
        let len = literal.len();

        let searcher = match len {
            0 => Searcher::Empty,
            1 => Searcher::Byte(literal[0]),
            _ if len <= config.dfa_max_len => {
                Self::dfa_searcher(literal, config)
            }
            _ if len >= config.horspool_min_len => {
                Searcher::Horspool(Horspool::new(literal))
            }
            _ => Searcher::Naive,
        };

        let searcher = Self { literal: literal.to_vec(), searcher };

        trace!(
            "literal search strategy for {} bytes: {:?}",
            len,
            searcher.strategy()
        );

        searcher
    }

    fn dfa_searcher(literal: &[u8], config: &SearchConfig) -> Searcher {
        // A DFA for a literal of length `L` has `L + 1` states.
        let fits_vector = literal.len() < config.simd_max_states
            && literal.len() < simd::MAX_STATES;

        if config.simd && fits_vector {
            let available = simd::is_available();
            trace!("vectorized DFA walk available: {}", available);
            if available {
                if let Some(simd) = SimdDfa::new(
                    &Dfa::<u8>::new(literal),
                    config.simd_max_states,
                ) {
                    return Searcher::Simd(simd);
                }
            }
        }

        Searcher::Dfa(LiteralDfa::new(literal))
    }

    /// The literal being searched.
    pub fn literal(&self) -> &[u8] {
        self.literal.as_slice()
    }

    /// The algorithm chosen for this literal.
    pub fn strategy(&self) -> Strategy {
        match self.searcher {
            Searcher::Empty => Strategy::Empty,
            Searcher::Byte(_) => Strategy::Byte,
            Searcher::Simd(_) => Strategy::Simd,
            Searcher::Dfa(_) => Strategy::Dfa,
            Searcher::Horspool(_) => Strategy::Horspool,
            Searcher::Naive => Strategy::Naive,
        }
    }

    /// Returns the range of the first occurrence of the literal in
    /// `haystack`.
    pub fn find(&self, haystack: &[u8]) -> Option<Range<usize>> {
        let len = self.literal.len();

        let start = match &self.searcher {
            Searcher::Empty => Some(0),
            Searcher::Byte(b) => memchr(*b, haystack),
            Searcher::Simd(dfa) => dfa.find_end(haystack).map(|end| end - len),
            Searcher::Dfa(dfa) => dfa.find_end(haystack).map(|end| end - len),
            Searcher::Horspool(h) => h.find(haystack),
            Searcher::Naive => naive::find(haystack, &self.literal),
        }?;

        Some(start..start + len)
    }

    /// Like [`LiteralSearcher::find`], but the search starts at `from`. The
    /// returned range is relative to the start of `haystack`.
    pub fn find_at(
        &self,
        haystack: &[u8],
        from: usize,
    ) -> Option<Range<usize>> {
        let tail = haystack.get(from..)?;
        self.find(tail).map(|r| r.start + from..r.end + from)
    }

    /// Reference implementation, used for checking that every strategy
    /// produces the same results.
    pub fn find_naive(&self, haystack: &[u8]) -> Option<Range<usize>> {
        naive::find(haystack, &self.literal)
            .map(|start| start..start + self.literal.len())
    }

    /// Searches the literal in `haystack`, reporting the end of the
    /// haystack as the position when it's not found.
    pub fn search(&self, haystack: &[u8]) -> SearchResult {
        match self.find(haystack) {
            Some(range) => SearchResult {
                start: range.start,
                end: range.end,
                found: true,
            },
            None => SearchResult {
                start: haystack.len(),
                end: haystack.len(),
                found: false,
            },
        }
    }
}
