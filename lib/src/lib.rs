/*! A backtracking pattern matching engine with fast literal search.

Patterns are not parsed from text. They are trees of typed nodes built with
a [`PatternBuilder`]: characters, ranges, sets and classes, literal
strings, sequences, ordered alternations, greedy, lazy and possessive
repetitions, numbered and named captures, back references, lookaheads,
anchors and word boundaries.

A [`Pattern`] is prepared into a [`Regex`], which optimizes the tree and
runs the static analyses that speed up evaluation: FIRST sets that turn
greedy repetitions into possessive ones and skip alternation branches that
can't match, length limits and anchors that reduce the number of start
positions tried, and a literal prefix that is located with a
[`LiteralSearcher`].

The [`LiteralSearcher`] is also usable on its own. Depending on the length
of the literal it uses `memchr`, a KMP automaton with a compressed
alphabet (walked with SIMD byte shuffles when the automaton is small
enough), Boyer-Moore-Horspool, or a naive scan. All of them find exactly
the same occurrences.

# Example

```rust
use retrack::{PatternBuilder, Regex};

// (\w+)@(\w+)
let mut b = PatternBuilder::new();
let word = b.class(retrack::atoms::WORD);
let user = b.plus(word);
let host = b.plus(word);
let user = b.capture(1, user);
let at = b.char('@');
let host = b.capture(2, host);
let root = b.sequence([user, at, host]);

let regex = Regex::new(b.build(root).unwrap()).unwrap();
let captures = regex.search_str("mail to alice@example now");

assert!(captures.is_match());
assert_eq!(captures.get(1), Some(8..13));
assert_eq!(captures.get(2), Some(14..21));
```
*/

#![deny(missing_docs)]

pub use config::load_config_from_file;
pub use config::Config;
pub use config::EvalConfig;
pub use config::SearchConfig;

pub use re::atoms;
pub use re::atoms::Atom;
pub use re::atoms::Class;

pub use re::backtrack::Captures;

pub use re::limits::Count;
pub use re::limits::Limits;

pub use re::literal::find_literal;
pub use re::literal::ByteClasses;
pub use re::literal::LiteralSearcher;
pub use re::literal::SearchResult;
pub use re::literal::Strategy;

pub use re::pattern::Node;
pub use re::pattern::NodeId;
pub use re::pattern::Pattern;
pub use re::pattern::PatternBuilder;
pub use re::pattern::RepeatMode;

pub use re::Error;

pub use regex::ForwardRegex;
pub use regex::Regex;

mod config;
mod re;
mod regex;

#[cfg(test)]
mod tests;
