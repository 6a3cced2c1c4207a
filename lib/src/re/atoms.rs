/*! Single-character matchers.

An [`Atom`] is the smallest building block of a pattern: something that
consumes exactly one character from the input when its predicate holds.
Characters are handled as `u32` code points. Byte inputs are seen through
their Latin-1 view (every byte is the code point with the same value), so
the same atoms work for `&[u8]` and `&str` inputs alike.
*/

use std::fmt::{Debug, Display, Formatter};

use itertools::Itertools;

/// Largest value an atom can be asked to match.
pub(crate) const MAX_CHAR: u32 = u32::MAX;

const NEWLINE: u32 = '\n' as u32;

/// An opaque character classification predicate, like "digit" or a Unicode
/// property.
///
/// The engine never looks inside a class, it only calls its predicate. For
/// that reason classes are treated as "can be anything" by the static
/// analyses.
#[derive(Clone, Copy)]
pub struct Class {
    name: &'static str,
    predicate: fn(u32) -> bool,
}

impl Class {
    /// Creates a class from a name and a predicate.
    pub const fn new(name: &'static str, predicate: fn(u32) -> bool) -> Self {
        Self { name, predicate }
    }

    /// Name given to this class, used only for display purposes.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` if `c` belongs to this class.
    #[inline]
    pub fn is_match(&self, c: u32) -> bool {
        (self.predicate)(c)
    }
}

impl PartialEq for Class {
    /// Classes are equal when they share the name and the predicate.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.predicate as usize == other.predicate as usize
    }
}

impl Debug for Class {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[:{}:]", self.name)
    }
}

#[inline]
fn as_char(c: u32) -> Option<char> {
    char::from_u32(c)
}

/// `[0-9]`
pub fn is_digit(c: u32) -> bool {
    as_char(c).is_some_and(|c| c.is_ascii_digit())
}

/// `[0-9A-Za-z_]`, the predicate used by word boundaries.
pub fn is_word(c: u32) -> bool {
    as_char(c).is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Unicode white space.
pub fn is_space(c: u32) -> bool {
    as_char(c).is_some_and(char::is_whitespace)
}

/// Unicode alphabetic characters.
pub fn is_alpha(c: u32) -> bool {
    as_char(c).is_some_and(char::is_alphabetic)
}

/// Unicode uppercase characters.
pub fn is_upper(c: u32) -> bool {
    as_char(c).is_some_and(char::is_uppercase)
}

/// Unicode lowercase characters.
pub fn is_lower(c: u32) -> bool {
    as_char(c).is_some_and(char::is_lowercase)
}

/// Digits.
pub const DIGIT: Class = Class::new("digit", is_digit);
/// Word characters.
pub const WORD: Class = Class::new("word", is_word);
/// White space.
pub const SPACE: Class = Class::new("space", is_space);
/// Alphabetic characters.
pub const ALPHA: Class = Class::new("alpha", is_alpha);
/// Uppercase characters.
pub const UPPER: Class = Class::new("upper", is_upper);
/// Lowercase characters.
pub const LOWER: Class = Class::new("lower", is_lower);

/// A primitive that matches a single character.
#[derive(Clone, PartialEq)]
pub enum Atom {
    /// Exactly the given character.
    Char(u32),
    /// Any character in the inclusive range.
    Range(u32, u32),
    /// Any of the listed characters.
    Enumeration(Vec<u32>),
    /// Any character matched by at least one of the members.
    Set(Vec<Atom>),
    /// Any character not matched by any of the members.
    NegatedSet(Vec<Atom>),
    /// Any character accepted by the class predicate.
    Class(Class),
    /// Every character. In multiline mode, every character except `\n`.
    Any,
}

impl Atom {
    /// Shorthand for [`Atom::Char`] from a `char`.
    pub fn char(c: char) -> Self {
        Atom::Char(c as u32)
    }

    /// Shorthand for [`Atom::Range`] from two `char`s.
    pub fn range(lo: char, hi: char) -> Self {
        Atom::Range(lo as u32, hi as u32)
    }

    /// Shorthand for [`Atom::Enumeration`] from the characters in a string.
    pub fn enumeration(chars: &str) -> Self {
        Atom::Enumeration(chars.chars().map(|c| c as u32).collect())
    }

    /// Returns `true` if the atom accepts `c`.
    pub fn is_match(&self, c: u32, multiline: bool) -> bool {
        match self {
            Atom::Char(x) => *x == c,
            Atom::Range(lo, hi) => (*lo..=*hi).contains(&c),
            Atom::Enumeration(chars) => chars.contains(&c),
            Atom::Set(members) => {
                members.iter().any(|m| m.is_match(c, multiline))
            }
            Atom::NegatedSet(members) => {
                !members.iter().any(|m| m.is_match(c, multiline))
            }
            Atom::Class(class) => class.is_match(c),
            Atom::Any => !multiline || c != NEWLINE,
        }
    }

    /// Returns the sorted, non-overlapping ranges of characters accepted by
    /// this atom, or `None` if they can't be determined statically because
    /// the atom depends on an opaque class.
    pub(crate) fn ranges(&self, multiline: bool) -> Option<Vec<(u32, u32)>> {
        let ranges = match self {
            Atom::Char(c) => vec![(*c, *c)],
            Atom::Range(lo, hi) if lo <= hi => vec![(*lo, *hi)],
            Atom::Range(_, _) => vec![],
            Atom::Enumeration(chars) => {
                chars.iter().map(|c| (*c, *c)).collect()
            }
            Atom::Set(members) => {
                let mut ranges = Vec::new();
                for member in members {
                    ranges.extend(member.ranges(multiline)?);
                }
                ranges
            }
            Atom::NegatedSet(members) => {
                let mut ranges = Vec::new();
                for member in members {
                    ranges.extend(member.ranges(multiline)?);
                }
                return Some(complement(&normalize(ranges)));
            }
            Atom::Class(_) => return None,
            Atom::Any if multiline => {
                vec![(0, NEWLINE - 1), (NEWLINE + 1, MAX_CHAR)]
            }
            Atom::Any => vec![(0, MAX_CHAR)],
        };
        Some(normalize(ranges))
    }

    /// Returns the only character accepted by this atom, if it accepts a
    /// single one.
    pub(crate) fn single_char(&self) -> Option<u32> {
        match self {
            Atom::Char(c) => Some(*c),
            Atom::Range(lo, hi) if lo == hi => Some(*lo),
            Atom::Enumeration(chars) if chars.iter().all_equal() => {
                chars.first().copied()
            }
            _ => None,
        }
    }
}

/// Sorts ranges and merges the ones that overlap or are adjacent.
pub(crate) fn normalize(mut ranges: Vec<(u32, u32)>) -> Vec<(u32, u32)> {
    ranges.sort_unstable();
    let mut result: Vec<(u32, u32)> = Vec::with_capacity(ranges.len());
    for (lo, hi) in ranges {
        match result.last_mut() {
            Some(last) if lo <= last.1.saturating_add(1) => {
                last.1 = last.1.max(hi);
            }
            _ => result.push((lo, hi)),
        }
    }
    result
}

/// Complement of normalized ranges within `[0, MAX_CHAR]`.
fn complement(ranges: &[(u32, u32)]) -> Vec<(u32, u32)> {
    let mut result = Vec::new();
    let mut next = Some(0_u32);
    for (lo, hi) in ranges {
        if let Some(n) = next {
            if n < *lo {
                result.push((n, lo - 1));
            }
        }
        next = hi.checked_add(1);
    }
    if let Some(n) = next {
        result.push((n, MAX_CHAR));
    }
    result
}

fn fmt_char(f: &mut Formatter<'_>, c: u32) -> std::fmt::Result {
    match char::from_u32(c) {
        Some(ch) if !ch.is_control() => write!(f, "{}", ch.escape_debug()),
        _ => write!(f, "\\x{{{:x}}}", c),
    }
}

impl Display for Atom {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Atom::Char(c) => fmt_char(f, *c),
            Atom::Range(lo, hi) => {
                fmt_char(f, *lo)?;
                write!(f, "-")?;
                fmt_char(f, *hi)
            }
            Atom::Enumeration(chars) => {
                write!(f, "[")?;
                for c in chars {
                    fmt_char(f, *c)?;
                }
                write!(f, "]")
            }
            Atom::Set(members) => {
                write!(f, "[{}]", members.iter().join(""))
            }
            Atom::NegatedSet(members) => {
                write!(f, "[^{}]", members.iter().join(""))
            }
            Atom::Class(class) => write!(f, "{:?}", class),
            Atom::Any => write!(f, "."),
        }
    }
}

impl Debug for Atom {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}
