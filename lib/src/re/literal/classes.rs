/*! Byte equivalence classes.

Two bytes belong to the same class when no character test in a pattern can
tell them apart. DFA transition tables are indexed by class instead of by
byte, which shrinks their rows from 256 entries to the number of classes.

Classes are computed by partition refinement: the table starts with every
byte in a single class, and each set of bytes a pattern can test for splits
the classes that have members both inside and outside the set.
*/

use bitvec::array::BitArray;

use crate::re::atoms::Atom;
use crate::re::pattern::{Node, Pattern};

/// A set of byte values.
pub(crate) type ByteSet = BitArray<[u64; 4]>;

/// Maps every byte value to an equivalence class id.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ByteClasses {
    map: [u8; 256],
    count: usize,
}

impl Default for ByteClasses {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteClasses {
    /// All bytes in a single class.
    pub fn new() -> Self {
        Self { map: [0; 256], count: 1 }
    }

    /// Classes for searching a literal: one class per distinct byte in the
    /// literal, plus a class for every other byte if there's any.
    pub fn for_literal(literal: &[u8]) -> Self {
        let mut classes = Self::new();
        for b in literal {
            let mut set = ByteSet::ZERO;
            set.set(*b as usize, true);
            classes.refine(&set);
        }
        classes
    }

    /// Classes that distinguish every byte set tested by the pattern, with
    /// inputs seen as bytes.
    pub fn for_pattern(pattern: &Pattern, multiline: bool) -> Self {
        let mut classes = Self::new();
        let mut newline = ByteSet::ZERO;
        newline.set(b'\n' as usize, true);

        for id in pattern.reachable() {
            match pattern.node(id) {
                Node::Atom(atom)
                | Node::Boundary(atom)
                | Node::NotBoundary(atom) => {
                    classes.refine(&Self::atom_set(atom, multiline))
                }
                Node::String(chars) => {
                    for c in chars.iter().filter(|c| **c < 256) {
                        let mut set = ByteSet::ZERO;
                        set.set(*c as usize, true);
                        classes.refine(&set);
                    }
                }
                Node::LineBegin | Node::LineEnd if multiline => {
                    classes.refine(&newline)
                }
                _ => {}
            }
        }

        classes
    }

    fn atom_set(atom: &Atom, multiline: bool) -> ByteSet {
        let mut set = ByteSet::ZERO;
        for b in 0..256_u32 {
            if atom.is_match(b, multiline) {
                set.set(b as usize, true);
            }
        }
        set
    }

    /// Splits every class that has bytes both inside and outside `set`.
    pub(crate) fn refine(&mut self, set: &ByteSet) {
        let mut inside = [0_u16; 256];
        let mut total = [0_u16; 256];

        for b in 0..256 {
            let class = self.map[b] as usize;
            total[class] += 1;
            if set[b] {
                inside[class] += 1;
            }
        }

        let mut split: [Option<u8>; 256] = [None; 256];

        for b in 0..256 {
            let class = self.map[b] as usize;
            if !set[b] || inside[class] == total[class] {
                continue;
            }
            let new_class = match split[class] {
                Some(new_class) => new_class,
                None => {
                    // At most 256 classes, ids always fit in a u8.
                    let new_class = self.count as u8;
                    self.count += 1;
                    split[class] = Some(new_class);
                    new_class
                }
            };
            self.map[b] = new_class;
        }
    }

    /// Class of a byte.
    #[inline]
    pub fn get(&self, b: u8) -> u8 {
        self.map[b as usize]
    }

    /// Number of classes.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if every byte is in the same class.
    pub fn is_singleton(&self) -> bool {
        self.count == 1
    }

    /// One byte from each class, in class id order.
    pub fn representatives(&self) -> Vec<u8> {
        let mut result = vec![None; self.count];
        for b in 0..=255_u8 {
            result[self.get(b) as usize].get_or_insert(b);
        }
        result.into_iter().flatten().collect()
    }
}
