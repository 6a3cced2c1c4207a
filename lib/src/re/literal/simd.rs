/*! Vectorized walk of small literal DFAs.

When a literal DFA has at most 16 states, the transitions for each byte
class fit in a single 16-byte vector `T` where `T[s]` is the state reached
from state `s`. Composing transitions is then a byte shuffle: if `V[s]` is
the state reached from `s` after some bytes, `shuffle(T, V)` gives the
state reached after those bytes followed by one more of class `T`. Starting
from the identity vector and composing the vectors for a block of 16 bytes
yields, in a single register, the outcome of the block for all the 16
possible starting states at once. The actual state is looked up in that
vector at the end of each block.

Lanes beyond the last state map to themselves, so the shuffles never
produce out of range state ids.

The vector path needs SSSE3 on x86_64. Elsewhere, or when the CPU doesn't
support it, the same transition vectors are walked byte by byte.
*/

#[cfg(all(target_arch = "x86_64", feature = "simd"))]
use std::arch::x86_64::{
    __m128i, _mm_loadu_si128, _mm_setr_epi8, _mm_shuffle_epi8,
    _mm_storeu_si128,
};

#[cfg(all(target_arch = "x86_64", feature = "simd"))]
use lazy_static::lazy_static;

use crate::re::literal::classes::ByteClasses;
use crate::re::literal::dfa::Dfa;

/// Maximum number of DFA states supported by the vectorized walk.
pub(crate) const MAX_STATES: usize = 16;

#[cfg(all(target_arch = "x86_64", feature = "simd"))]
lazy_static! {
    static ref SSSE3_AVAILABLE: bool = is_x86_feature_detected!("ssse3");
}

/// Returns `true` if the vectorized walk can be used on this machine.
pub(crate) fn is_available() -> bool {
    #[cfg(all(target_arch = "x86_64", feature = "simd"))]
    {
        *SSSE3_AVAILABLE
    }
    #[cfg(not(all(target_arch = "x86_64", feature = "simd")))]
    {
        false
    }
}

#[derive(Debug)]
pub(crate) struct SimdDfa {
    classes: ByteClasses,
    /// One transition vector per byte class.
    vectors: Vec<[u8; 16]>,
    /// Accepting state, equal to the literal length.
    accept: usize,
}

impl SimdDfa {
    /// Builds the transition vectors from a DFA. Returns `None` if the DFA
    /// has more than [`MAX_STATES`] states, or more than `max_states` if
    /// that limit is lower.
    pub fn new(dfa: &Dfa<u8>, max_states: usize) -> Option<Self> {
        let states = dfa.states();

        if states > MAX_STATES.min(max_states) {
            return None;
        }

        let classes = dfa.classes().clone();
        let mut vectors = Vec::with_capacity(classes.len());

        for class in 0..classes.len() {
            let mut vector = [0_u8; 16];
            for (state, lane) in vector.iter_mut().enumerate() {
                *lane = if state < states {
                    dfa.transition(state, class) as u8
                } else {
                    state as u8
                };
            }
            vectors.push(vector);
        }

        Some(Self { classes, vectors, accept: states - 1 })
    }

    /// Returns the position right after the first occurrence of the literal
    /// in `haystack`.
    pub fn find_end(&self, haystack: &[u8]) -> Option<usize> {
        #[cfg(all(target_arch = "x86_64", feature = "simd"))]
        {
            if is_available() {
                // SAFETY: SSSE3 support was checked at runtime.
                return unsafe { self.find_end_ssse3(haystack) };
            }
        }
        self.walk(0, haystack).err()
    }

    #[inline(always)]
    fn next(&self, state: u8, b: u8) -> u8 {
        self.vectors[self.classes.get(b) as usize][state as usize]
    }

    /// Walks `bytes` starting at `state`. Returns `Ok` with the final state
    /// if the accepting state is never reached, or `Err` with the position
    /// right after the byte that reached it.
    fn walk(&self, mut state: u8, bytes: &[u8]) -> Result<u8, usize> {
        for (i, b) in bytes.iter().enumerate() {
            state = self.next(state, *b);
            if state as usize >= self.accept {
                return Err(i + 1);
            }
        }
        Ok(state)
    }

    #[cfg(all(target_arch = "x86_64", feature = "simd"))]
    #[target_feature(enable = "ssse3")]
    unsafe fn find_end_ssse3(&self, haystack: &[u8]) -> Option<usize> {
        let identity = _mm_setr_epi8(
            0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15,
        );

        let mut state = 0_u8;
        let mut offset = 0;
        let mut chunks = haystack.chunks_exact(16);
        let mut lanes = [0_u8; 16];

        for chunk in &mut chunks {
            let mut v = identity;
            for b in chunk {
                let t = _mm_loadu_si128(
                    self.vectors[self.classes.get(*b) as usize].as_ptr()
                        as *const __m128i,
                );
                v = _mm_shuffle_epi8(t, v);
            }

            _mm_storeu_si128(lanes.as_mut_ptr() as *mut __m128i, v);

            let next = lanes[state as usize];

            if next as usize >= self.accept {
                return self.walk(state, chunk).err().map(|end| offset + end);
            }

            state = next;
            offset += 16;
        }

        self.walk(state, chunks.remainder()).err().map(|end| offset + end)
    }
}
