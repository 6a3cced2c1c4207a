/*! A backtracking engine that evaluates pattern trees directly.

Unlike automata based engines, the backtracking engine supports back
references and lookaheads, and reports the positions of every capture. In
exchange, some patterns can take time exponential in the length of the
input. FIRST-set based optimizations computed when the pattern is prepared
reduce the amount of backtracking for the most common cases, like turning
`a*b` into a possessive repetition, but don't remove the worst cases.

The depth of the recursion grows with the number of iterations of greedy
and lazy repetitions, so very long inputs can exhaust the call stack.
*/

pub use captures::Captures;

pub(crate) use cursor::{
    Bidirectional, ByteCursor, Cursor, IterCursor, StrCursor,
};
pub(crate) use evaluator::{Anchoring, Evaluator};

mod captures;
mod cursor;
mod evaluator;
