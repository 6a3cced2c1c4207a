use memchr::memchr;
use memx::memeq;

/// Reference search: finds candidates with `memchr` on the first byte of
/// the literal and compares the rest. The other strategies must always
/// agree with this one.
pub(crate) fn find(haystack: &[u8], literal: &[u8]) -> Option<usize> {
    let Some((first, rest)) = literal.split_first() else {
        return Some(0);
    };

    let mut pos = 0;

    while pos + literal.len() <= haystack.len() {
        let last = haystack.len() - literal.len();
        let candidate = pos + memchr(*first, &haystack[pos..=last])?;
        if memeq(&haystack[candidate + 1..candidate + literal.len()], rest) {
            return Some(candidate);
        }
        pos = candidate + 1;
    }

    None
}

/// Byte by byte search usable in constant contexts, where neither `memchr`
/// nor vector instructions are available.
///
/// Returns the position of the first occurrence of `literal` in
/// `haystack`, or `None`.
///
/// ```
/// const POS: Option<usize> = retrack::find_literal(b"..needle..", b"needle");
/// assert_eq!(POS, Some(2));
/// ```
pub const fn find_literal(haystack: &[u8], literal: &[u8]) -> Option<usize> {
    if literal.len() > haystack.len() {
        return None;
    }
    let mut pos = 0;
    while pos + literal.len() <= haystack.len() {
        let mut i = 0;
        while i < literal.len() && haystack[pos + i] == literal[i] {
            i += 1;
        }
        if i == literal.len() {
            return Some(pos);
        }
        pos += 1;
    }
    None
}
