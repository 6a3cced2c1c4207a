use memx::memeq;

/// Boyer-Moore-Horspool search for literals of length 2 or more.
///
/// The literal is compared against a window of the haystack starting by its
/// last byte. After a mismatch the window is shifted according to the last
/// byte in the window: by the distance from the last occurrence of that
/// byte in the literal (excluding the literal's last position) to the end
/// of the literal, or by the whole literal length if the byte doesn't
/// appear in it.
#[derive(Debug)]
pub(crate) struct Horspool {
    literal: Vec<u8>,
    shift: [usize; 256],
}

impl Horspool {
    pub fn new(literal: &[u8]) -> Self {
        debug_assert!(literal.len() >= 2);

        let len = literal.len();
        let mut shift = [len; 256];

        for (i, b) in literal[..len - 1].iter().enumerate() {
            shift[*b as usize] = len - 1 - i;
        }

        Self { literal: literal.to_vec(), shift }
    }

    /// Returns the position of the first occurrence of the literal in
    /// `haystack`.
    pub fn find(&self, haystack: &[u8]) -> Option<usize> {
        let len = self.literal.len();
        let last = self.literal[len - 1];
        let mut pos = 0;

        while pos + len <= haystack.len() {
            let window_last = haystack[pos + len - 1];
            let window = &haystack[pos..pos + len - 1];
            if window_last == last && memeq(window, &self.literal[..len - 1])
            {
                return Some(pos);
            }
            pos += self.shift[window_last as usize];
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::Horspool;

    #[test]
    fn shifts() {
        let h = Horspool::new(b"abcab");
        assert_eq!(h.shift[b'a' as usize], 1);
        assert_eq!(h.shift[b'b' as usize], 3);
        assert_eq!(h.shift[b'c' as usize], 2);
        assert_eq!(h.shift[b'x' as usize], 5);
    }

    #[test]
    fn find() {
        let h = Horspool::new(b"abcab");
        assert_eq!(h.find(b"abcabcab"), Some(0));
        assert_eq!(h.find(b"xxabcxabcab"), Some(6));
        assert_eq!(h.find(b"abcaxabca"), None);
        assert_eq!(h.find(b"ab"), None);
    }
}
