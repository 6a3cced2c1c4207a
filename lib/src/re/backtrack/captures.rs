use std::ops::Range;

use smallvec::SmallVec;

/// State of a single capture group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Slot {
    /// Position where the capture was last entered.
    pending: Option<usize>,
    /// Last completed capture.
    closed: Option<(usize, usize)>,
}

/// Positions recorded while matching a pattern.
///
/// Capture 0 is the whole match, delimited by the start and end marks.
/// Captures `1..=capture_count` correspond to the capture groups in the
/// pattern. A group that didn't participate in the match is `None`, which
/// is not the same as a group that matched the empty string.
///
/// ```
/// # use retrack::{PatternBuilder, Regex};
/// let mut b = PatternBuilder::new();
/// let a = b.char('a');
/// let cap = b.capture(1, a);
/// let tail = b.char('b');
/// let root = b.sequence([cap, tail]);
/// let regex = Regex::new(b.build(root).unwrap()).unwrap();
///
/// let captures = regex.match_str("ab");
/// assert!(captures.is_match());
/// assert_eq!(captures.get(0), Some(0..2));
/// assert_eq!(captures.get(1), Some(0..1));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Captures {
    start: Option<usize>,
    end: Option<usize>,
    slots: SmallVec<[Slot; 4]>,
    matched: bool,
}

impl Captures {
    /// Creates a record for a pattern with `capture_count` groups.
    pub fn new(capture_count: usize) -> Self {
        Self {
            start: None,
            end: None,
            slots: SmallVec::from_elem(Slot::default(), capture_count),
            matched: false,
        }
    }

    /// Records the position where the whole match starts.
    pub fn set_start_mark(&mut self, pos: usize) {
        self.start = Some(pos);
    }

    /// Records the position where the whole match ends.
    pub fn set_end_mark(&mut self, pos: usize) {
        self.end = Some(pos);
    }

    /// Records that the capture `id` was entered at `pos`. The previous
    /// value of the capture, if any, is kept until the capture is closed.
    ///
    /// # Panics
    ///
    /// If `id` is 0 or greater than the number of captures.
    pub fn start_capture(&mut self, id: usize, pos: usize) {
        self.slots[id - 1].pending = Some(pos);
    }

    /// Records that the capture `id` ends at `pos`.
    ///
    /// # Panics
    ///
    /// If `id` is 0 or greater than the number of captures.
    pub fn end_capture(&mut self, id: usize, pos: usize) {
        let slot = &mut self.slots[id - 1];
        if let Some(start) = slot.pending {
            slot.closed = Some((start, pos));
        }
    }

    /// Flags the record as the result of a successful match.
    pub fn matched(&mut self) {
        self.matched = true;
    }

    /// Clears the flag set by [`Captures::matched`], keeping the positions.
    pub fn unmatch(&mut self) {
        self.matched = false;
    }

    /// Returns `true` if the record is the result of a successful match.
    pub fn is_match(&self) -> bool {
        self.matched
    }

    /// Range of the capture `id`, or of the whole match if `id` is 0.
    /// Returns `None` for captures that don't exist or were not set.
    pub fn get(&self, id: usize) -> Option<Range<usize>> {
        if id == 0 {
            return self.range();
        }
        let (start, end) = self.slots.get(id - 1)?.closed?;
        Some(start..end)
    }

    /// Range of the whole match.
    pub fn range(&self) -> Option<Range<usize>> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(start..end),
            _ => None,
        }
    }

    /// Number of captures, including the whole match.
    pub fn len(&self) -> usize {
        self.slots.len() + 1
    }

    /// Always `false`, the whole match is always part of the record.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterates over all the captures, starting with the whole match.
    pub fn iter(&self) -> impl Iterator<Item = Option<Range<usize>>> + '_ {
        (0..self.len()).map(|id| self.get(id))
    }
}
