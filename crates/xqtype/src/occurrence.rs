//! Streamed item-count accounting against an occurrence range.

use crate::types::SequenceType;

/// State after recording an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountState {
    /// The count is still below the upper bound (or exactly at it).
    Open,
    /// The upper bound has been exceeded; no further item can repair it.
    Violated,
}

/// Counts items as they are pulled and checks them against `(min, max)` bounds.
///
/// The counter never looks at the items themselves, so it can decide a cardinality
/// violation before the offending item is type-checked.
#[derive(Debug, Clone, Copy)]
pub struct OccurrenceCounter {
    min: usize,
    max: Option<usize>,
    seen: usize,
}

impl OccurrenceCounter {
    pub fn new(min: usize, max: Option<usize>) -> Self {
        debug_assert!(max.is_none_or(|m| m >= min), "empty occurrence range");
        Self { min, max, seen: 0 }
    }

    pub fn for_sequence_type(t: &SequenceType) -> Self {
        let (min, max) = t.bounds();
        Self::new(min, max)
    }

    pub fn record_item(&mut self) -> CountState {
        self.seen = self.seen.saturating_add(1);
        match self.max {
            Some(max) if self.seen > max => CountState::Violated,
            _ => CountState::Open,
        }
    }

    /// `true` when one more item would exceed the upper bound.
    pub fn is_saturated(&self) -> bool {
        self.max.is_some_and(|max| self.seen >= max)
    }

    /// Final verdict once the sequence is exhausted.
    pub fn finish(&self) -> bool {
        self.seen >= self.min && self.max.is_none_or(|max| self.seen <= max)
    }

    pub fn seen(&self) -> usize {
        self.seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AtomicTypeId, Occurrence};
    use rstest::rstest;

    fn counter(o: Occurrence) -> OccurrenceCounter {
        OccurrenceCounter::for_sequence_type(&SequenceType::atomic(AtomicTypeId::Integer, o))
    }

    fn feed(mut c: OccurrenceCounter, n: usize) -> Option<OccurrenceCounter> {
        for _ in 0..n {
            if c.record_item() == CountState::Violated {
                return None;
            }
        }
        Some(c)
    }

    #[rstest]
    #[case(Occurrence::ExactlyOne, 0, false)]
    #[case(Occurrence::ExactlyOne, 1, true)]
    #[case(Occurrence::ExactlyOne, 2, false)]
    #[case(Occurrence::ZeroOrOne, 0, true)]
    #[case(Occurrence::ZeroOrOne, 2, false)]
    #[case(Occurrence::ZeroOrMore, 0, true)]
    #[case(Occurrence::ZeroOrMore, 40, true)]
    #[case(Occurrence::OneOrMore, 0, false)]
    #[case(Occurrence::OneOrMore, 3, true)]
    fn counts(#[case] o: Occurrence, #[case] n: usize, #[case] expected: bool) {
        assert_eq!(feed(counter(o), n).is_some_and(|c| c.finish()), expected);
    }

    #[test]
    fn empty_sequence_rejects_first_item() {
        let mut c = OccurrenceCounter::for_sequence_type(&SequenceType::Empty);
        assert!(c.is_saturated());
        assert!(c.finish());
        assert_eq!(c.record_item(), CountState::Violated);
    }

    #[test]
    fn saturation_tracks_upper_bound() {
        let mut c = counter(Occurrence::ZeroOrOne);
        assert!(!c.is_saturated());
        assert_eq!(c.record_item(), CountState::Open);
        assert!(c.is_saturated());
        assert_eq!(c.seen(), 1);
        assert!(!counter(Occurrence::OneOrMore).is_saturated());
    }
}
