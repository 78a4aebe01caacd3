use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Min-priority buffer that re-serializes out-of-order completions.
///
/// Workers push entries keyed by submission index in whatever order they
/// finish; [`pop`](OrderedBuffer::pop) always returns the entry with the
/// smallest index still buffered. The pipeline's ordering guarantee rests on
/// one rule enforced at the push sites: a worker pushes its entry strictly
/// before it sets its completion signal. The consumer removes exactly one
/// entry per index and only then advances, so by the time it waits on index
/// `i`, all smaller indices have been drained and entry `i` is the minimum.
pub(crate) struct OrderedBuffer<T> {
    heap: BinaryHeap<Entry<T>>,
}

struct Entry<T> {
    index: usize,
    payload: T,
}

// Ordering is by index alone, reversed so the BinaryHeap acts as a min-heap.
impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.index.cmp(&self.index)
    }
}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Entry<T> {}

impl<T> OrderedBuffer<T> {
    pub fn new() -> Self {
        Self { heap: BinaryHeap::new() }
    }

    pub fn push(&mut self, index: usize, payload: T) {
        self.heap.push(Entry { index, payload });
    }

    /// Remove and return the entry with the smallest index.
    pub fn pop(&mut self) -> Option<(usize, T)> {
        self.heap.pop().map(|entry| (entry.index, entry.payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_index_order_regardless_of_push_order() {
        let mut buffer = OrderedBuffer::new();
        for index in [3, 0, 2, 1] {
            buffer.push(index, format!("payload {index}"));
        }
        let drained: Vec<usize> = std::iter::from_fn(|| buffer.pop()).map(|(i, _)| i).collect();
        assert_eq!(drained, vec![0, 1, 2, 3]);
    }

    #[test]
    fn interleaved_push_and_pop_tracks_the_minimum() {
        let mut buffer = OrderedBuffer::new();
        buffer.push(1, "b");
        buffer.push(0, "a");
        assert_eq!(buffer.pop(), Some((0, "a")));
        buffer.push(2, "c");
        assert_eq!(buffer.pop(), Some((1, "b")));
        assert_eq!(buffer.pop(), Some((2, "c")));
        assert_eq!(buffer.pop(), None);
    }

    #[test]
    fn duplicate_indices_are_tolerated() {
        let mut buffer = OrderedBuffer::new();
        buffer.push(0, "first");
        buffer.push(0, "second");
        let (index, _) = buffer.pop().unwrap();
        assert_eq!(index, 0);
        let (index, _) = buffer.pop().unwrap();
        assert_eq!(index, 0);
    }
}
