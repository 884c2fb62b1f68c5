//! K-way merge over sorted runs

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::error::Result;

use super::run::RunReader;

/// One input of the merge; lower index means put earlier
enum Source<'a> {
    Run(RunReader),
    Memory(std::slice::Iter<'a, (Vec<u8>, Vec<u8>)>),
}

impl Source<'_> {
    fn next_pair(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        match self {
            Source::Run(reader) => reader.next_pair(),
            Source::Memory(iter) => Ok(iter.next().cloned()),
        }
    }
}

struct HeapItem {
    key: Vec<u8>,
    value: Vec<u8>,
    source: usize,
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapItem {}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapItem {
    // Ties on key go to the earlier source, which keeps the merge stable
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.source.cmp(&other.source))
    }
}

/// Lazy ascending iterator produced by [`super::ExternalSorter::sort`]
pub struct SortedIter<'a> {
    sources: Vec<Source<'a>>,
    heap: BinaryHeap<Reverse<HeapItem>>,
    dedupe: bool,
    failed: bool,
}

impl<'a> SortedIter<'a> {
    pub(super) fn new(
        runs: Vec<RunReader>,
        memory: &'a [(Vec<u8>, Vec<u8>)],
        dedupe: bool,
    ) -> Result<Self> {
        let mut sources: Vec<Source<'a>> = runs.into_iter().map(Source::Run).collect();
        sources.push(Source::Memory(memory.iter()));

        let mut iter = Self {
            heap: BinaryHeap::with_capacity(sources.len()),
            sources,
            dedupe,
            failed: false,
        };
        for source in 0..iter.sources.len() {
            iter.refill(source)?;
        }
        Ok(iter)
    }

    /// Pull the next pair of `source` into the heap
    fn refill(&mut self, source: usize) -> Result<()> {
        if let Some((key, value)) = self.sources[source].next_pair()? {
            self.heap.push(Reverse(HeapItem { key, value, source }));
        }
        Ok(())
    }

    fn pop(&mut self) -> Result<Option<HeapItem>> {
        let Some(Reverse(item)) = self.heap.pop() else {
            return Ok(None);
        };
        self.refill(item.source)?;
        Ok(Some(item))
    }

    fn next_item(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let Some(mut current) = self.pop()? else {
            return Ok(None);
        };

        if self.dedupe {
            // Later duplicates replace earlier ones: last write wins
            while matches!(self.heap.peek(), Some(Reverse(next)) if next.key == current.key) {
                if let Some(next) = self.pop()? {
                    current = next;
                }
            }
        }

        Ok(Some((current.key, current.value)))
    }
}

impl Iterator for SortedIter<'_> {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_item() {
            Ok(Some(pair)) => Some(Ok(pair)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
