//! Bounded best-K candidate set.
//!
//! A max-heap on `(score, arrival)` holds at most `k` entries, so the root is
//! always the entry that would be dropped next:
//!
//! - while filling, every candidate is admitted
//! - once full, a candidate is admitted only if it scores strictly lower than
//!   the root, which is then evicted
//!
//! Among equal scores the earlier arrival always wins, which matches keeping a
//! stable-sorted list and truncating it to `k` after every insert.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::domain::Candidate;

#[derive(Debug)]
struct Entry {
    seq: u64,
    candidate: Candidate,
}

impl Entry {
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.candidate
            .score
            .total_cmp(&other.candidate.score)
            .then(self.seq.cmp(&other.seq))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key_cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key_cmp(other)
    }
}

#[derive(Debug)]
pub struct CandidateSet {
    k: usize,
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

impl CandidateSet {
    /// A set keeping the best `k` candidates (`k == 0` keeps nothing).
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(1 << 16)),
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Offer a candidate; returns `true` if it was admitted.
    pub fn offer(&mut self, candidate: Candidate) -> bool {
        let seq = self.next_seq;
        self.next_seq += 1;
        if self.k == 0 {
            return false;
        }

        if self.heap.len() < self.k {
            self.heap.push(Entry { seq, candidate });
            return true;
        }

        let admit = self
            .heap
            .peek()
            .is_some_and(|worst| candidate.score.total_cmp(&worst.candidate.score) == Ordering::Less);
        if admit {
            self.heap.pop();
            self.heap.push(Entry { seq, candidate });
        }
        admit
    }

    /// Candidates ordered best first (ascending score, then arrival).
    pub fn into_sorted_vec(self) -> Vec<Candidate> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|e| e.candidate)
            .collect()
    }
}
