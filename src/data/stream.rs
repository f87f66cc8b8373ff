//! Iterator adaptors for training input pipelines.
//!
//! These mirror the usual dataset combinators:
//!
//! - `shuffled(buffer, rng)`: bounded-buffer shuffle
//! - `batched(size)`: fixed-size batches, remainder dropped
//! - `repeat_epochs(factory)`: restart a source indefinitely

use rand::Rng;

/// Bounded-buffer shuffle.
///
/// Keeps up to `capacity` items; each output is drawn uniformly from the buffer
/// and its slot is refilled from the source. With a buffer at least as large as
/// the source this is a full uniform shuffle.
pub struct Shuffled<I: Iterator, R> {
    inner: I,
    buffer: Vec<I::Item>,
    capacity: usize,
    rng: R,
    exhausted: bool,
}

impl<I: Iterator, R: Rng> Iterator for Shuffled<I, R> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.exhausted && self.buffer.len() < self.capacity {
            match self.inner.next() {
                Some(item) => self.buffer.push(item),
                None => self.exhausted = true,
            }
        }
        if self.buffer.is_empty() {
            return None;
        }
        let idx = self.rng.gen_range(0..self.buffer.len());
        let refill = if self.exhausted { None } else { self.inner.next() };
        match refill {
            Some(item) => Some(std::mem::replace(&mut self.buffer[idx], item)),
            None => {
                self.exhausted = true;
                Some(self.buffer.swap_remove(idx))
            }
        }
    }
}

/// Fixed-size batches; a trailing partial batch is dropped.
#[derive(Debug)]
pub struct Batched<I> {
    inner: I,
    size: usize,
}

impl<I: Iterator> Iterator for Batched<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.size == 0 {
            return None;
        }
        let batch: Vec<I::Item> = self.inner.by_ref().take(self.size).collect();
        (batch.len() == self.size).then_some(batch)
    }
}

pub trait StreamExt: Iterator + Sized {
    /// Shuffle through a buffer of `capacity` items (minimum 1).
    fn shuffled<R: Rng>(self, capacity: usize, rng: R) -> Shuffled<Self, R> {
        Shuffled {
            inner: self,
            buffer: Vec::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
            rng,
            exhausted: false,
        }
    }

    /// Group into batches of `size`. A size of 0 yields nothing.
    fn batched(self, size: usize) -> Batched<Self> {
        Batched { inner: self, size }
    }
}

impl<I: Iterator> StreamExt for I {}

/// Endless repetition of a source rebuilt by `factory(epoch)` for each epoch.
pub struct RepeatEpochs<F, I> {
    factory: F,
    current: Option<I>,
    epoch: u64,
    yielded: bool,
}

/// Repeat the epochs produced by `factory` forever.
///
/// Stops only if an epoch yields nothing, so an empty source does not spin.
pub fn repeat_epochs<F, I>(factory: F) -> RepeatEpochs<F, I>
where
    F: FnMut(u64) -> I,
    I: Iterator,
{
    RepeatEpochs {
        factory,
        current: None,
        epoch: 0,
        yielded: false,
    }
}

impl<F, I> Iterator for RepeatEpochs<F, I>
where
    F: FnMut(u64) -> I,
    I: Iterator,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                self.current = Some((self.factory)(self.epoch));
                self.epoch += 1;
                self.yielded = false;
            }
            let current = self.current.as_mut()?;
            match current.next() {
                Some(item) => {
                    self.yielded = true;
                    return Some(item);
                }
                None if !self.yielded => {
                    self.current = None;
                    return None;
                }
                None => self.current = None,
            }
        }
    }
}
