// nettick - Tick-driven TCP application host over a pluggable wire protocol
// Copyright (C) 2026  nettick contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::collections::BTreeMap;

use bytes::BytesMut;

/// Contract for a type that can be recycled through a [`Pool`].
///
/// `reset` clears mutable fields before the instance is stored back for
/// reuse; it must not be relied upon to run destructors for heap data that
/// should actually be freed (use `Default::default()` for that).
pub trait Poolable: Default {
    fn reset(&mut self);
}

/// Single-type object pool.
///
/// Unbounded, grows on demand, no internal synchronization: pools are
/// owned by the tick thread and never touched concurrently.
pub struct Pool<T: Poolable> {
    free: Vec<Box<T>>,
}

impl<T: Poolable> Pool<T> {
    pub fn new() -> Self {
        Self { free: Vec::new() }
    }

    /// Returns a recycled instance if one is available, otherwise
    /// allocates a fresh zeroed (`Default`) one.
    pub fn take(&mut self) -> Box<T> {
        self.free.pop().unwrap_or_default()
    }

    /// Clears the instance and stores it for reuse. Callers must not
    /// reference `item` after this call; ownership has moved to the pool.
    pub fn give(&mut self, mut item: Box<T>) {
        item.reset();
        self.free.push(item);
    }

    /// Number of instances currently held in reserve. Used by tests to
    /// assert resource conservation.
    pub fn inventory(&self) -> usize {
        self.free.len()
    }

    /// Allocates `count` fresh instances up front so the first ticks
    /// under load don't pay allocation cost. A no-op if `count` is
    /// already covered by what's in reserve.
    pub fn prewarm(&mut self, count: usize) {
        while self.free.len() < count {
            self.free.push(Box::default());
        }
    }
}

impl<T: Poolable> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A checked-out byte buffer. Callers write into `bytes_mut()` and return
/// it to the [`BufferPool`] it came from exactly once.
pub struct PooledBuffer {
    data: BytesMut,
}

impl PooledBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
        }
    }

    pub fn bytes_mut(&mut self) -> &mut BytesMut {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    fn clear(&mut self) {
        self.data.clear();
    }

    /// Hands the buffer's contents to the send path. The capacity is kept
    /// so the pool can manufacture a same-sized replacement once the send
    /// completes (see [`BufferPool::reclaim`]).
    pub(crate) fn into_bytes(self) -> (bytes::Bytes, usize) {
        let capacity = self.data.capacity();
        (self.data.freeze(), capacity)
    }
}

/// Byte-buffer pool keyed by minimum capacity.
///
/// `take` returns the smallest free buffer that satisfies `min_size`, or
/// allocates a new one. Buffers handed to the async send path are never
/// referenced again after release; the pool manufactures a fresh buffer of
/// the same capacity on reclaim rather than attempting to recover the
/// original allocation from the in-flight `Bytes` (the `bytes` crate does
/// not guarantee a cheap reverse conversion once a clone may have been
/// taken by the codec, and recovery is not worth undefined behavior).
pub struct BufferPool {
    buckets: BTreeMap<usize, Vec<PooledBuffer>>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self {
            buckets: BTreeMap::new(),
        }
    }

    pub fn take(&mut self, min_size: usize) -> PooledBuffer {
        if let Some((_, bucket)) = self.buckets.range_mut(min_size..).next() {
            if let Some(mut buf) = bucket.pop() {
                buf.clear();
                return buf;
            }
        }

        PooledBuffer::with_capacity(min_size)
    }

    pub fn give(&mut self, mut buf: PooledBuffer) {
        buf.clear();
        let key = buf.capacity();
        self.buckets.entry(key).or_insert_with(Vec::new).push(buf);
    }

    /// Reclaims a buffer of `capacity` bytes after an async send
    /// completed. See the struct docs for why this allocates fresh rather
    /// than reclaiming the original storage.
    pub fn reclaim(&mut self, capacity: usize) {
        self.give(PooledBuffer::with_capacity(capacity));
    }

    pub fn inventory(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Scratch {
        value: u32,
    }

    impl Poolable for Scratch {
        fn reset(&mut self) {
            self.value = 0;
        }
    }

    #[test]
    fn pool_reuses_returned_instances() {
        let mut pool: Pool<Scratch> = Pool::new();

        let mut a = pool.take();
        a.value = 42;
        pool.give(a);

        assert_eq!(pool.inventory(), 1);

        let b = pool.take();
        assert_eq!(b.value, 0, "returned instance must be cleared");
        assert_eq!(pool.inventory(), 0);
    }

    #[test]
    fn prewarm_fills_reserve_to_the_requested_count() {
        let mut pool: Pool<Scratch> = Pool::new();

        pool.prewarm(5);
        assert_eq!(pool.inventory(), 5);

        pool.prewarm(3);
        assert_eq!(pool.inventory(), 5, "prewarm never shrinks the reserve");
    }

    #[test]
    fn buffer_pool_satisfies_minimum_size() {
        let mut pool = BufferPool::new();

        let buf = pool.take(128);
        assert!(buf.capacity() >= 128);

        pool.give(buf);
        assert_eq!(pool.inventory(), 1);

        let buf2 = pool.take(64);
        assert!(buf2.capacity() >= 64);
        assert_eq!(pool.inventory(), 0);
    }
}
