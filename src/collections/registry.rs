//! `BlockRegistry`: named allocations in a fixed-bucket chained hash table.
//!
//! Each record owns a real range of the registry's arena, carved out by an
//! internal [`FirstFitAllocator`]. Chains are singly linked with the most
//! recently inserted record at the head.

use core::iter::FusedIterator;
use core::ops::Range;

use serde::Serialize;
use tracing::debug;

use crate::alloc::{BlockAllocator, FirstFitAllocator};
use crate::arena::Arena;
use crate::config::SimConfig;
use crate::error::{Result, SimError};

/// A named allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationRecord {
    /// Unique key across the whole table.
    pub key: String,
    /// Requested size in bytes.
    pub size: usize,
    /// Start of the owned arena range.
    pub offset: usize,
    /// Length of the owned arena range.
    pub length: usize,
}

impl AllocationRecord {
    /// The arena range this record owns.
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.length
    }
}

struct Node {
    record: AllocationRecord,
    next: Option<Box<Node>>,
}

/// Bucket for `key`: the running sum of its UTF-8 bytes modulo `bucket_count`.
///
/// For ASCII keys this is the sum of character codes; a non-ASCII character
/// contributes each byte of its encoding rather than its code point.
/// `bucket_count` must be non-zero.
pub fn bucket_index(key: &str, bucket_count: usize) -> usize {
    key.bytes().fold(0, |hash, b| (hash + usize::from(b)) % bucket_count)
}

/// Records of one bucket, head first.
#[derive(Clone)]
pub struct Chain<'a> {
    next: Option<&'a Node>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a AllocationRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.next.as_deref();
        Some(&node.record)
    }
}

impl FusedIterator for Chain<'_> {}

/// Chained hash table from string keys to arena-backed allocation records.
///
/// Duplicate keys are rejected; the table never shadows one record with
/// another of the same key.
pub struct BlockRegistry {
    buckets: Vec<Option<Box<Node>>>,
    len: usize,
    arena: Arena,
    backing: FirstFitAllocator,
}

impl BlockRegistry {
    /// Creates an empty registry with `bucket_count` buckets over an arena of
    /// `arena_capacity` bytes.
    ///
    /// # Errors
    /// `InvalidParameter` if either value is zero.
    pub fn new(bucket_count: usize, arena_capacity: usize) -> Result<Self> {
        if bucket_count == 0 {
            return Err(SimError::invalid("bucket_count", bucket_count));
        }
        let mut buckets = Vec::with_capacity(bucket_count);
        buckets.resize_with(bucket_count, || None);

        Ok(Self {
            buckets,
            len: 0,
            arena: Arena::new(arena_capacity)?,
            backing: FirstFitAllocator::new(arena_capacity)?,
        })
    }

    /// Creates a registry sized by `config`.
    ///
    /// # Errors
    /// See [`BlockRegistry::new`].
    pub fn from_config(config: &SimConfig) -> Result<Self> {
        Self::new(config.bucket_count, config.arena_capacity)
    }

    /// Number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reserves `size` bytes of the arena under `key`.
    ///
    /// # Errors
    /// `InvalidParameter` for a zero size. `AllocationFailed` if the key is
    /// already present or the arena has no free range large enough.
    pub fn insert(&mut self, key: &str, size: usize) -> Result<()> {
        if size == 0 {
            return Err(SimError::invalid("size", size));
        }
        if self.lookup(key).is_some() {
            return Err(SimError::AllocationFailed { key: key.to_owned(), reason: "duplicate key".to_owned() });
        }

        let allocation = self.backing.allocate(size).map_err(|err| SimError::AllocationFailed {
            key: key.to_owned(),
            reason: err.to_string(),
        })?;

        let index = bucket_index(key, self.buckets.len());
        let record = AllocationRecord {
            key: key.to_owned(),
            size,
            offset: allocation.offset,
            length: allocation.granted,
        };
        let next = self.buckets[index].take();
        self.buckets[index] = Some(Box::new(Node { record, next }));
        self.len += 1;

        debug!(key, size, bucket = index, offset = allocation.offset, "registry insert");
        Ok(())
    }

    /// Finds the record stored under `key`.
    pub fn lookup(&self, key: &str) -> Option<&AllocationRecord> {
        let index = bucket_index(key, self.buckets.len());
        self.chain(index).find(|record| record.key == key)
    }

    /// Unlinks the record stored under `key` and releases its arena range.
    ///
    /// # Errors
    /// `NotFound` if no record has that key.
    pub fn remove(&mut self, key: &str) -> Result<AllocationRecord> {
        let index = bucket_index(key, self.buckets.len());
        let record = unlink(&mut self.buckets[index], key)
            .ok_or_else(|| SimError::NotFound(format!("no record with key `{key}`")))?;
        self.len -= 1;

        self.arena.clear(record.range());
        self.backing.free(record.offset)?;

        debug!(key, bucket = index, offset = record.offset, "registry remove");
        Ok(record)
    }

    /// Every record as `(bucket_index, record)`, by bucket and then chain order.
    pub fn list_all(&self) -> Vec<(usize, &AllocationRecord)> {
        self.buckets().flat_map(|(index, chain)| chain.map(move |record| (index, record))).collect()
    }

    /// Each bucket index with its chain, including empty buckets.
    pub fn buckets(&self) -> impl Iterator<Item = (usize, Chain<'_>)> + '_ {
        (0..self.buckets.len()).map(move |index| (index, self.chain(index)))
    }

    /// The arena bytes owned by `key`.
    pub fn bytes(&self, key: &str) -> Option<&[u8]> {
        let range = self.lookup(key)?.range();
        self.arena.slice(range)
    }

    /// Mutable arena bytes owned by `key`.
    pub fn bytes_mut(&mut self, key: &str) -> Option<&mut [u8]> {
        let range = self.lookup(key)?.range();
        self.arena.slice_mut(range)
    }

    /// Bytes of the arena not owned by any record.
    pub fn free_bytes(&self) -> usize {
        self.backing.free_bytes()
    }

    fn chain(&self, index: usize) -> Chain<'_> {
        Chain { next: self.buckets.get(index).and_then(|head| head.as_deref()) }
    }
}

fn unlink(mut link: &mut Option<Box<Node>>, key: &str) -> Option<AllocationRecord> {
    while link.as_ref().is_some_and(|node| node.record.key != key) {
        link = &mut link.as_mut()?.next;
    }
    let node = link.take()?;
    let Node { record, next } = *node;
    *link = next;
    Some(record)
}

impl Drop for BlockRegistry {
    fn drop(&mut self) {
        // Unlink iteratively so long chains don't recurse in `Box` drop.
        for bucket in &mut self.buckets {
            let mut link = bucket.take();
            while let Some(mut node) = link {
                link = node.next.take();
            }
        }
    }
}

impl core::fmt::Debug for BlockRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.buckets().map(|(index, chain)| (index, chain.collect::<Vec<_>>()))).finish()
    }
}
