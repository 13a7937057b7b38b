use crate::{
    error::{Error, Result},
    DEFAULT_ARENA_LIMIT,
};
use std::ops::{Deref, DerefMut};

/// A span of bytes handed out by an [`Arena`]. It stays valid until the arena is truncated below
/// its start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    start: usize,
    len: usize,
}

impl Region {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// A shorter region starting at the same place.
    pub fn shrink(self, len: usize) -> Region {
        Region {
            start: self.start,
            len: len.min(self.len),
        }
    }

    fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Bump-allocated scratch memory for a single operation.
///
/// Allocation only moves the watermark up. Memory is reclaimed by truncating back to an earlier
/// watermark, which is what [`ArenaScope`] does when dropped. The arena never hands out more
/// than its limit; asking for more is an [`Error::Allocation`].
#[derive(Debug)]
pub struct Arena {
    buf: Vec<u8>,
    limit: usize,
}

impl Arena {
    /// Create an arena with the default limit of [`DEFAULT_ARENA_LIMIT`] bytes.
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_ARENA_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            buf: Vec::new(),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes currently handed out.
    pub fn watermark(&self) -> usize {
        self.buf.len()
    }

    pub fn available(&self) -> usize {
        self.limit.saturating_sub(self.buf.len())
    }

    /// Allocate `len` zeroed bytes.
    pub fn alloc(&mut self, len: usize) -> Result<Region> {
        if len > self.available() {
            return Err(Error::Allocation {
                requested: len,
                available: self.available(),
            });
        }
        let start = self.buf.len();
        self.buf.resize(start + len, 0);
        Ok(Region { start, len })
    }

    /// Shorten the most recent allocation to `len` bytes, giving the tail back. Regions that
    /// aren't at the top of the arena are returned shortened but keep their memory.
    pub fn trim(&mut self, region: Region, len: usize) -> Region {
        let at_top = region.end() == self.buf.len();
        let region = region.shrink(len);
        if at_top {
            self.buf.truncate(region.end());
        }
        region
    }

    /// Release everything allocated after `watermark`.
    pub fn truncate(&mut self, watermark: usize) {
        self.buf.truncate(watermark);
    }

    pub fn bytes(&self, region: Region) -> &[u8] {
        &self.buf[region.start..region.end()]
    }

    pub fn bytes_mut(&mut self, region: Region) -> &mut [u8] {
        &mut self.buf[region.start..region.end()]
    }

    /// Open a scope. Everything allocated through the returned guard is released when it drops.
    pub fn scope(&mut self) -> ArenaScope<'_> {
        let watermark = self.watermark();
        ArenaScope {
            arena: self,
            watermark,
        }
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that rewinds an [`Arena`] to the watermark it was opened at.
#[derive(Debug)]
pub struct ArenaScope<'a> {
    arena: &'a mut Arena,
    watermark: usize,
}

impl<'a> ArenaScope<'a> {
    /// The watermark this scope will rewind to.
    pub fn entry_watermark(&self) -> usize {
        self.watermark
    }
}

impl<'a> Deref for ArenaScope<'a> {
    type Target = Arena;
    fn deref(&self) -> &Arena {
        self.arena
    }
}

impl<'a> DerefMut for ArenaScope<'a> {
    fn deref_mut(&mut self) -> &mut Arena {
        self.arena
    }
}

impl<'a> Drop for ArenaScope<'a> {
    fn drop(&mut self) {
        self.arena.truncate(self.watermark);
    }
}
