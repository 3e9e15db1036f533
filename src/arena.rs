//! Arena accounting for block storage and scratch buffers
//!
//! An [`Arena`] hands out byte budgets; typed storage is then backed by a
//! `Vec` that is reserved fallibly, so exhaustion of either the budget or the
//! system allocator surfaces as [`Error::ResourceExhausted`] instead of an
//! abort. Budgets are returned when the owning [`ArenaBuf`] or [`ArenaLease`]
//! is dropped, which brackets every run regardless of how it exits.

use std::fmt::Debug;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::{Error, Result};

/// Pluggable backing memory for matrices and workspaces
pub trait Arena: Debug + Send + Sync {
    /// Claims `bytes` from the arena
    fn allocate(&self, bytes: usize) -> Result<()>;

    /// Returns `bytes` previously claimed with [`Arena::allocate`]
    fn deallocate(&self, bytes: usize);

    /// Bytes currently claimed
    fn in_use(&self) -> usize;

    /// Largest number of bytes ever claimed at once
    fn high_water(&self) -> usize;
}

/// Arena shared between a matrix, its workspace and the caller
pub type SharedArena = Arc<dyn Arena>;

/// Unbounded arena that only keeps accounts
#[derive(Debug, Default)]
pub struct HeapArena {
    in_use: AtomicUsize,
    peak: AtomicUsize,
}

impl HeapArena {
    /// Creates a new heap arena
    pub fn new() -> Self {
        HeapArena::default()
    }

    /// Creates a new heap arena behind a shared handle
    pub fn shared() -> SharedArena {
        Arc::new(HeapArena::new())
    }
}

impl Arena for HeapArena {
    fn allocate(&self, bytes: usize) -> Result<()> {
        let now = self.in_use.fetch_add(bytes, Ordering::Relaxed) + bytes;
        self.peak.fetch_max(now, Ordering::Relaxed);
        Ok(())
    }

    fn deallocate(&self, bytes: usize) {
        self.in_use.fetch_sub(bytes, Ordering::Relaxed);
    }

    fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Relaxed)
    }

    fn high_water(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }
}

/// Arena with a fixed byte budget
#[derive(Debug)]
pub struct BoundedArena {
    capacity: usize,
    in_use: AtomicUsize,
    peak: AtomicUsize,
}

impl BoundedArena {
    /// Creates an arena that refuses to hand out more than `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        BoundedArena {
            capacity,
            in_use: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Creates a bounded arena behind a shared handle
    pub fn shared(capacity: usize) -> SharedArena {
        Arc::new(BoundedArena::new(capacity))
    }

    /// Total budget of this arena
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Arena for BoundedArena {
    fn allocate(&self, bytes: usize) -> Result<()> {
        let capacity = self.capacity;
        let claimed = self
            .in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(bytes).filter(|&total| total <= capacity)
            });

        match claimed {
            Ok(previous) => {
                self.peak.fetch_max(previous + bytes, Ordering::Relaxed);
                Ok(())
            }
            Err(used) => Err(Error::ResourceExhausted {
                requested: bytes,
                available: capacity.saturating_sub(used),
            }),
        }
    }

    fn deallocate(&self, bytes: usize) {
        self.in_use.fetch_sub(bytes, Ordering::AcqRel);
    }

    fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }

    fn high_water(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }
}

/// A byte budget claimed from an arena, returned on drop
#[derive(Debug)]
pub struct ArenaLease {
    arena: SharedArena,
    bytes: usize,
}

impl ArenaLease {
    /// Claims `bytes` from `arena`
    pub fn acquire(arena: &SharedArena, bytes: usize) -> Result<Self> {
        arena.allocate(bytes)?;
        Ok(ArenaLease {
            arena: Arc::clone(arena),
            bytes,
        })
    }

    /// Number of bytes held by this lease
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    /// Arena the bytes were claimed from
    pub fn arena(&self) -> &SharedArena {
        &self.arena
    }
}

impl Drop for ArenaLease {
    fn drop(&mut self) {
        self.arena.deallocate(self.bytes);
    }
}

/// Size in bytes of `len` values of `T`, or exhaustion on overflow
pub fn bytes_for<T>(len: usize) -> Result<usize> {
    len.checked_mul(std::mem::size_of::<T>())
        .ok_or(Error::ResourceExhausted {
            requested: usize::MAX,
            available: 0,
        })
}

/// Allocates a vector of `len` copies of `fill` without aborting on failure
pub fn try_filled_vec<T: Clone>(len: usize, fill: T) -> Result<Vec<T>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| Error::ResourceExhausted {
            requested: bytes_for::<T>(len).unwrap_or(usize::MAX),
            available: 0,
        })?;
    data.resize(len, fill);
    Ok(data)
}

/// Typed, bounds-checked buffer whose bytes are claimed from an arena
#[derive(Debug)]
pub struct ArenaBuf<T> {
    data: Vec<T>,
    _lease: ArenaLease,
}

impl<T: Clone> ArenaBuf<T> {
    /// Allocates `len` copies of `fill` against `arena`
    pub fn filled(arena: &SharedArena, len: usize, fill: T) -> Result<Self> {
        let lease = ArenaLease::acquire(arena, bytes_for::<T>(len)?)?;
        let data = try_filled_vec(len, fill)?;
        Ok(ArenaBuf {
            data,
            _lease: lease,
        })
    }
}

impl<T> Deref for ArenaBuf<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T> DerefMut for ArenaBuf<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}
