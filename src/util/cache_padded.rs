//! Cache line padding for per-worker counters.

use std::ops::Deref;

/// Aligns `T` to its own cache line so counters written by different
/// workers do not false-share.
#[derive(Debug, Default)]
#[repr(align(64))]
pub struct CachePadded<T> {
    value: T,
}

impl<T> CachePadded<T> {
    pub const fn new(value: T) -> Self {
        Self { value }
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for CachePadded<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn test_cache_padded_alignment() {
        assert_eq!(align_of::<CachePadded<AtomicU64>>(), 64);
        assert!(size_of::<CachePadded<AtomicU64>>() >= 64);
    }

    #[test]
    fn test_cache_padded_deref() {
        let padded = CachePadded::new(AtomicU64::new(1));
        padded.fetch_add(41, Ordering::Relaxed);
        assert_eq!(padded.into_inner().into_inner(), 42);
    }
}
