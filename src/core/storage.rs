//! Backing store untuk ring buffer
//!
//! Slots are allocated once at construction and released when the storage is
//! dropped. Two sources are supported:
//! - Heap: a boxed slice, reserved fallibly so exhaustion surfaces as
//!   [`Error::Allocation`] instead of aborting.
//! - Anonymous mapping: private zero-filled pages from `mmap`, optionally
//!   pinned in RAM with `mlock` so the hot path never takes a page fault.

use memmap2::{MmapMut, MmapOptions};
use std::cell::UnsafeCell;
use std::mem::{self, MaybeUninit};
use std::ptr::{self, NonNull};

use super::error::{Error, Result};

/// Where the slots of a ring buffer live.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Backing {
    /// Global allocator.
    #[default]
    Heap,
    /// Anonymous private memory map.
    Anonymous,
    /// Anonymous memory map locked into RAM.
    #[cfg(unix)]
    Locked,
}

/// Slot dalam ring buffer - menyimpan satu elemen
#[repr(transparent)]
pub(crate) struct Slot<T> {
    data: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    const fn new() -> Self {
        Self {
            data: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
}

enum Owner {
    Heap,
    Mapped(MmapMut),
}

/// Fixed-length array of slots with a single owner.
pub(crate) struct Storage<T> {
    slots: NonNull<Slot<T>>,
    len: usize,
    owner: Owner,
}

// SAFETY: Storage hands out raw slot pointers only; callers synchronize slot
// access through the ring cursors. Moving or sharing the storage itself is
// fine whenever the elements may be sent.
unsafe impl<T: Send> Send for Storage<T> {}
unsafe impl<T: Send> Sync for Storage<T> {}

impl<T> Storage<T> {
    /// Allocate `len` uninitialized slots.
    pub(crate) fn allocate(len: usize, backing: Backing) -> Result<Self> {
        debug_assert!(len.is_power_of_two());

        match backing {
            Backing::Heap => Self::heap(len),
            Backing::Anonymous => Self::mapped(len, false),
            #[cfg(unix)]
            Backing::Locked => Self::mapped(len, true),
        }
    }

    fn heap(len: usize) -> Result<Self> {
        let mut slots: Vec<Slot<T>> = Vec::new();
        slots
            .try_reserve_exact(len)
            .map_err(|_| Error::Allocation { slots: len })?;
        slots.extend((0..len).map(|_| Slot::new()));

        let boxed = Box::into_raw(slots.into_boxed_slice());
        // SAFETY: Box::into_raw never returns null.
        let slots = unsafe { NonNull::new_unchecked(boxed as *mut Slot<T>) };

        Ok(Self {
            slots,
            len,
            owner: Owner::Heap,
        })
    }

    fn mapped(len: usize, lock: bool) -> Result<Self> {
        let bytes = len
            .checked_mul(mem::size_of::<Slot<T>>())
            .ok_or(Error::Allocation { slots: len })?;

        // Zero-sized elements still get one page so the mapping is never empty.
        let mut mmap = MmapOptions::new().len(bytes.max(1)).map_anon()?;

        if lock {
            lock_pages(&mmap)?;
        }

        let base = mmap.as_mut_ptr() as *mut Slot<T>;
        if base.align_offset(mem::align_of::<Slot<T>>()) != 0 {
            return Err(Error::Allocation { slots: len });
        }
        // SAFETY: a successful mapping is never at address zero.
        let slots = unsafe { NonNull::new_unchecked(base) };

        Ok(Self {
            slots,
            len,
            owner: Owner::Mapped(mmap),
        })
    }

    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_mapped(&self) -> bool {
        matches!(self.owner, Owner::Mapped(_))
    }

    /// Raw pointer to slot `index`.
    ///
    /// # Safety
    /// `index < self.len()`. Reading through the pointer requires that the
    /// slot was written and that no write to it is in flight.
    #[inline(always)]
    pub(crate) unsafe fn slot(&self, index: usize) -> *mut MaybeUninit<T> {
        debug_assert!(index < self.len, "slot index {index} out of bounds");
        (*self.slots.as_ptr().add(index)).data.get()
    }
}

impl<T> Drop for Storage<T> {
    fn drop(&mut self) {
        if let Owner::Heap = self.owner {
            // SAFETY: the pointer came from Box::into_raw on a slice of
            // exactly `len` slots and is released only here. Slots hold
            // MaybeUninit, so no element destructor runs.
            unsafe {
                drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
                    self.slots.as_ptr(),
                    self.len,
                )));
            }
        }
        // Mapped storage is unmapped by MmapMut's own Drop.
    }
}

#[cfg(unix)]
fn lock_pages(mmap: &MmapMut) -> Result<()> {
    // SAFETY: the range is exactly the live mapping owned by `mmap`.
    let rc = unsafe { libc::mlock(mmap.as_ptr() as *const libc::c_void, mmap.len()) };
    if rc != 0 {
        return Err(Error::Mmap(std::io::Error::last_os_error()));
    }
    Ok(())
}

#[cfg(not(unix))]
fn lock_pages(_mmap: &MmapMut) -> Result<()> {
    Ok(())
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn test_heap_storage_len() {
        let storage: Storage<u32> = Storage::allocate(8, Backing::Heap).unwrap();
        assert_eq!(storage.len(), 8);
        assert!(!storage.is_mapped());
    }

    #[test]
    fn test_anonymous_storage_write_read() {
        let storage: Storage<u64> = Storage::allocate(16, Backing::Anonymous).unwrap();
        assert!(storage.is_mapped());

        for i in 0..16 {
            unsafe { (*storage.slot(i)).write(i as u64 * 3) };
        }
        for i in 0..16 {
            let v = unsafe { (*storage.slot(i)).assume_init_read() };
            assert_eq!(v, i as u64 * 3);
        }
    }

    #[test]
    fn test_zero_sized_elements_map() {
        let storage: Storage<()> = Storage::allocate(4, Backing::Anonymous).unwrap();
        assert_eq!(storage.len(), 4);
    }
}
