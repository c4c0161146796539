use alloc::vec::Vec;
use core::mem;

use super::handle::Handle;
use crate::error::{Error, Result};

/// Slot storage with a free list.
///
/// The free list always has room for every slot, so releasing a slot never
/// allocates; fallible reservation happens up front in [`Arena::try_reserve`].
pub(crate) struct Arena<T> {
    slots: Vec<Option<T>>,
    free: Vec<Handle>,
}

impl<T: Clone> Clone for Arena<T> {
    fn clone(&self) -> Self {
        let mut free = Vec::with_capacity(self.slots.len());
        free.extend_from_slice(&self.free);
        Self {
            slots: self.slots.clone(),
            free,
        }
    }
}

impl<T> Arena<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub(crate) const fn len(&self) -> usize {
        self.slots.len().saturating_sub(self.free.len())
    }

    /// Bytes held by the slot and free-list buffers.
    pub(crate) fn memory_footprint(&self) -> usize {
        self.slots.capacity() * mem::size_of::<Option<T>>() + self.free.capacity() * mem::size_of::<Handle>()
    }

    /// Makes room for `additional` more live elements.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfMemory`] if the allocator refuses or the arena would run
    /// past [`Handle::MAX`]. The arena is logically unchanged on failure.
    pub(crate) fn try_reserve(&mut self, additional: usize) -> Result<()> {
        let fresh = additional.saturating_sub(self.free.len());
        let slots = self.slots.len().checked_add(fresh).ok_or(Error::OutOfMemory)?;
        if slots > Handle::MAX {
            return Err(Error::OutOfMemory);
        }
        self.slots.try_reserve(fresh)?;
        self.free.try_reserve(slots - self.free.len())?;
        Ok(())
    }

    pub(crate) fn alloc(&mut self, element: T) -> Handle {
        if let Some(h) = self.free.pop() {
            // Reuse a free slot/handle.
            self.slots[h.to_index()] = Some(element);
            h
        } else {
            // Strict less-than keeps the newest index within Handle::MAX.
            assert!(
                self.slots.len() < Handle::MAX,
                "`Arena::alloc()` - arena is at maximum capacity ({})",
                Handle::MAX
            );
            self.slots.push(Some(element));
            Handle::from_index(self.slots.len() - 1)
        }
    }

    #[inline]
    pub(crate) fn get(&self, handle: Handle) -> &T {
        self.slots[handle.to_index()].as_ref().expect("`Arena::get()` - `handle` is invalid!")
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, handle: Handle) -> &mut T {
        self.slots[handle.to_index()].as_mut().expect("`Arena::get_mut()` - `handle` is invalid!")
    }

    pub(crate) fn take(&mut self, handle: Handle) -> T {
        let element = self.slots[handle.to_index()].take().expect("`Arena::take()` - `handle` is invalid!");
        self.free.push(handle);
        element
    }

    pub(crate) fn free(&mut self, handle: Handle) {
        drop(self.take(handle));
    }

    /// Drops every element, keeping both buffers' capacity.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }

    /// Clones the arena, handles included, without aborting on allocation failure.
    pub(crate) fn try_clone(&self) -> Result<Self>
    where
        T: Clone,
    {
        let mut slots = Vec::new();
        slots.try_reserve_exact(self.slots.len())?;
        slots.extend_from_slice(&self.slots);

        let mut free = Vec::new();
        free.try_reserve_exact(self.slots.len())?;
        free.extend_from_slice(&self.free);

        Ok(Self { slots, free })
    }
}
