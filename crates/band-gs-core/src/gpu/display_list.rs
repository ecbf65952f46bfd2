//! Fixed-capacity display list: an append-only byte arena holding typed
//! command records at bus-aligned offsets.
//!
//! Two list types exist, both built on the same arena: the frame list
//! (capacity `DISPLAY_LIST_SIZE`, one front + one back instance) and the
//! upload list (capacity `HARDWARE_BUFFER_SIZE`, filled and drained once per
//! walker tick). Frame lists are read several times: the band walker rewinds
//! the read cursor at each band boundary.

use core::mem::{align_of, size_of};

/// Marker for plain-data records that may live in a display list.
///
/// # Safety
///
/// Implementors must be `#[repr(C)]` (or a primitive), must be valid for the
/// all-zero bit pattern, and must not require stricter alignment than the
/// list's record alignment (`BUS_WIDTH / 8`, backing storage is 8-byte
/// aligned). Records are written and read through raw pointer casts into the
/// storage.
pub unsafe trait Record: Copy + 'static {}

unsafe impl Record for u16 {}

/// Lifecycle of a frame list between the encoder and the bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListState {
    /// Owned by the encoder; commands may be appended.
    Free,
    /// Committed and waiting for the band walker to pick it up.
    Queued,
    /// Being re-emitted band by band.
    Transferring,
}

#[repr(align(8))]
struct Storage<const SIZE: usize>([u8; SIZE]);

pub struct DisplayList<const SIZE: usize, const BUS_WIDTH: usize> {
    storage: Storage<SIZE>,
    write_pos: usize,
    read_pos: usize,
    state: ListState,
}

impl<const SIZE: usize, const BUS_WIDTH: usize> DisplayList<SIZE, BUS_WIDTH> {
    /// Record alignment in bytes.
    pub const ALIGN: usize = BUS_WIDTH / 8;

    pub const fn new() -> Self {
        Self {
            storage: Storage([0u8; SIZE]),
            write_pos: 0,
            read_pos: 0,
            state: ListState::Free,
        }
    }

    /// Size of `T` rounded up to the record alignment. The value a
    /// `TRIANGLE_STREAM` opcode carries in its immediate field.
    pub const fn size_of_aligned<T>() -> usize {
        (size_of::<T>() + Self::ALIGN - 1) / Self::ALIGN * Self::ALIGN
    }

    /// Reserve space for one `T` and return a zeroed view of it, or `None`
    /// if the list is full. On `None` the list is unchanged.
    pub fn create<T: Record>(&mut self) -> Option<&mut T> {
        debug_assert!(Self::ALIGN % align_of::<T>() == 0);
        let size = Self::size_of_aligned::<T>();
        if self.write_pos + size > SIZE {
            return None;
        }
        let offset = self.write_pos;
        self.write_pos += size;
        self.storage.0[offset..offset + size].fill(0);
        let ptr = self.storage.0[offset..].as_mut_ptr().cast::<T>();
        // Offset and backing storage satisfy T's alignment (see `Record`),
        // and the bytes were just zeroed.
        Some(unsafe { &mut *ptr })
    }

    /// Roll back the most recent `create::<T>()`. Only valid immediately
    /// after a successful `create` of the same `T`; the arena supports
    /// exactly one level of LIFO rollback.
    pub fn remove<T: Record>(&mut self) {
        let size = Self::size_of_aligned::<T>();
        debug_assert!(self.write_pos >= size);
        self.write_pos -= size;
    }

    /// View the next record and advance the read cursor past it.
    pub fn get_next<T: Record>(&mut self) -> Option<&T> {
        debug_assert!(Self::ALIGN % align_of::<T>() == 0);
        let size = Self::size_of_aligned::<T>();
        if self.read_pos + size > self.write_pos {
            return None;
        }
        let offset = self.read_pos;
        self.read_pos += size;
        let ptr = self.storage.0[offset..].as_ptr().cast::<T>();
        Some(unsafe { &*ptr })
    }

    /// Rewind the read cursor. Called between band passes.
    pub fn reset_read(&mut self) {
        self.read_pos = 0;
    }

    pub fn at_end(&self) -> bool {
        self.read_pos == self.write_pos
    }

    pub fn clear(&mut self) {
        self.read_pos = 0;
        self.write_pos = 0;
        self.state = ListState::Free;
    }

    /// Hand the list over for transfer.
    pub fn enqueue(&mut self) {
        debug_assert_eq!(self.state, ListState::Free);
        self.state = ListState::Queued;
    }

    /// Begin re-emitting the list to the device.
    pub fn transfer(&mut self) {
        debug_assert_eq!(self.state, ListState::Queued);
        self.state = ListState::Transferring;
    }

    pub fn state(&self) -> ListState {
        self.state
    }

    pub fn free_space(&self) -> usize {
        SIZE - self.write_pos
    }

    pub fn size(&self) -> usize {
        self.write_pos
    }

    /// The written bytes, ready for the bus.
    pub fn as_bytes(&self) -> &[u8] {
        &self.storage.0[..self.write_pos]
    }
}

impl<const SIZE: usize, const BUS_WIDTH: usize> Default for DisplayList<SIZE, BUS_WIDTH> {
    fn default() -> Self {
        Self::new()
    }
}
