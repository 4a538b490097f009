/*!

The growth engine.

Everything here works on bytes and an element `Layout`; nothing is generic over the
element type. Containers call in only when they are out of room, hand over their
`BufferState` by value and store whatever comes back. The engine never sees the
container's address, so a caller's fast path can keep size and capacity in registers
across calls that mutate the container.

*/

use crate::block::{allocate_block, release_block, resource_of};
use crate::relocate::Relocator;
use crate::resource::ResourceRef;
use std::alloc::Layout;
use std::num::NonZeroU32;
use std::ptr::{self, NonNull};

/// Smallest capacity of a first allocation.
pub const MIN_CAPACITY: u32 = 1;
/// Capacity multiplier of every later growth.
pub const GROWTH_FACTOR: u32 = 2;
/// Largest number of elements a buffer can hold.
pub const MAX_CAPACITY: u32 = u32::MAX;

/// Storage of one container: where the elements are, how many are live, how many fit.
///
/// An empty buffer has no block. It may still remember which resource its first block
/// should come from; once allocated, the block header remembers it instead.
///
/// Only [`grow`] produces allocated states, so a block address can not be made up:
///
/// ```compile_fail
/// use slimvec::BufferState;
/// use std::num::NonZeroU32;
/// use std::ptr::NonNull;
///
/// let forged = BufferState::Allocated {
///     base: NonNull::<u8>::dangling(),
///     size: 0,
///     capacity: NonZeroU32::new(1).unwrap(),
/// };
/// forged.resource();
/// ```
#[derive(Copy, Clone, Debug)]
pub struct BufferState(State);

#[derive(Copy, Clone, Debug)]
enum State {
    Empty(Option<ResourceRef>),
    Allocated {
        base: NonNull<u8>,
        size: u32,
        capacity: NonZeroU32,
    },
}

impl BufferState {
    pub const fn empty() -> BufferState {
        BufferState(State::Empty(None))
    }

    pub const fn empty_in(resource: ResourceRef) -> BufferState {
        BufferState(State::Empty(Some(resource)))
    }

    #[inline(always)]
    pub fn size(&self) -> u32 {
        match self.0 {
            State::Empty(_) => 0,
            State::Allocated { size, .. } => size,
        }
    }

    #[inline(always)]
    pub fn capacity(&self) -> u32 {
        match self.0 {
            State::Empty(_) => 0,
            State::Allocated { capacity, .. } => capacity.get(),
        }
    }

    /// Start of the element array, if there is one.
    #[inline(always)]
    pub fn block(&self) -> Option<NonNull<u8>> {
        match self.0 {
            State::Empty(_) => None,
            State::Allocated { base, .. } => Some(base),
        }
    }

    /// Typed view of the element array; dangling but aligned while empty.
    #[inline(always)]
    pub fn base<T>(&self) -> NonNull<T> {
        match self.0 {
            State::Empty(_) => NonNull::dangling(),
            State::Allocated { base, .. } => base.cast(),
        }
    }

    /// Resource the next block will come from.
    pub fn resource(&self) -> ResourceRef {
        match self.0 {
            State::Empty(resource) => resource.unwrap_or_default(),
            // Allocated states only come out of `grow`, so `base` follows a header.
            State::Allocated { base, .. } => unsafe { resource_of(base) },
        }
    }

    /// Changes the live count without touching any element.
    ///
    /// # Safety
    ///
    /// `size` must not exceed the capacity and the first `size` slots must be initialized.
    #[inline(always)]
    pub unsafe fn set_size(&mut self, new_size: u32) {
        match &mut self.0 {
            State::Empty(_) => debug_assert_eq!(0, new_size, "set_size on empty buffer"),
            State::Allocated { size, capacity, .. } => {
                debug_assert!(new_size <= capacity.get(), "set_size beyond capacity");
                *size = new_size;
            },
        }
    }
}

impl Default for BufferState {
    fn default() -> Self {
        BufferState::empty()
    }
}

/// Produces a buffer that can hold at least `requested` elements.
///
/// The first block holds `max(requested, MIN_CAPACITY)` elements. Later blocks hold
/// `max(requested, capacity * GROWTH_FACTOR)`. Live elements move over either through
/// `relocator` or, when there is none, with one byte copy; then the old block goes back to
/// the resource that produced it.
///
/// Allocation failure aborts the process.
///
/// # Safety
///
/// `state` must describe a live buffer of elements with layout `elem`, and `relocator` must
/// be `None` only if those elements may be moved by byte copy. The returned state replaces
/// `state`; the old block is gone.
#[inline(never)]
pub unsafe fn grow(state: BufferState, elem: Layout, relocator: Option<Relocator>, requested: u32) -> BufferState {
    match state.0 {
        State::Empty(resource) => {
            let resource = resource.unwrap_or_default();
            let capacity = requested.max(MIN_CAPACITY);
            let base = allocate_block(resource, elem, capacity);
            debug!("first block for {} elements of {} bytes", capacity, elem.size());
            BufferState(State::Allocated {
                base,
                size: 0,
                capacity: NonZeroU32::new_unchecked(capacity),
            })
        },
        State::Allocated { base, size, capacity } => {
            let capacity = capacity.get();
            let new_capacity = requested.max(capacity.saturating_mul(GROWTH_FACTOR));
            if new_capacity <= capacity {
                capacity_exhausted(capacity);
            }
            let new_base = allocate_block(resource_of(base), elem, new_capacity);
            match relocator {
                Some(relocate) => relocate(new_base.as_ptr(), base.as_ptr(), size),
                None => ptr::copy_nonoverlapping(base.as_ptr(), new_base.as_ptr(), size as usize * elem.size()),
            }
            trace!("grow {} -> {} ({} live, {} bytes each, relocator: {})",
                   capacity, new_capacity, size, elem.size(), relocator.is_some());
            release_block(base, elem, capacity);
            BufferState(State::Allocated {
                base: new_base,
                size,
                capacity: NonZeroU32::new_unchecked(new_capacity),
            })
        },
    }
}

/// Releases the block of `state`, if any. Elements must already be dropped.
///
/// # Safety
///
/// `state` must describe a live buffer of elements with layout `elem`; it is dead afterwards.
#[inline(never)]
pub unsafe fn free(state: BufferState, elem: Layout) {
    if let State::Allocated { base, capacity, .. } = state.0 {
        release_block(base, elem, capacity.get());
    }
}

#[cold]
#[inline(never)]
#[cfg_attr(not(feature = "logging"), allow(unused_variables))]
fn capacity_exhausted(capacity: u32) -> ! {
    error!("buffer of {} elements can not grow any further", capacity);
    std::process::abort()
}
