/*!

Raw blocks handed out by memory resources.

A block is a header followed by the element array:

```text
+--------------------------+-----------------------------------+
| .. padding | ResourceRef | element 0 | element 1 | ...       |
+--------------------------+-----------------------------------+
^ block start              ^ base (what containers hold)
```

The header is `HEADER_SIZE` bytes, or the element alignment if that is larger, so `base`
stays aligned for both. The resource that produced the block sits in the word right before
`base`, which is how a block is released without the container remembering its resource.

*/

use crate::resource::ResourceRef;
use std::alloc::Layout;
use std::mem::size_of;
use std::ptr::NonNull;

/// Bytes reserved in front of the element array (the platform max-align).
pub const HEADER_SIZE: usize = 16;

const _: () = assert!(size_of::<ResourceRef>() <= HEADER_SIZE);

#[inline(always)]
fn header_size(elem: Layout) -> usize {
    if elem.align() > HEADER_SIZE { elem.align() } else { HEADER_SIZE }
}

/// Full layout of a block holding `capacity` elements, aborting if it can not be described.
pub(crate) fn block_layout(elem: Layout, capacity: u32) -> Layout {
    let header = header_size(elem);
    let bytes = (capacity as usize)
        .checked_mul(elem.size())
        .and_then(|bytes| bytes.checked_add(header));
    match bytes.map(|bytes| Layout::from_size_align(bytes, header)) {
        Some(Ok(layout)) => layout,
        _ => capacity_overflow(capacity, elem),
    }
}

#[cold]
#[inline(never)]
#[cfg_attr(not(feature = "logging"), allow(unused_variables))]
fn capacity_overflow(capacity: u32, elem: Layout) -> ! {
    error!("capacity {} of {}-byte elements does not fit in memory", capacity, elem.size());
    std::process::abort()
}

#[cold]
#[inline(never)]
fn allocation_failure(layout: Layout) -> ! {
    error!("memory resource failed to provide {} bytes", layout.size());
    std::alloc::handle_alloc_error(layout)
}

#[inline(always)]
unsafe fn header_slot(base: NonNull<u8>) -> *mut ResourceRef {
    (base.as_ptr() as *mut ResourceRef).sub(1)
}

/// Allocates a block for `capacity` elements from `resource` and stamps the header.
///
/// Returns the element array start. Never returns on failure.
pub(crate) fn allocate_block(resource: ResourceRef, elem: Layout, capacity: u32) -> NonNull<u8> {
    let layout = block_layout(elem, capacity);
    let start = match resource.get().allocate(layout) {
        Some(start) => start,
        None => allocation_failure(layout),
    };
    unsafe {
        let base = NonNull::new_unchecked(start.as_ptr().add(header_size(elem)));
        header_slot(base).write(resource);
        base
    }
}

/// Reads the resource that produced the block at `base`.
///
/// # Safety
///
/// `base` must be the element array start of a live block.
#[inline(always)]
pub(crate) unsafe fn resource_of(base: NonNull<u8>) -> ResourceRef {
    header_slot(base).read()
}

/// Hands the block at `base` back to its resource. Elements must already be gone.
///
/// # Safety
///
/// `base` must be a live block allocated for exactly `capacity` elements of `elem`.
pub(crate) unsafe fn release_block(base: NonNull<u8>, elem: Layout, capacity: u32) {
    let resource = resource_of(base);
    let layout = block_layout(elem, capacity);
    let start = NonNull::new_unchecked(base.as_ptr().sub(header_size(elem)));
    debug!("release block of {} bytes", layout.size());
    resource.get().deallocate(start, layout);
}

#[cfg(test)]
mod block_tests {
    use super::*;
    use crate::resource::counting::CountingResource;
    use crate::resource::ResourceSlot;

    static COUNTING: CountingResource = CountingResource::new();
    static COUNTING_SLOT: ResourceSlot = ResourceSlot::new(&COUNTING);

    #[repr(align(64))]
    struct Wide([u8; 64]);

    #[test]
    fn header_remembers_resource() {
        let resource = ResourceRef::new(&COUNTING_SLOT);
        let elem = Layout::new::<u64>();
        let base = allocate_block(resource, elem, 4);
        assert_eq!(0, base.as_ptr() as usize % HEADER_SIZE);
        unsafe {
            assert_eq!(resource.as_ptr(), resource_of(base).as_ptr());
            release_block(base, elem, 4);
        }
        assert_eq!(COUNTING.allocations(), COUNTING.deallocations());
        assert_eq!(0, COUNTING.live_bytes());
    }

    #[test]
    fn over_aligned_elements_keep_alignment() {
        let elem = Layout::new::<Wide>();
        let layout = block_layout(elem, 3);
        assert_eq!(64, layout.align());
        assert_eq!(64 + 3 * 64, layout.size());

        let base = allocate_block(ResourceRef::default_resource(), elem, 3);
        assert_eq!(0, base.as_ptr() as usize % 64);
        unsafe { release_block(base, elem, 3) };
    }

    #[test]
    fn zero_sized_elements_only_need_the_header() {
        let layout = block_layout(Layout::new::<()>(), 1000);
        assert_eq!(HEADER_SIZE, layout.size());
    }
}
