use std::alloc::{GlobalAlloc, Layout, System};
use std::ptr::NonNull;
use std::thread::{self, ThreadId};

/// Source of raw memory for container blocks.
///
/// A resource is never owned by the containers that allocate from it. Several containers
/// can share one, so if they live on different threads the implementation has to tolerate
/// concurrent `allocate`/`deallocate` calls; containers add no locking of their own.
pub trait MemoryResource {
    /// Allocates a block that fits `layout`, or returns `None` when the memory is not there.
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Returns a block to this resource.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate` on a resource that `is_equal` to this one, with the same `layout`.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Whether memory allocated by one resource can be released through the other.
    fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        self as *const Self as *const u8 == other as *const dyn MemoryResource as *const u8
    }
}

/// The process heap.
pub struct SystemHeap;

impl MemoryResource for SystemHeap {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        NonNull::new(unsafe { System.alloc(layout) })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        System.dealloc(ptr.as_ptr(), layout)
    }
}

static SYSTEM_HEAP: SystemHeap = SystemHeap;
static SYSTEM_HEAP_SLOT: ResourceSlot = ResourceSlot::new(&SYSTEM_HEAP);

/// Fixed home of a resource reference.
///
/// `&dyn MemoryResource` is two words wide. Containers keep their resource in one word,
/// so they point at a slot instead, and the slot holds the wide reference.
pub struct ResourceSlot {
    resource: NonNull<dyn MemoryResource>,
    owner: Option<ThreadId>,
}

impl ResourceSlot {
    /// Slot for a resource that lives for the rest of the program and any thread may use.
    pub const fn new(resource: &'static (dyn MemoryResource + Sync)) -> ResourceSlot {
        let resource: &'static dyn MemoryResource = resource;
        ResourceSlot {
            resource: unsafe {
                NonNull::new_unchecked(resource as *const dyn MemoryResource as *mut dyn MemoryResource)
            },
            owner: None,
        }
    }

    /// Slot for a resource of any lifetime, usable from the current thread only.
    ///
    /// # Safety
    ///
    /// `resource` must stay valid for as long as the slot, any container bound to it or any
    /// block allocated through it is alive. Those containers must not leave the current
    /// thread, and the slot must not be shared with another one.
    pub unsafe fn from_raw<'a>(resource: &'a (dyn MemoryResource + 'a)) -> ResourceSlot {
        let resource: &'static dyn MemoryResource = std::mem::transmute(resource);
        ResourceSlot {
            resource: NonNull::from(resource),
            owner: Some(thread::current().id()),
        }
    }

    #[inline(always)]
    pub fn resource(&self) -> &dyn MemoryResource {
        debug_assert!(
            self.owner.map_or(true, |owner| owner == thread::current().id()),
            "thread-local memory resource used from another thread"
        );
        unsafe { self.resource.as_ref() }
    }

    /// Whether any thread may use this slot.
    pub fn is_shared(&self) -> bool {
        self.owner.is_none()
    }
}

// Shared slots only hold `Sync` resources; the others are confined by `from_raw`'s contract.
unsafe impl Send for ResourceSlot {}
unsafe impl Sync for ResourceSlot {}

/// Thin, copyable, non-owning handle to a memory resource.
#[derive(Copy, Clone)]
pub struct ResourceRef {
    slot: NonNull<ResourceSlot>,
}

impl ResourceRef {
    /// Handle to a slot that lives for the rest of the program.
    pub fn new(slot: &'static ResourceSlot) -> ResourceRef {
        ResourceRef { slot: NonNull::from(slot) }
    }

    /// Handle to a slot of any lifetime.
    ///
    /// # Safety
    ///
    /// `slot` must be non-null and stay valid for as long as any container holding the
    /// returned handle (or any block allocated through it) is alive.
    pub unsafe fn from_raw(slot: *const ResourceSlot) -> ResourceRef {
        debug_assert!(!slot.is_null(), "resource slot is null");
        ResourceRef { slot: NonNull::new_unchecked(slot as *mut ResourceSlot) }
    }

    /// The process-wide default, backed by [`SystemHeap`].
    #[inline(always)]
    pub fn default_resource() -> ResourceRef {
        ResourceRef::new(&SYSTEM_HEAP_SLOT)
    }

    #[inline(always)]
    pub fn get(&self) -> &dyn MemoryResource {
        unsafe { self.slot.as_ref() }.resource()
    }

    /// Two handles are interchangeable when their resources say they are.
    pub fn same_as(&self, other: &ResourceRef) -> bool {
        self.slot == other.slot || self.get().is_equal(other.get())
    }

    #[inline(always)]
    pub fn as_ptr(&self) -> *const ResourceSlot {
        self.slot.as_ptr()
    }
}

impl Default for ResourceRef {
    fn default() -> Self {
        ResourceRef::default_resource()
    }
}

impl std::fmt::Debug for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ResourceRef").field(&self.slot).finish()
    }
}

// Same footing as the slot it points at.
unsafe impl Send for ResourceRef {}
unsafe impl Sync for ResourceRef {}
