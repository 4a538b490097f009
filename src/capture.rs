/*!

Pulling a container into a local for the length of a hot loop.

A container reached through a pointer parameter shares its address with everything else
the caller can see, so every store the loop makes might, as far as the optimizer knows,
change the container's length behind its back. `LocalCapture` moves the container's state
into a value of its own for the duration of a scope, leaves the default (empty) state at
the original address, and moves the state back when the scope ends, whichever way it ends.

```
use slimvec::{LocalCapture, Vec};

fn fill(out: &mut Vec<u32>, n: u32) {
    let mut local = LocalCapture::new(out);
    for i in 0..n {
        local.push(i);
    }
}

let mut v = Vec::new();
fill(&mut v, 3);
assert_eq!(v, [0, 1, 2]);
```

*/

use scopeguard::ScopeGuard;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

type Restore<C> = fn((C, NonNull<C>));

fn restore<C>((local, global): (C, NonNull<C>)) {
    unsafe { *global.as_ptr() = local };
}

/// Scoped owner of a container's state; puts it back on drop.
pub struct LocalCapture<'a, C> {
    guard: ScopeGuard<(C, NonNull<C>), Restore<C>>,
    _borrow: PhantomData<&'a mut C>,
}

impl<'a, C: Default> LocalCapture<'a, C> {
    pub fn new(global: &'a mut C) -> LocalCapture<'a, C> {
        unsafe { LocalCapture::from_raw(global) }
    }

    /// Captures the container behind a raw pointer.
    ///
    /// # Safety
    ///
    /// `global` must be valid for reads and writes for `'a`, and nothing may touch it
    /// until the capture is dropped.
    pub unsafe fn from_raw(global: *mut C) -> LocalCapture<'a, C> {
        let global = NonNull::new_unchecked(global);
        let local = std::mem::take(&mut *global.as_ptr());
        LocalCapture {
            guard: scopeguard::guard((local, global), restore::<C> as Restore<C>),
            _borrow: PhantomData,
        }
    }
}

impl<'a, C> Deref for LocalCapture<'a, C> {
    type Target = C;

    #[inline(always)]
    fn deref(&self) -> &C {
        &self.guard.0
    }
}

impl<'a, C> DerefMut for LocalCapture<'a, C> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut C {
        &mut self.guard.0
    }
}

/// Runs `f` on a captured copy of `global`'s state and puts it back afterwards.
pub fn capture<C: Default, R, F: FnOnce(&mut C) -> R>(global: &mut C, f: F) -> R {
    let mut local = LocalCapture::new(global);
    f(&mut local)
}
