/*!

Moving elements to a new block.

When a buffer grows, its live elements move from the old block to the new one. For most
types a byte copy is a valid move and the growth engine does exactly that. Types that
care about their own address (self-pointers, registrations keyed by address) implement
`Relocate::relocate` instead, and the engine gets a relocator function for them.

The relocator is a plain function pointer, one per element type, so the growth engine
itself never needs to be generic.

*/

use std::ptr;

/// Moves `count` elements from `src` to `dst`, ending the life of the originals.
///
/// The two ranges never overlap.
pub type Relocator = unsafe fn(dst: *mut u8, src: *mut u8, count: u32);

/// Element types a [`Vec`](crate::Vec) can hold.
///
/// # Safety
///
/// With `TRIVIAL` left `true` the implementor promises a raw byte copy followed by
/// forgetting the source is a correct move. An overridden `relocate` must leave a valid
/// value at `dst`, leave `src` logically uninitialized, and never panic.
pub unsafe trait Relocate: Sized {
    /// Whether the growth engine may move these values with a byte copy.
    const TRIVIAL: bool = true;

    /// Builds the value at `dst` out of the value at `src`, then destroys `src`.
    ///
    /// # Safety
    ///
    /// `src` holds a live value, `dst` is valid for writes and the two do not overlap.
    #[inline(always)]
    unsafe fn relocate(dst: *mut Self, src: *mut Self) {
        ptr::copy_nonoverlapping(src, dst, 1);
    }
}

/// Relocates a run of `T` in source order.
///
/// # Safety
///
/// `src` holds `count` live values of `T`, `dst` has room for as many, ranges disjoint.
pub unsafe fn relocate_run<T: Relocate>(dst: *mut u8, src: *mut u8, count: u32) {
    let mut d = dst as *mut T;
    let mut s = src as *mut T;
    let end = s.add(count as usize);
    while s != end {
        T::relocate(d, s);
        s = s.add(1);
        d = d.add(1);
    }
}

/// The relocator the growth engine needs for `T`, or `None` when a byte copy does.
#[inline(always)]
pub fn relocator_for<T: Relocate>() -> Option<Relocator> {
    if T::TRIVIAL {
        None
    } else {
        Some(relocate_run::<T> as Relocator)
    }
}

/// Declares types as movable by byte copy.
///
/// ```
/// struct Point { x: f32, y: f32 }
/// slimvec::trivially_relocatable!(Point);
/// ```
#[macro_export]
macro_rules! trivially_relocatable {
    ($($t:ty),+ $(,)?) => {
        $(unsafe impl $crate::Relocate for $t {})+
    };
}

trivially_relocatable!(
    u8, u16, u32, u64, u128, usize,
    i8, i16, i32, i64, i128, isize,
    f32, f64, bool, char, (),
    String,
    std::ffi::CString, std::ffi::OsString, std::path::PathBuf,
    std::time::Duration,
);

unsafe impl<'a, T: ?Sized> Relocate for &'a T {}
unsafe impl<'a, T: ?Sized> Relocate for &'a mut T {}
unsafe impl<T: ?Sized> Relocate for *const T {}
unsafe impl<T: ?Sized> Relocate for *mut T {}
unsafe impl<T: ?Sized> Relocate for Box<T> {}
unsafe impl<T> Relocate for std::vec::Vec<T> {}
unsafe impl<T: ?Sized> Relocate for std::rc::Rc<T> {}
unsafe impl<T: ?Sized> Relocate for std::sync::Arc<T> {}

unsafe impl<T: Relocate, const N: usize> Relocate for [T; N] {
    const TRIVIAL: bool = T::TRIVIAL;

    unsafe fn relocate(dst: *mut Self, src: *mut Self) {
        relocate_run::<T>(dst as *mut u8, src as *mut u8, N as u32);
    }
}
