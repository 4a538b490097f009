use crate::grow::{self, BufferState};
use crate::relocate::Relocate;
use std::alloc::Layout;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ptr;

/// Owning iterator of a [`Vec`](crate::Vec).
///
/// Yields the elements by value; whatever is left is dropped with the iterator, and the
/// block goes back to its resource.
pub struct IntoIter<T: Relocate> {
    buffer: BufferState,
    start: u32,
    end: u32,
    _marker: PhantomData<T>,
}

impl<T: Relocate> IntoIter<T> {
    pub(crate) fn new(buffer: BufferState) -> IntoIter<T> {
        IntoIter {
            buffer,
            start: 0,
            end: buffer.size(),
            _marker: PhantomData,
        }
    }

    /// Elements not yet yielded.
    pub fn as_slice(&self) -> &[T] {
        unsafe {
            std::slice::from_raw_parts(
                self.buffer.base::<T>().as_ptr().add(self.start as usize),
                (self.end - self.start) as usize,
            )
        }
    }
}

impl<T: Relocate> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.start == self.end {
            return None;
        }
        let item = unsafe { self.buffer.base::<T>().as_ptr().add(self.start as usize).read() };
        self.start += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = (self.end - self.start) as usize;
        (len, Some(len))
    }
}

impl<T: Relocate> DoubleEndedIterator for IntoIter<T> {
    fn next_back(&mut self) -> Option<T> {
        if self.start == self.end {
            return None;
        }
        self.end -= 1;
        Some(unsafe { self.buffer.base::<T>().as_ptr().add(self.end as usize).read() })
    }
}

impl<T: Relocate> ExactSizeIterator for IntoIter<T> {}

impl<T: Relocate> FusedIterator for IntoIter<T> {}

unsafe impl<T: Relocate + Send> Send for IntoIter<T> {}
unsafe impl<T: Relocate + Sync> Sync for IntoIter<T> {}

impl<T: Relocate + std::fmt::Debug> std::fmt::Debug for IntoIter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("IntoIter").field(&self.as_slice()).finish()
    }
}

impl<T: Relocate> Drop for IntoIter<T> {
    fn drop(&mut self) {
        let _block = scopeguard::guard(self.buffer, |buffer| unsafe { grow::free(buffer, Layout::new::<T>()) });
        unsafe {
            let rest = ptr::slice_from_raw_parts_mut(
                self.buffer.base::<T>().as_ptr().add(self.start as usize),
                (self.end - self.start) as usize,
            );
            self.start = self.end;
            ptr::drop_in_place(rest);
        }
    }
}
