use crate::error::IndexFault;
use crate::grow::{self, BufferState, MAX_CAPACITY};
use crate::iter::IntoIter;
use crate::relocate::{relocator_for, Relocate};
use crate::resource::ResourceRef;
use std::alloc::Layout;
use std::convert::TryFrom;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::iter::FromIterator;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut, Range};
use std::ptr;

/// Growable contiguous array, two words wide.
///
/// Sizes and capacities are `u32`. Pushing into a full vector hands the storage to the
/// type-erased growth engine by value; everything else is inlined and never leaves
/// the caller. The vector allocates from its [`ResourceRef`], or from the system heap
/// when it was not given one.
///
/// Capacity only ever grows. `pop`, `clear` and `truncate` keep the block.
pub struct Vec<T: Relocate> {
    buffer: BufferState,
    _marker: PhantomData<T>,
}

impl<T: Relocate> Vec<T> {
    pub const fn new() -> Vec<T> {
        Vec { buffer: BufferState::empty(), _marker: PhantomData }
    }

    /// Empty vector that takes its blocks from `resource`.
    pub const fn new_in(resource: ResourceRef) -> Vec<T> {
        Vec { buffer: BufferState::empty_in(resource), _marker: PhantomData }
    }

    pub fn with_capacity(capacity: u32) -> Vec<T> {
        let mut vec = Vec::new();
        vec.reserve(capacity);
        vec
    }

    pub fn with_capacity_in(capacity: u32, resource: ResourceRef) -> Vec<T> {
        let mut vec = Vec::new_in(resource);
        vec.reserve(capacity);
        vec
    }

    /// `n` copies of `value`.
    pub fn from_elem(n: u32, value: T) -> Vec<T> where T: Clone {
        let mut vec = Vec::new();
        if n == 0 {
            return vec;
        }
        vec.reserve(n);
        unsafe {
            for _ in 1..n {
                vec.add_already_reserved(value.clone());
            }
            vec.add_already_reserved(value);
        }
        vec
    }

    #[inline(always)]
    pub fn len(&self) -> u32 {
        self.buffer.size()
    }

    /// Same as `len`.
    #[inline(always)]
    pub fn size(&self) -> u32 {
        self.buffer.size()
    }

    #[inline(always)]
    pub fn capacity(&self) -> u32 {
        self.buffer.capacity()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.buffer.size() == 0
    }

    /// Resource the vector allocates from.
    pub fn resource(&self) -> ResourceRef {
        self.buffer.resource()
    }

    #[inline(always)]
    pub fn as_ptr(&self) -> *const T {
        self.buffer.base::<T>().as_ptr()
    }

    #[inline(always)]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.buffer.base::<T>().as_ptr()
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[T] {
        unsafe { std::slice::from_raw_parts(self.as_ptr(), self.len() as usize) }
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { std::slice::from_raw_parts_mut(self.as_mut_ptr(), self.len() as usize) }
    }

    /// Makes room for at least `capacity` elements in total.
    #[inline(always)]
    pub fn reserve(&mut self, capacity: u32) {
        if capacity > self.capacity() {
            self.grow_to(capacity);
        }
    }

    /// Only the buffer state crosses into the engine, never `self`.
    #[inline(always)]
    fn grow_to(&mut self, requested: u32) {
        self.buffer = unsafe { grow::grow(self.buffer, Layout::new::<T>(), relocator_for::<T>(), requested) };
    }

    /// Room for `additional` more elements, counted from the current length.
    #[inline(always)]
    fn reserve_additional(&mut self, additional: u32) {
        self.reserve(self.len().saturating_add(additional));
    }

    /// # Safety
    ///
    /// There must be room for one more element.
    #[inline(always)]
    unsafe fn add_already_reserved(&mut self, value: T) -> &mut T {
        let size = self.buffer.size();
        let slot = self.buffer.base::<T>().as_ptr().add(size as usize);
        slot.write(value);
        self.buffer.set_size(size + 1);
        &mut *slot
    }

    /// Appends `value`, growing first when full.
    #[inline(always)]
    pub fn push(&mut self, value: T) {
        self.add(value);
    }

    #[inline(always)]
    fn add(&mut self, value: T) -> &mut T {
        if self.buffer.size() == self.buffer.capacity() {
            self.grow_to(0);
        }
        unsafe { self.add_already_reserved(value) }
    }

    /// Appends the value built by `f` and returns a reference to it.
    #[inline(always)]
    pub fn emplace_back<F: FnOnce() -> T>(&mut self, f: F) -> &mut T {
        self.add(f())
    }

    /// Removes and returns the last element.
    #[inline(always)]
    pub fn pop(&mut self) -> Option<T> {
        let size = self.buffer.size();
        if size == 0 {
            return None;
        }
        unsafe {
            self.buffer.set_size(size - 1);
            Some(self.buffer.base::<T>().as_ptr().add(size as usize - 1).read())
        }
    }

    /// Sets the live count without constructing or dropping anything.
    ///
    /// # Safety
    ///
    /// `len` must not exceed the capacity, the first `len` elements must be initialized,
    /// and anything past `len` is forgotten.
    #[inline(always)]
    pub unsafe fn set_len(&mut self, len: u32) {
        self.buffer.set_size(len);
    }

    /// Drops every element past `len`.
    pub fn truncate(&mut self, len: u32) {
        let size = self.len();
        if len >= size {
            return;
        }
        unsafe {
            let tail = ptr::slice_from_raw_parts_mut(self.as_mut_ptr().add(len as usize), (size - len) as usize);
            self.set_len(len);
            ptr::drop_in_place(tail);
        }
    }

    #[inline(always)]
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Truncates, or fills up with values from `f`.
    pub fn resize_with<F: FnMut() -> T>(&mut self, len: u32, mut f: F) {
        let size = self.len();
        if len <= size {
            self.truncate(len);
            return;
        }
        self.reserve(len);
        for _ in size..len {
            unsafe { self.add_already_reserved(f()) };
        }
    }

    /// Truncates, or fills up with `T::default()`.
    pub fn resize(&mut self, len: u32) where T: Default {
        self.resize_with(len, T::default);
    }

    /// Truncates, or fills up with clones of `value`.
    pub fn resize_with_value(&mut self, len: u32, value: &T) where T: Clone {
        self.resize_with(len, || value.clone());
    }

    /// Replaces the contents with `iter`, overwriting live elements in place first.
    pub fn assign<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let mut iter = iter.into_iter();
        let mut written = 0;
        for slot in self.as_mut_slice() {
            match iter.next() {
                Some(value) => *slot = value,
                None => break,
            }
            written += 1;
        }
        if written < self.len() {
            self.truncate(written);
        } else {
            self.extend(iter);
        }
    }

    /// Checked access.
    pub fn at(&self, index: u32) -> Result<&T, IndexFault> {
        if index >= self.len() {
            return Err(IndexFault { index, len: self.len() });
        }
        Ok(unsafe { &*self.as_ptr().add(index as usize) })
    }

    /// Checked mutable access.
    pub fn at_mut(&mut self, index: u32) -> Result<&mut T, IndexFault> {
        if index >= self.len() {
            return Err(IndexFault { index, len: self.len() });
        }
        Ok(unsafe { &mut *self.as_mut_ptr().add(index as usize) })
    }

    #[inline(always)]
    pub fn front(&self) -> Option<&T> {
        self.as_slice().first()
    }

    #[inline(always)]
    pub fn back(&self) -> Option<&T> {
        self.as_slice().last()
    }

    /// The first `len` elements.
    pub fn prefix(&self, len: u32) -> &[T] {
        &self.as_slice()[..len as usize]
    }

    pub fn prefix_mut(&mut self, len: u32) -> &mut [T] {
        &mut self.as_mut_slice()[..len as usize]
    }

    /// Everything from `start` on.
    pub fn postfix(&self, start: u32) -> &[T] {
        &self.as_slice()[start as usize..]
    }

    pub fn postfix_mut(&mut self, start: u32) -> &mut [T] {
        &mut self.as_mut_slice()[start as usize..]
    }

    /// Does nothing; a buffer never gives memory back before it is dropped.
    #[inline(always)]
    pub fn shrink_to_fit(&mut self) {}

    /// Moves the elements appended since `old_len` to `index`.
    fn rotate_appended_into(&mut self, index: u32, old_len: u32) {
        let appended = (self.len() - old_len) as usize;
        self.as_mut_slice()[index as usize..].rotate_right(appended);
    }

    /// Inserts `value` before position `index` by appending it and rotating it into place.
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: u32, value: T) {
        let len = self.len();
        assert!(index <= len, "insert index {} out of range for length {}", index, len);
        self.push(value);
        self.rotate_appended_into(index, len);
    }

    /// Inserts `n` clones of `value` before position `index`.
    pub fn insert_n(&mut self, index: u32, n: u32, value: &T) where T: Clone {
        let len = self.len();
        assert!(index <= len, "insert index {} out of range for length {}", index, len);
        self.reserve_additional(n);
        for _ in 0..n {
            unsafe { self.add_already_reserved(value.clone()) };
        }
        self.rotate_appended_into(index, len);
    }

    /// Inserts the items of `iter` before position `index`, keeping their order.
    pub fn insert_iter<I: IntoIterator<Item = T>>(&mut self, index: u32, iter: I) {
        let len = self.len();
        assert!(index <= len, "insert index {} out of range for length {}", index, len);
        self.extend(iter);
        self.rotate_appended_into(index, len);
    }

    /// Inserts the value built by `f` before position `index`.
    pub fn emplace<F: FnOnce() -> T>(&mut self, index: u32, f: F) {
        self.insert(index, f())
    }

    /// Removes the element at `index`; returns the position that now holds its successor.
    pub fn erase(&mut self, index: u32) -> u32 {
        self.erase_range(index..index + 1)
    }

    /// Removes `range`, keeping the order of everything else. Returns `range.start`.
    ///
    /// An empty range removes nothing. Panics if the range is out of bounds.
    pub fn erase_range(&mut self, range: Range<u32>) -> u32 {
        let Range { start, end } = range;
        let len = self.len();
        assert!(start <= end && end <= len, "erase range {}..{} out of range for length {}", start, end, len);
        if start == end {
            return start;
        }
        let removed = end - start;
        self.as_mut_slice()[start as usize..].rotate_left(removed as usize);
        self.truncate(len - removed);
        start
    }

    /// Exchanges contents, capacity and resource with `other`.
    #[inline(always)]
    pub fn swap(&mut self, other: &mut Vec<T>) {
        std::mem::swap(&mut self.buffer, &mut other.buffer);
    }

    /// Takes the buffer apart; the vector forgets it.
    pub(crate) fn into_buffer(self) -> BufferState {
        let buffer = self.buffer;
        std::mem::forget(self);
        buffer
    }
}

impl<T: Relocate> Drop for Vec<T> {
    #[inline(always)]
    fn drop(&mut self) {
        let _block = scopeguard::guard(self.buffer, |buffer| unsafe { grow::free(buffer, Layout::new::<T>()) });
        unsafe { ptr::drop_in_place(self.as_mut_slice()) };
    }
}

// A vector is its buffer state; moving one moves a pointer and two counters.
unsafe impl<T: Relocate> Relocate for Vec<T> {}

unsafe impl<T: Relocate + Send> Send for Vec<T> {}
unsafe impl<T: Relocate + Sync> Sync for Vec<T> {}

impl<T: Relocate> Default for Vec<T> {
    fn default() -> Self {
        Vec::new()
    }
}

impl<T: Relocate> Deref for Vec<T> {
    type Target = [T];

    #[inline(always)]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Relocate> DerefMut for Vec<T> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Relocate> AsRef<[T]> for Vec<T> {
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Relocate> AsMut<[T]> for Vec<T> {
    fn as_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Relocate + Clone> Clone for Vec<T> {
    fn clone(&self) -> Self {
        let mut vec = Vec::with_capacity_in(self.len(), self.resource());
        for item in self.iter() {
            unsafe { vec.add_already_reserved(item.clone()) };
        }
        vec
    }
}

impl<T: Relocate + Debug> Debug for Vec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Relocate + Hash> Hash for Vec<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state)
    }
}

impl<T: Relocate + PartialEq<U>, U: Relocate> PartialEq<Vec<U>> for Vec<T> {
    fn eq(&self, other: &Vec<U>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Relocate + Eq> Eq for Vec<T> {}

impl<T: Relocate + PartialEq<U>, U> PartialEq<[U]> for Vec<T> {
    fn eq(&self, other: &[U]) -> bool {
        self.as_slice() == other
    }
}

impl<'a, T: Relocate + PartialEq<U>, U> PartialEq<&'a [U]> for Vec<T> {
    fn eq(&self, other: &&'a [U]) -> bool {
        self.as_slice() == *other
    }
}

impl<T: Relocate + PartialEq<U>, U, const N: usize> PartialEq<[U; N]> for Vec<T> {
    fn eq(&self, other: &[U; N]) -> bool {
        self.as_slice() == &other[..]
    }
}

impl<T: Relocate> Extend<T> for Vec<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        self.reserve_additional(u32::try_from(lower).unwrap_or(MAX_CAPACITY));
        for item in iter {
            self.push(item);
        }
    }
}

impl<'a, T: Relocate + Copy + 'a> Extend<&'a T> for Vec<T> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied())
    }
}

impl<T: Relocate> FromIterator<T> for Vec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut vec = Vec::new();
        vec.extend(iter);
        vec
    }
}

impl<T: Relocate, const N: usize> From<[T; N]> for Vec<T> {
    fn from(items: [T; N]) -> Self {
        let mut vec = Vec::with_capacity(N as u32);
        for item in IntoIterator::into_iter(items) {
            unsafe { vec.add_already_reserved(item) };
        }
        vec
    }
}

impl<'a, T: Relocate + Clone> From<&'a [T]> for Vec<T> {
    fn from(items: &'a [T]) -> Self {
        let mut vec = Vec::with_capacity(items.len() as u32);
        for item in items {
            unsafe { vec.add_already_reserved(item.clone()) };
        }
        vec
    }
}

impl<T: Relocate> IntoIterator for Vec<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        IntoIter::new(self.into_buffer())
    }
}

impl<'a, T: Relocate> IntoIterator for &'a Vec<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T: Relocate> IntoIterator for &'a mut Vec<T> {
    type Item = &'a mut T;
    type IntoIter = std::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// Builds a [`Vec`] from a list of values, or from `value; n` copies.
#[macro_export]
macro_rules! vec_of {
    () => (
        $crate::Vec::new()
    );
    ($elem:expr; $n:expr) => (
        $crate::Vec::from_elem($n, $elem)
    );
    ($($x:expr),+ $(,)?) => (
        $crate::Vec::from([$($x),+])
    );
}
