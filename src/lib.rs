/*!

Growable vectors whose growth path is shared by every element type.

A [`Vec`] is two words: a pointer and two `u32` counters. Pushing into a vector with room
to spare is fully inlined. Only a full vector calls out, into [`grow::grow`], which is
compiled once for the whole program: it works on an element `Layout` and, for the few
types that can not be moved with a byte copy, a per-type [`Relocator`] function.

Memory comes from a [`MemoryResource`], the system heap unless a vector is bound to
another one with [`Vec::new_in`]. Each block remembers its resource in a small header, so
the vector does not have to.

*/

#[macro_use]
mod logging;

mod block;
mod capture;
mod error;
pub mod grow;
mod iter;
mod relocate;
mod resource;
mod traits;
mod vec;

pub use block::HEADER_SIZE;
pub use capture::{capture, LocalCapture};
pub use error::IndexFault;
pub use grow::BufferState;
pub use iter::IntoIter;
pub use relocate::{relocate_run, relocator_for, Relocate, Relocator};
pub use resource::{MemoryResource, ResourceRef, ResourceSlot, SystemHeap};
pub use traits::ResourceIterator;
pub use vec::Vec;

#[cfg(test)]
pub mod dropflag;
