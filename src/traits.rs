use crate::{Relocate, ResourceRef, Vec};
use std::convert::TryFrom;

/// Implements collect to resource-bound vectors.
pub trait ResourceIterator: Iterator {
    fn collect_vec_in(self, resource: ResourceRef) -> Vec<Self::Item> where Self::Item: Relocate;
}

impl<Q: Iterator> ResourceIterator for Q {
    fn collect_vec_in(self, resource: ResourceRef) -> Vec<Self::Item> where Self::Item: Relocate {
        let (lower, _) = self.size_hint();
        let mut vec = Vec::with_capacity_in(u32::try_from(lower).unwrap_or(u32::MAX), resource);
        for item in self {
            vec.push(item);
        }
        vec
    }
}
