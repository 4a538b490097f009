//! This module is for testing only

use crate::Relocate;
use std::cell::RefCell;
use std::rc::Rc;

pub type DropFlag<T> = Rc<RefCell<T>>;

/// Counts drops, moved around with plain byte copies.
#[derive(Debug)]
pub struct Droppable {
    pub data: i32,
    pub dropflag: DropFlag<i32>,
}

impl Drop for Droppable {
    fn drop(&mut self) {
        *self.dropflag.borrow_mut() += 1;
    }
}

unsafe impl Relocate for Droppable {}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub constructions: usize,
    pub relocations: usize,
    pub drops: usize,
}

#[derive(Debug, Default)]
struct CounterState {
    totals: Snapshot,
    relocation_order: Vec<i32>,
}

/// Shared tallies for a family of `Tracked` values.
#[derive(Debug, Clone, Default)]
pub struct Counters {
    state: DropFlag<CounterState>,
}

impl Counters {
    pub fn new() -> Counters {
        Counters::default()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().totals
    }

    /// Values of the relocated elements, in the order they were relocated.
    pub fn relocation_order(&self) -> Vec<i32> {
        self.state.borrow().relocation_order.clone()
    }

    /// Values created minus values dropped.
    pub fn alive(&self) -> usize {
        let totals = self.snapshot();
        totals.constructions + totals.relocations - totals.drops
    }
}

/// Element that needs a relocator: every move builds a fresh value and drops the old one.
#[derive(Debug)]
pub struct Tracked {
    pub value: i32,
    counters: Counters,
}

impl Tracked {
    pub fn new(counters: &Counters, value: i32) -> Tracked {
        counters.state.borrow_mut().totals.constructions += 1;
        Tracked { value, counters: counters.clone() }
    }

    fn relocated_from(other: &Tracked) -> Tracked {
        {
            let mut state = other.counters.state.borrow_mut();
            state.totals.relocations += 1;
            state.relocation_order.push(other.value);
        }
        Tracked { value: other.value, counters: other.counters.clone() }
    }
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        Tracked::new(&self.counters, self.value)
    }
}

impl PartialEq for Tracked {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.counters.state.borrow_mut().totals.drops += 1;
    }
}

unsafe impl Relocate for Tracked {
    const TRIVIAL: bool = false;

    unsafe fn relocate(dst: *mut Self, src: *mut Self) {
        std::ptr::write(dst, Tracked::relocated_from(&*src));
        std::ptr::drop_in_place(src);
    }
}

#[test]
fn dropflag() {
    let flag = DropFlag::new(RefCell::new(0));
    let droppable = Droppable { data: 1, dropflag: flag.clone() };
    assert_eq!(0, *flag.borrow());
    std::mem::drop(droppable);
    assert_eq!(1, *flag.borrow());
}

#[test]
fn tracked_counts_everything() {
    let counters = Counters::new();
    let a = Tracked::new(&counters, 1);
    let b = a.clone();
    assert_eq!(2, counters.alive());
    drop(a);
    drop(b);
    assert_eq!(Snapshot { constructions: 2, relocations: 0, drops: 2 }, counters.snapshot());
    assert_eq!(0, counters.alive());
}
