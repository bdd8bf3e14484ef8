//! Composite storage inside the flat heap.
//!
//! The heap is seen through two typed views, `$I32` and `$F32`, addressed by
//! slot index. Booleans live in the integer view. Both views share one slot
//! numbering, so the regions below are common to both.
//!
//! - The *transient stack* grows up from slot 0. `$sp` is the next free slot.
//!   Materializing N components emits N stores of the form `view[$sp++] = c`
//!   followed by `$sp = $sp - N`; the value of the whole expression is `$sp`
//!   after the rollback, i.e. the base slot of the block just written. The
//!   block stays valid only until the next materialization.
//! - *Static storage* is handed out at compile time from the top of the heap
//!   downwards. Named composites and spilled temporaries live there. Functions
//!   cannot recurse, so one region per declaration is enough.

use std::rc::Rc;

use crate::{
    ast::{
        expressions::{BinaryOperator, Expr, UpdateOperator},
        types::{BufferKind, ScalarKind, Type},
    },
    errors::errors::{Error, ErrorImpl},
    Position,
};

pub const STACK_POINTER: &str = "$sp";

/// Bytes per heap slot; both views use 32-bit elements.
const SLOT_BYTES: usize = 4;

pub fn view_name(buffer: BufferKind) -> &'static str {
    match buffer {
        BufferKind::Int => "$I32",
        BufferKind::Float => "$F32",
    }
}

#[derive(Debug)]
pub struct CompositeStack {
    heap_slots: usize,
    reserved: usize,
    high_water: usize,
}

impl CompositeStack {
    pub fn new(heap_size: usize) -> Self {
        CompositeStack {
            heap_slots: heap_size / SLOT_BYTES,
            reserved: 0,
            high_water: 0,
        }
    }

    /// The identifier of the typed view holding `kind`.
    pub fn view(kind: ScalarKind) -> Rc<Expr> {
        let buffer = kind.buffer();
        Rc::new(Expr::identifier(
            view_name(buffer),
            Type::array(buffer.scalar().as_type(), 0),
        ))
    }

    pub fn stack_pointer() -> Rc<Expr> {
        Rc::new(Expr::identifier(STACK_POINTER, Type::Int))
    }

    /// `base + offset`. Offset zero yields the base unchanged and a literal
    /// base is folded.
    pub fn offset(base: &Rc<Expr>, offset: usize) -> Rc<Expr> {
        if offset == 0 {
            return base.clone();
        }
        if let Some(address) = base.as_int_constant() {
            return Rc::new(Expr::literal_int(address + offset as i64));
        }
        Rc::new(Expr::raw_binary(
            BinaryOperator::Add,
            base.clone(),
            Rc::new(Expr::literal_int(offset as i64)),
            Type::Int,
        ))
    }

    /// The heap slot at `address`, read or written as `kind`.
    pub fn slot(kind: ScalarKind, address: Rc<Expr>) -> Expr {
        Expr::member_as(CompositeStack::view(kind), address, kind.as_type())
    }

    /// Reserves `slots` of static storage and returns the base slot.
    pub fn reserve(&mut self, slots: usize) -> usize {
        self.reserved += slots;
        let base = self.heap_slots.saturating_sub(self.reserved);
        tracing::trace!(slots, base, "reserved static storage");
        base
    }

    /// Writes `components` to consecutive slots starting at `base`, in order.
    pub fn store_all(
        base: &Rc<Expr>,
        components: &[Rc<Expr>],
        position: &Position,
    ) -> Result<Vec<Rc<Expr>>, Error> {
        components
            .iter()
            .enumerate()
            .map(|(index, component)| {
                let kind = scalar_kind(component, position)?;
                let slot = CompositeStack::slot(kind, CompositeStack::offset(base, index));
                Ok(Rc::new(Expr::assignment(slot, component.clone(), position)?))
            })
            .collect()
    }

    /// Pushes `components` onto the transient stack and pops them again.
    ///
    /// The result is typed `ty` and evaluates to the base slot of the block.
    pub fn materialize(
        &mut self,
        components: &[Rc<Expr>],
        ty: Type,
        position: &Position,
    ) -> Result<Expr, Error> {
        let count = components.len();
        let mut items = Vec::with_capacity(count + 1);
        let mut demand = count;

        for (index, component) in components.iter().enumerate() {
            let kind = scalar_kind(component, position)?;
            let push = Expr::update(
                UpdateOperator::Increment,
                false,
                CompositeStack::stack_pointer(),
                position,
            )?;
            let slot = CompositeStack::slot(kind, Rc::new(push));
            // The slot address is taken before the component is evaluated.
            demand = demand.max(index + 1 + component.stack_demand());
            items.push(Rc::new(Expr::assignment(slot, component.clone(), position)?));
        }

        let rollback = Expr::binary(
            BinaryOperator::Subtract,
            CompositeStack::stack_pointer(),
            Expr::literal_int(count as i64),
            position,
        )?;
        items.push(Rc::new(Expr::assignment(
            CompositeStack::stack_pointer(),
            rollback,
            position,
        )?));

        self.high_water = self.high_water.max(demand);
        tracing::trace!(components = count, demand, "materialized composite");
        Ok(Expr::sequence_as(items, ty).with_stack_demand(demand))
    }

    /// Peak transient stack use seen so far.
    pub fn stack_slots(&self) -> usize {
        self.high_water
    }

    pub fn static_slots(&self) -> usize {
        self.reserved
    }

    /// Fails when static storage and the transient stack cannot both fit.
    pub fn check_capacity(&self, position: &Position) -> Result<(), Error> {
        let needed = self.reserved + self.high_water;
        if needed > self.heap_slots {
            return Err(Error::new(
                ErrorImpl::HeapExhausted {
                    needed,
                    available: self.heap_slots,
                },
                position.clone(),
            ));
        }
        Ok(())
    }
}

fn scalar_kind(component: &Expr, position: &Position) -> Result<ScalarKind, Error> {
    match component.ty() {
        Type::Bool => Ok(ScalarKind::Bool),
        Type::Int => Ok(ScalarKind::Int),
        Type::Float => Ok(ScalarKind::Float),
        other => Err(Error::new(
            ErrorImpl::NonScalarOperand {
                operator: format!("store of {}", other),
            },
            position.clone(),
        )),
    }
}
