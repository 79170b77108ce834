//! Single-owner resources with weak observers
//!
//! A [`Resource<T>`] is the one and only owner of a heap value. Any number of
//! [`Ref<T>`] handles may observe the same value without extending its lifetime:
//! dropping (or releasing) the owner destroys the value immediately, and every
//! observer reports [`Ref::is_valid`] as `false` from then on.
//!
//! Both handles point at a shared control block that carries the value, a
//! liveness flag, the identity of the allocation and the most-derived type that
//! was originally allocated. The block itself stays alive until the owner is gone
//! *and* the last observer has been dropped, so validity checks never touch freed
//! memory.
//!
//! The handles are `!Send`: the scene graph runs on a single logical thread and
//! nothing here synchronizes across threads.

use std::any::{Any, TypeId};
use std::cell::{self, Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a control block, stable for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    fn next() -> Self {
        Self(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Most-derived type of an allocation
///
/// Captured when the value is allocated and never changed by upcasts, so a
/// `Resource<dyn Component>` still knows it holds, say, a `MeshRenderer`.
#[derive(Debug, Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    /// Tag for the concrete type `T`
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Whether this tag names exactly `T`
    pub fn is<T: 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Underlying type id
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Full type name, for diagnostics
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

/// Errors raised when dereferencing an observer handle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// The observed value has already been destroyed (or the handle is empty)
    #[error("invalid reference to {type_name}: the value has been destroyed")]
    InvalidReference {
        /// Static type of the handle that was dereferenced
        type_name: &'static str,
    },

    /// The value is alive but currently borrowed mutably further up the stack
    #[error("{type_name} is already borrowed")]
    AlreadyBorrowed {
        /// Static type of the handle that was dereferenced
        type_name: &'static str,
    },
}

/// Shared bookkeeping for one allocation
///
/// The value must be the last field so that `ControlBlock<C>` unsizes to
/// `ControlBlock<dyn Trait>`.
pub struct ControlBlock<T: ?Sized> {
    id: ResourceId,
    tag: TypeTag,
    alive: Cell<bool>,
    value: RefCell<T>,
}

impl<T: ?Sized> ControlBlock<T> {
    /// Identity of this block
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Most-derived type stored in this block
    pub fn type_tag(&self) -> TypeTag {
        self.tag
    }
}

/// Exclusive owner of a heap value
///
/// Not `Clone`. Moving it transfers ownership; [`Resource::take`] moves out of
/// a place and leaves an empty handle behind, whose accessors return `None`.
pub struct Resource<T: ?Sized> {
    block: Option<Rc<ControlBlock<T>>>,
}

/// Allocate `value` and return its owner
pub fn make_owned<T: 'static>(value: T) -> Resource<T> {
    Resource::new(value)
}

impl<T: 'static> Resource<T> {
    /// Allocate `value` and return its owner
    pub fn new(value: T) -> Self {
        Self {
            block: Some(Rc::new(ControlBlock {
                id: ResourceId::next(),
                tag: TypeTag::of::<T>(),
                alive: Cell::new(true),
                value: RefCell::new(value),
            })),
        }
    }

    /// Allocate a value that receives a handle to itself while being built
    ///
    /// The handle reports invalid until construction has finished.
    pub fn new_cyclic(build: impl FnOnce(&Ref<T>) -> T) -> Self {
        let id = ResourceId::next();
        let block = Rc::new_cyclic(|weak: &Weak<ControlBlock<T>>| {
            let this = Ref {
                block: Some(weak.clone()),
                id: Some(id),
            };
            ControlBlock {
                id,
                tag: TypeTag::of::<T>(),
                alive: Cell::new(true),
                value: RefCell::new(build(&this)),
            }
        });
        Self { block: Some(block) }
    }
}

impl<T: ?Sized> Resource<T> {
    /// An owner that holds nothing
    pub fn empty() -> Self {
        Self { block: None }
    }

    /// Whether this handle no longer owns a value
    pub fn is_empty(&self) -> bool {
        self.block.is_none()
    }

    /// Identity of the owned allocation
    pub fn id(&self) -> Option<ResourceId> {
        self.block.as_ref().map(|block| block.id)
    }

    /// Most-derived type of the owned allocation
    pub fn type_tag(&self) -> Option<TypeTag> {
        self.block.as_ref().map(|block| block.tag)
    }

    /// Shared access to the value, `None` when empty or mutably borrowed
    pub fn get(&self) -> Option<cell::Ref<'_, T>> {
        self.block.as_ref()?.value.try_borrow().ok()
    }

    /// Exclusive access to the value, `None` when empty or already borrowed
    pub fn get_mut(&self) -> Option<cell::RefMut<'_, T>> {
        self.block.as_ref()?.value.try_borrow_mut().ok()
    }

    /// Shared access that distinguishes "empty" from "busy"
    pub fn borrow(&self) -> Result<cell::Ref<'_, T>, ResourceError> {
        let block = self.block.as_ref().ok_or_else(Self::invalid)?;
        block.value.try_borrow().map_err(|_| Self::busy())
    }

    /// Exclusive access that distinguishes "empty" from "busy"
    pub fn borrow_mut(&self) -> Result<cell::RefMut<'_, T>, ResourceError> {
        let block = self.block.as_ref().ok_or_else(Self::invalid)?;
        block.value.try_borrow_mut().map_err(|_| Self::busy())
    }

    /// Create an observer for the owned value
    ///
    /// Downgrading an empty owner yields an invalid observer.
    pub fn downgrade(&self) -> Ref<T> {
        Ref {
            block: self.block.as_ref().map(Rc::downgrade),
            id: self.id(),
        }
    }

    /// Number of observers currently attached to the control block
    pub fn observer_count(&self) -> usize {
        self.block.as_ref().map_or(0, Rc::weak_count)
    }

    /// Move the value out into a new owner, leaving this one empty
    #[must_use]
    pub fn take(&mut self) -> Self {
        Self {
            block: self.block.take(),
        }
    }

    /// Destroy the owned value now
    ///
    /// Observers go invalid at once. A value pinned by [`Ref::with`] is
    /// dropped when that call returns.
    pub fn release(&mut self) {
        if let Some(block) = self.block.take() {
            block.alive.set(false);
            drop(block);
        }
    }

    /// Whether `other` observes the value owned here
    pub fn owns<U: ?Sized>(&self, other: &Ref<U>) -> bool {
        self.id().is_some() && self.id() == other.id()
    }

    /// Convert the block pointer, keeping identity and type tag
    ///
    /// Used by the upcast conversions; `convert` is always an unsizing coercion.
    pub(crate) fn map_block<U: ?Sized>(
        mut self,
        convert: impl FnOnce(Rc<ControlBlock<T>>) -> Rc<ControlBlock<U>>,
    ) -> Resource<U> {
        Resource {
            block: self.block.take().map(convert),
        }
    }

    fn invalid() -> ResourceError {
        ResourceError::InvalidReference {
            type_name: std::any::type_name::<T>(),
        }
    }

    fn busy() -> ResourceError {
        ResourceError::AlreadyBorrowed {
            type_name: std::any::type_name::<T>(),
        }
    }
}

impl<T: 'static> From<T> for Resource<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: ?Sized> Default for Resource<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ?Sized> Drop for Resource<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T: ?Sized> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.block {
            Some(block) => f
                .debug_struct("Resource")
                .field("id", &block.id)
                .field("type", &block.tag.short_name())
                .finish(),
            None => f.write_str("Resource(empty)"),
        }
    }
}

/// Weak observer of a [`Resource`]
///
/// Cheap to clone. Never keeps the value alive, only its control block.
pub struct Ref<T: ?Sized> {
    block: Option<Weak<ControlBlock<T>>>,
    id: Option<ResourceId>,
}

impl<T: ?Sized> Ref<T> {
    /// A handle that observes nothing and is never valid
    pub fn invalid() -> Self {
        Self {
            block: None,
            id: None,
        }
    }

    /// Whether the observed value still exists
    pub fn is_valid(&self) -> bool {
        self.upgrade().is_some()
    }

    /// Identity of the observed allocation, kept even after it is destroyed
    pub fn id(&self) -> Option<ResourceId> {
        self.id
    }

    /// Most-derived type of the observed value, while it is alive
    pub fn type_tag(&self) -> Option<TypeTag> {
        self.upgrade().map(|block| block.tag)
    }

    /// Whether two handles observe the same allocation
    pub fn same_as<U: ?Sized>(&self, other: &Ref<U>) -> bool {
        self.id.is_some() && self.id == other.id
    }

    /// Run `f` with shared access to the value
    ///
    /// The value is pinned while `f` runs: if its owner is released inside
    /// `f`, the handle goes invalid right away but the value is only dropped
    /// once `f` returns.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, ResourceError> {
        let block = self.upgrade().ok_or_else(Self::invalid_error)?;
        let value = block.value.try_borrow().map_err(|_| Self::busy_error())?;
        Ok(f(&value))
    }

    /// Run `f` with exclusive access to the value
    ///
    /// Pins the value like [`with`](Self::with).
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, ResourceError> {
        let block = self.upgrade().ok_or_else(Self::invalid_error)?;
        let mut value = block.value.try_borrow_mut().map_err(|_| Self::busy_error())?;
        Ok(f(&mut value))
    }

    pub(crate) fn map_block<U: ?Sized>(
        self,
        convert: impl FnOnce(Weak<ControlBlock<T>>) -> Weak<ControlBlock<U>>,
    ) -> Ref<U> {
        Ref {
            block: self.block.map(convert),
            id: self.id,
        }
    }

    fn upgrade(&self) -> Option<Rc<ControlBlock<T>>> {
        let block = self.block.as_ref()?.upgrade()?;
        block.alive.get().then_some(block)
    }

    fn invalid_error() -> ResourceError {
        ResourceError::InvalidReference {
            type_name: std::any::type_name::<T>(),
        }
    }

    fn busy_error() -> ResourceError {
        ResourceError::AlreadyBorrowed {
            type_name: std::any::type_name::<T>(),
        }
    }
}

impl<T: 'static> Ref<T> {
    /// Forget the static type, keeping the ability to downcast later
    pub fn erase(&self) -> AnyRef {
        AnyRef {
            block: self
                .block
                .clone()
                .map(|weak| weak as Weak<dyn Any>),
            id: self.id,
        }
    }
}

impl<T: ?Sized> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            block: self.block.clone(),
            id: self.id,
        }
    }
}

impl<T: ?Sized> Default for Ref<T> {
    fn default() -> Self {
        Self::invalid()
    }
}

impl<T: ?Sized> PartialEq for Ref<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T: ?Sized> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("id", &self.id)
            .field("valid", &self.is_valid())
            .finish()
    }
}

/// Type-erased observer that remembers the concrete control block type
#[derive(Clone)]
pub struct AnyRef {
    block: Option<Weak<dyn Any>>,
    id: Option<ResourceId>,
}

impl AnyRef {
    /// Recover a typed observer when the allocation is exactly a `T`
    pub fn downcast<T: 'static>(&self) -> Option<Ref<T>> {
        let erased = self.block.as_ref()?.upgrade()?;
        let block = erased.downcast::<ControlBlock<T>>().ok()?;
        Some(Ref {
            block: Some(Rc::downgrade(&block)),
            id: self.id,
        })
    }

    /// Identity of the observed allocation
    pub fn id(&self) -> Option<ResourceId> {
        self.id
    }
}

impl fmt::Debug for AnyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyRef").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe {
        value: i32,
        drops: Rc<Cell<u32>>,
    }

    impl Drop for Probe {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    fn probe(value: i32) -> (Resource<Probe>, Rc<Cell<u32>>) {
        let drops = Rc::new(Cell::new(0));
        let owner = Resource::new(Probe {
            value,
            drops: Rc::clone(&drops),
        });
        (owner, drops)
    }

    trait Shape {
        fn area(&self) -> f32;
    }

    struct Square(f32);

    impl Shape for Square {
        fn area(&self) -> f32 {
            self.0 * self.0
        }
    }

    #[test]
    fn test_take_leaves_source_empty() {
        let (mut first, _) = probe(7);
        let id = first.id();

        let second = first.take();
        assert!(first.is_empty());
        assert!(first.get().is_none());
        assert_eq!(first.id(), None);
        assert_eq!(second.id(), id);
        assert_eq!(second.get().map(|p| p.value), Some(7));

        let mut third = Resource::empty();
        assert!(third.is_empty());
        third = second;
        assert_eq!(third.get().map(|p| p.value), Some(7));
    }

    #[test]
    fn test_observer_tracks_value_lifetime() {
        let (owner, drops) = probe(1);
        let a = owner.downgrade();
        let b = a.clone();
        assert!(a.is_valid() && b.is_valid());
        assert_eq!(owner.observer_count(), 2);

        drop(b);
        assert!(a.is_valid());

        let moved = owner;
        assert!(a.is_valid());
        assert_eq!(a.with(|p| p.value), Ok(1));

        drop(moved);
        assert_eq!(drops.get(), 1);
        assert!(!a.is_valid());
        assert!(matches!(
            a.with(|p| p.value),
            Err(ResourceError::InvalidReference { .. })
        ));
    }

    #[test]
    fn test_release_destroys_immediately() {
        let (mut owner, drops) = probe(3);
        let observer = owner.downgrade();
        owner.release();
        assert_eq!(drops.get(), 1);
        assert!(owner.is_empty());
        assert!(!observer.is_valid());
        // the block is still readable through the observer's identity
        assert!(observer.id().is_some());
    }

    #[test]
    fn test_release_inside_with_defers_the_drop() {
        let (mut owner, drops) = probe(5);
        let observer = owner.downgrade();
        let seen = observer
            .with(|p| {
                owner.release();
                assert!(!observer.is_valid());
                assert_eq!(drops.get(), 0);
                p.value
            })
            .expect("alive on entry");
        assert_eq!(seen, 5);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_with_mut_reports_busy_value() {
        let (owner, _) = probe(4);
        let observer = owner.downgrade();
        let guard = owner.borrow_mut().expect("free");
        assert!(matches!(
            observer.with(|p| p.value),
            Err(ResourceError::AlreadyBorrowed { .. })
        ));
        drop(guard);
        observer.with_mut(|p| p.value = 9).expect("free again");
        assert_eq!(owner.get().map(|p| p.value), Some(9));
    }

    #[test]
    fn test_upcast_keeps_identity_and_tag() {
        let square = Resource::new(Square(2.0));
        let typed = square.downgrade();
        let id = square.id();

        let shape: Resource<dyn Shape> =
            square.map_block(|block| block as Rc<ControlBlock<dyn Shape>>);
        let base_ref: Ref<dyn Shape> = typed.clone().map_block(|weak| weak as Weak<ControlBlock<dyn Shape>>);

        assert_eq!(shape.id(), id);
        assert!(shape.type_tag().is_some_and(|tag| tag.is::<Square>()));
        assert!(base_ref.type_tag().is_some_and(|tag| tag.is::<Square>()));
        assert_eq!(base_ref.with(|s| s.area()), Ok(4.0));

        drop(shape);
        assert!(!typed.is_valid());
        assert!(!base_ref.is_valid());
    }

    #[test]
    fn test_erased_ref_downcasts_only_to_exact_type() {
        let square = Resource::new(Square(3.0));
        let erased = square.downgrade().erase();

        assert!(erased.downcast::<Probe>().is_none());
        let back = erased.downcast::<Square>().expect("exact type");
        assert!(back.same_as(&square.downgrade()));
        assert_eq!(back.with(|s| s.0), Ok(3.0));

        drop(square);
        assert!(erased.downcast::<Square>().is_none());
    }

    #[test]
    fn test_cyclic_construction_sees_own_handle() {
        struct Node {
            this: Ref<Node>,
        }

        let node = Resource::new_cyclic(|this| {
            assert!(!this.is_valid());
            Node { this: this.clone() }
        });
        let this = node.get().map(|n| n.this.clone()).expect("alive");
        assert!(this.is_valid());
        assert!(node.owns(&this));
    }

    #[test]
    fn test_invalid_ref_defaults() {
        let nothing: Ref<Square> = Ref::default();
        assert!(!nothing.is_valid());
        assert_eq!(nothing.id(), None);
        assert!(!nothing.same_as(&Ref::<Square>::invalid()));
    }
}
