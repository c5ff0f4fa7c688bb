//! Data buffers
//!
//! A [`DataBuffer`] fills one [parameter role](crate::parameter::ParameterType) of an operation.
//! Besides its role it carries five attributes:
//!
//! - [`RoleClass`]: whether the operation reads it, writes it, both, or ignores it on this rank,
//! - [`Ownership`]: whether it holds its storage or references storage of the caller,
//! - [`Modifiability`]: whether the operation may write through it,
//! - [`AllocationOrigin`]: whether the caller or the library provided the storage,
//! - [`ResizePolicy`]: whether the operation may resize the storage to fit the data.
//!
//! The storage form follows from what the caller passes (see [`IntoBuffer`]): shared references
//! become constant referencing buffers, mutable references become modifiable referencing buffers,
//! and values (`Vec<T>` or a primitive) are moved into owning buffers. A single value behaves like
//! a container of size one.
//!
//! Owning buffers can be [extracted](DataBuffer::extract) exactly once. Every observer of an
//! extracted buffer panics.

use std::fmt;

use smallvec::SmallVec;

use crate::assertion::AssertionLevel;
use crate::datatype::Equivalence;
use crate::kassert;
use crate::parameter::ParameterType;

/// Direction in which an operation uses a buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RoleClass {
    /// Read by the operation
    In,
    /// Written by the operation
    Out,
    /// Read and written by the operation
    InOut,
    /// Absent on this rank
    Ignore,
}

/// Who holds the storage of a buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// The buffer holds its storage and may hand it out through [`DataBuffer::extract`].
    Owning,
    /// The buffer refers to storage of the caller.
    Referencing,
}

/// Whether an operation may write through a buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Modifiability {
    Constant,
    Modifiable,
}

/// Who provided the storage of a buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AllocationOrigin {
    /// Allocated by the library because the caller wants the output returned by value.
    Library,
    /// Provided by the caller.
    User,
}

/// How an operation may change the size of a buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum ResizePolicy {
    /// The size is never changed. The buffer must be large enough.
    #[default]
    NoResize,
    /// The buffer is enlarged if it is too small, but never shrunk.
    GrowOnly,
    /// The buffer is resized to exactly the size needed.
    ResizeToFit,
}

/// A contiguous container that can change its length.
pub trait ResizableContainer<T> {
    /// The elements.
    fn as_slice(&self) -> &[T];

    /// The elements, mutably.
    fn as_mut_slice(&mut self) -> &mut [T];

    /// Changes the length to `len`, filling new slots with default values.
    fn resize_to(&mut self, len: usize);
}

impl<T: Default + Clone> ResizableContainer<T> for Vec<T> {
    fn as_slice(&self) -> &[T] {
        self
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        self
    }

    fn resize_to(&mut self, len: usize) {
        self.resize(len, T::default());
    }
}

impl<A> ResizableContainer<A::Item> for SmallVec<A>
where
    A: smallvec::Array,
    A::Item: Default + Clone,
{
    fn as_slice(&self) -> &[A::Item] {
        self
    }

    fn as_mut_slice(&mut self) -> &mut [A::Item] {
        self
    }

    fn resize_to(&mut self, len: usize) {
        self.resize(len, A::Item::default());
    }
}

enum Storage<'a, T> {
    Borrowed(&'a [T]),
    BorrowedMut(&'a mut [T]),
    Container(&'a mut dyn ResizableContainer<T>),
    Owned(Vec<T>),
    Extracted,
}

/// Storage handed over by a caller, see [`IntoBuffer`].
pub struct BufferStorage<'a, T> {
    storage: Storage<'a, T>,
    single: bool,
}

impl<'a, T> BufferStorage<'a, T> {
    /// Constant storage referencing `slice`.
    pub fn borrowed(slice: &'a [T]) -> Self {
        BufferStorage {
            storage: Storage::Borrowed(slice),
            single: false,
        }
    }

    /// Modifiable storage referencing `slice`. Cannot be resized.
    pub fn borrowed_mut(slice: &'a mut [T]) -> Self {
        BufferStorage {
            storage: Storage::BorrowedMut(slice),
            single: false,
        }
    }

    /// Modifiable, resizable storage referencing `container`.
    pub fn container(container: &'a mut dyn ResizableContainer<T>) -> Self {
        BufferStorage {
            storage: Storage::Container(container),
            single: false,
        }
    }

    /// Constant storage referencing a single value.
    pub fn single_ref(value: &'a T) -> Self {
        BufferStorage::borrowed(std::slice::from_ref(value)).single()
    }

    /// Modifiable storage referencing a single value.
    pub fn single_mut(value: &'a mut T) -> Self {
        BufferStorage::borrowed_mut(std::slice::from_mut(value)).single()
    }

    /// Storage moved into the buffer.
    pub fn owned(values: Vec<T>) -> Self {
        BufferStorage {
            storage: Storage::Owned(values),
            single: false,
        }
    }

    /// A single value moved into the buffer.
    pub fn owned_single(value: T) -> Self {
        BufferStorage {
            storage: Storage::Owned(vec![value]),
            single: true,
        }
    }

    fn single(mut self) -> Self {
        self.single = true;
        self
    }

    fn is_modifiable(&self) -> bool {
        !matches!(self.storage, Storage::Borrowed(_))
    }
}

/// Conversion of the caller's argument into buffer storage.
///
/// | Argument | Buffer |
/// |---|---|
/// | `&T`, `&[T]`, `&Vec<T>` | constant, referencing |
/// | `&mut T`, `&mut [T]` | modifiable, referencing, not resizable |
/// | `&mut Vec<T>`, `&mut SmallVec<A>` | modifiable, referencing, resizable |
/// | `Vec<T>`, primitive values | owning |
///
/// `&T`, `&mut T` and primitives are single-element buffers. Note that `&[T; N]` is a single
/// element of the array type; pass `&array[..]` to get a container of `N` elements.
pub trait IntoBuffer<'a> {
    /// Element type of the buffer
    type Elem;

    /// The storage.
    fn into_storage(self) -> BufferStorage<'a, Self::Elem>;
}

/// Arguments that yield modifiable storage.
pub trait IntoMutBuffer<'a>: IntoBuffer<'a> {}

impl<'a, T: Equivalence> IntoBuffer<'a> for &'a T {
    type Elem = T;
    fn into_storage(self) -> BufferStorage<'a, T> {
        BufferStorage::single_ref(self)
    }
}

impl<'a, T: Equivalence> IntoBuffer<'a> for &'a [T] {
    type Elem = T;
    fn into_storage(self) -> BufferStorage<'a, T> {
        BufferStorage::borrowed(self)
    }
}

impl<'a, T: Equivalence> IntoBuffer<'a> for &'a Vec<T> {
    type Elem = T;
    fn into_storage(self) -> BufferStorage<'a, T> {
        BufferStorage::borrowed(self.as_slice())
    }
}

impl<'a, T: Equivalence> IntoBuffer<'a> for &'a mut T {
    type Elem = T;
    fn into_storage(self) -> BufferStorage<'a, T> {
        BufferStorage::single_mut(self)
    }
}
impl<'a, T: Equivalence> IntoMutBuffer<'a> for &'a mut T {}

impl<'a, T: Equivalence> IntoBuffer<'a> for &'a mut [T] {
    type Elem = T;
    fn into_storage(self) -> BufferStorage<'a, T> {
        BufferStorage::borrowed_mut(self)
    }
}
impl<'a, T: Equivalence> IntoMutBuffer<'a> for &'a mut [T] {}

impl<'a, T: Equivalence + Default> IntoBuffer<'a> for &'a mut Vec<T> {
    type Elem = T;
    fn into_storage(self) -> BufferStorage<'a, T> {
        BufferStorage::container(self)
    }
}
impl<'a, T: Equivalence + Default> IntoMutBuffer<'a> for &'a mut Vec<T> {}

impl<'a, A> IntoBuffer<'a> for &'a mut SmallVec<A>
where
    A: smallvec::Array,
    A::Item: Equivalence + Default,
{
    type Elem = A::Item;
    fn into_storage(self) -> BufferStorage<'a, A::Item> {
        BufferStorage::container(self)
    }
}
impl<'a, A> IntoMutBuffer<'a> for &'a mut SmallVec<A>
where
    A: smallvec::Array,
    A::Item: Equivalence + Default,
{
}

impl<'a, T: Equivalence> IntoBuffer<'a> for Vec<T> {
    type Elem = T;
    fn into_storage(self) -> BufferStorage<'a, T> {
        BufferStorage::owned(self)
    }
}
impl<'a, T: Equivalence> IntoMutBuffer<'a> for Vec<T> {}

macro_rules! owned_single_buffer {
    ($($ty:ty),*) => {
        $(
        impl<'a> IntoBuffer<'a> for $ty {
            type Elem = $ty;
            fn into_storage(self) -> BufferStorage<'a, $ty> {
                BufferStorage::owned_single(self)
            }
        }
        impl<'a> IntoMutBuffer<'a> for $ty {}
        )*
    };
}

owned_single_buffer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool);

/// Storage for one parameter role of an operation.
pub struct DataBuffer<'a, T> {
    role: ParameterType,
    class: RoleClass,
    modifiability: Modifiability,
    origin: AllocationOrigin,
    policy: ResizePolicy,
    single: bool,
    storage: Storage<'a, T>,
}

impl<'a, T> DataBuffer<'a, T> {
    /// A buffer backed by storage of the caller.
    ///
    /// # Panics
    /// Panics if an operation is supposed to write to constant storage.
    pub fn new(role: ParameterType, class: RoleClass, storage: BufferStorage<'a, T>) -> Self {
        let writes = matches!(class, RoleClass::Out | RoleClass::InOut);
        kassert!(
            AssertionLevel::Light,
            !writes || storage.is_modifiable(),
            "{:?} is written by the operation and needs modifiable storage",
            role
        );
        let modifiability = if writes {
            Modifiability::Modifiable
        } else {
            Modifiability::Constant
        };
        DataBuffer {
            role,
            class,
            modifiability,
            origin: AllocationOrigin::User,
            policy: ResizePolicy::NoResize,
            single: storage.single,
            storage: storage.storage,
        }
    }

    /// An empty container allocated by the library, resized to fit by the operation.
    pub fn library_allocated(role: ParameterType, class: RoleClass) -> Self {
        DataBuffer {
            role,
            class,
            modifiability: Modifiability::Modifiable,
            origin: AllocationOrigin::Library,
            policy: ResizePolicy::ResizeToFit,
            single: false,
            storage: Storage::Owned(Vec::new()),
        }
    }

    /// A single value allocated by the library.
    pub fn library_allocated_single(role: ParameterType, class: RoleClass, value: T) -> Self {
        DataBuffer {
            role,
            class,
            modifiability: Modifiability::Modifiable,
            origin: AllocationOrigin::Library,
            policy: ResizePolicy::NoResize,
            single: true,
            storage: Storage::Owned(vec![value]),
        }
    }

    /// A placeholder for a buffer that is absent on this rank.
    pub fn ignored(role: ParameterType) -> Self {
        DataBuffer {
            role,
            class: RoleClass::Ignore,
            modifiability: Modifiability::Constant,
            origin: AllocationOrigin::User,
            policy: ResizePolicy::NoResize,
            single: false,
            storage: Storage::Borrowed(&[]),
        }
    }

    /// Changes the resize policy.
    ///
    /// # Panics
    /// Panics unless the policy is `NoResize` or the buffer is a modifiable, resizable container.
    pub fn with_resize_policy(mut self, policy: ResizePolicy) -> Self {
        if policy != ResizePolicy::NoResize {
            kassert!(
                AssertionLevel::Light,
                self.modifiability == Modifiability::Modifiable,
                "constant buffer {:?} cannot be resized",
                self.role
            );
            kassert!(
                AssertionLevel::Light,
                !self.single,
                "single-element buffer {:?} cannot be resized",
                self.role
            );
            kassert!(
                AssertionLevel::Light,
                matches!(self.storage, Storage::Container(_) | Storage::Owned(_)),
                "the storage of {:?} has no resize operation",
                self.role
            );
        }
        self.policy = policy;
        self
    }

    /// The parameter role this buffer fills.
    pub fn role(&self) -> ParameterType {
        self.role
    }

    pub fn role_class(&self) -> RoleClass {
        self.class
    }

    pub fn ownership(&self) -> Ownership {
        match self.storage {
            Storage::Owned(_) | Storage::Extracted => Ownership::Owning,
            _ => Ownership::Referencing,
        }
    }

    pub fn modifiability(&self) -> Modifiability {
        self.modifiability
    }

    pub fn allocation(&self) -> AllocationOrigin {
        self.origin
    }

    pub fn resize_policy(&self) -> ResizePolicy {
        self.policy
    }

    /// Whether this buffer holds a single value rather than a container.
    pub fn is_single_element(&self) -> bool {
        self.single
    }

    pub fn is_extracted(&self) -> bool {
        matches!(self.storage, Storage::Extracted)
    }

    pub fn is_ignored(&self) -> bool {
        self.class == RoleClass::Ignore
    }

    /// Whether the buffer is handed back to the caller in the result of the operation: it owns
    /// its storage and the operation writes to it.
    pub fn is_output(&self) -> bool {
        self.ownership() == Ownership::Owning
            && matches!(self.class, RoleClass::Out | RoleClass::InOut)
    }

    /// Marks an owning input buffer to be handed back in the result after the operation.
    pub(crate) fn return_to_caller(&mut self) {
        if self.class == RoleClass::In && self.ownership() == Ownership::Owning {
            self.class = RoleClass::InOut;
        }
    }

    fn assert_not_extracted(&self) {
        kassert!(
            AssertionLevel::Light,
            !self.is_extracted(),
            "buffer {:?} has already been extracted",
            self.role
        );
    }

    /// Number of elements; `1` for single-element buffers.
    pub fn size(&self) -> usize {
        self.underlying().len()
    }

    /// The stored elements.
    pub fn underlying(&self) -> &[T] {
        self.assert_not_extracted();
        match &self.storage {
            Storage::Borrowed(slice) => slice,
            Storage::BorrowedMut(slice) => slice,
            Storage::Container(container) => container.as_slice(),
            Storage::Owned(values) => values,
            Storage::Extracted => &[],
        }
    }

    /// The stored elements, mutably.
    ///
    /// # Panics
    /// Panics if the buffer is constant.
    pub fn underlying_mut(&mut self) -> &mut [T] {
        self.assert_not_extracted();
        kassert!(
            AssertionLevel::Light,
            self.modifiability == Modifiability::Modifiable,
            "buffer {:?} is constant",
            self.role
        );
        match &mut self.storage {
            Storage::Borrowed(_) | Storage::Extracted => &mut [],
            Storage::BorrowedMut(slice) => slice,
            Storage::Container(container) => container.as_mut_slice(),
            Storage::Owned(values) => values,
        }
    }

    /// Pointer to the first element.
    pub fn data(&self) -> *const T {
        self.underlying().as_ptr()
    }

    /// Mutable pointer to the first element.
    ///
    /// # Panics
    /// Panics if the buffer is constant.
    pub fn data_mut(&mut self) -> *mut T {
        self.underlying_mut().as_mut_ptr()
    }

    /// Moves the stored container out of an owning buffer.
    ///
    /// # Panics
    /// Panics if the buffer references storage of the caller or has been extracted before.
    pub fn extract(&mut self) -> Vec<T> {
        self.assert_not_extracted();
        kassert!(
            AssertionLevel::Light,
            self.ownership() == Ownership::Owning,
            "buffer {:?} references caller storage and cannot be extracted",
            self.role
        );
        match std::mem::replace(&mut self.storage, Storage::Extracted) {
            Storage::Owned(values) => values,
            _ => Vec::new(),
        }
    }

    /// Moves the value out of an owning single-element buffer.
    ///
    /// # Panics
    /// Panics under the same conditions as [`extract`](DataBuffer::extract), or if the buffer
    /// does not hold exactly one element.
    pub fn extract_single(&mut self) -> T {
        let mut values = self.extract();
        kassert!(
            AssertionLevel::Light,
            values.len() == 1,
            "buffer {:?} holds {} elements instead of one",
            self.role,
            values.len()
        );
        match values.pop() {
            Some(value) => value,
            None => panic!("buffer {:?} is empty", self.role),
        }
    }
}

impl<'a, T: Copy> DataBuffer<'a, T> {
    /// The first element of the buffer.
    pub fn first(&self) -> Option<T> {
        self.underlying().first().copied()
    }

    /// Overwrites the first element.
    ///
    /// # Panics
    /// Panics if the buffer is empty or constant.
    pub(crate) fn set_first(&mut self, value: T) {
        kassert!(
            AssertionLevel::Light,
            self.size() >= 1,
            "buffer {:?} is empty and cannot hold the value",
            self.role
        );
        if let Some(slot) = self.underlying_mut().first_mut() {
            *slot = value;
        }
    }
}

impl<'a, T: Default + Clone> DataBuffer<'a, T> {
    /// Resizes the storage according to the resize policy. `size` is only evaluated if the
    /// policy allows resizing.
    pub fn resize_if_requested(&mut self, size: impl FnOnce() -> usize) {
        if self.policy == ResizePolicy::NoResize {
            return;
        }
        self.assert_not_extracted();
        let requested = size();
        let current = self.size();
        let target = match self.policy {
            ResizePolicy::GrowOnly if current >= requested => return,
            ResizePolicy::NoResize => return,
            _ => requested,
        };
        match &mut self.storage {
            Storage::Container(container) => container.resize_to(target),
            Storage::Owned(values) => values.resize(target, T::default()),
            _ => {}
        }
    }

    /// Resizes under the resize policy, then requires at least `required` elements.
    ///
    /// # Panics
    /// Panics if the buffer is still too small.
    pub(crate) fn prepare(&mut self, required: usize) {
        self.resize_if_requested(|| required);
        kassert!(
            AssertionLevel::Light,
            self.size() >= required,
            "buffer {:?} holds {} elements but {} are required; \
             pass a larger buffer or allow resizing",
            self.role,
            self.size(),
            required
        );
    }
}

impl<'a, T> fmt::Debug for DataBuffer<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = if self.is_extracted() {
            None
        } else {
            Some(self.underlying().len())
        };
        f.debug_struct("DataBuffer")
            .field("role", &self.role)
            .field("class", &self.class)
            .field("ownership", &self.ownership())
            .field("modifiability", &self.modifiability)
            .field("allocation", &self.origin)
            .field("resize_policy", &self.policy)
            .field("single", &self.single)
            .field("size", &size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recv(storage: BufferStorage<'_, i32>) -> DataBuffer<'_, i32> {
        DataBuffer::new(ParameterType::RecvBuf, RoleClass::Out, storage)
    }

    #[test]
    fn referencing_constant_buffer_exposes_caller_storage() {
        let values = vec![1, 2, 3];
        let buffer = DataBuffer::new(ParameterType::SendBuf, RoleClass::In, (&values).into_storage());
        assert_eq!(buffer.size(), 3);
        assert_eq!(buffer.data(), values.as_ptr());
        assert_eq!(buffer.ownership(), Ownership::Referencing);
        assert_eq!(buffer.modifiability(), Modifiability::Constant);
        assert_eq!(buffer.allocation(), AllocationOrigin::User);
        assert!(!buffer.is_output());
    }

    #[test]
    fn single_value_reports_size_one() {
        let value = 7u64;
        let buffer = DataBuffer::new(ParameterType::SendBuf, RoleClass::In, (&value).into_storage());
        assert!(buffer.is_single_element());
        assert_eq!(buffer.size(), 1);
        assert_eq!(buffer.data(), &value as *const u64);

        let owned = DataBuffer::new(ParameterType::SendBuf, RoleClass::In, 5i32.into_storage());
        assert!(owned.is_single_element());
        assert_eq!(owned.underlying(), &[5]);
    }

    #[test]
    fn first_element_is_overwritten() {
        let mut values = vec![1, 2];
        let mut buffer = recv((&mut values).into_storage());
        buffer.set_first(9);
        assert_eq!(buffer.underlying(), &[9, 2]);
    }

    #[test]
    #[should_panic(expected = "is empty and cannot hold the value")]
    fn empty_buffer_cannot_take_a_value() {
        let mut values: [i32; 0] = [];
        let mut buffer = recv(BufferStorage::borrowed_mut(&mut values));
        buffer.set_first(1);
    }

    #[test]
    fn no_resize_never_changes_size() {
        let mut values = vec![0; 2];
        let mut buffer = recv((&mut values).into_storage());
        let mut evaluated = false;
        buffer.resize_if_requested(|| {
            evaluated = true;
            10
        });
        assert!(!evaluated);
        assert_eq!(buffer.size(), 2);
    }

    #[test]
    fn grow_only_never_shrinks() {
        let mut values = vec![0; 4];
        {
            let mut buffer =
                recv((&mut values).into_storage()).with_resize_policy(ResizePolicy::GrowOnly);
            buffer.resize_if_requested(|| 2);
            assert_eq!(buffer.size(), 4);
            buffer.resize_if_requested(|| 6);
            assert_eq!(buffer.size(), 6);
        }
        assert_eq!(values.len(), 6);
    }

    #[test]
    fn resize_to_fit_matches_exactly() {
        let mut values = vec![9; 8];
        {
            let mut buffer =
                recv((&mut values).into_storage()).with_resize_policy(ResizePolicy::ResizeToFit);
            buffer.resize_if_requested(|| 3);
            assert_eq!(buffer.size(), 3);
        }
        assert_eq!(values, vec![9, 9, 9]);
    }

    #[test]
    fn smallvec_can_back_a_resizable_buffer() {
        let mut values: SmallVec<[i32; 4]> = SmallVec::new();
        {
            let mut buffer =
                recv((&mut values).into_storage()).with_resize_policy(ResizePolicy::ResizeToFit);
            buffer.resize_if_requested(|| 6);
            buffer.underlying_mut()[5] = 1;
        }
        assert_eq!(values.as_slice(), &[0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn library_allocated_buffers_own_and_fit() {
        let mut buffer: DataBuffer<'_, i32> =
            DataBuffer::library_allocated(ParameterType::RecvBuf, RoleClass::Out);
        assert_eq!(buffer.ownership(), Ownership::Owning);
        assert_eq!(buffer.allocation(), AllocationOrigin::Library);
        assert_eq!(buffer.resize_policy(), ResizePolicy::ResizeToFit);
        assert!(buffer.is_output());
        buffer.prepare(5);
        assert_eq!(buffer.size(), 5);
        assert_eq!(buffer.extract(), vec![0; 5]);
    }

    #[test]
    fn extraction_succeeds_once() {
        let mut buffer = recv(vec![1, 2].into_storage());
        assert_eq!(buffer.extract(), vec![1, 2]);
        assert!(buffer.is_extracted());
    }

    #[test]
    #[should_panic(expected = "already been extracted")]
    fn second_extraction_fails() {
        let mut buffer = recv(vec![1, 2].into_storage());
        let _ = buffer.extract();
        let _ = buffer.extract();
    }

    #[test]
    #[should_panic(expected = "already been extracted")]
    fn size_after_extraction_fails() {
        let mut buffer = recv(vec![1].into_storage());
        let _ = buffer.extract();
        let _ = buffer.size();
    }

    #[test]
    #[should_panic(expected = "already been extracted")]
    fn resize_after_extraction_fails() {
        let mut buffer = recv(Vec::new().into_storage()).with_resize_policy(ResizePolicy::GrowOnly);
        let _ = buffer.extract();
        buffer.resize_if_requested(|| 1);
    }

    #[test]
    #[should_panic(expected = "cannot be extracted")]
    fn referencing_buffers_cannot_be_extracted() {
        let mut values = vec![1];
        let mut buffer = recv((&mut values).into_storage());
        let _ = buffer.extract();
    }

    #[test]
    #[should_panic(expected = "cannot be resized")]
    fn single_element_buffers_cannot_resize() {
        let mut value = 0i32;
        let _ = recv((&mut value).into_storage()).with_resize_policy(ResizePolicy::GrowOnly);
    }

    #[test]
    #[should_panic(expected = "has no resize operation")]
    fn slices_cannot_resize() {
        let mut values = [0i32; 3];
        let _ = recv((&mut values[..]).into_storage()).with_resize_policy(ResizePolicy::ResizeToFit);
    }

    #[test]
    #[should_panic(expected = "needs modifiable storage")]
    fn output_buffers_need_modifiable_storage() {
        let values = vec![1, 2];
        let _ = recv((&values).into_storage());
    }

    #[test]
    #[should_panic(expected = "are required")]
    fn too_small_fixed_buffer_fails_before_use() {
        let mut values = vec![0; 2];
        let mut buffer = recv((&mut values).into_storage());
        buffer.prepare(3);
    }

    #[test]
    fn owning_input_can_be_returned() {
        let mut buffer =
            DataBuffer::new(ParameterType::SendBuf, RoleClass::In, vec![1, 3, 5].into_storage());
        assert!(!buffer.is_output());
        buffer.return_to_caller();
        assert!(buffer.is_output());
        assert_eq!(buffer.extract(), vec![1, 3, 5]);
    }

    #[test]
    fn ignored_buffers_are_empty() {
        let buffer: DataBuffer<'_, f64> = DataBuffer::ignored(ParameterType::RecvBuf);
        assert!(buffer.is_ignored());
        assert_eq!(buffer.size(), 0);
        assert!(!buffer.is_output());
    }
}
