//! Describing data
//!
//! Every element type that can travel through an MPI call implements [`Equivalence`], which ties
//! the Rust type to an MPI datatype handle. [`datatype_of`] is the entry point used by all
//! operations.
//!
//! - Primitive integers, floats, `bool`, [`Byte`], [`CChar`] and (with the `complex` feature)
//!   `Complex<f32>`/`Complex<f64>` map onto the handles predefined by MPI. These need no commit.
//! - `Wrapping<T>` is transparent and maps onto the handle of `T`.
//! - Arrays `[T; N]` map onto a contiguous composite of `N` elements of `T`.
//! - Tuples map onto a struct composite whose displacements are taken from the addresses of the
//!   fields of an instance. The extent is resized to the size of the tuple.
//! - Structs and fieldless enums can use `#[derive(Equivalence)]` (feature `derive`).
//! - Any other plain-old-data type can be sent as raw bytes with
//!   [`impl_equivalence_as_bytes!`](crate::impl_equivalence_as_bytes).
//!
//! Composite handles are built on first use, cached per type in [`registry`], and registered with
//! the environment, which frees each of them exactly once when it finalizes MPI.

use std::mem::{self, MaybeUninit};
use std::num::Wrapping;
use std::os::raw::{c_int, c_void};
use std::ptr;

use crate::cast::{asserting_cast, throwing_cast};
use crate::error::{check, Result};
use crate::ffi;
use crate::ffi::{MPI_Aint, MPI_Datatype};

pub mod registry;

#[cfg(feature = "derive")]
pub use kamping_derive::Equivalence;

/// Broad classification of a datatype.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeCategory {
    /// Signed or unsigned integers
    Integer,
    /// Floating point numbers
    Floating,
    /// Complex numbers
    Complex,
    /// Booleans
    Logical,
    /// Uninterpreted bytes
    Byte,
    /// C characters
    Character,
    /// Composites with heterogeneous fields
    Struct,
    /// Composites of repeated elements
    Contiguous,
}

/// An MPI datatype handle together with its category.
///
/// Handles of built-in types are owned by the MPI library. Handles of composites are owned by the
/// environment once they have been registered.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Datatype {
    raw: MPI_Datatype,
    category: TypeCategory,
    builtin: bool,
}

// Datatype handles are plain identifiers, MPI allows using them from any thread.
unsafe impl Send for Datatype {}
unsafe impl Sync for Datatype {}

impl Datatype {
    pub(crate) fn builtin(raw: MPI_Datatype, category: TypeCategory) -> Self {
        Datatype {
            raw,
            category,
            builtin: true,
        }
    }

    /// The null datatype handle.
    pub fn null() -> Self {
        Datatype {
            raw: unsafe { ffi::KAMPING_DATATYPE_NULL },
            category: TypeCategory::Byte,
            builtin: true,
        }
    }

    /// Wraps a handle obtained from elsewhere.
    ///
    /// Whether the handle is one of MPI's predefined handles is queried from its envelope.
    ///
    /// # Safety
    /// `raw` must be a valid, committed datatype handle that outlives every use of the returned
    /// value.
    pub unsafe fn from_raw(raw: MPI_Datatype, category: TypeCategory) -> Result<Self> {
        let mut datatype = Datatype {
            raw,
            category,
            builtin: false,
        };
        datatype.builtin = datatype.envelope()?.combiner == Combiner::Named;
        Ok(datatype)
    }

    /// The raw handle.
    pub fn as_raw(&self) -> MPI_Datatype {
        self.raw
    }

    /// The category of the described elements.
    pub fn category(&self) -> TypeCategory {
        self.category
    }

    /// Whether this handle is one of the handles predefined by MPI.
    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    /// Whether this handle must be committed (and later freed) by the library.
    pub fn requires_commit(&self) -> bool {
        !self.builtin
    }

    /// Whether this is the null handle.
    pub fn is_null(&self) -> bool {
        self.raw == unsafe { ffi::KAMPING_DATATYPE_NULL }
    }

    /// Constructs and commits a contiguous composite of `count` elements of `element`.
    ///
    /// # Standard section(s)
    ///
    /// 5.1.2
    pub fn contiguous(count: usize, element: &Datatype) -> Result<Datatype> {
        let count: c_int = throwing_cast(count)?;
        let mut raw = unsafe { ffi::KAMPING_DATATYPE_NULL };
        check("MPI_Type_contiguous", unsafe {
            ffi::MPI_Type_contiguous(count, element.raw, &mut raw)
        })?;
        check("MPI_Type_commit", unsafe { ffi::MPI_Type_commit(&mut raw) })?;
        Ok(Datatype {
            raw,
            category: TypeCategory::Contiguous,
            builtin: false,
        })
    }

    /// Constructs and commits a struct composite describing `T`.
    ///
    /// `fields` holds the displacement of every field relative to the start of `T` and the
    /// datatype of that field. The extent of the result is resized to `size_of::<T>()` so that
    /// consecutive elements line up with a Rust slice.
    ///
    /// # Standard section(s)
    ///
    /// 5.1.2, 5.1.7
    pub fn structured<T>(fields: &[(MPI_Aint, Datatype)]) -> Result<Datatype> {
        let count: c_int = throwing_cast(fields.len())?;
        let blocklengths = vec![1 as c_int; fields.len()];
        let displacements: Vec<MPI_Aint> = fields.iter().map(|(displ, _)| *displ).collect();
        let types: Vec<MPI_Datatype> = fields.iter().map(|(_, datatype)| datatype.raw).collect();

        let mut unresized = unsafe { ffi::KAMPING_DATATYPE_NULL };
        check("MPI_Type_create_struct", unsafe {
            ffi::MPI_Type_create_struct(
                count,
                blocklengths.as_ptr(),
                displacements.as_ptr(),
                types.as_ptr(),
                &mut unresized,
            )
        })?;
        let mut raw = unsafe { ffi::KAMPING_DATATYPE_NULL };
        let extent: MPI_Aint = throwing_cast(mem::size_of::<T>())?;
        let resized = check("MPI_Type_create_resized", unsafe {
            ffi::MPI_Type_create_resized(unresized, 0, extent, &mut raw)
        });
        check("MPI_Type_free", unsafe { ffi::MPI_Type_free(&mut unresized) })?;
        resized?;
        check("MPI_Type_commit", unsafe { ffi::MPI_Type_commit(&mut raw) })?;
        Ok(Datatype {
            raw,
            category: TypeCategory::Struct,
            builtin: false,
        })
    }

    /// Constructs and commits a composite of `size_of::<T>()` uninterpreted bytes.
    pub fn bytes<T>() -> Result<Datatype> {
        Datatype::contiguous(mem::size_of::<T>(), &Byte::equivalent_datatype())
    }

    /// Size in bytes of the data described by one element of this type.
    pub fn size(&self) -> Result<usize> {
        let mut size: c_int = 0;
        check("MPI_Type_size", unsafe {
            ffi::MPI_Type_size(self.raw, &mut size)
        })?;
        throwing_cast(size)
    }

    /// Lower bound and extent of this type, together with its true bounds.
    ///
    /// # Standard section(s)
    ///
    /// 5.1.7, 5.1.8
    pub fn extent(&self) -> Result<Extent> {
        let mut lb: MPI_Aint = 0;
        let mut extent: MPI_Aint = 0;
        check("MPI_Type_get_extent", unsafe {
            ffi::MPI_Type_get_extent(self.raw, &mut lb, &mut extent)
        })?;
        let mut true_lb: MPI_Aint = 0;
        let mut true_extent: MPI_Aint = 0;
        check("MPI_Type_get_true_extent", unsafe {
            ffi::MPI_Type_get_true_extent(self.raw, &mut true_lb, &mut true_extent)
        })?;
        Ok(Extent {
            lb: throwing_cast(lb)?,
            extent: throwing_cast(extent)?,
            true_lb: throwing_cast(true_lb)?,
            true_extent: throwing_cast(true_extent)?,
        })
    }

    /// Decodes the constructor that produced this handle.
    ///
    /// # Standard section(s)
    ///
    /// 5.1.13
    pub fn envelope(&self) -> Result<Envelope> {
        let mut num_integers: c_int = 0;
        let mut num_addresses: c_int = 0;
        let mut num_datatypes: c_int = 0;
        let mut combiner: c_int = 0;
        check("MPI_Type_get_envelope", unsafe {
            ffi::MPI_Type_get_envelope(
                self.raw,
                &mut num_integers,
                &mut num_addresses,
                &mut num_datatypes,
                &mut combiner,
            )
        })?;
        Ok(Envelope {
            combiner: Combiner::from_raw(combiner),
            num_integers: asserting_cast(num_integers),
            num_addresses: asserting_cast(num_addresses),
            num_datatypes: asserting_cast(num_datatypes),
        })
    }

    /// For a contiguous composite, the element count and the element handle.
    ///
    /// Returns `None` if this handle was not built by a contiguous constructor. Element handles
    /// that are themselves composites are released again before returning and reported as
    /// `None`, since MPI hands out new references to them.
    pub fn contiguous_parts(&self) -> Result<Option<(usize, Option<Datatype>)>> {
        let envelope = self.envelope()?;
        if envelope.combiner != Combiner::Contiguous {
            return Ok(None);
        }
        let mut integers = vec![0 as c_int; envelope.num_integers];
        let mut addresses = vec![0 as MPI_Aint; envelope.num_addresses];
        let mut types = vec![unsafe { ffi::KAMPING_DATATYPE_NULL }; envelope.num_datatypes];
        check("MPI_Type_get_contents", unsafe {
            ffi::MPI_Type_get_contents(
                self.raw,
                asserting_cast(envelope.num_integers),
                asserting_cast(envelope.num_addresses),
                asserting_cast(envelope.num_datatypes),
                integers.as_mut_ptr(),
                addresses.as_mut_ptr(),
                types.as_mut_ptr(),
            )
        })?;
        let count = throwing_cast(integers[0])?;
        let mut element = types[0];
        let probe = Datatype {
            raw: element,
            category: self.category,
            builtin: false,
        };
        if probe.envelope()?.combiner == Combiner::Named {
            Ok(Some((
                count,
                Some(Datatype {
                    raw: element,
                    category: self.category,
                    builtin: true,
                }),
            )))
        } else {
            check("MPI_Type_free", unsafe { ffi::MPI_Type_free(&mut element) })?;
            Ok(Some((count, None)))
        }
    }

    /// Releases a composite handle.
    ///
    /// # Safety
    /// The handle must not be used afterwards.
    pub(crate) unsafe fn free(mut self) -> Result<()> {
        if self.builtin || self.is_null() {
            return Ok(());
        }
        check("MPI_Type_free", ffi::MPI_Type_free(&mut self.raw))
    }
}

/// The constructor recorded in a datatype envelope.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Combiner {
    /// A predefined handle
    Named,
    /// `MPI_Type_contiguous`
    Contiguous,
    /// `MPI_Type_create_struct`
    Struct,
    /// `MPI_Type_create_resized`
    Resized,
    /// Any other constructor
    Other(c_int),
}

impl Combiner {
    fn from_raw(raw: c_int) -> Self {
        unsafe {
            if raw == ffi::KAMPING_COMBINER_NAMED {
                Combiner::Named
            } else if raw == ffi::KAMPING_COMBINER_CONTIGUOUS {
                Combiner::Contiguous
            } else if raw == ffi::KAMPING_COMBINER_STRUCT {
                Combiner::Struct
            } else if raw == ffi::KAMPING_COMBINER_RESIZED {
                Combiner::Resized
            } else {
                Combiner::Other(raw)
            }
        }
    }
}

/// Result of [`Datatype::extent`], in bytes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Extent {
    pub lb: i64,
    pub extent: i64,
    pub true_lb: i64,
    pub true_extent: i64,
}

impl Extent {
    /// One past the last byte touched by `count` elements placed `offset` extents into a buffer.
    ///
    /// Returns `None` if any of those bytes lie before the start of the buffer or the
    /// arithmetic overflows.
    pub fn end_of(&self, offset: i64, count: i64) -> Option<i64> {
        if count <= 0 {
            return Some(0);
        }
        let first = offset.checked_mul(self.extent)?;
        let last = offset.checked_add(count - 1)?.checked_mul(self.extent)?;
        let start = first.min(last).checked_add(self.true_lb)?;
        let end = first
            .max(last)
            .checked_add(self.true_lb)?
            .checked_add(self.true_extent)?;
        (start >= 0).then_some(end)
    }
}

/// Result of [`Datatype::envelope`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub combiner: Combiner,
    pub num_integers: usize,
    pub num_addresses: usize,
    pub num_datatypes: usize,
}

/// A direct equivalence exists between the implementing type and an MPI datatype.
///
/// # Safety
/// The datatype must describe the exact memory layout of `Self`, with an extent of
/// `size_of::<Self>()`, and every bit pattern MPI may write through it must be a valid `Self`.
pub unsafe trait Equivalence: Copy + 'static {
    /// Category of the equivalent datatype.
    const CATEGORY: TypeCategory;

    /// The handle describing `Self`.
    ///
    /// # Panics
    /// Composite types panic if MPI refuses to construct their handle, e.g. because MPI is not
    /// initialized.
    fn equivalent_datatype() -> Datatype;
}

/// The datatype handle for `T`.
pub fn datatype_of<T: Equivalence>() -> Datatype {
    T::equivalent_datatype()
}

macro_rules! equivalent_builtin_datatype {
    ($($rstype:ty => $mpitype:ident, $category:ident;)*) => {
        $(
        unsafe impl Equivalence for $rstype {
            const CATEGORY: TypeCategory = TypeCategory::$category;
            fn equivalent_datatype() -> Datatype {
                Datatype::builtin(unsafe { ffi::$mpitype }, TypeCategory::$category)
            }
        }
        )*
    }
}

equivalent_builtin_datatype! {
    i8 => KAMPING_INT8_T, Integer;
    i16 => KAMPING_INT16_T, Integer;
    i32 => KAMPING_INT32_T, Integer;
    i64 => KAMPING_INT64_T, Integer;
    u8 => KAMPING_UINT8_T, Integer;
    u16 => KAMPING_UINT16_T, Integer;
    u32 => KAMPING_UINT32_T, Integer;
    u64 => KAMPING_UINT64_T, Integer;
    f32 => KAMPING_FLOAT, Floating;
    f64 => KAMPING_DOUBLE, Floating;
    bool => KAMPING_C_BOOL, Logical;
    Byte => KAMPING_BYTE, Byte;
    CChar => KAMPING_CHAR, Character;
}

#[cfg(target_pointer_width = "32")]
equivalent_builtin_datatype! {
    usize => KAMPING_UINT32_T, Integer;
    isize => KAMPING_INT32_T, Integer;
}

#[cfg(target_pointer_width = "64")]
equivalent_builtin_datatype! {
    usize => KAMPING_UINT64_T, Integer;
    isize => KAMPING_INT64_T, Integer;
}

#[cfg(feature = "complex")]
equivalent_builtin_datatype! {
    num_complex::Complex<f32> => KAMPING_C_FLOAT_COMPLEX, Complex;
    num_complex::Complex<f64> => KAMPING_C_DOUBLE_COMPLEX, Complex;
}

/// An uninterpreted byte, sent as `MPI_BYTE`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Byte(pub u8);

/// A C character, sent as `MPI_CHAR`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct CChar(pub std::os::raw::c_char);

unsafe impl<T: Equivalence> Equivalence for Wrapping<T> {
    const CATEGORY: TypeCategory = T::CATEGORY;
    fn equivalent_datatype() -> Datatype {
        T::equivalent_datatype()
    }
}

unsafe impl<T: Equivalence, const N: usize> Equivalence for [T; N] {
    const CATEGORY: TypeCategory = TypeCategory::Contiguous;
    fn equivalent_datatype() -> Datatype {
        registry::cached_datatype::<Self>(|| Datatype::contiguous(N, &T::equivalent_datatype()))
    }
}

/// Gets the address of a location in memory.
///
/// # Standard section(s)
///
/// 5.1.5
pub fn address_of<T>(location: *const T) -> MPI_Aint {
    let mut address: MPI_Aint = 0;
    // MPI_Get_address only fails for invalid arguments, `address` is always valid.
    unsafe {
        ffi::MPI_Get_address(location as *const c_void, &mut address);
    }
    address
}

macro_rules! tuple_equivalence {
    ($($name:ident . $idx:tt),+) => {
        unsafe impl<$($name: Equivalence),+> Equivalence for ($($name,)+) {
            const CATEGORY: TypeCategory = TypeCategory::Struct;
            fn equivalent_datatype() -> Datatype {
                registry::cached_datatype::<Self>(|| {
                    let instance = MaybeUninit::<Self>::uninit();
                    let base_ptr = instance.as_ptr();
                    let base = address_of(base_ptr);
                    let fields = [$(
                        (
                            address_of(unsafe { ptr::addr_of!((*base_ptr).$idx) }) - base,
                            $name::equivalent_datatype(),
                        ),
                    )+];
                    Datatype::structured::<Self>(&fields)
                })
            }
        }
    };
}

tuple_equivalence!(A.0);
tuple_equivalence!(A.0, B.1);
tuple_equivalence!(A.0, B.1, C.2);
tuple_equivalence!(A.0, B.1, C.2, D.3);
tuple_equivalence!(A.0, B.1, C.2, D.3, E.4);
tuple_equivalence!(A.0, B.1, C.2, D.3, E.4, F.5);

/// Implements [`Equivalence`] for plain-old-data types by sending them as raw bytes.
///
/// ```no_run
/// #[derive(Copy, Clone)]
/// struct Opaque([u16; 3]);
/// kamping::impl_equivalence_as_bytes!(Opaque);
/// ```
///
/// # Safety
/// Invoking this macro asserts that every byte pattern is a valid value of the type.
#[macro_export]
macro_rules! impl_equivalence_as_bytes {
    ($($ty:ty),+ $(,)?) => {
        $(
        unsafe impl $crate::datatype::Equivalence for $ty {
            const CATEGORY: $crate::datatype::TypeCategory =
                $crate::datatype::TypeCategory::Contiguous;
            fn equivalent_datatype() -> $crate::datatype::Datatype {
                $crate::datatype::registry::cached_datatype::<$ty>(
                    $crate::datatype::Datatype::bytes::<$ty>,
                )
            }
        }
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::Extent;

    fn dense(bytes: i64) -> Extent {
        Extent {
            lb: 0,
            extent: bytes,
            true_lb: 0,
            true_extent: bytes,
        }
    }

    #[test]
    fn extent_covers_whole_elements() {
        assert_eq!(dense(4).end_of(0, 3), Some(12));
        assert_eq!(dense(4).end_of(2, 3), Some(20));
        assert_eq!(dense(4).end_of(5, 0), Some(0));
    }

    #[test]
    fn extent_accounts_for_padding() {
        // two i32 with a stride of eight i32
        let strided = Extent {
            lb: 0,
            extent: 32,
            true_lb: 0,
            true_extent: 8,
        };
        assert_eq!(strided.end_of(0, 2), Some(40));
        assert_eq!(strided.end_of(1, 1), Some(40));
    }

    #[test]
    fn extent_rejects_negative_displacements() {
        let shifted = Extent {
            lb: -4,
            extent: 8,
            true_lb: -4,
            true_extent: 8,
        };
        assert_eq!(shifted.end_of(0, 1), None);
        assert_eq!(shifted.end_of(1, 1), Some(12));
        assert_eq!(dense(4).end_of(i64::MAX, 2), None);
    }
}
