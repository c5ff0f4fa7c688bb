//! Reduction operations
//!
//! A [`ReduceOperation`] is one of
//!
//! - a [`BuiltinOp`] tag. If MPI predefines the operation for the element type it maps onto the
//!   predefined handle, otherwise onto a generic trampoline implementing the same operation on the
//!   Rust side (see [`BuiltinReducible`]),
//! - a native `MPI_Op` handle obtained elsewhere,
//! - a closure registered through a `libffi` trampoline (feature `user-operations`).
//!
//! The operation only becomes an `MPI_Op` for the duration of one call. Handles created for that
//! call are released when it returns.
//!
//! # Standard section(s)
//!
//! 5.9

use std::any::type_name;
use std::fmt;
use std::num::Wrapping;
use std::os::raw::{c_int, c_void};
use std::slice;

#[cfg(feature = "user-operations")]
use libffi::high::Closure4;

use crate::cast::throwing_cast;
use crate::datatype::{Datatype, Equivalence, TypeCategory};
use crate::error::{check, Error, Result};
use crate::ffi;
use crate::ffi::{MPI_Datatype, MPI_Op};

/// The signature MPI expects from user-defined reductions.
type UserFunction = unsafe extern "C" fn(*mut c_void, *mut c_void, *mut c_int, *mut MPI_Datatype);

/// Reductions predefined by MPI.
///
/// # Standard section(s)
///
/// 5.9.2
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BuiltinOp {
    Sum,
    Product,
    Min,
    Max,
    LogicalAnd,
    LogicalOr,
    LogicalXor,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    /// Minimum of the value, the smallest index among equal values
    MinLoc,
    /// Maximum of the value, the smallest index among equal values
    MaxLoc,
}

impl BuiltinOp {
    const ALL: [BuiltinOp; 12] = [
        BuiltinOp::Sum,
        BuiltinOp::Product,
        BuiltinOp::Min,
        BuiltinOp::Max,
        BuiltinOp::LogicalAnd,
        BuiltinOp::LogicalOr,
        BuiltinOp::LogicalXor,
        BuiltinOp::BitwiseAnd,
        BuiltinOp::BitwiseOr,
        BuiltinOp::BitwiseXor,
        BuiltinOp::MinLoc,
        BuiltinOp::MaxLoc,
    ];

    const fn from_code(code: u8) -> BuiltinOp {
        BuiltinOp::ALL[code as usize]
    }

    /// The predefined handle.
    pub fn as_raw(self) -> MPI_Op {
        unsafe {
            match self {
                BuiltinOp::Sum => ffi::KAMPING_SUM,
                BuiltinOp::Product => ffi::KAMPING_PROD,
                BuiltinOp::Min => ffi::KAMPING_MIN,
                BuiltinOp::Max => ffi::KAMPING_MAX,
                BuiltinOp::LogicalAnd => ffi::KAMPING_LAND,
                BuiltinOp::LogicalOr => ffi::KAMPING_LOR,
                BuiltinOp::LogicalXor => ffi::KAMPING_LXOR,
                BuiltinOp::BitwiseAnd => ffi::KAMPING_BAND,
                BuiltinOp::BitwiseOr => ffi::KAMPING_BOR,
                BuiltinOp::BitwiseXor => ffi::KAMPING_BXOR,
                BuiltinOp::MinLoc => ffi::KAMPING_MINLOC,
                BuiltinOp::MaxLoc => ffi::KAMPING_MAXLOC,
            }
        }
    }

    /// All predefined reductions are commutative.
    pub fn commutativity(self) -> Commutativity {
        Commutativity::Commutative
    }

    /// Whether MPI predefines this reduction for built-in datatypes of `category`.
    ///
    /// Location reductions are only predefined for MPI's pair types, which have no Rust
    /// counterpart, and therefore always use the generic implementation.
    pub fn is_native_for(self, category: TypeCategory) -> bool {
        use BuiltinOp::*;
        use TypeCategory::*;
        match self {
            Sum | Product => matches!(category, Integer | Floating | Complex),
            Min | Max => matches!(category, Integer | Floating),
            LogicalAnd | LogicalOr | LogicalXor => matches!(category, Integer | Logical),
            BitwiseAnd | BitwiseOr | BitwiseXor => matches!(category, Integer | Byte),
            MinLoc | MaxLoc => false,
        }
    }
}

/// Whether the operands of a reduction may be swapped.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Commutativity {
    Commutative,
    NonCommutative,
    /// Not known; only possible for predefined and native handles
    Undefined,
}

impl Commutativity {
    fn as_flag(self) -> c_int {
        match self {
            Commutativity::NonCommutative => 0,
            _ => 1,
        }
    }
}

/// Element types with a Rust-side implementation of the predefined reductions.
///
/// The implementation is used for local application and whenever MPI does not predefine the
/// reduction for the datatype of `Self`, e.g. elementwise sums over arrays or location reductions
/// over `(value, index)` pairs.
pub trait BuiltinReducible: Equivalence {
    /// Whether `op` is defined for `Self`.
    fn supports(op: BuiltinOp) -> bool;

    /// `lhs op rhs`. Only meaningful if `supports(op)` holds; returns `rhs` otherwise.
    fn combine(op: BuiltinOp, lhs: &Self, rhs: &Self) -> Self;
}

macro_rules! integer_reducible {
    ($($ty:ty),*) => {
        $(
        impl BuiltinReducible for $ty {
            fn supports(op: BuiltinOp) -> bool {
                !matches!(op, BuiltinOp::MinLoc | BuiltinOp::MaxLoc)
            }

            fn combine(op: BuiltinOp, lhs: &Self, rhs: &Self) -> Self {
                let (a, b) = (*lhs, *rhs);
                match op {
                    BuiltinOp::Sum => a.wrapping_add(b),
                    BuiltinOp::Product => a.wrapping_mul(b),
                    BuiltinOp::Min => a.min(b),
                    BuiltinOp::Max => a.max(b),
                    BuiltinOp::LogicalAnd => ((a != 0) && (b != 0)) as $ty,
                    BuiltinOp::LogicalOr => ((a != 0) || (b != 0)) as $ty,
                    BuiltinOp::LogicalXor => ((a != 0) != (b != 0)) as $ty,
                    BuiltinOp::BitwiseAnd => a & b,
                    BuiltinOp::BitwiseOr => a | b,
                    BuiltinOp::BitwiseXor => a ^ b,
                    BuiltinOp::MinLoc | BuiltinOp::MaxLoc => b,
                }
            }
        }
        )*
    };
}

integer_reducible!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! floating_reducible {
    ($($ty:ty),*) => {
        $(
        impl BuiltinReducible for $ty {
            fn supports(op: BuiltinOp) -> bool {
                matches!(op, BuiltinOp::Sum | BuiltinOp::Product | BuiltinOp::Min | BuiltinOp::Max)
            }

            fn combine(op: BuiltinOp, lhs: &Self, rhs: &Self) -> Self {
                let (a, b) = (*lhs, *rhs);
                match op {
                    BuiltinOp::Sum => a + b,
                    BuiltinOp::Product => a * b,
                    BuiltinOp::Min => a.min(b),
                    BuiltinOp::Max => a.max(b),
                    _ => b,
                }
            }
        }
        )*
    };
}

floating_reducible!(f32, f64);

impl BuiltinReducible for bool {
    fn supports(op: BuiltinOp) -> bool {
        matches!(
            op,
            BuiltinOp::LogicalAnd | BuiltinOp::LogicalOr | BuiltinOp::LogicalXor
        )
    }

    fn combine(op: BuiltinOp, lhs: &Self, rhs: &Self) -> Self {
        match op {
            BuiltinOp::LogicalAnd => *lhs && *rhs,
            BuiltinOp::LogicalOr => *lhs || *rhs,
            BuiltinOp::LogicalXor => *lhs != *rhs,
            _ => *rhs,
        }
    }
}

impl BuiltinReducible for crate::datatype::Byte {
    fn supports(op: BuiltinOp) -> bool {
        matches!(
            op,
            BuiltinOp::BitwiseAnd | BuiltinOp::BitwiseOr | BuiltinOp::BitwiseXor
        )
    }

    fn combine(op: BuiltinOp, lhs: &Self, rhs: &Self) -> Self {
        use crate::datatype::Byte;
        match op {
            BuiltinOp::BitwiseAnd => Byte(lhs.0 & rhs.0),
            BuiltinOp::BitwiseOr => Byte(lhs.0 | rhs.0),
            BuiltinOp::BitwiseXor => Byte(lhs.0 ^ rhs.0),
            _ => *rhs,
        }
    }
}

#[cfg(feature = "complex")]
macro_rules! complex_reducible {
    ($($ty:ty),*) => {
        $(
        impl BuiltinReducible for num_complex::Complex<$ty> {
            fn supports(op: BuiltinOp) -> bool {
                matches!(op, BuiltinOp::Sum | BuiltinOp::Product)
            }

            fn combine(op: BuiltinOp, lhs: &Self, rhs: &Self) -> Self {
                match op {
                    BuiltinOp::Sum => lhs + rhs,
                    BuiltinOp::Product => lhs * rhs,
                    _ => *rhs,
                }
            }
        }
        )*
    };
}

#[cfg(feature = "complex")]
complex_reducible!(f32, f64);

impl<T: BuiltinReducible> BuiltinReducible for Wrapping<T> {
    fn supports(op: BuiltinOp) -> bool {
        T::supports(op)
    }

    fn combine(op: BuiltinOp, lhs: &Self, rhs: &Self) -> Self {
        Wrapping(T::combine(op, &lhs.0, &rhs.0))
    }
}

impl<T: BuiltinReducible, const N: usize> BuiltinReducible for [T; N] {
    fn supports(op: BuiltinOp) -> bool {
        T::supports(op)
    }

    fn combine(op: BuiltinOp, lhs: &Self, rhs: &Self) -> Self {
        let mut out = *rhs;
        for (slot, value) in out.iter_mut().zip(lhs) {
            *slot = T::combine(op, value, slot);
        }
        out
    }
}

/// `(value, index)` pairs support the location reductions and, if both components do, the
/// elementwise reductions.
impl<V, I> BuiltinReducible for (V, I)
where
    V: BuiltinReducible + PartialOrd,
    I: BuiltinReducible + PartialOrd,
{
    fn supports(op: BuiltinOp) -> bool {
        match op {
            BuiltinOp::MinLoc | BuiltinOp::MaxLoc => true,
            _ => V::supports(op) && I::supports(op),
        }
    }

    fn combine(op: BuiltinOp, lhs: &Self, rhs: &Self) -> Self {
        let smaller_index = if lhs.1 <= rhs.1 { lhs.1 } else { rhs.1 };
        match op {
            BuiltinOp::MinLoc | BuiltinOp::MaxLoc => {
                let lhs_wins = if op == BuiltinOp::MinLoc {
                    lhs.0 < rhs.0
                } else {
                    lhs.0 > rhs.0
                };
                if lhs.0 == rhs.0 {
                    (lhs.0, smaller_index)
                } else if lhs_wins {
                    *lhs
                } else {
                    *rhs
                }
            }
            _ => (V::combine(op, &lhs.0, &rhs.0), I::combine(op, &lhs.1, &rhs.1)),
        }
    }
}

/// Applies the predefined reduction `OP` elementwise: `inoutvec[i] = invec[i] OP inoutvec[i]`.
unsafe extern "C" fn builtin_trampoline<T: BuiltinReducible, const OP: u8>(
    invec: *mut c_void,
    inoutvec: *mut c_void,
    len: *mut c_int,
    _datatype: *mut MPI_Datatype,
) {
    let len = usize::try_from(*len).unwrap_or(0);
    if len == 0 {
        return;
    }
    let op = BuiltinOp::from_code(OP);
    let input = slice::from_raw_parts(invec as *const T, len);
    let inout = slice::from_raw_parts_mut(inoutvec as *mut T, len);
    for (value, slot) in input.iter().zip(inout) {
        *slot = T::combine(op, value, slot);
    }
}

fn builtin_fallback<T: BuiltinReducible>(op: BuiltinOp) -> UserFunction {
    match op {
        BuiltinOp::Sum => builtin_trampoline::<T, 0>,
        BuiltinOp::Product => builtin_trampoline::<T, 1>,
        BuiltinOp::Min => builtin_trampoline::<T, 2>,
        BuiltinOp::Max => builtin_trampoline::<T, 3>,
        BuiltinOp::LogicalAnd => builtin_trampoline::<T, 4>,
        BuiltinOp::LogicalOr => builtin_trampoline::<T, 5>,
        BuiltinOp::LogicalXor => builtin_trampoline::<T, 6>,
        BuiltinOp::BitwiseAnd => builtin_trampoline::<T, 7>,
        BuiltinOp::BitwiseOr => builtin_trampoline::<T, 8>,
        BuiltinOp::BitwiseXor => builtin_trampoline::<T, 9>,
        BuiltinOp::MinLoc => builtin_trampoline::<T, 10>,
        BuiltinOp::MaxLoc => builtin_trampoline::<T, 11>,
    }
}

enum OperationKind<'a, T> {
    Builtin {
        op: BuiltinOp,
        supported: bool,
        combine: fn(BuiltinOp, &T, &T) -> T,
        fallback: UserFunction,
    },
    Native {
        raw: MPI_Op,
        commutativity: Commutativity,
    },
    Function {
        function: Box<dyn Fn(&T, &T) -> T + 'a>,
        commutativity: Commutativity,
    },
}

/// A reduction over elements of type `T`.
pub struct ReduceOperation<'a, T> {
    kind: OperationKind<'a, T>,
}

impl<'a, T> ReduceOperation<'a, T> {
    /// A predefined reduction.
    pub fn builtin(op: BuiltinOp) -> Self
    where
        T: BuiltinReducible,
    {
        ReduceOperation {
            kind: OperationKind::Builtin {
                op,
                supported: T::supports(op),
                combine: T::combine,
                fallback: builtin_fallback::<T>(op),
            },
        }
    }

    /// A reduction given by an `MPI_Op` handle.
    ///
    /// # Safety
    /// `raw` must be a valid handle that is defined for the datatype of `T` and stays valid while
    /// the returned value is in use.
    pub unsafe fn native(raw: MPI_Op, commutativity: Commutativity) -> Self {
        ReduceOperation {
            kind: OperationKind::Native { raw, commutativity },
        }
    }

    /// A commutative reduction given by a closure. The closure must be associative.
    pub fn commutative<F>(function: F) -> Self
    where
        F: Fn(&T, &T) -> T + 'a,
    {
        ReduceOperation {
            kind: OperationKind::Function {
                function: Box::new(function),
                commutativity: Commutativity::Commutative,
            },
        }
    }

    /// A non-commutative reduction given by a closure. The closure must be associative.
    ///
    /// The left operand always stems from the lower ranks.
    pub fn non_commutative<F>(function: F) -> Self
    where
        F: Fn(&T, &T) -> T + 'a,
    {
        ReduceOperation {
            kind: OperationKind::Function {
                function: Box::new(function),
                commutativity: Commutativity::NonCommutative,
            },
        }
    }

    /// The commutativity as recorded at construction.
    pub fn commutativity(&self) -> Commutativity {
        match &self.kind {
            OperationKind::Builtin { op, .. } => op.commutativity(),
            OperationKind::Native { commutativity, .. } => *commutativity,
            OperationKind::Function { commutativity, .. } => *commutativity,
        }
    }

    /// The predefined reduction, if this is one.
    pub fn builtin_op(&self) -> Option<BuiltinOp> {
        match &self.kind {
            OperationKind::Builtin { op, .. } => Some(*op),
            _ => None,
        }
    }

    fn unsupported(op: BuiltinOp) -> Error {
        Error::UnsupportedOperation {
            op,
            type_name: type_name::<T>(),
        }
    }
}

impl<'a, T: Equivalence> ReduceOperation<'a, T> {
    /// `lhs op rhs` computed locally.
    pub fn apply(&self, lhs: &T, rhs: &T) -> Result<T> {
        let mut out = [*rhs];
        self.apply_slices(slice::from_ref(lhs), &mut out)?;
        Ok(out[0])
    }

    fn apply_slices(&self, input: &[T], inout: &mut [T]) -> Result<()> {
        match &self.kind {
            OperationKind::Builtin {
                op,
                supported,
                combine,
                ..
            } => {
                if !supported {
                    return Err(Self::unsupported(*op));
                }
                for (value, slot) in input.iter().zip(inout) {
                    *slot = combine(*op, value, slot);
                }
                Ok(())
            }
            OperationKind::Native { raw, .. } => {
                let count: c_int = throwing_cast(input.len().min(inout.len()))?;
                check("MPI_Reduce_local", unsafe {
                    ffi::MPI_Reduce_local(
                        input.as_ptr() as *const c_void,
                        inout.as_mut_ptr() as *mut c_void,
                        count,
                        T::equivalent_datatype().as_raw(),
                        *raw,
                    )
                })
            }
            OperationKind::Function { function, .. } => {
                for (value, slot) in input.iter().zip(inout) {
                    *slot = function(value, slot);
                }
                Ok(())
            }
        }
    }

    /// Whether MPI considers the handle this operation maps onto commutative.
    pub fn transport_commutative(&self) -> Result<bool> {
        self.materialize()?.transport_commutative()
    }

    /// Turns the operation into an `MPI_Op` handle that lives as long as the returned value.
    pub(crate) fn materialize(&self) -> Result<MaterializedOp<'_>> {
        match &self.kind {
            OperationKind::Builtin {
                op,
                supported,
                fallback,
                ..
            } => {
                let datatype: Datatype = T::equivalent_datatype();
                if datatype.is_builtin() && op.is_native_for(T::CATEGORY) {
                    return Ok(MaterializedOp::predefined(
                        op.as_raw(),
                        op.commutativity(),
                    ));
                }
                if !supported {
                    return Err(Self::unsupported(*op));
                }
                tracing::trace!(op = ?op, ty = type_name::<T>(), "using generic reduction");
                MaterializedOp::create(*fallback, op.commutativity(), None)
            }
            OperationKind::Native { raw, commutativity } => {
                Ok(MaterializedOp::predefined(*raw, *commutativity))
            }
            OperationKind::Function {
                function,
                commutativity,
            } => MaterializedOp::from_closure(function.as_ref(), *commutativity),
        }
    }
}

impl<'a, T> fmt::Debug for ReduceOperation<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            OperationKind::Builtin { op, .. } => f.debug_tuple("Builtin").field(op).finish(),
            OperationKind::Native { raw, commutativity } => f
                .debug_struct("Native")
                .field("raw", raw)
                .field("commutativity", commutativity)
                .finish(),
            OperationKind::Function { commutativity, .. } => f
                .debug_struct("Function")
                .field("commutativity", commutativity)
                .finish(),
        }
    }
}

/// Arguments accepted by [`op`](crate::parameter::op).
pub trait IntoReduceOperation<'a, T> {
    fn into_operation(self) -> ReduceOperation<'a, T>;
}

impl<'a, T: BuiltinReducible> IntoReduceOperation<'a, T> for BuiltinOp {
    fn into_operation(self) -> ReduceOperation<'a, T> {
        ReduceOperation::builtin(self)
    }
}

impl<'a, T> IntoReduceOperation<'a, T> for ReduceOperation<'a, T> {
    fn into_operation(self) -> ReduceOperation<'a, T> {
        self
    }
}

/// Shorthand for [`ReduceOperation::commutative`].
pub fn commutative<'a, T, F>(function: F) -> ReduceOperation<'a, T>
where
    F: Fn(&T, &T) -> T + 'a,
{
    ReduceOperation::commutative(function)
}

/// Shorthand for [`ReduceOperation::non_commutative`].
pub fn non_commutative<'a, T, F>(function: F) -> ReduceOperation<'a, T>
where
    F: Fn(&T, &T) -> T + 'a,
{
    ReduceOperation::non_commutative(function)
}

trait Erased {}

impl<T> Erased for T {}

/// An `MPI_Op` handle ready to be passed to a reduction.
pub(crate) struct MaterializedOp<'f> {
    raw: MPI_Op,
    commutativity: Commutativity,
    created: bool,
    // keeps the trampoline of a closure alive
    _anchor: Option<Box<dyn Erased + 'f>>,
}

impl<'f> MaterializedOp<'f> {
    fn predefined(raw: MPI_Op, commutativity: Commutativity) -> Self {
        MaterializedOp {
            raw,
            commutativity,
            created: false,
            _anchor: None,
        }
    }

    fn create(
        function: UserFunction,
        commutativity: Commutativity,
        anchor: Option<Box<dyn Erased + 'f>>,
    ) -> Result<Self> {
        let mut raw = unsafe { ffi::KAMPING_OP_NULL };
        check("MPI_Op_create", unsafe {
            ffi::MPI_Op_create(Some(function), commutativity.as_flag(), &mut raw)
        })?;
        Ok(MaterializedOp {
            raw,
            commutativity,
            created: true,
            _anchor: anchor,
        })
    }

    #[cfg(feature = "user-operations")]
    fn from_closure<T>(
        function: &'f (dyn Fn(&T, &T) -> T + 'f),
        commutativity: Commutativity,
    ) -> Result<Self> {
        struct Anchor<F> {
            function: F,
            closure: Option<
                Closure4<'static, *mut c_void, *mut c_void, *mut c_int, *mut MPI_Datatype, ()>,
            >,
        }
        // boxed so that the closure does not move while the trampoline refers to it
        let mut anchor = Box::new(Anchor {
            function: move |invec, inoutvec, len, datatype| unsafe {
                closure_trampoline(function, invec, inoutvec, len, datatype)
            },
            closure: None,
        });
        let code = unsafe {
            let closure = Closure4::new(&anchor.function);
            // `FnPtr4` is a `repr(transparent)` wrapper around the code pointer
            let code: UserFunction = std::mem::transmute(*closure.code_ptr());
            // erase the lifetime, the closure is dropped together with the anchor
            anchor.closure = Some(std::mem::transmute::<
                Closure4<'_, *mut c_void, *mut c_void, *mut c_int, *mut MPI_Datatype, ()>,
                Closure4<'static, *mut c_void, *mut c_void, *mut c_int, *mut MPI_Datatype, ()>,
            >(closure));
            code
        };
        tracing::trace!(?commutativity, "created user operation");
        MaterializedOp::create(code, commutativity, Some(anchor))
    }

    #[cfg(not(feature = "user-operations"))]
    fn from_closure<T>(
        _function: &'f (dyn Fn(&T, &T) -> T + 'f),
        _commutativity: Commutativity,
    ) -> Result<Self> {
        Err(Error::InvalidParameter {
            role: crate::parameter::ParameterType::Op,
            reason: "closures need the `user-operations` feature",
        })
    }

    pub(crate) fn as_raw(&self) -> MPI_Op {
        self.raw
    }

    pub(crate) fn commutativity(&self) -> Commutativity {
        self.commutativity
    }

    /// The commutativity flag MPI reports for the handle.
    pub(crate) fn transport_commutative(&self) -> Result<bool> {
        let mut flag: c_int = 0;
        check("MPI_Op_commutative", unsafe {
            ffi::MPI_Op_commutative(self.raw, &mut flag)
        })?;
        Ok(flag != 0)
    }
}

impl<'f> Drop for MaterializedOp<'f> {
    fn drop(&mut self) {
        if self.created {
            let code = unsafe { ffi::MPI_Op_free(&mut self.raw) };
            if code != crate::error::MPI_SUCCESS {
                tracing::warn!(code, "MPI_Op_free failed");
            }
        }
    }
}

#[cfg(feature = "user-operations")]
unsafe fn closure_trampoline<T>(
    function: &dyn Fn(&T, &T) -> T,
    invec: *mut c_void,
    inoutvec: *mut c_void,
    len: *mut c_int,
    _datatype: *mut MPI_Datatype,
) {
    let len = usize::try_from(*len).unwrap_or(0);
    // pointers may be null for empty reductions
    if len == 0 {
        return;
    }
    let input = slice::from_raw_parts(invec as *const T, len);
    let inout = slice::from_raw_parts_mut(inoutvec as *mut T, len);
    for (value, slot) in input.iter().zip(inout) {
        *slot = function(value, slot);
    }
}

/// Reduces `input` into `inout` locally: `inout[i] = input[i] op inout[i]`.
///
/// Predefined reductions and closures are evaluated on the Rust side, native handles through
/// `MPI_Reduce_local`.
///
/// # Standard section(s)
///
/// 5.9.7
pub fn reduce_local<'a, T: Equivalence>(
    input: &[T],
    inout: &mut [T],
    op: impl IntoReduceOperation<'a, T>,
) -> Result<()> {
    op.into_operation().apply_slices(input, inout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_reductions() {
        assert_eq!(i32::combine(BuiltinOp::Sum, &3, &4), 7);
        assert_eq!(i32::combine(BuiltinOp::Product, &3, &4), 12);
        assert_eq!(i32::combine(BuiltinOp::Min, &3, &-4), -4);
        assert_eq!(u8::combine(BuiltinOp::Max, &3, &4), 4);
        assert_eq!(u8::combine(BuiltinOp::LogicalAnd, &3, &0), 0);
        assert_eq!(u8::combine(BuiltinOp::LogicalXor, &3, &0), 1);
        assert_eq!(u8::combine(BuiltinOp::BitwiseXor, &0b110, &0b011), 0b101);
        assert_eq!(u8::combine(BuiltinOp::Sum, &255, &1), 0);
        assert!(!i64::supports(BuiltinOp::MinLoc));
    }

    #[test]
    fn floating_and_logical_support() {
        assert!(f64::supports(BuiltinOp::Max));
        assert!(!f64::supports(BuiltinOp::BitwiseAnd));
        assert!(bool::supports(BuiltinOp::LogicalOr));
        assert!(!bool::supports(BuiltinOp::Sum));
        assert!(bool::combine(BuiltinOp::LogicalXor, &true, &false));
    }

    #[test]
    fn arrays_reduce_elementwise() {
        let lhs = [1, 5, 3];
        let rhs = [4, 2, 6];
        assert_eq!(<[i32; 3]>::combine(BuiltinOp::Max, &lhs, &rhs), [4, 5, 6]);
        assert_eq!(<[i32; 3]>::combine(BuiltinOp::Sum, &lhs, &rhs), [5, 7, 9]);
    }

    #[test]
    fn location_reductions_prefer_smaller_index() {
        type Loc = (f64, i32);
        assert!(Loc::supports(BuiltinOp::MinLoc));
        assert_eq!(Loc::combine(BuiltinOp::MinLoc, &(1.0, 3), &(2.0, 0)), (1.0, 3));
        assert_eq!(Loc::combine(BuiltinOp::MaxLoc, &(1.0, 3), &(2.0, 0)), (2.0, 0));
        assert_eq!(Loc::combine(BuiltinOp::MinLoc, &(1.0, 3), &(1.0, 1)), (1.0, 1));
        assert!(!Loc::supports(BuiltinOp::BitwiseOr));
    }

    #[test]
    fn native_support_table() {
        assert!(BuiltinOp::Sum.is_native_for(TypeCategory::Complex));
        assert!(!BuiltinOp::Min.is_native_for(TypeCategory::Complex));
        assert!(BuiltinOp::BitwiseOr.is_native_for(TypeCategory::Byte));
        assert!(!BuiltinOp::Sum.is_native_for(TypeCategory::Byte));
        assert!(BuiltinOp::LogicalAnd.is_native_for(TypeCategory::Logical));
        assert!(!BuiltinOp::Max.is_native_for(TypeCategory::Contiguous));
        assert!(!BuiltinOp::MinLoc.is_native_for(TypeCategory::Struct));
    }

    #[test]
    fn codes_round_trip() {
        for op in BuiltinOp::ALL {
            assert_eq!(BuiltinOp::from_code(op as u8), op);
        }
    }

    #[test]
    fn commutativity_is_recorded() {
        let sum: ReduceOperation<'_, i32> = BuiltinOp::Sum.into_operation();
        assert_eq!(sum.commutativity(), Commutativity::Commutative);
        assert_eq!(sum.builtin_op(), Some(BuiltinOp::Sum));
        let concat = non_commutative(|a: &i32, b: &i32| a * 10 + b);
        assert_eq!(concat.commutativity(), Commutativity::NonCommutative);
        assert_eq!(concat.builtin_op(), None);
        assert_eq!(commutative(|a: &u32, b: &u32| a + b).commutativity(), Commutativity::Commutative);
    }

    #[test]
    fn closures_apply_left_to_right() {
        let concat = non_commutative(|a: &i32, b: &i32| a * 10 + b);
        assert_eq!(concat.apply(&1, &2).unwrap(), 12);
    }

    #[test]
    fn local_reduction_with_builtin_and_closure() {
        let input = [1, 2, 3];
        let mut inout = [10, 20, 30];
        reduce_local(&input, &mut inout, BuiltinOp::Sum).unwrap();
        assert_eq!(inout, [11, 22, 33]);

        let offset = 100;
        reduce_local(&input, &mut inout, commutative(move |a: &i32, b: &i32| a + b + offset))
            .unwrap();
        assert_eq!(inout, [112, 124, 136]);
    }

    #[test]
    fn unsupported_builtin_is_reported() {
        let op: ReduceOperation<'_, f64> = BuiltinOp::BitwiseAnd.into_operation();
        match op.apply(&1.0, &2.0) {
            Err(Error::UnsupportedOperation { op, type_name }) => {
                assert_eq!(op, BuiltinOp::BitwiseAnd);
                assert_eq!(type_name, "f64");
            }
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
    }
}
