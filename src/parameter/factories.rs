//! Constructors for every parameter role
//!
//! Buffer factories take anything implementing [`IntoBuffer`]: `&x` borrows constant storage,
//! `&mut x` borrows modifiable storage and a `Vec` or primitive value is moved into the parameter.
//! The `*_out()` factories without an argument let the operation allocate the output and return
//! it in its result.

use crate::buffer::{BufferStorage, DataBuffer, IntoBuffer, IntoMutBuffer, RoleClass};
use crate::datatype::Datatype;
use crate::ffi;
use crate::operation::IntoReduceOperation;
use crate::request::Request;
use crate::status::Status;

use super::{Parameter, ParameterType};

fn data<'a, B: IntoBuffer<'a>>(
    role: ParameterType,
    class: RoleClass,
    data: B,
) -> Parameter<'a, B::Elem> {
    Parameter::Buffer(DataBuffer::new(role, class, data.into_storage()))
}

fn counts<'a, T, B: IntoBuffer<'a, Elem = i32>>(
    role: ParameterType,
    class: RoleClass,
    counts: B,
) -> Parameter<'a, T> {
    Parameter::Counts(DataBuffer::new(role, class, counts.into_storage()))
}

fn counts_out<'a, T>(role: ParameterType) -> Parameter<'a, T> {
    Parameter::Counts(DataBuffer::library_allocated(role, RoleClass::Out))
}

fn count<'a, T>(role: ParameterType, count: i32) -> Parameter<'a, T> {
    Parameter::Counts(DataBuffer::new(
        role,
        RoleClass::In,
        BufferStorage::owned_single(count),
    ))
}

fn count_out<'a, T>(role: ParameterType) -> Parameter<'a, T> {
    Parameter::Counts(DataBuffer::library_allocated_single(role, RoleClass::Out, 0))
}

fn datatype<'a, T>(role: ParameterType, datatype: Datatype) -> Parameter<'a, T> {
    Parameter::Datatype(DataBuffer::new(
        role,
        RoleClass::In,
        BufferStorage::owned_single(datatype),
    ))
}

fn datatype_out<'a, T>(role: ParameterType) -> Parameter<'a, T> {
    Parameter::Datatype(DataBuffer::library_allocated_single(
        role,
        RoleClass::Out,
        Datatype::null(),
    ))
}

/// The data to send.
pub fn send_buf<'a, B: IntoBuffer<'a>>(values: B) -> Parameter<'a, B::Elem> {
    data(ParameterType::SendBuf, RoleClass::In, values)
}

/// Data to send that is handed back in the result once the operation does not need it anymore.
pub fn send_buf_out<'a, T>(values: Vec<T>) -> Parameter<'a, T> {
    let mut buffer = DataBuffer::new(
        ParameterType::SendBuf,
        RoleClass::In,
        BufferStorage::owned(values),
    );
    buffer.return_to_caller();
    Parameter::Buffer(buffer)
}

/// Storage for the received data.
pub fn recv_buf<'a, B: IntoMutBuffer<'a>>(storage: B) -> Parameter<'a, B::Elem> {
    data(ParameterType::RecvBuf, RoleClass::Out, storage)
}

/// Received data returned in the result.
pub fn recv_buf_out<'a, T>() -> Parameter<'a, T> {
    Parameter::Buffer(DataBuffer::library_allocated(
        ParameterType::RecvBuf,
        RoleClass::Out,
    ))
}

/// A buffer that is both sent from and received into, e.g. by in-place operations.
pub fn send_recv_buf<'a, B: IntoMutBuffer<'a>>(storage: B) -> Parameter<'a, B::Elem> {
    data(ParameterType::SendRecvBuf, RoleClass::InOut, storage)
}

/// What an exclusive scan yields on rank 0.
pub fn values_on_rank_0<'a, B: IntoBuffer<'a>>(values: B) -> Parameter<'a, B::Elem> {
    data(ParameterType::ValuesOnRank0, RoleClass::In, values)
}

/// A buffer that is absent on this rank, e.g. the send buffer of a scatter on non-root ranks.
pub fn ignore<'a, T>(role: ParameterType) -> Parameter<'a, T> {
    Parameter::Buffer(DataBuffer::ignored(role))
}

macro_rules! count_buffer_factories {
    ($($role:ident: $input:ident, $output:ident, $into:ident;)*) => {
        $(
        #[doc = concat!("Caller provided `", stringify!($role), "`.")]
        pub fn $input<'a, T, B: IntoBuffer<'a, Elem = i32>>(values: B) -> Parameter<'a, T> {
            counts(ParameterType::$role, RoleClass::In, values)
        }

        #[doc = concat!("`", stringify!($role), "` computed by the operation, returned in the result.")]
        pub fn $output<'a, T>() -> Parameter<'a, T> {
            counts_out(ParameterType::$role)
        }

        #[doc = concat!("`", stringify!($role), "` computed by the operation, written to `storage`.")]
        pub fn $into<'a, T, B: IntoMutBuffer<'a, Elem = i32>>(storage: B) -> Parameter<'a, T> {
            counts(ParameterType::$role, RoleClass::Out, storage)
        }
        )*
    };
}

count_buffer_factories! {
    SendCounts: send_counts, send_counts_out, send_counts_out_into;
    RecvCounts: recv_counts, recv_counts_out, recv_counts_out_into;
    SendDispls: send_displs, send_displs_out, send_displs_out_into;
    RecvDispls: recv_displs, recv_displs_out, recv_displs_out_into;
}

macro_rules! count_factories {
    ($($role:ident: $input:ident, $output:ident, $into:ident;)*) => {
        $(
        #[doc = concat!("Caller provided `", stringify!($role), "`.")]
        pub fn $input<'a, T>(value: i32) -> Parameter<'a, T> {
            count(ParameterType::$role, value)
        }

        #[doc = concat!("`", stringify!($role), "` computed by the operation, returned in the result.")]
        pub fn $output<'a, T>() -> Parameter<'a, T> {
            count_out(ParameterType::$role)
        }

        #[doc = concat!("`", stringify!($role), "` computed by the operation, written to `storage`.")]
        pub fn $into<'a, T>(storage: &'a mut i32) -> Parameter<'a, T> {
            Parameter::Counts(DataBuffer::new(
                ParameterType::$role,
                RoleClass::Out,
                BufferStorage::single_mut(storage),
            ))
        }
        )*
    };
}

count_factories! {
    SendCount: send_count, send_count_out, send_count_out_into;
    RecvCount: recv_count, recv_count_out, recv_count_out_into;
    SendRecvCount: send_recv_count, send_recv_count_out, send_recv_count_out_into;
}

macro_rules! datatype_factories {
    ($($role:ident: $input:ident, $output:ident;)*) => {
        $(
        #[doc = concat!("Explicit `", stringify!($role), "`. Requires the matching count.")]
        pub fn $input<'a, T>(value: Datatype) -> Parameter<'a, T> {
            datatype(ParameterType::$role, value)
        }

        #[doc = concat!("`", stringify!($role), "` used by the operation, returned in the result.")]
        pub fn $output<'a, T>() -> Parameter<'a, T> {
            datatype_out(ParameterType::$role)
        }
        )*
    };
}

datatype_factories! {
    SendType: send_type, send_type_out;
    RecvType: recv_type, recv_type_out;
    SendRecvType: send_recv_type, send_recv_type_out;
}

/// The root of a rooted collective. Defaults to the root of the communicator.
pub fn root<'a, T>(rank: i32) -> Parameter<'a, T> {
    Parameter::Rank(ParameterType::Root, rank)
}

/// The receiving rank of a send.
pub fn destination<'a, T>(rank: i32) -> Parameter<'a, T> {
    Parameter::Rank(ParameterType::Destination, rank)
}

/// The sending rank of a receive or probe. Defaults to any source.
pub fn source<'a, T>(rank: i32) -> Parameter<'a, T> {
    Parameter::Rank(ParameterType::Source, rank)
}

/// Matches messages from any source.
pub fn any_source<'a, T>() -> Parameter<'a, T> {
    source(unsafe { ffi::KAMPING_ANY_SOURCE })
}

/// The message tag. Defaults to `0` for sends and any tag for receives.
pub fn tag<'a, T>(value: i32) -> Parameter<'a, T> {
    Parameter::Tag(value)
}

/// Matches messages with any tag.
pub fn any_tag<'a, T>() -> Parameter<'a, T> {
    tag(unsafe { ffi::KAMPING_ANY_TAG })
}

/// The reduction of a reduce or scan.
pub fn op<'a, T>(operation: impl IntoReduceOperation<'a, T>) -> Parameter<'a, T> {
    Parameter::Op(operation.into_operation())
}

/// A caller managed request for a non-blocking operation.
///
/// The non-blocking result then cannot be waited on; the caller completes `request` and
/// [extracts](crate::nonblocking::NonBlockingResult::extract) the payload.
pub fn request<'a, T>(request: &'a mut Request) -> Parameter<'a, T> {
    Parameter::Request(request)
}

/// Storage for the status of a receive.
pub fn status<'a, T>(storage: &'a mut Status) -> Parameter<'a, T> {
    Parameter::Status(DataBuffer::new(
        ParameterType::Status,
        RoleClass::Out,
        BufferStorage::single_mut(storage),
    ))
}

/// The status of a receive, returned in the result.
pub fn status_out<'a, T>() -> Parameter<'a, T> {
    Parameter::Status(DataBuffer::library_allocated_single(
        ParameterType::Status,
        RoleClass::Out,
        Status::empty(),
    ))
}
