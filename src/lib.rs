//! Message Passing Interface bindings with named parameters
//!
//! Every operation takes its arguments as a tuple of named parameters built by the functions in
//! [`parameter`]. Whatever the caller leaves out is derived by the operation: counts,
//! displacements and datatypes are computed (communicating where necessary), receive buffers
//! are allocated and resized. Everything the operation allocated or the caller asked for with an
//! `*_out` parameter comes back in an [`MpiResult`](result::MpiResult).
//!
//! ```no_run
//! use kamping::prelude::*;
//!
//! let env = Environment::new(InitMode::InitFinalize).unwrap();
//! let comm = env.world().unwrap();
//! let rank = comm.rank();
//!
//! // rank i contributes i copies of i
//! let mine = vec![rank; rank as usize];
//! let mut result = comm.allgatherv((send_buf(&mine), recv_counts_out())).unwrap();
//! let counts = result.extract_recv_counts();
//! let values = result.extract_recv_buffer();
//! println!("rank {}: {:?} with counts {:?}", rank, values, counts);
//!
//! // caller provided storage, grown by the operation
//! let mut sums = Vec::new();
//! comm.allreduce((
//!     send_buf(&[rank, 1][..]),
//!     recv_buf(&mut sums).resize_to_fit(),
//!     op(BuiltinOp::Sum),
//! ))
//! .unwrap();
//! assert_eq!(sums[1], comm.size());
//! ```
//!
//! # Features
//!
//! The bindings follow the MPI 3.1 specification.
//!
//! - **Collective communication**: barrier (also non-blocking), broadcast, (all-)gather(v),
//!   scatter(v), all-to-all(v), reduce, all-reduce, scan and exclusive scan
//! - **Point to point communication**: standard, buffered, synchronous and ready mode sends in
//!   blocking and non-blocking variants, receives with and without known count, probes
//! - **Datatypes**: primitive types, arrays, tuples, `#[derive(Equivalence)]` and byte-wise
//!   equivalence for any plain-old-data type
//! - **Reductions**: predefined operations (with a generic fallback for types MPI does not
//!   reduce natively) and closures
//!
//! Cargo features:
//!
//! - `user-operations` (default): reductions given by closures
//! - `derive`: `#[derive(Equivalence)]`
//! - `complex`: `num_complex::Complex<f32>`/`Complex<f64>` as predefined datatypes
//! - `assertions-*`: the [`AssertionLevel`] compiled into the crate

pub use kamping_sys as ffi;

#[macro_use]
pub mod assertion;

mod adapter;
pub mod buffer;
pub mod cast;
pub mod collectives;
pub mod communicator;
pub mod datatype;
pub mod environment;
pub mod error;
pub mod nonblocking;
pub mod operation;
pub mod p2p;
pub mod parameter;
pub mod request;
pub mod result;
pub mod status;

pub use crate::assertion::{AssertionLevel, ASSERTION_LEVEL};
pub use crate::error::{Error, Result};

#[doc(hidden)]
pub mod __private {
    #[cfg(feature = "derive")]
    pub use memoffset;
}

/// The types and parameter factories most programs need.
pub mod prelude {
    pub use crate::communicator::{Communicator, ErrorHook, FaultTolerantErrorHook};
    pub use crate::datatype::{datatype_of, Byte, CChar, Datatype, Equivalence};
    pub use crate::environment::{Environment, InitMode, Threading};
    pub use crate::nonblocking::NonBlockingResult;
    pub use crate::operation::{commutative, non_commutative, BuiltinOp, ReduceOperation};
    pub use crate::p2p::SendMode;
    pub use crate::parameter::*;
    pub use crate::request::Request;
    pub use crate::result::MpiResult;
    pub use crate::status::Status;
}
