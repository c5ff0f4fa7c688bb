//! Collective communication
//!
//! Every collective is a method of [`Communicator`](crate::communicator::Communicator) that takes
//! its arguments as named parameters, derives whatever the caller left out (counts,
//! displacements, receive buffers) and returns the outputs as an
//! [`MpiResult`](crate::result::MpiResult). The default receive buffer of an operation is
//! always the first output.
//!
//! ```no_run
//! use kamping::prelude::*;
//!
//! let env = Environment::new(InitMode::InitFinalize).unwrap();
//! let comm = env.world().unwrap();
//! let rank = comm.rank();
//! let all: Vec<i32> = comm
//!     .allgather(send_buf(&rank))
//!     .unwrap()
//!     .extract_recv_buffer();
//! assert_eq!(all.len(), comm.size() as usize);
//! ```
//!
//! # Unfinished features
//!
//! - **5.8**: `MPI_Alltoallw()`
//! - **5.10**: Reduce-scatter, `MPI_Reduce_scatter()`
//! - **5.12**: Nonblocking collective operations besides `MPI_Ibarrier()`

mod allgather;
mod alltoall;
mod barrier;
mod bcast;
mod gather;
mod reduce;
mod scan;
mod scatter;
