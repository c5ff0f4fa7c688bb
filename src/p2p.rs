//! Point to point communication
//!
//! Sends and receives are methods of [`Communicator`](crate::communicator::Communicator) taking
//! named parameters like the collectives. Sends need a `destination`, receives default to any
//! source and any tag. A receive without `recv_count` probes the message first and sizes the
//! receive buffer from its status.
//!
//! ```no_run
//! use kamping::prelude::*;
//!
//! let env = Environment::new(InitMode::InitFinalize).unwrap();
//! let comm = env.world().unwrap();
//! if comm.rank() == 0 {
//!     comm.send((send_buf(&[1, 3, 5][..]), destination(1))).unwrap();
//! } else if comm.rank() == 1 {
//!     let values: Vec<i32> = comm.recv(source(0)).unwrap().extract_recv_buffer();
//!     assert_eq!(values, vec![1, 3, 5]);
//! }
//! ```
//!
//! # Unfinished features
//!
//! - **3.9**: Persistent requests
//! - **3.10**: `MPI_Sendrecv()`

mod probe;
mod recv;
mod send;

/// The communication modes of a send.
///
/// # Standard section(s)
///
/// 3.4
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SendMode {
    /// Completes once the send buffer can be reused.
    Standard,
    /// Copies the message into the buffer attached to the environment.
    Buffered,
    /// Completes once the receiver has started to receive.
    Synchronous,
    /// Requires a matching receive to be posted already.
    Ready,
}

impl SendMode {
    pub(crate) fn blocking_call(self) -> &'static str {
        match self {
            SendMode::Standard => "MPI_Send",
            SendMode::Buffered => "MPI_Bsend",
            SendMode::Synchronous => "MPI_Ssend",
            SendMode::Ready => "MPI_Rsend",
        }
    }

    pub(crate) fn immediate_call(self) -> &'static str {
        match self {
            SendMode::Standard => "MPI_Isend",
            SendMode::Buffered => "MPI_Ibsend",
            SendMode::Synchronous => "MPI_Issend",
            SendMode::Ready => "MPI_Irsend",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SendMode;

    #[test]
    fn calls_follow_the_mode() {
        assert_eq!(SendMode::Standard.blocking_call(), "MPI_Send");
        assert_eq!(SendMode::Buffered.immediate_call(), "MPI_Ibsend");
        assert_eq!(SendMode::Synchronous.blocking_call(), "MPI_Ssend");
        assert_eq!(SendMode::Ready.immediate_call(), "MPI_Irsend");
    }
}
