//! Communicators
//!
//! A [`Communicator`] wraps an `MPI_Comm` together with its cached rank and size, a default root
//! for rooted collectives and an [`ErrorHook`] through which every failed MPI call issued on it is
//! mapped onto an [`Error`].
//!
//! The collective operations live in [`collectives`](crate::collectives), point to point
//! communication in [`p2p`](crate::p2p).
//!
//! # Standard section(s)
//!
//! 6.4

use std::fmt;
use std::os::raw::c_int;

use crate::cast::asserting_cast;
use crate::error::{error_class, Error, Result, MPI_SUCCESS};
use crate::ffi;
use crate::ffi::MPI_Comm;

/// Maps the return code of a failed MPI call onto an [`Error`].
pub trait ErrorHook {
    /// `call` names the MPI function that returned `code`.
    fn handle(&self, call: &'static str, code: c_int) -> Error {
        Error::from_code(call, code)
    }
}

/// Reports every failure as [`Error::Mpi`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DefaultErrorHook;

impl ErrorHook for DefaultErrorHook {}

/// Reports process failures and revoked communicators as [`Error::ProcessFailed`],
/// [`Error::ProcessFailedPending`] and [`Error::Revoked`].
///
/// The error classes are only known if the MPI library implements the fault tolerance
/// extensions; otherwise this behaves like [`DefaultErrorHook`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FaultTolerantErrorHook;

impl ErrorHook for FaultTolerantErrorHook {
    fn handle(&self, call: &'static str, code: c_int) -> Error {
        let class = match error_class(code) {
            Some(class) => class,
            None => return Error::from_code(call, code),
        };
        let (failed, pending, revoked) = unsafe {
            (
                ffi::KAMPING_ERR_PROC_FAILED,
                ffi::KAMPING_ERR_PROC_FAILED_PENDING,
                ffi::KAMPING_ERR_REVOKED,
            )
        };
        // the shim reports classes unknown to the MPI library as -1
        if class < 0 {
            Error::from_code(call, code)
        } else if class == failed {
            Error::ProcessFailed { call }
        } else if class == pending {
            Error::ProcessFailedPending { call }
        } else if class == revoked {
            Error::Revoked { call }
        } else {
            Error::from_code(call, code)
        }
    }
}

/// A group of processes that can communicate with each other.
pub struct Communicator<H: ErrorHook = DefaultErrorHook> {
    raw: MPI_Comm,
    owned: bool,
    rank: i32,
    size: i32,
    root: i32,
    hook: H,
}

impl Communicator {
    /// All processes of the MPI job.
    pub fn world() -> Result<Self> {
        unsafe { Communicator::wrap(ffi::KAMPING_COMM_WORLD, false, DefaultErrorHook) }
    }

    /// Only the calling process.
    pub fn self_comm() -> Result<Self> {
        unsafe { Communicator::wrap(ffi::KAMPING_COMM_SELF, false, DefaultErrorHook) }
    }
}

impl<H: ErrorHook> Communicator<H> {
    /// Wraps `raw`, caching rank and size.
    ///
    /// # Safety
    /// `raw` must be a valid communicator. If `owned` is set it is freed on drop and must not be
    /// freed elsewhere.
    pub unsafe fn from_raw(raw: MPI_Comm, owned: bool, hook: H) -> Result<Self> {
        Communicator::wrap(raw, owned, hook)
    }

    unsafe fn wrap(raw: MPI_Comm, owned: bool, hook: H) -> Result<Self> {
        let mut rank: c_int = 0;
        let mut size: c_int = 0;
        let code = ffi::MPI_Comm_rank(raw, &mut rank);
        if code != MPI_SUCCESS {
            return Err(hook.handle("MPI_Comm_rank", code));
        }
        let code = ffi::MPI_Comm_size(raw, &mut size);
        if code != MPI_SUCCESS {
            return Err(hook.handle("MPI_Comm_size", code));
        }
        Ok(Communicator {
            raw,
            owned,
            rank,
            size,
            root: 0,
            hook,
        })
    }

    /// Replaces the error hook.
    pub fn with_error_hook<G: ErrorHook>(mut self, hook: G) -> Communicator<G> {
        let owned = self.owned;
        // the returned communicator takes over freeing the handle
        self.owned = false;
        Communicator {
            raw: self.raw,
            owned,
            rank: self.rank,
            size: self.size,
            root: self.root,
            hook,
        }
    }

    /// The error hook.
    pub fn error_hook(&self) -> &H {
        &self.hook
    }

    /// The raw handle.
    pub fn as_raw(&self) -> MPI_Comm {
        self.raw
    }

    /// Number of processes in this communicator
    ///
    /// # Standard section(s)
    ///
    /// 6.4.1
    pub fn size(&self) -> i32 {
        self.size
    }

    /// The rank that identifies the calling process within this communicator
    ///
    /// # Standard section(s)
    ///
    /// 6.4.1
    pub fn rank(&self) -> i32 {
        self.rank
    }

    pub(crate) fn size_usize(&self) -> usize {
        asserting_cast(self.size)
    }

    pub(crate) fn rank_usize(&self) -> usize {
        asserting_cast(self.rank)
    }

    /// The default root of rooted collectives.
    pub fn root(&self) -> i32 {
        self.root
    }

    /// Changes the default root of rooted collectives.
    ///
    /// # Panics
    /// Panics if `root` is not a rank of this communicator.
    pub fn set_root(&mut self, root: i32) {
        crate::kassert!(
            crate::AssertionLevel::Light,
            self.is_valid_rank(root),
            "{} is not a rank of a communicator of size {}",
            root,
            self.size
        );
        self.root = root;
    }

    /// Whether the calling process is the default root.
    pub fn is_root(&self) -> bool {
        self.rank == self.root
    }

    /// Whether `rank` is a rank of this communicator.
    pub fn is_valid_rank(&self, rank: i32) -> bool {
        (0..self.size).contains(&rank)
    }

    /// Routes a return code through the error hook.
    pub(crate) fn check(&self, call: &'static str, code: c_int) -> Result<()> {
        if code == MPI_SUCCESS {
            Ok(())
        } else {
            Err(self.hook.handle(call, code))
        }
    }

    /// Splits the communicator. Processes passing the same `color` end up in the same
    /// communicator, ordered by `key`. Returns `None` for `color == ffi::KAMPING_UNDEFINED`.
    ///
    /// # Standard section(s)
    ///
    /// 6.4.2
    pub fn split(&self, color: i32, key: i32) -> Result<Option<Self>>
    where
        H: Clone,
    {
        let mut raw = unsafe { ffi::KAMPING_COMM_NULL };
        self.check("MPI_Comm_split", unsafe {
            ffi::MPI_Comm_split(self.raw, color, key, &mut raw)
        })?;
        if raw == unsafe { ffi::KAMPING_COMM_NULL } {
            return Ok(None);
        }
        tracing::debug!(rank = self.rank, color, key, "split communicator");
        unsafe { Communicator::wrap(raw, true, self.hook.clone()) }.map(Some)
    }

    /// A new communicator with the same processes.
    ///
    /// # Standard section(s)
    ///
    /// 6.4.2
    pub fn duplicate(&self) -> Result<Self>
    where
        H: Clone,
    {
        let mut raw = unsafe { ffi::KAMPING_COMM_NULL };
        self.check("MPI_Comm_dup", unsafe {
            ffi::MPI_Comm_dup(self.raw, &mut raw)
        })?;
        let mut comm = unsafe { Communicator::wrap(raw, true, self.hook.clone()) }?;
        comm.root = self.root;
        Ok(comm)
    }
}

impl<H: ErrorHook> Drop for Communicator<H> {
    fn drop(&mut self) {
        if self.owned {
            let code = unsafe { ffi::MPI_Comm_free(&mut self.raw) };
            if code != MPI_SUCCESS {
                tracing::warn!(code, "MPI_Comm_free failed");
            }
        }
    }
}

impl<H: ErrorHook> fmt::Debug for Communicator<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Communicator")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .field("root", &self.root)
            .field("owned", &self.owned)
            .finish()
    }
}
