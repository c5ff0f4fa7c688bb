//! Request objects for non-blocking operations
//!
//! A [`Request`] wraps the raw handle of a pending operation. Completed and freshly constructed
//! requests hold the null handle. Non-blocking operations normally keep their request inside a
//! [`NonBlockingResult`](crate::nonblocking::NonBlockingResult); a caller managed request can be
//! passed instead with the [`request`](crate::parameter::request) parameter.
//!
//! # Standard section(s)
//!
//! 3.7

use std::fmt;
use std::os::raw::c_int;

use crate::cast::throwing_cast;
use crate::error::{check, Result};
use crate::ffi;
use crate::ffi::{MPI_Request, MPI_Status};
use crate::status::Status;

/// A handle to a pending operation.
#[repr(transparent)]
pub struct Request {
    raw: MPI_Request,
}

impl Request {
    /// A request in the completed state.
    pub fn new() -> Self {
        Request {
            raw: unsafe { ffi::KAMPING_REQUEST_NULL },
        }
    }

    /// Wraps a raw request handle.
    ///
    /// # Safety
    /// `raw` must be the null handle or a valid handle whose buffers outlive the request.
    pub unsafe fn from_raw(raw: MPI_Request) -> Self {
        Request { raw }
    }

    /// The raw handle.
    pub fn as_raw(&self) -> MPI_Request {
        self.raw
    }

    pub(crate) fn as_raw_mut(&mut self) -> *mut MPI_Request {
        &mut self.raw
    }

    /// Whether the request holds the null handle, i.e. nothing is pending.
    pub fn is_null(&self) -> bool {
        self.raw == unsafe { ffi::KAMPING_REQUEST_NULL }
    }

    /// Blocks until the operation has finished.
    ///
    /// # Standard section(s)
    ///
    /// 3.7.3
    pub fn wait(&mut self) -> Result<Status> {
        let mut status = Status::empty();
        check("MPI_Wait", unsafe {
            ffi::MPI_Wait(&mut self.raw, status.as_raw_mut())
        })?;
        Ok(status)
    }

    /// Checks whether the operation has finished without blocking.
    ///
    /// # Standard section(s)
    ///
    /// 3.7.3
    pub fn test(&mut self) -> Result<Option<Status>> {
        let mut status = Status::empty();
        let mut flag: c_int = 0;
        check("MPI_Test", unsafe {
            ffi::MPI_Test(&mut self.raw, &mut flag, status.as_raw_mut())
        })?;
        Ok((flag != 0).then_some(status))
    }

    /// Marks the operation for cancellation. The request still has to be completed.
    ///
    /// # Standard section(s)
    ///
    /// 3.8.4
    pub fn cancel(&mut self) -> Result<()> {
        if self.is_null() {
            return Ok(());
        }
        check("MPI_Cancel", unsafe { ffi::MPI_Cancel(&mut self.raw) })
    }

    /// Blocks until every operation in `requests` has finished.
    ///
    /// # Standard section(s)
    ///
    /// 3.7.5
    pub fn wait_all(requests: &mut [Request]) -> Result<Vec<Status>> {
        let count: c_int = throwing_cast(requests.len())?;
        let mut statuses = vec![Status::empty(); requests.len()];
        // `Request` and `Status` are transparent wrappers of the raw types.
        check("MPI_Waitall", unsafe {
            ffi::MPI_Waitall(
                count,
                requests.as_mut_ptr() as *mut MPI_Request,
                statuses.as_mut_ptr() as *mut MPI_Status,
            )
        })?;
        Ok(statuses)
    }

    /// Checks whether every operation in `requests` has finished without blocking.
    ///
    /// # Standard section(s)
    ///
    /// 3.7.5
    pub fn test_all(requests: &mut [Request]) -> Result<Option<Vec<Status>>> {
        let count: c_int = throwing_cast(requests.len())?;
        let mut statuses = vec![Status::empty(); requests.len()];
        let mut flag: c_int = 0;
        check("MPI_Testall", unsafe {
            ffi::MPI_Testall(
                count,
                requests.as_mut_ptr() as *mut MPI_Request,
                &mut flag,
                statuses.as_mut_ptr() as *mut MPI_Status,
            )
        })?;
        Ok((flag != 0).then_some(statuses))
    }
}

impl Default for Request {
    fn default() -> Self {
        Request::new()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("pending", &!self.is_null())
            .finish()
    }
}
