//! Snapshot of a completed or probed message

use std::fmt;
use std::mem;
use std::os::raw::c_int;

use crate::cast::throwing_cast;
use crate::datatype::{datatype_of, Datatype, Equivalence};
use crate::error::{check, Result};
use crate::ffi;
use crate::ffi::MPI_Status;

/// Describes the result of a point to point receive or probe.
///
/// The element count is not stored; it is computed on request for a given element type.
///
/// # Standard section(s)
///
/// 3.2.5
#[derive(Copy, Clone)]
#[repr(transparent)]
pub struct Status(MPI_Status);

impl Status {
    /// Construct a `Status` value from the raw MPI type
    pub fn from_raw(status: MPI_Status) -> Status {
        Status(status)
    }

    /// A status not yet filled in by MPI.
    pub fn empty() -> Status {
        // All fields of MPI_Status are plain integers.
        Status(unsafe { mem::zeroed() })
    }

    /// The raw status
    pub fn as_raw(&self) -> &MPI_Status {
        &self.0
    }

    pub(crate) fn as_raw_mut(&mut self) -> *mut MPI_Status {
        &mut self.0
    }

    /// The rank of the message source
    pub fn source(&self) -> c_int {
        self.0.MPI_SOURCE
    }

    /// The message tag
    pub fn tag(&self) -> c_int {
        self.0.MPI_TAG
    }

    /// Number of elements of type `T` in the message.
    pub fn count<T: Equivalence>(&self) -> Result<usize> {
        self.count_with(&datatype_of::<T>())
    }

    /// Number of elements of `datatype` in the message.
    pub fn count_with(&self, datatype: &Datatype) -> Result<usize> {
        let mut count: c_int = 0;
        check("MPI_Get_count", unsafe {
            ffi::MPI_Get_count(&self.0, datatype.as_raw(), &mut count)
        })?;
        throwing_cast(count)
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::empty()
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Status")
            .field("source", &self.source())
            .field("tag", &self.tag())
            .finish()
    }
}
