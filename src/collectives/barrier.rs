use crate::communicator::{Communicator, ErrorHook};
use crate::datatype::Byte;
use crate::error::Result;
use crate::ffi;
use crate::nonblocking::{NonBlockingResult, Payload, RequestSlot};
use crate::parameter::{IntoParameters, ParameterType};

impl<H: ErrorHook> Communicator<H> {
    /// Barrier synchronization among all processes in the communicator
    ///
    /// Blocks until every process of the communicator has entered the barrier.
    ///
    /// # Standard section(s)
    ///
    /// 5.3
    pub fn barrier(&self) -> Result<()> {
        tracing::trace!(rank = self.rank(), "MPI_Barrier");
        self.check("MPI_Barrier", unsafe { ffi::MPI_Barrier(self.as_raw()) })
    }

    /// Non-blocking barrier synchronization
    ///
    /// Accepts an optional [`request`](crate::parameter::request). The returned result carries
    /// no outputs.
    ///
    /// # Standard section(s)
    ///
    /// 5.12.1
    pub fn ibarrier<'a>(
        &self,
        args: impl IntoParameters<'a, Byte>,
    ) -> Result<NonBlockingResult<'a, Byte>> {
        let mut pack = args.into_parameters();
        pack.check_parameters(&[], &[ParameterType::Request])?;
        let mut request = RequestSlot::from_parameter(pack.take_request());
        tracing::trace!(rank = self.rank(), "MPI_Ibarrier");
        self.check("MPI_Ibarrier", unsafe {
            ffi::MPI_Ibarrier(self.as_raw(), request.request_mut().as_raw_mut())
        })?;
        Ok(NonBlockingResult::new(request, Payload::new()))
    }
}
