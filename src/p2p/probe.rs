use std::os::raw::c_int;

use super::recv::source_and_tag;
use crate::communicator::{Communicator, ErrorHook};
use crate::datatype::Byte;
use crate::error::Result;
use crate::ffi;
use crate::parameter::{IntoParameters, ParameterType};
use crate::status::Status;

impl<H: ErrorHook> Communicator<H> {
    /// Blocks until a matching message is available and returns its status without receiving it.
    ///
    /// A later receive is not guaranteed to match the probed message if other threads receive
    /// concurrently; [`recv`](Communicator::recv) without a count uses a matched probe instead.
    ///
    /// Parameters:
    /// - `source`: optional, any source otherwise.
    /// - `tag`: optional, any tag otherwise.
    ///
    /// # Standard section(s)
    ///
    /// 3.8.1
    pub fn probe<'a>(&self, args: impl IntoParameters<'a, Byte>) -> Result<Status> {
        let pack = args.into_parameters();
        pack.check_parameters(&[], &[ParameterType::Source, ParameterType::Tag])?;
        let (source, tag) = source_and_tag(self, &pack);

        let mut status = Status::empty();
        self.check("MPI_Probe", unsafe {
            ffi::MPI_Probe(source, tag, self.as_raw(), status.as_raw_mut())
        })?;
        tracing::trace!(rank = self.rank(), source = status.source(), tag = status.tag(), "probed");
        Ok(status)
    }

    /// Returns the status of a matching message if one is available, without blocking.
    ///
    /// # Standard section(s)
    ///
    /// 3.8.1
    pub fn iprobe<'a>(&self, args: impl IntoParameters<'a, Byte>) -> Result<Option<Status>> {
        let pack = args.into_parameters();
        pack.check_parameters(&[], &[ParameterType::Source, ParameterType::Tag])?;
        let (source, tag) = source_and_tag(self, &pack);

        let mut status = Status::empty();
        let mut flag: c_int = 0;
        self.check("MPI_Iprobe", unsafe {
            ffi::MPI_Iprobe(source, tag, self.as_raw(), &mut flag, status.as_raw_mut())
        })?;
        Ok((flag != 0).then_some(status))
    }
}
