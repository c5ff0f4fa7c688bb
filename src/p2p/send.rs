use std::os::raw::c_int;

use super::SendMode;
use crate::adapter::{CountParam, DataParam, TypeParam};
use crate::assertion::AssertionLevel;
use crate::communicator::{Communicator, ErrorHook};
use crate::datatype::Equivalence;
use crate::error::{Error, Result};
use crate::ffi;
use crate::kassert;
use crate::nonblocking::{NonBlockingResult, Payload, RequestSlot};
use crate::parameter::{IntoParameters, ParameterPack, ParameterType};

const SEND_PARAMETERS: [ParameterType; 3] = [
    ParameterType::SendCount,
    ParameterType::SendType,
    ParameterType::Tag,
];

/// Destination and tag of a send.
fn envelope<H: ErrorHook, T>(
    comm: &Communicator<H>,
    pack: &ParameterPack<'_, T>,
) -> Result<(c_int, c_int)> {
    let destination = pack
        .rank(ParameterType::Destination)
        .ok_or(Error::MissingParameter(ParameterType::Destination))?;
    let proc_null = unsafe { ffi::KAMPING_PROC_NULL };
    kassert!(
        AssertionLevel::Light,
        destination == proc_null || comm.is_valid_rank(destination),
        "destination {} is not a rank of a communicator of size {}",
        destination,
        comm.size()
    );
    let tag = pack.tag().unwrap_or(0);
    kassert!(AssertionLevel::Light, tag >= 0, "send tags must not be negative, got {}", tag);
    Ok((destination, tag))
}

impl<H: ErrorHook> Communicator<H> {
    /// Sends the send buffer to `destination` in standard mode.
    ///
    /// Parameters:
    /// - `send_buf`: required.
    /// - `destination`: required.
    /// - `tag`: optional, 0 otherwise.
    /// - `send_count`: optional, the size of the send buffer otherwise.
    /// - `send_type`: optional, requires `send_count`.
    ///
    /// # Standard section(s)
    ///
    /// 3.2.1
    pub fn send<'a, T: Equivalence>(&self, args: impl IntoParameters<'a, T>) -> Result<()> {
        self.send_in_mode(SendMode::Standard, args)
    }

    /// Sends in buffered mode, using the buffer attached to the environment.
    ///
    /// # Standard section(s)
    ///
    /// 3.4
    pub fn bsend<'a, T: Equivalence>(&self, args: impl IntoParameters<'a, T>) -> Result<()> {
        self.send_in_mode(SendMode::Buffered, args)
    }

    /// Sends in synchronous mode.
    ///
    /// # Standard section(s)
    ///
    /// 3.4
    pub fn ssend<'a, T: Equivalence>(&self, args: impl IntoParameters<'a, T>) -> Result<()> {
        self.send_in_mode(SendMode::Synchronous, args)
    }

    /// Sends in ready mode. The matching receive must already be posted.
    ///
    /// # Standard section(s)
    ///
    /// 3.4
    pub fn rsend<'a, T: Equivalence>(&self, args: impl IntoParameters<'a, T>) -> Result<()> {
        self.send_in_mode(SendMode::Ready, args)
    }

    /// Blocking send in the given mode.
    pub fn send_in_mode<'a, T: Equivalence>(
        &self,
        mode: SendMode,
        args: impl IntoParameters<'a, T>,
    ) -> Result<()> {
        use ParameterType::*;
        let mut pack = args.into_parameters();
        pack.check_parameters(&[SendBuf, Destination], &SEND_PARAMETERS)?;
        pack.check_dependency(SendType, SendCount)?;
        let (destination, tag) = envelope(self, &pack)?;

        let send = DataParam::require(&mut pack, SendBuf)?;
        let mut count = CountParam::take(&mut pack, SendCount);
        let datatype = TypeParam::take(&mut pack, SendType);
        let n = count.resolve(|| send.count())?;
        send.check_readable(datatype.elements::<T>(n, 1)?);

        tracing::trace!(rank = self.rank(), destination, tag, count = n, ?mode, "send");
        let (buf, dt, comm) = (send.send_ptr(), datatype.raw(), self.as_raw());
        let code = unsafe {
            match mode {
                SendMode::Standard => ffi::MPI_Send(buf, n, dt, destination, tag, comm),
                SendMode::Buffered => ffi::MPI_Bsend(buf, n, dt, destination, tag, comm),
                SendMode::Synchronous => ffi::MPI_Ssend(buf, n, dt, destination, tag, comm),
                SendMode::Ready => ffi::MPI_Rsend(buf, n, dt, destination, tag, comm),
            }
        };
        self.check(mode.blocking_call(), code)
    }

    /// Starts a send in standard mode.
    ///
    /// Accepts the parameters of [`send`](Communicator::send) and an optional `request`. A send
    /// buffer passed with [`send_buf_out`](crate::parameter::send_buf_out) is handed back on
    /// completion.
    ///
    /// # Standard section(s)
    ///
    /// 3.7.2
    pub fn isend<'a, T: Equivalence>(
        &self,
        args: impl IntoParameters<'a, T>,
    ) -> Result<NonBlockingResult<'a, T>> {
        self.isend_in_mode(SendMode::Standard, args)
    }

    /// Starts a send in buffered mode.
    ///
    /// # Standard section(s)
    ///
    /// 3.7.2
    pub fn ibsend<'a, T: Equivalence>(
        &self,
        args: impl IntoParameters<'a, T>,
    ) -> Result<NonBlockingResult<'a, T>> {
        self.isend_in_mode(SendMode::Buffered, args)
    }

    /// Starts a send in synchronous mode.
    ///
    /// # Standard section(s)
    ///
    /// 3.7.2
    pub fn issend<'a, T: Equivalence>(
        &self,
        args: impl IntoParameters<'a, T>,
    ) -> Result<NonBlockingResult<'a, T>> {
        self.isend_in_mode(SendMode::Synchronous, args)
    }

    /// Starts a send in ready mode.
    ///
    /// # Standard section(s)
    ///
    /// 3.7.2
    pub fn irsend<'a, T: Equivalence>(
        &self,
        args: impl IntoParameters<'a, T>,
    ) -> Result<NonBlockingResult<'a, T>> {
        self.isend_in_mode(SendMode::Ready, args)
    }

    /// Non-blocking send in the given mode.
    pub fn isend_in_mode<'a, T: Equivalence>(
        &self,
        mode: SendMode,
        args: impl IntoParameters<'a, T>,
    ) -> Result<NonBlockingResult<'a, T>> {
        use ParameterType::*;
        let mut pack = args.into_parameters();
        pack.check_parameters(
            &[SendBuf, Destination],
            &[SendCount, SendType, Tag, Request],
        )?;
        pack.check_dependency(SendType, SendCount)?;
        let (destination, tag) = envelope(self, &pack)?;

        let mut request = RequestSlot::from_parameter(pack.take_request());
        let send = DataParam::require(&mut pack, SendBuf)?;
        let mut count = CountParam::take(&mut pack, SendCount);
        let datatype = TypeParam::take(&mut pack, SendType);
        let n = count.resolve(|| send.count())?;
        send.check_readable(datatype.elements::<T>(n, 1)?);

        tracing::trace!(rank = self.rank(), destination, tag, count = n, ?mode, "immediate send");
        let (buf, dt, comm) = (send.send_ptr(), datatype.raw(), self.as_raw());
        let raw = request.request_mut().as_raw_mut();
        let code = unsafe {
            match mode {
                SendMode::Standard => ffi::MPI_Isend(buf, n, dt, destination, tag, comm, raw),
                SendMode::Buffered => ffi::MPI_Ibsend(buf, n, dt, destination, tag, comm, raw),
                SendMode::Synchronous => {
                    ffi::MPI_Issend(buf, n, dt, destination, tag, comm, raw)
                }
                SendMode::Ready => ffi::MPI_Irsend(buf, n, dt, destination, tag, comm, raw),
            }
        };
        self.check(mode.immediate_call(), code)?;

        let mut payload = Payload::new();
        send.defer(&mut payload);
        count.defer(&mut payload);
        datatype.defer(&mut payload);
        Ok(NonBlockingResult::new(request, payload))
    }
}
