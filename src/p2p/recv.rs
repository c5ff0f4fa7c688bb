use std::os::raw::c_int;

use crate::adapter::{CountParam, DataParam, TypeParam};
use crate::assertion::AssertionLevel;
use crate::buffer::DataBuffer;
use crate::cast::throwing_cast;
use crate::communicator::{Communicator, ErrorHook};
use crate::datatype::{datatype_of, Equivalence};
use crate::error::{Error, Result};
use crate::ffi;
use crate::ffi::MPI_Message;
use crate::kassert;
use crate::nonblocking::{NonBlockingResult, Payload, RequestSlot};
use crate::parameter::{IntoParameters, ParameterPack, ParameterType, Position};
use crate::result::{MpiResult, ResultBuilder};
use crate::status::Status;

/// Source and tag of a receive, defaulting to any source and any tag.
pub(super) fn source_and_tag<H: ErrorHook, T>(
    comm: &Communicator<H>,
    pack: &ParameterPack<'_, T>,
) -> (c_int, c_int) {
    let (any_source, any_tag, proc_null) = unsafe {
        (
            ffi::KAMPING_ANY_SOURCE,
            ffi::KAMPING_ANY_TAG,
            ffi::KAMPING_PROC_NULL,
        )
    };
    let source = pack.rank(ParameterType::Source).unwrap_or(any_source);
    kassert!(
        AssertionLevel::Light,
        source == any_source || source == proc_null || comm.is_valid_rank(source),
        "source {} is not a rank of a communicator of size {}",
        source,
        comm.size()
    );
    (source, pack.tag().unwrap_or(any_tag))
}

/// Writes `status` to the status parameter, if any.
fn report_status<T>(
    slot: Option<(Position, DataBuffer<'_, Status>)>,
    status: Status,
    result: &mut ResultBuilder<T>,
) {
    if let Some((position, mut buffer)) = slot {
        buffer.set_first(status);
        result.status(position, buffer);
    }
}

impl<H: ErrorHook> Communicator<H> {
    /// Receives a message.
    ///
    /// Without `recv_count` the message is matched by a probe first and the receive buffer is
    /// sized from the probed status.
    ///
    /// Parameters:
    /// - `recv_buf`: optional, library allocated otherwise.
    /// - `source`: optional, any source otherwise.
    /// - `tag`: optional, any tag otherwise.
    /// - `recv_count`: optional.
    /// - `recv_type`: optional, requires `recv_count`.
    /// - `status`: optional.
    ///
    /// # Standard section(s)
    ///
    /// 3.2.4, 3.8.2
    pub fn recv<'a, T>(&self, args: impl IntoParameters<'a, T>) -> Result<MpiResult<T>>
    where
        T: Equivalence + Default + Clone,
    {
        use ParameterType::{RecvBuf, RecvCount, RecvType, Source, Tag};
        let mut pack = args.into_parameters();
        pack.check_parameters(
            &[],
            &[RecvBuf, Source, Tag, RecvCount, RecvType, ParameterType::Status],
        )?;
        pack.check_dependency(RecvType, RecvCount)?;
        let (source, tag) = source_and_tag(self, &pack);

        let mut recv = DataParam::take_or_allocate(&mut pack, RecvBuf);
        let mut count = CountParam::take(&mut pack, RecvCount);
        let datatype = TypeParam::take(&mut pack, RecvType);
        let status_slot = pack.take_status();
        let mut status = Status::empty();

        match count.given() {
            Some(n) => {
                recv.prepare(datatype.elements::<T>(n, 1)?);
                tracing::trace!(rank = self.rank(), source, tag, count = n, "MPI_Recv");
                self.check("MPI_Recv", unsafe {
                    ffi::MPI_Recv(
                        recv.recv_ptr(),
                        n,
                        datatype.raw(),
                        source,
                        tag,
                        self.as_raw(),
                        status.as_raw_mut(),
                    )
                })?;
            }
            None => {
                let mut message: MPI_Message = unsafe { ffi::KAMPING_MESSAGE_NULL };
                self.check("MPI_Mprobe", unsafe {
                    ffi::MPI_Mprobe(source, tag, self.as_raw(), &mut message, status.as_raw_mut())
                })?;
                let probed = status.count_with(&datatype.datatype())?;
                let n: c_int = throwing_cast(probed)?;
                count.set(n);
                recv.prepare(datatype.elements::<T>(n, 1)?);
                tracing::trace!(
                    rank = self.rank(),
                    source = status.source(),
                    tag = status.tag(),
                    count = n,
                    "MPI_Mrecv"
                );
                self.check("MPI_Mrecv", unsafe {
                    ffi::MPI_Mrecv(
                        recv.recv_ptr(),
                        n,
                        datatype.raw(),
                        &mut message,
                        status.as_raw_mut(),
                    )
                })?;
            }
        }

        let mut result = ResultBuilder::new();
        recv.finish(&mut result);
        count.finish(&mut result);
        datatype.finish(&mut result);
        report_status(status_slot, status, &mut result);
        Ok(result.finish())
    }

    /// Starts a receive.
    ///
    /// The number of elements is `recv_count` or, if omitted, the size of a caller provided
    /// receive buffer.
    ///
    /// Parameters:
    /// - `recv_buf`: optional, library allocated otherwise.
    /// - `recv_count`: required unless `recv_buf` is passed.
    /// - `source`, `tag`, `recv_type`, `status`: as for [`recv`](Communicator::recv).
    /// - `request`: optional.
    ///
    /// # Standard section(s)
    ///
    /// 3.7.2
    pub fn irecv<'a, T>(
        &self,
        args: impl IntoParameters<'a, T>,
    ) -> Result<NonBlockingResult<'a, T>>
    where
        T: Equivalence + Default + Clone,
    {
        use ParameterType::{RecvBuf, RecvCount, RecvType, Request, Source, Tag};
        let mut pack = args.into_parameters();
        pack.check_parameters(
            &[],
            &[RecvBuf, Source, Tag, RecvCount, RecvType, ParameterType::Status, Request],
        )?;
        pack.check_dependency(RecvType, RecvCount)?;
        let (source, tag) = source_and_tag(self, &pack);

        let mut request = RequestSlot::from_parameter(pack.take_request());
        let user_buffer = DataParam::take(&mut pack, RecvBuf);
        let from_user = user_buffer.is_some();
        let mut recv = match user_buffer {
            Some(recv) => recv,
            None => DataParam::take_or_allocate(&mut pack, RecvBuf),
        };
        let mut count = CountParam::take(&mut pack, RecvCount);
        let datatype = TypeParam::take(&mut pack, RecvType);
        let status_slot = pack.take_status();

        let n = match count.given() {
            Some(n) => n,
            None if from_user => recv.count()?,
            None => return Err(Error::MissingParameter(RecvCount)),
        };
        recv.prepare(datatype.elements::<T>(n, 1)?);

        tracing::trace!(rank = self.rank(), source, tag, count = n, "MPI_Irecv");
        self.check("MPI_Irecv", unsafe {
            ffi::MPI_Irecv(
                recv.recv_ptr(),
                n,
                datatype.raw(),
                source,
                tag,
                self.as_raw(),
                request.request_mut().as_raw_mut(),
            )
        })?;
        count.set(n);

        let mut payload = Payload::new();
        recv.defer(&mut payload);
        count.defer(&mut payload);
        datatype.defer(&mut payload);
        if let Some((position, buffer)) = status_slot {
            payload.status(position, buffer);
        }
        Ok(NonBlockingResult::new(request, payload))
    }

    /// Receives a message if one is pending, without blocking.
    ///
    /// Returns `None` if no matching message is available. The receive buffer is sized from the
    /// probed status.
    ///
    /// Parameters:
    /// - `recv_buf`: optional, library allocated otherwise.
    /// - `source`: optional, any source otherwise.
    /// - `tag`: optional, any tag otherwise.
    /// - `status`: optional.
    ///
    /// # Standard section(s)
    ///
    /// 3.8.2
    pub fn try_recv<'a, T>(&self, args: impl IntoParameters<'a, T>) -> Result<Option<MpiResult<T>>>
    where
        T: Equivalence + Default + Clone,
    {
        use ParameterType::{RecvBuf, Source, Tag};
        let mut pack = args.into_parameters();
        pack.check_parameters(&[], &[RecvBuf, Source, Tag, ParameterType::Status])?;
        let (source, tag) = source_and_tag(self, &pack);

        let mut message: MPI_Message = unsafe { ffi::KAMPING_MESSAGE_NULL };
        let mut status = Status::empty();
        let mut flag: c_int = 0;
        self.check("MPI_Improbe", unsafe {
            ffi::MPI_Improbe(
                source,
                tag,
                self.as_raw(),
                &mut flag,
                &mut message,
                status.as_raw_mut(),
            )
        })?;
        if flag == 0 {
            return Ok(None);
        }

        let mut recv = DataParam::take_or_allocate(&mut pack, RecvBuf);
        let status_slot = pack.take_status();
        let probed = status.count::<T>()?;
        let n: c_int = throwing_cast(probed)?;
        recv.prepare(probed);
        tracing::trace!(
            rank = self.rank(),
            source = status.source(),
            tag = status.tag(),
            count = n,
            "MPI_Mrecv"
        );
        self.check("MPI_Mrecv", unsafe {
            ffi::MPI_Mrecv(
                recv.recv_ptr(),
                n,
                datatype_of::<T>().as_raw(),
                &mut message,
                status.as_raw_mut(),
            )
        })?;

        let mut result = ResultBuilder::new();
        recv.finish(&mut result);
        report_status(status_slot, status, &mut result);
        Ok(Some(result.finish()))
    }
}
