use std::os::raw::c_void;

use crate::adapter::{
    exclusive_prefix_sum, per_rank_count, CountParam, CountsParam, DataParam, TypeParam,
};
use crate::communicator::{Communicator, ErrorHook};
use crate::datatype::{datatype_of, Equivalence};
use crate::error::Result;
use crate::ffi;
use crate::parameter::{IntoParameters, ParameterType};
use crate::result::{MpiResult, ResultBuilder};

impl<H: ErrorHook> Communicator<H> {
    /// Gathers the send buffers of all ranks on all ranks.
    ///
    /// All ranks send the same number of elements. Afterwards the receive buffer holds the block
    /// of rank `i` at offset `i * recv_count`.
    ///
    /// Parameters:
    /// - `send_buf`: required.
    /// - `recv_buf`: optional, library allocated otherwise.
    /// - `send_count`: optional, the size of the send buffer otherwise.
    /// - `recv_count`: optional, equal to the send count otherwise.
    /// - `send_type` / `recv_type`: optional, require the matching count.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use kamping::prelude::*;
    ///
    /// let env = Environment::new(InitMode::InitFinalize).unwrap();
    /// let comm = env.world().unwrap();
    /// let rank = comm.rank();
    /// let mut gathered = Vec::new();
    /// comm.allgather((send_buf(&rank), recv_buf(&mut gathered).resize_to_fit()))
    ///     .unwrap();
    /// assert_eq!(gathered, (0..comm.size()).collect::<Vec<_>>());
    /// ```
    ///
    /// # Standard section(s)
    ///
    /// 5.7
    pub fn allgather<'a, T>(&self, args: impl IntoParameters<'a, T>) -> Result<MpiResult<T>>
    where
        T: Equivalence + Default + Clone,
    {
        use ParameterType::*;
        let mut pack = args.into_parameters();
        pack.check_parameters(
            &[SendBuf],
            &[RecvBuf, SendCount, RecvCount, SendType, RecvType],
        )?;
        pack.check_dependency(SendType, SendCount)?;
        pack.check_dependency(RecvType, RecvCount)?;

        let send = DataParam::require(&mut pack, SendBuf)?;
        let mut recv = DataParam::take_or_allocate(&mut pack, RecvBuf);
        let mut send_count = CountParam::take(&mut pack, SendCount);
        let mut recv_count = CountParam::take(&mut pack, RecvCount);
        let send_type = TypeParam::take(&mut pack, SendType);
        let recv_type = TypeParam::take(&mut pack, RecvType);

        let sc = send_count.resolve(|| send.count())?;
        send.check_readable(send_type.elements::<T>(sc, 1)?);
        if !send_type.is_explicit() {
            self.assert_same_on_all_ranks(sc, "send_count")?;
        }
        let rc = recv_count.resolve(|| Ok(sc))?;
        recv.prepare(recv_type.elements::<T>(rc, self.size_usize())?);

        tracing::trace!(rank = self.rank(), send_count = sc, recv_count = rc, "MPI_Allgather");
        self.check("MPI_Allgather", unsafe {
            ffi::MPI_Allgather(
                send.send_ptr(),
                sc,
                send_type.raw(),
                recv.recv_ptr(),
                rc,
                recv_type.raw(),
                self.as_raw(),
            )
        })?;

        let mut result = ResultBuilder::new();
        recv.finish(&mut result);
        send.finish(&mut result);
        send_count.finish(&mut result);
        recv_count.finish(&mut result);
        send_type.finish(&mut result);
        recv_type.finish(&mut result);
        Ok(result.finish())
    }

    /// Gathers the send/receive buffer in place: every rank contributes the block at offset
    /// `rank * count` and afterwards holds all blocks.
    ///
    /// Parameters:
    /// - `send_recv_buf`: required, holding at least `size * count` elements.
    /// - `send_recv_count`: optional, the buffer size divided by the communicator size otherwise.
    /// - `send_recv_type`: optional, requires `send_recv_count`.
    ///
    /// # Standard section(s)
    ///
    /// 5.7
    pub fn allgather_inplace<'a, T>(
        &self,
        args: impl IntoParameters<'a, T>,
    ) -> Result<MpiResult<T>>
    where
        T: Equivalence + Default + Clone,
    {
        use ParameterType::*;
        let mut pack = args.into_parameters();
        pack.check_parameters(&[SendRecvBuf], &[SendRecvCount, SendRecvType])?;
        pack.check_dependency(SendRecvType, SendRecvCount)?;

        let mut buffer = DataParam::require(&mut pack, SendRecvBuf)?;
        let mut count = CountParam::take(&mut pack, SendRecvCount);
        let datatype = TypeParam::take(&mut pack, SendRecvType);

        let n = count.resolve(|| per_rank_count(buffer.size(), self.size_usize(), SendRecvBuf))?;
        if !datatype.is_explicit() {
            self.assert_same_on_all_ranks(n, "send_recv_count")?;
        }
        buffer.prepare(datatype.elements::<T>(n, self.size_usize())?);

        tracing::trace!(rank = self.rank(), count = n, "MPI_Allgather (in place)");
        self.check("MPI_Allgather", unsafe {
            ffi::MPI_Allgather(
                ffi::KAMPING_IN_PLACE as *const c_void,
                0,
                ffi::KAMPING_DATATYPE_NULL,
                buffer.recv_ptr(),
                n,
                datatype.raw(),
                self.as_raw(),
            )
        })?;

        let mut result = ResultBuilder::new();
        buffer.finish(&mut result);
        count.finish(&mut result);
        datatype.finish(&mut result);
        Ok(result.finish())
    }

    /// Gathers send buffers of varying size on all ranks.
    ///
    /// Parameters:
    /// - `send_buf`: required.
    /// - `recv_buf`: optional, library allocated otherwise.
    /// - `send_count`: optional, the size of the send buffer otherwise.
    /// - `recv_counts`: optional, gathered from the send counts otherwise.
    /// - `recv_displs`: optional, the exclusive prefix sum of the receive counts otherwise.
    /// - `send_type`: optional, requires `send_count`.
    /// - `recv_type`: optional, requires `recv_counts`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use kamping::prelude::*;
    ///
    /// let env = Environment::new(InitMode::InitFinalize).unwrap();
    /// let comm = env.world().unwrap();
    /// let mine = vec![comm.rank(); comm.rank() as usize];
    /// let (values, counts): (Vec<i32>, Vec<i32>) = comm
    ///     .allgatherv((send_buf(&mine), recv_counts_out()))
    ///     .unwrap()
    ///     .destructure();
    /// assert_eq!(counts, (0..comm.size()).collect::<Vec<_>>());
    /// # let _ = values;
    /// ```
    ///
    /// # Standard section(s)
    ///
    /// 5.7
    pub fn allgatherv<'a, T>(&self, args: impl IntoParameters<'a, T>) -> Result<MpiResult<T>>
    where
        T: Equivalence + Default + Clone,
    {
        use ParameterType::*;
        let mut pack = args.into_parameters();
        pack.check_parameters(
            &[SendBuf],
            &[RecvBuf, SendCount, RecvCounts, RecvDispls, SendType, RecvType],
        )?;
        pack.check_dependency(SendType, SendCount)?;
        pack.check_dependency(RecvType, RecvCounts)?;
        let size = self.size_usize();

        let send = DataParam::require(&mut pack, SendBuf)?;
        let mut recv = DataParam::take_or_allocate(&mut pack, RecvBuf);
        let mut send_count = CountParam::take(&mut pack, SendCount);
        let mut recv_counts = CountsParam::take(&mut pack, RecvCounts);
        let mut recv_displs = CountsParam::take(&mut pack, RecvDispls);
        let send_type = TypeParam::take(&mut pack, SendType);
        let recv_type = TypeParam::take(&mut pack, RecvType);

        let sc = send_count.resolve(|| send.count())?;
        send.check_readable(send_type.elements::<T>(sc, 1)?);
        recv_counts.check_len(size, RecvCounts);
        recv_displs.check_len(size, RecvDispls);
        if !recv_counts.is_given() {
            let mut gathered = vec![0; size];
            self.check("MPI_Allgather", unsafe {
                ffi::MPI_Allgather(
                    &sc as *const i32 as *const c_void,
                    1,
                    datatype_of::<i32>().as_raw(),
                    gathered.as_mut_ptr() as *mut c_void,
                    1,
                    datatype_of::<i32>().as_raw(),
                    self.as_raw(),
                )
            })?;
            tracing::debug!(rank = self.rank(), "exchanged receive counts");
            recv_counts.fill(gathered);
        }
        let displs_given = recv_displs.is_given();
        if !displs_given {
            let displs = exclusive_prefix_sum(recv_counts.values())?;
            recv_displs.fill(displs);
        }
        recv.prepare(recv_type.elements_for_blocks::<T>(
            recv_counts.values(),
            recv_displs.values(),
            displs_given,
        )?);

        tracing::trace!(rank = self.rank(), send_count = sc, "MPI_Allgatherv");
        self.check("MPI_Allgatherv", unsafe {
            ffi::MPI_Allgatherv(
                send.send_ptr(),
                sc,
                send_type.raw(),
                recv.recv_ptr(),
                recv_counts.values().as_ptr(),
                recv_displs.values().as_ptr(),
                recv_type.raw(),
                self.as_raw(),
            )
        })?;

        let mut result = ResultBuilder::new();
        recv.finish(&mut result);
        send.finish(&mut result);
        send_count.finish(&mut result);
        recv_counts.finish(&mut result);
        recv_displs.finish(&mut result);
        send_type.finish(&mut result);
        recv_type.finish(&mut result);
        Ok(result.finish())
    }
}
