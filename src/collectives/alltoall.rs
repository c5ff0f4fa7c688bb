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
    /// Sends the `i`-th block of the send buffer to rank `i` and receives the block of every
    /// rank, all blocks being of equal size.
    ///
    /// Parameters:
    /// - `send_buf`: required, its size must be a multiple of the communicator size.
    /// - `recv_buf`: optional, library allocated otherwise.
    /// - `send_count`: optional, the send buffer size divided by the communicator size otherwise.
    /// - `recv_count`: optional, equal to the send count otherwise.
    /// - `send_type` / `recv_type`: optional, require the matching count.
    ///
    /// # Standard section(s)
    ///
    /// 5.8
    pub fn alltoall<'a, T>(&self, args: impl IntoParameters<'a, T>) -> Result<MpiResult<T>>
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
        let size = self.size_usize();

        let send = DataParam::require(&mut pack, SendBuf)?;
        let mut recv = DataParam::take_or_allocate(&mut pack, RecvBuf);
        let mut send_count = CountParam::take(&mut pack, SendCount);
        let mut recv_count = CountParam::take(&mut pack, RecvCount);
        let send_type = TypeParam::take(&mut pack, SendType);
        let recv_type = TypeParam::take(&mut pack, RecvType);

        let sc = send_count.resolve(|| per_rank_count(send.size(), size, SendBuf))?;
        send.check_readable(send_type.elements::<T>(sc, size)?);
        if !send_type.is_explicit() {
            self.assert_same_on_all_ranks(sc, "send_count")?;
        }
        let rc = recv_count.resolve(|| Ok(sc))?;
        recv.prepare(recv_type.elements::<T>(rc, size)?);

        tracing::trace!(rank = self.rank(), send_count = sc, recv_count = rc, "MPI_Alltoall");
        self.check("MPI_Alltoall", unsafe {
            ffi::MPI_Alltoall(
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

    /// Personalized exchange of blocks of varying size.
    ///
    /// Parameters:
    /// - `send_buf` and `send_counts`: required.
    /// - `send_displs`: optional, the exclusive prefix sum of the send counts otherwise.
    /// - `recv_buf`: optional, library allocated otherwise.
    /// - `recv_counts`: optional, exchanged from the send counts otherwise.
    /// - `recv_displs`: optional, the exclusive prefix sum of the receive counts otherwise.
    /// - `send_type`: optional.
    /// - `recv_type`: optional, requires `recv_counts`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use kamping::prelude::*;
    ///
    /// let env = Environment::new(InitMode::InitFinalize).unwrap();
    /// let comm = env.world().unwrap();
    /// // rank `i` sends `j` copies of `i` to rank `j`
    /// let counts: Vec<i32> = (0..comm.size()).collect();
    /// let data: Vec<i32> = counts
    ///     .iter()
    ///     .flat_map(|&count| std::iter::repeat(comm.rank()).take(count as usize))
    ///     .collect();
    /// let received = comm
    ///     .alltoallv((send_buf(&data), send_counts(&counts)))
    ///     .unwrap()
    ///     .extract_recv_buffer();
    /// assert_eq!(received.len(), (comm.rank() * comm.size()) as usize);
    /// ```
    ///
    /// # Standard section(s)
    ///
    /// 5.8
    pub fn alltoallv<'a, T>(&self, args: impl IntoParameters<'a, T>) -> Result<MpiResult<T>>
    where
        T: Equivalence + Default + Clone,
    {
        use ParameterType::*;
        let mut pack = args.into_parameters();
        pack.check_parameters(
            &[SendBuf, SendCounts],
            &[SendDispls, RecvBuf, RecvCounts, RecvDispls, SendType, RecvType],
        )?;
        pack.check_dependency(RecvType, RecvCounts)?;
        let size = self.size_usize();

        let send = DataParam::require(&mut pack, SendBuf)?;
        let mut recv = DataParam::take_or_allocate(&mut pack, RecvBuf);
        let send_counts = CountsParam::take(&mut pack, SendCounts);
        let mut send_displs = CountsParam::take(&mut pack, SendDispls);
        let mut recv_counts = CountsParam::take(&mut pack, RecvCounts);
        let mut recv_displs = CountsParam::take(&mut pack, RecvDispls);
        let send_type = TypeParam::take(&mut pack, SendType);
        let recv_type = TypeParam::take(&mut pack, RecvType);

        send_counts.check_len(size, SendCounts);
        send_displs.check_len(size, SendDispls);
        recv_counts.check_len(size, RecvCounts);
        recv_displs.check_len(size, RecvDispls);

        let send_displs_given = send_displs.is_given();
        if !send_displs_given {
            let displs = exclusive_prefix_sum(send_counts.values())?;
            send_displs.fill(displs);
        }
        send.check_readable(send_type.elements_for_blocks::<T>(
            send_counts.values(),
            send_displs.values(),
            send_displs_given,
        )?);

        if !recv_counts.is_given() {
            let mut exchanged = vec![0; size];
            self.check("MPI_Alltoall", unsafe {
                ffi::MPI_Alltoall(
                    send_counts.values().as_ptr() as *const c_void,
                    1,
                    datatype_of::<i32>().as_raw(),
                    exchanged.as_mut_ptr() as *mut c_void,
                    1,
                    datatype_of::<i32>().as_raw(),
                    self.as_raw(),
                )
            })?;
            tracing::debug!(rank = self.rank(), "exchanged receive counts");
            recv_counts.fill(exchanged);
        }
        let recv_displs_given = recv_displs.is_given();
        if !recv_displs_given {
            let displs = exclusive_prefix_sum(recv_counts.values())?;
            recv_displs.fill(displs);
        }
        recv.prepare(recv_type.elements_for_blocks::<T>(
            recv_counts.values(),
            recv_displs.values(),
            recv_displs_given,
        )?);

        tracing::trace!(rank = self.rank(), "MPI_Alltoallv");
        self.check("MPI_Alltoallv", unsafe {
            ffi::MPI_Alltoallv(
                send.send_ptr(),
                send_counts.values().as_ptr(),
                send_displs.values().as_ptr(),
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
        send_counts.finish(&mut result);
        send_displs.finish(&mut result);
        recv_counts.finish(&mut result);
        recv_displs.finish(&mut result);
        send_type.finish(&mut result);
        recv_type.finish(&mut result);
        Ok(result.finish())
    }
}
