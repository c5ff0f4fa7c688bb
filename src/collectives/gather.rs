use std::os::raw::c_void;

use crate::adapter::{exclusive_prefix_sum, CountParam, CountsParam, DataParam, TypeParam};
use crate::communicator::{Communicator, ErrorHook};
use crate::datatype::{datatype_of, Equivalence};
use crate::error::Result;
use crate::ffi;
use crate::parameter::{IntoParameters, ParameterType};
use crate::result::{MpiResult, ResultBuilder};

impl<H: ErrorHook> Communicator<H> {
    /// Gathers the send buffers of all ranks on the root.
    ///
    /// All ranks send the same number of elements. The receive buffer on the root holds the block
    /// of rank `i` at offset `i * recv_count`; on other ranks it is left untouched.
    ///
    /// Parameters:
    /// - `send_buf`: required.
    /// - `recv_buf`: optional, library allocated otherwise.
    /// - `root`: optional.
    /// - `send_count`: optional, the size of the send buffer otherwise.
    /// - `recv_count`: optional, equal to the send count otherwise.
    /// - `send_type` / `recv_type`: optional, require the matching count.
    ///
    /// # Standard section(s)
    ///
    /// 5.5
    pub fn gather<'a, T>(&self, args: impl IntoParameters<'a, T>) -> Result<MpiResult<T>>
    where
        T: Equivalence + Default + Clone,
    {
        use ParameterType::*;
        let mut pack = args.into_parameters();
        pack.check_parameters(
            &[SendBuf],
            &[RecvBuf, Root, SendCount, RecvCount, SendType, RecvType],
        )?;
        pack.check_dependency(SendType, SendCount)?;
        pack.check_dependency(RecvType, RecvCount)?;
        let root = self.root_of(&pack);
        let is_root = self.rank() == root;

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
        if is_root {
            recv.prepare(recv_type.elements::<T>(rc, self.size_usize())?);
        }

        tracing::trace!(rank = self.rank(), root, send_count = sc, recv_count = rc, "MPI_Gather");
        self.check("MPI_Gather", unsafe {
            ffi::MPI_Gather(
                send.send_ptr(),
                sc,
                send_type.raw(),
                recv.recv_ptr(),
                rc,
                recv_type.raw(),
                root,
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

    /// Gathers send buffers of varying size on the root.
    ///
    /// Parameters:
    /// - `send_buf`: required.
    /// - `recv_buf`: optional, library allocated otherwise.
    /// - `root`: optional.
    /// - `send_count`: optional, the size of the send buffer otherwise.
    /// - `recv_counts`: optional, gathered from the send counts otherwise. Pass it on all ranks
    ///   or on none.
    /// - `recv_displs`: optional, the exclusive prefix sum of the receive counts otherwise.
    /// - `send_type`: optional, requires `send_count`.
    /// - `recv_type`: optional, requires `recv_counts`.
    ///
    /// Only the root computes and reports receive counts and displacements.
    ///
    /// # Standard section(s)
    ///
    /// 5.5
    pub fn gatherv<'a, T>(&self, args: impl IntoParameters<'a, T>) -> Result<MpiResult<T>>
    where
        T: Equivalence + Default + Clone,
    {
        use ParameterType::*;
        let mut pack = args.into_parameters();
        pack.check_parameters(
            &[SendBuf],
            &[RecvBuf, Root, SendCount, RecvCounts, RecvDispls, SendType, RecvType],
        )?;
        pack.check_dependency(SendType, SendCount)?;
        pack.check_dependency(RecvType, RecvCounts)?;
        let root = self.root_of(&pack);
        let is_root = self.rank() == root;
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
        if is_root {
            recv_counts.check_len(size, RecvCounts);
            recv_displs.check_len(size, RecvDispls);
        }
        if !recv_counts.is_given() {
            let mut gathered = if is_root { vec![0; size] } else { Vec::new() };
            self.check("MPI_Gather", unsafe {
                ffi::MPI_Gather(
                    &sc as *const i32 as *const c_void,
                    1,
                    datatype_of::<i32>().as_raw(),
                    gathered.as_mut_ptr() as *mut c_void,
                    1,
                    datatype_of::<i32>().as_raw(),
                    root,
                    self.as_raw(),
                )
            })?;
            tracing::debug!(rank = self.rank(), root, "gathered receive counts");
            recv_counts.fill(gathered);
        }
        let displs_given = recv_displs.is_given();
        if !displs_given {
            let displs = if is_root {
                exclusive_prefix_sum(recv_counts.values())?
            } else {
                Vec::new()
            };
            recv_displs.fill(displs);
        }
        if is_root {
            recv.prepare(recv_type.elements_for_blocks::<T>(
                recv_counts.values(),
                recv_displs.values(),
                displs_given,
            )?);
        }

        tracing::trace!(rank = self.rank(), root, send_count = sc, "MPI_Gatherv");
        self.check("MPI_Gatherv", unsafe {
            ffi::MPI_Gatherv(
                send.send_ptr(),
                sc,
                send_type.raw(),
                recv.recv_ptr(),
                recv_counts.values().as_ptr(),
                recv_displs.values().as_ptr(),
                recv_type.raw(),
                root,
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
