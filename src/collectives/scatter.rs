use std::os::raw::c_void;

use crate::adapter::{
    exclusive_prefix_sum, per_rank_count, CountParam, CountsParam, DataParam, TypeParam,
};
use crate::buffer::DataBuffer;
use crate::communicator::{Communicator, ErrorHook};
use crate::datatype::{datatype_of, Equivalence};
use crate::error::{Error, Result};
use crate::ffi;
use crate::parameter::{IntoParameters, ParameterPack, ParameterType, Position};
use crate::result::{MpiResult, ResultBuilder};

/// The send buffer, which only the root has to pass.
fn root_send_buf<'a, T>(
    pack: &mut ParameterPack<'a, T>,
    is_root: bool,
) -> Result<DataParam<'a, T>> {
    match DataParam::take(pack, ParameterType::SendBuf) {
        Some(send) => Ok(send),
        None if is_root => Err(Error::MissingParameter(ParameterType::SendBuf)),
        None => Ok(DataParam {
            position: Position::Default,
            buffer: DataBuffer::ignored(ParameterType::SendBuf),
        }),
    }
}

impl<H: ErrorHook> Communicator<H> {
    /// Distributes equally sized blocks of the root's send buffer to all ranks.
    ///
    /// Parameters:
    /// - `send_buf`: required on the root, its size must be a multiple of the communicator size.
    /// - `recv_buf`: optional, library allocated otherwise.
    /// - `root`: optional.
    /// - `send_count`: optional, the send buffer size divided by the communicator size otherwise.
    /// - `recv_count`: optional. If omitted, the root broadcasts its send count first.
    /// - `send_type` / `recv_type`: optional, require the matching count.
    ///
    /// # Standard section(s)
    ///
    /// 5.6
    pub fn scatter<'a, T>(&self, args: impl IntoParameters<'a, T>) -> Result<MpiResult<T>>
    where
        T: Equivalence + Default + Clone,
    {
        use ParameterType::*;
        let mut pack = args.into_parameters();
        pack.check_parameters(
            &[],
            &[SendBuf, RecvBuf, Root, SendCount, RecvCount, SendType, RecvType],
        )?;
        pack.check_dependency(SendType, SendCount)?;
        pack.check_dependency(RecvType, RecvCount)?;
        let root = self.root_of(&pack);
        let is_root = self.rank() == root;

        let send = root_send_buf(&mut pack, is_root)?;
        let mut recv = DataParam::take_or_allocate(&mut pack, RecvBuf);
        let mut send_count = CountParam::take(&mut pack, SendCount);
        let mut recv_count = CountParam::take(&mut pack, RecvCount);
        let send_type = TypeParam::take(&mut pack, SendType);
        let recv_type = TypeParam::take(&mut pack, RecvType);

        let sc = if is_root {
            let sc =
                send_count.resolve(|| per_rank_count(send.size(), self.size_usize(), SendBuf))?;
            send.check_readable(send_type.elements::<T>(sc, self.size_usize())?);
            sc
        } else {
            send_count.given().unwrap_or(0)
        };
        let rc = match recv_count.given() {
            Some(given) => given,
            None => {
                let mut count = sc;
                self.check("MPI_Bcast", unsafe {
                    ffi::MPI_Bcast(
                        &mut count as *mut i32 as *mut c_void,
                        1,
                        datatype_of::<i32>().as_raw(),
                        root,
                        self.as_raw(),
                    )
                })?;
                recv_count.set(count);
                count
            }
        };
        recv.prepare(recv_type.elements::<T>(rc, 1)?);

        tracing::trace!(rank = self.rank(), root, send_count = sc, recv_count = rc, "MPI_Scatter");
        self.check("MPI_Scatter", unsafe {
            ffi::MPI_Scatter(
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

    /// Distributes blocks of varying size of the root's send buffer to all ranks.
    ///
    /// Parameters:
    /// - `send_buf` and `send_counts`: required on the root.
    /// - `send_displs`: optional, the exclusive prefix sum of the send counts otherwise.
    /// - `recv_buf`: optional, library allocated otherwise.
    /// - `root`: optional.
    /// - `recv_count`: optional. If omitted, each rank receives its entry of the send counts
    ///   first.
    /// - `send_type`: optional, requires `send_counts`.
    /// - `recv_type`: optional, requires `recv_count`.
    ///
    /// # Standard section(s)
    ///
    /// 5.6
    pub fn scatterv<'a, T>(&self, args: impl IntoParameters<'a, T>) -> Result<MpiResult<T>>
    where
        T: Equivalence + Default + Clone,
    {
        use ParameterType::*;
        let mut pack = args.into_parameters();
        pack.check_parameters(
            &[],
            &[SendBuf, SendCounts, SendDispls, RecvBuf, Root, RecvCount, SendType, RecvType],
        )?;
        pack.check_dependency(SendType, SendCounts)?;
        pack.check_dependency(RecvType, RecvCount)?;
        let root = self.root_of(&pack);
        let is_root = self.rank() == root;
        let size = self.size_usize();

        let send = root_send_buf(&mut pack, is_root)?;
        let mut recv = DataParam::take_or_allocate(&mut pack, RecvBuf);
        let send_counts = CountsParam::take(&mut pack, SendCounts);
        let mut send_displs = CountsParam::take(&mut pack, SendDispls);
        let mut recv_count = CountParam::take(&mut pack, RecvCount);
        let send_type = TypeParam::take(&mut pack, SendType);
        let recv_type = TypeParam::take(&mut pack, RecvType);

        if is_root {
            if !send_counts.is_given() {
                return Err(Error::MissingParameter(SendCounts));
            }
            send_counts.check_len(size, SendCounts);
            send_displs.check_len(size, SendDispls);
        }
        let displs_given = send_displs.is_given();
        if !displs_given {
            let displs = if is_root {
                exclusive_prefix_sum(send_counts.values())?
            } else {
                Vec::new()
            };
            send_displs.fill(displs);
        }
        if is_root {
            send.check_readable(send_type.elements_for_blocks::<T>(
                send_counts.values(),
                send_displs.values(),
                displs_given,
            )?);
        }

        let rc = match recv_count.given() {
            Some(given) => given,
            None => {
                let mut count = 0;
                self.check("MPI_Scatter", unsafe {
                    ffi::MPI_Scatter(
                        send_counts.values().as_ptr() as *const c_void,
                        1,
                        datatype_of::<i32>().as_raw(),
                        &mut count as *mut i32 as *mut c_void,
                        1,
                        datatype_of::<i32>().as_raw(),
                        root,
                        self.as_raw(),
                    )
                })?;
                recv_count.set(count);
                count
            }
        };
        recv.prepare(recv_type.elements::<T>(rc, 1)?);

        tracing::trace!(rank = self.rank(), root, recv_count = rc, "MPI_Scatterv");
        self.check("MPI_Scatterv", unsafe {
            ffi::MPI_Scatterv(
                send.send_ptr(),
                send_counts.values().as_ptr(),
                send_displs.values().as_ptr(),
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
        send_counts.finish(&mut result);
        send_displs.finish(&mut result);
        recv_count.finish(&mut result);
        send_type.finish(&mut result);
        recv_type.finish(&mut result);
        Ok(result.finish())
    }
}
