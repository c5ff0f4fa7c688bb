use std::os::raw::c_void;

use crate::adapter::{CountParam, DataParam, TypeParam};
use crate::assertion::AssertionLevel;
use crate::communicator::{Communicator, ErrorHook};
use crate::datatype::{datatype_of, Equivalence};
use crate::error::{Error, Result};
use crate::ffi;
use crate::kassert;
use crate::operation::ReduceOperation;
use crate::parameter::{IntoParameters, ParameterPack, ParameterType};
use crate::result::{MpiResult, ResultBuilder};

pub(super) fn require_op<'a, T>(pack: &mut ParameterPack<'a, T>) -> Result<ReduceOperation<'a, T>> {
    pack.take_op().ok_or(Error::MissingParameter(ParameterType::Op))
}

/// The value of a single element send buffer.
pub(super) fn single_send_value<T: Clone>(send: &DataParam<'_, T>) -> T {
    kassert!(
        AssertionLevel::Light,
        send.size() == 1,
        "expected a single element send buffer, got {} elements",
        send.size()
    );
    send.buffer.underlying()[0].clone()
}

impl<H: ErrorHook> Communicator<H> {
    /// Reduces the send buffers of all ranks element-wise on the root.
    ///
    /// Parameters:
    /// - `send_buf`: required.
    /// - `op`: required, a [`BuiltinOp`](crate::operation::BuiltinOp) or a
    ///   [`ReduceOperation`](crate::operation::ReduceOperation).
    /// - `recv_buf`: optional, library allocated otherwise. Only written on the root.
    /// - `root`: optional.
    /// - `send_recv_count`: optional, the size of the send buffer otherwise.
    /// - `send_recv_type`: optional, requires `send_recv_count`.
    ///
    /// # Standard section(s)
    ///
    /// 5.9.1
    pub fn reduce<'a, T>(&self, args: impl IntoParameters<'a, T>) -> Result<MpiResult<T>>
    where
        T: Equivalence + Default + Clone,
    {
        use ParameterType::*;
        let mut pack = args.into_parameters();
        pack.check_parameters(
            &[SendBuf, Op],
            &[RecvBuf, Root, SendRecvCount, SendRecvType],
        )?;
        pack.check_dependency(SendRecvType, SendRecvCount)?;
        let root = self.root_of(&pack);
        let is_root = self.rank() == root;

        let op = require_op(&mut pack)?;
        let send = DataParam::require(&mut pack, SendBuf)?;
        let mut recv = DataParam::take_or_allocate(&mut pack, RecvBuf);
        let mut count = CountParam::take(&mut pack, SendRecvCount);
        let datatype = TypeParam::take(&mut pack, SendRecvType);

        let n = count.resolve(|| send.count())?;
        let elements = datatype.elements::<T>(n, 1)?;
        send.check_readable(elements);
        if !datatype.is_explicit() {
            self.assert_same_on_all_ranks(n, "send_recv_count")?;
        }
        if is_root {
            recv.prepare(elements);
        }

        let handle = op.materialize()?;
        tracing::trace!(rank = self.rank(), root, count = n, ?op, "MPI_Reduce");
        self.check("MPI_Reduce", unsafe {
            ffi::MPI_Reduce(
                send.send_ptr(),
                recv.recv_ptr(),
                n,
                datatype.raw(),
                handle.as_raw(),
                root,
                self.as_raw(),
            )
        })?;
        drop(handle);

        let mut result = ResultBuilder::new();
        recv.finish(&mut result);
        send.finish(&mut result);
        count.finish(&mut result);
        datatype.finish(&mut result);
        Ok(result.finish())
    }

    /// Reduces a single value per rank. Returns the reduction on the root and `None` elsewhere.
    ///
    /// Parameters:
    /// - `send_buf`: required, a single element.
    /// - `op`: required.
    /// - `root`: optional.
    ///
    /// # Standard section(s)
    ///
    /// 5.9.1
    pub fn reduce_single<'a, T>(&self, args: impl IntoParameters<'a, T>) -> Result<Option<T>>
    where
        T: Equivalence + Default + Clone,
    {
        use ParameterType::*;
        let mut pack = args.into_parameters();
        pack.check_parameters(&[SendBuf, Op], &[Root])?;
        let root = self.root_of(&pack);

        let op = require_op(&mut pack)?;
        let send = DataParam::require(&mut pack, SendBuf)?;
        let value = single_send_value(&send);
        let mut reduced = T::default();

        let handle = op.materialize()?;
        tracing::trace!(rank = self.rank(), root, ?op, "MPI_Reduce");
        self.check("MPI_Reduce", unsafe {
            ffi::MPI_Reduce(
                &value as *const T as *const c_void,
                &mut reduced as *mut T as *mut c_void,
                1,
                datatype_of::<T>().as_raw(),
                handle.as_raw(),
                root,
                self.as_raw(),
            )
        })?;
        Ok((self.rank() == root).then_some(reduced))
    }

    /// Reduces the send buffers of all ranks element-wise and distributes the result to all
    /// ranks.
    ///
    /// Parameters:
    /// - `send_buf`: required.
    /// - `op`: required.
    /// - `recv_buf`: optional, library allocated otherwise.
    /// - `send_recv_count`: optional, the size of the send buffer otherwise.
    /// - `send_recv_type`: optional, requires `send_recv_count`.
    ///
    /// # Standard section(s)
    ///
    /// 5.9.6
    pub fn allreduce<'a, T>(&self, args: impl IntoParameters<'a, T>) -> Result<MpiResult<T>>
    where
        T: Equivalence + Default + Clone,
    {
        use ParameterType::*;
        let mut pack = args.into_parameters();
        pack.check_parameters(&[SendBuf, Op], &[RecvBuf, SendRecvCount, SendRecvType])?;
        pack.check_dependency(SendRecvType, SendRecvCount)?;

        let op = require_op(&mut pack)?;
        let send = DataParam::require(&mut pack, SendBuf)?;
        let mut recv = DataParam::take_or_allocate(&mut pack, RecvBuf);
        let mut count = CountParam::take(&mut pack, SendRecvCount);
        let datatype = TypeParam::take(&mut pack, SendRecvType);

        let n = count.resolve(|| send.count())?;
        let elements = datatype.elements::<T>(n, 1)?;
        send.check_readable(elements);
        if !datatype.is_explicit() {
            self.assert_same_on_all_ranks(n, "send_recv_count")?;
        }
        recv.prepare(elements);

        let handle = op.materialize()?;
        tracing::trace!(rank = self.rank(), count = n, ?op, "MPI_Allreduce");
        self.check("MPI_Allreduce", unsafe {
            ffi::MPI_Allreduce(
                send.send_ptr(),
                recv.recv_ptr(),
                n,
                datatype.raw(),
                handle.as_raw(),
                self.as_raw(),
            )
        })?;
        drop(handle);

        let mut result = ResultBuilder::new();
        recv.finish(&mut result);
        send.finish(&mut result);
        count.finish(&mut result);
        datatype.finish(&mut result);
        Ok(result.finish())
    }

    /// Reduces a single value per rank and returns the reduction on every rank.
    ///
    /// Parameters:
    /// - `send_buf`: required, a single element.
    /// - `op`: required.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use kamping::prelude::*;
    ///
    /// let env = Environment::new(InitMode::InitFinalize).unwrap();
    /// let comm = env.world().unwrap();
    /// let sum = comm
    ///     .allreduce_single((send_buf(&comm.rank()), op(BuiltinOp::Sum)))
    ///     .unwrap();
    /// assert_eq!(sum, comm.size() * (comm.size() - 1) / 2);
    /// ```
    ///
    /// # Standard section(s)
    ///
    /// 5.9.6
    pub fn allreduce_single<'a, T>(&self, args: impl IntoParameters<'a, T>) -> Result<T>
    where
        T: Equivalence + Default + Clone,
    {
        use ParameterType::*;
        let mut pack = args.into_parameters();
        pack.check_parameters(&[SendBuf, Op], &[])?;

        let op = require_op(&mut pack)?;
        let send = DataParam::require(&mut pack, SendBuf)?;
        let value = single_send_value(&send);
        let mut reduced = T::default();

        let handle = op.materialize()?;
        tracing::trace!(rank = self.rank(), ?op, "MPI_Allreduce");
        self.check("MPI_Allreduce", unsafe {
            ffi::MPI_Allreduce(
                &value as *const T as *const c_void,
                &mut reduced as *mut T as *mut c_void,
                1,
                datatype_of::<T>().as_raw(),
                handle.as_raw(),
                self.as_raw(),
            )
        })?;
        Ok(reduced)
    }
}
