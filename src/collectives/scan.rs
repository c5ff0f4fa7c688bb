use std::os::raw::c_void;

use super::reduce::{require_op, single_send_value};
use crate::adapter::{CountParam, DataParam, TypeParam};
use crate::assertion::AssertionLevel;
use crate::communicator::{Communicator, ErrorHook};
use crate::datatype::{datatype_of, Equivalence};
use crate::error::Result;
use crate::ffi;
use crate::kassert;
use crate::parameter::{IntoParameters, ParameterType};
use crate::result::{MpiResult, ResultBuilder};

/// Writes the result of an exclusive scan on rank 0: a single value fills every element,
/// otherwise the values are copied one to one.
fn fill_rank_0<T: Clone>(recv: &mut [T], values: &[T]) {
    match values {
        [value] => recv.iter_mut().for_each(|element| *element = value.clone()),
        _ => {
            kassert!(
                AssertionLevel::Light,
                values.len() == recv.len(),
                "values_on_rank_0 holds {} elements, expected 1 or {}",
                values.len(),
                recv.len()
            );
            recv.clone_from_slice(&values[..recv.len()]);
        }
    }
}

impl<H: ErrorHook> Communicator<H> {
    /// Inclusive prefix reduction: rank `i` receives the reduction of the send buffers of ranks
    /// `0..=i`.
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
    /// 5.11.1
    pub fn scan<'a, T>(&self, args: impl IntoParameters<'a, T>) -> Result<MpiResult<T>>
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
        tracing::trace!(rank = self.rank(), count = n, ?op, "MPI_Scan");
        self.check("MPI_Scan", unsafe {
            ffi::MPI_Scan(
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

    /// Inclusive prefix reduction of a single value per rank.
    ///
    /// # Standard section(s)
    ///
    /// 5.11.1
    pub fn scan_single<'a, T>(&self, args: impl IntoParameters<'a, T>) -> Result<T>
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
        tracing::trace!(rank = self.rank(), ?op, "MPI_Scan");
        self.check("MPI_Scan", unsafe {
            ffi::MPI_Scan(
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

    /// Exclusive prefix reduction: rank `i` receives the reduction of the send buffers of ranks
    /// `0..i`.
    ///
    /// The receive buffer of rank 0 is not written by MPI. If `values_on_rank_0` is passed, it
    /// is filled with these values (a single value is repeated for every element).
    ///
    /// Parameters:
    /// - `send_buf`: required.
    /// - `op`: required.
    /// - `recv_buf`: optional, library allocated otherwise.
    /// - `values_on_rank_0`: optional.
    /// - `send_recv_count`: optional, the size of the send buffer otherwise.
    /// - `send_recv_type`: optional, requires `send_recv_count`.
    ///
    /// # Standard section(s)
    ///
    /// 5.11.2
    pub fn exscan<'a, T>(&self, args: impl IntoParameters<'a, T>) -> Result<MpiResult<T>>
    where
        T: Equivalence + Default + Clone,
    {
        use ParameterType::*;
        let mut pack = args.into_parameters();
        pack.check_parameters(
            &[SendBuf, Op],
            &[RecvBuf, ValuesOnRank0, SendRecvCount, SendRecvType],
        )?;
        pack.check_dependency(SendRecvType, SendRecvCount)?;

        let op = require_op(&mut pack)?;
        let send = DataParam::require(&mut pack, SendBuf)?;
        let mut recv = DataParam::take_or_allocate(&mut pack, RecvBuf);
        let on_rank_0 = DataParam::take(&mut pack, ValuesOnRank0);
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
        tracing::trace!(rank = self.rank(), count = n, ?op, "MPI_Exscan");
        self.check("MPI_Exscan", unsafe {
            ffi::MPI_Exscan(
                send.send_ptr(),
                recv.recv_ptr(),
                n,
                datatype.raw(),
                handle.as_raw(),
                self.as_raw(),
            )
        })?;
        drop(handle);

        if self.rank() == 0 {
            if let Some(values) = &on_rank_0 {
                let len = elements.min(recv.size());
                fill_rank_0(
                    &mut recv.buffer.underlying_mut()[..len],
                    values.buffer.underlying(),
                );
            }
        }

        let mut result = ResultBuilder::new();
        recv.finish(&mut result);
        send.finish(&mut result);
        count.finish(&mut result);
        datatype.finish(&mut result);
        Ok(result.finish())
    }

    /// Exclusive prefix reduction of a single value per rank. Rank 0 receives the value passed
    /// as `values_on_rank_0`, or `T::default()`.
    ///
    /// # Standard section(s)
    ///
    /// 5.11.2
    pub fn exscan_single<'a, T>(&self, args: impl IntoParameters<'a, T>) -> Result<T>
    where
        T: Equivalence + Default + Clone,
    {
        use ParameterType::*;
        let mut pack = args.into_parameters();
        pack.check_parameters(&[SendBuf, Op], &[ValuesOnRank0])?;

        let op = require_op(&mut pack)?;
        let send = DataParam::require(&mut pack, SendBuf)?;
        let on_rank_0 = DataParam::take(&mut pack, ValuesOnRank0);
        let value = single_send_value(&send);
        let mut reduced = T::default();

        let handle = op.materialize()?;
        tracing::trace!(rank = self.rank(), ?op, "MPI_Exscan");
        self.check("MPI_Exscan", unsafe {
            ffi::MPI_Exscan(
                &value as *const T as *const c_void,
                &mut reduced as *mut T as *mut c_void,
                1,
                datatype_of::<T>().as_raw(),
                handle.as_raw(),
                self.as_raw(),
            )
        })?;
        if self.rank() == 0 {
            reduced = on_rank_0
                .and_then(|values| values.buffer.underlying().first().cloned())
                .unwrap_or_default();
        }
        Ok(reduced)
    }
}

#[cfg(test)]
mod tests {
    use super::fill_rank_0;

    #[test]
    fn single_value_fills_rank_0() {
        let mut recv = vec![0; 3];
        fill_rank_0(&mut recv, &[7]);
        assert_eq!(recv, vec![7, 7, 7]);
    }

    #[test]
    fn values_are_copied_to_rank_0() {
        let mut recv = vec![0; 3];
        fill_rank_0(&mut recv, &[1, 2, 3]);
        assert_eq!(recv, vec![1, 2, 3]);
    }

    #[test]
    #[should_panic(expected = "values_on_rank_0 holds 2 elements")]
    fn mismatching_values_on_rank_0() {
        let mut recv = vec![0; 3];
        fill_rank_0(&mut recv, &[1, 2]);
    }
}
