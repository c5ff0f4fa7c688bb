use std::os::raw::c_void;

use crate::adapter::{CountParam, DataParam, TypeParam};
use crate::assertion::AssertionLevel;
use crate::buffer::{DataBuffer, RoleClass};
use crate::communicator::{Communicator, ErrorHook};
use crate::datatype::{datatype_of, Equivalence};
use crate::error::{Error, Result};
use crate::ffi;
use crate::kassert;
use crate::parameter::{IntoParameters, ParameterType, Position};
use crate::result::{MpiResult, ResultBuilder};

impl<H: ErrorHook> Communicator<H> {
    /// Broadcasts the send/receive buffer of the root to all processes.
    ///
    /// Parameters:
    /// - `send_recv_buf`: required on the root. Other ranks get a library allocated buffer if
    ///   they do not pass one.
    /// - `root`: optional, the default root of the communicator otherwise.
    /// - `send_recv_count`: optional. If omitted on all ranks, the root broadcasts the size of
    ///   its buffer first.
    /// - `send_recv_type`: optional, requires `send_recv_count`.
    ///
    /// # Standard section(s)
    ///
    /// 5.4
    pub fn bcast<'a, T>(&self, args: impl IntoParameters<'a, T>) -> Result<MpiResult<T>>
    where
        T: Equivalence + Default + Clone,
    {
        use ParameterType::*;
        let mut pack = args.into_parameters();
        pack.check_parameters(&[], &[SendRecvBuf, Root, SendRecvCount, SendRecvType])?;
        pack.check_dependency(SendRecvType, SendRecvCount)?;
        let root = self.root_of(&pack);
        let is_root = self.rank() == root;

        let mut buffer = match DataParam::take(&mut pack, SendRecvBuf) {
            Some(buffer) => buffer,
            None if is_root => return Err(Error::MissingParameter(SendRecvBuf)),
            None => DataParam::take_or_allocate(&mut pack, SendRecvBuf),
        };
        let mut send_recv_count = CountParam::take(&mut pack, SendRecvCount);
        let datatype = TypeParam::take(&mut pack, SendRecvType);

        let count = match send_recv_count.given() {
            Some(given) => {
                self.assert_same_on_all_ranks(given, "send_recv_count")?;
                given
            }
            None => {
                let mut size = if is_root { buffer.count()? } else { 0 };
                self.check("MPI_Bcast", unsafe {
                    ffi::MPI_Bcast(
                        &mut size as *mut i32 as *mut c_void,
                        1,
                        datatype_of::<i32>().as_raw(),
                        root,
                        self.as_raw(),
                    )
                })?;
                send_recv_count.set(size);
                size
            }
        };
        buffer.prepare(datatype.elements::<T>(count, 1)?);

        tracing::trace!(rank = self.rank(), root, count, "MPI_Bcast");
        self.check("MPI_Bcast", unsafe {
            ffi::MPI_Bcast(
                buffer.recv_ptr(),
                count,
                datatype.raw(),
                root,
                self.as_raw(),
            )
        })?;

        let mut result = ResultBuilder::new();
        buffer.finish(&mut result);
        send_recv_count.finish(&mut result);
        datatype.finish(&mut result);
        Ok(result.finish())
    }

    /// Broadcasts a single value from the root and returns it on every rank.
    ///
    /// Parameters:
    /// - `send_recv_buf`: the value, required on the root.
    /// - `root`: optional.
    ///
    /// # Standard section(s)
    ///
    /// 5.4
    pub fn bcast_single<'a, T>(&self, args: impl IntoParameters<'a, T>) -> Result<T>
    where
        T: Equivalence + Default + Clone,
    {
        use ParameterType::*;
        let mut pack = args.into_parameters();
        pack.check_parameters(&[], &[SendRecvBuf, Root])?;
        let root = self.root_of(&pack);
        let is_root = self.rank() == root;

        let mut buffer = match DataParam::take(&mut pack, SendRecvBuf) {
            Some(buffer) => buffer,
            None if is_root => return Err(Error::MissingParameter(SendRecvBuf)),
            None => DataParam {
                position: Position::Default,
                buffer: DataBuffer::library_allocated_single(
                    SendRecvBuf,
                    RoleClass::Out,
                    T::default(),
                ),
            },
        };
        kassert!(
            AssertionLevel::Light,
            buffer.size() == 1,
            "bcast_single broadcasts exactly one element, got {}",
            buffer.size()
        );

        tracing::trace!(rank = self.rank(), root, "MPI_Bcast");
        self.check("MPI_Bcast", unsafe {
            ffi::MPI_Bcast(
                buffer.recv_ptr(),
                1,
                datatype_of::<T>().as_raw(),
                root,
                self.as_raw(),
            )
        })?;
        Ok(buffer.buffer.underlying()[0].clone())
    }
}
