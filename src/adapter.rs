//! Building blocks shared by the operations: count, counts and datatype parameters that are
//! either given by the caller or derived by the operation, and the arithmetic on counts.

use std::mem;
use std::os::raw::{c_int, c_void};
use std::ptr;

use crate::assertion::AssertionLevel;
use crate::buffer::{DataBuffer, RoleClass};
use crate::cast::{asserting_cast, throwing_cast};
use crate::communicator::{Communicator, ErrorHook};
use crate::datatype::{datatype_of, Datatype, Equivalence};
use crate::error::{Error, Result};
use crate::ffi;
use crate::kassert;
use crate::nonblocking::Payload;
use crate::parameter::{ParameterPack, ParameterType, Position};
use crate::result::ResultBuilder;

/// A data buffer with its call-site position.
pub(crate) struct DataParam<'a, T> {
    pub(crate) position: Position,
    pub(crate) buffer: DataBuffer<'a, T>,
}

impl<'a, T> DataParam<'a, T> {
    /// The caller's buffer for `role`.
    pub(crate) fn take(pack: &mut ParameterPack<'a, T>, role: ParameterType) -> Option<Self> {
        pack.take_buffer(role)
            .map(|(position, buffer)| DataParam { position, buffer })
    }

    /// The caller's buffer for a required `role`.
    pub(crate) fn require(pack: &mut ParameterPack<'a, T>, role: ParameterType) -> Result<Self> {
        DataParam::take(pack, role).ok_or(Error::MissingParameter(role))
    }

    /// The caller's buffer for `role`, or a library allocated output.
    pub(crate) fn take_or_allocate(pack: &mut ParameterPack<'a, T>, role: ParameterType) -> Self {
        DataParam::take(pack, role).unwrap_or_else(|| DataParam {
            position: Position::Default,
            buffer: DataBuffer::library_allocated(role, RoleClass::Out),
        })
    }

    pub(crate) fn size(&self) -> usize {
        self.buffer.size()
    }

    /// Number of elements as expected by MPI.
    pub(crate) fn count(&self) -> Result<c_int> {
        throwing_cast(self.buffer.size())
    }

    pub(crate) fn send_ptr(&self) -> *const c_void {
        if self.buffer.is_ignored() {
            ptr::null()
        } else {
            self.buffer.data() as *const c_void
        }
    }

    /// Requires the buffer to hold the `required` elements the operation reads from it.
    pub(crate) fn check_readable(&self, required: usize) {
        if !self.buffer.is_ignored() {
            kassert!(
                AssertionLevel::Light,
                self.size() >= required,
                "{:?} holds {} elements but the operation reads {}",
                self.buffer.role(),
                self.size(),
                required
            );
        }
    }

    pub(crate) fn recv_ptr(&mut self) -> *mut c_void {
        if self.buffer.is_ignored() {
            ptr::null_mut()
        } else {
            self.buffer.data_mut() as *mut c_void
        }
    }

    pub(crate) fn finish(self, builder: &mut ResultBuilder<T>) {
        builder.data(self.position, self.buffer);
    }

    /// Hands the buffer to a pending operation.
    pub(crate) fn defer(self, payload: &mut Payload<'a, T>) {
        payload.data(self.position, self.buffer);
    }
}

impl<'a, T: Default + Clone> DataParam<'a, T> {
    /// Resizes under the resize policy and requires `required` elements afterwards.
    pub(crate) fn prepare(&mut self, required: usize) {
        if !self.buffer.is_ignored() {
            self.buffer.prepare(required);
        }
    }
}

/// A single count: given by the caller, requested as output, or not involved.
pub(crate) struct CountParam<'a> {
    slot: Option<(Position, DataBuffer<'a, i32>)>,
    given: Option<i32>,
}

impl<'a> CountParam<'a> {
    pub(crate) fn take<T>(pack: &mut ParameterPack<'a, T>, role: ParameterType) -> Self {
        let slot = pack.take_counts(role);
        let given = slot
            .as_ref()
            .filter(|(_, buffer)| buffer.role_class() == RoleClass::In)
            .and_then(|(_, buffer)| buffer.first());
        CountParam { slot, given }
    }

    /// The count passed by the caller.
    pub(crate) fn given(&self) -> Option<i32> {
        self.given
    }

    /// The given count, or the computed one which is then reported to an output parameter.
    pub(crate) fn resolve(&mut self, compute: impl FnOnce() -> Result<i32>) -> Result<i32> {
        if let Some(count) = self.given {
            return Ok(count);
        }
        let count = compute()?;
        self.set(count);
        Ok(count)
    }

    /// Reports `count` to an output parameter.
    pub(crate) fn set(&mut self, count: i32) {
        if let Some((_, buffer)) = &mut self.slot {
            if buffer.role_class() == RoleClass::Out {
                buffer.set_first(count);
            }
        }
    }

    pub(crate) fn finish<T>(self, builder: &mut ResultBuilder<T>) {
        if let Some((position, buffer)) = self.slot {
            builder.counts(position, buffer);
        }
    }

    pub(crate) fn defer<T>(self, payload: &mut Payload<'a, T>) {
        if let Some((position, buffer)) = self.slot {
            payload.counts(position, buffer);
        }
    }
}

/// Counts or displacements, one per rank.
pub(crate) struct CountsParam<'a> {
    slot: Option<(Position, DataBuffer<'a, i32>)>,
    computed: Vec<i32>,
}

impl<'a> CountsParam<'a> {
    pub(crate) fn take<T>(pack: &mut ParameterPack<'a, T>, role: ParameterType) -> Self {
        CountsParam {
            slot: pack.take_counts(role),
            computed: Vec::new(),
        }
    }

    /// The values passed by the caller.
    pub(crate) fn given(&self) -> Option<&[i32]> {
        match &self.slot {
            Some((_, buffer)) if buffer.role_class() == RoleClass::In => Some(buffer.underlying()),
            _ => None,
        }
    }

    pub(crate) fn is_given(&self) -> bool {
        self.given().is_some()
    }

    /// Stores computed values, copying them to an output parameter.
    pub(crate) fn fill(&mut self, values: Vec<i32>) {
        if let Some((_, buffer)) = &mut self.slot {
            if buffer.role_class() == RoleClass::Out {
                buffer.prepare(values.len());
                buffer.underlying_mut()[..values.len()].copy_from_slice(&values);
            }
        }
        self.computed = values;
    }

    /// The given or the computed values.
    pub(crate) fn values(&self) -> &[i32] {
        match self.given() {
            Some(values) => values,
            None => &self.computed,
        }
    }

    /// Requires at least `len` values if the caller passed them.
    pub(crate) fn check_len(&self, len: usize, role: ParameterType) {
        if let Some(values) = self.given() {
            kassert!(
                AssertionLevel::Light,
                values.len() >= len,
                "{:?} holds {} values but the communicator has {} ranks",
                role,
                values.len(),
                len
            );
        }
    }

    pub(crate) fn finish<T>(self, builder: &mut ResultBuilder<T>) {
        if let Some((position, buffer)) = self.slot {
            builder.counts(position, buffer);
        }
    }
}

/// The datatype of one side of an operation.
pub(crate) struct TypeParam<'a> {
    slot: Option<(Position, DataBuffer<'a, Datatype>)>,
    datatype: Datatype,
    explicit: bool,
    role: ParameterType,
}

impl<'a> TypeParam<'a> {
    /// The caller's datatype, or the datatype of `T` reported to an output parameter.
    pub(crate) fn take<T: Equivalence>(
        pack: &mut ParameterPack<'a, T>,
        role: ParameterType,
    ) -> Self {
        let mut slot = pack.take_datatype(role);
        let given = slot
            .as_ref()
            .filter(|(_, buffer)| buffer.role_class() == RoleClass::In)
            .and_then(|(_, buffer)| buffer.first());
        match given {
            Some(datatype) => TypeParam {
                slot,
                datatype,
                explicit: true,
                role,
            },
            None => {
                let datatype = datatype_of::<T>();
                if let Some((_, buffer)) = &mut slot {
                    buffer.set_first(datatype);
                }
                TypeParam {
                    slot,
                    datatype,
                    explicit: false,
                    role,
                }
            }
        }
    }

    pub(crate) fn raw(&self) -> ffi::MPI_Datatype {
        self.datatype.as_raw()
    }

    pub(crate) fn datatype(&self) -> Datatype {
        self.datatype
    }

    /// Whether the caller passed the datatype.
    pub(crate) fn is_explicit(&self) -> bool {
        self.explicit
    }

    /// Number of `T` a buffer needs to hold `blocks` consecutive runs of `count` elements of
    /// this datatype.
    pub(crate) fn elements<T>(&self, count: c_int, blocks: usize) -> Result<usize> {
        let total = i64::from(count) * throwing_cast::<i64, _>(blocks)?;
        if !self.explicit {
            return throwing_cast(total.max(0));
        }
        let extent = self.datatype.extent()?;
        self.bytes_to_elements::<T>(extent.end_of(0, total))
    }

    /// Number of `T` a buffer needs to hold the blocks given by `counts` and `displs`, which
    /// are measured in elements of this datatype.
    pub(crate) fn elements_for_blocks<T>(
        &self,
        counts: &[i32],
        displs: &[i32],
        displs_given: bool,
    ) -> Result<usize> {
        if !self.explicit {
            return Ok(required_size(counts, displs, displs_given));
        }
        let extent = self.datatype.extent()?;
        let mut required = 0;
        for (count, displ) in counts.iter().zip(displs) {
            let end = extent.end_of(i64::from(*displ), i64::from(*count));
            required = required.max(self.bytes_to_elements::<T>(end)?);
        }
        Ok(required)
    }

    fn bytes_to_elements<T>(&self, end: Option<i64>) -> Result<usize> {
        let end = end.ok_or(Error::InvalidParameter {
            role: self.role,
            reason: "the datatype addresses memory outside of the buffer",
        })?;
        let element = throwing_cast::<i64, _>(mem::size_of::<T>().max(1))?;
        throwing_cast((end + element - 1) / element)
    }

    pub(crate) fn finish<T>(self, builder: &mut ResultBuilder<T>) {
        if let Some((position, buffer)) = self.slot {
            builder.datatype(position, buffer);
        }
    }

    pub(crate) fn defer<T>(self, payload: &mut Payload<'a, T>) {
        if let Some((position, buffer)) = self.slot {
            payload.datatype(position, buffer);
        }
    }
}

/// `[0, c0, c0 + c1, ...]`, failing if a displacement does not fit into an `i32`.
pub(crate) fn exclusive_prefix_sum(counts: &[i32]) -> Result<Vec<i32>> {
    let mut sum = 0i64;
    counts
        .iter()
        .map(|count| {
            let displacement = throwing_cast(sum);
            sum += i64::from(*count);
            displacement
        })
        .collect()
}

/// Number of elements a buffer needs to hold the blocks given by `counts` and `displs`.
///
/// Caller provided displacements may overlap or leave gaps, so every block is considered.
/// Computed displacements are increasing and the last block ends the buffer.
pub(crate) fn required_size(counts: &[i32], displs: &[i32], displs_given: bool) -> usize {
    let end = |(count, displ): (&i32, &i32)| i64::from(*count) + i64::from(*displ);
    let size = if displs_given {
        counts.iter().zip(displs).map(end).max().unwrap_or(0)
    } else {
        counts.iter().zip(displs).last().map_or(0, end)
    };
    asserting_cast(size.max(0))
}

/// Number of elements per rank in a buffer split evenly across `size` ranks.
pub(crate) fn per_rank_count(total: usize, size: usize, role: ParameterType) -> Result<c_int> {
    kassert!(
        AssertionLevel::Light,
        size > 0 && total % size == 0,
        "{:?} holds {} elements which cannot be split evenly across {} ranks",
        role,
        total,
        size
    );
    throwing_cast(total / size.max(1))
}

impl<H: ErrorHook> Communicator<H> {
    /// The root passed as parameter, or the default root.
    pub(crate) fn root_of<T>(&self, pack: &ParameterPack<'_, T>) -> i32 {
        let root = pack.rank(ParameterType::Root).unwrap_or_else(|| self.root());
        kassert!(
            AssertionLevel::Light,
            self.is_valid_rank(root),
            "root {} is not a rank of a communicator of size {}",
            root,
            self.size()
        );
        root
    }

    /// Requires `value` to be identical on all ranks. Communicates only if assertions at level
    /// `LightCommunication` are enabled.
    pub(crate) fn assert_same_on_all_ranks(&self, value: i32, what: &str) -> Result<()> {
        if !AssertionLevel::LightCommunication.is_enabled() {
            return Ok(());
        }
        let local = [i64::from(value), -i64::from(value)];
        let mut global = [0i64; 2];
        self.check("MPI_Allreduce", unsafe {
            ffi::MPI_Allreduce(
                local.as_ptr() as *const c_void,
                global.as_mut_ptr() as *mut c_void,
                2,
                datatype_of::<i64>().as_raw(),
                ffi::KAMPING_MAX,
                self.as_raw(),
            )
        })?;
        kassert!(
            AssertionLevel::LightCommunication,
            global[0] == -global[1],
            "{} differs between ranks",
            what
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_sums() {
        assert_eq!(exclusive_prefix_sum(&[0, 1, 2, 3]).unwrap(), vec![0, 0, 1, 3]);
        assert_eq!(exclusive_prefix_sum(&[]).unwrap(), Vec::<i32>::new());
        assert_eq!(exclusive_prefix_sum(&[5]).unwrap(), vec![0]);
    }

    #[test]
    fn prefix_sum_overflow_is_a_range_error() {
        assert_eq!(
            exclusive_prefix_sum(&[i32::MAX, 1]).unwrap(),
            vec![0, i32::MAX]
        );
        assert!(matches!(
            exclusive_prefix_sum(&[i32::MAX, 1, 1]),
            Err(Error::Range { .. })
        ));
    }

    #[test]
    fn size_from_computed_displacements() {
        let counts = [0, 1, 2, 3];
        let displs = exclusive_prefix_sum(&counts).unwrap();
        assert_eq!(required_size(&counts, &displs, false), 6);
        assert_eq!(required_size(&[], &[], false), 0);
    }

    #[test]
    fn size_from_given_displacements_covers_every_block() {
        // the first block ends last
        let counts = [4, 1, 1];
        let displs = [10, 0, 2];
        assert_eq!(required_size(&counts, &displs, true), 14);
        assert_eq!(required_size(&counts, &displs, false), 3);
    }

    #[test]
    fn even_split() {
        assert_eq!(per_rank_count(12, 4, ParameterType::SendBuf).unwrap(), 3);
        assert_eq!(per_rank_count(0, 4, ParameterType::SendBuf).unwrap(), 0);
    }

    #[test]
    #[should_panic(expected = "cannot be split evenly")]
    fn uneven_split_fails() {
        let _ = per_rank_count(5, 2, ParameterType::SendBuf);
    }

    #[test]
    fn count_parameters() {
        let mut pack: ParameterPack<'_, u8> = ParameterPack::new();
        pack.push(crate::parameter::send_count(7));
        pack.push(crate::parameter::recv_count_out());
        let mut send = CountParam::take(&mut pack, ParameterType::SendCount);
        let mut recv = CountParam::take(&mut pack, ParameterType::RecvCount);
        assert_eq!(send.given(), Some(7));
        assert_eq!(send.resolve(|| Ok(1)).unwrap(), 7);
        assert_eq!(recv.given(), None);
        assert_eq!(recv.resolve(|| Ok(3)).unwrap(), 3);

        let mut builder = ResultBuilder::<u8>::new();
        send.finish(&mut builder);
        recv.finish(&mut builder);
        let mut result = builder.finish();
        assert_eq!(result.extract_recv_count(), 3);
        assert!(result.is_empty());
    }

    #[test]
    fn implicit_datatype_counts_elements_of_the_buffer_type() {
        let mut pack: ParameterPack<'_, u64> = ParameterPack::new();
        let recv_type = TypeParam::take(&mut pack, ParameterType::RecvType);
        assert!(!recv_type.is_explicit());
        assert_eq!(recv_type.elements::<u64>(3, 4).unwrap(), 12);
        assert_eq!(recv_type.elements::<u64>(0, 4).unwrap(), 0);
        assert_eq!(
            recv_type
                .elements_for_blocks::<u64>(&[4, 1], &[2, 0], true)
                .unwrap(),
            6
        );
    }

    #[test]
    #[should_panic(expected = "the operation reads 4")]
    fn short_send_buffer_fails() {
        let values = vec![1, 2, 3];
        let mut pack: ParameterPack<'_, i32> = ParameterPack::new();
        pack.push(crate::parameter::send_buf(&values));
        let send = DataParam::require(&mut pack, ParameterType::SendBuf).unwrap();
        send.check_readable(3);
        send.check_readable(4);
    }

    #[test]
    fn counts_parameters() {
        let given = vec![1, 2];
        let mut pack: ParameterPack<'_, u8> = ParameterPack::new();
        pack.push(crate::parameter::recv_counts(&given));
        pack.push(crate::parameter::recv_displs_out());
        let counts = CountsParam::take(&mut pack, ParameterType::RecvCounts);
        let mut displs = CountsParam::take(&mut pack, ParameterType::RecvDispls);
        assert_eq!(counts.values(), &[1, 2]);
        assert!(!displs.is_given());
        displs.fill(exclusive_prefix_sum(counts.values()).unwrap());
        assert_eq!(displs.values(), &[0, 1]);

        let mut builder = ResultBuilder::<u8>::new();
        counts.finish(&mut builder);
        displs.finish(&mut builder);
        assert_eq!(builder.finish().into_value::<Vec<i32>>(), vec![0, 1]);
    }
}
