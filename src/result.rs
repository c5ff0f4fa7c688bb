//! Results of operations
//!
//! An operation returns an [`MpiResult`] holding every output the caller asked to get back by
//! value: the buffers allocated by the library and the owning buffers the operation wrote to.
//! Outputs written to caller storage by reference are not part of the result.
//!
//! The outputs are ordered by the position of their parameter at the call site. A receive buffer
//! allocated because the caller did not pass one comes first. Outputs can be taken out by role
//! ([`extract_recv_buffer`](MpiResult::extract_recv_buffer), ...) or all at once by position:
//!
//! ```no_run
//! # use kamping::prelude::*;
//! # let env = Environment::new(InitMode::InitFinalize).unwrap();
//! # let comm = env.world().unwrap();
//! let values = vec![comm.rank(); 2];
//! let (gathered, counts): (Vec<i32>, Vec<i32>) = comm
//!     .allgatherv((send_buf(&values), recv_counts_out()))
//!     .unwrap()
//!     .destructure();
//! ```

use std::any::{type_name, Any};
use std::fmt;

use crate::assertion::AssertionLevel;
use crate::buffer::DataBuffer;
use crate::datatype::Datatype;
use crate::kassert;
use crate::parameter::{ParameterType, Position};
use crate::status::Status;

/// One output of an operation.
#[derive(Debug, Clone)]
pub enum Output<T> {
    /// Element data
    Data(Vec<T>),
    /// Counts or displacements
    Counts(Vec<i32>),
    /// A single count
    Count(i32),
    Datatype(Datatype),
    Status(Status),
}

impl<T> Output<T> {
    fn kind(&self) -> &'static str {
        match self {
            Output::Data(_) => "data",
            Output::Counts(_) => "counts",
            Output::Count(_) => "count",
            Output::Datatype(_) => "datatype",
            Output::Status(_) => "status",
        }
    }
}

/// The outputs of one operation.
pub struct MpiResult<T> {
    entries: Vec<(ParameterType, Option<Output<T>>)>,
}

macro_rules! accessors {
    ($(
        $role:ident => $variant:ident($ty:ty), $extract:ident, $get:ident;
    )*) => {
        $(
        #[doc = concat!("Moves the `", stringify!($role), "` output out of the result.")]
        ///
        /// # Panics
        /// Panics if the result holds no such output or it has been extracted before.
        pub fn $extract(&mut self) -> $ty {
            match self.extract(ParameterType::$role) {
                Output::$variant(value) => value,
                other => mismatch(ParameterType::$role, other.kind()),
            }
        }

        #[doc = concat!("The `", stringify!($role), "` output, left in the result.")]
        ///
        /// # Panics
        /// Panics if the result holds no such output or it has been extracted before.
        pub fn $get(&self) -> &$ty {
            match self.get(ParameterType::$role) {
                Output::$variant(value) => value,
                other => mismatch(ParameterType::$role, other.kind()),
            }
        }
        )*
    };
}

fn mismatch(role: ParameterType, kind: &str) -> ! {
    panic!("output {:?} holds {} of an unexpected kind", role, kind)
}

impl<T> MpiResult<T> {
    /// A result without outputs.
    pub fn empty() -> Self {
        MpiResult {
            entries: Vec::new(),
        }
    }

    /// Number of outputs not yet extracted.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, output)| output.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The roles of the outputs in positional order.
    pub fn roles(&self) -> impl Iterator<Item = ParameterType> + '_ {
        self.entries.iter().map(|(role, _)| *role)
    }

    /// Whether the result holds a (not yet extracted) output for `role`.
    pub fn contains(&self, role: ParameterType) -> bool {
        self.entries
            .iter()
            .any(|(r, output)| *r == role && output.is_some())
    }

    fn slot(&self, role: ParameterType) -> usize {
        let index = self.entries.iter().position(|(r, _)| *r == role);
        match index {
            Some(index) => index,
            None => panic!("the result holds no {:?} output", role),
        }
    }

    /// Moves the output for `role` out of the result.
    ///
    /// # Panics
    /// Panics if the result holds no output for `role` or it has been extracted before.
    pub fn extract(&mut self, role: ParameterType) -> Output<T> {
        let index = self.slot(role);
        let output = self.entries[index].1.take();
        kassert!(
            AssertionLevel::Light,
            output.is_some(),
            "output {:?} has already been extracted",
            role
        );
        match output {
            Some(output) => output,
            None => panic!("output {:?} has already been extracted", role),
        }
    }

    /// The output for `role`, left in the result.
    ///
    /// # Panics
    /// Panics if the result holds no output for `role` or it has been extracted before.
    pub fn get(&self, role: ParameterType) -> &Output<T> {
        match &self.entries[self.slot(role)].1 {
            Some(output) => output,
            None => panic!("output {:?} has already been extracted", role),
        }
    }

    /// Moves the received data out of the result. For in-place operations this is the
    /// send/receive buffer.
    ///
    /// # Panics
    /// Panics if the result holds no received data or it has been extracted before.
    pub fn extract_recv_buffer(&mut self) -> Vec<T> {
        let role = self.recv_role();
        match self.extract(role) {
            Output::Data(values) => values,
            other => mismatch(role, other.kind()),
        }
    }

    /// The received data, left in the result.
    ///
    /// # Panics
    /// Panics if the result holds no received data or it has been extracted before.
    pub fn get_recv_buffer(&self) -> &Vec<T> {
        let role = self.recv_role();
        match self.get(role) {
            Output::Data(values) => values,
            other => mismatch(role, other.kind()),
        }
    }

    fn recv_role(&self) -> ParameterType {
        if self.entries.iter().any(|(r, _)| *r == ParameterType::RecvBuf) {
            ParameterType::RecvBuf
        } else {
            ParameterType::SendRecvBuf
        }
    }

    accessors! {
        SendBuf => Data(Vec<T>), extract_send_buffer, get_send_buffer;
        RecvCounts => Counts(Vec<i32>), extract_recv_counts, get_recv_counts;
        RecvDispls => Counts(Vec<i32>), extract_recv_displs, get_recv_displs;
        SendCounts => Counts(Vec<i32>), extract_send_counts, get_send_counts;
        SendDispls => Counts(Vec<i32>), extract_send_displs, get_send_displs;
        RecvCount => Count(i32), extract_recv_count, get_recv_count;
        SendCount => Count(i32), extract_send_count, get_send_count;
        SendRecvCount => Count(i32), extract_send_recv_count, get_send_recv_count;
        SendType => Datatype(Datatype), extract_send_type, get_send_type;
        RecvType => Datatype(Datatype), extract_recv_type, get_recv_type;
        SendRecvType => Datatype(Datatype), extract_send_recv_type, get_send_recv_type;
        Status => Status(Status), extract_status, get_status;
    }

    /// Moves all remaining outputs out, binding them by position.
    ///
    /// # Panics
    /// Panics if the number of outputs or the type at some position does not match `D`.
    pub fn destructure<D: Destructure<T>>(self) -> D {
        D::destructure(self.into_outputs())
    }

    /// The single output of the result.
    ///
    /// # Panics
    /// Panics unless exactly one output remains and it has type `V`.
    pub fn into_value<V: FromOutput<T>>(self) -> V {
        let (value,) = self.destructure::<(V,)>();
        value
    }

    fn into_outputs(self) -> Vec<Output<T>> {
        self.entries
            .into_iter()
            .filter_map(|(_, output)| output)
            .collect()
    }
}

impl<T: fmt::Debug> fmt::Debug for MpiResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(role, output)| (role, output)))
            .finish()
    }
}

/// Collects the outputs of an operation and orders them by position.
pub(crate) struct ResultBuilder<T> {
    outputs: Vec<(Position, ParameterType, Output<T>)>,
}

impl<T> ResultBuilder<T> {
    pub(crate) fn new() -> Self {
        ResultBuilder {
            outputs: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, position: Position, role: ParameterType, output: Output<T>) {
        self.outputs.push((position, role, output));
    }

    /// Adds the buffer if the caller gets it back by value.
    pub(crate) fn data(&mut self, position: Position, mut buffer: DataBuffer<'_, T>) {
        if buffer.is_output() {
            let role = buffer.role();
            self.push(position, role, Output::Data(buffer.extract()));
        }
    }

    pub(crate) fn counts(&mut self, position: Position, mut buffer: DataBuffer<'_, i32>) {
        if buffer.is_output() {
            let role = buffer.role();
            let output = if buffer.is_single_element() {
                Output::Count(buffer.extract_single())
            } else {
                Output::Counts(buffer.extract())
            };
            self.push(position, role, output);
        }
    }

    pub(crate) fn datatype(&mut self, position: Position, mut buffer: DataBuffer<'_, Datatype>) {
        if buffer.is_output() {
            let role = buffer.role();
            self.push(position, role, Output::Datatype(buffer.extract_single()));
        }
    }

    pub(crate) fn status(&mut self, position: Position, mut buffer: DataBuffer<'_, Status>) {
        if buffer.is_output() {
            self.push(
                position,
                ParameterType::Status,
                Output::Status(buffer.extract_single()),
            );
        }
    }

    pub(crate) fn finish(mut self) -> MpiResult<T> {
        // stable: outputs materialized by the operation keep their relative order
        self.outputs.sort_by_key(|(position, _, _)| *position);
        MpiResult {
            entries: self
                .outputs
                .into_iter()
                .map(|(_, role, output)| (role, Some(output)))
                .collect(),
        }
    }
}

/// Types one output can be bound to by [`MpiResult::destructure`].
pub trait FromOutput<T>: Sized {
    /// `None` if the output has a different type.
    fn from_output(output: Output<T>) -> Option<Self>;
}

fn downcast<V: 'static>(value: impl Any) -> Option<V> {
    let boxed: Box<dyn Any> = Box::new(value);
    boxed.downcast::<V>().ok().map(|value| *value)
}

impl<T: 'static, U: 'static> FromOutput<T> for Vec<U> {
    fn from_output(output: Output<T>) -> Option<Self> {
        match output {
            Output::Data(values) => downcast(values),
            Output::Counts(values) => downcast(values),
            _ => None,
        }
    }
}

impl<T> FromOutput<T> for i32 {
    fn from_output(output: Output<T>) -> Option<Self> {
        match output {
            Output::Count(count) => Some(count),
            _ => None,
        }
    }
}

impl<T> FromOutput<T> for Datatype {
    fn from_output(output: Output<T>) -> Option<Self> {
        match output {
            Output::Datatype(datatype) => Some(datatype),
            _ => None,
        }
    }
}

impl<T> FromOutput<T> for Status {
    fn from_output(output: Output<T>) -> Option<Self> {
        match output {
            Output::Status(status) => Some(status),
            _ => None,
        }
    }
}

/// Tuples the outputs of a result can be bound to.
pub trait Destructure<T>: Sized {
    fn destructure(outputs: Vec<Output<T>>) -> Self;
}

fn bind<T, V: FromOutput<T>>(position: usize, output: Output<T>) -> V {
    let kind = output.kind();
    match V::from_output(output) {
        Some(value) => value,
        None => panic!(
            "output {} holds {} and cannot be bound to {}",
            position,
            kind,
            type_name::<V>()
        ),
    }
}

impl<T> Destructure<T> for () {
    fn destructure(outputs: Vec<Output<T>>) -> Self {
        kassert!(
            AssertionLevel::Light,
            outputs.is_empty(),
            "the result holds {} outputs but none were expected",
            outputs.len()
        );
    }
}

macro_rules! destructure_tuple {
    ($count:expr; $($name:ident @ $idx:tt),+) => {
        impl<T, $($name: FromOutput<T>),+> Destructure<T> for ($($name,)+) {
            fn destructure(outputs: Vec<Output<T>>) -> Self {
                kassert!(
                    AssertionLevel::Light,
                    outputs.len() == $count,
                    "the result holds {} outputs but {} were expected",
                    outputs.len(),
                    $count
                );
                let mut outputs = outputs.into_iter();
                ($(
                    match outputs.next() {
                        Some(output) => bind::<T, $name>($idx, output),
                        None => panic!("the result holds no output {}", $idx),
                    },
                )+)
            }
        }
    };
}

destructure_tuple!(1; A @ 0);
destructure_tuple!(2; A @ 0, B @ 1);
destructure_tuple!(3; A @ 0, B @ 1, C @ 2);
destructure_tuple!(4; A @ 0, B @ 1, C @ 2, D @ 3);
destructure_tuple!(5; A @ 0, B @ 1, C @ 2, D @ 3, E @ 4);
destructure_tuple!(6; A @ 0, B @ 1, C @ 2, D @ 3, E @ 4, F @ 5);
destructure_tuple!(7; A @ 0, B @ 1, C @ 2, D @ 3, E @ 4, F @ 5, G @ 6);
destructure_tuple!(8; A @ 0, B @ 1, C @ 2, D @ 3, E @ 4, F @ 5, G @ 6, H @ 7);

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MpiResult<i32> {
        let mut builder = ResultBuilder::new();
        builder.push(
            Position::Argument(2),
            ParameterType::RecvDispls,
            Output::Counts(vec![0, 1]),
        );
        builder.push(
            Position::Argument(0),
            ParameterType::RecvCounts,
            Output::Counts(vec![1, 2]),
        );
        builder.push(
            Position::Default,
            ParameterType::RecvBuf,
            Output::Data(vec![7, 8, 8]),
        );
        builder.finish()
    }

    #[test]
    fn default_receive_buffer_comes_first() {
        let result = sample();
        assert_eq!(
            result.roles().collect::<Vec<_>>(),
            vec![
                ParameterType::RecvBuf,
                ParameterType::RecvCounts,
                ParameterType::RecvDispls
            ]
        );
    }

    #[test]
    fn caller_supplied_receive_buffer_keeps_its_position() {
        let mut builder: ResultBuilder<i32> = ResultBuilder::new();
        builder.push(Position::Argument(1), ParameterType::RecvBuf, Output::Data(vec![1]));
        builder.push(Position::Argument(0), ParameterType::RecvCounts, Output::Counts(vec![1]));
        let (counts, values): (Vec<i32>, Vec<i32>) = builder.finish().destructure();
        assert_eq!(counts, vec![1]);
        assert_eq!(values, vec![1]);
    }

    #[test]
    fn destructuring_binds_in_order() {
        let (values, counts, displs): (Vec<i32>, Vec<i32>, Vec<i32>) = sample().destructure();
        assert_eq!(values, vec![7, 8, 8]);
        assert_eq!(counts, vec![1, 2]);
        assert_eq!(displs, vec![0, 1]);
    }

    #[test]
    fn named_accessors() {
        let mut result = sample();
        assert_eq!(result.get_recv_counts(), &vec![1, 2]);
        assert_eq!(result.extract_recv_displs(), vec![0, 1]);
        assert!(!result.contains(ParameterType::RecvDispls));
        assert_eq!(result.len(), 2);
        assert_eq!(result.extract_recv_buffer(), vec![7, 8, 8]);
        let counts: Vec<i32> = result.into_value();
        assert_eq!(counts, vec![1, 2]);
    }

    #[test]
    fn scalar_outputs() {
        let mut builder: ResultBuilder<f64> = ResultBuilder::new();
        builder.push(Position::Argument(0), ParameterType::SendCount, Output::Count(4));
        builder.push(Position::Argument(1), ParameterType::Status, Output::Status(Status::empty()));
        let mut result = builder.finish();
        assert_eq!(*result.get_send_count(), 4);
        let _status = result.extract_status();
        assert_eq!(result.into_value::<i32>(), 4);
    }

    #[test]
    fn in_place_buffer_acts_as_receive_buffer() {
        let mut builder: ResultBuilder<u8> = ResultBuilder::new();
        builder.push(Position::Argument(0), ParameterType::SendRecvBuf, Output::Data(vec![3]));
        assert_eq!(builder.finish().extract_recv_buffer(), vec![3]);
    }

    #[test]
    #[should_panic(expected = "already been extracted")]
    fn second_extraction_fails() {
        let mut result = sample();
        let _ = result.extract_recv_buffer();
        let _ = result.extract_recv_buffer();
    }

    #[test]
    #[should_panic(expected = "were expected")]
    fn arity_mismatch_fails() {
        let _: (Vec<i32>, Vec<i32>) = sample().destructure();
    }

    #[test]
    #[should_panic(expected = "cannot be bound")]
    fn type_mismatch_fails() {
        let _: (Vec<u64>, Vec<i32>, Vec<i32>) = sample().destructure();
    }

    #[test]
    #[should_panic(expected = "holds no")]
    fn missing_output_fails() {
        let mut result = sample();
        let _ = result.extract_status();
    }
}
