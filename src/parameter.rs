//! Named parameters
//!
//! Every operation takes its arguments as a set of [`Parameter`]s, each naming the role it fills
//! ([`ParameterType`]). Parameters can be listed in any order, as a single parameter, a tuple or a
//! `Vec`:
//!
//! ```no_run
//! use kamping::prelude::*;
//!
//! let env = Environment::new(InitMode::InitFinalize).unwrap();
//! let comm = env.world().unwrap();
//! let values = vec![comm.rank(); 2];
//! let mut counts = Vec::new();
//! let result = comm
//!     .allgatherv((recv_counts_out_into(&mut counts).resize_to_fit(), send_buf(&values)))
//!     .unwrap();
//! let gathered: Vec<i32> = result.into_value();
//! ```
//!
//! Each operation validates the roles it was given against the roles it requires and accepts
//! before any communication takes place; see [`ParameterPack::check_parameters`].

use std::fmt;

use smallvec::SmallVec;

use crate::assertion::AssertionLevel;
use crate::buffer::{DataBuffer, ResizePolicy};
use crate::datatype::Datatype;
use crate::error::{Error, Result};
use crate::kassert;
use crate::operation::ReduceOperation;
use crate::request::Request;
use crate::status::Status;

mod factories;

pub use self::factories::*;

/// The slot a parameter fills.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParameterType {
    SendBuf,
    RecvBuf,
    SendRecvBuf,
    SendCounts,
    RecvCounts,
    SendDispls,
    RecvDispls,
    SendCount,
    RecvCount,
    SendRecvCount,
    Root,
    Destination,
    Source,
    Tag,
    SendRecvType,
    SendType,
    RecvType,
    Op,
    /// Result of an exclusive scan on rank 0
    ValuesOnRank0,
    Request,
    Status,
}

/// One argument of an operation.
pub enum Parameter<'a, T> {
    /// Element data: send, receive, send/receive buffers and values on rank 0
    Buffer(DataBuffer<'a, T>),
    /// Counts, displacements and single counts
    Counts(DataBuffer<'a, i32>),
    /// Explicit datatypes
    Datatype(DataBuffer<'a, Datatype>),
    /// Status of a receive
    Status(DataBuffer<'a, Status>),
    /// Root, destination and source ranks
    Rank(ParameterType, i32),
    Tag(i32),
    Op(ReduceOperation<'a, T>),
    /// A request managed by the caller
    Request(&'a mut Request),
}

impl<'a, T> Parameter<'a, T> {
    /// The role of this parameter.
    pub fn role(&self) -> ParameterType {
        match self {
            Parameter::Buffer(buffer) => buffer.role(),
            Parameter::Counts(buffer) => buffer.role(),
            Parameter::Datatype(buffer) => buffer.role(),
            Parameter::Status(buffer) => buffer.role(),
            Parameter::Rank(role, _) => *role,
            Parameter::Tag(_) => ParameterType::Tag,
            Parameter::Op(_) => ParameterType::Op,
            Parameter::Request(_) => ParameterType::Request,
        }
    }

    /// Lets the operation resize the buffer to exactly the size needed.
    ///
    /// # Panics
    /// Panics if the parameter is not a modifiable, resizable container.
    pub fn resize_to_fit(self) -> Self {
        self.with_resize_policy(ResizePolicy::ResizeToFit)
    }

    /// Lets the operation enlarge the buffer if it is too small.
    ///
    /// # Panics
    /// Panics if the parameter is not a modifiable, resizable container.
    pub fn grow_only(self) -> Self {
        self.with_resize_policy(ResizePolicy::GrowOnly)
    }

    /// Forbids resizing: the buffer must be large enough.
    pub fn no_resize(self) -> Self {
        self.with_resize_policy(ResizePolicy::NoResize)
    }

    fn with_resize_policy(self, policy: ResizePolicy) -> Self {
        match self {
            Parameter::Buffer(buffer) => Parameter::Buffer(buffer.with_resize_policy(policy)),
            Parameter::Counts(buffer) => Parameter::Counts(buffer.with_resize_policy(policy)),
            Parameter::Datatype(buffer) => Parameter::Datatype(buffer.with_resize_policy(policy)),
            Parameter::Status(buffer) => Parameter::Status(buffer.with_resize_policy(policy)),
            other => {
                kassert!(
                    AssertionLevel::Light,
                    policy == ResizePolicy::NoResize,
                    "{:?} is not a buffer and cannot be resized",
                    other.role()
                );
                other
            }
        }
    }
}

impl<'a, T> fmt::Debug for Parameter<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Buffer(buffer) => fmt::Debug::fmt(buffer, f),
            Parameter::Counts(buffer) => fmt::Debug::fmt(buffer, f),
            Parameter::Datatype(buffer) => fmt::Debug::fmt(buffer, f),
            Parameter::Status(buffer) => fmt::Debug::fmt(buffer, f),
            Parameter::Rank(role, rank) => f.debug_tuple("Rank").field(role).field(rank).finish(),
            Parameter::Tag(tag) => f.debug_tuple("Tag").field(tag).finish(),
            Parameter::Op(op) => fmt::Debug::fmt(op, f),
            Parameter::Request(request) => fmt::Debug::fmt(request, f),
        }
    }
}

/// Where a buffer came from. Orders the outputs of an operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Position {
    /// Materialized by the operation because the caller did not pass it
    Default,
    /// Passed by the caller as the `n`th parameter
    Argument(usize),
}

/// The parameters of one call, in call-site order.
pub struct ParameterPack<'a, T> {
    entries: SmallVec<[Option<Parameter<'a, T>>; 8]>,
}

impl<'a, T> Default for ParameterPack<'a, T> {
    fn default() -> Self {
        ParameterPack {
            entries: SmallVec::new(),
        }
    }
}

impl<'a, T> ParameterPack<'a, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter.
    pub fn push(&mut self, parameter: Parameter<'a, T>) {
        self.entries.push(Some(parameter));
    }

    /// Number of parameters not yet taken by the operation.
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The roles in call-site order.
    pub fn roles(&self) -> impl Iterator<Item = ParameterType> + use<'_, 'a, T> {
        self.entries.iter().flatten().map(Parameter::role)
    }

    fn position(&self, role: ParameterType) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.as_ref().map(Parameter::role) == Some(role))
    }

    /// Whether a parameter with `role` was passed.
    pub fn has_parameter(&self, role: ParameterType) -> bool {
        self.position(role).is_some()
    }

    /// The first parameter with `role`.
    pub fn select_parameter(&self, role: ParameterType) -> Option<&Parameter<'a, T>> {
        self.position(role)
            .and_then(|index| self.entries[index].as_ref())
    }

    /// The first parameter with `role`, or `default` if there is none.
    pub fn select_parameter_or_default(
        &mut self,
        role: ParameterType,
        default: impl FnOnce() -> Parameter<'a, T>,
    ) -> (Position, Parameter<'a, T>) {
        match self.take(role) {
            Some(taken) => taken,
            None => (Position::Default, default()),
        }
    }

    /// Removes the first parameter with `role`.
    pub fn take(&mut self, role: ParameterType) -> Option<(Position, Parameter<'a, T>)> {
        let index = self.position(role)?;
        self.entries[index]
            .take()
            .map(|parameter| (Position::Argument(index), parameter))
    }

    /// Checks that every required role is present, that no role is present twice and that no
    /// role outside `required` and `optional` is present.
    pub fn check_parameters(
        &self,
        required: &[ParameterType],
        optional: &[ParameterType],
    ) -> Result<()> {
        let mut seen: SmallVec<[ParameterType; 8]> = SmallVec::new();
        for role in self.roles() {
            if seen.contains(&role) {
                return Err(Error::DuplicateParameter(role));
            }
            if !required.contains(&role) && !optional.contains(&role) {
                return Err(Error::UnexpectedParameter(role));
            }
            seen.push(role);
        }
        match required.iter().find(|role| !seen.contains(role)) {
            Some(missing) => Err(Error::MissingParameter(*missing)),
            None => Ok(()),
        }
    }

    /// Requires `dependent` to be accompanied by `dependency`, e.g. an explicit datatype by its
    /// count.
    pub(crate) fn check_dependency(
        &self,
        dependent: ParameterType,
        dependency: ParameterType,
    ) -> Result<()> {
        if self.has_parameter(dependent) && !self.has_parameter(dependency) {
            Err(Error::MissingParameter(dependency))
        } else {
            Ok(())
        }
    }

    pub(crate) fn take_buffer(
        &mut self,
        role: ParameterType,
    ) -> Option<(Position, DataBuffer<'a, T>)> {
        match self.take(role)? {
            (position, Parameter::Buffer(buffer)) => Some((position, buffer)),
            (position, other) => {
                self.entries[index_of(position)] = Some(other);
                None
            }
        }
    }

    pub(crate) fn take_counts(
        &mut self,
        role: ParameterType,
    ) -> Option<(Position, DataBuffer<'a, i32>)> {
        match self.take(role)? {
            (position, Parameter::Counts(buffer)) => Some((position, buffer)),
            (position, other) => {
                self.entries[index_of(position)] = Some(other);
                None
            }
        }
    }

    pub(crate) fn take_datatype(
        &mut self,
        role: ParameterType,
    ) -> Option<(Position, DataBuffer<'a, Datatype>)> {
        match self.take(role)? {
            (position, Parameter::Datatype(buffer)) => Some((position, buffer)),
            (position, other) => {
                self.entries[index_of(position)] = Some(other);
                None
            }
        }
    }

    pub(crate) fn take_status(&mut self) -> Option<(Position, DataBuffer<'a, Status>)> {
        match self.take(ParameterType::Status)? {
            (position, Parameter::Status(buffer)) => Some((position, buffer)),
            (position, other) => {
                self.entries[index_of(position)] = Some(other);
                None
            }
        }
    }

    pub(crate) fn rank(&self, role: ParameterType) -> Option<i32> {
        match self.select_parameter(role)? {
            Parameter::Rank(_, rank) => Some(*rank),
            _ => None,
        }
    }

    pub(crate) fn tag(&self) -> Option<i32> {
        match self.select_parameter(ParameterType::Tag)? {
            Parameter::Tag(tag) => Some(*tag),
            _ => None,
        }
    }

    pub(crate) fn take_op(&mut self) -> Option<ReduceOperation<'a, T>> {
        match self.take(ParameterType::Op)? {
            (_, Parameter::Op(op)) => Some(op),
            _ => None,
        }
    }

    pub(crate) fn take_request(&mut self) -> Option<&'a mut Request> {
        match self.take(ParameterType::Request)? {
            (_, Parameter::Request(request)) => Some(request),
            _ => None,
        }
    }
}

fn index_of(position: Position) -> usize {
    match position {
        Position::Argument(index) => index,
        Position::Default => 0,
    }
}

/// The argument forms accepted by operations.
pub trait IntoParameters<'a, T> {
    fn into_parameters(self) -> ParameterPack<'a, T>;
}

impl<'a, T> IntoParameters<'a, T> for () {
    fn into_parameters(self) -> ParameterPack<'a, T> {
        ParameterPack::new()
    }
}

impl<'a, T> IntoParameters<'a, T> for Parameter<'a, T> {
    fn into_parameters(self) -> ParameterPack<'a, T> {
        let mut pack = ParameterPack::new();
        pack.push(self);
        pack
    }
}

impl<'a, T> IntoParameters<'a, T> for Vec<Parameter<'a, T>> {
    fn into_parameters(self) -> ParameterPack<'a, T> {
        let mut pack = ParameterPack::new();
        for parameter in self {
            pack.push(parameter);
        }
        pack
    }
}

impl<'a, T> IntoParameters<'a, T> for ParameterPack<'a, T> {
    fn into_parameters(self) -> ParameterPack<'a, T> {
        self
    }
}

macro_rules! tuple_parameters {
    (@ty $name:ident, $lt:lifetime, $elem:ident) => { Parameter<$lt, $elem> };
    ($($name:ident),+) => {
        impl<'a, T> IntoParameters<'a, T> for ($(tuple_parameters!(@ty $name, 'a, T),)+) {
            #[allow(non_snake_case)]
            fn into_parameters(self) -> ParameterPack<'a, T> {
                let ($($name,)+) = self;
                let mut pack = ParameterPack::new();
                $(pack.push($name);)+
                pack
            }
        }
    };
}

tuple_parameters!(A);
tuple_parameters!(A, B);
tuple_parameters!(A, B, C);
tuple_parameters!(A, B, C, D);
tuple_parameters!(A, B, C, D, E);
tuple_parameters!(A, B, C, D, E, F);
tuple_parameters!(A, B, C, D, E, F, G);
tuple_parameters!(A, B, C, D, E, F, G, H);
tuple_parameters!(A, B, C, D, E, F, G, H, I);
tuple_parameters!(A, B, C, D, E, F, G, H, I, J);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{AllocationOrigin, Ownership};
    use ParameterType::*;

    fn make_pack<'a>(parameters: impl IntoParameters<'a, i32>) -> ParameterPack<'a, i32> {
        parameters.into_parameters()
    }

    #[test]
    fn roles_keep_call_site_order() {
        let values = vec![1, 2];
        let pack = make_pack((recv_counts_out(), send_buf(&values), root(1)));
        assert_eq!(pack.roles().collect::<Vec<_>>(), vec![RecvCounts, SendBuf, Root]);
        assert!(pack.has_parameter(SendBuf));
        assert!(!pack.has_parameter(RecvBuf));
        assert_eq!(pack.len(), 3);
    }

    #[test]
    fn selection_returns_first_occurrence() {
        let pack = make_pack(vec![tag(3), tag(4)]);
        match pack.select_parameter(Tag) {
            Some(Parameter::Tag(value)) => assert_eq!(*value, 3),
            other => panic!("unexpected selection {:?}", other),
        }
    }

    #[test]
    fn default_is_materialized_when_absent() {
        let mut pack = make_pack(());
        let (position, parameter) =
            pack.select_parameter_or_default(RecvBuf, recv_buf_out::<i32>);
        assert_eq!(position, Position::Default);
        assert_eq!(parameter.role(), RecvBuf);

        let mut values = vec![0; 2];
        let mut pack = make_pack((tag(1), recv_buf(&mut values)));
        let (position, _) = pack.select_parameter_or_default(RecvBuf, recv_buf_out::<i32>);
        assert_eq!(position, Position::Argument(1));
    }

    #[test]
    fn validation_reports_missing_duplicate_and_unexpected() {
        let values = vec![1];
        let required = [SendBuf];
        let optional = [RecvBuf, RecvCounts];

        assert!(make_pack(send_buf(&values))
            .check_parameters(&required, &optional)
            .is_ok());
        assert!(matches!(
            make_pack(recv_buf_out()).check_parameters(&required, &optional),
            Err(Error::MissingParameter(SendBuf))
        ));
        assert!(matches!(
            make_pack((send_buf(&values), send_buf(&values))).check_parameters(&required, &optional),
            Err(Error::DuplicateParameter(SendBuf))
        ));
        assert!(matches!(
            make_pack((send_buf(&values), root(0))).check_parameters(&required, &optional),
            Err(Error::UnexpectedParameter(Root))
        ));
    }

    #[test]
    fn counts_input_and_output_together_are_rejected() {
        let counts = vec![1, 1];
        let values = vec![1];
        let result = make_pack((send_buf(&values), recv_counts(&counts), recv_counts_out()))
            .check_parameters(&[SendBuf], &[RecvCounts]);
        assert!(matches!(result, Err(Error::DuplicateParameter(RecvCounts))));
    }

    #[test]
    fn datatype_requires_count() {
        let pack = make_pack(send_type(crate::datatype::Datatype::null()));
        assert!(matches!(
            pack.check_dependency(SendType, SendCount),
            Err(Error::MissingParameter(SendCount))
        ));
    }

    #[test]
    fn taking_removes_the_parameter() {
        let values = vec![4, 5];
        let mut pack = make_pack((root(2), send_buf(&values)));
        let (position, buffer) = pack.take_buffer(SendBuf).unwrap();
        assert_eq!(position, Position::Argument(1));
        assert_eq!(buffer.underlying(), &[4, 5]);
        assert!(!pack.has_parameter(SendBuf));
        assert_eq!(pack.rank(Root), Some(2));
        assert!(pack.take_counts(Root).is_none());
        assert!(pack.has_parameter(Root));
    }

    #[test]
    fn out_factories_allocate_in_the_library() {
        match recv_buf_out::<u8>() {
            Parameter::Buffer(buffer) => {
                assert_eq!(buffer.allocation(), AllocationOrigin::Library);
                assert_eq!(buffer.ownership(), Ownership::Owning);
                assert_eq!(buffer.resize_policy(), ResizePolicy::ResizeToFit);
            }
            other => panic!("unexpected parameter {:?}", other),
        }
        match send_count_out::<u8>() {
            Parameter::Counts(buffer) => {
                assert!(buffer.is_single_element());
                assert!(buffer.is_output());
            }
            other => panic!("unexpected parameter {:?}", other),
        }
    }

    #[test]
    fn fluent_resize_policies() {
        let mut values = Vec::<i32>::new();
        match recv_buf(&mut values).grow_only() {
            Parameter::Buffer(buffer) => assert_eq!(buffer.resize_policy(), ResizePolicy::GrowOnly),
            other => panic!("unexpected parameter {:?}", other),
        }
        let _ = root::<i32>(0).no_resize();
    }

    #[test]
    #[should_panic(expected = "constant buffer")]
    fn constant_buffers_cannot_resize() {
        let values = vec![1, 2];
        let _ = send_buf(&values).resize_to_fit();
    }

    #[test]
    #[should_panic(expected = "is not a buffer")]
    fn scalars_cannot_resize() {
        let _ = tag::<i32>(0).resize_to_fit();
    }
}
