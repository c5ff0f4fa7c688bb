//! Results of non-blocking operations
//!
//! A non-blocking operation returns a [`NonBlockingResult`] which keeps the buffers of the
//! operation alive until it has completed and then hands out the outputs as an
//! [`MpiResult`]. A result is in one of three states:
//!
//! - `Pending`: the operation may still be in flight,
//! - `Consumed`: [`wait`](NonBlockingResult::wait) or a successful
//!   [`test`](NonBlockingResult::test) returned the outputs,
//! - `Extracted`: [`extract`](NonBlockingResult::extract) handed out the outputs and the request.
//!
//! Only one of these transitions can happen. Completion functions are only available if the
//! result owns its request; with a caller managed request the caller completes the request and
//! extracts the outputs afterwards.
//!
//! Dropping a pending result blocks until the operation has completed.

use std::mem;

use crate::buffer::DataBuffer;
use crate::datatype::Datatype;
use crate::error::{Error, Result};
use crate::parameter::Position;
use crate::request::Request;
use crate::result::{MpiResult, ResultBuilder};
use crate::status::Status;

/// Lifecycle of a [`NonBlockingResult`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    Pending,
    Consumed,
    Extracted,
}

pub(crate) enum RequestSlot<'a> {
    Owned(Request),
    Borrowed(&'a mut Request),
}

impl<'a> RequestSlot<'a> {
    pub(crate) fn from_parameter(request: Option<&'a mut Request>) -> Self {
        match request {
            Some(request) => RequestSlot::Borrowed(request),
            None => RequestSlot::Owned(Request::new()),
        }
    }

    pub(crate) fn request_mut(&mut self) -> &mut Request {
        match self {
            RequestSlot::Owned(request) => request,
            RequestSlot::Borrowed(request) => request,
        }
    }
}

/// The buffers of a pending operation.
pub(crate) struct Payload<'a, T> {
    data: Vec<(Position, DataBuffer<'a, T>)>,
    counts: Vec<(Position, DataBuffer<'a, i32>)>,
    datatypes: Vec<(Position, DataBuffer<'a, Datatype>)>,
    status: Option<(Position, DataBuffer<'a, Status>)>,
}

impl<'a, T> Payload<'a, T> {
    pub(crate) fn new() -> Self {
        Payload {
            data: Vec::new(),
            counts: Vec::new(),
            datatypes: Vec::new(),
            status: None,
        }
    }

    pub(crate) fn data(&mut self, position: Position, buffer: DataBuffer<'a, T>) {
        self.data.push((position, buffer));
    }

    pub(crate) fn counts(&mut self, position: Position, buffer: DataBuffer<'a, i32>) {
        self.counts.push((position, buffer));
    }

    pub(crate) fn datatype(&mut self, position: Position, buffer: DataBuffer<'a, Datatype>) {
        self.datatypes.push((position, buffer));
    }

    pub(crate) fn status(&mut self, position: Position, buffer: DataBuffer<'a, Status>) {
        self.status = Some((position, buffer));
    }

    fn into_result(self, status: Option<Status>) -> MpiResult<T> {
        let mut builder = ResultBuilder::new();
        for (position, buffer) in self.data {
            builder.data(position, buffer);
        }
        for (position, buffer) in self.counts {
            builder.counts(position, buffer);
        }
        for (position, buffer) in self.datatypes {
            builder.datatype(position, buffer);
        }
        if let Some((position, mut buffer)) = self.status {
            if let Some(status) = status {
                buffer.set_first(status);
            }
            builder.status(position, buffer);
        }
        builder.finish()
    }
}

/// A pending operation together with its future outputs.
pub struct NonBlockingResult<'a, T> {
    request: RequestSlot<'a>,
    payload: Option<Payload<'a, T>>,
    state: State,
}

impl<'a, T> NonBlockingResult<'a, T> {
    pub(crate) fn new(request: RequestSlot<'a>, payload: Payload<'a, T>) -> Self {
        NonBlockingResult {
            request,
            payload: Some(payload),
            state: State::Pending,
        }
    }

    /// The current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Whether the result owns its request and can therefore be completed with `wait`/`test`.
    pub fn owns_request(&self) -> bool {
        matches!(self.request, RequestSlot::Owned(_))
    }

    fn check_completable(&self) -> Result<()> {
        if self.state != State::Pending {
            return Err(Error::NotPending);
        }
        if !self.owns_request() {
            return Err(Error::RequestNotOwned);
        }
        Ok(())
    }

    fn consume(&mut self, status: Status) -> MpiResult<T> {
        self.state = State::Consumed;
        match self.payload.take() {
            Some(payload) => payload.into_result(Some(status)),
            None => MpiResult::empty(),
        }
    }

    /// Blocks until the operation has completed and returns its outputs.
    ///
    /// Request-only operations return an empty result.
    pub fn wait(&mut self) -> Result<MpiResult<T>> {
        self.wait_with_status().map(|(result, _)| result)
    }

    /// Like [`wait`](NonBlockingResult::wait), also returning the status of the operation.
    pub fn wait_with_status(&mut self) -> Result<(MpiResult<T>, Status)> {
        self.check_completable()?;
        let status = self.request.request_mut().wait()?;
        Ok((self.consume(status), status))
    }

    /// Like [`wait`](NonBlockingResult::wait), writing the status of the operation to `status`.
    pub fn wait_into(&mut self, status: &mut Status) -> Result<MpiResult<T>> {
        let (result, completed) = self.wait_with_status()?;
        *status = completed;
        Ok(result)
    }

    /// Returns the outputs if the operation has completed, `None` otherwise.
    pub fn test(&mut self) -> Result<Option<MpiResult<T>>> {
        Ok(self.test_with_status()?.map(|(result, _)| result))
    }

    /// Like [`test`](NonBlockingResult::test), also returning the status of the operation.
    pub fn test_with_status(&mut self) -> Result<Option<(MpiResult<T>, Status)>> {
        self.check_completable()?;
        match self.request.request_mut().test()? {
            Some(status) => Ok(Some((self.consume(status), status))),
            None => Ok(None),
        }
    }

    /// Hands out the outputs and, if owned, the request without completing the operation.
    ///
    /// # Safety
    /// The operation may still read or write the returned buffers. They must not be accessed or
    /// dropped until the request (the returned one, or the caller managed one) has completed.
    pub unsafe fn extract(&mut self) -> Result<(MpiResult<T>, Option<Request>)> {
        if self.state != State::Pending {
            return Err(Error::NotPending);
        }
        self.state = State::Extracted;
        let request = match &mut self.request {
            RequestSlot::Owned(request) => Some(mem::take(request)),
            RequestSlot::Borrowed(_) => None,
        };
        let result = match self.payload.take() {
            Some(payload) => payload.into_result(None),
            None => MpiResult::empty(),
        };
        Ok((result, request))
    }
}

impl<'a, T> Drop for NonBlockingResult<'a, T> {
    fn drop(&mut self) {
        if self.state != State::Pending {
            return;
        }
        let request = self.request.request_mut();
        if request.is_null() {
            return;
        }
        tracing::warn!("non-blocking result dropped while pending, waiting for completion");
        if let Err(err) = request.wait() {
            tracing::warn!(%err, "waiting for a dropped non-blocking result failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::RoleClass;
    use crate::parameter::ParameterType;

    fn payload<'a>() -> Payload<'a, i32> {
        let mut payload = Payload::new();
        payload.data(
            Position::Default,
            DataBuffer::library_allocated(ParameterType::RecvBuf, RoleClass::Out),
        );
        payload
    }

    #[test]
    fn borrowed_request_cannot_be_waited_on() {
        let mut request = Request::new();
        let mut result = NonBlockingResult::new(RequestSlot::Borrowed(&mut request), payload());
        assert!(!result.owns_request());
        assert!(matches!(result.wait(), Err(Error::RequestNotOwned)));
        assert!(matches!(result.test(), Err(Error::RequestNotOwned)));
        assert_eq!(result.state(), State::Pending);

        let (mut outputs, owned) = unsafe { result.extract() }.unwrap();
        assert!(owned.is_none());
        assert_eq!(outputs.extract_recv_buffer(), Vec::<i32>::new());
        assert_eq!(result.state(), State::Extracted);
    }

    #[test]
    fn extraction_happens_once() {
        let mut result = NonBlockingResult::new(RequestSlot::Owned(Request::new()), payload());
        let (_, request) = unsafe { result.extract() }.unwrap();
        assert!(request.map_or(false, |request| request.is_null()));
        assert!(matches!(unsafe { result.extract() }, Err(Error::NotPending)));
        assert!(matches!(result.wait(), Err(Error::NotPending)));
        assert!(matches!(result.test(), Err(Error::NotPending)));
    }

    #[test]
    fn status_buffer_receives_completion_status() {
        let mut payload: Payload<'_, i32> = Payload::new();
        payload.status(
            Position::Argument(0),
            DataBuffer::library_allocated_single(
                ParameterType::Status,
                RoleClass::Out,
                Status::empty(),
            ),
        );
        let mut result = payload.into_result(Some(Status::empty()));
        assert_eq!(result.len(), 1);
        let _ = result.extract_status();
    }

    #[test]
    #[should_panic(expected = "is empty and cannot hold the value")]
    fn empty_status_buffer_fails_on_completion() {
        let mut statuses: [Status; 0] = [];
        let mut payload: Payload<'_, i32> = Payload::new();
        payload.status(
            Position::Argument(0),
            DataBuffer::new(
                ParameterType::Status,
                RoleClass::Out,
                crate::buffer::BufferStorage::borrowed_mut(&mut statuses),
            ),
        );
        let _ = payload.into_result(Some(Status::empty()));
    }
}
