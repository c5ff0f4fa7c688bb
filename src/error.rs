//! Error handling
//!
//! Every wrapped MPI call checks its return code. A non-success code is routed through the
//! [`ErrorHook`](crate::communicator::ErrorHook) of the communicator the call was issued on, which
//! by default produces [`Error::Mpi`] carrying the name of the failed call, the raw code and the
//! error class.
//!
//! Misuse of the parameter system that can only be detected at run time (a missing or duplicate
//! parameter, an unknown role) is reported through the same `Error` type before any
//! communication takes place.

use std::os::raw::{c_char, c_int};

use thiserror::Error;

use crate::ffi;
use crate::operation::BuiltinOp;
use crate::parameter::ParameterType;

/// MPI_SUCCESS constant, cast as a c_int here for easier checking of MPI return values
pub const MPI_SUCCESS: c_int = ffi::MPI_SUCCESS as c_int;

macro_rules! build_error_kind {
    {
        $(#[$doc:meta])*
        pub enum $name:ident {
            $(
                 #[$err_doc:meta]
                 #[err($mpi_err:ident)]
                 $rust_err:ident,
            )*
        }
    } => {
        use crate::ffi::{
            $(
            $mpi_err,
            )*
        };

        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $(
            #[$err_doc]
            $rust_err,
            )*
        }

        impl $name {
            /// Map a raw MPI return code onto its error class.
            pub(crate) fn from_raw(err: c_int) -> Option<$name> {
                let mut err_class: c_int = 0;
                let res = unsafe { ffi::MPI_Error_class(err, &mut err_class) };
                if res != MPI_SUCCESS {
                    return None;
                }
                $(
                if err_class == $mpi_err as c_int {
                    return Some($name::$rust_err)
                }
                )*
                None
            }
        }
    }
}

build_error_kind! {
    /// Error classes of the MPI standard that the wrapped calls can report.
    pub enum ErrorKind {
        /// Invalid buffer pointer argument
        #[err(MPI_ERR_BUFFER)]
        Buffer,
        /// Invalid count argument
        #[err(MPI_ERR_COUNT)]
        Count,
        /// Invalid datatype argument
        #[err(MPI_ERR_TYPE)]
        Type,
        /// Invalid tag argument
        #[err(MPI_ERR_TAG)]
        Tag,
        /// Invalid communicator argument
        #[err(MPI_ERR_COMM)]
        Comm,
        /// Invalid rank argument
        #[err(MPI_ERR_RANK)]
        Rank,
        /// Invalid request argument
        #[err(MPI_ERR_REQUEST)]
        Request,
        /// Invalid root argument
        #[err(MPI_ERR_ROOT)]
        Root,
        /// Invalid group argument
        #[err(MPI_ERR_GROUP)]
        Group,
        /// Invalid operation argument
        #[err(MPI_ERR_OP)]
        Op,
        /// Invalid topology argument
        #[err(MPI_ERR_TOPOLOGY)]
        Topology,
        /// Invalid dimension argument
        #[err(MPI_ERR_DIMS)]
        Dims,
        /// Invalid argument of some other kind
        #[err(MPI_ERR_ARG)]
        Arg,
        /// Unknown error
        #[err(MPI_ERR_UNKNOWN)]
        Unknown,
        /// Message truncated on receive
        #[err(MPI_ERR_TRUNCATE)]
        Truncate,
        /// Known error not in this list
        #[err(MPI_ERR_OTHER)]
        Other,
        /// Internal MPI (implementation) error
        #[err(MPI_ERR_INTERN)]
        Intern,
        /// Error code is in status
        #[err(MPI_ERR_IN_STATUS)]
        InStatus,
        /// Pending request
        #[err(MPI_ERR_PENDING)]
        Pending,
        /// Invalid keyval argument
        #[err(MPI_ERR_KEYVAL)]
        Keyval,
        /// Memory is exhausted
        #[err(MPI_ERR_NO_MEM)]
        NoMem,
        /// Invalid info argument
        #[err(MPI_ERR_INFO)]
        Info,
        /// Error in spawning processes
        #[err(MPI_ERR_SPAWN)]
        Spawn,
        /// Invalid size argument
        #[err(MPI_ERR_SIZE)]
        Size,
    }
}

/// The error type of this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A wrapped MPI call returned a non-success code.
    #[error("{call} failed with code {code}: {message}")]
    Mpi {
        /// Name of the failed MPI function.
        call: &'static str,
        /// Raw return code.
        code: c_int,
        /// Error class of `code`, if it is one of the known classes.
        kind: Option<ErrorKind>,
        /// Description of `code` as reported by the MPI library.
        message: String,
    },
    /// A peer process failed during `call`.
    #[error("a process failure was detected during {call}")]
    ProcessFailed { call: &'static str },
    /// A peer process failed while `call` was pending (e.g. on a wildcard receive).
    #[error("a process failure is pending during {call}")]
    ProcessFailedPending { call: &'static str },
    /// The communicator used for `call` has been revoked.
    #[error("the communicator used for {call} has been revoked")]
    Revoked { call: &'static str },
    /// An integer did not fit into the type required by the MPI interface.
    #[error("value {value} does not fit into {target}")]
    Range { value: String, target: &'static str },
    /// A parameter required by the called operation is missing.
    #[error("missing required parameter {0:?}")]
    MissingParameter(ParameterType),
    /// A parameter role was passed more than once.
    #[error("parameter {0:?} was passed more than once")]
    DuplicateParameter(ParameterType),
    /// A parameter not accepted by the called operation was passed.
    #[error("parameter {0:?} is not accepted by this operation")]
    UnexpectedParameter(ParameterType),
    /// A parameter is present but cannot be used in the way requested.
    #[error("invalid parameter {role:?}: {reason}")]
    InvalidParameter { role: ParameterType, reason: &'static str },
    /// MPI was already initialized when the environment tried to initialize it.
    #[error("MPI has already been initialized")]
    AlreadyInitialized,
    /// MPI has not been initialized.
    #[error("MPI has not been initialized")]
    NotInitialized,
    /// MPI has already been finalized.
    #[error("MPI has already been finalized")]
    AlreadyFinalized,
    /// A buffer for buffered sends is already attached.
    #[error("a buffer for buffered communication is already attached")]
    BufferAlreadyAttached,
    /// No buffer for buffered sends is attached.
    #[error("no buffer for buffered communication is attached")]
    NoBufferAttached,
    /// A built-in reduction was requested for a type which does not support it.
    #[error("reduction {op:?} is not defined for {type_name}")]
    UnsupportedOperation { op: BuiltinOp, type_name: &'static str },
    /// A completion function was called on a non-blocking result whose request is not owned.
    #[error("the request of this non-blocking result is owned by the caller")]
    RequestNotOwned,
    /// A non-blocking result has already been waited on, tested successfully or extracted.
    #[error("the non-blocking result is no longer pending")]
    NotPending,
}

/// Crate-wide result type
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Build the default error for a failed MPI call.
    pub fn from_code(call: &'static str, code: c_int) -> Self {
        Error::Mpi {
            call,
            code,
            kind: ErrorKind::from_raw(code),
            message: error_string(code),
        }
    }

    /// The raw MPI return code, if this error originates from an MPI call.
    pub fn code(&self) -> Option<c_int> {
        match self {
            Error::Mpi { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The MPI error class, if known.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Mpi { kind, .. } => *kind,
            _ => None,
        }
    }
}

/// The error class of a raw return code.
pub(crate) fn error_class(code: c_int) -> Option<c_int> {
    let mut class: c_int = 0;
    let res = unsafe { ffi::MPI_Error_class(code, &mut class) };
    (res == MPI_SUCCESS).then_some(class)
}

fn error_string(code: c_int) -> String {
    let capacity = usize::try_from(unsafe { ffi::KAMPING_MAX_ERROR_STRING }).unwrap_or(0);
    let mut buf = vec![0u8; capacity.max(1)];
    let mut len: c_int = 0;
    let res =
        unsafe { ffi::MPI_Error_string(code, buf.as_mut_ptr() as *mut c_char, &mut len) };
    if res != MPI_SUCCESS {
        return String::from("unknown error");
    }
    buf.truncate(usize::try_from(len).unwrap_or(0));
    String::from_utf8_lossy(&buf).into_owned()
}

/// Turn a raw return code into a `Result` using the default error.
pub(crate) fn check(call: &'static str, code: c_int) -> Result<()> {
    if code == MPI_SUCCESS {
        Ok(())
    } else {
        Err(Error::from_code(call, code))
    }
}
