//! Environmental management
//!
//! An [`Environment`] brackets the use of MPI in a process. Depending on its [`InitMode`] it
//! initializes and finalizes MPI itself, leaves both to someone else, or only does so if nobody
//! did it before.
//!
//! The environment also owns the list of composite datatypes committed by the
//! [datatype registry](crate::datatype::registry) and the buffer attached for buffered sends.

use std::cmp::Ordering;
use std::os::raw::{c_char, c_double, c_int, c_void};
use std::ptr;
use std::string::FromUtf8Error;
use std::sync::{Mutex, PoisonError};

use once_cell::sync::Lazy;

use crate::cast::{asserting_cast, throwing_cast};
use crate::communicator::Communicator;
use crate::datatype::{registry, Datatype};
use crate::error::{check, Error, Result};
use crate::ffi;

static REGISTERED_TYPES: Lazy<Mutex<Vec<Datatype>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Whether the environment initializes and finalizes MPI.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum InitMode {
    /// Initialize on construction and finalize on drop. Fails if MPI is already initialized.
    #[default]
    InitFinalize,
    /// Neither initialize nor finalize; MPI is managed elsewhere.
    NoInitFinalize,
    /// Initialize and finalize only if MPI has not been initialized yet.
    InitFinalizeIfNecessary,
}

/// Describes the various levels of multithreading that can be supported by an MPI library.
///
/// # Standard section(s)
///
/// 12.4.3
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Threading {
    /// All processes partaking in the computation are single-threaded.
    Single,
    /// Processes may be multi-threaded, but MPI functions will only ever be called from the main
    /// thread.
    Funneled,
    /// Processes may be multi-threaded, but calls to MPI functions will not be made concurrently.
    /// The user is responsible for serializing the calls.
    Serialized,
    /// Processes may be multi-threaded with no restrictions on the use of MPI functions from the
    /// threads.
    Multiple,
}

impl Threading {
    /// The raw value understood by the MPI C API
    fn as_raw(&self) -> c_int {
        use self::Threading::*;
        unsafe {
            match *self {
                Single => ffi::KAMPING_THREAD_SINGLE,
                Funneled => ffi::KAMPING_THREAD_FUNNELED,
                Serialized => ffi::KAMPING_THREAD_SERIALIZED,
                Multiple => ffi::KAMPING_THREAD_MULTIPLE,
            }
        }
    }

    fn from_raw(raw: c_int) -> Threading {
        use self::Threading::*;
        unsafe {
            if raw == ffi::KAMPING_THREAD_MULTIPLE {
                Multiple
            } else if raw == ffi::KAMPING_THREAD_SERIALIZED {
                Serialized
            } else if raw == ffi::KAMPING_THREAD_FUNNELED {
                Funneled
            } else {
                Single
            }
        }
    }
}

impl PartialOrd<Threading> for Threading {
    fn partial_cmp(&self, other: &Threading) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Threading {
    fn cmp(&self, other: &Threading) -> Ordering {
        self.as_raw().cmp(&other.as_raw())
    }
}

/// Global context of an MPI program.
///
/// # Examples
///
/// ```no_run
/// use kamping::environment::{Environment, InitMode};
///
/// let env = Environment::new(InitMode::InitFinalizeIfNecessary).unwrap();
/// let world = env.world().unwrap();
/// println!("rank {} of {}", world.rank(), world.size());
/// ```
#[derive(Debug)]
pub struct Environment {
    finalize_on_drop: bool,
    threading: Threading,
    buffer: Option<Vec<u8>>,
}

impl Environment {
    /// Sets up the environment with `Threading::Single`.
    pub fn new(mode: InitMode) -> Result<Environment> {
        Environment::with_threading(mode, Threading::Single)
    }

    /// Sets up the environment, requesting the given level of thread support if this call
    /// initializes MPI.
    ///
    /// # Standard section(s)
    ///
    /// 8.7, 12.4.3
    pub fn with_threading(mode: InitMode, threading: Threading) -> Result<Environment> {
        if Environment::finalized()? {
            return Err(Error::AlreadyFinalized);
        }
        let initialized = Environment::initialized()?;
        let initialize = match mode {
            InitMode::InitFinalize if initialized => return Err(Error::AlreadyInitialized),
            InitMode::InitFinalize => true,
            InitMode::NoInitFinalize if !initialized => return Err(Error::NotInitialized),
            InitMode::NoInitFinalize => false,
            InitMode::InitFinalizeIfNecessary => !initialized,
        };

        let provided = if initialize {
            let mut provided: c_int = 0;
            check("MPI_Init_thread", unsafe {
                ffi::MPI_Init_thread(
                    ptr::null_mut(),
                    ptr::null_mut(),
                    threading.as_raw(),
                    &mut provided,
                )
            })?;
            tracing::debug!(requested = ?threading, ?mode, "initialized MPI");
            Threading::from_raw(provided)
        } else {
            threading_support()?
        };

        // Errors are reported through return codes and handled by the communicator's hook.
        check("MPI_Comm_set_errhandler", unsafe {
            ffi::MPI_Comm_set_errhandler(ffi::KAMPING_COMM_WORLD, ffi::KAMPING_ERRORS_RETURN)
        })?;
        check("MPI_Comm_set_errhandler", unsafe {
            ffi::MPI_Comm_set_errhandler(ffi::KAMPING_COMM_SELF, ffi::KAMPING_ERRORS_RETURN)
        })?;

        Ok(Environment {
            finalize_on_drop: initialize,
            threading: provided,
            buffer: None,
        })
    }

    /// Whether MPI has been initialized.
    pub fn initialized() -> Result<bool> {
        let mut flag: c_int = 0;
        check("MPI_Initialized", unsafe { ffi::MPI_Initialized(&mut flag) })?;
        Ok(flag != 0)
    }

    /// Whether MPI has been finalized.
    pub fn finalized() -> Result<bool> {
        let mut flag: c_int = 0;
        check("MPI_Finalized", unsafe { ffi::MPI_Finalized(&mut flag) })?;
        Ok(flag != 0)
    }

    /// The level of thread support provided by the MPI library.
    pub fn threading(&self) -> Threading {
        self.threading
    }

    /// The world communicator.
    pub fn world(&self) -> Result<Communicator> {
        Communicator::world()
    }

    /// Time in seconds since an arbitrary time in the past.
    pub fn wtime() -> c_double {
        unsafe { ffi::KAMPING_Wtime() }
    }

    /// Resolution of [`wtime`](Environment::wtime) in seconds.
    pub fn wtick() -> c_double {
        unsafe { ffi::KAMPING_Wtick() }
    }

    /// Attaches `buffer` for use by buffered sends.
    ///
    /// The buffer must provide room for the messages in flight plus `bsend_overhead()` bytes per
    /// message.
    ///
    /// # Standard section(s)
    ///
    /// 3.6.1
    pub fn attach_buffer(&mut self, mut buffer: Vec<u8>) -> Result<()> {
        if self.buffer.is_some() {
            return Err(Error::BufferAlreadyAttached);
        }
        let size: c_int = throwing_cast(buffer.len())?;
        check("MPI_Buffer_attach", unsafe {
            ffi::MPI_Buffer_attach(buffer.as_mut_ptr() as *mut c_void, size)
        })?;
        self.buffer = Some(buffer);
        Ok(())
    }

    /// Detaches the buffer used for buffered sends and hands it back. Blocks until all buffered
    /// messages have been transmitted.
    pub fn detach_buffer(&mut self) -> Result<Vec<u8>> {
        if self.buffer.is_none() {
            return Err(Error::NoBufferAttached);
        }
        let mut addr: *mut c_void = ptr::null_mut();
        let mut size: c_int = 0;
        // MPI keeps using the buffer until the detach succeeded
        check("MPI_Buffer_detach", unsafe {
            ffi::MPI_Buffer_detach(&mut addr as *mut *mut c_void as *mut c_void, &mut size)
        })?;
        let buffer = self.buffer.take().ok_or(Error::NoBufferAttached)?;
        debug_assert_eq!(addr as *const u8, buffer.as_ptr());
        Ok(buffer)
    }

    /// Whether a buffer for buffered sends is attached.
    pub fn buffer_attached(&self) -> bool {
        self.buffer.is_some()
    }

    /// Per-message overhead of buffered sends in bytes.
    pub fn bsend_overhead() -> usize {
        asserting_cast(unsafe { ffi::KAMPING_BSEND_OVERHEAD })
    }

    /// Registers a composite datatype to be freed by [`free_registered_types`].
    ///
    /// [`free_registered_types`]: Environment::free_registered_types
    pub fn register_mpi_type(datatype: Datatype) {
        register_mpi_type(datatype)
    }

    /// Frees every registered composite datatype and empties the list.
    pub fn free_registered_types() -> Result<()> {
        free_registered_types()
    }

    /// Identifies the version of the MPI standard implemented by the library, e.g. `(3, 1)`.
    pub fn version() -> Result<(c_int, c_int)> {
        let mut version: c_int = 0;
        let mut subversion: c_int = 0;
        check("MPI_Get_version", unsafe {
            ffi::MPI_Get_version(&mut version, &mut subversion)
        })?;
        Ok((version, subversion))
    }

    /// Describes the version of the MPI library itself.
    pub fn library_version() -> Result<Result<String, FromUtf8Error>> {
        let capacity = asserting_cast(unsafe { ffi::KAMPING_MAX_LIBRARY_VERSION_STRING });
        read_string(capacity, |buf, len| unsafe {
            ffi::MPI_Get_library_version(buf, len)
        })
        .map(|res| res.map(|s| s.trim_end().to_owned()))
    }

    /// Names the processor that the calling process is running on.
    pub fn processor_name() -> Result<Result<String, FromUtf8Error>> {
        let capacity = asserting_cast(unsafe { ffi::KAMPING_MAX_PROCESSOR_NAME });
        read_string(capacity, |buf, len| unsafe {
            ffi::MPI_Get_processor_name(buf, len)
        })
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        if self.buffer.is_some() {
            if let Err(err) = self.detach_buffer() {
                tracing::warn!(%err, "could not detach the buffered send buffer");
            }
        }
        if !self.finalize_on_drop {
            return;
        }
        if let Err(err) = free_registered_types() {
            tracing::warn!(%err, "could not free registered datatypes");
        }
        let res = unsafe { ffi::MPI_Finalize() };
        if let Err(err) = check("MPI_Finalize", res) {
            tracing::warn!(%err, "could not finalize MPI");
        } else {
            tracing::debug!("finalized MPI");
        }
    }
}

fn read_string(
    capacity: usize,
    read: impl FnOnce(*mut c_char, *mut c_int) -> c_int,
) -> Result<Result<String, FromUtf8Error>> {
    let mut buf = vec![0u8; capacity];
    let mut len: c_int = 0;
    check("MPI_Get_string", read(buf.as_mut_ptr() as *mut c_char, &mut len))?;
    buf.truncate(throwing_cast(len)?);
    Ok(String::from_utf8(buf))
}

fn threading_support() -> Result<Threading> {
    let mut provided: c_int = 0;
    check("MPI_Query_thread", unsafe { ffi::MPI_Query_thread(&mut provided) })?;
    Ok(Threading::from_raw(provided))
}

pub(crate) fn register_mpi_type(datatype: Datatype) {
    if !datatype.requires_commit() {
        return;
    }
    REGISTERED_TYPES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(datatype);
}

pub(crate) fn free_registered_types() -> Result<()> {
    let types = std::mem::take(
        &mut *REGISTERED_TYPES
            .lock()
            .unwrap_or_else(PoisonError::into_inner),
    );
    registry::clear();
    tracing::debug!(count = types.len(), "freeing registered datatypes");
    let mut first_error = None;
    for datatype in types.into_iter().filter(|datatype| !datatype.is_null()) {
        if let Err(err) = unsafe { datatype.free() } {
            first_error.get_or_insert(err);
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Number of composite datatypes currently registered for teardown.
pub fn registered_type_count() -> usize {
    REGISTERED_TYPES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .len()
}
