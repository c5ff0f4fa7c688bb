//! Per-type cache of committed composite datatypes
//!
//! The first request for a composite builds and commits its handle, stores it in the cache and
//! registers it with the environment. Later requests return the cached handle.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use once_cell::sync::Lazy;

use super::Datatype;
use crate::environment;
use crate::error::Result;

static COMPOSITES: Lazy<RwLock<HashMap<TypeId, Datatype>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Returns the cached handle for `T`, building, committing and registering it first if needed.
///
/// # Panics
/// Panics if `build` fails. Composite construction only fails when MPI is unusable.
pub fn cached_datatype<T: 'static>(build: impl FnOnce() -> Result<Datatype>) -> Datatype {
    let key = TypeId::of::<T>();
    if let Some(datatype) = COMPOSITES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return *datatype;
    }

    // Built without holding the lock: composites of composites request their element types
    // from this cache while being built.
    let datatype = match build() {
        Ok(datatype) => datatype,
        Err(err) => panic!(
            "could not construct the datatype for {}: {}",
            type_name::<T>(),
            err
        ),
    };

    let mut composites = COMPOSITES.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(existing) = composites.get(&key) {
        let existing = *existing;
        drop(composites);
        if let Err(err) = unsafe { datatype.free() } {
            tracing::warn!(ty = type_name::<T>(), %err, "could not free duplicate datatype");
        }
        return existing;
    }
    composites.insert(key, datatype);
    drop(composites);
    tracing::debug!(
        ty = type_name::<T>(),
        category = ?datatype.category(),
        "committed composite datatype"
    );
    environment::register_mpi_type(datatype);
    datatype
}

/// Whether a handle for `T` has been built already.
pub fn is_cached<T: 'static>() -> bool {
    COMPOSITES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains_key(&TypeId::of::<T>())
}

/// Forgets all cached handles. Called by the environment after it freed them.
pub(crate) fn clear() {
    COMPOSITES
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}
