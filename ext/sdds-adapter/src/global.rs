//! One process-wide [`Sdds`] for embedders that address datasets by index
//! alone. Every call goes through a single lock.

use crate::binding::Sdds;
use std::sync::{LazyLock, Mutex, PoisonError};

static GLOBAL: LazyLock<Mutex<Sdds>> = LazyLock::new(|| Mutex::new(Sdds::default()));

/// Run `f` against the shared instance
pub fn with_global<T, F>(f: F) -> T
where
    F: FnOnce(&mut Sdds) -> T,
{
    let mut guard = GLOBAL.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
}
