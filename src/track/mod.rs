pub mod footprint;
pub mod launch;
pub mod pointer;
pub mod running;

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

// Lock helpers: a poisoned lock means another thread panicked mid-update;
// tracking state is still better served than lost, so recover the guard.

pub(crate) fn lock<'a, T>(mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub(crate) fn read<'a, T>(rw: &'a RwLock<T>) -> RwLockReadGuard<'a, T> {
    match rw.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub(crate) fn write<'a, T>(rw: &'a RwLock<T>) -> RwLockWriteGuard<'a, T> {
    match rw.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
