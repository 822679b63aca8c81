//! Single-writer ownership of a value by one host thread.
//!
//! The lock inside is never contended in correct use: every access is
//! checked against the owning thread first, and only the owner gets through.

use parking_lot::Mutex;
use std::fmt;

use super::{HostThread, ThreadChecker};
use crate::error::{BridgeError, Result};

pub struct ThreadAffine<T> {
    owner: HostThread,
    checker: ThreadChecker,
    value: Mutex<T>,
}

impl<T> ThreadAffine<T> {
    pub fn new(owner: HostThread, checker: ThreadChecker, value: T) -> Self {
        Self {
            owner,
            checker,
            value: Mutex::new(value),
        }
    }

    pub fn owner(&self) -> HostThread {
        self.owner
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        self.check_owner()?;
        Ok(f(&self.value.lock()))
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        self.check_owner()?;
        Ok(f(&mut self.value.lock()))
    }

    fn check_owner(&self) -> Result<()> {
        if self.checker.is_current(self.owner) {
            Ok(())
        } else {
            Err(BridgeError::WrongThread {
                expected: self.owner.to_string(),
                actual: self
                    .checker
                    .current()
                    .map(|t| t.to_string())
                    .unwrap_or_else(super::restrictions::current_thread_name),
            })
        }
    }
}

impl<T> fmt::Debug for ThreadAffine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadAffine")
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}
