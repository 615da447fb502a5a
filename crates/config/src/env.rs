//! Environment variable lookup.
//!
//! The binders never read the process environment directly; they go through
//! an [`Environment`] so a synthetic one can be supplied instead.

use std::collections::{BTreeMap, HashMap};
use std::env;
use tracing::warn;

/// Key/value lookup of environment variables.
pub trait Environment {
    /// The value of `key`, or `None` when it is unset.
    fn var(&self, key: &str) -> Option<String>;

    /// The value of `key` if it is set to a non-empty string.
    ///
    /// An empty value is treated the same as an unset one.
    fn non_empty(&self, key: &str) -> Option<String> {
        self.var(key).filter(|value| !value.is_empty())
    }
}

/// The environment of the running process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        match env::var(key) {
            Ok(value) => Some(value),
            Err(env::VarError::NotPresent) => None,
            Err(env::VarError::NotUnicode(_)) => {
                warn!("Environment variable {} contains invalid UTF-8, ignoring it", key);
                None
            }
        }
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl Environment for BTreeMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl<E: Environment + ?Sized> Environment for &E {
    fn var(&self, key: &str) -> Option<String> {
        (**self).var(key)
    }
}
