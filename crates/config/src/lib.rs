//! Flag sets and environment binding for command-line programs.
//!
//! Configuration is resolved from three sources: explicit command-line
//! flags, environment variables and defaults. Command-line values are
//! applied with [`FlagSet::apply_matches`]; environment variables are bound
//! either through an explicit name mapping ([`bind_env_mapping`]) or by
//! naming convention ([`bind_env_convention`]).

pub mod binder;
pub mod command_line;
pub mod env;
pub mod error;
pub mod flagset;
pub mod value;

pub use binder::{bind_env_convention, bind_env_mapping, env_var_name};
pub use env::{Environment, ProcessEnv};
pub use error::{ConfigError, ConfigResult, ConversionError};
pub use flagset::{Flag, FlagSet};
pub use value::{BoolValue, DurationValue, FlagValue, ListValue, Parsed};
