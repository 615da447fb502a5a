//! Binding environment variables into a flag set.
//!
//! Two modes are supported:
//!
//! * [`bind_env_mapping`] applies a caller-supplied table of environment
//!   variable names to flag names. It stops at the first error and overrides
//!   values set on the command line.
//! * [`bind_env_convention`] derives a variable name for every flag (see
//!   [`env_var_name`]) and only fills in flags that were not explicitly set.
//!   It attempts every flag before reporting failures.
//!
//! In both modes a variable set to the empty string counts as unset.

use crate::env::Environment;
use crate::error::{ConfigError, ConfigResult};
use crate::flagset::FlagSet;
use tracing::debug;

/// Derive the environment variable name for a flag.
///
/// The flag name is uppercased, every `-` becomes `_`, and `PREFIX_` is
/// prepended. An empty prefix yields the converted name on its own.
///
/// ```
/// use flagenv_config::env_var_name;
///
/// assert_eq!(env_var_name("APP", "max-retries"), "APP_MAX_RETRIES");
/// assert_eq!(env_var_name("", "max-retries"), "MAX_RETRIES");
/// ```
pub fn env_var_name(prefix: &str, flag: &str) -> String {
    let name = flag.replace('-', "_").to_uppercase();
    if prefix.is_empty() {
        name
    } else {
        format!("{}_{}", prefix, name)
    }
}

/// Set flags from an explicit mapping of environment variable names to flag names.
///
/// For each pair the flag must exist. If the variable holds a non-empty
/// value, the flag's value is replaced with it, whether or not the flag was
/// set on the command line. The explicitly-set state of the flag is left
/// as it was.
///
/// # Arguments
/// * `flags` - Flag set to update
/// * `env` - Environment to read variables from
/// * `mapping` - Pairs of environment variable name and flag name
///
/// # Errors
/// Returns [`ConfigError::UnknownFlag`] for a pair naming a flag that does
/// not exist, or [`ConfigError::InvalidEnvValue`] when a value does not
/// convert. Processing stops at the first error; pairs handled before it
/// stay applied.
pub fn bind_env_mapping<E, I, K, V>(flags: &mut FlagSet, env: &E, mapping: I) -> ConfigResult<()>
where
    E: Environment + ?Sized,
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    for (env_var, flag) in mapping {
        let (env_var, flag) = (env_var.as_ref(), flag.as_ref());
        if flags.lookup(flag).is_none() {
            return Err(ConfigError::UnknownFlag {
                flag: flag.to_string(),
            });
        }

        if let Some(value) = env.non_empty(env_var) {
            flags
                .set_value(flag, &value)
                .map_err(|e| from_env(e, env_var, &value))?;
            debug!("Set flag {} from {}", flag, env_var);
        }
    }

    Ok(())
}

/// Set every flag not explicitly set from its conventional environment variable.
///
/// Flags that were already set (on the command line) are skipped, so the
/// command line always wins. Flags whose variable is unset or empty keep
/// their current value. Flags set here are marked as explicitly set.
///
/// # Errors
/// Every flag is attempted even when an earlier one fails. A single failure
/// is returned as [`ConfigError::InvalidEnvValue`]; several are returned
/// together as [`ConfigError::Multiple`] in enumeration order, and
/// [`ConfigError::last`] gives the most recent one.
pub fn bind_env_convention<E>(flags: &mut FlagSet, env: &E, prefix: &str) -> ConfigResult<()>
where
    E: Environment + ?Sized,
{
    let unset: Vec<String> = flags
        .visit_all()
        .filter(|flag| !flag.is_changed())
        .map(|flag| flag.name().to_string())
        .collect();

    let mut failures = Vec::new();
    for name in unset {
        let key = env_var_name(prefix, &name);
        let Some(value) = env.non_empty(&key) else {
            continue;
        };

        match flags.set(&name, &value) {
            Ok(()) => debug!("Set flag {} from {}", name, key),
            Err(e) => failures.push(from_env(e, &key, &value)),
        }
    }

    match ConfigError::from_failures(failures) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn from_env(err: ConfigError, env_var: &str, value: &str) -> ConfigError {
    match err {
        ConfigError::InvalidValue { flag, source } => ConfigError::InvalidEnvValue {
            flag,
            env_var: env_var.to_string(),
            value: value.to_string(),
            source,
        },
        other => other,
    }
}
