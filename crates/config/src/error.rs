//! Error types for flag definition, conversion and environment binding.

/// A string value that does not satisfy a flag's type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot parse {input:?} as {type_name}: {reason}")]
pub struct ConversionError {
    /// The rejected input.
    pub input: String,
    /// Name of the type the input was converted to.
    pub type_name: &'static str,
    /// Why the conversion failed.
    pub reason: String,
}

impl ConversionError {
    pub fn new(input: &str, type_name: &'static str, reason: impl ToString) -> Self {
        Self {
            input: input.to_string(),
            type_name,
            reason: reason.to_string(),
        }
    }
}

/// Error type for flag set and binder operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("the {flag} flag doesn't exist")]
    UnknownFlag { flag: String },
    #[error("the {flag} flag is already defined")]
    Redefined { flag: String },
    #[error("failed to set the {flag} flag: {source}")]
    InvalidValue {
        flag: String,
        #[source]
        source: ConversionError,
    },
    #[error("invalid value {value:?} for {env_var} (flag {flag}): {source}")]
    InvalidEnvValue {
        flag: String,
        env_var: String,
        value: String,
        #[source]
        source: ConversionError,
    },
    #[error("{} environment variables could not be applied: {}", .0.len(), join(.0))]
    Multiple(Vec<ConfigError>),
}

/// Result type for flag set and binder operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    /// Build the error for a set of accumulated failures.
    ///
    /// Returns `None` for an empty list and the failure itself when there is
    /// exactly one.
    pub fn from_failures(mut failures: Vec<ConfigError>) -> Option<Self> {
        match failures.len() {
            0 => None,
            1 => failures.pop(),
            _ => Some(ConfigError::Multiple(failures)),
        }
    }

    /// Every individual failure carried by this error, in the order they occurred.
    pub fn failures(&self) -> Vec<&ConfigError> {
        match self {
            ConfigError::Multiple(errors) => errors.iter().collect(),
            other => vec![other],
        }
    }

    /// The most recent failure.
    ///
    /// Callers that only ever surfaced the last conversion error of a
    /// convention pass can use this to keep that behaviour.
    pub fn last(&self) -> &ConfigError {
        match self {
            ConfigError::Multiple(errors) => errors.last().unwrap_or(self),
            other => other,
        }
    }

    /// Name of the flag the error refers to, if it refers to exactly one.
    pub fn flag(&self) -> Option<&str> {
        match self {
            ConfigError::UnknownFlag { flag }
            | ConfigError::Redefined { flag }
            | ConfigError::InvalidValue { flag, .. }
            | ConfigError::InvalidEnvValue { flag, .. } => Some(flag),
            ConfigError::Multiple(_) => None,
        }
    }
}

fn join(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_failure(flag: &str) -> ConfigError {
        ConfigError::InvalidEnvValue {
            flag: flag.to_string(),
            env_var: format!("APP_{}", flag.to_uppercase()),
            value: "x".to_string(),
            source: ConversionError::new("x", "u32", "invalid digit found in string"),
        }
    }

    #[test]
    fn test_from_failures() {
        assert!(ConfigError::from_failures(vec![]).is_none());

        let single = ConfigError::from_failures(vec![env_failure("a")]).unwrap();
        assert_eq!(single, env_failure("a"));

        let many = ConfigError::from_failures(vec![env_failure("a"), env_failure("b")]).unwrap();
        assert_eq!(many.failures().len(), 2);
        assert_eq!(many.last(), &env_failure("b"));
        assert_eq!(many.flag(), None);
    }

    #[test]
    fn test_messages() {
        let err = ConfigError::UnknownFlag {
            flag: "token".to_string(),
        };
        assert_eq!(err.to_string(), "the token flag doesn't exist");

        let err = env_failure("a");
        assert_eq!(
            err.to_string(),
            "invalid value \"x\" for APP_A (flag a): cannot parse \"x\" as u32: invalid digit found in string"
        );

        let err = ConfigError::Multiple(vec![env_failure("a"), env_failure("b")]);
        assert!(err.to_string().starts_with("2 environment variables could not be applied: "));
        assert!(err.to_string().contains("APP_B"));
    }
}
