//! Bridge between a [`FlagSet`] and `clap`.
//!
//! `clap` parses the command-line syntax; the flag set owns the values. Every
//! flag becomes a long option taking its value as a string, and only values
//! that actually came from the command line are copied back.

use crate::binder::env_var_name;
use crate::error::{ConfigError, ConfigResult, ConversionError};
use crate::flagset::FlagSet;
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches};
use tracing::debug;

impl FlagSet {
    /// Build one `clap` argument per flag.
    ///
    /// Boolean flags may be passed bare (`--use-tls`) or with a value
    /// (`--use-tls=false`). When `env_prefix` is given, the help text of each
    /// flag names the environment variable it can be set from.
    pub fn args(&self, env_prefix: Option<&str>) -> Vec<Arg> {
        self.visit_all()
            .map(|flag| {
                let mut help = format!("{} [default: {:?}]", flag.usage(), flag.default_value());
                if let Some(prefix) = env_prefix {
                    help.push_str(&format!(" [env: {}]", env_var_name(prefix, flag.name())));
                }

                let arg = Arg::new(flag.name().to_string())
                    .long(flag.name().to_string())
                    .value_name(flag.type_name())
                    .action(ArgAction::Append)
                    .global(true)
                    .help(help);

                if flag.is_bool() {
                    arg.num_args(0..=1)
                        .require_equals(true)
                        .default_missing_value("true")
                } else {
                    arg.num_args(1)
                }
            })
            .collect()
    }

    /// Copy the values given on the command line into the flag set.
    ///
    /// Each copied flag is marked as explicitly set. A repeated option is
    /// applied once per occurrence, in order.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] for a value the flag rejects.
    /// Flags unknown to `matches` are skipped.
    pub fn apply_matches(&mut self, matches: &ArgMatches) -> ConfigResult<()> {
        let names: Vec<String> = self.visit_all().map(|flag| flag.name().to_string()).collect();

        for name in names {
            if !matches!(matches.try_contains_id(&name), Ok(true)) {
                continue;
            }
            if matches.value_source(&name) != Some(ValueSource::CommandLine) {
                continue;
            }

            let raw: Vec<String> = match matches.try_get_raw(&name) {
                Ok(Some(values)) => values
                    .map(|value| {
                        value.to_str().map(str::to_string).ok_or_else(|| {
                            ConfigError::InvalidValue {
                                flag: name.clone(),
                                source: ConversionError::new(
                                    &value.to_string_lossy(),
                                    "string",
                                    "invalid UTF-8",
                                ),
                            }
                        })
                    })
                    .collect::<ConfigResult<_>>()?,
                _ => continue,
            };

            for value in &raw {
                self.set(&name, value)?;
            }
            debug!("Set flag {} from the command line", name);
        }

        Ok(())
    }
}
