//! Named flag sets.

use crate::error::{ConfigError, ConfigResult, ConversionError};
use crate::value::{BoolValue, DurationValue, FlagValue, ListValue, Parsed};
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// A named configuration item with a default and an explicitly-set state.
pub struct Flag {
    name: String,
    usage: String,
    default: String,
    changed: bool,
    value: Box<dyn FlagValue>,
}

impl Flag {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn usage(&self) -> &str {
        &self.usage
    }

    /// The value the flag was defined with, in string form.
    pub fn default_value(&self) -> &str {
        &self.default
    }

    /// The current value in string form.
    pub fn value(&self) -> String {
        self.value.render()
    }

    pub fn type_name(&self) -> &'static str {
        self.value.type_name()
    }

    pub fn is_bool(&self) -> bool {
        self.value.is_bool()
    }

    /// Whether the flag was explicitly set, e.g. on the command line.
    pub fn is_changed(&self) -> bool {
        self.changed
    }
}

impl fmt::Debug for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flag")
            .field("name", &self.name)
            .field("type", &self.type_name())
            .field("value", &self.value())
            .field("default", &self.default)
            .field("changed", &self.changed)
            .finish()
    }
}

/// A collection of flags, unique by name.
///
/// Flags are enumerated in lexicographic name order.
#[derive(Debug, Default)]
pub struct FlagSet {
    name: String,
    flags: BTreeMap<String, Flag>,
}

impl FlagSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Define a flag holding `value`, whose current value becomes its default.
    ///
    /// # Errors
    /// Returns [`ConfigError::Redefined`] if a flag with the same name exists.
    pub fn define<V>(&mut self, name: &str, value: V, usage: &str) -> ConfigResult<&mut Self>
    where
        V: FlagValue + 'static,
    {
        if self.flags.contains_key(name) {
            return Err(ConfigError::Redefined {
                flag: name.to_string(),
            });
        }

        let flag = Flag {
            name: name.to_string(),
            usage: usage.to_string(),
            default: value.render(),
            changed: false,
            value: Box::new(value),
        };
        self.flags.insert(name.to_string(), flag);
        Ok(self)
    }

    /// Define a string flag.
    pub fn string(&mut self, name: &str, default: &str, usage: &str) -> ConfigResult<&mut Self> {
        self.define(name, Parsed::new(default.to_string()), usage)
    }

    /// Define a boolean flag.
    pub fn bool(&mut self, name: &str, default: bool, usage: &str) -> ConfigResult<&mut Self> {
        self.define(name, BoolValue(default), usage)
    }

    /// Define a duration flag.
    pub fn duration(&mut self, name: &str, default: Duration, usage: &str) -> ConfigResult<&mut Self> {
        self.define(name, DurationValue(default), usage)
    }

    /// Define a comma-separated list flag.
    pub fn list(&mut self, name: &str, default: &[&str], usage: &str) -> ConfigResult<&mut Self> {
        self.define(name, ListValue::new(default.iter().copied()), usage)
    }

    /// Define a flag of any type that can be parsed from and rendered to a string.
    pub fn parsed<T>(&mut self, name: &str, default: T, usage: &str) -> ConfigResult<&mut Self>
    where
        T: FromStr + Display + Send + Sync + 'static,
        T::Err: Display,
    {
        self.define(name, Parsed::new(default), usage)
    }

    pub fn lookup(&self, name: &str) -> Option<&Flag> {
        self.flags.get(name)
    }

    /// All flags.
    pub fn visit_all(&self) -> impl Iterator<Item = &Flag> {
        self.flags.values()
    }

    /// Only the flags that were explicitly set.
    pub fn visit(&self) -> impl Iterator<Item = &Flag> {
        self.flags.values().filter(|flag| flag.changed)
    }

    /// Set a flag from a string and mark it as explicitly set.
    ///
    /// # Errors
    /// Returns [`ConfigError::UnknownFlag`] or [`ConfigError::InvalidValue`].
    pub fn set(&mut self, name: &str, value: &str) -> ConfigResult<()> {
        let flag = self.flag_mut(name)?;
        flag.value.set(value).map_err(|source| invalid(name, source))?;
        flag.changed = true;
        Ok(())
    }

    /// Overwrite a flag from a string without changing whether it counts as
    /// explicitly set. List flags drop the items they held.
    ///
    /// # Errors
    /// Returns [`ConfigError::UnknownFlag`] or [`ConfigError::InvalidValue`].
    pub fn set_value(&mut self, name: &str, value: &str) -> ConfigResult<()> {
        let flag = self.flag_mut(name)?;
        flag.value.replace(value).map_err(|source| invalid(name, source))
    }

    /// The current value of a flag in string form.
    pub fn value(&self, name: &str) -> ConfigResult<String> {
        Ok(self.flag(name)?.value())
    }

    /// The current value of a flag converted to `T`.
    ///
    /// # Errors
    /// Returns [`ConfigError::UnknownFlag`], or [`ConfigError::InvalidValue`]
    /// if the value does not parse as `T`.
    pub fn get<T>(&self, name: &str) -> ConfigResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.value(name)?;
        raw.parse::<T>().map_err(|e| {
            invalid(
                name,
                ConversionError::new(&raw, std::any::type_name::<T>(), e),
            )
        })
    }

    pub fn get_bool(&self, name: &str) -> ConfigResult<bool> {
        let raw = self.value(name)?;
        BoolValue::parse(&raw).map_err(|source| invalid(name, source))
    }

    pub fn get_duration(&self, name: &str) -> ConfigResult<Duration> {
        let raw = self.value(name)?;
        humantime::parse_duration(&raw)
            .map_err(|e| invalid(name, ConversionError::new(&raw, "duration", e)))
    }

    pub fn get_list(&self, name: &str) -> ConfigResult<Vec<String>> {
        Ok(ListValue::split(&self.value(name)?))
    }

    fn flag(&self, name: &str) -> ConfigResult<&Flag> {
        self.flags.get(name).ok_or_else(|| unknown(name))
    }

    fn flag_mut(&mut self, name: &str) -> ConfigResult<&mut Flag> {
        self.flags.get_mut(name).ok_or_else(|| unknown(name))
    }
}

fn unknown(name: &str) -> ConfigError {
    ConfigError::UnknownFlag {
        flag: name.to_string(),
    }
}

fn invalid(name: &str, source: ConversionError) -> ConfigError {
    ConfigError::InvalidValue {
        flag: name.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_flags() -> FlagSet {
        let mut flags = FlagSet::new("test");
        flags
            .string("namespace", "", "namespace to watch")
            .unwrap()
            .parsed("max-retries", 3u32, "retry budget")
            .unwrap()
            .bool("use-tls", false, "enable TLS")
            .unwrap()
            .duration("poll-interval", Duration::from_secs(30), "poll interval")
            .unwrap()
            .list("targets", &["a"], "target namespaces")
            .unwrap();
        flags
    }

    #[test]
    fn test_define_and_lookup() {
        let flags = test_flags();
        assert_eq!(flags.len(), 5);

        let retries = flags.lookup("max-retries").unwrap();
        assert_eq!(retries.value(), "3");
        assert_eq!(retries.default_value(), "3");
        assert_eq!(retries.type_name(), "u32");
        assert!(!retries.is_changed());

        assert!(flags.lookup("missing").is_none());
    }

    #[test]
    fn test_redefine_fails() {
        let mut flags = test_flags();
        let err = flags.string("namespace", "x", "again").unwrap_err();
        assert_eq!(
            err,
            ConfigError::Redefined {
                flag: "namespace".to_string()
            }
        );
    }

    #[test]
    fn test_enumeration_order() {
        let flags = test_flags();
        let names: Vec<&str> = flags.visit_all().map(Flag::name).collect();
        assert_eq!(
            names,
            ["max-retries", "namespace", "poll-interval", "targets", "use-tls"]
        );
    }

    #[test]
    fn test_set_marks_changed() {
        let mut flags = test_flags();
        flags.set("max-retries", "7").unwrap();
        flags.set_value("namespace", "metering").unwrap();

        let changed: Vec<&str> = flags.visit().map(Flag::name).collect();
        assert_eq!(changed, ["max-retries"]);
        assert_eq!(flags.get::<u32>("max-retries").unwrap(), 7);
        assert_eq!(flags.value("namespace").unwrap(), "metering");
    }

    #[test]
    fn test_set_invalid_keeps_value() {
        let mut flags = test_flags();
        let err = flags.set("max-retries", "many").unwrap_err();
        assert_eq!(err.flag(), Some("max-retries"));
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let flag = flags.lookup("max-retries").unwrap();
        assert_eq!(flag.value(), "3");
        assert!(!flag.is_changed());
    }

    #[test]
    fn test_set_unknown() {
        let mut flags = test_flags();
        assert!(matches!(
            flags.set("token", "x"),
            Err(ConfigError::UnknownFlag { .. })
        ));
        assert!(matches!(
            flags.value("token"),
            Err(ConfigError::UnknownFlag { .. })
        ));
    }

    #[test]
    fn test_typed_getters() {
        let mut flags = test_flags();
        flags.set("use-tls", "T").unwrap();
        flags.set("poll-interval", "2m").unwrap();
        flags.set("targets", "b,c").unwrap();

        assert!(flags.get_bool("use-tls").unwrap());
        assert_eq!(flags.get_duration("poll-interval").unwrap(), Duration::from_secs(120));
        assert_eq!(flags.get_list("targets").unwrap(), ["b", "c"]);
        assert!(flags.get::<u8>("namespace").is_err());
    }
}
