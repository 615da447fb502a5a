//! Typed flag values.
//!
//! Every flag stores its value behind the [`FlagValue`] trait, which converts
//! from and renders back to the string form used by the command line and the
//! environment.

use crate::error::ConversionError;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// A value that can be set from its string form.
pub trait FlagValue: Send + Sync {
    /// Replace the value by parsing `raw`.
    fn set(&mut self, raw: &str) -> Result<(), ConversionError>;

    /// Overwrite the value with `raw`, discarding anything accumulated by
    /// earlier calls to [`FlagValue::set`].
    fn replace(&mut self, raw: &str) -> Result<(), ConversionError> {
        self.set(raw)
    }

    /// The current value in string form.
    fn render(&self) -> String;

    /// Short name of the value's type, used in help output and errors.
    fn type_name(&self) -> &'static str;

    /// Boolean flags may be given on the command line without a value.
    fn is_bool(&self) -> bool {
        false
    }
}

/// A value of any type with `FromStr` and `Display` implementations.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    value: T,
    type_name: &'static str,
}

impl<T> Parsed<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            type_name: short_type_name::<T>(),
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }
}

impl<T> FlagValue for Parsed<T>
where
    T: FromStr + Display + Send + Sync,
    T::Err: Display,
{
    fn set(&mut self, raw: &str) -> Result<(), ConversionError> {
        self.value = raw
            .parse::<T>()
            .map_err(|e| ConversionError::new(raw, self.type_name, e))?;
        Ok(())
    }

    fn render(&self) -> String {
        self.value.to_string()
    }

    fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Boolean value accepting the usual spellings of true and false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoolValue(pub bool);

impl BoolValue {
    pub fn parse(raw: &str) -> Result<bool, ConversionError> {
        match raw {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
            _ => Err(ConversionError::new(raw, "bool", "invalid syntax")),
        }
    }
}

impl FlagValue for BoolValue {
    fn set(&mut self, raw: &str) -> Result<(), ConversionError> {
        self.0 = Self::parse(raw)?;
        Ok(())
    }

    fn render(&self) -> String {
        self.0.to_string()
    }

    fn type_name(&self) -> &'static str {
        "bool"
    }

    fn is_bool(&self) -> bool {
        true
    }
}

/// Duration written in human-readable form, e.g. `30s` or `1h 30m`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DurationValue(pub Duration);

impl FlagValue for DurationValue {
    fn set(&mut self, raw: &str) -> Result<(), ConversionError> {
        self.0 = humantime::parse_duration(raw)
            .map_err(|e| ConversionError::new(raw, "duration", e))?;
        Ok(())
    }

    fn render(&self) -> String {
        humantime::format_duration(self.0).to_string()
    }

    fn type_name(&self) -> &'static str {
        "duration"
    }
}

/// Comma-separated list of strings.
///
/// The first `set` replaces the default; later ones append, so a repeated
/// command-line option accumulates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListValue {
    items: Vec<String>,
    replaced: bool,
}

impl ListValue {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
            replaced: false,
        }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn split(raw: &str) -> Vec<String> {
        if raw.trim().is_empty() {
            return Vec::new();
        }
        raw.split(',').map(|item| item.trim().to_string()).collect()
    }
}

impl FlagValue for ListValue {
    fn set(&mut self, raw: &str) -> Result<(), ConversionError> {
        let items = Self::split(raw);
        if self.replaced {
            self.items.extend(items);
        } else {
            self.items = items;
            self.replaced = true;
        }
        Ok(())
    }

    fn replace(&mut self, raw: &str) -> Result<(), ConversionError> {
        self.items = Self::split(raw);
        self.replaced = true;
        Ok(())
    }

    fn render(&self) -> String {
        self.items.join(",")
    }

    fn type_name(&self) -> &'static str {
        "strings"
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    match base.rsplit("::").next() {
        Some("String") => "string",
        Some(name) => name,
        None => full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsed_integer() {
        let mut value = Parsed::new(3u32);
        assert_eq!(value.type_name(), "u32");
        assert_eq!(value.render(), "3");

        value.set("5").unwrap();
        assert_eq!(*value.get(), 5);

        let err = value.set("five").unwrap_err();
        assert_eq!(err.input, "five");
        assert_eq!(err.type_name, "u32");
        assert_eq!(*value.get(), 5);
    }

    #[test]
    fn test_parsed_string_accepts_anything() {
        let mut value = Parsed::new(String::from("default"));
        assert_eq!(value.type_name(), "string");
        value.set("").unwrap();
        assert_eq!(value.render(), "");
    }

    #[test]
    fn test_bool_spellings() {
        let mut value = BoolValue::default();
        for raw in ["1", "t", "T", "TRUE", "true", "True"] {
            value.set(raw).unwrap();
            assert!(value.0, "{raw} should be true");
        }
        for raw in ["0", "f", "F", "FALSE", "false", "False"] {
            value.set(raw).unwrap();
            assert!(!value.0, "{raw} should be false");
        }
        assert!(value.set("yes").is_err());
        assert!(value.is_bool());
    }

    #[test]
    fn test_duration_round_trip_form() {
        let mut value = DurationValue(Duration::from_secs(30));
        assert_eq!(value.render(), "30s");

        value.set("1h 30m").unwrap();
        assert_eq!(value.0, Duration::from_secs(5400));
        assert_eq!(value.render(), "1h 30m");

        assert!(value.set("soon").is_err());
    }

    #[test]
    fn test_list_replaces_then_appends() {
        let mut value = ListValue::new(["default"]);
        value.set("a, b").unwrap();
        assert_eq!(value.items(), ["a", "b"]);

        value.set("c").unwrap();
        assert_eq!(value.items(), ["a", "b", "c"]);
        assert_eq!(value.render(), "a,b,c");

        assert!(ListValue::split("  ").is_empty());
    }

    #[test]
    fn test_list_replace_discards_items() {
        let mut value = ListValue::new(["default"]);
        value.set("a").unwrap();
        value.set("b").unwrap();

        value.replace("c, d").unwrap();
        assert_eq!(value.items(), ["c", "d"]);

        value.set("e").unwrap();
        assert_eq!(value.items(), ["c", "d", "e"]);
    }
}
