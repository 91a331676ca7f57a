use std::fmt::Display;
use std::str::FromStr;

use super::error::ValueError;

/// A looked-up raw value, or the error that prevented the lookup.
///
/// Typed accessors parse the raw string on demand. When the lookup itself
/// failed, every accessor returns that stored error instead of attempting a
/// conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringValue {
    val: String,
    err: Option<ValueError>,
}

impl StringValue {
    /// A successfully found value.
    pub fn found(val: impl Into<String>) -> Self {
        Self {
            val: val.into(),
            err: None,
        }
    }

    /// A value whose lookup failed.
    #[must_use]
    pub fn failed(err: ValueError) -> Self {
        Self {
            val: String::new(),
            err: Some(err),
        }
    }

    pub(crate) fn missing(key: &str) -> Self {
        Self::failed(ValueError::KeyNotFound(key.to_string()))
    }

    /// The stored lookup error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&ValueError> {
        self.err.as_ref()
    }

    #[must_use]
    pub fn is_found(&self) -> bool {
        self.err.is_none()
    }

    /// The raw string.
    pub fn string(&self) -> Result<&str, ValueError> {
        self.check()?;
        Ok(&self.val)
    }

    /// Platform-sized signed integer.
    pub fn int(&self) -> Result<isize, ValueError> {
        self.parse("int")
    }

    pub fn int32(&self) -> Result<i32, ValueError> {
        self.parse("int32")
    }

    pub fn int64(&self) -> Result<i64, ValueError> {
        self.parse("int64")
    }

    /// Platform-sized unsigned integer.
    pub fn uint(&self) -> Result<usize, ValueError> {
        self.parse("uint")
    }

    pub fn uint32(&self) -> Result<u32, ValueError> {
        self.parse("uint32")
    }

    pub fn uint64(&self) -> Result<u64, ValueError> {
        self.parse("uint64")
    }

    pub fn float32(&self) -> Result<f32, ValueError> {
        self.parse("float32")
    }

    pub fn float64(&self) -> Result<f64, ValueError> {
        self.parse("float64")
    }

    /// Accepts `1 t T true TRUE True` and `0 f F false FALSE False`.
    pub fn boolean(&self) -> Result<bool, ValueError> {
        self.check()?;
        match self.val.as_str() {
            "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
            "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
            _ => Err(self.conversion("bool", "invalid syntax")),
        }
    }

    fn check(&self) -> Result<(), ValueError> {
        match &self.err {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn parse<T>(&self, target: &'static str) -> Result<T, ValueError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.check()?;
        self.val
            .parse::<T>()
            .map_err(|e| self.conversion(target, e))
    }

    fn conversion(&self, target: &'static str, reason: impl Display) -> ValueError {
        ValueError::Conversion {
            value: self.val.clone(),
            target,
            reason: reason.to_string(),
        }
    }
}
