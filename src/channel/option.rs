//! Option values and coercion rules
//!
//! An option map carries loosely typed values (strings read from a config
//! file, booleans and integers from code, handles to TLS contexts or
//! factories). Each setter coerces the value to the type it stores and fails
//! with `ConfigError::InvalidArgument` when that is not possible.

use super::{BufferFactory, ConfigError, PipelineFactory};
use crate::tls::TlsContext;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Separators accepted between items of a string list given as one string
const LIST_SEPARATORS: &[char] = &[',', ' ', '\t', '\n', '\r', '\x0c', '\x1b', '\x07'];

/// Opaque value of a key/value channel option
#[derive(Clone)]
pub enum OptionValue {
    /// Explicit absence
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    StrList(Vec<String>),
    TlsContext(TlsContext),
    BufferFactory(Arc<dyn BufferFactory>),
    PipelineFactory(Arc<dyn PipelineFactory>),
}

impl OptionValue {
    /// Short name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Str(_) => "string",
            Self::StrList(_) => "string list",
            Self::TlsContext(_) => "TLS context",
            Self::BufferFactory(_) => "buffer factory",
            Self::PipelineFactory(_) => "pipeline factory",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Coerce to a string. Scalars are rendered with `Display`.
    pub fn to_string_value(&self, key: &str) -> Result<String, ConfigError> {
        match self {
            Self::Str(s) => Ok(s.clone()),
            Self::Bool(b) => Ok(b.to_string()),
            Self::Int(i) => Ok(i.to_string()),
            other => Err(other.mismatch(key, "a string")),
        }
    }

    /// Coerce to an optional string; `Null` clears.
    pub fn to_optional_string(&self, key: &str) -> Result<Option<String>, ConfigError> {
        match self {
            Self::Null => Ok(None),
            other => other.to_string_value(key).map(Some),
        }
    }

    /// Coerce to a boolean.
    ///
    /// Integers are true when non-zero. Strings are trimmed; an empty string
    /// is false, an integer literal follows the integer rule, otherwise the
    /// first letter decides (`t`/`y` true, `f`/`n` false).
    pub fn to_bool(&self, key: &str) -> Result<bool, ConfigError> {
        match self {
            Self::Bool(b) => Ok(*b),
            Self::Int(i) => Ok(*i != 0),
            Self::Str(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Ok(false);
                }
                if let Ok(n) = s.parse::<i64>() {
                    return Ok(n != 0);
                }
                match s.chars().next().map(|c| c.to_ascii_lowercase()) {
                    Some('t') | Some('y') => Ok(true),
                    Some('f') | Some('n') => Ok(false),
                    _ => Err(ConfigError::invalid(
                        key,
                        format!("cannot interpret {:?} as a boolean", s),
                    )),
                }
            }
            other => Err(other.mismatch(key, "a boolean")),
        }
    }

    /// Coerce to a 32-bit integer.
    pub fn to_i32(&self, key: &str) -> Result<i32, ConfigError> {
        let wide = match self {
            Self::Int(i) => *i,
            Self::Str(s) => s.trim().parse::<i64>().map_err(|e| {
                ConfigError::invalid(key, format!("cannot parse {:?} as an integer: {}", s, e))
            })?,
            other => return Err(other.mismatch(key, "an integer")),
        };

        i32::try_from(wide)
            .map_err(|_| ConfigError::invalid(key, format!("{} is out of range", wide)))
    }

    /// Coerce to an ordered list of strings; `Null` clears.
    ///
    /// A single string is split on commas and whitespace, dropping empty items.
    pub fn to_string_list(&self, key: &str) -> Result<Option<Vec<String>>, ConfigError> {
        match self {
            Self::Null => Ok(None),
            Self::StrList(items) => Ok(Some(items.clone())),
            Self::Str(s) => Ok(Some(
                s.split(LIST_SEPARATORS)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
            other => Err(other.mismatch(key, "a list of strings")),
        }
    }

    /// Coerce to a TLS context handle; `Null` clears.
    pub fn to_tls_context(&self, key: &str) -> Result<Option<TlsContext>, ConfigError> {
        match self {
            Self::Null => Ok(None),
            Self::TlsContext(ctx) => Ok(Some(ctx.clone())),
            other => Err(other.mismatch(key, "a TLS context")),
        }
    }

    pub fn to_buffer_factory(&self, key: &str) -> Result<Arc<dyn BufferFactory>, ConfigError> {
        match self {
            Self::BufferFactory(factory) => Ok(Arc::clone(factory)),
            other => Err(other.mismatch(key, "a buffer factory")),
        }
    }

    pub fn to_pipeline_factory(&self, key: &str) -> Result<Arc<dyn PipelineFactory>, ConfigError> {
        match self {
            Self::PipelineFactory(factory) => Ok(Arc::clone(factory)),
            other => Err(other.mismatch(key, "a pipeline factory")),
        }
    }

    fn mismatch(&self, key: &str, expected: &str) -> ConfigError {
        ConfigError::invalid(key, format!("expected {}, got {}", expected, self.type_name()))
    }
}

impl fmt::Debug for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Self::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Self::StrList(items) => f.debug_tuple("StrList").field(items).finish(),
            Self::TlsContext(ctx) => f.debug_tuple("TlsContext").field(ctx).finish(),
            Self::BufferFactory(factory) => f.debug_tuple("BufferFactory").field(factory).finish(),
            Self::PipelineFactory(factory) => f
                .debug_tuple("PipelineFactory")
                .field(&factory.name())
                .finish(),
        }
    }
}

/// Handles compare by identity, everything else by value
impl PartialEq for OptionValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::StrList(a), Self::StrList(b)) => a == b,
            (Self::TlsContext(a), Self::TlsContext(b)) => a == b,
            (Self::BufferFactory(a), Self::BufferFactory(b)) => Arc::ptr_eq(a, b),
            (Self::PipelineFactory(a), Self::PipelineFactory(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(value: Vec<String>) -> Self {
        Self::StrList(value)
    }
}

impl From<&[&str]> for OptionValue {
    fn from(value: &[&str]) -> Self {
        Self::StrList(value.iter().map(|s| s.to_string()).collect())
    }
}

impl From<TlsContext> for OptionValue {
    fn from(value: TlsContext) -> Self {
        Self::TlsContext(value)
    }
}

impl From<Arc<dyn BufferFactory>> for OptionValue {
    fn from(value: Arc<dyn BufferFactory>) -> Self {
        Self::BufferFactory(value)
    }
}

impl From<Arc<dyn PipelineFactory>> for OptionValue {
    fn from(value: Arc<dyn PipelineFactory>) -> Self {
        Self::PipelineFactory(value)
    }
}

impl<T: Into<OptionValue>> From<Option<T>> for OptionValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Ordered key/value option map.
///
/// Entries are applied in insertion order. Inserting an existing key
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionMap {
    entries: Vec<(String, OptionValue)>,
}

impl OptionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry, returning the previous value
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<OptionValue>,
    ) -> Option<OptionValue> {
        let key = key.into();
        let value = value.into();

        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for OptionMap
where
    K: Into<String>,
    V: Into<OptionValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for OptionMap
where
    K: Into<String>,
    V: Into<OptionValue>,
{
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl From<HashMap<String, OptionValue>> for OptionMap {
    fn from(map: HashMap<String, OptionValue>) -> Self {
        map.into_iter().collect()
    }
}

impl From<BTreeMap<String, OptionValue>> for OptionMap {
    fn from(map: BTreeMap<String, OptionValue>) -> Self {
        map.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_coercion() {
        assert!(OptionValue::from(true).to_bool("k").unwrap());
        assert!(OptionValue::from(7).to_bool("k").unwrap());
        assert!(!OptionValue::from(0).to_bool("k").unwrap());
        assert!(OptionValue::from("true").to_bool("k").unwrap());
        assert!(OptionValue::from(" Yes ").to_bool("k").unwrap());
        assert!(!OptionValue::from("false").to_bool("k").unwrap());
        assert!(!OptionValue::from("no").to_bool("k").unwrap());
        assert!(!OptionValue::from("").to_bool("k").unwrap());
        assert!(OptionValue::from("1").to_bool("k").unwrap());
        assert!(!OptionValue::from("0").to_bool("k").unwrap());
    }

    #[test]
    fn test_bool_coercion_failure() {
        let err = OptionValue::from("maybe").to_bool("keepAlive").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidArgument { ref key, .. } if key == "keepAlive"));

        assert!(OptionValue::Null.to_bool("k").is_err());
        assert!(OptionValue::StrList(vec![]).to_bool("k").is_err());
    }

    #[test]
    fn test_int_coercion() {
        assert_eq!(OptionValue::from(42).to_i32("k").unwrap(), 42);
        assert_eq!(OptionValue::from(" 8192 ").to_i32("k").unwrap(), 8192);
        assert!(OptionValue::from("big").to_i32("k").is_err());
        assert!(OptionValue::Int(i64::MAX).to_i32("k").is_err());
        assert!(OptionValue::from(true).to_i32("k").is_err());
    }

    #[test]
    fn test_string_coercion() {
        assert_eq!(OptionValue::from("a").to_string_value("k").unwrap(), "a");
        assert_eq!(OptionValue::from(5).to_string_value("k").unwrap(), "5");
        assert_eq!(OptionValue::Null.to_optional_string("k").unwrap(), None);
        assert!(OptionValue::Null.to_string_value("k").is_err());
    }

    #[test]
    fn test_string_list_coercion() {
        let split = OptionValue::from("TLSv1.2, TLSv1.3\tx")
            .to_string_list("k")
            .unwrap();
        assert_eq!(
            split,
            Some(vec![
                "TLSv1.2".to_string(),
                "TLSv1.3".to_string(),
                "x".to_string()
            ])
        );

        let gaps = OptionValue::from("a,,b, ,c,").to_string_list("k").unwrap();
        assert_eq!(
            gaps,
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );

        let list = OptionValue::from(&["b", "a"][..]).to_string_list("k").unwrap();
        assert_eq!(list, Some(vec!["b".to_string(), "a".to_string()]));

        assert_eq!(OptionValue::Null.to_string_list("k").unwrap(), None);
        assert!(OptionValue::from(3).to_string_list("k").is_err());
    }

    #[test]
    fn test_option_map_order_and_replace() {
        let mut map: OptionMap = [("b", 1), ("a", 2)].into();
        assert_eq!(map.insert("b", 3), Some(OptionValue::Int(1)));
        map.insert("c", "x");

        let keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(map.get("b"), Some(&OptionValue::Int(3)));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_from_option() {
        assert_eq!(OptionValue::from(None::<String>), OptionValue::Null);
        assert_eq!(OptionValue::from(Some("x")), OptionValue::from("x"));
    }
}
