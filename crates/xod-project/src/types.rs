//! Identifiers and scalar types shared by the project model
//!
//! - [`PatchPath`]: validated library-style path addressing a patch
//! - [`NodeId`], [`LinkId`], [`PinKey`]: opaque ids, unique within a patch
//! - [`DataType`] / [`DataValue`]: pin types and the literals they carry
//! - [`Position`]: canvas coordinates of a node

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident => $variant:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap a raw id
            ///
            /// # Errors
            /// Fails when the id is empty or whitespace only.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(ValidationError::$variant(value));
                }
                Ok(Self(value))
            }

            /// Raw string form
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id! {
    /// Identifier of a node, unique within its patch
    NodeId => InvalidNodeId
}

string_id! {
    /// Identifier of a link, unique within its patch
    LinkId => InvalidLinkId
}

string_id! {
    /// Key of a pin, unique within the owning pin collection
    PinKey => InvalidPinKey
}

impl NodeId {
    /// Fresh random id
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Deterministic id derived from a seed
    ///
    /// The same seed always yields the same id.
    #[must_use]
    pub fn derived(seed: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes()).to_string())
    }
}

impl LinkId {
    /// Fresh random id
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Deterministic id derived from a seed
    #[must_use]
    pub fn derived(seed: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_URL, seed.as_bytes()).to_string())
    }
}

impl From<NodeId> for PinKey {
    /// Terminal nodes expose their pin under their own id.
    fn from(id: NodeId) -> Self {
        Self(id.0)
    }
}

/// Path of a patch within a project
///
/// `/`-separated segments of ASCII alphanumerics, `-`, `_`, `.` and `@`.
///
/// # Examples
/// - `xod/core/constant-number`
/// - `@/main`
/// - `42` (legacy numeric patch id)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PatchPath(String);

/// Prefix shared by I/O terminal patch paths
pub const TERMINAL_PREFIX: &str = "xod/built-in/";

impl PatchPath {
    /// Validate and wrap a path
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidPatchPath`] for empty paths, empty
    /// segments or characters outside the allowed set.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ValidationError::invalid_path(value, "empty path"));
        }
        for segment in value.split('/') {
            if segment.is_empty() {
                return Err(ValidationError::invalid_path(value, "empty segment"));
            }
            if let Some(c) = segment
                .chars()
                .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@')))
            {
                let reason = format!("invalid character {c:?} in segment {segment:?}");
                return Err(ValidationError::invalid_path(value, reason));
            }
        }
        Ok(Self(value))
    }

    /// Wrap a path known to be valid at compile time
    pub(crate) fn from_static(value: &'static str) -> Self {
        debug_assert!(Self::new(value).is_ok(), "invalid built-in path {value}");
        Self(value.to_string())
    }

    /// Raw string form
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Last segment
    #[must_use]
    pub fn base_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Local (project-scoped) patches live under `@/`
    #[inline]
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.0.starts_with("@/")
    }

    /// Direction and type of the pin an I/O terminal of this type defines
    ///
    /// `xod/built-in/input-number` → `(Input, Number)`. `None` for ordinary
    /// patch types.
    #[must_use]
    pub fn terminal(&self) -> Option<(PinDirection, DataType)> {
        let rest = self.0.strip_prefix(TERMINAL_PREFIX)?;
        let (direction, type_name) = if let Some(t) = rest.strip_prefix("input-") {
            (PinDirection::Input, t)
        } else if let Some(t) = rest.strip_prefix("output-") {
            (PinDirection::Output, t)
        } else {
            return None;
        };
        DataType::parse(type_name).ok().map(|t| (direction, t))
    }

    /// Terminal patch path for a direction and type
    #[must_use]
    pub fn terminal_for(direction: PinDirection, data_type: &DataType) -> Self {
        Self(format!("{TERMINAL_PREFIX}{direction}-{data_type}"))
    }
}

impl TryFrom<String> for PatchPath {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl FromStr for PatchPath {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<PatchPath> for String {
    fn from(path: PatchPath) -> Self {
        path.0
    }
}

impl Borrow<str> for PatchPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Display for PatchPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Direction of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinDirection {
    /// Consumes values
    Input,
    /// Produces values
    Output,
}

impl Display for PinDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

/// Type of the values a pin carries
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    Number,
    Boolean,
    String,
    Pulse,
    /// Values produced by another patch
    Custom(PatchPath),
}

impl DataType {
    /// Parse a type name
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidPinType`] for names that are neither
    /// primitive types nor patch paths.
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        match name {
            "number" => Ok(Self::Number),
            "boolean" => Ok(Self::Boolean),
            "string" => Ok(Self::String),
            "pulse" => Ok(Self::Pulse),
            other if other.contains('/') => PatchPath::new(other)
                .map(Self::Custom)
                .map_err(|_| ValidationError::InvalidPinType(other.to_string())),
            other => Err(ValidationError::InvalidPinType(other.to_string())),
        }
    }

    /// Canonical name
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Pulse => "pulse",
            Self::Custom(path) => path.as_str(),
        }
    }

    /// Value an unconnected pin of this type starts with
    #[must_use]
    pub fn default_value(&self) -> Option<DataValue> {
        match self {
            Self::Number => Some(DataValue::Number(0.0)),
            Self::Boolean | Self::Pulse => Some(DataValue::Boolean(false)),
            Self::String => Some(DataValue::String(String::new())),
            Self::Custom(_) => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl TryFrom<String> for DataType {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl FromStr for DataType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<DataType> for String {
    fn from(data_type: DataType) -> Self {
        data_type.as_str().to_string()
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Literal carried by a pin
///
/// Serialized as a bare JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl DataValue {
    /// Whether the value is acceptable for a pin of `data_type`
    #[must_use]
    pub fn fits(&self, data_type: &DataType) -> bool {
        matches!(
            (self, data_type),
            (Self::Number(_), DataType::Number)
                | (Self::Boolean(_), DataType::Boolean | DataType::Pulse)
                | (Self::String(_), DataType::String)
        )
    }
}

impl From<f64> for DataValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for DataValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl Display for DataValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

/// Canvas position of a node
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Placeholder position for generated nodes
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
