//! Pins: typed input/output slots on a patch

use crate::error::ValidationError;
use crate::types::{DataType, DataValue, PinDirection, PinKey};
use serde::{Deserialize, Serialize};

/// Typed slot on a patch interface
///
/// A pin is either a custom pin stored on its patch or derived from an I/O
/// terminal node (see [`Patch::list_pins`](crate::Patch::list_pins)).
/// Direction is fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    key: PinKey,
    #[serde(rename = "type")]
    data_type: DataType,
    direction: PinDirection,
    #[serde(default)]
    order: u32,
    #[serde(default)]
    injected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<DataValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
}

impl Pin {
    /// Create a pin from raw arguments
    ///
    /// # Errors
    /// - [`ValidationError::InvalidPinKey`] if `key` is empty
    /// - [`ValidationError::InvalidPinType`] if `data_type` is not a known type
    pub fn new(key: &str, data_type: &str, direction: PinDirection) -> Result<Self, ValidationError> {
        let key = PinKey::new(key)?;
        let data_type = DataType::parse(data_type)?;
        Ok(Self::typed(key, data_type, direction))
    }

    /// Create a pin from already validated parts
    #[must_use]
    pub fn typed(key: PinKey, data_type: DataType, direction: PinDirection) -> Self {
        Self {
            key,
            data_type,
            direction,
            order: 0,
            injected: false,
            value: None,
            label: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> &PinKey {
        &self.key
    }

    #[inline]
    #[must_use]
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    #[inline]
    #[must_use]
    pub fn direction(&self) -> PinDirection {
        self.direction
    }

    #[inline]
    #[must_use]
    pub fn is_input(&self) -> bool {
        self.direction == PinDirection::Input
    }

    #[inline]
    #[must_use]
    pub fn is_output(&self) -> bool {
        self.direction == PinDirection::Output
    }

    /// Position among pins of the same direction
    #[inline]
    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }

    #[inline]
    #[must_use]
    pub fn is_injected(&self) -> bool {
        self.injected
    }

    /// Default value shown for the pin
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&DataValue> {
        self.value.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    #[must_use]
    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn injected(mut self, injected: bool) -> Self {
        self.injected = injected;
        self
    }

    /// Attach a default value
    ///
    /// # Errors
    /// [`ValidationError::ValueTypeMismatch`] if the value does not fit the
    /// pin's declared type.
    pub fn with_value(mut self, value: DataValue) -> Result<Self, ValidationError> {
        if !value.fits(&self.data_type) {
            return Err(ValidationError::ValueTypeMismatch {
                key: self.key,
                expected: self.data_type.to_string(),
            });
        }
        self.value = Some(value);
        Ok(self)
    }
}
