use crate::identifier::ElementIdentifier;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One named difference between two state snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateDifference {
    /// A property has different values; `element` is `None` for page-level properties.
    PropertyValue {
        element: Option<ElementIdentifier>,
        property: String,
        first: Option<String>,
        second: Option<String>,
    },
    /// An element is present in only one of the snapshots.
    MissingElement {
        identifier: ElementIdentifier,
        first: Option<String>,
        second: Option<String>,
    },
    /// A property is present in only one of the snapshots.
    MissingProperty {
        property: String,
        first: Option<String>,
        second: Option<String>,
    },
}

fn or_null(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("null")
}

impl StateDifference {
    pub fn property_value(
        element: Option<ElementIdentifier>,
        property: impl Into<String>,
        first: Option<String>,
        second: Option<String>,
    ) -> Self {
        StateDifference::PropertyValue {
            element,
            property: property.into(),
            first,
            second,
        }
    }

    pub fn first(&self) -> Option<&str> {
        match self {
            StateDifference::PropertyValue { first, .. }
            | StateDifference::MissingElement { first, .. }
            | StateDifference::MissingProperty { first, .. } => first.as_deref(),
        }
    }

    pub fn second(&self) -> Option<&str> {
        match self {
            StateDifference::PropertyValue { second, .. }
            | StateDifference::MissingElement { second, .. }
            | StateDifference::MissingProperty { second, .. } => second.as_deref(),
        }
    }

    /// The key naming what differs, without the values.
    pub fn key(&self) -> String {
        match self {
            StateDifference::PropertyValue {
                element, property, ..
            } => {
                let element = element
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "null".to_string());
                format!("element-{} property-{}", element, property)
            }
            StateDifference::MissingElement { identifier, .. } => identifier.to_string(),
            StateDifference::MissingProperty { property, .. } => format!("prop-{}", property),
        }
    }
}

impl fmt::Display for StateDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (first, second) = match self {
            StateDifference::PropertyValue { first, second, .. }
            | StateDifference::MissingElement { first, second, .. }
            | StateDifference::MissingProperty { first, second, .. } => (first, second),
        };
        write!(
            f,
            "DiffKey:{} V1:{} V2:{}",
            self.key(),
            or_null(first),
            or_null(second)
        )
    }
}
