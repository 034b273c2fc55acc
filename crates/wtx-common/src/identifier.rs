use serde::{Deserialize, Serialize};
use std::fmt;

/// Which element listing an index-based identifier counts against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexBasis {
    Actionable,
    Stateful,
}

impl fmt::Display for IndexBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexBasis::Actionable => write!(f, "actionable"),
            IndexBasis::Stateful => write!(f, "stateful"),
        }
    }
}

/// A durable description of a DOM element.
///
/// Identifiers are plain values. Two identifiers with the same variant and
/// fields are equal no matter which live element they resolved to when they
/// were created, so they can be used as map keys and persisted freely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum ElementIdentifier {
    Id {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        frame: Option<String>,
    },
    Name {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        frame: Option<String>,
    },
    Xpath {
        xpath: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        frame: Option<String>,
    },
    AttributeValue {
        attribute: String,
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        frame: Option<String>,
    },
    Index {
        index: usize,
        basis: IndexBasis,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        frame: Option<String>,
    },
    TagIndex {
        tag: String,
        index: usize,
        basis: IndexBasis,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        frame: Option<String>,
    },
    ClassIndex {
        class: String,
        index: usize,
        basis: IndexBasis,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        frame: Option<String>,
    },
}

impl ElementIdentifier {
    pub fn id(id: impl Into<String>) -> Self {
        ElementIdentifier::Id {
            id: id.into(),
            frame: None,
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        ElementIdentifier::Name {
            name: name.into(),
            frame: None,
        }
    }

    pub fn xpath(xpath: impl Into<String>) -> Self {
        ElementIdentifier::Xpath {
            xpath: xpath.into(),
            frame: None,
        }
    }

    pub fn attribute_value(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        ElementIdentifier::AttributeValue {
            attribute: attribute.into(),
            value: value.into(),
            frame: None,
        }
    }

    pub fn index(index: usize, basis: IndexBasis) -> Self {
        ElementIdentifier::Index {
            index,
            basis,
            frame: None,
        }
    }

    pub fn tag_index(tag: impl Into<String>, index: usize, basis: IndexBasis) -> Self {
        ElementIdentifier::TagIndex {
            tag: tag.into(),
            index,
            basis,
            frame: None,
        }
    }

    pub fn class_index(class: impl Into<String>, index: usize, basis: IndexBasis) -> Self {
        ElementIdentifier::ClassIndex {
            class: class.into(),
            index,
            basis,
            frame: None,
        }
    }

    /// The frame (by name or id) the element lives in, `None` for the top document.
    pub fn frame(&self) -> Option<&str> {
        match self {
            ElementIdentifier::Id { frame, .. }
            | ElementIdentifier::Name { frame, .. }
            | ElementIdentifier::Xpath { frame, .. }
            | ElementIdentifier::AttributeValue { frame, .. }
            | ElementIdentifier::Index { frame, .. }
            | ElementIdentifier::TagIndex { frame, .. }
            | ElementIdentifier::ClassIndex { frame, .. } => frame.as_deref(),
        }
    }

    pub fn in_frame(mut self, frame_id: Option<String>) -> Self {
        match &mut self {
            ElementIdentifier::Id { frame, .. }
            | ElementIdentifier::Name { frame, .. }
            | ElementIdentifier::Xpath { frame, .. }
            | ElementIdentifier::AttributeValue { frame, .. }
            | ElementIdentifier::Index { frame, .. }
            | ElementIdentifier::TagIndex { frame, .. }
            | ElementIdentifier::ClassIndex { frame, .. } => *frame = frame_id,
        }
        self
    }

    pub fn basis(&self) -> Option<IndexBasis> {
        match self {
            ElementIdentifier::Index { basis, .. }
            | ElementIdentifier::TagIndex { basis, .. }
            | ElementIdentifier::ClassIndex { basis, .. } => Some(*basis),
            _ => None,
        }
    }

    /// Index-based identifiers depend on listing order and break first when the DOM changes.
    pub fn is_positional(&self) -> bool {
        self.basis().is_some()
    }
}

impl fmt::Display for ElementIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementIdentifier::Id { id, .. } => write!(f, "element with id '{}'", id)?,
            ElementIdentifier::Name { name, .. } => write!(f, "element named '{}'", name)?,
            ElementIdentifier::Xpath { xpath, .. } => write!(f, "element at {}", xpath)?,
            ElementIdentifier::AttributeValue {
                attribute, value, ..
            } => write!(f, "element with {}='{}'", attribute, value)?,
            ElementIdentifier::Index { index, basis, .. } => {
                write!(f, "{} element #{}", basis, index)?
            }
            ElementIdentifier::TagIndex {
                tag, index, basis, ..
            } => write!(f, "{} <{}> #{}", basis, tag, index)?,
            ElementIdentifier::ClassIndex {
                class,
                index,
                basis,
                ..
            } => write!(f, "{} element of class '{}' #{}", basis, class, index)?,
        }
        if let Some(frame) = self.frame() {
            write!(f, " in frame '{}'", frame)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_is_by_value() {
        let a = ElementIdentifier::tag_index("input", 2, IndexBasis::Actionable);
        let b = ElementIdentifier::tag_index(String::from("input"), 2, IndexBasis::Actionable);
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));

        let stateful = ElementIdentifier::tag_index("input", 2, IndexBasis::Stateful);
        assert_ne!(b, stateful);
    }

    #[test]
    fn frame_is_part_of_identity() {
        let top = ElementIdentifier::id("save");
        let framed = ElementIdentifier::id("save").in_frame(Some("editor".into()));
        assert_ne!(top, framed);
        assert_eq!(framed.frame(), Some("editor"));
        assert_eq!(framed.to_string(), "element with id 'save' in frame 'editor'");
    }

    #[test]
    fn serialized_form_is_tagged() {
        let id = ElementIdentifier::class_index("fav", 3, IndexBasis::Stateful);
        let json = serde_json::to_value(&id).unwrap();
        assert_eq!(json["by"], "class_index");
        assert_eq!(json["basis"], "stateful");
        assert!(json.get("frame").is_none());
    }
}
