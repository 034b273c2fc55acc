use crate::error::CommonError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a composite selector combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeMode {
    /// Elements matched by any child, first occurrence order, no duplicates.
    #[default]
    Union,
    /// Elements matched by every child, ordered as in the first child.
    Intersect,
}

/// `attribute:value` pair used by property selectors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PropertyMatch {
    pub attribute: String,
    pub value: String,
}

impl FromStr for PropertyMatch {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((attribute, value)) if !attribute.trim().is_empty() => Ok(Self {
                attribute: attribute.trim().to_string(),
                value: value.to_string(),
            }),
            _ => Err(CommonError::InvalidProperty(s.to_string())),
        }
    }
}

impl TryFrom<String> for PropertyMatch {
    type Error = CommonError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PropertyMatch> for String {
    fn from(value: PropertyMatch) -> Self {
        format!("{}:{}", value.attribute, value.value)
    }
}

/// A serializable element query.
///
/// Selectors describe sets of elements: the actionable and stateful element
/// listings, equivalence classes, and the targets of `SelectedElements`
/// states are all selectors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Selector {
    All,
    Xpath {
        xpath: String,
    },
    Css {
        css: String,
    },
    Tag {
        tags: Vec<String>,
    },
    Class {
        class: String,
        #[serde(default)]
        contains: bool,
    },
    Property {
        property: PropertyMatch,
        #[serde(default)]
        contains: bool,
        #[serde(default)]
        visible_only: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<usize>,
    },
    First {
        inner: Box<Selector>,
    },
    Composite {
        #[serde(default)]
        mode: CompositeMode,
        selectors: Vec<Selector>,
    },
    Visible {
        inner: Box<Selector>,
    },
}

impl Default for Selector {
    fn default() -> Self {
        Selector::All
    }
}

/// Quotes `value` as an XPath string literal.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{}'", value)
    } else if !value.contains('"') {
        format!("\"{}\"", value)
    } else {
        let parts: Vec<String> = value.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

impl Selector {
    pub fn xpath(xpath: impl Into<String>) -> Self {
        Selector::Xpath {
            xpath: xpath.into(),
        }
    }

    pub fn css(css: impl Into<String>) -> Self {
        Selector::Css { css: css.into() }
    }

    pub fn tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selector::Tag {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn class(class: impl Into<String>) -> Self {
        Selector::Class {
            class: class.into(),
            contains: false,
        }
    }

    pub fn union(selectors: Vec<Selector>) -> Self {
        Selector::Composite {
            mode: CompositeMode::Union,
            selectors,
        }
    }

    pub fn intersect(selectors: Vec<Selector>) -> Self {
        Selector::Composite {
            mode: CompositeMode::Intersect,
            selectors,
        }
    }

    /// The selector as a single XPath expression, when it has one.
    ///
    /// Selectors that post-filter (visibility, maximum count) or combine
    /// children return `None` and are evaluated element by element.
    pub fn as_xpath(&self) -> Option<String> {
        match self {
            Selector::All => Some("//*".to_string()),
            Selector::Xpath { xpath } => Some(xpath.clone()),
            Selector::Css { .. } => None,
            Selector::Tag { tags } if !tags.is_empty() => Some(
                tags.iter()
                    .map(|t| format!("//{}", t))
                    .collect::<Vec<_>>()
                    .join(" | "),
            ),
            Selector::Tag { .. } => None,
            Selector::Class { class, contains } => Some(if *contains {
                format!("//*[contains(@class, {})]", xpath_literal(class))
            } else {
                format!("//*[@class={}]", xpath_literal(class))
            }),
            Selector::Property {
                property,
                contains,
                visible_only: false,
                max: None,
            } => Some(Self::property_xpath(property, *contains)),
            _ => None,
        }
    }

    pub fn property_xpath(property: &PropertyMatch, contains: bool) -> String {
        if contains {
            format!(
                "//*[contains(@{}, {})]",
                property.attribute,
                xpath_literal(&property.value)
            )
        } else {
            format!(
                "//*[@{}={}]",
                property.attribute,
                xpath_literal(&property.value)
            )
        }
    }

    /// Checks structural problems that would otherwise surface mid-run.
    pub fn validate(&self) -> Result<(), CommonError> {
        match self {
            Selector::Composite { selectors, .. } => {
                if selectors.is_empty() {
                    return Err(CommonError::EmptyComposite);
                }
                selectors.iter().try_for_each(Selector::validate)
            }
            Selector::First { inner } | Selector::Visible { inner } => inner.validate(),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css { css } => write!(f, "css({})", css),
            Selector::First { inner } => write!(f, "first({})", inner),
            Selector::Visible { inner } => write!(f, "visible({})", inner),
            Selector::Composite { mode, selectors } => {
                let op = match mode {
                    CompositeMode::Union => " | ",
                    CompositeMode::Intersect => " & ",
                };
                let parts: Vec<String> = selectors.iter().map(|s| s.to_string()).collect();
                write!(f, "({})", parts.join(op))
            }
            Selector::Property {
                property,
                contains,
                visible_only,
                max,
            } => {
                write!(f, "{}", Self::property_xpath(property, *contains))?;
                if *visible_only {
                    write!(f, " visible")?;
                }
                if let Some(max) = max {
                    write!(f, " max {}", max)?;
                }
                Ok(())
            }
            other => write!(f, "{}", other.as_xpath().unwrap_or_default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_selector_is_an_xpath_union() {
        let selector = Selector::tags(["a", "button"]);
        assert_eq!(selector.as_xpath().as_deref(), Some("//a | //button"));
    }

    #[test]
    fn class_selector_exact_and_contains() {
        assert_eq!(
            Selector::class("fav").as_xpath().as_deref(),
            Some("//*[@class='fav']")
        );
        let contains = Selector::Class {
            class: "fav".into(),
            contains: true,
        };
        assert_eq!(
            contains.as_xpath().as_deref(),
            Some("//*[contains(@class, 'fav')]")
        );
    }

    #[test]
    fn literal_quoting_handles_both_quote_kinds() {
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(
            xpath_literal("a'b\"c"),
            "concat('a', \"'\", 'b\"c')"
        );
    }

    #[test]
    fn property_selector_parses_from_yaml() {
        let yaml = "type: property\nproperty: \"role:button\"\nvisible_only: true\nmax: 3\n";
        let selector: Selector = serde_yaml::from_str(yaml).unwrap();
        match &selector {
            Selector::Property {
                property,
                visible_only,
                max,
                ..
            } => {
                assert_eq!(property.attribute, "role");
                assert_eq!(property.value, "button");
                assert!(*visible_only);
                assert_eq!(*max, Some(3));
            }
            other => panic!("unexpected selector {:?}", other),
        }
        assert!(selector.as_xpath().is_none());
    }

    #[test]
    fn malformed_property_is_rejected() {
        let yaml = "type: property\nproperty: \"nocolon\"\n";
        assert!(serde_yaml::from_str::<Selector>(yaml).is_err());
    }

    #[test]
    fn empty_composite_fails_validation() {
        assert_eq!(
            Selector::union(vec![]).validate(),
            Err(CommonError::EmptyComposite)
        );
        assert!(Selector::union(vec![Selector::All]).validate().is_ok());
    }
}
