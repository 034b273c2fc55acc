//! Building identifiers for live elements and resolving them again later.

use crate::driver::{DriverError, ElementHandle, Locator};
use crate::session::{ListedElement, Session};
use wtx_common::selector::xpath_literal;
use wtx_common::{ElementIdentifier, IndexBasis};

/// Tags identified by their position among same-tag elements.
pub const FORM_CONTROL_TAGS: &[&str] = &["input", "button", "textarea", "select"];

async fn non_empty_attribute(
    session: &mut Session,
    handle: &ElementHandle,
    name: &str,
) -> Result<Option<String>, DriverError> {
    Ok(session
        .driver()
        .attribute(handle, name)
        .await?
        .filter(|v| !v.trim().is_empty()))
}

fn same_frame<'a>(
    listing: &'a [ListedElement],
    frame: Option<&'a str>,
) -> impl Iterator<Item = &'a ListedElement> + 'a {
    listing.iter().filter(move |e| e.frame.as_deref() == frame)
}

fn missing(identifier: &ElementIdentifier) -> DriverError {
    DriverError::NotFound(identifier.to_string())
}

/// Chooses the most stable identifier for `element`.
///
/// Precedence: `id`, `name`, tag and index for form controls, class and
/// index, then the raw index in the `basis` listing.
pub async fn identify(
    session: &mut Session,
    element: &ListedElement,
    basis: IndexBasis,
) -> Result<ElementIdentifier, DriverError> {
    let frame = element.frame.clone();
    if let Some(id) = non_empty_attribute(session, &element.handle, "id").await? {
        return Ok(ElementIdentifier::id(id).in_frame(frame));
    }
    if let Some(name) = non_empty_attribute(session, &element.handle, "name").await? {
        return Ok(ElementIdentifier::name(name).in_frame(frame));
    }

    let listing = session.list(basis).await?;
    if FORM_CONTROL_TAGS.contains(&element.tag.as_str()) {
        let index = same_frame(&listing, frame.as_deref())
            .filter(|e| e.tag == element.tag)
            .position(|e| e.handle == element.handle)
            .ok_or_else(|| DriverError::NotFound(format!("{} not in listing", element.tag)))?;
        return Ok(ElementIdentifier::tag_index(element.tag.clone(), index, basis).in_frame(frame));
    }

    if let Some(class) = non_empty_attribute(session, &element.handle, "class").await? {
        let mut index = 0;
        for candidate in same_frame(&listing, frame.as_deref()) {
            if candidate.handle == element.handle {
                return Ok(ElementIdentifier::class_index(class, index, basis).in_frame(frame.clone()));
            }
            let candidate_class = session
                .driver()
                .attribute(&candidate.handle, "class")
                .await?;
            if candidate_class.as_deref() == Some(class.as_str()) {
                index += 1;
            }
        }
    }

    let index = same_frame(&listing, frame.as_deref())
        .position(|e| e.handle == element.handle)
        .ok_or_else(|| DriverError::NotFound("element not in listing".into()))?;
    Ok(ElementIdentifier::index(index, basis).in_frame(frame))
}

/// Locates the element described by `identifier` in the current page.
///
/// Index-family identifiers re-run the listing they were built from and
/// fail with `NotFound` when the index is out of range.
pub async fn resolve(
    session: &mut Session,
    identifier: &ElementIdentifier,
) -> Result<ElementHandle, DriverError> {
    let frame = identifier.frame();
    let locator = match identifier {
        ElementIdentifier::Id { id, .. } => Some(Locator::Id(id.clone())),
        ElementIdentifier::Name { name, .. } => Some(Locator::Name(name.clone())),
        ElementIdentifier::Xpath { xpath, .. } => Some(Locator::Xpath(xpath.clone())),
        ElementIdentifier::AttributeValue {
            attribute, value, ..
        } => Some(Locator::Xpath(format!(
            "//*[@{}={}]",
            attribute,
            xpath_literal(value)
        ))),
        _ => None,
    };
    if let Some(locator) = locator {
        return session
            .driver()
            .find_element(&locator, frame)
            .await
            .map_err(|e| match e {
                DriverError::NotFound(_) => missing(identifier),
                other => other,
            });
    }

    match identifier {
        ElementIdentifier::Index { index, basis, .. } => {
            let listing = session.list(*basis).await?;
            same_frame(&listing, frame)
                .nth(*index)
                .map(|e| e.handle.clone())
                .ok_or_else(|| missing(identifier))
        }
        ElementIdentifier::TagIndex {
            tag, index, basis, ..
        } => {
            let listing = session.list(*basis).await?;
            same_frame(&listing, frame)
                .filter(|e| e.tag == *tag)
                .nth(*index)
                .map(|e| e.handle.clone())
                .ok_or_else(|| missing(identifier))
        }
        ElementIdentifier::ClassIndex {
            class,
            index,
            basis,
            ..
        } => {
            let listing = session.list(*basis).await?;
            let mut seen = 0;
            for candidate in same_frame(&listing, frame) {
                let candidate_class = session
                    .driver()
                    .attribute(&candidate.handle, "class")
                    .await?;
                if candidate_class.as_deref() == Some(class.as_str()) {
                    if seen == *index {
                        return Ok(candidate.handle.clone());
                    }
                    seen += 1;
                }
            }
            Err(missing(identifier))
        }
        _ => Err(missing(identifier)),
    }
}

/// An identifier plus the handle it last resolved to.
///
/// The identifier is the durable key; the handle is only a cache and is
/// replaced whenever the driver reports it stale.
#[derive(Debug, Clone)]
pub struct ElementWithHandle {
    pub identifier: ElementIdentifier,
    handle: Option<ElementHandle>,
}

impl ElementWithHandle {
    pub fn new(identifier: ElementIdentifier, handle: Option<ElementHandle>) -> Self {
        Self { identifier, handle }
    }

    pub fn cached(&self) -> Option<&ElementHandle> {
        self.handle.as_ref()
    }

    /// A usable handle, re-resolving from the identifier when the cached one is stale.
    pub async fn safe_get(&mut self, session: &mut Session) -> Result<ElementHandle, DriverError> {
        if let Some(handle) = &self.handle {
            match session.driver().tag_name(handle).await {
                Ok(_) => return Ok(handle.clone()),
                Err(DriverError::StaleElement(_)) => {
                    tracing::debug!("Re-resolving stale handle for {}", self.identifier);
                }
                Err(e) => return Err(e),
            }
        }
        session.invalidate_cache();
        let handle = resolve(session, &self.identifier).await?;
        self.handle = Some(handle.clone());
        Ok(handle)
    }
}
