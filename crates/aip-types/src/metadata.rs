use serde::{Deserialize, Serialize};

/// Attribute that names the field a metadata value belongs to.
pub const NAME_ATTRIBUTE: &str = "name";

/// A single `<value>` element of a package metadata document.
///
/// Attributes keep their insertion order so a document written and read back
/// compares equal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataElement {
    pub attributes: Vec<(String, String)>,
    pub body: String,
}

impl MetadataElement {
    /// Create an element with the given attributes and text body.
    pub fn new(attributes: Vec<(String, String)>, body: impl Into<String>) -> Self {
        Self {
            attributes,
            body: body.into(),
        }
    }

    /// Create a `<value name="...">` element.
    pub fn named(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(vec![(NAME_ATTRIBUTE.to_string(), name.into())], body)
    }

    /// Look up an attribute value.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The `name` attribute, if present.
    pub fn name(&self) -> Option<&str> {
        self.attribute(NAME_ATTRIBUTE)
    }

    /// Append an attribute, builder style.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_element() {
        let e = MetadataElement::named("name", "Physics");
        assert_eq!(e.name(), Some("name"));
        assert_eq!(e.body, "Physics");
    }

    #[test]
    fn attribute_lookup() {
        let e = MetadataElement::named("title", "x").with_attribute("language", "en");
        assert_eq!(e.attribute("language"), Some("en"));
        assert_eq!(e.attribute("missing"), None);
    }

    #[test]
    fn element_without_name() {
        let e = MetadataElement::new(vec![], "body");
        assert!(e.name().is_none());
    }
}
