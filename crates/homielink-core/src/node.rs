//! Node capability trait and the in-memory container.

use crate::property::Property;
use std::collections::BTreeMap;

/// A named grouping of properties, either scalar or array.
///
/// An array node is repeated over an inclusive index range `[lo, hi]`.
/// Besides its scalar attributes it can carry per-index attributes, such as
/// a display name for each repetition.
pub trait Node {
    /// Node id, unique within its device.
    fn id(&self) -> &str;

    /// Inclusive index range for an array node, `None` for a scalar node.
    fn array_range(&self) -> Option<(i64, i64)>;

    /// Attribute value, or `""` when the attribute is not set.
    fn attribute(&self, name: &str) -> String;

    /// Set an attribute.
    fn set_attribute(&mut self, name: &str, value: &str);

    /// Attribute names in natural key order.
    fn attribute_names(&self) -> Vec<String>;

    /// Per-index attribute value, or `""` when not set.
    fn attribute_at(&self, index: i64, name: &str) -> String;

    /// Set a per-index attribute.
    fn set_attribute_at(&mut self, index: i64, name: &str, value: &str);

    /// Names of the attributes set for one index, in natural key order.
    fn attribute_names_at(&self, index: i64) -> Vec<String>;

    /// Property ids in natural key order.
    fn property_ids(&self) -> Vec<String>;

    /// Look up a property by id.
    fn property(&self, id: &str) -> Option<&dyn Property>;

    /// Look up a property by id for mutation.
    fn property_mut(&mut self, id: &str) -> Option<&mut (dyn Property + 'static)>;

    /// Whether this node is an array node.
    fn is_array(&self) -> bool {
        self.array_range().is_some()
    }

    /// Human-readable name.
    fn name(&self) -> String {
        self.attribute("name")
    }

    /// Node type advertised to controllers.
    fn node_type(&self) -> String {
        self.attribute("type")
    }

    /// Display name of one array index.
    fn name_at(&self, index: i64) -> String {
        self.attribute_at(index, "name")
    }
}

/// In-memory [`Node`] implementation.
pub struct SimpleNode {
    id: String,
    range: Option<(i64, i64)>,
    properties: BTreeMap<String, Box<dyn Property>>,
    attributes: BTreeMap<String, String>,
    indexed_attributes: BTreeMap<(i64, String), String>,
}

impl SimpleNode {
    /// Create a scalar node.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_range(id, None)
    }

    /// Create an array node repeated over the inclusive range `[lo, hi]`.
    #[must_use]
    pub fn array(id: impl Into<String>, lo: i64, hi: i64) -> Self {
        Self::with_range(id, Some((lo, hi)))
    }

    fn with_range(id: impl Into<String>, range: Option<(i64, i64)>) -> Self {
        let id = id.into();
        let mut attributes = BTreeMap::new();
        attributes.insert("name".to_string(), id.clone());
        attributes.insert("type".to_string(), String::new());

        Self {
            id,
            range,
            properties: BTreeMap::new(),
            attributes,
            indexed_attributes: BTreeMap::new(),
        }
    }

    /// Add a property, replacing any previous property with the same id.
    pub fn add_property(&mut self, property: impl Property + 'static) {
        self.properties
            .insert(property.id().to_string(), Box::new(property));
    }

    /// Add a property, builder-style.
    #[must_use]
    pub fn with_property(mut self, property: impl Property + 'static) -> Self {
        self.add_property(property);
        self
    }

    /// Set an attribute, builder-style.
    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }
}

impl Node for SimpleNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn array_range(&self) -> Option<(i64, i64)> {
        self.range
    }

    fn attribute(&self, name: &str) -> String {
        self.attributes.get(name).cloned().unwrap_or_default()
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        self.attributes.insert(name.to_string(), value.to_string());
    }

    fn attribute_names(&self) -> Vec<String> {
        self.attributes.keys().cloned().collect()
    }

    fn attribute_at(&self, index: i64, name: &str) -> String {
        self.indexed_attributes
            .get(&(index, name.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    fn set_attribute_at(&mut self, index: i64, name: &str, value: &str) {
        self.indexed_attributes
            .insert((index, name.to_string()), value.to_string());
    }

    fn attribute_names_at(&self, index: i64) -> Vec<String> {
        self.indexed_attributes
            .keys()
            .filter(|key| key.0 == index)
            .map(|key| key.1.clone())
            .collect()
    }

    fn property_ids(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    fn property(&self, id: &str) -> Option<&dyn Property> {
        self.properties.get(id).map(|property| &**property)
    }

    fn property_mut(&mut self, id: &str) -> Option<&mut (dyn Property + 'static)> {
        self.properties.get_mut(id).map(|property| &mut **property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::SimpleProperty;

    #[test]
    fn scalar_node_has_no_range() {
        let node = SimpleNode::new("temperature");
        assert!(!node.is_array());
        assert_eq!(node.array_range(), None);
    }

    #[test]
    fn array_node_reports_its_range() {
        let node = SimpleNode::array("relay", 1, 4);
        assert!(node.is_array());
        assert_eq!(node.array_range(), Some((1, 4)));
    }

    #[test]
    fn property_lookup_returns_none_for_unknown_id() {
        let node = SimpleNode::new("temperature");
        assert!(node.property("humidity").is_none());
    }

    #[test]
    fn property_ids_are_sorted() {
        let node = SimpleNode::new("climate")
            .with_property(SimpleProperty::new("humidity"))
            .with_property(SimpleProperty::new("temperature"))
            .with_property(SimpleProperty::new("battery"));

        assert_eq!(node.property_ids(), vec!["battery", "humidity", "temperature"]);
    }

    #[test]
    fn per_index_attributes_are_separate_from_scalar_ones() {
        let mut node = SimpleNode::array("relay", 0, 1);
        node.set_attribute("name", "Relays");
        node.set_attribute_at(0, "name", "Living room");

        assert_eq!(node.name(), "Relays");
        assert_eq!(node.name_at(0), "Living room");
        assert_eq!(node.name_at(1), "");
        assert_eq!(node.attribute_names_at(0), vec!["name"]);
        assert!(node.attribute_names_at(1).is_empty());
    }

    #[test]
    fn property_values_are_reachable_through_the_node() {
        let mut node =
            SimpleNode::new("temperature").with_property(SimpleProperty::new("value"));

        if let Some(property) = node.property_mut("value") {
            property.set_value("21.5");
        }

        assert_eq!(node.property("value").map(Property::value), Some("21.5".to_string()));
    }
}
