//! Property capability trait and the in-memory container.

use std::collections::BTreeMap;

/// A single named value slot with metadata.
///
/// Attributes are free-form string pairs; reading an absent attribute yields
/// an empty string. Value storage is either one scalar string or one string
/// per array index, with unset slots reading as empty.
pub trait Property {
    /// Property id, unique within its node.
    fn id(&self) -> &str;

    /// Attribute value, or `""` when the attribute is not set.
    fn attribute(&self, name: &str) -> String;

    /// Set an attribute.
    fn set_attribute(&mut self, name: &str, value: &str);

    /// Attribute names in natural key order.
    fn attribute_names(&self) -> Vec<String>;

    /// Current scalar value, or `""` when never set.
    fn value(&self) -> String;

    /// Set the scalar value.
    fn set_value(&mut self, value: &str);

    /// Current value at an array index, or `""` when never set.
    fn value_at(&self, index: i64) -> String;

    /// Set the value at an array index.
    fn set_value_at(&mut self, index: i64, value: &str);

    /// Human-readable name.
    fn name(&self) -> String {
        self.attribute("name")
    }

    /// Payload datatype advertised to controllers.
    fn datatype(&self) -> String {
        self.attribute("datatype")
    }

    /// Unit of measurement.
    fn unit(&self) -> String {
        self.attribute("unit")
    }

    /// Format constraint for the datatype.
    fn format(&self) -> String {
        self.attribute("format")
    }

    /// Whether controllers may write this property.
    fn settable(&self) -> bool {
        self.attribute("settable") == "true"
    }

    /// Whether published values are retained at the broker.
    fn retained(&self) -> bool {
        self.attribute("retained") == "true"
    }
}

/// In-memory [`Property`] implementation.
///
/// New properties advertise `datatype=string`, `settable=false` and
/// `retained=true` until configured otherwise.
pub struct SimpleProperty {
    id: String,
    value: String,
    indexed: BTreeMap<i64, String>,
    attributes: BTreeMap<String, String>,
    on_set: Option<Box<dyn FnMut(&str)>>,
}

impl SimpleProperty {
    /// Create a property with default metadata.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let mut attributes = BTreeMap::new();
        attributes.insert("name".to_string(), id.clone());
        attributes.insert("datatype".to_string(), "string".to_string());
        attributes.insert("settable".to_string(), "false".to_string());
        attributes.insert("retained".to_string(), "true".to_string());
        attributes.insert("unit".to_string(), String::new());
        attributes.insert("format".to_string(), String::new());

        Self {
            id,
            value: String::new(),
            indexed: BTreeMap::new(),
            attributes,
            on_set: None,
        }
    }

    /// Set an attribute, builder-style.
    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Set the scalar value, builder-style.
    #[must_use]
    pub fn with_value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    /// Register a callback invoked whenever the scalar value is written,
    /// including writes applied from inbound `set` messages.
    pub fn set_callback(&mut self, callback: impl FnMut(&str) + 'static) {
        self.on_set = Some(Box::new(callback));
    }
}

impl Property for SimpleProperty {
    fn id(&self) -> &str {
        &self.id
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

    fn value(&self) -> String {
        self.value.clone()
    }

    fn set_value(&mut self, value: &str) {
        self.value = value.to_string();
        if let Some(callback) = self.on_set.as_mut() {
            callback(value);
        }
    }

    fn value_at(&self, index: i64) -> String {
        self.indexed.get(&index).cloned().unwrap_or_default()
    }

    fn set_value_at(&mut self, index: i64, value: &str) {
        self.indexed.insert(index, value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn defaults_are_seeded() {
        let prop = SimpleProperty::new("power");

        assert_eq!(prop.id(), "power");
        assert_eq!(prop.name(), "power");
        assert_eq!(prop.datatype(), "string");
        assert!(!prop.settable());
        assert!(prop.retained());
        assert_eq!(prop.unit(), "");
        assert_eq!(prop.format(), "");
    }

    #[test]
    fn absent_attribute_reads_empty() {
        let prop = SimpleProperty::new("power");
        assert_eq!(prop.attribute("no-such-attribute"), "");
    }

    #[test]
    fn scalar_value_round_trip() {
        let mut prop = SimpleProperty::new("power");
        assert_eq!(prop.value(), "");

        prop.set_value("on");
        assert_eq!(prop.value(), "on");
    }

    #[test]
    fn indexed_values_are_independent() {
        let mut prop = SimpleProperty::new("power");
        prop.set_value_at(2, "on");
        prop.set_value_at(-1, "off");

        assert_eq!(prop.value_at(2), "on");
        assert_eq!(prop.value_at(-1), "off");
        assert_eq!(prop.value_at(3), "");
        assert_eq!(prop.value(), "");
    }

    #[test]
    fn callback_observes_scalar_writes() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut prop = SimpleProperty::new("power");
        prop.set_callback(move |value| sink.borrow_mut().push(value.to_string()));

        prop.set_value("on");
        prop.set_value("off");

        assert_eq!(*seen.borrow(), vec!["on".to_string(), "off".to_string()]);
    }

    #[test]
    fn with_attribute_overrides_defaults() {
        let prop = SimpleProperty::new("temperature")
            .with_attribute("datatype", "float")
            .with_attribute("unit", "°C")
            .with_attribute("settable", "true");

        assert_eq!(prop.datatype(), "float");
        assert_eq!(prop.unit(), "°C");
        assert!(prop.settable());
    }
}
