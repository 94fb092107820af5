//! Topic grammar: building outbound topics and classifying inbound ones.

/// Convention version advertised under `$homie`.
pub const CONVENTION_VERSION: &str = "3.0.0";

/// Base topic used when the application does not configure one.
pub const DEFAULT_BASE_TOPIC: &str = "homie/";

const BROADCAST_SEGMENT: &str = "$broadcast";
const SET_SEGMENT: &str = "set";

/// Topic namespace of one device: a `/`-terminated base topic plus the
/// device id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicScheme {
    base_topic: String,
    device_id: String,
}

impl TopicScheme {
    /// Create a scheme. A missing trailing `/` on the base topic is added.
    #[must_use]
    pub fn new(base_topic: impl Into<String>, device_id: impl Into<String>) -> Self {
        let mut base_topic = base_topic.into();
        if !base_topic.ends_with('/') {
            base_topic.push('/');
        }

        Self {
            base_topic,
            device_id: device_id.into(),
        }
    }

    /// The `/`-terminated base topic.
    #[must_use]
    pub fn base_topic(&self) -> &str {
        &self.base_topic
    }

    /// The device id.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Full topic for a path below the device root, e.g. `$state` or
    /// `temperature/value/$name`.
    #[must_use]
    pub fn topic(&self, suffix: &str) -> String {
        format!("{}{}/{}", self.base_topic, self.device_id, suffix)
    }

    /// Topic of the `$state` device attribute.
    #[must_use]
    pub fn state_topic(&self) -> String {
        self.topic("$state")
    }

    /// Wildcard matching every property `set` topic of this device.
    #[must_use]
    pub fn set_wildcard(&self) -> String {
        self.topic("+/+/set")
    }

    /// Broadcast topic for one level.
    #[must_use]
    pub fn broadcast_topic(&self, level: &str) -> String {
        format!("{}{BROADCAST_SEGMENT}/{level}", self.base_topic)
    }

    /// Classify an inbound topic.
    ///
    /// Returns `None` for anything outside this device's namespace or not
    /// matching the grammar; malformed traffic is dropped, never an error.
    /// Broadcast classification is the loosest rule in the grammar: segments
    /// after the level are ignored entirely.
    #[must_use]
    pub fn parse<'t>(&self, topic: &'t str) -> Option<Inbound<'t>> {
        let rest = topic.strip_prefix(self.base_topic.as_str())?;
        let segments: Vec<&str> = rest.split('/').collect();
        if segments.len() < 2 || segments.iter().any(|segment| segment.is_empty()) {
            return None;
        }

        if segments[0] == BROADCAST_SEGMENT {
            return Some(Inbound::Broadcast { level: segments[1] });
        }

        if segments[0] != self.device_id {
            return None;
        }
        if segments.len() != 4 || segments[3] != SET_SEGMENT {
            return None;
        }

        // `$`-prefixed ids are read-only metadata and cannot be set.
        let property = segments[2];
        if property.starts_with('$') {
            return None;
        }

        let (node, index) = split_node_token(segments[1]);
        Some(Inbound::PropertySet {
            node,
            index,
            property,
        })
    }
}

/// A classified inbound topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound<'t> {
    /// A device-independent broadcast.
    Broadcast {
        /// Broadcast level, the segment after `$broadcast`.
        level: &'t str,
    },
    /// A write request for one property.
    PropertySet {
        /// Node id, with any array index suffix stripped.
        node: &'t str,
        /// Array index when the node token carried an `_<index>` suffix.
        index: Option<i64>,
        /// Property id.
        property: &'t str,
    },
}

/// Split a node topic token into its node id and optional array index.
///
/// The token is split at the last `_`; when the suffix parses as an `i64`
/// the token addresses that index of an array node, otherwise the whole
/// token is the node id.
#[must_use]
pub fn split_node_token(token: &str) -> (&str, Option<i64>) {
    match token.rsplit_once('_') {
        Some((node, suffix)) => match suffix.parse::<i64>() {
            Ok(index) => (node, Some(index)),
            Err(_) => (token, None),
        },
        None => (token, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheme() -> TopicScheme {
        TopicScheme::new("homie/", "sensor1")
    }

    #[test]
    fn topic_generation() {
        let scheme = scheme();

        assert_eq!(scheme.state_topic(), "homie/sensor1/$state");
        assert_eq!(scheme.topic("temp/$name"), "homie/sensor1/temp/$name");
        assert_eq!(scheme.set_wildcard(), "homie/sensor1/+/+/set");
        assert_eq!(scheme.broadcast_topic("alert"), "homie/$broadcast/alert");
    }

    #[test]
    fn base_topic_gains_a_trailing_slash() {
        let scheme = TopicScheme::new("devices", "sensor1");
        assert_eq!(scheme.base_topic(), "devices/");
        assert_eq!(scheme.state_topic(), "devices/sensor1/$state");
    }

    #[test]
    fn foreign_prefix_is_ignored() {
        assert_eq!(scheme().parse("other/sensor1/temp/value/set"), None);
        assert_eq!(scheme().parse("sensor1/temp/value/set"), None);
    }

    #[test]
    fn broadcast_with_level() {
        assert_eq!(
            scheme().parse("homie/$broadcast/alert"),
            Some(Inbound::Broadcast { level: "alert" })
        );
    }

    #[test]
    fn broadcast_extra_segments_are_ignored() {
        assert_eq!(
            scheme().parse("homie/$broadcast/alert/extra/deep"),
            Some(Inbound::Broadcast { level: "alert" })
        );
    }

    #[test]
    fn broadcast_without_level_is_dropped() {
        assert_eq!(scheme().parse("homie/$broadcast"), None);
    }

    #[test]
    fn property_set_is_classified() {
        assert_eq!(
            scheme().parse("homie/sensor1/temp/value/set"),
            Some(Inbound::PropertySet {
                node: "temp",
                index: None,
                property: "value",
            })
        );
    }

    #[test]
    fn array_index_is_extracted_from_the_node_token() {
        assert_eq!(
            scheme().parse("homie/sensor1/relay_3/power/set"),
            Some(Inbound::PropertySet {
                node: "relay",
                index: Some(3),
                property: "power",
            })
        );
    }

    #[test]
    fn negative_indices_parse() {
        assert_eq!(
            scheme().parse("homie/sensor1/shelf_-2/label/set"),
            Some(Inbound::PropertySet {
                node: "shelf",
                index: Some(-2),
                property: "label",
            })
        );
    }

    #[test]
    fn only_the_last_underscore_separates_the_index() {
        assert_eq!(
            scheme().parse("homie/sensor1/outlet_strip_2/power/set"),
            Some(Inbound::PropertySet {
                node: "outlet_strip",
                index: Some(2),
                property: "power",
            })
        );
    }

    #[test]
    fn non_numeric_suffix_is_part_of_the_node_id() {
        assert_eq!(
            scheme().parse("homie/sensor1/door_front/state/set"),
            Some(Inbound::PropertySet {
                node: "door_front",
                index: None,
                property: "state",
            })
        );
    }

    #[test]
    fn wrong_segment_counts_are_dropped() {
        assert_eq!(scheme().parse("homie/sensor1/temp/set"), None);
        assert_eq!(scheme().parse("homie/sensor1/temp/value/extra/set"), None);
        assert_eq!(scheme().parse("homie/sensor1"), None);
    }

    #[test]
    fn missing_set_suffix_is_dropped() {
        assert_eq!(scheme().parse("homie/sensor1/temp/value/get"), None);
    }

    #[test]
    fn metadata_properties_cannot_be_set() {
        assert_eq!(scheme().parse("homie/sensor1/temp/$name/set"), None);
    }

    #[test]
    fn empty_segments_are_dropped() {
        assert_eq!(scheme().parse("homie/sensor1//value/set"), None);
        assert_eq!(scheme().parse("homie/sensor1/temp/value/set/"), None);
        assert_eq!(scheme().parse("homie/"), None);
    }

    #[test]
    fn other_device_ids_are_ignored() {
        assert_eq!(scheme().parse("homie/sensor2/temp/value/set"), None);
        assert_eq!(scheme().parse("homie/$implementation/reset/now/set"), None);
    }

    #[test]
    fn node_token_splitting() {
        assert_eq!(split_node_token("relay"), ("relay", None));
        assert_eq!(split_node_token("relay_7"), ("relay", Some(7)));
        assert_eq!(split_node_token("a_b_3"), ("a_b", Some(3)));
        assert_eq!(split_node_token("relay_x"), ("relay_x", None));
        assert_eq!(split_node_token("_5"), ("", Some(5)));
    }
}
