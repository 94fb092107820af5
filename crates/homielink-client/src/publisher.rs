//! Builders for the retained message sequences the engine publishes.
//!
//! Building is separated from sending: each function turns the current
//! device tree into an ordered `Vec<Message>` without touching the
//! transport, which makes the sequences deterministic and directly
//! comparable in tests.

use homielink_core::{Device, DeviceState, Node, Property};
use homielink_proto::{Message, QoS, TopicScheme, CONVENTION_VERSION};

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// The full device description, published once per engine lifetime on the
/// first successful connection.
///
/// Consumers treat `$state=init` followed by `$state=<real>` as the atomic
/// boundary of a complete description, so the sequence opens and closes
/// with exactly those two publishes. Everything is retained at QoS 1.
pub(crate) fn full_description<D: Device + ?Sized>(
    device: &D,
    topics: &TopicScheme,
) -> Vec<Message> {
    let mut out = Vec::new();

    // Signal that the description is in progress.
    out.push(Message::retained(
        topics.state_topic(),
        DeviceState::Init.as_str(),
    ));

    out.push(Message::retained(topics.topic("$homie"), CONVENTION_VERSION));
    out.push(Message::retained(topics.topic("$name"), device.name()));
    out.push(Message::retained(topics.topic("$localip"), device.local_ip()));
    out.push(Message::retained(topics.topic("$mac"), device.mac()));
    out.push(Message::retained(
        topics.topic("$fw/name"),
        device.firmware_name(),
    ));
    out.push(Message::retained(
        topics.topic("$fw/version"),
        device.firmware_version(),
    ));
    out.push(Message::retained(
        topics.topic("$implementation"),
        device.implementation(),
    ));
    out.push(Message::retained(
        topics.topic("$stats/interval"),
        device.stats_interval(),
    ));

    let mut node_list = Vec::new();
    for node_id in device.node_ids() {
        let Some(node) = device.node(&node_id) else {
            continue;
        };
        let range = node.array_range();

        node_list.push(match range {
            Some(_) => format!("{node_id}[]"),
            None => node_id.clone(),
        });

        out.push(Message::retained(
            topics.topic(&format!("{node_id}/$name")),
            node.name(),
        ));
        out.push(Message::retained(
            topics.topic(&format!("{node_id}/$type")),
            node.node_type(),
        ));

        if let Some((lo, hi)) = range {
            out.push(Message::retained(
                topics.topic(&format!("{node_id}/$array")),
                format!("{lo}-{hi}"),
            ));
            for index in lo..=hi {
                let display = node.name_at(index);
                if !display.is_empty() {
                    out.push(Message::retained(
                        topics.topic(&format!("{node_id}_{index}/$name")),
                        display,
                    ));
                }
            }
        }

        let mut property_list = Vec::new();
        for property_id in node.property_ids() {
            let Some(property) = node.property(&property_id) else {
                continue;
            };
            property_list.push(property_id.clone());

            let attr = |name: &str| topics.topic(&format!("{node_id}/{property_id}/{name}"));
            out.push(Message::retained(attr("$name"), property.name()));
            out.push(Message::retained(
                attr("$settable"),
                bool_str(property.settable()),
            ));
            out.push(Message::retained(
                attr("$retained"),
                bool_str(property.retained()),
            ));
            out.push(Message::retained(attr("$unit"), property.unit()));
            out.push(Message::retained(attr("$datatype"), property.datatype()));
            out.push(Message::retained(attr("$format"), property.format()));

            match range {
                None => {
                    let value = property.value();
                    if !value.is_empty() {
                        out.push(Message::retained(
                            topics.topic(&format!("{node_id}/{property_id}")),
                            value,
                        ));
                    }
                }
                Some((lo, hi)) => {
                    for index in lo..=hi {
                        let value = property.value_at(index);
                        if !value.is_empty() {
                            out.push(Message::retained(
                                topics.topic(&format!("{node_id}_{index}/{property_id}")),
                                value,
                            ));
                        }
                    }
                }
            }
        }

        out.push(Message::retained(
            topics.topic(&format!("{node_id}/$properties")),
            property_list.join(","),
        ));
    }

    out.push(Message::retained(topics.topic("$nodes"), node_list.join(",")));

    let stat_names = device.stat_names();
    for stat in &stat_names {
        out.push(Message::retained(
            topics.topic(&format!("$stats/{stat}")),
            device.stat(stat),
        ));
    }
    out.push(Message::retained(
        topics.topic("$stats"),
        stat_names.join(","),
    ));

    // Description complete; expose the real state.
    out.push(Message::retained(
        topics.state_topic(),
        device.state().as_str(),
    ));

    out
}

/// Messages announcing the current value of one property.
///
/// Resolution mirrors the property-set dispatcher: an unknown node or
/// property, or index addressing on a scalar node, yields no messages. An
/// array node without an index is swept over its whole range, empty slots
/// included. Values carry the property's own retained flag.
pub(crate) fn property_notification<D: Device + ?Sized>(
    device: &D,
    topics: &TopicScheme,
    node_id: &str,
    property_id: &str,
    index: Option<i64>,
) -> Vec<Message> {
    let Some(node) = device.node(node_id) else {
        return Vec::new();
    };
    let Some(property) = node.property(property_id) else {
        return Vec::new();
    };
    let retain = property.retained();

    let value_message =
        |segment: String, payload: String| Message::new(topics.topic(&segment), payload, QoS::AtLeastOnce, retain);

    match (node.array_range(), index) {
        (None, None) => vec![value_message(
            format!("{node_id}/{property_id}"),
            property.value(),
        )],
        (None, Some(_)) => Vec::new(),
        (Some(_), Some(idx)) => vec![value_message(
            format!("{node_id}_{idx}/{property_id}"),
            property.value_at(idx),
        )],
        (Some((lo, hi)), None) => (lo..=hi)
            .map(|idx| {
                value_message(format!("{node_id}_{idx}/{property_id}"), property.value_at(idx))
            })
            .collect(),
    }
}

/// Messages republishing every stat entry.
pub(crate) fn stats_notification<D: Device + ?Sized>(
    device: &D,
    topics: &TopicScheme,
) -> Vec<Message> {
    device
        .stat_names()
        .iter()
        .map(|stat| Message::retained(topics.topic(&format!("$stats/{stat}")), device.stat(stat)))
        .collect()
}
