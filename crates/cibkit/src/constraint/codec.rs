//! Conversion between constraint fields and XML elements.
//!
//! Order and colocation constraints share one projector; the kind only
//! decides the tag and the names of the two primitive attributes.

use crate::types::ConstraintKind;
use crate::xml::Element;
use serde::Serialize;
use std::collections::BTreeMap;

/// Attribute keys that never reach the element.
const RESERVED: &[&str] = &["type"];

/// Fields of one constraint, independent of its kind.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ConstraintFields {
    /// Constraint id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// First primitive (`first` / `rsc`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    /// Second primitive (`then` / `with-rsc`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub second: Option<String>,
    /// Score as written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<String>,
    /// Any other attribute (`first-action`, `kind`, `symmetrical`...)
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl ConstraintFields {
    /// Fields with all four required values set.
    pub fn new(
        id: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
        score: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            first: Some(first.into()),
            second: Some(second.into()),
            score: Some(score.into()),
            extra: BTreeMap::new(),
        }
    }

    /// Whether no field is set at all.
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.first.is_none()
            && self.second.is_none()
            && self.score.is_none()
            && self.extra.is_empty()
    }

    /// Names of the required fields that are not set.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("id", &self.id),
            ("first", &self.first),
            ("second", &self.second),
            ("score", &self.score),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().is_none_or(str::is_empty))
        .map(|(name, _)| name)
        .collect()
    }

    /// Overlay every field set in `delta`.
    pub fn merge(&mut self, delta: &ConstraintFields) {
        if delta.id.is_some() {
            self.id.clone_from(&delta.id);
        }
        if delta.first.is_some() {
            self.first.clone_from(&delta.first);
        }
        if delta.second.is_some() {
            self.second.clone_from(&delta.second);
        }
        if delta.score.is_some() {
            self.score.clone_from(&delta.score);
        }
        self.extra
            .extend(delta.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

/// Build the element for a constraint.
///
/// Returns `None` when there is nothing to encode or a value cannot be
/// represented in XML. An absent id produces no `id` attribute.
pub fn encode(kind: ConstraintKind, fields: &ConstraintFields) -> Option<Element> {
    let named = [
        ("id", fields.id.as_deref()),
        (kind.first_attribute(), fields.first.as_deref()),
        (kind.second_attribute(), fields.second.as_deref()),
        ("score", fields.score.as_deref()),
    ];
    let attributes: Vec<(&str, &str)> = named
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .chain(
            fields
                .extra
                .iter()
                .filter(|(k, _)| !RESERVED.contains(&k.as_str()))
                .map(|(k, v)| (k.as_str(), v.as_str())),
        )
        .collect();

    if attributes.is_empty() {
        return None;
    }
    if !attributes
        .iter()
        .all(|(name, value)| is_attribute_name(name) && is_attribute_value(value))
    {
        return None;
    }

    Some(
        attributes
            .into_iter()
            .fold(Element::new(kind.tag()), |element, (name, value)| {
                element.with_attribute(name, value)
            }),
    )
}

/// Read a constraint element back into its kind and fields.
pub fn decode(element: &Element) -> Option<(ConstraintKind, ConstraintFields)> {
    let kind = ConstraintKind::from_tag(&element.name)?;
    let mut fields = ConstraintFields::default();

    for (name, value) in &element.attributes {
        let value = Some(value.clone());
        match name.as_str() {
            "id" => fields.id = value,
            "score" => fields.score = value,
            n if n == kind.first_attribute() => fields.first = value,
            n if n == kind.second_attribute() => fields.second = value,
            _ => {
                fields.extra.insert(name.clone(), value.unwrap_or_default());
            }
        }
    }
    Some((kind, fields))
}

/// Minimal element selecting a constraint for deletion.
pub fn removal_element(kind: ConstraintKind, id: &str) -> Element {
    Element::new(kind.tag()).with_attribute("id", id)
}

fn is_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == ':')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'))
}

fn is_attribute_value(value: &str) -> bool {
    value
        .chars()
        .all(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_order() {
        let fields = ConstraintFields::new("order1", "vip", "webserver", "INFINITY");
        let element = encode(ConstraintKind::Order, &fields).unwrap();
        assert_eq!(
            element.to_xml().unwrap(),
            r#"<rsc_order id="order1" first="vip" then="webserver" score="INFINITY"/>"#
        );
    }

    #[test]
    fn test_encode_colocation_uses_rsc_pair() {
        let fields = ConstraintFields::new("colo1", "web", "vip", "-100");
        let element = encode(ConstraintKind::Colocation, &fields).unwrap();
        assert_eq!(element.name, "rsc_colocation");
        assert_eq!(element.attribute("rsc"), Some("web"));
        assert_eq!(element.attribute("with-rsc"), Some("vip"));
        assert_eq!(element.attribute("first"), None);
    }

    #[test]
    fn test_decode_restores_fields() {
        let fields = ConstraintFields::new("colo1", "web", "vip", "INFINITY");
        let element = encode(ConstraintKind::Colocation, &fields).unwrap();
        assert_eq!(decode(&element), Some((ConstraintKind::Colocation, fields)));

        let mut with_extra = ConstraintFields::new("order1", "a", "b", "0");
        with_extra
            .extra
            .insert("first-action".to_string(), "promote".to_string());
        let element = encode(ConstraintKind::Order, &with_extra).unwrap();
        assert_eq!(decode(&element).unwrap().1, with_extra);
    }

    #[test]
    fn test_encode_without_id_or_content() {
        let fields = ConstraintFields {
            first: Some("vip".to_string()),
            ..ConstraintFields::default()
        };
        let element = encode(ConstraintKind::Order, &fields).unwrap();
        assert_eq!(element.id(), None);

        assert!(encode(ConstraintKind::Order, &ConstraintFields::default()).is_none());
    }

    #[test]
    fn test_encode_rejects_unrepresentable_values() {
        let mut fields = ConstraintFields::new("order1", "vip\u{1}", "web", "0");
        assert!(encode(ConstraintKind::Order, &fields).is_none());

        fields.first = Some("vip".to_string());
        fields.extra.insert("bad name".to_string(), "x".to_string());
        assert!(encode(ConstraintKind::Order, &fields).is_none());
    }

    #[test]
    fn test_type_key_is_not_projected() {
        let mut fields = ConstraintFields::new("order1", "vip", "web", "0");
        fields.extra.insert("type".to_string(), "rsc_order".to_string());
        let element = encode(ConstraintKind::Order, &fields).unwrap();
        assert_eq!(element.attribute("type"), None);
    }

    #[test]
    fn test_missing_and_merge() {
        let mut fields = ConstraintFields {
            id: Some("order1".to_string()),
            score: Some(String::new()),
            ..ConstraintFields::default()
        };
        assert_eq!(fields.missing(), ["first", "second", "score"]);

        fields.merge(&ConstraintFields {
            first: Some("vip".to_string()),
            second: Some("web".to_string()),
            score: Some("INFINITY".to_string()),
            ..ConstraintFields::default()
        });
        assert!(fields.missing().is_empty());
        assert_eq!(fields.id.as_deref(), Some("order1"));
    }

    #[test]
    fn test_removal_element_carries_only_id() {
        let element = removal_element(ConstraintKind::Order, "order1");
        assert_eq!(element.to_xml().unwrap(), r#"<rsc_order id="order1"/>"#);
    }
}
