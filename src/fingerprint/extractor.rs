use scraper::ElementRef;

use crate::{
    fingerprint::{
        fingerprint_model::{ElementDescriptor, Fingerprint},
        normalize::{attribute_value, class_tokens, normalize_text},
    },
    snapshot::snapshot_model::ElementSnapshot,
};

/// Read the descriptive attributes of a parsed element.
///
/// Tag names are reported upper-case, matching the DOM `tagName` property
/// the test runner sends when it learns an element.
pub fn describe(element: &ElementRef<'_>) -> ElementDescriptor {
    let el = element.value();
    let text = element.text().collect::<String>();

    ElementDescriptor {
        tag_name: el.name().to_ascii_uppercase(),
        class_names: class_tokens(el.attr("class")),
        inner_text: normalize_text(&text),
        placeholder: attribute_value(el.attr("placeholder")),
        input_type: attribute_value(el.attr("type")),
        aria_label: attribute_value(el.attr("aria-label")),
    }
}

/// Build a descriptor from loose field values reported by a caller.
///
/// Applies the same omission rules as [`describe`]: blank values are dropped.
pub fn describe_fields(
    tag_name: &str,
    class_name: Option<&str>,
    inner_text: Option<&str>,
    placeholder: Option<&str>,
    input_type: Option<&str>,
    aria_label: Option<&str>,
) -> ElementDescriptor {
    ElementDescriptor {
        tag_name: tag_name.trim().to_string(),
        class_names: class_tokens(class_name),
        inner_text: inner_text.and_then(normalize_text),
        placeholder: attribute_value(placeholder),
        input_type: attribute_value(input_type),
        aria_label: attribute_value(aria_label),
    }
}

/// Fingerprint a located element under the identifier it was found by.
pub fn extract(id: &str, element: &ElementSnapshot) -> Fingerprint {
    Fingerprint::new(id, element.descriptor.clone())
}
