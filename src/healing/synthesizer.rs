use crate::snapshot::snapshot_model::{ElementSnapshot, ParentAnchor};

/// Which anchor a synthesized locator is built on, most stable first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorStrategy {
    Id,
    AriaLabel,
    TagAndClasses,
    Position,
}

/// Build a CSS selector for `element`, taking the first strategy that applies:
/// id, aria-label, tag plus classes, then position among same-tag siblings.
pub fn synthesize(element: &ElementSnapshot) -> String {
    synthesize_with_strategy(element).1
}

pub fn synthesize_with_strategy(element: &ElementSnapshot) -> (LocatorStrategy, String) {
    if let Some(id) = element.id.as_deref().filter(|id| !id.is_empty()) {
        return (LocatorStrategy::Id, id_selector(id));
    }

    let descriptor = &element.descriptor;

    if let Some(label) = descriptor.aria_label.as_deref() {
        return (
            LocatorStrategy::AriaLabel,
            format!("[aria-label=\"{}\"]", escape_string(label)),
        );
    }

    let tag = descriptor.tag_name.to_ascii_lowercase();

    if !descriptor.class_names.is_empty() {
        let classes: String = descriptor
            .class_names
            .iter()
            .map(|c| class_selector(c))
            .collect();
        return (LocatorStrategy::TagAndClasses, format!("{}{}", tag, classes));
    }

    let positional = format!("{}:nth-of-type({})", tag, element.context.nth_of_type);
    let selector = match &element.context.parent {
        Some(ParentAnchor::Id(id)) => format!("{} > {}", id_selector(id), positional),
        Some(ParentAnchor::Tag(parent_tag)) => {
            format!("{} > {}", parent_tag.to_ascii_lowercase(), positional)
        }
        None => positional,
    };
    (LocatorStrategy::Position, selector)
}

fn id_selector(id: &str) -> String {
    if is_plain_identifier(id) {
        format!("#{}", id)
    } else {
        format!("[id=\"{}\"]", escape_string(id))
    }
}

fn class_selector(token: &str) -> String {
    if is_plain_identifier(token) {
        format!(".{}", token)
    } else {
        format!("[class~=\"{}\"]", escape_string(token))
    }
}

/// True when `s` can be written as a CSS identifier without escaping.
fn is_plain_identifier(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    let Some(first) = body.chars().next() else {
        return false;
    };

    (first.is_ascii_alphabetic() || first == '_')
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn escape_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
