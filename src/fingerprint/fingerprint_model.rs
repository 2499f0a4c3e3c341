use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Descriptive attributes of an element
// ============================================================================

/// The six descriptive attributes compared during healing.
///
/// Shared by stored fingerprints and by live snapshot elements. Every optional
/// field is `None` when the element did not carry a usable value, so a
/// partial descriptor never matches on absence.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDescriptor {
    pub tag_name: String,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub class_names: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
}

impl ElementDescriptor {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.inner_text = Some(text.into());
        self
    }

    pub fn with_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.class_names = classes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_input_type(mut self, input_type: impl Into<String>) -> Self {
        self.input_type = Some(input_type.into());
        self
    }

    pub fn with_aria_label(mut self, label: impl Into<String>) -> Self {
        self.aria_label = Some(label.into());
        self
    }

    /// Space-separated class attribute value, as a browser would report it.
    pub fn class_attr(&self) -> Option<String> {
        if self.class_names.is_empty() {
            None
        } else {
            Some(self.class_names.iter().cloned().collect::<Vec<_>>().join(" "))
        }
    }
}

// ============================================================================
// Stored fingerprint
// ============================================================================

/// Descriptive profile of a previously located element.
///
/// Keyed by `(page_key, id)` in a repository; the page key is the storage
/// partition and is not repeated inside the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    pub id: String,

    #[serde(flatten)]
    pub descriptor: ElementDescriptor,

    pub last_seen_at: DateTime<Utc>,

    /// Identifiers this element was previously known under, oldest first.
    #[serde(default)]
    pub history: Vec<String>,
}

impl Fingerprint {
    pub fn new(id: impl Into<String>, descriptor: ElementDescriptor) -> Self {
        Self {
            id: id.into(),
            descriptor,
            last_seen_at: Utc::now(),
            history: Vec::new(),
        }
    }
}
