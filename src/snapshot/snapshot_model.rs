use crate::fingerprint::fingerprint_model::ElementDescriptor;

/// How an element's parent can be addressed in a positional locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentAnchor {
    Id(String),
    Tag(String),
}

/// Position of an element in the snapshot tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeContext {
    pub parent: Option<ParentAnchor>,
    /// 1-based index among siblings sharing the same tag.
    pub nth_of_type: usize,
}

impl Default for TreeContext {
    fn default() -> Self {
        Self {
            parent: None,
            nth_of_type: 1,
        }
    }
}

/// One element read out of a markup snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSnapshot {
    pub id: Option<String>,
    pub descriptor: ElementDescriptor,
    pub context: TreeContext,
}

/// An identifier-bearing snapshot element eligible as a heal target.
///
/// Only lives for the duration of one heal attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub element: ElementSnapshot,
}

impl Candidate {
    /// Returns `None` for elements without a non-empty `id`.
    pub fn from_element(element: ElementSnapshot) -> Option<Self> {
        let id = element.id.clone().filter(|id| !id.is_empty())?;
        Some(Self { id, element })
    }

    pub fn descriptor(&self) -> &ElementDescriptor {
        &self.element.descriptor
    }
}
