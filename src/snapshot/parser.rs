use scraper::{ElementRef, Html};

use crate::{
    fingerprint::extractor::describe,
    snapshot::snapshot_model::{Candidate, ElementSnapshot, ParentAnchor, TreeContext},
};

/// A parsed markup snapshot.
///
/// Wraps the html5ever tree; not `Send`, so read what you need out of it and
/// drop it before crossing an `.await`.
pub struct MarkupSnapshot {
    document: Html,
}

impl MarkupSnapshot {
    /// Parse a serialized document or fragment (e.g. `body.innerHTML`).
    /// Malformed markup is recovered the way a browser would.
    pub fn parse(markup: &str) -> Self {
        Self {
            document: Html::parse_document(markup),
        }
    }

    /// Every element in document order.
    pub fn elements(&self) -> Vec<ElementSnapshot> {
        self.element_refs().map(|el| snapshot_of(&el)).collect()
    }

    /// Identifier-bearing elements only, in document order.
    pub fn candidates(&self) -> Vec<Candidate> {
        self.element_refs()
            .filter(|el| el.value().id().is_some_and(|id| !id.is_empty()))
            .filter_map(|el| Candidate::from_element(snapshot_of(&el)))
            .collect()
    }

    /// First element carrying the given `id`.
    pub fn find_by_id(&self, id: &str) -> Option<ElementSnapshot> {
        self.element_refs()
            .find(|el| el.value().id() == Some(id))
            .map(|el| snapshot_of(&el))
    }

    fn element_refs(&self) -> impl Iterator<Item = ElementRef<'_>> {
        self.document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
    }
}

/// Parse `markup` and return its heal candidates.
pub fn enumerate_candidates(markup: &str) -> Vec<Candidate> {
    MarkupSnapshot::parse(markup).candidates()
}

fn snapshot_of(element: &ElementRef<'_>) -> ElementSnapshot {
    ElementSnapshot {
        id: element.value().id().map(str::to_string),
        descriptor: describe(element),
        context: tree_context(element),
    }
}

fn tree_context(element: &ElementRef<'_>) -> TreeContext {
    let name = element.value().name();

    let parent = element.parent().and_then(ElementRef::wrap).map(|p| {
        match p.value().id().filter(|id| !id.is_empty()) {
            Some(id) => ParentAnchor::Id(id.to_string()),
            None => ParentAnchor::Tag(p.value().name().to_string()),
        }
    });

    let preceding_same_tag = element
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|s| s.value().name() == name)
        .count();

    TreeContext {
        parent,
        nth_of_type: preceding_same_tag + 1,
    }
}
