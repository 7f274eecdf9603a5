//! Helpers over dotted package ids.

/// Normalises a display name into an id segment.
///
/// Spaces become dashes and letters are upper-cased.
#[must_use]
pub fn to_id(part: &str) -> String {
    part.replace(' ', "-").to_uppercase()
}

/// Returns the id of the parent of `package_id`.
///
/// A single-segment id has the empty string as parent.
#[must_use]
pub fn parent_package_id(package_id: &str) -> &str {
    package_id
        .rsplit_once('.')
        .map_or("", |(parent, _)| parent)
}

/// Returns the ids of every ancestor of `package_id`, shallowest first.
///
/// The leaf itself is not included.
#[must_use]
pub fn ordered_parent_ids(package_id: &str) -> Vec<String> {
    let mut ancestors: Vec<String> = Vec::new();
    let mut segments = package_id.split('.').peekable();
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            break;
        }
        let id = ancestors
            .last()
            .map_or_else(|| segment.to_owned(), |parent| format!("{parent}.{segment}"));
        ancestors.push(id);
    }
    ancestors
}
