use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A tag offered by the Discord forum channel, mirrored as a GitHub label by name.
pub struct ForumTag {
    pub id: String,
    pub name: String,
}

/// Parses the comma separated additional-labels setting, dropping blank entries.
pub fn parse_additional_labels(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Resolves applied tag ids to tag names; ids missing from the catalog are skipped.
pub fn resolve_tag_names(applied_tag_ids: &[String], catalog: &[ForumTag]) -> Vec<String> {
    applied_tag_ids
        .iter()
        .filter_map(|tag_id| catalog.iter().find(|tag| &tag.id == tag_id))
        .map(|tag| tag.name.clone())
        .collect()
}

/// Maps GitHub label names back to forum tag ids; labels without a tag are ignored.
pub fn resolve_tag_ids<'a>(
    label_names: impl IntoIterator<Item = &'a str>,
    catalog: &[ForumTag],
) -> Vec<String> {
    let mut ids = Vec::new();
    for label in label_names {
        let Some(tag) = catalog.iter().find(|tag| tag.name == label) else {
            continue;
        };
        if !ids.contains(&tag.id) {
            ids.push(tag.id.clone());
        }
    }
    ids
}

/// Builds the issue label list: applied tag names first, then additional labels.
pub fn assemble_issue_labels(tag_names: &[String], additional_labels: &[String]) -> Vec<String> {
    let mut labels: Vec<String> = Vec::with_capacity(tag_names.len() + additional_labels.len());
    for label in tag_names.iter().chain(additional_labels) {
        let label = label.trim();
        if label.is_empty() || labels.iter().any(|existing| existing == label) {
            continue;
        }
        labels.push(label.to_string());
    }
    labels
}
