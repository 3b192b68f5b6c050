//! Rendering of change descriptors into a review prompt.

use crate::constants::CODE_CHANGES_PLACEHOLDER;
use crate::models::FileChangeDescriptor;

/// Render descriptors as fenced per-file blocks, one `## File:` heading each.
pub fn render_code_changes(changes: &[FileChangeDescriptor]) -> String {
    changes
        .iter()
        .map(|c| format!("\n## File: {}\n```\n{}\n```", c.path, c.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Substitute the rendered changes for the first `{code_changes}` placeholder.
///
/// A template without the placeholder is returned unchanged.
pub fn apply_template(template: &str, changes: &[FileChangeDescriptor]) -> String {
    if !template.contains(CODE_CHANGES_PLACEHOLDER) {
        tracing::warn!("prompt template has no {CODE_CHANGES_PLACEHOLDER} placeholder");
        return template.to_string();
    }
    template.replacen(CODE_CHANGES_PLACEHOLDER, &render_code_changes(changes), 1)
}
