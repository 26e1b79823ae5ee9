//! Editor configuration.
//!
//! All structures deserialize with `#[serde(default)]`, so a partial document (or `{}`) yields
//! a usable configuration.

use serde::{Deserialize, Serialize};

/// Default placeholder text for folded regions without a title.
pub const DEFAULT_FOLD_PLACEHOLDER: &str = "...";

/// Default tab width, in cells.
pub const DEFAULT_TAB_WIDTH: usize = 4;

/// Visual line layout options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Placeholder shown for a folded region whose title is unset.
    pub fold_placeholder: String,
    /// Tab width used when computing cell widths of render payloads.
    pub tab_width: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            fold_placeholder: DEFAULT_FOLD_PLACEHOLDER.to_string(),
            tab_width: DEFAULT_TAB_WIDTH,
        }
    }
}

impl LayoutConfig {
    /// Tab width clamped to at least one cell.
    pub fn effective_tab_width(&self) -> usize {
        self.tab_width.max(1)
    }
}

/// Top-level configuration of an [`EditorDocument`](crate::document::EditorDocument).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Visual line layout.
    pub layout: LayoutConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.layout.fold_placeholder, "...");
        assert_eq!(config.layout.tab_width, 4);
    }

    #[test]
    fn test_partial_json() {
        let config: EditorConfig = serde_json::from_str(r#"{"layout":{"tab_width":8}}"#).unwrap();
        assert_eq!(config.layout.tab_width, 8);
        assert_eq!(config.layout.fold_placeholder, "...");

        let empty: EditorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, EditorConfig::default());
    }

    #[test]
    fn test_zero_tab_width_is_clamped() {
        let layout = LayoutConfig {
            tab_width: 0,
            ..LayoutConfig::default()
        };
        assert_eq!(layout.effective_tab_width(), 1);
    }
}
