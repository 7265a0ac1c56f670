use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LayoutError;

// ─── Terminal spec ────────────────────────────────────────────────

/// One terminal's intended configuration.
///
/// Legacy records may still carry `groupId` / `indexInGroup`; serde drops
/// them on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalSpec {
    pub name: String,
    /// Working directory, resolved against the workspace root at apply time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    /// Text sent to the terminal once it exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_name: Option<String>,
}

impl TerminalSpec {
    /// Build a spec with a normalized (trimmed, non-empty) name.
    pub fn new(name: &str) -> Result<Self, LayoutError> {
        Ok(Self {
            name: normalize_name(name)?,
            ..Self::default()
        })
    }

    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = non_blank(Some(cwd.into()));
        self
    }

    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = non_blank(Some(command.into()));
        self
    }

    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile_name = non_blank(Some(profile.into()));
        self
    }

    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = non_blank(Some(color.into()));
        self
    }

    /// Display label with the profile appended, e.g. `api (zsh)`.
    pub fn label(&self) -> String {
        match &self.profile_name {
            Some(profile) => format!("{} ({profile})", self.name),
            None => self.name.clone(),
        }
    }
}

// ─── Groups & layouts ─────────────────────────────────────────────

/// Terminals rendered together as adjacent splits. The first entry is the
/// root; later entries split off it in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalGroup {
    pub id: u32,
    pub terminals: Vec<TerminalSpec>,
}

impl TerminalGroup {
    pub fn new(id: u32, terminals: Vec<TerminalSpec>) -> Self {
        Self { id, terminals }
    }

    /// `[api | web | db]`
    pub fn label(&self) -> String {
        let names: Vec<String> = self.terminals.iter().map(TerminalSpec::label).collect();
        format!("[{}]", names.join(" | "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalLayout {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub groups: Vec<TerminalGroup>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TerminalLayout {
    /// New layout with a fresh id. `name` is normalized; a blank
    /// description is dropped.
    pub fn new(
        name: &str,
        description: Option<String>,
        groups: Vec<TerminalGroup>,
        now: DateTime<Utc>,
    ) -> Result<Self, LayoutError> {
        Ok(Self {
            id: new_layout_id(),
            name: normalize_name(name)?,
            description: non_blank(description),
            groups,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn terminal_count(&self) -> usize {
        self.groups.iter().map(|g| g.terminals.len()).sum()
    }

    /// `3 terminal(s) in 2 groups`
    pub fn summary(&self) -> String {
        format!(
            "{} terminal(s) in {}",
            self.terminal_count(),
            groups_label(self.groups.len())
        )
    }

    /// Merge `patch` over this layout. `id` and `created_at` never change.
    pub fn apply_patch(&mut self, patch: LayoutPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(groups) = patch.groups {
            self.groups = groups;
        }
        self.updated_at = now;
    }
}

/// Partial update for [`TerminalLayout`].
///
/// `id` is accepted so callers can pass a whole record around, but it is
/// always ignored. `groups` replaces the whole sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutPatch {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub groups: Option<Vec<TerminalGroup>>,
}

impl LayoutPatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn description(description: Option<String>) -> Self {
        Self {
            description: Some(description),
            ..Self::default()
        }
    }

    pub fn groups(groups: Vec<TerminalGroup>) -> Self {
        Self {
            groups: Some(groups),
            ..Self::default()
        }
    }
}

// ─── Helpers ──────────────────────────────────────────────────────

/// 32 lowercase hex characters.
pub fn new_layout_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Trim a layout or terminal name, rejecting blank input.
pub fn normalize_name(raw: &str) -> Result<String, LayoutError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LayoutError::Validation("name must not be empty".into()));
    }
    Ok(trimmed.to_string())
}

/// Trim, mapping blank strings to `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn groups_label(count: usize) -> String {
    if count == 1 {
        "1 group".to_string()
    } else {
        format!("{count} groups")
    }
}
