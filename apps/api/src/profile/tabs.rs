//! Editor tab layout. Built-in tabs always exist and can only be moved or
//! relabelled; custom tabs can also be created and deleted.

use std::collections::HashSet;

use thiserror::Error;
use uuid::Uuid;

use crate::profile::models::{ProfileDocument, TabDefinition, TabKind};
use crate::profile::sections::{move_item, renumber, sort_by_order};
use crate::profile::validation::{require_non_blank, ValidationError};

pub const BUILTIN_TABS: &[(&str, &str)] = &[
    ("basic_info", "Basic Info"),
    ("contacts", "Contacts"),
    ("work_experience", "Work Experience"),
    ("education", "Education"),
    ("skills", "Skills"),
    ("certificates", "Certificates"),
    ("languages", "Languages"),
    ("tools", "Tools"),
    ("social_profiles", "Social Profiles"),
    ("custom_fields", "Custom Fields"),
    ("cover_letters", "Cover Letters"),
];

#[derive(Debug, Error)]
pub enum TabError {
    #[error("tab '{0}' not found")]
    NotFound(String),

    #[error("built-in tab '{0}' cannot be deleted")]
    Builtin(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

fn is_builtin(id: &str) -> bool {
    BUILTIN_TABS.iter().any(|(builtin, _)| *builtin == id)
}

pub fn builtin_tabs() -> Vec<TabDefinition> {
    BUILTIN_TABS
        .iter()
        .enumerate()
        .map(|(rank, (id, label))| TabDefinition {
            id: (*id).to_string(),
            label: (*label).to_string(),
            kind: TabKind::Builtin,
            order: rank as u32,
        })
        .collect()
}

/// Empty profile with the built-in tabs only.
pub fn default_document() -> ProfileDocument {
    ProfileDocument {
        tabs: builtin_tabs(),
        ..ProfileDocument::default()
    }
}

/// Sorts tabs, drops duplicates, fixes kinds, re-adds missing built-ins at the
/// end and closes order gaps. Custom fields pointing at vanished tabs fall back
/// to the general custom-fields tab.
pub fn normalize_tabs(doc: &mut ProfileDocument) {
    sort_by_order(&mut doc.tabs);

    let mut seen = HashSet::new();
    doc.tabs.retain(|tab| seen.insert(tab.id.clone()));

    for tab in doc.tabs.iter_mut() {
        tab.kind = if is_builtin(&tab.id) {
            TabKind::Builtin
        } else {
            TabKind::Custom
        };
    }

    for (id, label) in BUILTIN_TABS {
        if !seen.contains(*id) {
            doc.tabs.push(TabDefinition {
                id: (*id).to_string(),
                label: (*label).to_string(),
                kind: TabKind::Builtin,
                order: 0,
            });
        }
    }
    renumber(&mut doc.tabs);

    let custom_ids: HashSet<&str> = doc
        .tabs
        .iter()
        .filter(|t| t.kind == TabKind::Custom)
        .map(|t| t.id.as_str())
        .collect();
    for field in doc.custom_fields.iter_mut() {
        if field
            .tab_id
            .as_deref()
            .is_some_and(|id| !custom_ids.contains(id))
        {
            field.tab_id = None;
        }
    }
}

pub fn tab_exists(doc: &ProfileDocument, id: &str) -> bool {
    doc.tabs.iter().any(|t| t.id == id)
}

fn position(doc: &ProfileDocument, id: &str) -> Result<usize, TabError> {
    doc.tabs
        .iter()
        .position(|t| t.id == id)
        .ok_or_else(|| TabError::NotFound(id.to_string()))
}

pub fn add_custom_tab(doc: &mut ProfileDocument, label: &str) -> Result<TabDefinition, TabError> {
    require_non_blank("label", label)?;
    let tab = TabDefinition {
        id: Uuid::new_v4().to_string(),
        label: label.trim().to_string(),
        kind: TabKind::Custom,
        order: doc.tabs.len() as u32,
    };
    doc.tabs.push(tab.clone());
    Ok(tab)
}

pub fn rename_tab(doc: &mut ProfileDocument, id: &str, label: &str) -> Result<TabDefinition, TabError> {
    require_non_blank("label", label)?;
    let pos = position(doc, id)?;
    let tab = &mut doc.tabs[pos];
    tab.label = label.trim().to_string();
    Ok(tab.clone())
}

/// Deletes a custom tab. Its custom fields move to the general custom-fields tab.
pub fn delete_tab(doc: &mut ProfileDocument, id: &str) -> Result<TabDefinition, TabError> {
    let pos = position(doc, id)?;
    if doc.tabs[pos].kind == TabKind::Builtin {
        return Err(TabError::Builtin(id.to_string()));
    }
    let removed = doc.tabs.remove(pos);
    renumber(&mut doc.tabs);
    for field in doc.custom_fields.iter_mut() {
        if field.tab_id.as_deref() == Some(id) {
            field.tab_id = None;
        }
    }
    Ok(removed)
}

pub fn move_tab(doc: &mut ProfileDocument, id: &str, target: usize) -> Result<(), TabError> {
    let from = position(doc, id)?;
    move_item(&mut doc.tabs, from, target);
    Ok(())
}
