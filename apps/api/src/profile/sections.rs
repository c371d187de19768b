//! Generic list-section editing: drafts, validated upserts, deletion and
//! reordering. Every operation keeps `order` equal to the entry's position.

use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::profile::models::{
    Certificate, Contact, CoverLetter, CustomField, CustomValue, Education, Language,
    ProfileDocument, SectionKind, Skill, SocialProfile, TabDefinition, TabKind, Tool,
    WorkExperience,
};
use crate::profile::validation::{
    date_range, optional_url, require_all, require_non_blank, require_url, ValidationError,
};

pub trait Ordered {
    fn order(&self) -> u32;
    fn set_order(&mut self, order: u32);
}

/// Per-section draft defaults and save-time checks.
pub trait EntryRules {
    fn draft(id: Uuid) -> Self;
    fn validate(&self) -> Result<(), ValidationError>;

    /// Checks against the rest of the document, such as references to tabs.
    fn validate_in(&self, _doc: &ProfileDocument) -> Result<(), ValidationError> {
        self.validate()
    }
}

/// Plumbing that ties an entry type to its list inside [`ProfileDocument`].
pub trait SectionEntry:
    EntryRules + Ordered + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: SectionKind;

    fn id(&self) -> Uuid;
    fn list(doc: &ProfileDocument) -> &Vec<Self>;
    fn list_mut(doc: &mut ProfileDocument) -> &mut Vec<Self>;
}

macro_rules! section_entry {
    ($($ty:ty => $kind:expr, $field:ident;)+) => {
        $(
            impl Ordered for $ty {
                fn order(&self) -> u32 {
                    self.order
                }

                fn set_order(&mut self, order: u32) {
                    self.order = order;
                }
            }

            impl SectionEntry for $ty {
                const KIND: SectionKind = $kind;

                fn id(&self) -> Uuid {
                    self.id
                }

                fn list(doc: &ProfileDocument) -> &Vec<Self> {
                    &doc.$field
                }

                fn list_mut(doc: &mut ProfileDocument) -> &mut Vec<Self> {
                    &mut doc.$field
                }
            }
        )+
    };
}

section_entry! {
    Contact => SectionKind::Contacts, contacts;
    Tool => SectionKind::Tools, tools;
    WorkExperience => SectionKind::WorkExperience, work_experience;
    Education => SectionKind::Education, education;
    Skill => SectionKind::Skills, skills;
    Certificate => SectionKind::Certificates, certificates;
    Language => SectionKind::Languages, languages;
    CustomField => SectionKind::CustomFields, custom_fields;
    CoverLetter => SectionKind::CoverLetters, cover_letters;
    SocialProfile => SectionKind::SocialProfiles, social_profiles;
}

impl Ordered for TabDefinition {
    fn order(&self) -> u32 {
        self.order
    }

    fn set_order(&mut self, order: u32) {
        self.order = order;
    }
}

impl EntryRules for Contact {
    fn draft(id: Uuid) -> Self {
        Contact {
            id,
            kind: "email".to_string(),
            label: String::new(),
            value: String::new(),
            order: 0,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_all(&[("kind", self.kind.as_str()), ("value", self.value.as_str())])
    }
}

impl EntryRules for Tool {
    fn draft(id: Uuid) -> Self {
        Tool {
            id,
            name: String::new(),
            icon_url: None,
            order: 0,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("name", self.name.as_str())?;
        optional_url("icon_url", self.icon_url.as_deref())
    }
}

impl EntryRules for WorkExperience {
    fn draft(id: Uuid) -> Self {
        WorkExperience {
            id,
            company: String::new(),
            role: String::new(),
            location: String::new(),
            start_date: None,
            end_date: None,
            description: String::new(),
            highlights: Vec::new(),
            order: 0,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_all(&[("company", self.company.as_str()), ("role", self.role.as_str())])?;
        date_range(self.start_date, self.end_date)
    }
}

impl EntryRules for Education {
    fn draft(id: Uuid) -> Self {
        Education {
            id,
            institution: String::new(),
            degree: String::new(),
            field_of_study: String::new(),
            start_date: None,
            end_date: None,
            grade: String::new(),
            description: String::new(),
            order: 0,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_all(&[("institution", self.institution.as_str()), ("degree", self.degree.as_str())])?;
        date_range(self.start_date, self.end_date)
    }
}

impl EntryRules for Skill {
    fn draft(id: Uuid) -> Self {
        Skill {
            id,
            name: String::new(),
            category: String::new(),
            level: None,
            order: 0,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("name", self.name.as_str())?;
        match self.level {
            Some(level) if !(1..=5).contains(&level) => Err(ValidationError::OutOfRange {
                field: "level",
                reason: format!("{level} is not between 1 and 5"),
            }),
            _ => Ok(()),
        }
    }
}

impl EntryRules for Certificate {
    fn draft(id: Uuid) -> Self {
        Certificate {
            id,
            name: String::new(),
            issuer: String::new(),
            issued_on: None,
            credential_url: None,
            attachment: None,
            order: 0,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_all(&[("name", self.name.as_str()), ("issuer", self.issuer.as_str())])?;
        optional_url("credential_url", self.credential_url.as_deref())
    }
}

impl EntryRules for Language {
    fn draft(id: Uuid) -> Self {
        Language {
            id,
            name: String::new(),
            proficiency: String::new(),
            order: 0,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_all(&[("name", self.name.as_str()), ("proficiency", self.proficiency.as_str())])
    }
}

impl EntryRules for CustomField {
    fn draft(id: Uuid) -> Self {
        CustomField {
            id,
            tab_id: None,
            label: String::new(),
            value: CustomValue::default(),
            order: 0,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("label", self.label.as_str())?;
        match &self.value {
            CustomValue::Text(text) => require_non_blank("value", text),
            CustomValue::Url(url) => require_url("value", url),
            CustomValue::File(reference) => require_url("value", &reference.url),
        }
    }

    fn validate_in(&self, doc: &ProfileDocument) -> Result<(), ValidationError> {
        self.validate()?;
        match self.tab_id.as_deref() {
            Some(tab) if !is_custom_tab(doc, tab) => Err(ValidationError::UnknownTab(tab.to_string())),
            _ => Ok(()),
        }
    }
}

impl EntryRules for CoverLetter {
    fn draft(id: Uuid) -> Self {
        CoverLetter {
            id,
            title: String::new(),
            company: String::new(),
            body: String::new(),
            order: 0,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_all(&[("title", self.title.as_str()), ("body", self.body.as_str())])
    }
}

impl EntryRules for SocialProfile {
    fn draft(id: Uuid) -> Self {
        SocialProfile {
            id,
            network: String::new(),
            username: String::new(),
            url: String::new(),
            order: 0,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("network", self.network.as_str())?;
        require_url("url", self.url.as_str())
    }
}

fn is_custom_tab(doc: &ProfileDocument, id: &str) -> bool {
    doc.tabs.iter().any(|t| t.id == id && t.kind == TabKind::Custom)
}

/// Rewrites `order` to match positions `0..n`.
pub fn renumber<T: Ordered>(items: &mut [T]) {
    for (rank, item) in items.iter_mut().enumerate() {
        item.set_order(rank as u32);
    }
}

/// Stable sort by stored `order`, then renumber. Used when loading documents
/// written by older clients.
pub fn sort_by_order<T: Ordered>(items: &mut [T]) {
    items.sort_by_key(|item| item.order());
    renumber(items);
}

/// Moves the item at `from` to rank `to` (clamped to the end).
pub fn move_item<T: Ordered>(items: &mut Vec<T>, from: usize, to: usize) {
    if from >= items.len() {
        return;
    }
    let item = items.remove(from);
    let to = to.min(items.len());
    items.insert(to, item);
    renumber(items);
}

/// A fresh, unsaved entry positioned after the current last one.
pub fn draft<T: SectionEntry>(doc: &ProfileDocument) -> T {
    let mut entry = T::draft(Uuid::new_v4());
    entry.set_order(T::list(doc).len() as u32);
    entry
}

pub fn position_of<T: SectionEntry>(doc: &ProfileDocument, id: Uuid) -> Option<usize> {
    T::list(doc).iter().position(|e| e.id() == id)
}

/// Validates and stores `entry`. An existing id is replaced in place and keeps
/// its rank; an unknown id is appended. On validation failure the document is
/// untouched.
pub fn upsert<T: SectionEntry>(doc: &mut ProfileDocument, mut entry: T) -> Result<T, ValidationError> {
    entry.validate_in(doc)?;

    let list = T::list_mut(doc);
    match list.iter().position(|e| e.id() == entry.id()) {
        Some(pos) => {
            entry.set_order(pos as u32);
            list[pos] = entry.clone();
        }
        None => {
            entry.set_order(list.len() as u32);
            list.push(entry.clone());
        }
    }
    Ok(entry)
}

fn validate_addressed<T: SectionEntry>(doc: &ProfileDocument, segment: &str) -> Result<(), ValidationError> {
    let list = T::list(doc);
    let entry = match segment.parse::<usize>() {
        Ok(index) => list.get(index),
        Err(_) => list.iter().find(|e| e.id().to_string() == segment),
    };
    entry.map_or(Ok(()), |e| e.validate_in(doc))
}

/// Re-runs the save-time rules on the entry of `kind` addressed by `segment`
/// (an index or an id), after a field-level edit.
pub fn validate_entry(doc: &ProfileDocument, kind: SectionKind, segment: &str) -> Result<(), ValidationError> {
    match kind {
        SectionKind::Contacts => validate_addressed::<Contact>(doc, segment),
        SectionKind::Tools => validate_addressed::<Tool>(doc, segment),
        SectionKind::WorkExperience => validate_addressed::<WorkExperience>(doc, segment),
        SectionKind::Education => validate_addressed::<Education>(doc, segment),
        SectionKind::Skills => validate_addressed::<Skill>(doc, segment),
        SectionKind::Certificates => validate_addressed::<Certificate>(doc, segment),
        SectionKind::Languages => validate_addressed::<Language>(doc, segment),
        SectionKind::CustomFields => validate_addressed::<CustomField>(doc, segment),
        SectionKind::CoverLetters => validate_addressed::<CoverLetter>(doc, segment),
        SectionKind::SocialProfiles => validate_addressed::<SocialProfile>(doc, segment),
    }
}

/// Removes exactly the entry with `id`. Remaining entries keep their relative order.
pub fn remove<T: SectionEntry>(doc: &mut ProfileDocument, id: Uuid) -> Option<T> {
    let list = T::list_mut(doc);
    let pos = list.iter().position(|e| e.id() == id)?;
    let removed = list.remove(pos);
    renumber(list);
    Some(removed)
}

/// Moves the entry with `id` to rank `position`. Returns `None` for unknown ids.
pub fn reorder<T: SectionEntry>(doc: &mut ProfileDocument, id: Uuid, position: usize) -> Option<()> {
    let list = T::list_mut(doc);
    let from = list.iter().position(|e| e.id() == id)?;
    move_item(list, from, position);
    Some(())
}

/// Sorts every section by stored order and closes gaps.
pub fn normalize_sections(doc: &mut ProfileDocument) {
    sort_by_order(&mut doc.contacts);
    sort_by_order(&mut doc.tools);
    sort_by_order(&mut doc.work_experience);
    sort_by_order(&mut doc.education);
    sort_by_order(&mut doc.skills);
    sort_by_order(&mut doc.certificates);
    sort_by_order(&mut doc.languages);
    sort_by_order(&mut doc.custom_fields);
    sort_by_order(&mut doc.cover_letters);
    sort_by_order(&mut doc.social_profiles);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn skill(name: &str) -> Skill {
        Skill {
            name: name.to_string(),
            ..Skill::draft(Uuid::new_v4())
        }
    }

    fn names(doc: &ProfileDocument) -> Vec<&str> {
        doc.skills.iter().map(|s| s.name.as_str()).collect()
    }

    fn orders(doc: &ProfileDocument) -> Vec<u32> {
        doc.skills.iter().map(|s| s.order).collect()
    }

    fn doc_with(skills: &[&str]) -> ProfileDocument {
        let mut doc = ProfileDocument::default();
        for name in skills {
            upsert(&mut doc, skill(name)).unwrap();
        }
        doc
    }

    #[test]
    fn test_draft_is_not_stored_and_is_positioned_last() {
        let doc = doc_with(&["Rust", "SQL"]);
        let d: Skill = draft(&doc);
        assert_eq!(d.order, 2);
        assert_eq!(doc.skills.len(), 2);
        assert!(d.name.is_empty());
    }

    #[test]
    fn test_drafts_get_unique_ids() {
        let doc = ProfileDocument::default();
        let a: Contact = draft(&doc);
        let b: Contact = draft(&doc);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_upsert_rejects_blank_required_fields() {
        let mut doc = doc_with(&["Rust"]);
        let before = doc.clone();

        assert!(upsert(&mut doc, skill("")).is_err());
        assert!(upsert(&mut doc, skill("   \t")).is_err());
        assert_eq!(doc, before);
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut doc = doc_with(&["Rust", "SQL", "Go"]);
        let mut edited = doc.skills[1].clone();
        edited.name = "PostgreSQL".to_string();
        edited.order = 99;

        let saved = upsert(&mut doc, edited).unwrap();

        assert_eq!(saved.order, 1);
        assert_eq!(names(&doc), vec!["Rust", "PostgreSQL", "Go"]);
        assert_eq!(orders(&doc), vec![0, 1, 2]);
    }

    #[test]
    fn test_remove_exactly_one_and_keep_relative_order() {
        let mut doc = doc_with(&["A", "B", "C", "D"]);
        let ids: Vec<Uuid> = doc.skills.iter().map(|s| s.id).collect();

        let removed: Skill = remove(&mut doc, ids[1]).unwrap();

        assert_eq!(removed.name, "B");
        assert_eq!(names(&doc), vec!["A", "C", "D"]);
        assert_eq!(orders(&doc), vec![0, 1, 2]);
        assert_eq!(doc.skills[1].id, ids[2]);
    }

    #[test]
    fn test_remove_unknown_id() {
        let mut doc = doc_with(&["A"]);
        assert!(remove::<Skill>(&mut doc, Uuid::new_v4()).is_none());
        assert_eq!(doc.skills.len(), 1);
    }

    #[test]
    fn test_reorder_a_before_b() {
        let mut doc = doc_with(&["B", "X", "A"]);
        let ids_before: Vec<Uuid> = doc.skills.iter().map(|s| s.id).collect();
        let a = ids_before[2];
        let b_pos = position_of::<Skill>(&doc, ids_before[0]).unwrap();

        reorder::<Skill>(&mut doc, a, b_pos).unwrap();

        assert_eq!(names(&doc), vec!["A", "B", "X"]);
        assert_eq!(orders(&doc), vec![0, 1, 2]);
        let mut ids_after: Vec<Uuid> = doc.skills.iter().map(|s| s.id).collect();
        let mut expected = ids_before.clone();
        ids_after.sort();
        expected.sort();
        assert_eq!(ids_after, expected);
    }

    #[test]
    fn test_reorder_clamps_position() {
        let mut doc = doc_with(&["A", "B", "C"]);
        let a = doc.skills[0].id;
        reorder::<Skill>(&mut doc, a, 100).unwrap();
        assert_eq!(names(&doc), vec!["B", "C", "A"]);
    }

    #[test]
    fn test_sort_by_order_closes_gaps() {
        let mut doc = doc_with(&["A", "B", "C"]);
        doc.skills[0].order = 10;
        doc.skills[1].order = 3;
        doc.skills[2].order = 7;
        normalize_sections(&mut doc);
        assert_eq!(names(&doc), vec!["B", "C", "A"]);
        assert_eq!(orders(&doc), vec![0, 1, 2]);
    }

    #[test]
    fn test_section_specific_rules() {
        let mut job = WorkExperience::draft(Uuid::new_v4());
        job.company = "Acme".to_string();
        job.role = "Engineer".to_string();
        job.start_date = NaiveDate::from_ymd_opt(2022, 1, 1);
        job.end_date = NaiveDate::from_ymd_opt(2021, 1, 1);
        assert_eq!(job.validate(), Err(ValidationError::DateOrder));

        let mut profile = SocialProfile::draft(Uuid::new_v4());
        profile.network = "GitHub".to_string();
        profile.url = "github.com/someone".to_string();
        assert!(matches!(
            profile.validate(),
            Err(ValidationError::InvalidUrl { field: "url" })
        ));

        let mut s = skill("Rust");
        s.level = Some(6);
        assert!(matches!(s.validate(), Err(ValidationError::OutOfRange { .. })));
    }

    #[test]
    fn test_custom_field_value_kinds() {
        let mut field = CustomField::draft(Uuid::new_v4());
        field.label = "Portfolio".to_string();
        assert!(field.validate().is_err());

        field.value = CustomValue::Url("https://example.com".to_string());
        assert!(field.validate().is_ok());

        field.value = CustomValue::Url("example".to_string());
        assert!(field.validate().is_err());

        field.value = CustomValue::Text("  hi ".to_string());
        assert!(field.validate().is_ok());
    }
}
