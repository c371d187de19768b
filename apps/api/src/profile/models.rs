use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attachments::AttachmentRef;

/// Fixed key of the singleton profile row.
pub const PROFILE_DOCUMENT_KEY: &str = "cv-profile";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Contacts,
    Tools,
    WorkExperience,
    Education,
    Skills,
    Certificates,
    Languages,
    CustomFields,
    CoverLetters,
    SocialProfiles,
}

impl SectionKind {
    pub const ALL: [SectionKind; 10] = [
        SectionKind::Contacts,
        SectionKind::Tools,
        SectionKind::WorkExperience,
        SectionKind::Education,
        SectionKind::Skills,
        SectionKind::Certificates,
        SectionKind::Languages,
        SectionKind::CustomFields,
        SectionKind::CoverLetters,
        SectionKind::SocialProfiles,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Contacts => "contacts",
            SectionKind::Tools => "tools",
            SectionKind::WorkExperience => "work_experience",
            SectionKind::Education => "education",
            SectionKind::Skills => "skills",
            SectionKind::Certificates => "certificates",
            SectionKind::Languages => "languages",
            SectionKind::CustomFields => "custom_fields",
            SectionKind::CoverLetters => "cover_letters",
            SectionKind::SocialProfiles => "social_profiles",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicInfo {
    pub full_name: String,
    pub headline: String,
    pub summary: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub website: String,
    pub photo: Option<AttachmentRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkExperience {
    pub id: Uuid,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// `None` while the position is current.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub id: Uuid,
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub field_of_study: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    /// 1 (basic) to 5 (expert).
    #[serde(default)]
    pub level: Option<u8>,
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub issued_on: Option<NaiveDate>,
    #[serde(default)]
    pub credential_url: Option<String>,
    #[serde(default)]
    pub attachment: Option<AttachmentRef>,
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Language {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub proficiency: String,
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CustomValue {
    Text(String),
    Url(String),
    File(AttachmentRef),
}

impl Default for CustomValue {
    fn default() -> Self {
        CustomValue::Text(String::new())
    }
}

impl CustomValue {
    /// Human-readable form used by exports and clipboard copy.
    pub fn display(&self) -> &str {
        match self {
            CustomValue::Text(s) | CustomValue::Url(s) => s,
            CustomValue::File(r) => &r.url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomField {
    pub id: Uuid,
    /// Custom tab the field is shown on; `None` means the general custom-fields tab.
    #[serde(default)]
    pub tab_id: Option<String>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value: CustomValue,
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverLetter {
    pub id: Uuid,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialProfile {
    pub id: Uuid,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabKind {
    Builtin,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabDefinition {
    pub id: String,
    pub label: String,
    pub kind: TabKind,
    pub order: u32,
}

/// The whole CV. Exactly one exists per deployment, stored under
/// [`PROFILE_DOCUMENT_KEY`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileDocument {
    pub basic_info: BasicInfo,
    pub contacts: Vec<Contact>,
    pub tools: Vec<Tool>,
    pub work_experience: Vec<WorkExperience>,
    pub education: Vec<Education>,
    pub skills: Vec<Skill>,
    pub certificates: Vec<Certificate>,
    pub languages: Vec<Language>,
    pub custom_fields: Vec<CustomField>,
    pub cover_letters: Vec<CoverLetter>,
    pub social_profiles: Vec<SocialProfile>,
    pub tabs: Vec<TabDefinition>,
}
