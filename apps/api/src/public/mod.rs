//! Read-only view of the persisted profile for anonymous visitors.

pub mod handlers;

use std::fmt::Write as _;

use serde_json::Value;

use crate::profile::field_path::{self, FieldPathError};
use crate::profile::models::{
    CustomValue, ProfileDocument, SectionKind, TabDefinition, TabKind,
};
use crate::profile::normalize;

/// Cover letters are private to the owner.
pub fn public_view(mut doc: ProfileDocument) -> ProfileDocument {
    normalize(&mut doc);
    doc.cover_letters.clear();
    doc.tabs
        .retain(|tab| tab.id != SectionKind::CoverLetters.as_str());
    doc
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim).unwrap_or("json") {
            "json" => Some(ExportFormat::Json),
            "markdown" | "md" => Some(ExportFormat::Markdown),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Markdown => "text/markdown; charset=utf-8",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ExportFormat::Json => "profile.json",
            ExportFormat::Markdown => "profile.md",
        }
    }
}

/// Plain-text value of one field. Typed custom values copy as their display text.
pub fn copy_text(doc: &ProfileDocument, path: &str) -> Result<String, FieldPathError> {
    let value = field_path::read(doc, path)?;
    if let Value::Object(map) = &value {
        if map.contains_key("type") && map.contains_key("value") {
            if let Ok(custom) = serde_json::from_value::<CustomValue>(value.clone()) {
                return Ok(custom.display().to_string());
            }
        }
    }
    Ok(field_path::as_text(&value))
}

fn date_span(start: Option<chrono::NaiveDate>, end: Option<chrono::NaiveDate>) -> Option<String> {
    let start = start?;
    Some(match end {
        Some(end) => format!("{} – {}", start.format("%b %Y"), end.format("%b %Y")),
        None => format!("{} – Present", start.format("%b %Y")),
    })
}

fn push_line(md: &mut String, label: &str, value: &str) {
    if !value.trim().is_empty() {
        let _ = writeln!(md, "- **{label}:** {value}");
    }
}

fn tab_label<'a>(tabs: &'a [TabDefinition], id: Option<&str>) -> &'a str {
    id.and_then(|id| {
        tabs.iter()
            .find(|t| t.kind == TabKind::Custom && t.id == id)
    })
    .map(|t| t.label.as_str())
    .unwrap_or("General")
}

/// Renders the public view as a markdown CV. Sections appear in tab order and
/// empty sections are skipped.
pub fn render_markdown(doc: &ProfileDocument) -> String {
    let info = &doc.basic_info;
    let mut md = String::new();

    let name = if info.full_name.trim().is_empty() {
        "Curriculum Vitae"
    } else {
        info.full_name.as_str()
    };
    let _ = writeln!(md, "# {name}\n");
    if !info.headline.trim().is_empty() {
        let _ = writeln!(md, "_{}_\n", info.headline.trim());
    }
    push_line(&mut md, "Email", &info.email);
    push_line(&mut md, "Phone", &info.phone);
    push_line(&mut md, "Location", &info.location);
    push_line(&mut md, "Website", &info.website);
    if !info.summary.trim().is_empty() {
        let _ = writeln!(md, "\n{}", info.summary.trim());
    }
    md.push('\n');

    for tab in &doc.tabs {
        let Some(kind) = SectionKind::ALL.iter().find(|k| k.as_str() == tab.id) else {
            continue;
        };
        let before = md.len();
        let _ = writeln!(md, "## {}\n", tab.label);
        let heading_len = md.len();
        render_section(&mut md, doc, *kind);
        if md.len() == heading_len {
            md.truncate(before);
        } else {
            md.push('\n');
        }
    }
    md
}

fn render_section(md: &mut String, doc: &ProfileDocument, kind: SectionKind) {
    match kind {
        SectionKind::Contacts => {
            for c in &doc.contacts {
                let label = if c.label.is_empty() { &c.kind } else { &c.label };
                push_line(md, label, &c.value);
            }
        }
        SectionKind::Tools => {
            let names: Vec<&str> = doc.tools.iter().map(|t| t.name.as_str()).collect();
            if !names.is_empty() {
                let _ = writeln!(md, "{}", names.join(", "));
            }
        }
        SectionKind::WorkExperience => {
            for job in &doc.work_experience {
                let _ = writeln!(md, "### {} — {}", job.role, job.company);
                if let Some(span) = date_span(job.start_date, job.end_date) {
                    let _ = writeln!(md, "_{span}_");
                }
                push_line(md, "Location", &job.location);
                if !job.description.trim().is_empty() {
                    let _ = writeln!(md, "\n{}", job.description.trim());
                }
                for highlight in &job.highlights {
                    let _ = writeln!(md, "- {highlight}");
                }
                md.push('\n');
            }
        }
        SectionKind::Education => {
            for edu in &doc.education {
                let _ = writeln!(md, "### {}", edu.institution);
                let degree = [edu.degree.as_str(), edu.field_of_study.as_str()]
                    .iter()
                    .filter(|s| !s.trim().is_empty())
                    .copied()
                    .collect::<Vec<_>>()
                    .join(", ");
                push_line(md, "Degree", &degree);
                if let Some(span) = date_span(edu.start_date, edu.end_date) {
                    push_line(md, "Dates", &span);
                }
                push_line(md, "Grade", &edu.grade);
                if !edu.description.trim().is_empty() {
                    let _ = writeln!(md, "\n{}", edu.description.trim());
                }
                md.push('\n');
            }
        }
        SectionKind::Skills => {
            for skill in &doc.skills {
                match skill.level {
                    Some(level) => {
                        let _ = writeln!(md, "- {} ({level}/5)", skill.name);
                    }
                    None => {
                        let _ = writeln!(md, "- {}", skill.name);
                    }
                }
            }
        }
        SectionKind::Certificates => {
            for cert in &doc.certificates {
                let mut line = format!("- **{}**", cert.name);
                if !cert.issuer.trim().is_empty() {
                    let _ = write!(line, ", {}", cert.issuer);
                }
                if let Some(date) = cert.issued_on {
                    let _ = write!(line, " ({})", date.format("%b %Y"));
                }
                if let Some(url) = cert.credential_url.as_deref() {
                    let _ = write!(line, " [credential]({url})");
                }
                let _ = writeln!(md, "{line}");
            }
        }
        SectionKind::Languages => {
            for lang in &doc.languages {
                push_line(md, &lang.name, &lang.proficiency);
            }
        }
        SectionKind::CustomFields => {
            for field in &doc.custom_fields {
                let group = tab_label(&doc.tabs, field.tab_id.as_deref());
                let label = format!("{} ({group})", field.label);
                push_line(md, &label, field.value.display());
            }
        }
        SectionKind::SocialProfiles => {
            for social in &doc.social_profiles {
                let text = if social.username.is_empty() {
                    social.url.clone()
                } else {
                    format!("[{}]({})", social.username, social.url)
                };
                push_line(md, &social.network, &text);
            }
        }
        SectionKind::CoverLetters => {}
    }
}
