//! Resume document types and the default template.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::SchemaError;

/// Skill categories every document starts with. They are never removed.
pub const DEFAULT_SKILL_CATEGORIES: [&str; 8] = [
    "Architectures",
    "Languages",
    "Frameworks",
    "Libraries",
    "Tools",
    "Databases",
    "Cloud",
    "Others",
];

/// Ordered mapping from skill category to skills.
pub type SkillMap = IndexMap<String, Vec<String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersonalInfo {
    pub name: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExperienceEntry {
    pub title: String,
    pub company: String,
    pub duration: String,
    pub responsibilities: Vec<String>,
}

impl Default for ExperienceEntry {
    fn default() -> Self {
        Self {
            title: String::new(),
            company: String::new(),
            duration: String::new(),
            responsibilities: vec![String::new()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectEntry {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AcademicEntry {
    pub degree: String,
    pub institution: String,
    pub year: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContactEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CertificationEntry {
    pub title: String,
    pub organization: String,
    pub year: String,
}

/// The root document a user edits. One per identity.
///
/// Missing sections decode to their template value; call
/// [`ResumeDocument::normalize`] afterwards to restore the placeholder
/// invariants on anything decoded from outside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResumeDocument {
    pub personal_info: PersonalInfo,
    pub experience: Vec<ExperienceEntry>,
    pub projects: Vec<ProjectEntry>,
    pub about_me: String,
    pub academics: Vec<AcademicEntry>,
    pub contact: Vec<ContactEntry>,
    pub skills: SkillMap,
    #[serde(alias = "awards_and_certifications")]
    pub certifications: Vec<CertificationEntry>,
    pub interests: Vec<String>,
}

impl Default for ResumeDocument {
    fn default() -> Self {
        Self::template()
    }
}

impl ResumeDocument {
    /// Every list holds one empty placeholder and every default skill
    /// category is present with one empty slot.
    pub fn template() -> Self {
        Self {
            personal_info: PersonalInfo::default(),
            experience: vec![ExperienceEntry::default()],
            projects: vec![ProjectEntry::default()],
            about_me: String::new(),
            academics: vec![AcademicEntry::default()],
            contact: vec![ContactEntry::default()],
            skills: DEFAULT_SKILL_CATEGORIES
                .iter()
                .map(|category| (category.to_string(), vec![String::new()]))
                .collect(),
            certifications: vec![CertificationEntry::default()],
            interests: vec![String::new()],
        }
    }

    /// Number of entries in a list section.
    pub fn section_len(&self, section: ListSection) -> usize {
        match section {
            ListSection::Experience => self.experience.len(),
            ListSection::Projects => self.projects.len(),
            ListSection::Academics => self.academics.len(),
            ListSection::Contact => self.contact.len(),
            ListSection::Certifications => self.certifications.len(),
            ListSection::Interests => self.interests.len(),
        }
    }

    /// Skills in `category`, matched exactly.
    pub fn skill_category(&self, category: &str) -> Result<&[String], SchemaError> {
        self.skills
            .get(category)
            .map(Vec::as_slice)
            .ok_or_else(|| SchemaError::UnknownSkillCategory(category.to_string()))
    }
}

/// True when `category` is one of the fixed initial categories.
pub fn is_default_skill_category(category: &str) -> bool {
    DEFAULT_SKILL_CATEGORIES.contains(&category)
}

/// List-valued sections of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListSection {
    Experience,
    Projects,
    Academics,
    Contact,
    Certifications,
    Interests,
}

impl ListSection {
    pub const ALL: [ListSection; 6] = [
        ListSection::Experience,
        ListSection::Projects,
        ListSection::Academics,
        ListSection::Contact,
        ListSection::Certifications,
        ListSection::Interests,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ListSection::Experience => "experience",
            ListSection::Projects => "projects",
            ListSection::Academics => "academics",
            ListSection::Contact => "contact",
            ListSection::Certifications => "certifications",
            ListSection::Interests => "interests",
        }
    }

    /// Empty entry used for appends and for the last-entry reset.
    pub fn placeholder(&self) -> SectionItem {
        match self {
            ListSection::Experience => SectionItem::Experience(ExperienceEntry::default()),
            ListSection::Projects => SectionItem::Project(ProjectEntry::default()),
            ListSection::Academics => SectionItem::Academic(AcademicEntry::default()),
            ListSection::Contact => SectionItem::Contact(ContactEntry::default()),
            ListSection::Certifications => {
                SectionItem::Certification(CertificationEntry::default())
            }
            ListSection::Interests => SectionItem::Interest(String::new()),
        }
    }
}

impl fmt::Display for ListSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListSection {
    type Err = SchemaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "experience" => Ok(ListSection::Experience),
            "projects" => Ok(ListSection::Projects),
            "academics" => Ok(ListSection::Academics),
            "contact" => Ok(ListSection::Contact),
            "certifications" | "awards_and_certifications" => Ok(ListSection::Certifications),
            "interests" => Ok(ListSection::Interests),
            other => Err(SchemaError::UnknownSection(other.to_string())),
        }
    }
}

/// Top-level string fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScalarField {
    Name,
    Title,
    AboutMe,
}

impl ScalarField {
    pub fn as_path(&self) -> &'static str {
        match self {
            ScalarField::Name => "personalInfo.name",
            ScalarField::Title => "personalInfo.title",
            ScalarField::AboutMe => "aboutMe",
        }
    }
}

/// One entry of a list section, typed by section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum SectionItem {
    Experience(ExperienceEntry),
    Project(ProjectEntry),
    Academic(AcademicEntry),
    Contact(ContactEntry),
    Certification(CertificationEntry),
    Interest(String),
}

impl SectionItem {
    pub fn section(&self) -> ListSection {
        match self {
            SectionItem::Experience(_) => ListSection::Experience,
            SectionItem::Project(_) => ListSection::Projects,
            SectionItem::Academic(_) => ListSection::Academics,
            SectionItem::Contact(_) => ListSection::Contact,
            SectionItem::Certification(_) => ListSection::Certifications,
            SectionItem::Interest(_) => ListSection::Interests,
        }
    }
}
