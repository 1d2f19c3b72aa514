//! Path-based, pure mutations of a [`ResumeDocument`].
//!
//! Every operation borrows the current document and returns a new value; the
//! previous version is never touched. Removing the last entry of any list
//! resets it to one empty placeholder instead of leaving it empty.

use serde::{Deserialize, Serialize};

use crate::document::{
    is_default_skill_category, AcademicEntry, CertificationEntry, ContactEntry, ExperienceEntry,
    FieldPath, ListPath, ListSection, ProjectEntry, ResumeDocument, ScalarField, SectionItem,
    STRING_ITEM_FIELD,
};
use crate::errors::SchemaError;

/// A single editor operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Mutation {
    SetScalar {
        field: ScalarField,
        value: String,
    },
    SetItemField {
        section: ListSection,
        index: usize,
        field: String,
        value: String,
    },
    /// `item: None` appends the section's empty placeholder.
    AppendItem {
        section: ListSection,
        item: Option<SectionItem>,
    },
    RemoveItem {
        section: ListSection,
        index: usize,
    },
    SetResponsibility {
        experience: usize,
        index: usize,
        value: String,
    },
    AppendResponsibility {
        experience: usize,
    },
    RemoveResponsibility {
        experience: usize,
        index: usize,
    },
    SetSkill {
        category: String,
        index: usize,
        value: String,
    },
    AppendSkill {
        category: String,
    },
    RemoveSkill {
        category: String,
        index: usize,
    },
    AddSkillCategory {
        category: String,
    },
    ResetToTemplate,
}

/// Result of applying a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub document: ResumeDocument,
    /// False when the new value is structurally equal to the old one.
    pub dirty: bool,
}

impl Mutation {
    /// Set the leaf at `path` to `value`.
    pub fn set(path: FieldPath, value: impl Into<String>) -> Self {
        let value = value.into();
        match path {
            FieldPath::Scalar { field } => Mutation::SetScalar { field, value },
            FieldPath::ItemField {
                section,
                index,
                field,
            } => Mutation::SetItemField {
                section,
                index,
                field,
                value,
            },
            FieldPath::Responsibility { experience, index } => Mutation::SetResponsibility {
                experience,
                index,
                value,
            },
            FieldPath::Skill { category, index } => Mutation::SetSkill {
                category,
                index,
                value,
            },
        }
    }

    /// Parse `path` and set it to `value`.
    pub fn set_path(path: &str, value: impl Into<String>) -> Result<Self, SchemaError> {
        Ok(Self::set(FieldPath::parse(path)?, value))
    }

    /// Append an empty entry to the list at `path`.
    pub fn append(path: ListPath) -> Self {
        match path {
            ListPath::Section { section } => Mutation::AppendItem {
                section,
                item: None,
            },
            ListPath::Responsibilities { experience } => {
                Mutation::AppendResponsibility { experience }
            }
            ListPath::Skills { category } => Mutation::AppendSkill { category },
        }
    }

    /// Remove entry `index` from the list at `path`.
    pub fn remove(path: ListPath, index: usize) -> Self {
        match path {
            ListPath::Section { section } => Mutation::RemoveItem { section, index },
            ListPath::Responsibilities { experience } => Mutation::RemoveResponsibility {
                experience,
                index,
            },
            ListPath::Skills { category } => Mutation::RemoveSkill { category, index },
        }
    }

    pub fn apply(&self, document: &ResumeDocument) -> Result<Applied, SchemaError> {
        let next = match self {
            Mutation::SetScalar { field, value } => set_scalar_field(document, *field, value),
            Mutation::SetItemField {
                section,
                index,
                field,
                value,
            } => set_list_item_field(document, *section, *index, field, value)?,
            Mutation::AppendItem { section, item } => {
                append_list_item(document, *section, item.clone())?
            }
            Mutation::RemoveItem { section, index } => {
                remove_list_item(document, *section, *index)?
            }
            Mutation::SetResponsibility {
                experience,
                index,
                value,
            } => set_responsibility(document, *experience, *index, value)?,
            Mutation::AppendResponsibility { experience } => {
                append_responsibility(document, *experience)?
            }
            Mutation::RemoveResponsibility { experience, index } => {
                remove_responsibility(document, *experience, *index)?
            }
            Mutation::SetSkill {
                category,
                index,
                value,
            } => set_skill(document, category, *index, value)?,
            Mutation::AppendSkill { category } => append_skill(document, category)?,
            Mutation::RemoveSkill { category, index } => remove_skill(document, category, *index)?,
            Mutation::AddSkillCategory { category } => add_skill_category(document, category)?,
            Mutation::ResetToTemplate => ResumeDocument::template(),
        };
        let dirty = next != *document;
        Ok(Applied {
            document: next,
            dirty,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entry field access
// ─────────────────────────────────────────────────────────────────────────────

trait EntryFields {
    fn field_mut(&mut self, field: &str) -> Option<&mut String>;
    fn field(&self, field: &str) -> Option<&str>;
}

impl EntryFields for ExperienceEntry {
    fn field_mut(&mut self, field: &str) -> Option<&mut String> {
        match field {
            "title" => Some(&mut self.title),
            "company" => Some(&mut self.company),
            "duration" => Some(&mut self.duration),
            _ => None,
        }
    }

    fn field(&self, field: &str) -> Option<&str> {
        match field {
            "title" => Some(&self.title),
            "company" => Some(&self.company),
            "duration" => Some(&self.duration),
            _ => None,
        }
    }
}

impl EntryFields for ProjectEntry {
    fn field_mut(&mut self, field: &str) -> Option<&mut String> {
        match field {
            "title" => Some(&mut self.title),
            "description" => Some(&mut self.description),
            _ => None,
        }
    }

    fn field(&self, field: &str) -> Option<&str> {
        match field {
            "title" => Some(&self.title),
            "description" => Some(&self.description),
            _ => None,
        }
    }
}

impl EntryFields for AcademicEntry {
    fn field_mut(&mut self, field: &str) -> Option<&mut String> {
        match field {
            "degree" => Some(&mut self.degree),
            "institution" => Some(&mut self.institution),
            "year" => Some(&mut self.year),
            _ => None,
        }
    }

    fn field(&self, field: &str) -> Option<&str> {
        match field {
            "degree" => Some(&self.degree),
            "institution" => Some(&self.institution),
            "year" => Some(&self.year),
            _ => None,
        }
    }
}

impl EntryFields for ContactEntry {
    fn field_mut(&mut self, field: &str) -> Option<&mut String> {
        match field {
            "type" => Some(&mut self.kind),
            "value" => Some(&mut self.value),
            _ => None,
        }
    }

    fn field(&self, field: &str) -> Option<&str> {
        match field {
            "type" => Some(&self.kind),
            "value" => Some(&self.value),
            _ => None,
        }
    }
}

impl EntryFields for CertificationEntry {
    fn field_mut(&mut self, field: &str) -> Option<&mut String> {
        match field {
            "title" => Some(&mut self.title),
            "organization" => Some(&mut self.organization),
            "year" => Some(&mut self.year),
            _ => None,
        }
    }

    fn field(&self, field: &str) -> Option<&str> {
        match field {
            "title" => Some(&self.title),
            "organization" => Some(&self.organization),
            "year" => Some(&self.year),
            _ => None,
        }
    }
}

impl EntryFields for String {
    fn field_mut(&mut self, field: &str) -> Option<&mut String> {
        (field == STRING_ITEM_FIELD).then_some(self)
    }

    fn field(&self, field: &str) -> Option<&str> {
        (field == STRING_ITEM_FIELD).then_some(self.as_str())
    }
}

fn set_in<T: EntryFields>(
    items: &mut [T],
    section: ListSection,
    index: usize,
    field: &str,
    value: &str,
) -> Result<(), SchemaError> {
    let len = items.len();
    let entry = items
        .get_mut(index)
        .ok_or_else(|| SchemaError::out_of_range(section.as_str(), index, len))?;
    let slot = entry
        .field_mut(field)
        .ok_or_else(|| SchemaError::unknown_field(section.as_str(), field))?;
    *slot = value.to_string();
    Ok(())
}

/// Remove `index`, or reset to one placeholder when it is the last entry.
fn remove_or_reset<T>(
    items: &mut Vec<T>,
    label: &str,
    index: usize,
    placeholder: impl FnOnce() -> T,
) -> Result<(), SchemaError> {
    if index >= items.len() {
        return Err(SchemaError::out_of_range(label, index, items.len()));
    }
    if items.len() == 1 {
        items[0] = placeholder();
    } else {
        items.remove(index);
    }
    Ok(())
}

fn get_in<'a, T: EntryFields>(
    items: &'a [T],
    section: ListSection,
    index: usize,
    field: &str,
) -> Result<&'a str, SchemaError> {
    let entry = items
        .get(index)
        .ok_or_else(|| SchemaError::out_of_range(section.as_str(), index, items.len()))?;
    entry
        .field(field)
        .ok_or_else(|| SchemaError::unknown_field(section.as_str(), field))
}

fn item_mismatch(section: ListSection) -> SchemaError {
    SchemaError::ItemKindMismatch {
        section: section.as_str().to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Operations
// ─────────────────────────────────────────────────────────────────────────────

pub fn set_scalar_field(
    document: &ResumeDocument,
    field: ScalarField,
    value: &str,
) -> ResumeDocument {
    let mut next = document.clone();
    match field {
        ScalarField::Name => next.personal_info.name = value.to_string(),
        ScalarField::Title => next.personal_info.title = value.to_string(),
        ScalarField::AboutMe => next.about_me = value.to_string(),
    }
    next
}

pub fn set_list_item_field(
    document: &ResumeDocument,
    section: ListSection,
    index: usize,
    field: &str,
    value: &str,
) -> Result<ResumeDocument, SchemaError> {
    let mut next = document.clone();
    match section {
        ListSection::Experience => set_in(&mut next.experience, section, index, field, value)?,
        ListSection::Projects => set_in(&mut next.projects, section, index, field, value)?,
        ListSection::Academics => set_in(&mut next.academics, section, index, field, value)?,
        ListSection::Contact => set_in(&mut next.contact, section, index, field, value)?,
        ListSection::Certifications => {
            set_in(&mut next.certifications, section, index, field, value)?
        }
        ListSection::Interests => set_in(&mut next.interests, section, index, field, value)?,
    }
    Ok(next)
}

/// Append `item`, or the section's placeholder when `None`. No upper bound.
pub fn append_list_item(
    document: &ResumeDocument,
    section: ListSection,
    item: Option<SectionItem>,
) -> Result<ResumeDocument, SchemaError> {
    let item = item.unwrap_or_else(|| section.placeholder());
    if item.section() != section {
        return Err(item_mismatch(section));
    }
    let mut next = document.clone();
    match item {
        SectionItem::Experience(mut entry) => {
            if entry.responsibilities.is_empty() {
                entry.responsibilities.push(String::new());
            }
            next.experience.push(entry)
        }
        SectionItem::Project(entry) => next.projects.push(entry),
        SectionItem::Academic(entry) => next.academics.push(entry),
        SectionItem::Contact(entry) => next.contact.push(entry),
        SectionItem::Certification(entry) => next.certifications.push(entry),
        SectionItem::Interest(entry) => next.interests.push(entry),
    }
    Ok(next)
}

pub fn remove_list_item(
    document: &ResumeDocument,
    section: ListSection,
    index: usize,
) -> Result<ResumeDocument, SchemaError> {
    let mut next = document.clone();
    let label = section.as_str();
    match section {
        ListSection::Experience => {
            remove_or_reset(&mut next.experience, label, index, ExperienceEntry::default)?
        }
        ListSection::Projects => {
            remove_or_reset(&mut next.projects, label, index, ProjectEntry::default)?
        }
        ListSection::Academics => {
            remove_or_reset(&mut next.academics, label, index, AcademicEntry::default)?
        }
        ListSection::Contact => {
            remove_or_reset(&mut next.contact, label, index, ContactEntry::default)?
        }
        ListSection::Certifications => remove_or_reset(
            &mut next.certifications,
            label,
            index,
            CertificationEntry::default,
        )?,
        ListSection::Interests => {
            remove_or_reset(&mut next.interests, label, index, String::new)?
        }
    }
    Ok(next)
}

fn experience_mut(
    document: &mut ResumeDocument,
    experience: usize,
) -> Result<&mut ExperienceEntry, SchemaError> {
    let len = document.experience.len();
    document
        .experience
        .get_mut(experience)
        .ok_or_else(|| SchemaError::out_of_range(ListSection::Experience.as_str(), experience, len))
}

pub fn set_responsibility(
    document: &ResumeDocument,
    experience: usize,
    index: usize,
    value: &str,
) -> Result<ResumeDocument, SchemaError> {
    let mut next = document.clone();
    let entry = experience_mut(&mut next, experience)?;
    let len = entry.responsibilities.len();
    let slot = entry.responsibilities.get_mut(index).ok_or_else(|| {
        SchemaError::out_of_range(
            format!("experience[{}].responsibilities", experience),
            index,
            len,
        )
    })?;
    *slot = value.to_string();
    Ok(next)
}

pub fn append_responsibility(
    document: &ResumeDocument,
    experience: usize,
) -> Result<ResumeDocument, SchemaError> {
    let mut next = document.clone();
    experience_mut(&mut next, experience)?
        .responsibilities
        .push(String::new());
    Ok(next)
}

pub fn remove_responsibility(
    document: &ResumeDocument,
    experience: usize,
    index: usize,
) -> Result<ResumeDocument, SchemaError> {
    let mut next = document.clone();
    let label = format!("experience[{}].responsibilities", experience);
    let entry = experience_mut(&mut next, experience)?;
    remove_or_reset(&mut entry.responsibilities, &label, index, String::new)?;
    Ok(next)
}

fn category_mut<'a>(
    document: &'a mut ResumeDocument,
    category: &str,
) -> Result<&'a mut Vec<String>, SchemaError> {
    document
        .skills
        .get_mut(category)
        .ok_or_else(|| SchemaError::UnknownSkillCategory(category.to_string()))
}

pub fn set_skill(
    document: &ResumeDocument,
    category: &str,
    index: usize,
    value: &str,
) -> Result<ResumeDocument, SchemaError> {
    let mut next = document.clone();
    let skills = category_mut(&mut next, category)?;
    let len = skills.len();
    let slot = skills
        .get_mut(index)
        .ok_or_else(|| SchemaError::out_of_range(format!("skills.{}", category), index, len))?;
    *slot = value.to_string();
    Ok(next)
}

pub fn append_skill(
    document: &ResumeDocument,
    category: &str,
) -> Result<ResumeDocument, SchemaError> {
    let mut next = document.clone();
    category_mut(&mut next, category)?.push(String::new());
    Ok(next)
}

/// Remove a skill. The category itself always stays.
pub fn remove_skill(
    document: &ResumeDocument,
    category: &str,
    index: usize,
) -> Result<ResumeDocument, SchemaError> {
    let mut next = document.clone();
    let label = format!("skills.{}", category);
    let skills = category_mut(&mut next, category)?;
    remove_or_reset(skills, &label, index, String::new)?;
    Ok(next)
}

/// Add a new skill category at the end, holding one empty slot.
pub fn add_skill_category(
    document: &ResumeDocument,
    category: &str,
) -> Result<ResumeDocument, SchemaError> {
    let category = category.trim();
    if category.is_empty() || category.contains(['[', ']']) {
        return Err(SchemaError::invalid_path(format!("skills.{}", category)));
    }
    let exists = is_default_skill_category(category)
        || document
            .skills
            .keys()
            .any(|existing| existing.eq_ignore_ascii_case(category));
    if exists {
        return Err(SchemaError::DuplicateSkillCategory(category.to_string()));
    }
    let mut next = document.clone();
    next.skills.insert(category.to_string(), vec![String::new()]);
    Ok(next)
}

/// Current value of the leaf at `path`.
pub fn read_field<'a>(
    document: &'a ResumeDocument,
    path: &FieldPath,
) -> Result<&'a str, SchemaError> {
    match path {
        FieldPath::Scalar { field } => Ok(match field {
            ScalarField::Name => &document.personal_info.name,
            ScalarField::Title => &document.personal_info.title,
            ScalarField::AboutMe => &document.about_me,
        }),
        FieldPath::ItemField {
            section,
            index,
            field,
        } => match section {
            ListSection::Experience => get_in(&document.experience, *section, *index, field),
            ListSection::Projects => get_in(&document.projects, *section, *index, field),
            ListSection::Academics => get_in(&document.academics, *section, *index, field),
            ListSection::Contact => get_in(&document.contact, *section, *index, field),
            ListSection::Certifications => {
                get_in(&document.certifications, *section, *index, field)
            }
            ListSection::Interests => get_in(&document.interests, *section, *index, field),
        },
        FieldPath::Responsibility { experience, index } => {
            let len = document.experience.len();
            let entry = document.experience.get(*experience).ok_or_else(|| {
                SchemaError::out_of_range(ListSection::Experience.as_str(), *experience, len)
            })?;
            entry
                .responsibilities
                .get(*index)
                .map(String::as_str)
                .ok_or_else(|| {
                    SchemaError::out_of_range(
                        format!("experience[{}].responsibilities", experience),
                        *index,
                        entry.responsibilities.len(),
                    )
                })
        }
        FieldPath::Skill { category, index } => {
            let skills = document.skill_category(category)?;
            skills.get(*index).map(String::as_str).ok_or_else(|| {
                SchemaError::out_of_range(format!("skills.{}", category), *index, skills.len())
            })
        }
    }
}
