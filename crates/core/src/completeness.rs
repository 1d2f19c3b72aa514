//! Profile completeness shown next to the editor's progress bar.

use serde::Serialize;

use crate::document::{ListSection, ResumeDocument};

/// How many of the document's parts carry real content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Completeness {
    pub filled: usize,
    pub total: usize,
    /// Paths of the parts still empty, in document order.
    pub missing: Vec<String>,
    pub filled_skills: usize,
}

impl Completeness {
    /// Rounded percentage, 0 to 100.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.filled as f64 / self.total as f64) * 100.0).round() as u8
    }
}

fn filled(value: &str) -> bool {
    !value.trim().is_empty()
}

/// A section counts once at least one of its entries is completely filled in.
fn section_complete(document: &ResumeDocument, section: ListSection) -> bool {
    match section {
        ListSection::Experience => document
            .experience
            .iter()
            .any(|e| filled(&e.title) && filled(&e.company) && filled(&e.duration)),
        ListSection::Projects => document
            .projects
            .iter()
            .any(|p| filled(&p.title) && filled(&p.description)),
        ListSection::Academics => document
            .academics
            .iter()
            .any(|a| filled(&a.degree) && filled(&a.institution) && filled(&a.year)),
        ListSection::Contact => document
            .contact
            .iter()
            .any(|c| filled(&c.kind) && filled(&c.value)),
        ListSection::Certifications => document
            .certifications
            .iter()
            .any(|c| filled(&c.title) && filled(&c.organization) && filled(&c.year)),
        ListSection::Interests => document.interests.iter().any(|i| filled(i)),
    }
}

pub fn score(document: &ResumeDocument) -> Completeness {
    let mut parts: Vec<(String, bool)> = vec![
        ("personalInfo.name".into(), filled(&document.personal_info.name)),
        ("personalInfo.title".into(), filled(&document.personal_info.title)),
        ("aboutMe".into(), filled(&document.about_me)),
    ];
    for section in ListSection::ALL {
        parts.push((
            section.as_str().to_string(),
            section_complete(document, section),
        ));
    }

    let filled_skills = document
        .skills
        .values()
        .flatten()
        .filter(|skill| filled(skill))
        .count();
    parts.push(("skills".into(), filled_skills > 0));

    let total = parts.len();
    let mut missing = Vec::new();
    let mut done = 0;
    for (path, is_filled) in parts {
        if is_filled {
            done += 1;
        } else {
            missing.push(path);
        }
    }

    Completeness {
        filled: done,
        total,
        missing,
        filled_skills,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::Mutation;

    #[test]
    fn template_is_zero_percent() {
        let result = score(&ResumeDocument::template());
        assert_eq!(result.percent(), 0);
        assert_eq!(result.total, 10);
        assert_eq!(result.missing.first().map(String::as_str), Some("personalInfo.name"));
    }

    #[test]
    fn partially_filled_entries_do_not_count() {
        let mut document = ResumeDocument::template();
        for (path, value) in [
            ("personalInfo.name", "Ada"),
            ("academics[0].degree", "BSc"),
            ("skills.Languages[0]", "Rust"),
            ("interests[0]", "chess"),
        ] {
            document = Mutation::set_path(path, value)
                .unwrap()
                .apply(&document)
                .unwrap()
                .document;
        }
        let result = score(&document);
        assert_eq!(result.filled, 3);
        assert_eq!(result.filled_skills, 1);
        assert!(result.missing.contains(&"academics".to_string()));
        assert_eq!(result.percent(), 30);
    }
}
