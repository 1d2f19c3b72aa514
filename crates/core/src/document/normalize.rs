//! Restoring document invariants on data decoded from outside the editor.
//!
//! Cached and remote documents may come from older editor revisions: empty
//! lists, lower-case skill keys, missing categories. Everything that crosses
//! into the editor goes through [`ResumeDocument::normalize`].

use log::debug;

use super::model::{ResumeDocument, SkillMap, DEFAULT_SKILL_CATEGORIES};
use crate::errors::ParseError;

fn ensure_placeholder<T: Default>(items: &mut Vec<T>) {
    if items.is_empty() {
        items.push(T::default());
    }
}

fn ensure_string_placeholder(items: &mut Vec<String>) {
    if items.is_empty() {
        items.push(String::new());
    }
}

/// Canonical spelling for a default category matched case-insensitively.
fn canonical_category(key: &str) -> Option<&'static str> {
    DEFAULT_SKILL_CATEGORIES
        .iter()
        .copied()
        .find(|category| category.eq_ignore_ascii_case(key.trim()))
}

fn merge_skill_lists(target: &mut Vec<String>, incoming: Vec<String>) {
    let target_is_placeholder = target.iter().all(|skill| skill.is_empty());
    let incoming: Vec<String> = incoming.into_iter().filter(|s| !s.is_empty()).collect();
    if incoming.is_empty() {
        return;
    }
    if target_is_placeholder {
        *target = incoming;
    } else {
        target.extend(incoming);
    }
}

fn normalize_skills(skills: SkillMap) -> SkillMap {
    let mut canonical: SkillMap = DEFAULT_SKILL_CATEGORIES
        .iter()
        .map(|category| (category.to_string(), Vec::new()))
        .collect();
    let mut extra = SkillMap::new();

    for (key, values) in skills {
        match canonical_category(&key) {
            Some(name) => {
                if name != key {
                    debug!("[ResumeSync] Folding legacy skill key '{}' into '{}'", key, name);
                }
                if let Some(target) = canonical.get_mut(name) {
                    if target.is_empty() {
                        *target = values;
                    } else {
                        merge_skill_lists(target, values);
                    }
                }
            }
            None => match extra.get_mut(&key) {
                Some(target) => merge_skill_lists(target, values),
                None => {
                    extra.insert(key, values);
                }
            },
        }
    }

    canonical.extend(extra);
    for values in canonical.values_mut() {
        ensure_string_placeholder(values);
    }
    canonical
}

impl ResumeDocument {
    /// Restore the placeholder and category invariants.
    pub fn normalize(mut self) -> Self {
        ensure_placeholder(&mut self.experience);
        for entry in &mut self.experience {
            ensure_string_placeholder(&mut entry.responsibilities);
        }
        ensure_placeholder(&mut self.projects);
        ensure_placeholder(&mut self.academics);
        ensure_placeholder(&mut self.contact);
        ensure_placeholder(&mut self.certifications);
        ensure_string_placeholder(&mut self.interests);
        self.skills = normalize_skills(std::mem::take(&mut self.skills));
        self
    }

    /// True when every list is non-empty and every default category exists.
    pub fn satisfies_invariants(&self) -> bool {
        !self.experience.is_empty()
            && self
                .experience
                .iter()
                .all(|entry| !entry.responsibilities.is_empty())
            && !self.projects.is_empty()
            && !self.academics.is_empty()
            && !self.contact.is_empty()
            && !self.certifications.is_empty()
            && !self.interests.is_empty()
            && DEFAULT_SKILL_CATEGORIES
                .iter()
                .all(|category| self.skills.contains_key(*category))
            && self.skills.values().all(|values| !values.is_empty())
    }

    /// Decode and normalize a document. `source_label` names the origin in errors.
    pub fn from_json(json: &str, source_label: &str) -> Result<Self, ParseError> {
        let document: ResumeDocument =
            serde_json::from_str(json).map_err(|e| ParseError::new(source_label, e))?;
        Ok(document.normalize())
    }

    /// Decode from an already parsed JSON value.
    pub fn from_value(value: serde_json::Value, source_label: &str) -> Result<Self, ParseError> {
        let document: ResumeDocument =
            serde_json::from_value(value).map_err(|e| ParseError::new(source_label, e))?;
        Ok(document.normalize())
    }

    pub fn to_json(&self) -> Result<String, ParseError> {
        serde_json::to_string(self).map_err(|e| ParseError::new("resume document", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_decodes_to_template() {
        let document = ResumeDocument::from_json("{}", "test").expect("decode");
        assert_eq!(document, ResumeDocument::template());
    }

    #[test]
    fn empty_lists_are_restored_to_placeholders() {
        let json = r#"{"experience":[],"projects":[],"interests":[],"skills":{"Languages":[]}}"#;
        let document = ResumeDocument::from_json(json, "test").expect("decode");
        assert_eq!(document.experience.len(), 1);
        assert_eq!(document.projects.len(), 1);
        assert_eq!(document.interests, vec![String::new()]);
        assert_eq!(document.skills["Languages"], vec![String::new()]);
        assert!(document.satisfies_invariants());
    }

    #[test]
    fn legacy_keys_fold_into_canonical_sections() {
        let json = r#"{
            "awards_and_certifications": [{"title": "CKA", "organization": "CNCF", "year": "2023"}],
            "skills": {"libraries": ["serde"], "Libraries": ["tokio"], "tools": ["git"], "Custom": ["x"]}
        }"#;
        let document = ResumeDocument::from_json(json, "test").expect("decode");

        assert_eq!(document.certifications[0].title, "CKA");
        assert_eq!(document.skills["Libraries"], vec!["serde", "tokio"]);
        assert_eq!(document.skills["Tools"], vec!["git"]);
        assert!(!document.skills.contains_key("libraries"));

        let keys: Vec<&str> = document.skills.keys().map(String::as_str).collect();
        assert_eq!(&keys[..8], &DEFAULT_SKILL_CATEGORIES);
        assert_eq!(keys[8], "Custom");
    }

    #[test]
    fn experience_without_responsibilities_gets_placeholder_bullet() {
        let json = r#"{"experience":[{"title":"Engineer","responsibilities":[]}]}"#;
        let document = ResumeDocument::from_json(json, "test").expect("decode");
        assert_eq!(document.experience[0].responsibilities, vec![String::new()]);
    }

    #[test]
    fn corrupt_json_reports_source() {
        let err = ResumeDocument::from_json("{not json", "local cache").unwrap_err();
        assert_eq!(err.source_label, "local cache");
    }

    #[test]
    fn round_trip_preserves_order() {
        let mut document = ResumeDocument::template();
        document.interests = vec!["chess".into(), "climbing".into(), "go".into()];
        document.contact[0].kind = "email".into();
        document.skills.insert("Zeta".into(), vec!["b".into(), "a".into()]);

        let json = document.to_json().expect("encode");
        let decoded = ResumeDocument::from_json(&json, "test").expect("decode");

        assert_eq!(decoded, document);
        assert_eq!(decoded.interests, vec!["chess", "climbing", "go"]);
        let keys: Vec<&String> = decoded.skills.keys().collect();
        let original: Vec<&String> = document.skills.keys().collect();
        assert_eq!(keys, original);
        assert!(json.contains("\"type\":\"email\""));
        assert!(json.contains("\"personalInfo\""));
    }
}
