//! Textual paths into a resume document.
//!
//! ```text
//! personalInfo.name              aboutMe
//! experience[0].title            interests[2]
//! experience[0].responsibilities[1]
//! skills.Languages[0]
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use super::model::{ListSection, ScalarField};
use crate::errors::SchemaError;

/// Path to a single string-valued leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FieldPath {
    Scalar {
        field: ScalarField,
    },
    ItemField {
        section: ListSection,
        index: usize,
        field: String,
    },
    Responsibility {
        experience: usize,
        index: usize,
    },
    Skill {
        category: String,
        index: usize,
    },
}

/// Path to an ordered list that supports append and remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ListPath {
    Section { section: ListSection },
    Responsibilities { experience: usize },
    Skills { category: String },
}

/// Field name used for sections whose items are bare strings.
pub const STRING_ITEM_FIELD: &str = "value";

/// Splits `name[3]` into `("name", Some(3))`; `name` into `("name", None)`.
fn split_index<'a>(
    segment: &'a str,
    full: &str,
) -> Result<(&'a str, Option<usize>), SchemaError> {
    let Some(open) = segment.find('[') else {
        return Ok((segment, None));
    };
    let Some(inner) = segment[open + 1..].strip_suffix(']') else {
        return Err(SchemaError::invalid_path(full));
    };
    if inner.is_empty() || !inner.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SchemaError::invalid_path(full));
    }
    let index = inner
        .parse::<usize>()
        .map_err(|_| SchemaError::invalid_path(full))?;
    let name = &segment[..open];
    if name.is_empty() {
        return Err(SchemaError::invalid_path(full));
    }
    Ok((name, Some(index)))
}

impl FieldPath {
    pub fn parse(path: &str) -> Result<Self, SchemaError> {
        let path = path.trim();
        match path {
            "personalInfo.name" => {
                return Ok(FieldPath::Scalar {
                    field: ScalarField::Name,
                })
            }
            "personalInfo.title" => {
                return Ok(FieldPath::Scalar {
                    field: ScalarField::Title,
                })
            }
            "aboutMe" => {
                return Ok(FieldPath::Scalar {
                    field: ScalarField::AboutMe,
                })
            }
            _ => {}
        }

        if let Some(rest) = path.strip_prefix("skills.") {
            let (category, index) = split_index(rest, path)?;
            let index = index.ok_or_else(|| SchemaError::invalid_path(path))?;
            return Ok(FieldPath::Skill {
                category: category.to_string(),
                index,
            });
        }

        let mut segments = path.splitn(2, '.');
        let head = segments.next().unwrap_or_default();
        let tail = segments.next();
        let (name, index) = split_index(head, path)?;
        let section: ListSection = name.parse()?;
        let index = index.ok_or_else(|| SchemaError::invalid_path(path))?;

        match (section, tail) {
            (ListSection::Interests, None) => Ok(FieldPath::ItemField {
                section,
                index,
                field: STRING_ITEM_FIELD.to_string(),
            }),
            (ListSection::Experience, Some(tail)) if tail.starts_with("responsibilities[") => {
                let (_, inner) = split_index(tail, path)?;
                let inner = inner.ok_or_else(|| SchemaError::invalid_path(path))?;
                Ok(FieldPath::Responsibility {
                    experience: index,
                    index: inner,
                })
            }
            (_, Some(field)) if !field.is_empty() && !field.contains(['.', '[']) => {
                Ok(FieldPath::ItemField {
                    section,
                    index,
                    field: field.to_string(),
                })
            }
            _ => Err(SchemaError::invalid_path(path)),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Scalar { field } => f.write_str(field.as_path()),
            FieldPath::ItemField {
                section: ListSection::Interests,
                index,
                ..
            } => write!(f, "interests[{}]", index),
            FieldPath::ItemField {
                section,
                index,
                field,
            } => write!(f, "{}[{}].{}", section, index, field),
            FieldPath::Responsibility { experience, index } => {
                write!(f, "experience[{}].responsibilities[{}]", experience, index)
            }
            FieldPath::Skill { category, index } => write!(f, "skills.{}[{}]", category, index),
        }
    }
}

impl ListPath {
    pub fn parse(path: &str) -> Result<Self, SchemaError> {
        let path = path.trim();
        if let Some(category) = path.strip_prefix("skills.") {
            if category.is_empty() || category.contains('[') {
                return Err(SchemaError::invalid_path(path));
            }
            return Ok(ListPath::Skills {
                category: category.to_string(),
            });
        }
        if let Some(head) = path.strip_suffix(".responsibilities") {
            let (name, index) = split_index(head, path)?;
            if name != ListSection::Experience.as_str() {
                return Err(SchemaError::invalid_path(path));
            }
            let experience = index.ok_or_else(|| SchemaError::invalid_path(path))?;
            return Ok(ListPath::Responsibilities { experience });
        }
        if path.contains(['.', '[']) {
            return Err(SchemaError::invalid_path(path));
        }
        Ok(ListPath::Section {
            section: path.parse()?,
        })
    }
}

impl fmt::Display for ListPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListPath::Section { section } => write!(f, "{}", section),
            ListPath::Responsibilities { experience } => {
                write!(f, "experience[{}].responsibilities", experience)
            }
            ListPath::Skills { category } => write!(f, "skills.{}", category),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_leaf_shape() {
        assert_eq!(
            FieldPath::parse("personalInfo.name").unwrap(),
            FieldPath::Scalar {
                field: ScalarField::Name
            }
        );
        assert_eq!(
            FieldPath::parse("experience[0].title").unwrap(),
            FieldPath::ItemField {
                section: ListSection::Experience,
                index: 0,
                field: "title".into()
            }
        );
        assert_eq!(
            FieldPath::parse("experience[2].responsibilities[1]").unwrap(),
            FieldPath::Responsibility {
                experience: 2,
                index: 1
            }
        );
        assert_eq!(
            FieldPath::parse("interests[3]").unwrap(),
            FieldPath::ItemField {
                section: ListSection::Interests,
                index: 3,
                field: STRING_ITEM_FIELD.into()
            }
        );
        assert_eq!(
            FieldPath::parse("skills.Languages[1]").unwrap(),
            FieldPath::Skill {
                category: "Languages".into(),
                index: 1
            }
        );
    }

    #[test]
    fn rejects_malformed_paths() {
        for path in [
            "",
            "experience",
            "experience[x].title",
            "experience[0",
            "experience[0].",
            "projects[0].title.more",
            "hobbies[0].name",
            "skills.Languages",
            "[0].title",
            "experience[+1].title",
            "experience[-1].title",
            "experience[ 1].title",
            "skills.Languages[]",
        ] {
            assert!(FieldPath::parse(path).is_err(), "accepted '{}'", path);
        }
    }

    #[test]
    fn list_paths_round_trip_through_display() {
        for path in ["experience", "experience[4].responsibilities", "skills.Cloud"] {
            let parsed = ListPath::parse(path).expect("parse list path");
            assert_eq!(parsed.to_string(), path);
        }
        assert!(ListPath::parse("projects[0].responsibilities").is_err());
        assert!(ListPath::parse("aboutMe").is_err());
    }

    #[test]
    fn field_paths_display_in_parse_syntax() {
        for path in [
            "aboutMe",
            "contact[1].type",
            "interests[0]",
            "experience[0].responsibilities[2]",
            "skills.Tools[0]",
        ] {
            assert_eq!(FieldPath::parse(path).unwrap().to_string(), path);
        }
    }
}
