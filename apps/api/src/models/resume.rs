use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Placeholder the extraction prompt asks for when no grade is present.
pub const NOT_AVAILABLE: &str = "N/A";

/// Structured fields extracted from one resume by the language model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedResume {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_list")]
    pub skills: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub experience: Vec<ExperienceItem>,
    #[serde(deserialize_with = "lenient_list")]
    pub projects: Vec<ProjectItem>,
    #[serde(deserialize_with = "lenient_list")]
    pub education: Vec<EducationItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub company: String,
    #[serde(default, alias = "position", deserialize_with = "lenient_string")]
    pub role: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub years: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub project_name: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub tech_stack: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub institution: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub degree: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub years: String,
    /// CGPA, percentage or marks, whichever the resume states.
    #[serde(
        rename = "cgpa",
        alias = "cgpa_or_equivalent",
        default = "not_available",
        deserialize_with = "grade_or_not_available"
    )]
    pub cgpa_or_equivalent: String,
}

impl Default for EducationItem {
    fn default() -> Self {
        Self {
            institution: String::new(),
            degree: String::new(),
            years: String::new(),
            cgpa_or_equivalent: not_available(),
        }
    }
}

/// A persisted resume as handed out by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub id: i64,
    pub user_id: Uuid,
    pub file_name: String,
    pub candidate_name: String,
    pub skills: Vec<String>,
    pub experience: Vec<ExperienceItem>,
    pub projects: Vec<ProjectItem>,
    pub education: Vec<EducationItem>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the record store.
#[derive(Debug, Clone)]
pub struct NewResume {
    pub user_id: Uuid,
    pub file_name: String,
    pub extracted: ExtractedResume,
}

fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

/// Accepts strings, numbers and booleans as text; `null` becomes the empty string.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => {
            return Err(serde::de::Error::custom(format!(
                "expected a string, found {other}"
            )))
        }
    })
}

/// `null` becomes the empty list.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn grade_or_not_available<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let grade = lenient_string(deserializer)?;
    if grade.trim().is_empty() {
        Ok(not_available())
    } else {
        Ok(grade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_education_grade_defaults_to_not_available() {
        let item: EducationItem =
            serde_json::from_str(r#"{"institution": "XYZ", "degree": "B.Tech", "years": "2018-2022"}"#)
                .unwrap();
        assert_eq!(item.cgpa_or_equivalent, "N/A");

        let item: EducationItem = serde_json::from_str(r#"{"cgpa": null}"#).unwrap();
        assert_eq!(item.cgpa_or_equivalent, "N/A");
    }

    #[test]
    fn test_education_grade_accepts_numbers_and_percentages() {
        let item: EducationItem = serde_json::from_str(r#"{"cgpa": 8.5}"#).unwrap();
        assert_eq!(item.cgpa_or_equivalent, "8.5");

        let item: EducationItem = serde_json::from_str(r#"{"cgpa": "85%"}"#).unwrap();
        assert_eq!(item.cgpa_or_equivalent, "85%");
    }

    #[test]
    fn test_education_grade_serializes_under_cgpa_key() {
        let value = serde_json::to_value(EducationItem::default()).unwrap();
        assert_eq!(value["cgpa"], "N/A");
    }

    #[test]
    fn test_experience_accepts_position_alias() {
        let item: ExperienceItem =
            serde_json::from_str(r#"{"company": "Acme", "position": "Engineer", "years": 2}"#)
                .unwrap();
        assert_eq!(item.role, "Engineer");
        assert_eq!(item.years, "2");
        assert!(item.description.is_none());
    }

    #[test]
    fn test_null_lists_become_empty() {
        let resume: ExtractedResume = serde_json::from_str(
            r#"{"name": "Ada", "skills": null, "experience": [], "projects": null, "education": []}"#,
        )
        .unwrap();
        assert!(resume.skills.is_empty());
        assert!(resume.projects.is_empty());
    }

    #[test]
    fn test_object_where_string_expected_is_rejected() {
        let result = serde_json::from_str::<ExtractedResume>(
            r#"{"name": {"first": "Ada"}, "skills": [], "experience": [], "projects": [], "education": []}"#,
        );
        assert!(result.is_err());
    }
}
