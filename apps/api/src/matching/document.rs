//! Resume-Document Merger: flattens structured resume fields into the canonical
//! text used both for embedding and for presenting a resume to a scoring model.
//!
//! Section order is fixed: skills, projects, education, experience. A section with
//! no entries is left out entirely, and a resume with no sections merges to `None`.

use serde::Serialize;
use uuid::Uuid;

use crate::models::resume::{
    EducationItem, ExperienceItem, ExtractedResume, ProjectItem, ResumeRecord,
};

/// Flattened resume text plus the tags stored alongside its embedding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedDocument {
    pub text: String,
    pub user_id: Uuid,
    /// `None` until the record store has assigned an id.
    pub resume_id: Option<i64>,
}

/// Borrowed view of the four mergeable sections.
#[derive(Debug, Clone, Copy)]
pub struct ResumeSections<'a> {
    pub skills: &'a [String],
    pub projects: &'a [ProjectItem],
    pub education: &'a [EducationItem],
    pub experience: &'a [ExperienceItem],
}

impl<'a> From<&'a ResumeRecord> for ResumeSections<'a> {
    fn from(record: &'a ResumeRecord) -> Self {
        Self {
            skills: &record.skills,
            projects: &record.projects,
            education: &record.education,
            experience: &record.experience,
        }
    }
}

impl<'a> From<&'a ExtractedResume> for ResumeSections<'a> {
    fn from(resume: &'a ExtractedResume) -> Self {
        Self {
            skills: &resume.skills,
            projects: &resume.projects,
            education: &resume.education,
            experience: &resume.experience,
        }
    }
}

/// Merges a persisted record; the document is tagged with the record's id.
pub fn merge_record(record: &ResumeRecord) -> Option<MergedDocument> {
    merge_sections(ResumeSections::from(record), record.user_id, Some(record.id))
}

pub fn merge_sections(
    sections: ResumeSections<'_>,
    user_id: Uuid,
    resume_id: Option<i64>,
) -> Option<MergedDocument> {
    let text = merged_text(sections);
    if text.is_empty() {
        return None;
    }
    Some(MergedDocument {
        text,
        user_id,
        resume_id,
    })
}

/// The merged text alone; empty when every section is empty.
pub fn merged_text(sections: ResumeSections<'_>) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(4);

    let skills: Vec<&str> = sections
        .skills
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if !skills.is_empty() {
        parts.push(format!("Skills: {}", skills.join(", ")));
    }

    if !sections.projects.is_empty() {
        let entries: Vec<String> = sections
            .projects
            .iter()
            .map(|p| {
                format!(
                    "{}:\n{}\nTech Stack: {}",
                    p.project_name,
                    p.description,
                    p.tech_stack.join(", ")
                )
            })
            .collect();
        parts.push(format!("Projects:\n{}", entries.join("\n\n")));
    }

    if !sections.education.is_empty() {
        let entries: Vec<String> = sections
            .education
            .iter()
            .map(|e| {
                format!(
                    "{} at {}\nYears: {}\nCGPA: {}",
                    e.degree, e.institution, e.years, e.cgpa_or_equivalent
                )
            })
            .collect();
        parts.push(format!("Education:\n{}", entries.join("\n\n")));
    }

    if !sections.experience.is_empty() {
        let entries: Vec<String> = sections.experience.iter().map(experience_entry).collect();
        parts.push(format!("Experience:\n{}", entries.join("\n\n")));
    }

    parts.join("\n").trim().to_string()
}

fn experience_entry(item: &ExperienceItem) -> String {
    let mut entry = format!("{} at {}", item.role, item.company);
    if !item.years.trim().is_empty() {
        entry.push_str(&format!("\nYears: {}", item.years));
    }
    if let Some(description) = item.description.as_deref().filter(|d| !d.trim().is_empty()) {
        entry.push('\n');
        entry.push_str(description);
    }
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::NOT_AVAILABLE;
    use chrono::Utc;

    fn record() -> ResumeRecord {
        ResumeRecord {
            id: 7,
            user_id: Uuid::new_v4(),
            file_name: "ada.pdf".to_string(),
            candidate_name: "Ada Lovelace".to_string(),
            skills: vec!["Rust".to_string(), "SQL".to_string()],
            experience: vec![ExperienceItem {
                company: "Analytical Engines".to_string(),
                role: "Engineer".to_string(),
                years: "2".to_string(),
                description: Some("Built the mill".to_string()),
            }],
            projects: vec![ProjectItem {
                project_name: "Note G".to_string(),
                tech_stack: vec!["Rust".to_string(), "Tokio".to_string()],
                description: "Computes Bernoulli numbers".to_string(),
            }],
            education: vec![EducationItem {
                institution: "XYZ University".to_string(),
                degree: "B.Tech".to_string(),
                years: "2018-2022".to_string(),
                cgpa_or_equivalent: "8.5".to_string(),
            }],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_full_record_sections_in_fixed_order() {
        let doc = merge_record(&record()).unwrap();
        assert_eq!(
            doc.text,
            "Skills: Rust, SQL\n\
             Projects:\nNote G:\nComputes Bernoulli numbers\nTech Stack: Rust, Tokio\n\
             Education:\nB.Tech at XYZ University\nYears: 2018-2022\nCGPA: 8.5\n\
             Experience:\nEngineer at Analytical Engines\nYears: 2\nBuilt the mill"
        );
        assert_eq!(doc.resume_id, Some(7));
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        let mut r = record();
        r.skills.clear();
        r.projects.clear();
        r.experience.clear();
        let doc = merge_record(&r).unwrap();
        assert_eq!(
            doc.text,
            "Education:\nB.Tech at XYZ University\nYears: 2018-2022\nCGPA: 8.5"
        );
    }

    #[test]
    fn test_all_sections_empty_merges_to_none_every_time() {
        let mut r = record();
        r.skills.clear();
        r.projects.clear();
        r.education.clear();
        r.experience.clear();
        assert_eq!(merge_record(&r), None);
        assert_eq!(merge_record(&r), None);
    }

    #[test]
    fn test_blank_skills_do_not_count_as_content() {
        let resume = ExtractedResume {
            name: "Nobody".to_string(),
            skills: vec!["  ".to_string()],
            ..Default::default()
        };
        assert!(merge_sections(ResumeSections::from(&resume), Uuid::nil(), None).is_none());
    }

    #[test]
    fn test_multiple_entries_are_blank_line_separated() {
        let resume = ExtractedResume {
            education: vec![
                EducationItem {
                    institution: "XYZ University".to_string(),
                    degree: "B.Tech".to_string(),
                    years: "2018-2022".to_string(),
                    cgpa_or_equivalent: "8.5".to_string(),
                },
                EducationItem {
                    institution: "ABC School".to_string(),
                    degree: "Higher Secondary".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let text = merged_text(ResumeSections::from(&resume));
        assert_eq!(
            text,
            format!(
                "Education:\nB.Tech at XYZ University\nYears: 2018-2022\nCGPA: 8.5\n\n\
                 Higher Secondary at ABC School\nYears: \nCGPA: {NOT_AVAILABLE}"
            )
        );
    }

    #[test]
    fn test_merge_is_deterministic() {
        let r = record();
        assert_eq!(merge_record(&r), merge_record(&r));
    }
}
