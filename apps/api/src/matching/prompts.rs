// Matching LLM prompt templates.
// All prompts for the matching module are defined here.

pub const RECRUITER_SCORE_SYSTEM: &str = "\
You are a strict technical recruiter screening resumes against a job description. \
You MUST respond with a single valid JSON object only. No markdown fences, no commentary.";

pub const RECRUITER_SCORE_PROMPT: &str = r#"Compare the following job description and resume.

JOB DESCRIPTION:
{job_description}

RESUME:
{resume_text}

TASKS:
1. Review the resume in the context of the job description.
2. Score it out of 100:
   a. Projects (50 pts): uniqueness and technical difficulty.
   b. Experience (30 pts): relevance and depth.
   c. CGPA (20 pts): only weigh this when candidates are otherwise similarly strong.
3. Set "is_match" to false when the resume lacks skills or experience the job requires.
   In that case the summary must say "No Resume Found".

Return ONLY this JSON object:
{
  "match_score": 85,
  "is_match": true,
  "summary": "Strong technical projects aligned with the role. Great match overall."
}"#;

pub const SELF_SCORE_SYSTEM: &str = "\
You are a demanding career coach reviewing a resume against a job description. \
You MUST respond with a single valid JSON object only. No markdown fences, no commentary.";

pub const SELF_SCORE_PROMPT: &str = r#"Compare the following job description and resume.

JOB DESCRIPTION:
{job_description}

RESUME:
{resume_text}

TASKS:
1. List the top matching keywords and skills.
2. List missing or weakly mentioned skills the job requires.
3. Estimate a match percentage from 0 to 100. Be very hard on the resume.
4. Suggest resume improvements based on the job description.
5. Point out any errors or typos.

Return ONLY this JSON object:
{
  "match_keywords": ["keyword1", "keyword2"],
  "missing_skills": ["skill1", "skill2"],
  "match_score": 75,
  "suggestions": "1. Suggestion one\n2. Suggestion two"
}"#;
