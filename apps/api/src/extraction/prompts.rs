// Extraction LLM prompt templates.
// All prompts for the extraction module are defined here.

pub const RESUME_EXTRACT_SYSTEM: &str = "\
You are a precise resume data extractor. \
Convert raw resume text into structured JSON. \
You MUST respond with valid JSON only. No markdown fences, no explanations. \
Never invent details that are not in the resume text.";

pub const RESUME_EXTRACT_PROMPT: &str = r#"Analyze the following resume text and extract structured information.

RESUME TEXT:
{resume_text}

Extract:
- Full name (string)
- Skills (list of strings)
- Work experience (list of objects with company, role, years)
- Projects (list of objects with project_name, tech_stack, description)
- Education (list of objects with institution, degree, years, cgpa)

RULES:
1. Return ONLY a valid JSON object. No text before or after it.
2. If an education entry states a CGPA, percentage or marks, put it in "cgpa".
3. If CGPA is missing but marks or a percentage exist, use those instead.
4. If none are available, use "N/A".
5. Collapse letter-spaced text: "A n a n d" must become "Anand".
6. Use empty lists for sections the resume does not have.

OUTPUT SCHEMA (return exactly this structure):
{
  "name": "string",
  "skills": ["string"],
  "experience": [
    {"company": "string", "role": "string", "years": "string"}
  ],
  "projects": [
    {"project_name": "string", "tech_stack": ["string"], "description": "string"}
  ],
  "education": [
    {"institution": "string", "degree": "string", "years": "string", "cgpa": "string"}
  ]
}

EXAMPLE:
"B.Tech in Computer Science from XYZ University, 2018-2022, 8.5 CGPA" and
"Higher Secondary, ABC School, 85%" become:
"education": [
  {"institution": "XYZ University", "degree": "B.Tech in Computer Science", "years": "2018-2022", "cgpa": "8.5"},
  {"institution": "ABC School", "degree": "Higher Secondary", "years": "N/A", "cgpa": "85%"}
]"#;
