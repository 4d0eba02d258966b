//! Candidate and recruiter onboarding.
//!
//! Candidates walk through [`Step`]s in order. Each step can be checked on its
//! own while the wizard is open; the final submission re-checks everything and
//! writes the user, the profile and every list in one transaction.

pub mod handlers;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::errors::AppError;
use crate::resources::{
    BatchResource, CertificateInput, EducationInput, ExperienceInput, LinkInput, ProjectInput,
    SkillInput,
};
use crate::users::PersonalInfo;
use crate::validation::{
    check, check_each, is_optional_http_url, rule, validate_not_blank, validate_username,
    FieldError,
};

const MAX_SKILLS: usize = 50;
const MAX_ENTRIES: usize = 20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Personal,
    Skills,
    Education,
    Experience,
    Projects,
    Certificates,
    Links,
}

impl Step {
    pub const ALL: [Step; 7] = [
        Step::Personal,
        Step::Skills,
        Step::Education,
        Step::Experience,
        Step::Projects,
        Step::Certificates,
        Step::Links,
    ];

    pub fn first() -> Step {
        Step::ALL[0]
    }

    pub fn next(self) -> Option<Step> {
        let index = Step::ALL.iter().position(|s| *s == self)?;
        Step::ALL.get(index + 1).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Personal => "personal",
            Step::Skills => "skills",
            Step::Education => "education",
            Step::Experience => "experience",
            Step::Projects => "projects",
            Step::Certificates => "certificates",
            Step::Links => "links",
        }
    }

    /// Allowed number of entries for list steps.
    fn bounds(&self) -> (usize, usize) {
        match self {
            Step::Skills => (1, MAX_SKILLS),
            _ => (0, MAX_ENTRIES),
        }
    }

    /// Checks one step's payload as the wizard would submit it: an object for
    /// `personal`, an array of entries for every other step.
    pub fn validate_payload(
        self,
        payload: serde_json::Value,
        actor: Uuid,
    ) -> Result<Vec<FieldError>, AppError> {
        let errors = match self {
            Step::Personal => personal_errors(&parse::<PersonalInfo>(self, payload)?, actor),
            Step::Skills => list_errors(self, &parse::<Vec<SkillInput>>(self, payload)?, actor),
            Step::Education => {
                list_errors(self, &parse::<Vec<EducationInput>>(self, payload)?, actor)
            }
            Step::Experience => {
                list_errors(self, &parse::<Vec<ExperienceInput>>(self, payload)?, actor)
            }
            Step::Projects => list_errors(self, &parse::<Vec<ProjectInput>>(self, payload)?, actor),
            Step::Certificates => {
                list_errors(self, &parse::<Vec<CertificateInput>>(self, payload)?, actor)
            }
            Step::Links => list_errors(self, &parse::<Vec<LinkInput>>(self, payload)?, actor),
        };
        Ok(errors)
    }
}

fn parse<T: DeserializeOwned>(step: Step, payload: serde_json::Value) -> Result<T, AppError> {
    serde_json::from_value(payload)
        .map_err(|e| AppError::Validation(format!("Invalid {} payload: {e}", step.as_str())))
}

fn personal_errors(info: &PersonalInfo, actor: Uuid) -> Vec<FieldError> {
    let prefix = Step::Personal.as_str();
    let mut errors = check(prefix, info);
    errors.extend(info.check_references(prefix, actor));
    errors
}

fn list_errors<R: BatchResource>(step: Step, items: &[R], actor: Uuid) -> Vec<FieldError> {
    let prefix = step.as_str();
    let (min, max) = step.bounds();
    let mut errors = Vec::new();
    if items.len() < min {
        errors.push(FieldError::new(prefix, format!("add at least {min} entry")));
    }
    if items.len() > max {
        errors.push(FieldError::new(prefix, format!("may contain at most {max} entries")));
    }
    errors.extend(check_each(prefix, items));
    for (i, item) in items.iter().enumerate() {
        errors.extend(item.check_references(&format!("{prefix}[{i}]"), actor));
    }
    errors.extend(R::check_collection(prefix, items));
    errors
}

/// Everything the candidate wizard collects, submitted at the end.
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateOnboarding {
    pub personal: PersonalInfo,
    #[serde(default)]
    pub skills: Vec<SkillInput>,
    #[serde(default)]
    pub education: Vec<EducationInput>,
    #[serde(default)]
    pub experience: Vec<ExperienceInput>,
    #[serde(default)]
    pub projects: Vec<ProjectInput>,
    #[serde(default)]
    pub certificates: Vec<CertificateInput>,
    #[serde(default)]
    pub links: Vec<LinkInput>,
}

impl CandidateOnboarding {
    /// Field errors across every step, prefixed by step name.
    pub fn errors(&self, actor: Uuid) -> Vec<FieldError> {
        let mut errors = personal_errors(&self.personal, actor);
        errors.extend(list_errors(Step::Skills, &self.skills, actor));
        errors.extend(list_errors(Step::Education, &self.education, actor));
        errors.extend(list_errors(Step::Experience, &self.experience, actor));
        errors.extend(list_errors(Step::Projects, &self.projects, actor));
        errors.extend(list_errors(Step::Certificates, &self.certificates, actor));
        errors.extend(list_errors(Step::Links, &self.links, actor));
        errors
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "check_recruiter"))]
pub struct RecruiterOnboarding {
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    #[validate(length(min = 2, max = 100), custom(function = "validate_not_blank"))]
    pub full_name: String,
    #[serde(default)]
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 2, max = 120), custom(function = "validate_not_blank"))]
    pub company_name: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub company_website: Option<String>,
    #[validate(length(min = 2, max = 100), custom(function = "validate_not_blank"))]
    pub designation: String,
}

fn check_recruiter(input: &RecruiterOnboarding) -> Result<(), ValidationError> {
    if !is_optional_http_url(input.company_website.as_deref()) {
        return Err(rule("company_website", "must be an http(s) URL"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_order() {
        assert_eq!(Step::first(), Step::Personal);
        assert_eq!(Step::Personal.next(), Some(Step::Skills));
        assert_eq!(Step::Certificates.next(), Some(Step::Links));
        assert_eq!(Step::Links.next(), None);
    }

    #[test]
    fn test_step_path_names() {
        let step: Step = serde_json::from_value(json!("certificates")).unwrap();
        assert_eq!(step, Step::Certificates);
        assert!(serde_json::from_value::<Step>(json!("hobbies")).is_err());
    }

    #[test]
    fn test_skills_step_requires_one_unique_skill() {
        let actor = Uuid::new_v4();
        let errors = Step::Skills.validate_payload(json!([]), actor).unwrap();
        assert_eq!(errors, vec![FieldError::new("skills", "add at least 1 entry")]);

        let errors = Step::Skills
            .validate_payload(json!([{"name": "Rust"}, {"name": "RUST"}]), actor)
            .unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "skills[1].name");
    }

    #[test]
    fn test_list_step_cap() {
        let links: Vec<_> = (0..21)
            .map(|i| json!({"platform": "other", "url": format!("https://site{i}.dev")}))
            .collect();
        let errors = Step::Links
            .validate_payload(serde_json::Value::Array(links), Uuid::new_v4())
            .unwrap();
        assert_eq!(
            errors,
            vec![FieldError::new("links", "may contain at most 20 entries")]
        );
    }

    #[test]
    fn test_malformed_step_payload_is_rejected() {
        let result = Step::Education.validate_payload(json!({"institution": "MIT"}), Uuid::new_v4());
        assert!(matches!(result, Err(AppError::Validation(msg)) if msg.contains("education")));
    }

    #[test]
    fn test_certificate_files_must_belong_to_caller() {
        let actor = Uuid::new_v4();
        let payload = json!([{
            "name": "AWS Solutions Architect",
            "issuer": "Amazon",
            "file_path": format!("{}/temp/abc_cert.pdf", Uuid::new_v4()),
        }]);
        let errors = Step::Certificates.validate_payload(payload, actor).unwrap();
        assert_eq!(errors[0].field, "certificates[0].file_path");
    }

    #[test]
    fn test_full_submission_prefixes_errors_by_step() {
        let payload: CandidateOnboarding = serde_json::from_value(json!({
            "personal": {"full_name": "Ada Lovelace", "username": "ada"},
            "skills": [{"name": "Rust"}],
            "links": [
                {"platform": "github", "url": "https://github.com/a"},
                {"platform": "github", "url": "https://github.com/b"}
            ]
        }))
        .unwrap();
        let errors = payload.errors(Uuid::new_v4());
        assert_eq!(
            errors,
            vec![FieldError::new("links", "only one github link is allowed")]
        );
    }

    #[test]
    fn test_recruiter_rules() {
        let input: RecruiterOnboarding = serde_json::from_value(json!({
            "username": "acme-hr",
            "full_name": "Grace Hopper",
            "company_name": "Acme",
            "company_website": "acme.com",
            "designation": "Talent Lead"
        }))
        .unwrap();
        let errors = check("", &input);
        assert_eq!(errors, vec![FieldError::new("company_website", "must be an http(s) URL")]);
    }
}
