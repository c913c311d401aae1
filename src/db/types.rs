use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "userrole", rename_all = "lowercase")]
pub(crate) enum UserRole {
    Admin,
    Recruiter,
    Candidate,
}

impl UserRole {
    /// Roles allowed to author problems, manage testcases and evaluate.
    pub(crate) fn can_manage(self) -> bool {
        matches!(self, Self::Admin | Self::Recruiter)
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Recruiter => "recruiter",
            Self::Candidate => "candidate",
        }
    }
}

/// Lifecycle of one candidate attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "submissionstate", rename_all = "lowercase")]
pub(crate) enum SubmissionState {
    Draft,
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "gradestatus")]
pub(crate) enum GradeStatus {
    Passed,
    #[serde(rename = "Partially Passed")]
    #[sqlx(rename = "Partially Passed")]
    PartiallyPassed,
    Failed,
}

impl GradeStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "Passed",
            Self::PartiallyPassed => "Partially Passed",
            Self::Failed => "Failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "testcasestatus")]
pub(crate) enum TestcaseStatus {
    Passed,
    Failed,
}

impl TestcaseStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "Passed",
            Self::Failed => "Failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "testcasecategory", rename_all = "lowercase")]
pub(crate) enum TestcaseCategory {
    Normal,
    Edge,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "testcaseorigin", rename_all = "lowercase")]
pub(crate) enum TestcaseOrigin {
    Manual,
    Ai,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_status_serializes_with_space() {
        let value = serde_json::to_value(GradeStatus::PartiallyPassed).expect("json");
        assert_eq!(value, "Partially Passed");
        assert_eq!(GradeStatus::PartiallyPassed.as_str(), "Partially Passed");
    }

    #[test]
    fn only_staff_roles_manage() {
        assert!(UserRole::Admin.can_manage());
        assert!(UserRole::Recruiter.can_manage());
        assert!(!UserRole::Candidate.can_manage());
    }
}
