pub(crate) mod evaluation;
pub(crate) mod execution;
pub(crate) mod grading;
pub(crate) mod submission_lifecycle;
pub(crate) mod testcase_generation;
