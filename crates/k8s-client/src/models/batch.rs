//! `batch/v1` kinds

use super::core::PodTemplateSpec;
use super::meta::{Condition, LabelSelector, ObjectMeta, Time, TypeMeta};
use serde::{Deserialize, Serialize};

/// Runs pods until a number of them complete
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(flatten)]
    pub type_meta: TypeMeta,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: JobSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
}

resource!(Job, "Job", "batch/v1", "jobs", namespaced);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JobSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completions: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_deadline_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_limit: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_selector: Option<bool>,
    pub template: PodTemplateSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JobStatus {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<Time>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<Time>,
    pub active: i32,
    pub succeeded: i32,
    pub failed: i32,
}

impl JobStatus {
    /// True once a `Complete` or `Failed` condition is `True`
    pub fn is_finished(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| (c.condition_type == "Complete" || c.condition_type == "Failed") && c.status == "True")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_finished_from_conditions() {
        let job: Job = serde_json::from_str(
            r#"{"metadata":{"name":"migrate","namespace":"prod"},
                "spec":{"template":{"spec":{"containers":[{"name":"m","image":"migrate:2"}],"restartPolicy":"Never"}}},
                "status":{"succeeded":1,"conditions":[{"type":"Complete","status":"True"}]}}"#,
        )
        .unwrap();
        let status = job.status.unwrap();
        assert_eq!(status.succeeded, 1);
        assert!(status.is_finished());
        assert!(!JobStatus::default().is_finished());
    }
}
