//! Field-scoped updates expressed as JSON merge patches (RFC 7386).
//!
//! A patch names only the fields it changes. Objects merge recursively,
//! `null` removes a key, and any other value replaces what was there, so two
//! writers touching different keys of the same map never overwrite each other.

use serde_json::{Map, Value};

use crier_core::{Job, JobState, ReporterName};

use super::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPatch(Value);

impl JobPatch {
    /// Record `state` as the last state `reporter` reported.
    ///
    /// Touches only `status.prev_report_states.<reporter>`.
    pub fn report_state(reporter: &ReporterName, state: JobState) -> Self {
        let mut states = Map::new();
        states.insert(
            reporter.to_string(),
            Value::String(state.as_str().to_string()),
        );

        let mut status = Map::new();
        status.insert("prev_report_states".to_string(), Value::Object(states));

        let mut root = Map::new();
        root.insert("status".to_string(), Value::Object(status));

        Self(Value::Object(root))
    }

    /// Wrap an arbitrary merge patch. The top level must be an object.
    pub fn merge(value: Value) -> Result<Self, StoreError> {
        if !value.is_object() {
            return Err(StoreError::Patch(
                "merge patch must be a JSON object".to_string(),
            ));
        }
        Ok(Self(value))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Produce the patched copy of `job`.
    ///
    /// The job name is immutable; a patch that changes it is rejected.
    pub fn apply_to(&self, job: &Job) -> Result<Job, StoreError> {
        let mut doc = serde_json::to_value(job).map_err(|e| StoreError::Patch(e.to_string()))?;
        merge_patch(&mut doc, &self.0);

        let patched: Job =
            serde_json::from_value(doc).map_err(|e| StoreError::Patch(e.to_string()))?;

        if patched.name != job.name {
            return Err(StoreError::Patch(format!(
                "job name is immutable (was {}, patch sets {})",
                job.name, patched.name
            )));
        }

        Ok(patched)
    }
}

/// Apply `patch` to `target` in place with JSON merge patch semantics.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(fields) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }

    if let Value::Object(existing) = target {
        for (key, value) in fields {
            if value.is_null() {
                existing.remove(key);
            } else {
                merge_patch(existing.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crier_core::JobName;

    use super::*;

    #[test]
    fn merge_follows_rfc7386() {
        let mut doc = json!({"a": "b", "c": {"d": "e", "f": "g"}, "keep": [1, 2]});
        merge_patch(&mut doc, &json!({"a": "z", "c": {"f": null}, "new": {"x": 1}}));

        assert_eq!(
            doc,
            json!({"a": "z", "c": {"d": "e"}, "keep": [1, 2], "new": {"x": 1}})
        );
    }

    #[test]
    fn non_object_patch_replaces() {
        let mut doc = json!({"a": 1});
        merge_patch(&mut doc, &json!(["x"]));
        assert_eq!(doc, json!(["x"]));
    }

    #[test]
    fn report_state_touches_only_its_entry() {
        let slack = ReporterName::new("slack").unwrap();
        let github = ReporterName::new("github").unwrap();

        let mut job = Job::new(JobName::new("foo").unwrap()).with_state(JobState::Pending);
        job.spec.report = true;
        job.status
            .prev_report_states
            .insert(github.clone(), JobState::Triggered);

        let patch = JobPatch::report_state(&slack, JobState::Pending);
        assert_eq!(
            patch.as_value(),
            &json!({"status": {"prev_report_states": {"slack": "pending"}}})
        );

        let patched = patch.apply_to(&job).unwrap();
        assert_eq!(patched.reported_state(&slack), Some(JobState::Pending));
        assert_eq!(patched.reported_state(&github), Some(JobState::Triggered));
        assert_eq!(patched.spec, job.spec);
        assert_eq!(patched.status.state, JobState::Pending);
    }

    #[test]
    fn rejects_name_change_and_non_objects() {
        let job = Job::new(JobName::new("foo").unwrap());
        let patch = JobPatch::merge(json!({"name": "bar"})).unwrap();
        assert!(matches!(patch.apply_to(&job), Err(StoreError::Patch(_))));

        assert!(JobPatch::merge(json!("nope")).is_err());
    }
}
