//! Per-container results and overall exit code

use serde::Serialize;

/// Outcome of one container in a stopped task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerResult {
    pub name: String,
    /// Missing while the container runs, and for containers that never started
    pub exit_code: Option<i32>,
    pub reason: Option<String>,
}

impl ContainerResult {
    pub fn new(name: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self {
            name: name.into(),
            exit_code,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// A container failed only if it reported a non-zero exit code
    pub fn failed(&self) -> bool {
        matches!(self.exit_code, Some(code) if code != 0)
    }
}

/// First container, in task order, that exited non-zero
pub fn first_failure(containers: &[ContainerResult]) -> Option<&ContainerResult> {
    containers.iter().find(|c| c.failed())
}

/// Process exit code for a set of container results.
///
/// The first non-zero exit code wins, even if a later container failed with a
/// different code. Zero when no container failed.
pub fn exit_code_for(containers: &[ContainerResult]) -> i32 {
    first_failure(containers)
        .and_then(|c| c.exit_code)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(codes: &[Option<i32>]) -> Vec<ContainerResult> {
        codes
            .iter()
            .enumerate()
            .map(|(i, code)| ContainerResult::new(format!("c{i}"), *code))
            .collect()
    }

    #[test]
    fn all_zero_is_success() {
        assert_eq!(exit_code_for(&results(&[Some(0), Some(0)])), 0);
    }

    #[test]
    fn non_zero_propagates() {
        assert_eq!(exit_code_for(&results(&[Some(0), Some(137)])), 137);
    }

    #[test]
    fn first_non_zero_wins_over_later_failures() {
        // Ordering matters: 2 comes before 137, so 2 is reported
        let containers = results(&[Some(0), Some(2), Some(137)]);
        assert_eq!(exit_code_for(&containers), 2);
        assert_eq!(first_failure(&containers).map(|c| c.name.as_str()), Some("c1"));
    }

    #[test]
    fn missing_exit_code_is_not_a_failure() {
        assert_eq!(exit_code_for(&results(&[None, Some(0)])), 0);
        assert_eq!(exit_code_for(&results(&[None, Some(1)])), 1);
        assert!(first_failure(&results(&[None])).is_none());
    }

    #[test]
    fn empty_task_is_success() {
        assert_eq!(exit_code_for(&[]), 0);
    }

    #[test]
    fn negative_codes_count_as_failures() {
        assert_eq!(exit_code_for(&results(&[Some(-1)])), -1);
    }
}
