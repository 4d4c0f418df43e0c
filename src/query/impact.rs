//! Change impact analysis: transitive dependents of a proposed change set,
//! the tests near it, and a coarse risk score.

use crate::error::Result;
use crate::query::dependencies::{file_id_for_path, search_dependencies, Direction};
use crate::store::Store;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const TRANSITIVE_DEPTH: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// Mirrors `bombe_mcp`'s change-impact thresholds, scaled to file-level
/// instead of symbol-level fan-in. A declared breaking change always bumps
/// the base level up by one step.
fn risk_level(direct: usize, transitive: usize, has_tests: bool, breaking_changes: usize) -> RiskLevel {
    let total = direct + transitive;
    let base = if total >= 12 || (total >= 6 && !has_tests) {
        RiskLevel::High
    } else if total >= 4 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    if breaking_changes == 0 {
        return base;
    }
    match base {
        RiskLevel::Low => RiskLevel::Medium,
        RiskLevel::Medium | RiskLevel::High => RiskLevel::High,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeImpactRequest {
    pub change_type: String,
    pub description: String,
    #[serde(default)]
    pub files_to_modify: Vec<String>,
    #[serde(default)]
    pub files_to_create: Vec<String>,
    #[serde(default)]
    pub files_to_delete: Vec<String>,
    #[serde(default)]
    pub breaking_changes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeImpact {
    pub change_type: String,
    pub impacted_files: Vec<String>,
    pub test_recommendations: Vec<String>,
    pub risk: RiskLevel,
    pub rationale: Vec<String>,
}

fn is_test_file(path: &str) -> bool {
    path.contains(".test.") || path.contains(".spec.") || path.contains("/__tests__/")
}

/// Resolve `paths` to the ids of files already in the index; paths that
/// don't resolve (e.g. a file that is only about to be created) are
/// silently dropped, since they have no existing dependency edges.
fn resolve_ids(store: &Store, repository_id: &str, paths: &[String]) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    for path in paths {
        if let Some(id) = file_id_for_path(store, repository_id, path)? {
            ids.push(id);
        }
    }
    Ok(ids)
}

pub fn analyze_change_impact(
    store: &Store,
    repository_id: &str,
    request: &ChangeImpactRequest,
) -> Result<ChangeImpact> {
    let modify_and_delete: BTreeSet<String> = request
        .files_to_modify
        .iter()
        .chain(request.files_to_delete.iter())
        .cloned()
        .collect();
    let modify_and_create: BTreeSet<String> = request
        .files_to_modify
        .iter()
        .chain(request.files_to_create.iter())
        .cloned()
        .collect();

    let dependent_ids = resolve_ids(store, repository_id, &modify_and_delete.into_iter().collect::<Vec<_>>())?;
    let mut direct = BTreeSet::new();
    let mut transitive = BTreeSet::new();
    for file_id in &dependent_ids {
        let hits = search_dependencies(store, repository_id, file_id, Direction::Dependents, TRANSITIVE_DEPTH, true, &[])?;
        for hit in hits {
            if hit.depth == 1 {
                direct.insert(hit.path);
            } else {
                transitive.insert(hit.path);
            }
        }
    }
    transitive.retain(|p| !direct.contains(p));

    let test_ids = resolve_ids(store, repository_id, &modify_and_create.into_iter().collect::<Vec<_>>())?;
    let mut test_recommendations = BTreeSet::new();
    for file_id in &test_ids {
        let hits = search_dependencies(store, repository_id, file_id, Direction::Dependents, TRANSITIVE_DEPTH, true, &[])?;
        for hit in hits {
            if is_test_file(&hit.path) {
                test_recommendations.insert(hit.path);
            }
        }
    }

    let risk = risk_level(
        direct.len(),
        transitive.len(),
        !test_recommendations.is_empty(),
        request.breaking_changes.len(),
    );

    let mut rationale = Vec::new();
    rationale.push(format!("{} file(s) directly depend on the changed set", direct.len()));
    if !transitive.is_empty() {
        rationale.push(format!("{} file(s) are transitively affected", transitive.len()));
    }
    if test_recommendations.is_empty() {
        rationale.push("no covering tests were found near the changed files".to_string());
    } else {
        rationale.push(format!("{} test file(s) cover the changed area", test_recommendations.len()));
    }
    if !request.breaking_changes.is_empty() {
        rationale.push(format!(
            "{} breaking change(s) declared: {}",
            request.breaking_changes.len(),
            request.breaking_changes.join("; ")
        ));
    }

    let mut impacted_files: Vec<String> = direct.into_iter().chain(transitive).collect();
    impacted_files.sort();
    impacted_files.dedup();

    Ok(ChangeImpact {
        change_type: request.change_type.clone(),
        impacted_files,
        test_recommendations: test_recommendations.into_iter().collect(),
        risk,
        rationale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_escalates_with_fan_in() {
        assert_eq!(risk_level(1, 0, true, 0).as_str(), "low");
        assert_eq!(risk_level(3, 2, true, 0).as_str(), "medium");
        assert_eq!(risk_level(10, 3, true, 0).as_str(), "high");
        assert_eq!(risk_level(6, 1, false, 0).as_str(), "high");
    }

    #[test]
    fn breaking_change_bumps_risk_up_one_step() {
        assert_eq!(risk_level(1, 0, true, 1).as_str(), "medium");
        assert_eq!(risk_level(3, 2, true, 2).as_str(), "high");
        assert_eq!(risk_level(10, 3, true, 1).as_str(), "high");
    }
}
