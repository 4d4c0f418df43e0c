//! Dependency graph traversal: bounded-depth BFS over `dependency_edges`,
//! cycle-safe by tracking the visited set per traversal path rather than
//! globally. A node reachable by two distinct paths is reported on both,
//! while a node that reappears on its own path is not.

use crate::error::Result;
use crate::models::ReferenceType;
use crate::store::Store;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Upper bound on emitted hits, independent of `max_depth`, so a densely
/// connected repository can't make a single query unbounded.
const MAX_RESULTS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Dependents,
    Dependencies,
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyHit {
    pub file_id: String,
    pub path: String,
    pub depth: u32,
    pub reference_type: ReferenceType,
    /// Paths of the nodes walked to reach this hit, starting at the file the
    /// traversal began from and ending at this hit's own path.
    pub via_path: Vec<String>,
}

struct Edge {
    source_file_id: String,
    target_file_id: String,
    reference_type: ReferenceType,
}

fn is_test_path(path: &str) -> bool {
    path.contains(".test.")
        || path.contains(".spec.")
        || path.contains("/__tests__/")
        || path.contains("/test/")
        || path.contains("/tests/")
}

fn load_edges(store: &Store, repository_id: &str) -> Result<Vec<Edge>> {
    store.read(|conn| {
        let mut stmt = conn.prepare(
            "SELECT source_file_id, target_file_id, reference_type FROM dependency_edges WHERE repository_id = ?1",
        )?;
        let rows = stmt
            .query_map([repository_id], |row| {
                let reference_type_str: String = row.get(2)?;
                Ok(Edge {
                    source_file_id: row.get(0)?,
                    target_file_id: row.get(1)?,
                    reference_type: ReferenceType::from_str(&reference_type_str)
                        .unwrap_or(ReferenceType::Import),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

fn file_path(store: &Store, file_id: &str) -> Result<Option<String>> {
    store.read(|conn| {
        conn.query_row(
            "SELECT path FROM indexed_files WHERE id = ?1",
            [file_id],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|e| {
            if matches!(e, rusqlite::Error::QueryReturnedNoRows) {
                Ok(None)
            } else {
                Err(e.into())
            }
        })
    })
}

/// Resolve a repository-relative path to its current `indexed_files.id`.
pub fn file_id_for_path(store: &Store, repository_id: &str, path: &str) -> Result<Option<String>> {
    store.read(|conn| {
        conn.query_row(
            "SELECT id FROM indexed_files WHERE repository_id = ?1 AND path = ?2",
            rusqlite::params![repository_id, path],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|e| {
            if matches!(e, rusqlite::Error::QueryReturnedNoRows) {
                Ok(None)
            } else {
                Err(e.into())
            }
        })
    })
}

/// BFS from `start_file_id` up to `max_depth` hops, following `direction`.
/// `include_tests` only filters which nodes are reported: a file matched by
/// a conventional test-path pattern is still walked through and still
/// counts toward depth, it is just not pushed into the result set.
/// `reference_types`, when non-empty, restricts which edge kinds are
/// followed.
pub fn search_dependencies(
    store: &Store,
    repository_id: &str,
    start_file_id: &str,
    direction: Direction,
    max_depth: u32,
    include_tests: bool,
    reference_types: &[ReferenceType],
) -> Result<Vec<DependencyHit>> {
    let edges = load_edges(store, repository_id)?;
    let mut hits = Vec::new();

    let start_path = file_path(store, start_file_id)?.unwrap_or_default();

    // One BFS queue entry per (node, path-local visited ids, path-local
    // visited paths, depth). Test nodes are still enqueued and counted
    // toward depth when `include_tests` is false; they are only omitted
    // from `hits`, so a non-test file reachable solely through a test file
    // remains discoverable.
    let mut queue: VecDeque<(String, Vec<String>, Vec<String>, u32)> = VecDeque::new();
    queue.push_back((
        start_file_id.to_string(),
        vec![start_file_id.to_string()],
        vec![start_path],
        0,
    ));

    let mut expanded = 0usize;

    while let Some((current, visited_on_path, paths_on_path, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        expanded += 1;
        if expanded > MAX_RESULTS * 4 {
            break;
        }

        let forward = matches!(direction, Direction::Dependencies | Direction::Both);
        let backward = matches!(direction, Direction::Dependents | Direction::Both);

        for edge in &edges {
            if !reference_types.is_empty() && !reference_types.contains(&edge.reference_type) {
                continue;
            }
            let next = if forward && edge.source_file_id == current {
                Some(edge.target_file_id.clone())
            } else if backward && edge.target_file_id == current {
                Some(edge.source_file_id.clone())
            } else {
                None
            };
            let Some(next_id) = next else { continue };
            if visited_on_path.contains(&next_id) {
                continue; // cycle on this path, not a global dedup
            }

            let next_path = file_path(store, &next_id)?.unwrap_or_default();
            let is_test = is_test_path(&next_path);

            let mut next_visited = visited_on_path.clone();
            next_visited.push(next_id.clone());
            let mut next_paths = paths_on_path.clone();
            next_paths.push(next_path.clone());

            if (include_tests || !is_test) && hits.len() < MAX_RESULTS {
                hits.push(DependencyHit {
                    file_id: next_id.clone(),
                    path: next_path,
                    depth: depth + 1,
                    reference_type: edge.reference_type,
                    via_path: next_paths.clone(),
                });
            }
            queue.push_back((next_id, next_visited, next_paths, depth + 1));
        }
    }

    Ok(hits)
}
