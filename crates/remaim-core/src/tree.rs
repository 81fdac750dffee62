//! Arranging a flat source project list into a parent/child tree.

use std::collections::BTreeMap;

use crate::types::{ProjectListing, ProjectNode, SourceProject};

/// Build the project tree: top-level projects (no parent) at the root,
/// sub-projects under their parent, every level sorted by ascending id.
///
/// Projects whose parent is not part of the list are treated as top-level.
pub fn build_project_tree(projects: Vec<SourceProject>) -> Vec<ProjectNode> {
    let known: Vec<u64> = projects.iter().map(|p| p.id).collect();
    let mut by_parent: BTreeMap<u64, Vec<SourceProject>> = BTreeMap::new();

    for project in projects {
        let parent = project
            .parent_id
            .filter(|id| known.contains(id))
            .unwrap_or(0);
        by_parent.entry(parent).or_default().push(project);
    }

    attach(&mut by_parent, 0)
}

fn attach(by_parent: &mut BTreeMap<u64, Vec<SourceProject>>, parent: u64) -> Vec<ProjectNode> {
    let mut level = by_parent.remove(&parent).unwrap_or_default();
    level.sort_by_key(|p| p.id);

    level
        .into_iter()
        .map(|project| {
            let children = attach(by_parent, project.id);
            ProjectNode { project, children }
        })
        .collect()
}

impl ProjectListing {
    /// Build a listing from the flat project list returned by the tracker.
    pub fn from_projects(total_count: u64, projects: Vec<SourceProject>) -> Self {
        let lowest_id = projects.iter().map(|p| p.id).min().unwrap_or(0);
        let highest_id = projects.iter().map(|p| p.id).max().unwrap_or(0);

        Self {
            total_count,
            lowest_id,
            highest_id,
            projects: build_project_tree(projects),
        }
    }
}
