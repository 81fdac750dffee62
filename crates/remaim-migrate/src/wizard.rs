//! The interactive migration workflow.
//!
//! One run walks the operator through choosing a source project, a
//! destination project and access policies, then migrates every issue of
//! the source project in order. Several projects can be migrated in one
//! run; the user cache and enum mappings carry over between them.

use std::sync::Arc;

use remaim_core::{
    Config, DestinationProject, DestinationTracker, EditResult, Error, IssueSummary,
    LabelResolver, NewProject, Policies, ProjectListing, ProjectLookup, ProjectNode, Result,
    SourceTracker, TaskEdit,
};
use tracing::{info, warn};

use crate::attachments::AttachmentMirror;
use crate::finder::{ExistingRecordFinder, FindOutcome};
use crate::journal::JournalFormatter;
use crate::prompt::Prompter;
use crate::reconcile::ReconciliationState;
use crate::transactions::{AssemblyRequest, TransactionAssembler};
use crate::users::UserDirectory;

const DESTINATION_QUESTION: &str = "Please enter the id or slug of the project in Phabricator if you know it.\n\
     Press\n\
     [Enter] to see a list of available projects in Phabricator,\n\
     [0] to create a new project from the Redmine project's details or\n\
     [q] to quit and abort";

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The operator is done; everything confirmed was migrated
    Completed(MigrationReport),
    /// The operator quit or declined the pre-flight check
    Aborted,
}

/// Per-issue results of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub migrated: Vec<MigratedIssue>,
    /// Source issue ids left alone
    pub skipped: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigratedIssue {
    pub issue_id: u64,
    pub task_id: u64,
    pub phid: String,
    /// Whether an existing task was updated rather than created
    pub updated: bool,
}

/// Destination project chosen by the operator.
struct Target {
    project: DestinationProject,
    /// Policies already chosen while creating the project
    policies: Option<Policies>,
}

pub struct Wizard {
    source: Arc<dyn SourceTracker>,
    destination: Arc<dyn DestinationTracker>,
    state: ReconciliationState,
    users: UserDirectory,
    finder: ExistingRecordFinder,
    assembler: TransactionAssembler,
}

impl Wizard {
    /// Seed the run with the destination's statuses and the configured
    /// priority map.
    ///
    /// Any transport failure here means the destination cannot be reached.
    pub async fn connect(
        source: Arc<dyn SourceTracker>,
        labels: Arc<dyn LabelResolver>,
        destination: Arc<dyn DestinationTracker>,
        config: &Config,
        resume: bool,
    ) -> Result<Self> {
        let statuses = destination.query_statuses().await.map_err(|e| {
            if e.is_connectivity() {
                Error::Unreachable {
                    host: config.phabricator.url.clone(),
                    reason: e.to_string(),
                }
            } else {
                e
            }
        })?;
        info!(statuses = statuses.len(), resume = resume, "Connected to destination");

        Ok(Self {
            state: ReconciliationState::new(statuses, config.priority_map(), resume),
            users: UserDirectory::new(destination.clone()),
            finder: ExistingRecordFinder::new(destination.clone(), resume),
            assembler: TransactionAssembler::new(
                JournalFormatter::new(labels),
                AttachmentMirror::new(source.clone(), destination.clone()),
            ),
            source,
            destination,
        })
    }

    /// Run the workflow until the operator is done.
    pub async fn run(&mut self, prompter: &mut dyn Prompter) -> Result<RunOutcome> {
        self.source.assert_reachable().await?;
        let mut report = MigrationReport::default();

        loop {
            let listing = self.source.list_projects().await?;
            let project_id = select_source_project(&listing, prompter)?;

            let issues = match self.source.issues_for_project(project_id).await {
                Ok(issues) => issues,
                Err(Error::NoIssuesFound { project_id }) => {
                    prompter.say(&format!(
                        "No tasks found on project with id {}.\n",
                        project_id
                    ));
                    if prompter.confirm("Would you like to select another project? [y/N]")? {
                        continue;
                    }
                    return Ok(RunOutcome::Completed(report));
                }
                Err(e) => return Err(e),
            };

            let Some(target) = self.select_or_create_destination(project_id, prompter).await?
            else {
                return Ok(RunOutcome::Aborted);
            };
            let policies = match target.policies {
                Some(policies) => policies,
                None => self.define_policies(prompter).await?,
            };

            if !self
                .confirm_summary(project_id, &target.project, issues.len(), &policies, prompter)
                .await?
            {
                return Ok(RunOutcome::Aborted);
            }

            prompter.say("Working...\n");
            let count = self
                .migrate_issues(&issues, &target.project, &policies, prompter, &mut report)
                .await?;
            prompter.say(&format!(
                "{} tickets successfully migrated or updated!\n",
                count
            ));

            if !prompter.confirm("Import another project? [y/N]")? {
                return Ok(RunOutcome::Completed(report));
            }
        }
    }

    // =========================================================================
    // Destination project
    // =========================================================================

    /// `None` when the operator quits.
    async fn select_or_create_destination(
        &mut self,
        source_project: u64,
        prompter: &mut dyn Prompter,
    ) -> Result<Option<Target>> {
        loop {
            let choice = prompter.ask(DESTINATION_QUESTION)?;
            let mut policies = None;

            let (lookup, verb) = match choice.as_str() {
                "q" => {
                    prompter.say("Bye bye!\n");
                    return Ok(None);
                }
                "" => match self.browse_destination_projects(prompter).await? {
                    Some(id) => (ProjectLookup::Ids(vec![id]), "Selected"),
                    None => continue,
                },
                "0" => {
                    let chosen = self.define_policies(prompter).await?;
                    let created = self
                        .create_destination_project(source_project, &chosen)
                        .await?;
                    policies = Some(chosen);
                    (ProjectLookup::Ids(vec![created.id]), "Created")
                }
                other => match other.parse::<u64>() {
                    Ok(id) => (ProjectLookup::Ids(vec![id]), "Found"),
                    Err(_) => (ProjectLookup::Slugs(vec![other.to_string()]), "Found"),
                },
            };

            match self.destination.find_project(lookup).await? {
                Some(project) => {
                    prompter.say(&format!(
                        "{} project \"{}\" with PHID {}\n",
                        verb, project.name, project.phid
                    ));
                    return Ok(Some(Target { project, policies }));
                }
                None => prompter.say(&format!(
                    "Sorry, I could not find a project matching \"{}\" in Phabricator.\n",
                    choice
                )),
            }
        }
    }

    /// List every destination project and let the operator pick one by id.
    /// `None` sends the operator back to the previous question.
    async fn browse_destination_projects(
        &self,
        prompter: &mut dyn Prompter,
    ) -> Result<Option<u64>> {
        let mut projects = collect_all_projects(self.destination.as_ref()).await?;
        projects.sort_by_key(|p| p.id);

        prompter.say(&format!("{} total projects retrieved.\n\n", projects.len()));
        for project in &projects {
            prompter.say(&format!("[{} – {}]\n", project.id, project.name));
        }
        prompter.say("\n");

        let lowest = projects.first().map_or(0, |p| p.id);
        let highest = projects.last().map_or(0, |p| p.id);
        let answer = prompter.select_index(
            "Please select (type) a project ID or leave empty to go back to the previous step",
            highest,
            lowest,
            true,
        )?;
        if answer.is_empty() {
            return Ok(None);
        }

        let id: u64 = answer
            .parse()
            .map_err(|_| Error::InvalidData(format!("Not a project id: {}", answer)))?;
        if projects.iter().any(|p| p.id == id) {
            return Ok(Some(id));
        }

        prompter.say(&format!(
            "Sorry, if a project with id {} exists, you don't seem to have access to it. \
             Please check your permissions and the id you specified and try again.\n",
            id
        ));
        Ok(None)
    }

    async fn create_destination_project(
        &mut self,
        source_project: u64,
        policies: &Policies,
    ) -> Result<EditResult> {
        let detail = self.source.project_details(source_project).await?;
        let members = self.source.project_members(source_project).await?;
        let members = self.users.resolve_ordered(&members).await?;

        info!(
            name = detail.name,
            members = members.len(),
            "Creating destination project"
        );
        self.destination
            .create_project(NewProject {
                name: detail.name,
                members,
                policies: policies.clone(),
            })
            .await
    }

    // =========================================================================
    // Policies and pre-flight check
    // =========================================================================

    /// Let the operator pick the group project holding view and edit rights.
    async fn define_policies(&self, prompter: &mut dyn Prompter) -> Result<Policies> {
        let groups = self.destination.search_group_projects().await?;
        if groups.is_empty() {
            return Err(Error::NotFound(
                "no group projects to take view and edit policies from".to_string(),
            ));
        }

        prompter.say(
            "\nLet's set some policies on the new tasks, shall we?\n\
             Here are the group projects that I found:\n\n",
        );
        for (index, group) in groups.iter().enumerate() {
            prompter.say(&format!(
                "[{}] =>\t[ID]: {}\n\t[Name]: {}\n",
                index, group.id, group.name
            ));
        }

        let answer = prompter.select_index(
            "Select a group to get view and edit permissions",
            (groups.len() - 1) as u64,
            0,
            false,
        )?;
        let group = answer
            .parse::<usize>()
            .ok()
            .and_then(|index| groups.get(index))
            .ok_or_else(|| Error::InvalidData(format!("Not a group index: {}", answer)))?;

        Ok(Policies::uniform(&group.phid))
    }

    async fn confirm_summary(
        &self,
        source_project: u64,
        target: &DestinationProject,
        issue_count: usize,
        policies: &Policies,
        prompter: &mut dyn Prompter,
    ) -> Result<bool> {
        let detail = self.source.project_details(source_project).await?;

        prompter.say(&format!(
            "\n\n####################\n\
             # Pre-flight check #\n\
             ####################\n\
             Redmine project named \"{}\" with ID {}.\n\
             Target phabricator project named \"{}\" with ID {}.\n\
             View policy: {}, Edit policy: {}\n",
            detail.name, source_project, target.name, target.id, policies.view, policies.edit
        ));

        let confirmed = prompter.confirm(&format!(
            "{} tickets to be migrated! OK to continue? [y/N]",
            issue_count
        ))?;
        if !confirmed {
            prompter.say("KTHXBAI! Please visit again soon!\n");
        }
        Ok(confirmed)
    }

    // =========================================================================
    // Migration
    // =========================================================================

    /// Migrate issues one by one, returning how many were written.
    async fn migrate_issues(
        &mut self,
        issues: &[IssueSummary],
        target: &DestinationProject,
        policies: &Policies,
        prompter: &mut dyn Prompter,
        report: &mut MigrationReport,
    ) -> Result<usize> {
        let mut written = 0;

        for summary in issues {
            let issue = self.source.issue(summary.id).await?;

            let owner = match &issue.assigned_to {
                Some(assignee) => self.users.resolve_one(&assignee.name).await?,
                None => None,
            };

            let existing = match self.finder.find(&issue, &target.phid, prompter).await? {
                FindOutcome::Existing(task) => Some(task),
                FindOutcome::Absent => None,
                FindOutcome::Skip => {
                    skip(issue.id, &issue.subject, prompter, report);
                    continue;
                }
            };

            let request = AssemblyRequest {
                project_phid: &target.phid,
                issue: &issue,
                policies,
                existing: existing.as_ref(),
                owner: owner.as_deref(),
            };
            let Some(transactions) = self
                .assembler
                .assemble(&mut self.state, &mut self.users, prompter, request)
                .await?
            else {
                skip(issue.id, &issue.subject, prompter, report);
                continue;
            };

            let updated = existing.is_some();
            let result = self
                .destination
                .edit_task(TaskEdit {
                    object_identifier: existing.map(|task| task.phid),
                    transactions,
                })
                .await?;

            info!(
                issue = issue.id,
                task = result.id,
                updated = updated,
                "Issue migrated"
            );
            report.migrated.push(MigratedIssue {
                issue_id: issue.id,
                task_id: result.id,
                phid: result.phid,
                updated,
            });
            written += 1;
        }

        Ok(written)
    }
}

fn skip(issue_id: u64, subject: &str, prompter: &mut dyn Prompter, report: &mut MigrationReport) {
    warn!(issue = issue_id, "Issue skipped");
    prompter.say(&format!("Skipping issue #{} \"{}\".\n", issue_id, subject));
    report.skipped.push(issue_id);
}

/// Show the source project tree and ask for a project id until one from
/// the tree is given.
fn select_source_project(listing: &ProjectListing, prompter: &mut dyn Prompter) -> Result<u64> {
    prompter.say(&format!(
        "{} total projects retrieved.\n\n",
        listing.total_count
    ));
    for node in &listing.projects {
        prompter.say(&render_project(node, 0));
    }
    prompter.say("\n");

    loop {
        let answer = prompter.select_index(
            "Please select (type) a project ID",
            listing.highest_id,
            listing.lowest_id,
            false,
        )?;
        match answer.parse::<u64>() {
            Ok(id) if listing.contains(id) => return Ok(id),
            _ => prompter.say(&format!(
                "There is no project with id {}, please try again.\n",
                answer
            )),
        }
    }
}

/// Text rendering of a project and its sub-projects, one per line.
pub fn render_project(node: &ProjectNode, level: usize) -> String {
    let mut out = format!("[{} – {}]\n", node.project.id, node.project.name);
    let indent = "\t".repeat(level + 1);
    for child in &node.children {
        out.push_str(&indent);
        out.push_str("└–––––––– ");
        out.push_str(&render_project(child, level + 1));
    }
    out
}

/// Every destination project, following the search cursor to the end.
pub async fn collect_all_projects(
    destination: &dyn DestinationTracker,
) -> Result<Vec<DestinationProject>> {
    let mut projects = Vec::new();
    let mut after = None;

    loop {
        let page = destination.search_all_projects(after).await?;
        projects.extend(page.data);
        match page.after {
            Some(cursor) => after = Some(cursor),
            None => return Ok(projects),
        }
    }
}
