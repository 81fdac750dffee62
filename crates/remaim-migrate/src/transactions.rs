//! Building the `maniphest.edit` transaction list for one issue.

use remaim_core::{Issue, Policies, Result, Task, Transaction, TransactionKind};

use crate::attachments::AttachmentMirror;
use crate::journal::JournalFormatter;
use crate::markup::to_remarkup;
use crate::prompt::Prompter;
use crate::reconcile::{ReconciliationState, Resolution};
use crate::users::UserDirectory;

/// Inputs for assembling the transactions of one issue.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyRequest<'a> {
    /// PHID of the destination project
    pub project_phid: &'a str,
    pub issue: &'a Issue,
    pub policies: &'a Policies,
    /// Task previously migrated from this issue, if any
    pub existing: Option<&'a Task>,
    /// PHID of the future task owner
    pub owner: Option<&'a str>,
}

/// Assembles transactions from an issue and its history.
pub struct TransactionAssembler {
    journal: JournalFormatter,
    attachments: AttachmentMirror,
}

impl TransactionAssembler {
    pub fn new(journal: JournalFormatter, attachments: AttachmentMirror) -> Self {
        Self {
            journal,
            attachments,
        }
    }

    /// Transactions for `request`, or `None` when the operator chose to
    /// skip the issue while mapping its status or priority.
    ///
    /// The result is ordered: project, title, description, status,
    /// subscribers, priority, owner, comments, view and edit policies.
    /// Transactions with an empty value are dropped, except for project,
    /// status and policies.
    pub async fn assemble(
        &self,
        state: &mut ReconciliationState,
        users: &mut UserDirectory,
        prompter: &mut dyn Prompter,
        request: AssemblyRequest<'_>,
    ) -> Result<Option<Vec<Transaction>>> {
        let issue = request.issue;

        // Enum mapping may ask the operator, settle it before any upload
        let status = match state.resolve_status(&issue.status.name, prompter)? {
            Resolution::Mapped(value) => value,
            Resolution::Skip => return Ok(None),
        };
        let priority = match &issue.priority {
            Some(priority) if !priority.name.is_empty() => {
                match state.resolve_priority(&priority.name, prompter)? {
                    Resolution::Mapped(value) => Some(value),
                    Resolution::Skip => return Ok(None),
                }
            }
            _ => None,
        };

        let mut transactions = vec![Transaction::list(
            TransactionKind::ProjectsSet,
            vec![request.project_phid.to_string()],
        )];

        if request
            .existing
            .is_none_or(|task| task.title != issue.subject)
        {
            transactions.push(Transaction::text(TransactionKind::Title, &issue.subject));
        }

        if let Some(description) = self.description(&request).await? {
            transactions.push(Transaction::text(TransactionKind::Description, description));
        }

        transactions.push(Transaction::text(TransactionKind::Status, status));

        if !issue.watchers.is_empty() {
            let names: Vec<String> = issue.watchers.iter().map(|w| w.name.clone()).collect();
            let subscribers = users.resolve_ordered(&names).await?;
            transactions.push(Transaction::list(TransactionKind::SubscribersSet, subscribers));
        }

        if let Some(priority) = priority {
            transactions.push(Transaction::text(TransactionKind::Priority, priority));
        }

        if let Some(owner) = request.owner.filter(|o| !o.is_empty()) {
            transactions.push(Transaction::text(TransactionKind::Owner, owner));
        }

        for entry in &issue.journals {
            if let Some(comment) = self.journal.format(entry, issue.project.id).await? {
                transactions.push(Transaction::text(TransactionKind::Comment, comment));
            }
        }

        transactions.push(Transaction::text(
            TransactionKind::View,
            &request.policies.view,
        ));
        transactions.push(Transaction::text(
            TransactionKind::Edit,
            &request.policies.edit,
        ));

        transactions.retain(|t| t.kind.is_invariant() || !t.value.is_empty());
        Ok(Some(transactions))
    }

    /// Converted description with attachment references appended, `None`
    /// when nothing changed since the last migration.
    async fn description(&self, request: &AssemblyRequest<'_>) -> Result<Option<String>> {
        let converted = to_remarkup(request.issue.description.as_deref().unwrap_or_default());
        let files = self
            .attachments
            .mirror(request.issue, &request.policies.view)
            .await?;

        if files.is_empty() {
            let unchanged = request
                .existing
                .is_some_and(|task| task.description == converted);
            return Ok((!unchanged).then_some(converted));
        }

        Ok(Some(format!("{}\n\n{}", converted, files.join(" "))))
    }
}
