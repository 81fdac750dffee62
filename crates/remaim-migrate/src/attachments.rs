//! Copying issue attachments to the destination.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use remaim_core::{DestinationTracker, Issue, Result, SourceTracker};
use tracing::debug;

/// Downloads attachments from the source and uploads them to the
/// destination, yielding the file references to embed in descriptions.
pub struct AttachmentMirror {
    source: Arc<dyn SourceTracker>,
    destination: Arc<dyn DestinationTracker>,
}

impl AttachmentMirror {
    pub fn new(source: Arc<dyn SourceTracker>, destination: Arc<dyn DestinationTracker>) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// Mirror every attachment of `issue`, returning `{F123}` style tokens
    /// in attachment order.
    pub async fn mirror(&self, issue: &Issue, view_policy: &str) -> Result<Vec<String>> {
        let mut tokens = Vec::with_capacity(issue.attachments.len());

        for attachment in &issue.attachments {
            debug!(
                issue = issue.id,
                file = attachment.filename,
                "Mirroring attachment"
            );

            let content = self
                .source
                .download_attachment(&attachment.content_url)
                .await?;
            let encoded = STANDARD.encode(content);

            let phid = self
                .destination
                .upload_file(&attachment.filename, &encoded, view_policy)
                .await?;
            let info = self.destination.file_info(&phid).await?;

            tokens.push(format!("{{{}}}", info.object_name));
        }

        Ok(tokens)
    }
}
