//! Moves one attachment from the chat platform into storage and makes it
//! publicly viewable.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use tracing::{debug, info};

use crate::domain::{AttachmentRef, UploadedAsset};
use crate::errors::RelayError;

/// Body of a file in transit. Chunks flow straight from the download into the
/// upload; nothing collects the whole file.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

pub const PUBLIC_VIEW_BASE_URL: &str = "https://drive.google.com/uc?export=view&id=";

#[async_trait]
pub trait FileSource: Send + Sync {
    async fn lookup(&self, file_id: &str) -> Result<AttachmentRef, RelayError>;
    async fn open(&self, attachment: &AttachmentRef) -> Result<ByteStream, RelayError>;
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Returns the storage provider's identifier for the created file.
    async fn create(
        &self,
        attachment: &AttachmentRef,
        content: ByteStream,
    ) -> Result<String, RelayError>;

    async fn grant_public_read(
        &self,
        attachment: &AttachmentRef,
        stored_file_id: &str,
    ) -> Result<(), RelayError>;
}

pub fn public_view_url(stored_file_id: &str) -> String {
    format!("{PUBLIC_VIEW_BASE_URL}{stored_file_id}")
}

#[derive(Clone)]
pub struct FileRelay {
    source: Arc<dyn FileSource>,
    store: Arc<dyn FileStore>,
    transfer_timeout: Duration,
}

impl FileRelay {
    pub fn new(
        source: Arc<dyn FileSource>,
        store: Arc<dyn FileStore>,
        transfer_timeout: Duration,
    ) -> Self {
        Self { source, store, transfer_timeout }
    }

    /// Single attempt, no retries. The whole transfer shares one deadline.
    pub async fn relay(&self, file_id: &str) -> Result<UploadedAsset, RelayError> {
        match tokio::time::timeout(self.transfer_timeout, self.transfer(file_id)).await {
            Ok(result) => result,
            Err(_) => Err(RelayError::Timeout {
                file_id: file_id.to_owned(),
                timeout_secs: self.transfer_timeout.as_secs(),
            }),
        }
    }

    async fn transfer(&self, file_id: &str) -> Result<UploadedAsset, RelayError> {
        let attachment = self.source.lookup(file_id).await?;
        if attachment.download_url.trim().is_empty() {
            return Err(RelayError::Metadata {
                file_id: file_id.to_owned(),
                detail: "file has no downloadable url".to_owned(),
            });
        }
        debug!(
            event_name = "pipeline.relay.metadata_resolved",
            file_id,
            display_name = %attachment.display_name,
            mime_type = %attachment.mime_type,
            "resolved attachment metadata"
        );

        let content = self.source.open(&attachment).await?;
        let stored_file_id = self.store.create(&attachment, content).await?;
        if stored_file_id.trim().is_empty() {
            return Err(RelayError::Upload {
                file_id: file_id.to_owned(),
                detail: "storage provider returned no file id".to_owned(),
            });
        }

        self.store.grant_public_read(&attachment, &stored_file_id).await?;

        info!(
            event_name = "pipeline.relay.completed",
            file_id,
            stored_file_id = %stored_file_id,
            "attachment relayed to storage"
        );
        Ok(UploadedAsset::new(public_view_url(&stored_file_id)))
    }
}
