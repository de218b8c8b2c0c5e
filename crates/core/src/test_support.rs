//! In-memory collaborators for pipeline tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use tokio::sync::Mutex;

use crate::domain::{AttachmentRef, RowUpdatePayload};
use crate::errors::{NotifyError, RelayError, SheetError};
use crate::pipeline::{Notifier, SheetWriter};
use crate::relay::{ByteStream, FileSource, FileStore};

#[derive(Clone, Debug)]
pub(crate) struct FakeFile {
    pub content: Vec<u8>,
    pub missing_url: bool,
    pub download_fails: bool,
    pub delay: Duration,
}

pub(crate) struct FakeSource {
    pub files: HashMap<String, FakeFile>,
    pub lookups: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn with_files(ids: &[&str]) -> Self {
        let files = ids
            .iter()
            .map(|id| {
                let file = FakeFile {
                    content: format!("{id}-bytes").into_bytes(),
                    missing_url: false,
                    download_fails: false,
                    delay: Duration::ZERO,
                };
                ((*id).to_owned(), file)
            })
            .collect();
        Self { files, lookups: Mutex::new(Vec::new()) }
    }

    pub fn configure(mut self, id: &str, edit: impl FnOnce(&mut FakeFile)) -> Self {
        if let Some(file) = self.files.get_mut(id) {
            edit(file);
        }
        self
    }

    pub async fn lookups(&self) -> Vec<String> {
        self.lookups.lock().await.clone()
    }
}

#[async_trait]
impl FileSource for FakeSource {
    async fn lookup(&self, file_id: &str) -> Result<AttachmentRef, RelayError> {
        self.lookups.lock().await.push(file_id.to_owned());
        let Some(file) = self.files.get(file_id) else {
            return Err(RelayError::Metadata {
                file_id: file_id.to_owned(),
                detail: "file_not_found".to_owned(),
            });
        };
        if !file.delay.is_zero() {
            tokio::time::sleep(file.delay).await;
        }

        Ok(AttachmentRef {
            source_file_id: file_id.to_owned(),
            download_url: if file.missing_url {
                String::new()
            } else {
                format!("https://files.example/{file_id}")
            },
            display_name: format!("{file_id}.png"),
            mime_type: "image/png".to_owned(),
            size_bytes: Some(file.content.len() as u64),
        })
    }

    async fn open(&self, attachment: &AttachmentRef) -> Result<ByteStream, RelayError> {
        let file = self.files.get(&attachment.source_file_id).ok_or_else(|| {
            RelayError::Download {
                file_id: attachment.source_file_id.clone(),
                detail: "unknown file".to_owned(),
            }
        })?;
        if file.download_fails {
            return Err(RelayError::Download {
                file_id: attachment.source_file_id.clone(),
                detail: "HTTP 403".to_owned(),
            });
        }

        let chunks: Vec<Result<Bytes, std::io::Error>> =
            file.content.chunks(3).map(|chunk| Ok(Bytes::copy_from_slice(chunk))).collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

#[derive(Default)]
pub(crate) struct FakeStore {
    pub fail_permission_for: Option<String>,
    pub return_empty_id: bool,
    pub upload_delay: Duration,
    pub created: Mutex<Vec<(String, Vec<u8>)>>,
    pub shared: Mutex<Vec<String>>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeStore {
    pub fn with_upload_delay(upload_delay: Duration) -> Self {
        Self { upload_delay, ..Self::default() }
    }

    pub async fn created(&self) -> Vec<(String, Vec<u8>)> {
        self.created.lock().await.clone()
    }

    pub async fn shared(&self) -> Vec<String> {
        self.shared.lock().await.clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileStore for FakeStore {
    async fn create(
        &self,
        attachment: &AttachmentRef,
        content: ByteStream,
    ) -> Result<String, RelayError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.upload_delay.is_zero() {
            tokio::time::sleep(self.upload_delay).await;
        }
        let body = content
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
            .map_err(|error| RelayError::Upload {
                file_id: attachment.source_file_id.clone(),
                detail: error.to_string(),
            });
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.created.lock().await.push((attachment.display_name.clone(), body?));
        if self.return_empty_id {
            return Ok(String::new());
        }
        Ok(format!("drive-{}", attachment.source_file_id))
    }

    async fn grant_public_read(
        &self,
        attachment: &AttachmentRef,
        stored_file_id: &str,
    ) -> Result<(), RelayError> {
        if self.fail_permission_for.as_deref() == Some(stored_file_id) {
            return Err(RelayError::Permission {
                file_id: attachment.source_file_id.clone(),
                detail: "insufficientFilePermissions".to_owned(),
            });
        }
        self.shared.lock().await.push(stored_file_id.to_owned());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeSheets {
    pub reject_with: Option<SheetError>,
    pub delay: Duration,
    pub writes: Mutex<Vec<RowUpdatePayload>>,
}

impl FakeSheets {
    pub fn rejecting(error: SheetError) -> Self {
        Self { reject_with: Some(error), ..Self::default() }
    }

    pub async fn writes(&self) -> Vec<RowUpdatePayload> {
        self.writes.lock().await.clone()
    }
}

#[async_trait]
impl SheetWriter for FakeSheets {
    async fn write_row(&self, payload: &RowUpdatePayload) -> Result<(), SheetError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(error) = &self.reject_with {
            return Err(error.clone());
        }
        self.writes.lock().await.push(payload.clone());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeNotifier {
    pub fail: bool,
    pub sent: Mutex<Vec<(String, String)>>,
}

impl FakeNotifier {
    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn notify_user(&self, user_id: &str, text: &str) -> Result<(), NotifyError> {
        self.sent.lock().await.push((user_id.to_owned(), text.to_owned()));
        if self.fail {
            return Err(NotifyError::Rejected("channel_not_found".to_owned()));
        }
        Ok(())
    }
}
