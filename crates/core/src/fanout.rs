use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::domain::UploadedAsset;
use crate::errors::RelayError;
use crate::relay::FileRelay;

/// Runs one relay per attachment with at most `concurrency` in flight.
///
/// All-or-nothing: the first failure aborts the relays still running and no
/// partial list is returned. Results come back in input order.
#[derive(Clone)]
pub struct FanOut {
    relay: FileRelay,
    concurrency: usize,
}

impl FanOut {
    pub fn new(relay: FileRelay, concurrency: usize) -> Self {
        Self { relay, concurrency: concurrency.max(1) }
    }

    pub async fn relay_all(&self, file_ids: &[String]) -> Result<Vec<UploadedAsset>, RelayError> {
        if file_ids.is_empty() {
            return Ok(Vec::new());
        }

        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = JoinSet::new();

        for (index, file_id) in file_ids.iter().cloned().enumerate() {
            let relay = self.relay.clone();
            let permits = Arc::clone(&permits);
            join_set.spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => relay.relay(&file_id).await,
                    Err(_) => Err(RelayError::Aborted {
                        file_id: file_id.clone(),
                        detail: "relay permits closed".to_owned(),
                    }),
                };
                (index, result)
            });
        }

        let mut slots: Vec<Option<UploadedAsset>> = vec![None; file_ids.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, Ok(asset))) => {
                    debug!(event_name = "pipeline.fanout.slot_filled", index, "relay finished");
                    slots[index] = Some(asset);
                }
                Ok((_, Err(error))) => {
                    warn!(
                        event_name = "pipeline.fanout.aborted",
                        file_id = error.file_id(),
                        stage = error.stage(),
                        outstanding = join_set.len(),
                        error = %error,
                        "relay failed; aborting remaining relays"
                    );
                    join_set.abort_all();
                    return Err(error);
                }
                Err(join_error) => {
                    join_set.abort_all();
                    return Err(RelayError::Aborted {
                        file_id: "unknown".to_owned(),
                        detail: join_error.to_string(),
                    });
                }
            }
        }

        slots
            .into_iter()
            .zip(file_ids)
            .map(|(slot, file_id)| {
                slot.ok_or_else(|| RelayError::Aborted {
                    file_id: file_id.clone(),
                    detail: "relay finished without a result".to_owned(),
                })
            })
            .collect()
    }
}
