use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{BlockError, SplitRequest};
use crate::ports::outbound::AutoScaler;

/// Auto-scaler that keeps every split request it receives.
#[derive(Default)]
pub struct RecordingScaler {
    requests: Mutex<Vec<SplitRequest>>,
}

impl RecordingScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<SplitRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl AutoScaler for RecordingScaler {
    async fn request_split(&self, request: SplitRequest) -> Result<(), BlockError> {
        self.requests.lock().push(request);
        Ok(())
    }
}
