use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use log::{debug, error};

use crate::error::{AnalysisError, Result};
use crate::llm::{build_prompt, GenerativeModel, UnitStream};
use crate::schema::{AnalysisRequest, AnalysisResponse};

/// Lazy, non-restartable sequence of text fragments. Ends after the first error.
pub type ChunkStream = BoxStream<'static, Result<String>>;

/// Turns an [`AnalysisRequest`] into a prompt and relays it to the model.
///
/// Every failure coming out of here is [`AnalysisError::AnalysisFailed`];
/// the underlying cause is logged and dropped.
#[derive(Clone)]
pub struct FinancialAnalyst {
    model: Arc<dyn GenerativeModel>,
}

impl FinancialAnalyst {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// One completion for the whole prompt. The timestamp is taken after the
    /// model answers.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse> {
        let prompt = build_prompt(request).map_err(relay_failure)?;
        debug!("Built prompt of {} bytes", prompt.len());

        let text = self.model.generate(&prompt).await.map_err(relay_failure)?;
        Ok(AnalysisResponse::new(text))
    }

    /// Streams the completion as text fragments in arrival order. Units
    /// without text are skipped. Nothing happens until the stream is polled.
    pub fn chunks(&self, request: &AnalysisRequest) -> ChunkStream {
        let state = match build_prompt(request) {
            Ok(prompt) => ChunkState::Pending {
                model: Arc::clone(&self.model),
                prompt,
            },
            Err(e) => ChunkState::Failed(e),
        };

        stream::unfold(state, next_chunk).boxed()
    }

    /// Callback form of [`chunks`](Self::chunks). Returns how many fragments
    /// were delivered. Fragments delivered before a failure stay delivered.
    ///
    /// An error from `on_chunk` stops the stream and surfaces as
    /// [`AnalysisError::AnalysisFailed`].
    pub async fn analyze_stream<F>(&self, request: &AnalysisRequest, mut on_chunk: F) -> Result<usize>
    where
        F: FnMut(String) -> Result<()> + Send,
    {
        let mut chunks = self.chunks(request);
        let mut delivered = 0;

        while let Some(chunk) = chunks.next().await {
            on_chunk(chunk?).map_err(relay_failure)?;
            delivered += 1;
        }

        Ok(delivered)
    }
}

enum ChunkState {
    Pending {
        model: Arc<dyn GenerativeModel>,
        prompt: String,
    },
    Streaming {
        units: UnitStream,
        delivered: usize,
    },
    Failed(AnalysisError),
    Done,
}

async fn next_chunk(state: ChunkState) -> Option<(Result<String>, ChunkState)> {
    let (mut units, mut delivered) = match state {
        ChunkState::Done => return None,
        ChunkState::Failed(e) => return Some((Err(relay_failure(e)), ChunkState::Done)),
        ChunkState::Pending { model, prompt } => {
            debug!("Built prompt of {} bytes", prompt.len());
            match model.generate_stream(&prompt).await {
                Ok(units) => (units, 0),
                Err(e) => return Some((Err(relay_failure(e)), ChunkState::Done)),
            }
        }
        ChunkState::Streaming { units, delivered } => (units, delivered),
    };

    loop {
        match units.next().await {
            Some(Ok(unit)) => {
                let text = unit
                    .first_text()
                    .filter(|t| !t.is_empty())
                    .map(str::to_string);

                if let Some(text) = text {
                    delivered += 1;
                    return Some((Ok(text), ChunkState::Streaming { units, delivered }));
                }
            }
            Some(Err(e)) => return Some((Err(relay_failure(e)), ChunkState::Done)),
            None => {
                debug!("Completion stream finished after {} chunks", delivered);
                return None;
            }
        }
    }
}

fn relay_failure(cause: AnalysisError) -> AnalysisError {
    error!("Error calling Gemini API: {}", cause);
    AnalysisError::AnalysisFailed
}
