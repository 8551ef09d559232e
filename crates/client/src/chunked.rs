//! Resumable chunked uploads.
//!
//! The signed item is split at multiples of the chunk size and every chunk is
//! posted to the session by offset, up to `max_parallel_chunks` at a time.
//! A failed upload leaves the session resumable: pass its id back in
//! [`ChunkUploadRequest::session_id`] to send only the missing chunks.

use crate::api::ChunkSessionInfo;
use crate::client::{Client, debug_msg, read_body, status_error};
use crate::error::{Error, Result};
use crate::upload::UploadRequest;
use bytes::Bytes;
use futures::stream::{FuturesUnordered, StreamExt};
use irys_core::{
    ChunkSession, ChunkSpan, MAX_CHUNKED_UPLOAD_SIZE, MIN_CHUNKED_UPLOAD_SIZE, SessionId, Tag,
    Transaction,
};
use reqwest::{Method, StatusCode};

/// A chunked upload, optionally resuming an existing session.
#[derive(Clone, Debug, Default)]
pub struct ChunkUploadRequest {
    pub data: Bytes,
    pub tags: Vec<Tag>,
    /// Resume this session instead of creating one.
    pub session_id: Option<SessionId>,
    /// Overrides the configured chunk size for this upload.
    pub chunk_size: Option<u64>,
}

impl ChunkUploadRequest {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    pub fn resume(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }
}

impl Client {
    /// Upload a payload between 500 KiB and 95 MiB through a chunk session.
    pub async fn chunk_upload(&self, request: ChunkUploadRequest) -> Result<Transaction> {
        self.scoped(async {
            let size = request.data.len() as u64;
            if !(MIN_CHUNKED_UPLOAD_SIZE..=MAX_CHUNKED_UPLOAD_SIZE).contains(&size) {
                return Err(Error::SizeOutOfRange {
                    size,
                    min: MIN_CHUNKED_UPLOAD_SIZE,
                    max: MAX_CHUNKED_UPLOAD_SIZE,
                });
            }

            let tx = self.sign(UploadRequest::new(request.data).with_tags(request.tags))?;
            let payload = Bytes::from(tx.to_bytes());
            let total = payload.len() as u64;

            let mut session = match request.session_id {
                Some(id) => self.resume_session(id, total, request.chunk_size).await?,
                None => self.create_session(total, request.chunk_size).await?,
            };
            tracing::info!(
                session_id = %session.id(),
                id = %tx.id(),
                total,
                chunk_size = session.chunk_size(),
                received = session.received_count(),
                "Starting chunked upload"
            );

            self.upload_missing_chunks(&mut session, &payload).await?;
            session.ensure_complete()?;
            let transaction = self.finalize_session(&mut session).await?;
            tracing::info!(
                session_id = %session.id(),
                id = %transaction.id,
                "Chunked upload finalized"
            );
            Ok(transaction)
        })
        .await
    }

    async fn create_session(&self, total: u64, chunk_size: Option<u64>) -> Result<ChunkSession> {
        let endpoint = self.chunk_endpoint("-1", "-1");
        let mut request = self.request(Method::GET, &endpoint)?;
        request
            .url_mut()
            .query_pairs_mut()
            .append_pair("size", &total.to_string());
        let info: ChunkSessionInfo = self.send_json(request).await?;
        let chunk_size = self.resolve_chunk_size(&info, chunk_size);
        debug_msg!(
            self,
            session_id = %info.id,
            min = ?info.min,
            max = ?info.max,
            "Created chunk session"
        );
        Ok(ChunkSession::new(SessionId::new(info.id), total, chunk_size))
    }

    async fn resume_session(
        &self,
        id: SessionId,
        total: u64,
        chunk_size: Option<u64>,
    ) -> Result<ChunkSession> {
        let endpoint = self.chunk_endpoint(id.as_str(), "-1");
        let (status, body) = self.send_text(self.request(Method::GET, &endpoint)?).await?;
        if !status.is_success() {
            return Err(session_status_error(&id, &endpoint, status, body));
        }
        let info: ChunkSessionInfo =
            serde_json::from_str(&body).map_err(|e| Error::bad_response(&endpoint, e))?;
        let chunk_size = info
            .size
            .unwrap_or_else(|| self.resolve_chunk_size(&info, chunk_size));
        let session = ChunkSession::resume_at(
            id,
            total,
            chunk_size,
            info.received(),
            time::OffsetDateTime::now_utc(),
        )?;
        debug_msg!(
            self,
            session_id = %session.id(),
            received = session.received_count(),
            "Resumed chunk session"
        );
        Ok(session)
    }

    /// Configured or requested size, else the node maximum, clamped to the
    /// node's bounds.
    fn resolve_chunk_size(&self, info: &ChunkSessionInfo, requested: Option<u64>) -> u64 {
        let mut size = requested
            .or(self.config().chunking.chunk_size)
            .or(info.max)
            .unwrap_or(DEFAULT_CHUNK_SIZE);
        if let Some(min) = info.min {
            size = size.max(min);
        }
        if let Some(max) = info.max {
            size = size.min(max);
        }
        size.max(1)
    }

    async fn upload_missing_chunks(
        &self,
        session: &mut ChunkSession,
        payload: &Bytes,
    ) -> Result<()> {
        let parallel = std::cmp::max(1, self.config().chunking.max_parallel_chunks as usize);
        let id = session.id().clone();
        let mut in_flight = FuturesUnordered::new();

        for span in session.pending() {
            let chunk = slice_span(payload, span)?;
            in_flight.push(self.send_chunk(&id, span, chunk));

            if in_flight.len() >= parallel
                && let Some(result) = in_flight.next().await
            {
                self.record_ack(session, result?)?;
            }
        }

        while let Some(result) = in_flight.next().await {
            self.record_ack(session, result?)?;
        }

        Ok(())
    }

    fn record_ack(&self, session: &mut ChunkSession, span: ChunkSpan) -> Result<()> {
        session.record(span)?;
        debug_msg!(
            self,
            session_id = %session.id(),
            offset = span.offset,
            size = span.size,
            received = session.received_count(),
            "Chunk acknowledged"
        );
        Ok(())
    }

    async fn send_chunk(
        &self,
        id: &SessionId,
        span: ChunkSpan,
        chunk: Bytes,
    ) -> Result<ChunkSpan> {
        let endpoint = self.chunk_endpoint(id.as_str(), &span.offset.to_string());
        let attempt = async {
            let request = self.octet_request(Method::POST, &endpoint, chunk)?;
            let (status, body) = self.send_text(request).await?;
            if !status.is_success() {
                return Err(session_status_error(id, &endpoint, status, body));
            }
            Ok(span)
        };
        attempt.await.map_err(|source| match source {
            Error::SessionExpired(_) | Error::Cancelled | Error::Closed => source,
            source => Error::ChunkUploadFailed {
                session_id: id.to_string(),
                offset: span.offset,
                source: Box::new(source),
            },
        })
    }

    async fn finalize_session(&self, session: &mut ChunkSession) -> Result<Transaction> {
        // Reject locally before the node sees a stale or incomplete session.
        session.ensure_active_at(time::OffsetDateTime::now_utc())?;
        let endpoint = self.chunk_endpoint(session.id().as_str(), "-1");
        let request = self.octet_request(Method::POST, &endpoint, Bytes::new())?;
        let response = self.send(request).await?;
        let (status, body) = read_body(&endpoint, response).await?;
        if !status.is_success() {
            return Err(session_status_error(session.id(), &endpoint, status, body));
        }
        let transaction: Transaction =
            serde_json::from_str(&body).map_err(|e| Error::bad_response(&endpoint, e))?;
        session.complete()?;
        Ok(transaction)
    }

    fn chunk_endpoint(&self, session: &str, offset: &str) -> String {
        let currency = self.currency().name();
        self.node_endpoint(&format!("chunks/{currency}/{session}/{offset}"))
    }
}

/// Chunk size used when neither the caller nor the node specify one.
const DEFAULT_CHUNK_SIZE: u64 = 25 * 1024 * 1024;

fn slice_span(payload: &Bytes, span: ChunkSpan) -> Result<Bytes> {
    let start = usize::try_from(span.offset)
        .map_err(|_| Error::Config("chunk offset exceeds platform limits".to_string()))?;
    let end = usize::try_from(span.end())
        .map_err(|_| Error::Config("chunk end exceeds platform limits".to_string()))?;
    if end > payload.len() {
        return Err(Error::Session(irys_core::Error::ChunkOutOfBounds {
            offset: span.offset,
            size: span.size,
            total: payload.len() as u64,
        }));
    }
    Ok(payload.slice(start..end))
}

/// 404 and 410 mean the node no longer knows the session.
fn session_status_error(
    id: &SessionId,
    endpoint: &str,
    status: StatusCode,
    body: String,
) -> Error {
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => Error::SessionExpired(id.to_string()),
        _ => status_error(endpoint, status, body),
    }
}
