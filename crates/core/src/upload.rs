//! Chunk session types and lifecycle.
//!
//! A [`ChunkSession`] is the client-side mirror of a node upload session. It
//! records which byte ranges the node has acknowledged, enforces the
//! inactivity timeout, and refuses to finalize until the acknowledged ranges
//! cover the whole upload exactly once.

use crate::CHUNK_SESSION_TIMEOUT;
use crate::chunk::ChunkSpan;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use time::OffsetDateTime;

/// Node-assigned identifier of a chunk session.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Chunk session state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Session is open and accepting chunks.
    Open,
    /// Session was finalized.
    Completed,
    /// Session timed out without completing.
    Expired,
}

impl SessionState {
    /// Check if the session is still active (can receive chunks).
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Check if the session reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Expired)
    }
}

/// A resumable chunk session tracking acknowledged byte ranges.
#[derive(Clone, Debug)]
pub struct ChunkSession {
    id: SessionId,
    total_size: u64,
    chunk_size: u64,
    state: SessionState,
    created_at: OffsetDateTime,
    last_activity: OffsetDateTime,
    expires_at: OffsetDateTime,
    /// Acknowledged spans keyed by offset, value is the span size.
    received: BTreeMap<u64, u64>,
}

impl ChunkSession {
    /// Open a fresh session now.
    pub fn new(id: SessionId, total_size: u64, chunk_size: u64) -> Self {
        Self::new_at(id, total_size, chunk_size, OffsetDateTime::now_utc())
    }

    /// Open a fresh session at the given instant.
    pub fn new_at(id: SessionId, total_size: u64, chunk_size: u64, now: OffsetDateTime) -> Self {
        Self {
            id,
            total_size,
            chunk_size,
            state: SessionState::Open,
            created_at: now,
            last_activity: now,
            expires_at: now + CHUNK_SESSION_TIMEOUT,
            received: BTreeMap::new(),
        }
    }

    /// Rebuild a session from the spans the node reports as already received.
    pub fn resume_at(
        id: SessionId,
        total_size: u64,
        chunk_size: u64,
        received: impl IntoIterator<Item = ChunkSpan>,
        now: OffsetDateTime,
    ) -> crate::Result<Self> {
        let mut session = Self::new_at(id, total_size, chunk_size, now);
        for span in received {
            session.record_at(span, now)?;
        }
        Ok(session)
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    pub fn expires_at(&self) -> OffsetDateTime {
        self.expires_at
    }

    /// Check if the session has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }

    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.state == SessionState::Expired || now > self.expires_at
    }

    /// Fail unless the session can still accept operations at `now`.
    pub fn ensure_active_at(&mut self, now: OffsetDateTime) -> crate::Result<()> {
        if self.state == SessionState::Completed {
            return Err(crate::Error::SessionCompleted(self.id.to_string()));
        }
        if self.is_expired_at(now) {
            self.state = SessionState::Expired;
            return Err(crate::Error::SessionExpired(self.id.to_string()));
        }
        Ok(())
    }

    /// Record an acknowledged chunk now.
    pub fn record(&mut self, span: ChunkSpan) -> crate::Result<()> {
        self.record_at(span, OffsetDateTime::now_utc())
    }

    /// Record an acknowledged chunk, extending the inactivity window.
    pub fn record_at(&mut self, span: ChunkSpan, now: OffsetDateTime) -> crate::Result<()> {
        self.ensure_active_at(now)?;
        if span.size == 0 || span.end() > self.total_size {
            return Err(crate::Error::ChunkOutOfBounds {
                offset: span.offset,
                size: span.size,
                total: self.total_size,
            });
        }
        let before = self
            .received
            .range(..=span.offset)
            .next_back()
            .map(|(&offset, &size)| ChunkSpan::new(offset, size));
        let after = self
            .received
            .range(span.offset..)
            .next()
            .map(|(&offset, &size)| ChunkSpan::new(offset, size));
        if before.iter().chain(after.iter()).any(|r| r.overlaps(&span)) {
            return Err(crate::Error::ChunkOverlap {
                offset: span.offset,
                size: span.size,
            });
        }
        self.received.insert(span.offset, span.size);
        self.last_activity = now;
        self.expires_at = now + CHUNK_SESSION_TIMEOUT;
        Ok(())
    }

    /// Check whether exactly this span has been acknowledged.
    pub fn has(&self, span: &ChunkSpan) -> bool {
        self.received.get(&span.offset) == Some(&span.size)
    }

    /// Total acknowledged bytes.
    pub fn received_bytes(&self) -> u64 {
        self.received.values().sum()
    }

    /// Number of acknowledged chunks.
    pub fn received_count(&self) -> usize {
        self.received.len()
    }

    /// Byte ranges not yet acknowledged.
    pub fn missing(&self) -> Vec<ChunkSpan> {
        let mut gaps = Vec::new();
        let mut cursor = 0u64;
        for (&offset, &size) in &self.received {
            if offset > cursor {
                gaps.push(ChunkSpan::new(cursor, offset - cursor));
            }
            cursor = cursor.max(offset + size);
        }
        if cursor < self.total_size {
            gaps.push(ChunkSpan::new(cursor, self.total_size - cursor));
        }
        gaps
    }

    /// Chunks still to send: every gap split at the session chunk size.
    pub fn pending(&self) -> Vec<ChunkSpan> {
        self.missing()
            .into_iter()
            .flat_map(|gap| {
                crate::chunk::split_spans(gap.size, self.chunk_size)
                    .into_iter()
                    .map(move |s| ChunkSpan::new(gap.offset + s.offset, s.size))
            })
            .collect()
    }

    /// Fail unless acknowledged spans cover the upload with no gaps.
    pub fn ensure_complete(&self) -> crate::Result<()> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(crate::Error::IncompleteSession {
                id: self.id.to_string(),
                missing: missing.len(),
            });
        }
        Ok(())
    }

    /// Transition to `Completed` once coverage is verified.
    pub fn complete_at(&mut self, now: OffsetDateTime) -> crate::Result<()> {
        self.ensure_active_at(now)?;
        self.ensure_complete()?;
        self.state = SessionState::Completed;
        self.last_activity = now;
        Ok(())
    }

    pub fn complete(&mut self) -> crate::Result<()> {
        self.complete_at(OffsetDateTime::now_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::chunk::split_spans;
    use time::Duration;

    fn t0() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
    }

    fn session(total: u64, chunk: u64) -> ChunkSession {
        ChunkSession::new_at(SessionId::new("s-1"), total, chunk, t0())
    }

    #[test]
    fn test_session_state_flags() {
        assert!(SessionState::Open.is_active());
        assert!(!SessionState::Open.is_terminal());
        for state in [SessionState::Completed, SessionState::Expired] {
            assert!(!state.is_active());
            assert!(state.is_terminal());
        }
    }

    #[test]
    fn test_full_partition_completes_in_any_order() {
        let mut s = session(100, 30);
        let mut spans = split_spans(100, 30);
        spans.reverse();
        for span in spans {
            s.record_at(span, t0()).unwrap();
        }
        assert_eq!(s.received_bytes(), 100);
        s.complete_at(t0()).unwrap();
        assert_eq!(s.state(), SessionState::Completed);
    }

    #[test]
    fn test_irregular_partition_completes() {
        let mut s = session(100, 30);
        for span in [ChunkSpan::new(0, 7), ChunkSpan::new(7, 50), ChunkSpan::new(57, 43)] {
            s.record_at(span, t0()).unwrap();
        }
        assert!(s.ensure_complete().is_ok());
    }

    #[test]
    fn test_gap_blocks_finalize() {
        let mut s = session(100, 30);
        s.record_at(ChunkSpan::new(0, 30), t0()).unwrap();
        s.record_at(ChunkSpan::new(60, 40), t0()).unwrap();
        assert_eq!(s.missing(), vec![ChunkSpan::new(30, 30)]);
        assert!(matches!(
            s.complete_at(t0()),
            Err(Error::IncompleteSession { missing: 1, .. })
        ));
        assert_eq!(s.state(), SessionState::Open);
    }

    #[test]
    fn test_overlap_is_rejected() {
        let mut s = session(100, 30);
        s.record_at(ChunkSpan::new(30, 30), t0()).unwrap();
        for bad in [
            ChunkSpan::new(30, 30),
            ChunkSpan::new(0, 31),
            ChunkSpan::new(59, 10),
            ChunkSpan::new(40, 5),
        ] {
            assert!(matches!(
                s.record_at(bad, t0()),
                Err(Error::ChunkOverlap { .. })
            ));
        }
        assert_eq!(s.received_count(), 1);
    }

    #[test]
    fn test_out_of_bounds_is_rejected() {
        let mut s = session(100, 30);
        assert!(matches!(
            s.record_at(ChunkSpan::new(90, 11), t0()),
            Err(Error::ChunkOutOfBounds { .. })
        ));
        assert!(s.record_at(ChunkSpan::new(10, 0), t0()).is_err());
    }

    #[test]
    fn test_expires_after_thirty_minutes_of_inactivity() {
        let mut s = session(100, 50);
        s.record_at(ChunkSpan::new(0, 50), t0() + Duration::minutes(20))
            .unwrap();
        // Activity extends the window.
        assert!(!s.is_expired_at(t0() + Duration::minutes(45)));

        let late = t0() + Duration::minutes(51);
        assert!(matches!(
            s.record_at(ChunkSpan::new(50, 50), late),
            Err(Error::SessionExpired(_))
        ));
        assert_eq!(s.state(), SessionState::Expired);
        // Every later operation fails too.
        assert!(matches!(s.complete_at(t0()), Err(Error::SessionExpired(_))));
        assert!(s.ensure_active_at(t0()).is_err());
    }

    #[test]
    fn test_completed_session_rejects_chunks() {
        let mut s = session(10, 10);
        s.record_at(ChunkSpan::new(0, 10), t0()).unwrap();
        s.complete_at(t0()).unwrap();
        assert!(matches!(
            s.record_at(ChunkSpan::new(0, 10), t0()),
            Err(Error::SessionCompleted(_))
        ));
    }

    #[test]
    fn test_resume_skips_received_chunks() {
        let received = [ChunkSpan::new(0, 30), ChunkSpan::new(60, 30)];
        let s = ChunkSession::resume_at(SessionId::new("s-2"), 100, 30, received, t0()).unwrap();
        assert_eq!(
            s.pending(),
            vec![ChunkSpan::new(30, 30), ChunkSpan::new(90, 10)]
        );
        assert!(s.has(&ChunkSpan::new(60, 30)));
        assert!(!s.has(&ChunkSpan::new(30, 30)));
    }

    #[test]
    fn test_resume_rejects_overlapping_report() {
        let received = [ChunkSpan::new(0, 30), ChunkSpan::new(20, 30)];
        assert!(ChunkSession::resume_at(SessionId::new("s-3"), 100, 30, received, t0()).is_err());
    }
}
