mod common;

use async_trait::async_trait;
use common::{FakeCurrency, can_bind_localhost};
use httpmock::Method::{GET, POST};
use httpmock::{Mock, MockServer};
use irys_client::{
    ChunkUploadRequest, Client, ClientConfig, Error, HttpTransport, ReqwestTransport, SessionId,
};
use irys_core::{MAX_CHUNKED_UPLOAD_SIZE, MIN_CHUNKED_UPLOAD_SIZE};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const CHUNK: u64 = 1_048_576;
const PARALLEL: u32 = 3;
// 10 MB of data plus the item header signs to a little over 9 chunks.
const PAYLOAD_LEN: usize = 10_000_000;
const CHUNK_COUNT: u64 = 10;

fn chunking_config(server: &MockServer) -> ClientConfig {
    let mut config = common::test_config(server);
    config.chunking.chunk_size = Some(CHUNK);
    config.chunking.max_parallel_chunks = PARALLEL;
    config
}

async fn chunking_client(server: &MockServer) -> Client {
    common::mock_node_info(server);
    Client::connect(chunking_config(server), FakeCurrency::new())
        .await
        .unwrap()
}

/// Tracks how many chunk POSTs are outstanding at once.
struct CountingTransport {
    inner: ReqwestTransport,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl CountingTransport {
    fn new() -> Self {
        Self {
            inner: ReqwestTransport::new(Duration::from_secs(10)).unwrap(),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

fn is_chunk_post(request: &reqwest::Request) -> bool {
    request.method() == reqwest::Method::POST
        && request
            .url()
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .is_some_and(|offset| offset.chars().all(|c| c.is_ascii_digit()))
}

#[async_trait]
impl HttpTransport for CountingTransport {
    async fn execute(&self, request: reqwest::Request) -> irys_client::Result<reqwest::Response> {
        if !is_chunk_post(&request) {
            return self.inner.execute(request).await;
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let result = self.inner.execute(request).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn close(&self) {
        self.inner.close();
    }
}

fn mock_create_session<'a>(server: &'a MockServer, id: &str) -> Mock<'a> {
    let id = id.to_string();
    server.mock(move |when, then| {
        when.method(GET)
            .path("/chunks/matic/-1/-1")
            .query_param_exists("size");
        then.status(200)
            .json_body(json!({ "id": id, "min": 524288, "max": 26214400 }));
    })
}

fn mock_chunk<'a>(server: &'a MockServer, id: &str, index: u64, status: u16) -> Mock<'a> {
    let path = format!("/chunks/matic/{id}/{}", index * CHUNK);
    server.mock(move |when, then| {
        when.method(POST)
            .path(path)
            .header("content-type", "application/octet-stream");
        then.status(status).body("OK");
    })
}

fn mock_chunks<'a>(server: &'a MockServer, id: &str, count: u64) -> Vec<Mock<'a>> {
    (0..count)
        .map(|index| mock_chunk(server, id, index, 200))
        .collect()
}

fn mock_all_chunks<'a>(server: &'a MockServer, id: &str) -> Vec<Mock<'a>> {
    mock_chunks(server, id, CHUNK_COUNT)
}

fn mock_finalize<'a>(server: &'a MockServer, id: &str) -> Mock<'a> {
    let path = format!("/chunks/matic/{id}/-1");
    server.mock(move |when, then| {
        when.method(POST).path(path);
        then.status(200)
            .json_body(common::transaction_json("chunked-tx"));
    })
}

#[tokio::test]
async fn uploads_every_chunk_then_finalizes() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind to localhost in this environment");
        return;
    }
    let server = MockServer::start();
    let client = chunking_client(&server).await;
    let create = mock_create_session(&server, "sess-1");
    let chunks = mock_all_chunks(&server, "sess-1");
    let finalize = mock_finalize(&server, "sess-1");

    let tx = client
        .chunk_upload(ChunkUploadRequest::new(vec![3u8; PAYLOAD_LEN]))
        .await
        .unwrap();

    assert_eq!(tx.id, "chunked-tx");
    create.assert_hits(1);
    for chunk in &chunks {
        chunk.assert_hits(1);
    }
    finalize.assert_hits(1);
}

#[tokio::test]
async fn resume_sends_only_missing_chunks() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind to localhost in this environment");
        return;
    }
    let server = MockServer::start();
    let client = chunking_client(&server).await;
    let create = mock_create_session(&server, "sess-2");
    let status = server.mock(|when, then| {
        when.method(GET).path("/chunks/matic/sess-2/-1");
        then.status(200).json_body(json!({
            "id": "sess-2",
            "size": CHUNK,
            "chunks": [[0, CHUNK], [CHUNK.to_string(), CHUNK]]
        }));
    });
    let chunks = mock_all_chunks(&server, "sess-2");
    let finalize = mock_finalize(&server, "sess-2");

    client
        .chunk_upload(
            ChunkUploadRequest::new(vec![3u8; PAYLOAD_LEN]).resume(SessionId::new("sess-2")),
        )
        .await
        .unwrap();

    create.assert_hits(0);
    status.assert_hits(1);
    chunks[0].assert_hits(0);
    chunks[1].assert_hits(0);
    for chunk in &chunks[2..] {
        chunk.assert_hits(1);
    }
    finalize.assert_hits(1);
}

#[tokio::test]
async fn unknown_session_on_resume_is_expired() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind to localhost in this environment");
        return;
    }
    let server = MockServer::start();
    let client = chunking_client(&server).await;
    server.mock(|when, then| {
        when.method(GET).path("/chunks/matic/sess-3/-1");
        then.status(404).body("session not found");
    });

    let err = client
        .chunk_upload(
            ChunkUploadRequest::new(vec![3u8; PAYLOAD_LEN]).resume(SessionId::new("sess-3")),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::SessionExpired(ref id) if id == "sess-3"), "{err:?}");
}

#[tokio::test]
async fn rejected_chunk_reports_offset_and_skips_finalize() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind to localhost in this environment");
        return;
    }
    let server = MockServer::start();
    let client = chunking_client(&server).await;
    mock_create_session(&server, "sess-4");
    for index in 0..CHUNK_COUNT {
        let status = if index == 3 { 400 } else { 200 };
        mock_chunk(&server, "sess-4", index, status);
    }
    let finalize = mock_finalize(&server, "sess-4");

    let err = client
        .chunk_upload(ChunkUploadRequest::new(vec![3u8; PAYLOAD_LEN]))
        .await
        .unwrap_err();

    match err {
        Error::ChunkUploadFailed {
            session_id,
            offset,
            source,
        } => {
            assert_eq!(session_id, "sess-4");
            assert_eq!(offset, 3 * CHUNK);
            assert!(matches!(*source, Error::Status { status: 400, .. }), "{source:?}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    finalize.assert_hits(0);
}

#[tokio::test]
async fn size_outside_chunked_range_fails_before_any_request() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind to localhost in this environment");
        return;
    }
    let server = MockServer::start();
    let client = chunking_client(&server).await;
    let create = mock_create_session(&server, "sess-5");

    let err = client
        .chunk_upload(ChunkUploadRequest::new(vec![0u8; 1024]))
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::SizeOutOfRange { size: 1024, .. }),
        "{err:?}"
    );
    create.assert_hits(0);
}

#[tokio::test]
async fn exact_mebibyte_multiple_adds_a_header_chunk() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind to localhost in this environment");
        return;
    }
    let server = MockServer::start();
    let client = chunking_client(&server).await;
    mock_create_session(&server, "sess-6");
    // The signed item is 10 MiB of data plus its header, so the tail spills
    // into an eleventh chunk.
    let chunks = mock_chunks(&server, "sess-6", 11);
    let beyond = mock_chunk(&server, "sess-6", 11, 200);
    let finalize = mock_finalize(&server, "sess-6");

    client
        .chunk_upload(ChunkUploadRequest::new(vec![3u8; 10 * CHUNK as usize]))
        .await
        .unwrap();

    for chunk in &chunks {
        chunk.assert_hits(1);
    }
    beyond.assert_hits(0);
    finalize.assert_hits(1);
}

#[tokio::test]
async fn chunk_posts_never_exceed_parallel_limit() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind to localhost in this environment");
        return;
    }
    let server = MockServer::start();
    common::mock_node_info(&server);
    let transport = Arc::new(CountingTransport::new());
    let client = Client::builder(chunking_config(&server), FakeCurrency::new())
        .transport(transport.clone())
        .build()
        .await
        .unwrap();
    mock_create_session(&server, "sess-7");
    let chunks: Vec<_> = (0..CHUNK_COUNT)
        .map(|index| {
            let path = format!("/chunks/matic/sess-7/{}", index * CHUNK);
            server.mock(move |when, then| {
                when.method(POST).path(path);
                then.status(200)
                    .delay(Duration::from_millis(100))
                    .body("OK");
            })
        })
        .collect();
    let finalize = mock_finalize(&server, "sess-7");

    client
        .chunk_upload(ChunkUploadRequest::new(vec![3u8; PAYLOAD_LEN]))
        .await
        .unwrap();

    for chunk in &chunks {
        chunk.assert_hits(1);
    }
    finalize.assert_hits(1);
    assert_eq!(transport.peak(), PARALLEL as usize);
}

#[tokio::test]
async fn size_above_chunked_maximum_fails_before_any_request() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind to localhost in this environment");
        return;
    }
    let server = MockServer::start();
    let client = chunking_client(&server).await;
    let create = mock_create_session(&server, "sess-8");
    let size = MAX_CHUNKED_UPLOAD_SIZE + 1;

    let err = client
        .chunk_upload(ChunkUploadRequest::new(vec![0u8; size as usize]))
        .await
        .unwrap_err();

    match err {
        Error::SizeOutOfRange {
            size: actual,
            min,
            max,
        } => {
            assert_eq!(actual, size);
            assert_eq!(min, MIN_CHUNKED_UPLOAD_SIZE);
            assert_eq!(max, MAX_CHUNKED_UPLOAD_SIZE);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    create.assert_hits(0);
}

#[tokio::test]
async fn size_at_chunked_minimum_is_accepted() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind to localhost in this environment");
        return;
    }
    let server = MockServer::start();
    let client = chunking_client(&server).await;
    let create = mock_create_session(&server, "sess-9");
    let chunks = mock_chunks(&server, "sess-9", 2);
    let finalize = mock_finalize(&server, "sess-9");

    let tx = client
        .chunk_upload(ChunkUploadRequest::new(vec![
            5u8;
            MIN_CHUNKED_UPLOAD_SIZE as usize
        ]))
        .await
        .unwrap();

    assert_eq!(tx.id, "chunked-tx");
    create.assert_hits(1);
    chunks[0].assert_hits(1);
    chunks[1].assert_hits(0);
    finalize.assert_hits(1);
}
