#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::{Path, Request};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use hls_loader::DownloadEvent;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

pub const SEGMENT_LEN: usize = 32 * 1024;
pub const RANGED_RESOURCE_LEN: usize = 3000;

/// Requests observed by the server, keyed by path.
#[derive(Default)]
pub struct RequestLog {
    counts: HashMap<String, usize>,
    ranges: Vec<String>,
    user_agents: Vec<String>,
}

pub struct TestServer {
    base_url: String,
    log: Arc<Mutex<RequestLog>>,
}

impl TestServer {
    pub async fn new() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://127.0.0.1:{}", addr.port());

        let log = Arc::new(Mutex::new(RequestLog::default()));
        let log_clone = log.clone();

        let app = Router::new()
            .route("/media.m3u8", get(|| async { media_playlist(3) }))
            .route("/long.m3u8", get(|| async { media_playlist(20) }))
            .route("/master.m3u8", get(|| async { MASTER_PLAYLIST }))
            .route("/master-empty.m3u8", get(|| async { "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=10\n" }))
            .route("/empty.m3u8", get(|| async { "#EXTM3U\n#EXT-X-TARGETDURATION:10\n#EXT-X-ENDLIST\n" }))
            .route("/not-a-playlist", get(|| async { "<html>nope</html>" }))
            .route("/broken.m3u8", get(|| async { BROKEN_PLAYLIST }))
            .route("/ranged.m3u8", get(|| async { RANGED_PLAYLIST }))
            .route("/slow.m3u8", get(|| async { SLOW_PLAYLIST }))
            .route("/redirect.m3u8", get(|| async { Redirect::temporary("/media.m3u8") }))
            .route("/seg/{name}", get(segment_endpoint))
            .route("/ranged.ts", get(ranged_endpoint))
            .route("/slow.ts", get(slow_endpoint))
            .layer(axum::middleware::from_fn(move |req: Request, next: Next| {
                let log = log_clone.clone();
                async move {
                    if let Ok(mut log) = log.lock() {
                        *log.counts.entry(req.uri().path().to_string()).or_insert(0) += 1;
                        if let Some(range) = req.headers().get(header::RANGE) {
                            log.ranges.push(range.to_str().unwrap_or_default().to_string());
                        }
                        if let Some(ua) = req.headers().get(header::USER_AGENT) {
                            log.user_agents.push(ua.to_str().unwrap_or_default().to_string());
                        }
                    }
                    next.run(req).await
                }
            }));

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, log }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn request_count(&self, path: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .counts
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    pub fn ranges(&self) -> Vec<String> {
        self.log.lock().unwrap().ranges.clone()
    }

    pub fn user_agents(&self) -> Vec<String> {
        self.log.lock().unwrap().user_agents.clone()
    }
}

pub const MASTER_PLAYLIST: &str = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=500,RESOLUTION=640x360
low.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=1200,RESOLUTION=1920x1080
media.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=900,RESOLUTION=1280x720
mid.m3u8
";

const BROKEN_PLAYLIST: &str = "#EXTM3U
#EXT-X-TARGETDURATION:10
#EXTINF:10.0,
seg/0.ts
#EXTINF:10.0,
seg/missing.ts
#EXTINF:10.0,
seg/2.ts
#EXT-X-ENDLIST
";

const RANGED_PLAYLIST: &str = "#EXTM3U
#EXT-X-VERSION:4
#EXT-X-TARGETDURATION:10
#EXTINF:10.0,
#EXT-X-BYTERANGE:1000@0
ranged.ts
#EXTINF:10.0,
#EXT-X-BYTERANGE:1500
ranged.ts
#EXTINF:10.0,
#EXT-X-BYTERANGE:500
ranged.ts
#EXT-X-ENDLIST
";

const SLOW_PLAYLIST: &str = "#EXTM3U
#EXT-X-TARGETDURATION:10
#EXTINF:10.0,
seg/0.ts
#EXTINF:10.0,
slow.ts
#EXTINF:10.0,
seg/2.ts
#EXT-X-ENDLIST
";

pub fn media_playlist(segments: usize) -> String {
    let mut text = String::from(
        "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:10\n#EXT-X-MEDIA-SEQUENCE:0\n#EXT-X-PLAYLIST-TYPE:VOD\n",
    );
    for i in 0..segments {
        text.push_str(&format!("#EXTINF:10.0,\nseg/{i}.ts\n"));
    }
    text.push_str("#EXT-X-ENDLIST\n");
    text
}

/// Deterministic payload for segment `index`.
pub fn segment_data(index: usize) -> Vec<u8> {
    vec![index as u8; SEGMENT_LEN]
}

pub fn ranged_resource() -> Vec<u8> {
    (0..RANGED_RESOURCE_LEN).map(|i| (i % 251) as u8).collect()
}

async fn segment_endpoint(Path(name): Path<String>) -> Response {
    match name
        .strip_suffix(".ts")
        .and_then(|n| n.parse::<usize>().ok())
    {
        Some(index) => segment_data(index).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn ranged_endpoint(headers: HeaderMap) -> Response {
    let data = ranged_resource();
    let Some(range) = headers.get(header::RANGE).and_then(|v| v.to_str().ok()) else {
        return data.into_response();
    };

    let parsed = range
        .strip_prefix("bytes=")
        .and_then(|r| r.split_once('-'))
        .and_then(|(start, end)| Some((start.parse::<usize>().ok()?, end.parse::<usize>().ok()?)));
    match parsed {
        Some((start, end)) if start <= end && end < data.len() => (
            StatusCode::PARTIAL_CONTENT,
            [(
                header::CONTENT_RANGE,
                format!("bytes {start}-{end}/{}", data.len()),
            )],
            data[start..=end].to_vec(),
        )
            .into_response(),
        _ => StatusCode::RANGE_NOT_SATISFIABLE.into_response(),
    }
}

/// Sends one small chunk and then stalls for a long time.
async fn slow_endpoint() -> Response {
    let stream = futures::stream::unfold(0u32, |step| async move {
        if step > 0 {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if step > 2 {
            return None;
        }
        Some((Ok::<_, std::io::Error>(vec![0xAAu8; 1024]), step + 1))
    });
    Body::from_stream(stream).into_response()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("hls_loader=debug")
        .with_test_writer()
        .try_init();
}

/// Drains a session until its terminal event, failing after `timeout`.
pub async fn collect_events(
    mut rx: mpsc::Receiver<DownloadEvent>,
    timeout: Duration,
) -> Vec<DownloadEvent> {
    let mut events = Vec::new();
    let collect = async {
        while let Some(event) = rx.recv().await {
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                break;
            }
        }
    };
    tokio::time::timeout(timeout, collect)
        .await
        .expect("download did not finish in time");
    events
}
