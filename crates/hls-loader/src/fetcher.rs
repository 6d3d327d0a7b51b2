// Playlist and segment fetching. Every await point races the session's
// cancellation token so that cancel interrupts in-flight I/O.

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use hls::{ParseOptions, Playlist, Segment, parse_playlist_with};
use reqwest::{Client, Response};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use url::Url;

use crate::LoaderError;

/// Upper bound on the buffer reserved up front from `Content-Length`.
const MAX_PREALLOCATION: usize = 16 * 1024 * 1024;

/// Fetches `url` and parses it as a playlist.
///
/// Relative URIs are resolved against the final URL after redirects.
pub(crate) async fn fetch_playlist(
    client: &Client,
    url: &str,
    options: &ParseOptions,
    token: &CancellationToken,
) -> Result<Playlist, LoaderError> {
    let parsed = Url::parse(url).map_err(|e| LoaderError::invalid_url(url, e.to_string()))?;
    let response = send(client.get(parsed), url, token).await?;
    let base_url = response.url().to_string();
    let body = read_body(response, token).await?;

    let text = String::from_utf8_lossy(&body);
    let playlist = parse_playlist_with(&text, &base_url, options)
        .map_err(|e| LoaderError::playlist(url, e))?;

    debug!(
        url,
        master = playlist.is_master(),
        bytes = body.len(),
        "Fetched playlist"
    );
    Ok(playlist)
}

/// Downloads one segment, honoring its byte range.
pub(crate) async fn fetch_segment(
    client: &Client,
    segment: &Segment,
    token: &CancellationToken,
) -> Result<Bytes, LoaderError> {
    let parsed = Url::parse(&segment.url)
        .map_err(|e| LoaderError::invalid_url(&segment.url, e.to_string()))?;

    let mut request = client.get(parsed);
    if let Some(range) = segment.range_header() {
        trace!(url = %segment.url, range = %range, "Requesting byte range");
        request = request.header(reqwest::header::RANGE, range);
    }

    let response = send(request, &segment.url, token).await?;
    read_body(response, token).await
}

async fn send(
    request: reqwest::RequestBuilder,
    url: &str,
    token: &CancellationToken,
) -> Result<Response, LoaderError> {
    if token.is_cancelled() {
        return Err(LoaderError::Cancelled);
    }

    let response = tokio::select! {
        biased;
        _ = token.cancelled() => {
            return Err(LoaderError::Cancelled);
        }
        response = request.send() => response,
    }?;

    if !response.status().is_success() {
        return Err(LoaderError::http_status(response.status(), url));
    }
    Ok(response)
}

/// Streams a response body into memory chunk by chunk, checking the token
/// before every chunk.
async fn read_body(response: Response, token: &CancellationToken) -> Result<Bytes, LoaderError> {
    let mut buffer = BytesMut::with_capacity(initial_capacity(response.content_length()));
    let mut stream = response.bytes_stream();

    loop {
        let chunk = tokio::select! {
            biased;
            _ = token.cancelled() => {
                return Err(LoaderError::Cancelled);
            }
            chunk = stream.next() => chunk,
        };

        match chunk {
            Some(chunk) => buffer.extend_from_slice(&chunk?),
            None => break,
        }
    }

    Ok(buffer.freeze())
}

/// Buffer size to reserve for a body of the advertised length.
fn initial_capacity(content_length: Option<u64>) -> usize {
    content_length.map_or(0, |len| {
        usize::try_from(len).map_or(MAX_PREALLOCATION, |len| len.min(MAX_PREALLOCATION))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_playlist_returns_cancelled_when_token_cancelled() {
        let client = Client::new();
        let token = CancellationToken::new();
        token.cancel();

        let res = fetch_playlist(
            &client,
            "https://example.com/playlist.m3u8",
            &ParseOptions::default(),
            &token,
        )
        .await;

        assert!(matches!(res, Err(LoaderError::Cancelled)));
    }

    #[tokio::test]
    async fn fetch_playlist_rejects_invalid_url() {
        let client = Client::new();
        let res = fetch_playlist(
            &client,
            "not a url",
            &ParseOptions::default(),
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(res, Err(LoaderError::InvalidUrl { .. })));
    }

    #[test]
    fn advertised_length_only_hints_the_buffer_size() {
        assert_eq!(initial_capacity(None), 0);
        assert_eq!(initial_capacity(Some(4096)), 4096);
        assert_eq!(initial_capacity(Some(1 << 40)), MAX_PREALLOCATION);
        assert_eq!(initial_capacity(Some(u64::MAX)), MAX_PREALLOCATION);
    }
}
