use std::time::Duration;

use hls::ParseOptions;
use reqwest::header::{HeaderMap, HeaderValue};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 14) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";

/// Configurable options for the downloader
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Overall timeout for a single HTTP request (zero disables it)
    pub timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Read timeout (maximum time between receiving data chunks)
    pub read_timeout: Duration,

    /// Write timeout (maximum time for sending request data)
    pub write_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// Maximum number of redirects followed per request
    pub max_redirects: usize,

    /// User agent string
    pub user_agent: String,

    /// HTTP headers sent with every request
    pub headers: HeaderMap,

    /// Capacity of the per-session event channel
    pub event_channel_capacity: usize,

    /// Keep downloaded segments and hand them back in `Completed`
    pub retain_segments: bool,

    /// Playlist parser options
    pub parse_options: ParseOptions,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::ZERO,
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            follow_redirects: true,
            max_redirects: 10,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: LoaderConfig::get_default_headers(),
            event_channel_capacity: 4,
            retain_segments: false,
            parse_options: ParseOptions::default(),
        }
    }
}

impl LoaderConfig {
    /// Returns `config` with its headers merged over the default headers.
    /// Custom headers take precedence over defaults for the same fields.
    pub fn with_config(config: LoaderConfig) -> Self {
        let mut headers = LoaderConfig::get_default_headers();
        for (name, value) in config.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }

        Self { headers, ..config }
    }

    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));
        default_headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.5"),
        );
        default_headers.insert(
            reqwest::header::CONNECTION,
            HeaderValue::from_static("keep-alive"),
        );
        default_headers
    }

    pub fn with_timeouts(mut self, connect: Duration, read: Duration, write: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self.write_timeout = write;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    pub fn with_retain_segments(mut self, retain: bool) -> Self {
        self.retain_segments = retain;
        self
    }

    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse_options = options;
        self
    }
}
