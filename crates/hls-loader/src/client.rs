use reqwest::Client;
use reqwest::redirect::Policy;
use tracing::debug;

use crate::{LoaderConfig, LoaderError};

/// Builds the HTTP client shared by the playlist and segment requests of
/// every session. Zero durations leave the corresponding timeout unset.
pub fn create_client(config: &LoaderConfig) -> Result<Client, LoaderError> {
    let redirect = match config.follow_redirects {
        true => Policy::limited(config.max_redirects),
        false => Policy::none(),
    };

    let mut builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(config.headers.clone())
        .redirect(redirect);

    if !config.timeout.is_zero() {
        builder = builder.timeout(config.timeout);
    }
    if !config.connect_timeout.is_zero() {
        builder = builder.connect_timeout(config.connect_timeout);
    }
    if !config.read_timeout.is_zero() {
        builder = builder.read_timeout(config.read_timeout);
    }

    debug!(
        user_agent = %config.user_agent,
        max_redirects = ?config.follow_redirects.then_some(config.max_redirects),
        "Building segment HTTP client"
    );

    builder.build().map_err(LoaderError::from)
}
