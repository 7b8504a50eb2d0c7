use std::time::Duration;

use reqwest::{Client, ClientBuilder, Response};
use serde::Serialize;

use crate::ratelimit::RateLimiter;

// Sink calls are blocking with a fixed timeout; a timeout is a retryable
// I/O failure handled by the endpoint-candidate walk, not a fatal error.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct RequestClient {
    client: Client,
    rate_limiter: RateLimiter,
}

impl RequestClient {
    pub fn new() -> anyhow::Result<Self> {
        let client = ClientBuilder::new().timeout(REQUEST_TIMEOUT).build()?;
        let rate_limiter = RateLimiter::new();
        Ok(Self {
            client,
            rate_limiter,
        })
    }

    pub async fn post_json<T>(&self, url: &str, payload: &T) -> anyhow::Result<Response>
    where
        T: Serialize + ?Sized,
    {
        // Wait (non-blocking) until we're allowed to make a request according
        // to our self-imposed rate-limiting policy.
        self.rate_limiter.wait_until_ready().await;

        let response = self.client.post(url).json(payload).send().await?;
        Ok(response)
    }
}
