use governor::{
    Quota, RateLimiter as GovernorRateLimiter,
    clock::{QuantaClock, QuantaInstant},
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
};
use nonzero_ext::nonzero;
use std::{num::NonZeroU32, time::Duration};

// The sink services sit behind shared infrastructure; keep the request rate
// well under anything that would trip their own throttling.
const REQ_PER_SEC: NonZeroU32 = nonzero!(5u32);
const MS_BETWEEN_REQ: Duration = Duration::from_millis(200);

type SpecificGovernorRateLimiter =
    GovernorRateLimiter<NotKeyed, InMemoryState, QuantaClock, NoOpMiddleware<QuantaInstant>>;

pub struct RateLimiter {
    req_per_sec: SpecificGovernorRateLimiter,
    ms_between_req: SpecificGovernorRateLimiter,
}

impl RateLimiter {
    pub fn new() -> Self {
        // Cap the average rate at X total req/sec.
        let req_per_sec = GovernorRateLimiter::direct(Quota::per_second(REQ_PER_SEC));

        // No two requests closer than Y ms.
        let ms_between_req =
            GovernorRateLimiter::direct(Quota::with_period(MS_BETWEEN_REQ).unwrap());

        RateLimiter {
            req_per_sec,
            ms_between_req,
        }
    }

    pub async fn wait_until_ready(&self) {
        // Await the average-rate limiter first; the spacing limiter then
        // strictly serializes whatever got through, so a burst that clears
        // the per-second quota still goes out one request every Y ms.
        self.req_per_sec.until_ready().await;
        self.ms_between_req.until_ready().await;
    }
}
