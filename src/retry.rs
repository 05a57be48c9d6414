use std::future::Future;
use std::time::Duration;

use log::debug;

/// Linear backoff: retry `n` (zero-based) waits `base + increment * n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub max_retries: u32,
    pub base: Duration,
    pub increment: Duration,
}

/// Outcome of a single attempt.
pub enum Attempt<T, E> {
    Done(T),
    Retry(E),
}

impl Backoff {
    /// Schedule for a `users` row that may lag a few hundred ms behind sign-up.
    pub const USER_LOOKUP: Backoff = Backoff {
        max_retries: 5,
        base: Duration::from_millis(300),
        increment: Duration::from_millis(200),
    };

    pub fn delay(&self, retry: u32) -> Option<Duration> {
        (retry < self.max_retries).then(|| self.base + self.increment * retry)
    }

    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_retries).filter_map(|retry| self.delay(retry))
    }

    /// Runs `op` until it is done or retries run out, in which case the last
    /// error is returned. `op` receives the zero-based retry count.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Attempt<T, E>>,
    {
        let mut retry = 0;
        loop {
            match op(retry).await {
                Attempt::Done(value) => return Ok(value),
                Attempt::Retry(error) => match self.delay(retry) {
                    Some(delay) => {
                        debug!("Attempt {} missed, retrying in {:?}", retry + 1, delay);
                        tokio::time::sleep(delay).await;
                        retry += 1;
                    }
                    None => return Err(error),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    use crate::test_support::assert_elapsed;

    #[test]
    fn user_lookup_schedule() {
        let delays: Vec<u64> = Backoff::USER_LOOKUP
            .delays()
            .map(|d| d.as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![300, 500, 700, 900, 1100]);
        assert_eq!(Backoff::USER_LOOKUP.delay(5), None);
    }

    #[rstest]
    #[case(0, 300)]
    #[case(1, 500)]
    #[case(4, 1100)]
    fn delay_grows_linearly(#[case] retry: u32, #[case] millis: u64) {
        assert_eq!(
            Backoff::USER_LOOKUP.delay(retry),
            Some(Duration::from_millis(millis))
        );
    }

    #[test]
    fn custom_parameters() {
        let backoff = Backoff {
            max_retries: 2,
            base: Duration::from_millis(10),
            increment: Duration::from_millis(5),
        };
        let delays: Vec<Duration> = backoff.delays().collect();
        assert_eq!(
            delays,
            vec![Duration::from_millis(10), Duration::from_millis(15)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let started = Instant::now();

        let result: Result<(), &str> = Backoff::USER_LOOKUP
            .run(move |_| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Attempt::Retry("missing")
            })
            .await;

        assert_eq!(result, Err("missing"));
        assert_eq!(attempts.load(Ordering::SeqCst), 6);
        assert_elapsed(started, 3500);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_first_success() {
        let started = Instant::now();

        let result: Result<u32, &str> = Backoff::USER_LOOKUP
            .run(|retry| async move {
                if retry == 2 {
                    Attempt::Done(retry)
                } else {
                    Attempt::Retry("missing")
                }
            })
            .await;

        assert_eq!(result, Ok(2));
        assert_elapsed(started, 800);
    }
}
