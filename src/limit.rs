use anyhow::{bail, Result};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Groq free-tier budget for the models we target.
pub const GROQ_TOKENS_PER_MINUTE: usize = 6000;

/// Sliding-window token budget for outbound API requests.
///
/// Tracks how many prompt tokens were admitted in the trailing window and
/// suspends a caller until enough old entries expire to fit a new request.
/// One instance guards one provider; `&mut self` keeps read-decide-append
/// atomic for the single logical caller.
pub struct TokenRateLimiter {
    capacity: usize,
    window: Duration,
    entries: VecDeque<(Instant, usize)>,
}

impl TokenRateLimiter {
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_window(capacity, Duration::from_secs(60))
    }

    pub fn with_window(capacity: usize, window: Duration) -> Result<Self> {
        if capacity == 0 {
            bail!("rate limiter capacity must be positive");
        }
        if window.is_zero() {
            bail!("rate limiter window must be positive");
        }
        Ok(Self { capacity, window, entries: VecDeque::new() })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tokens admitted within the trailing window as of now.
    pub fn consumed(&mut self) -> usize {
        self.prune(Instant::now());
        self.entries.iter().map(|&(_, n)| n).sum()
    }

    /// Wait until `tokens` fits under the window budget, then record the
    /// spend and return. A request that can never fit errors immediately
    /// instead of sleeping forever.
    pub async fn acquire(&mut self, tokens: usize) -> Result<()> {
        if tokens > self.capacity {
            bail!(
                "request estimate of {} tokens exceeds rate limit capacity of {} tokens",
                tokens,
                self.capacity
            );
        }
        loop {
            let now = Instant::now();
            self.prune(now);
            let consumed: usize = self.entries.iter().map(|&(_, n)| n).sum();
            if consumed + tokens <= self.capacity {
                self.entries.push_back((now, tokens));
                return Ok(());
            }
            // Capacity frees next when the oldest entry leaves the window.
            // Several entries may need to expire; the loop re-evaluates.
            let Some(&(oldest, _)) = self.entries.front() else {
                continue;
            };
            tokio::time::sleep_until(oldest + self.window).await;
        }
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&(ts, _)) = self.entries.front() {
            if now.duration_since(ts) >= self.window {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(TokenRateLimiter::new(0).is_err());
        assert!(TokenRateLimiter::with_window(10, Duration::ZERO).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn admits_without_delay_under_capacity() {
        let mut rl = TokenRateLimiter::new(100).unwrap();
        let before = Instant::now();
        rl.acquire(60).await.unwrap();
        rl.acquire(40).await.unwrap();
        assert_eq!(Instant::now(), before);
        assert_eq!(rl.consumed(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn blocks_until_oldest_entry_expires() {
        let mut rl = TokenRateLimiter::new(100).unwrap();
        rl.acquire(80).await.unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;

        let before = Instant::now();
        rl.acquire(50).await.unwrap();
        // The 80-token entry leaves the window 60s after it was recorded,
        // i.e. 50s after this acquire started.
        assert_eq!(Instant::now() - before, Duration::from_secs(50));
        assert_eq!(rl.consumed(), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_several_entries_when_one_is_not_enough() {
        let mut rl = TokenRateLimiter::new(100).unwrap();
        rl.acquire(40).await.unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;
        rl.acquire(40).await.unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;

        // 90 tokens needs both earlier entries gone: the first expires at
        // t=60, the second at t=70.
        let before = Instant::now();
        rl.acquire(90).await.unwrap();
        assert_eq!(Instant::now() - before, Duration::from_secs(50));
        assert_eq!(rl.consumed(), 90);
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_chunk_sends_respect_the_window() {
        // Two payloads of 3000 and 3500 tokens against a 6000-token window:
        // the first goes through untouched, the second waits out the first.
        let mut rl = TokenRateLimiter::new(6000).unwrap();
        let before = Instant::now();
        rl.acquire(3000).await.unwrap();
        assert_eq!(Instant::now(), before);
        rl.acquire(3500).await.unwrap();
        assert_eq!(Instant::now() - before, Duration::from_secs(60));
        assert_eq!(rl.consumed(), 3500);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_request_fails_fast() {
        let mut rl = TokenRateLimiter::new(100).unwrap();
        let before = Instant::now();
        let err = rl.acquire(101).await.unwrap_err();
        assert!(err.to_string().contains("exceeds rate limit capacity"));
        // Must not have slept or recorded anything.
        assert_eq!(Instant::now(), before);
        assert_eq!(rl.consumed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn window_sum_never_exceeds_capacity() {
        let mut rl = TokenRateLimiter::new(50).unwrap();
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let tokens = rng.gen_range(1..=50);
            rl.acquire(tokens).await.unwrap();
            assert!(rl.consumed() <= 50);
            let jump = rng.gen_range(0..5_000);
            tokio::time::advance(Duration::from_millis(jump)).await;
            assert!(rl.consumed() <= 50);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_completely_after_window() {
        let mut rl = TokenRateLimiter::new(100).unwrap();
        rl.acquire(100).await.unwrap();
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(rl.consumed(), 0);
        let before = Instant::now();
        rl.acquire(100).await.unwrap();
        assert_eq!(Instant::now(), before);
    }
}
