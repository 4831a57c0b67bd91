//! Bounded retries for socket reads.
//!
//! A read that returns nothing while more bytes are expected costs one
//! attempt from a [`RetryBudget`], and so does a read that sees no bytes
//! within the policy's read timeout. Progress refills the budget. When the
//! budget runs dry the read gives up with [`Exhausted`] instead of looping
//! or waiting on a stalled peer.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

/// Default bound on a single read. Matches the poll loop's granularity.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// How many empty or stalled reads to tolerate, and how long to wait
/// between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
    pub read_timeout: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self {
            attempts,
            backoff,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn budget(&self) -> RetryBudget {
        RetryBudget {
            policy: *self,
            remaining: self.attempts,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(10))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("gave up after {attempts} empty or stalled reads")]
pub struct Exhausted {
    pub attempts: u32,
}

/// Attempts left for one read sequence.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    policy: RetryPolicy,
    remaining: u32,
}

impl RetryBudget {
    /// Spends one attempt, sleeping the backoff if any are left.
    pub async fn spend(&mut self) -> Result<(), Exhausted> {
        if self.remaining == 0 {
            return Err(Exhausted {
                attempts: self.policy.attempts,
            });
        }
        self.remaining -= 1;
        if !self.policy.backoff.is_zero() {
            tokio::time::sleep(self.policy.backoff).await;
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.remaining = self.policy.attempts;
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

/// Errors from a bounded read.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error(transparent)]
    Exhausted(#[from] Exhausted),
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
}

pub(crate) fn is_spurious(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
    )
}

/// One read bounded by the policy's read timeout.
///
/// Timeouts and spurious errors spend an attempt and retry. `Ok(0)` is a
/// clean end of stream and is left to the caller.
pub async fn read_some<R>(
    reader: &mut R,
    buf: &mut [u8],
    budget: &mut RetryBudget,
) -> Result<usize, ReadError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let limit = budget.policy.read_timeout;
    loop {
        match timeout(limit, reader.read(buf)).await {
            Ok(Ok(n)) => {
                if n > 0 {
                    budget.reset();
                }
                return Ok(n);
            }
            Ok(Err(e)) if is_spurious(&e) => budget.spend().await?,
            Ok(Err(e)) => return Err(ReadError::Io(e)),
            Err(_) => {
                tracing::debug!(
                    remaining = budget.remaining(),
                    "Read stalled for {:?}",
                    limit
                );
                budget.spend().await?;
            }
        }
    }
}

/// Reads until at least one byte arrives or the budget runs out.
///
/// Zero-byte reads count as empty attempts here: the caller is waiting on
/// bytes it was promised.
pub async fn read_more<R>(
    reader: &mut R,
    buf: &mut [u8],
    budget: &mut RetryBudget,
) -> Result<usize, ReadError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    loop {
        match read_some(reader, buf, budget).await? {
            0 => budget.spend().await?,
            n => return Ok(n),
        }
    }
}

/// Appends to `out` until it holds exactly `target` bytes.
pub async fn read_to_len<R>(
    reader: &mut R,
    out: &mut Vec<u8>,
    target: usize,
    chunk_size: usize,
    budget: &mut RetryBudget,
) -> Result<(), ReadError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut chunk = vec![0u8; chunk_size.max(1)];
    while out.len() < target {
        let want = (target - out.len()).min(chunk.len());
        let n = read_more(reader, &mut chunk[..want], budget).await?;
        out.extend_from_slice(&chunk[..n]);
    }
    Ok(())
}
