//! Peer wire protocol
//!
//! The peer exchange is a fixed sequence of signed 32-bit little-endian
//! integers with no framing beyond their width. There is no version field, no
//! checksum, and no retransmission; both ends must be configured with the same
//! [`RangeEncoding`].
//!
//! # Message Flow
//!
//! ```text
//! Initiator                         Responder
//!     |                                 |
//!     |--- [workers]? [low] [high] ---->|
//!     |                                 |  partition + scan
//!     |<-- [count] [p0] .. [p(n-1)] ----|
//!     |                                 |
//! ```
//!
//! # Byte Layout
//!
//! ```text
//! RangeRequest (Basic)           [low: i32 LE][high: i32 LE]                  8 bytes
//! RangeRequest (WithWorkerHint)  [workers: i32 LE][low: i32 LE][high: i32 LE] 12 bytes
//! PrimeReport                    [count: i32 LE][prime: i32 LE] x count       4 + 4n bytes
//! ```
//!
//! Every fixed-width field is read exactly. A stream that ends part-way through
//! a field is reported as `TransferIncomplete` naming the field, never accepted
//! as data.

use crate::error::{PrimeError, Result};
use crate::partition::Interval;
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Width of every integer on the wire
pub const INT_WIDTH: usize = std::mem::size_of::<i32>();

/// Which shape of range request both ends have agreed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeEncoding {
    /// `[low][high]`
    #[default]
    Basic,
    /// `[workers][low][high]`
    WithWorkerHint,
}

impl RangeEncoding {
    pub fn from_hint_flag(enabled: bool) -> Self {
        if enabled {
            RangeEncoding::WithWorkerHint
        } else {
            RangeEncoding::Basic
        }
    }

    /// Encoded size of a request in this shape
    pub fn request_len(self) -> usize {
        match self {
            RangeEncoding::Basic => 2 * INT_WIDTH,
            RangeEncoding::WithWorkerHint => 3 * INT_WIDTH,
        }
    }
}

/// Sub-range handed from the initiator to the responder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeRequest {
    /// Worker count the responder should use (extended encoding only)
    pub worker_hint: Option<u32>,
    pub interval: Interval,
}

impl RangeRequest {
    pub fn new(interval: Interval) -> Self {
        Self {
            worker_hint: None,
            interval,
        }
    }

    pub fn with_worker_hint(interval: Interval, workers: u32) -> Self {
        Self {
            worker_hint: Some(workers),
            interval,
        }
    }

    pub fn encoding(&self) -> RangeEncoding {
        RangeEncoding::from_hint_flag(self.worker_hint.is_some())
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoding().request_len());
        if let Some(workers) = self.worker_hint {
            buf.extend_from_slice(&(workers.min(i32::MAX as u32) as i32).to_le_bytes());
        }
        buf.extend_from_slice(&self.interval.low().to_le_bytes());
        buf.extend_from_slice(&self.interval.high().to_le_bytes());
        buf
    }

    /// Decode from a byte slice, returning the request and bytes consumed
    pub fn decode(buf: &[u8], encoding: RangeEncoding) -> Result<(Self, usize)> {
        let mut fields = FieldCursor::new(buf);
        let hint = match encoding {
            RangeEncoding::Basic => None,
            RangeEncoding::WithWorkerHint => Some(fields.next_i32("workers")?),
        };
        let low = fields.next_i32("low")?;
        let high = fields.next_i32("high")?;
        Ok((Self::from_fields(hint, low, high)?, fields.consumed()))
    }

    fn from_fields(hint: Option<i32>, low: i32, high: i32) -> Result<Self> {
        let worker_hint = match hint {
            None => None,
            Some(w) if w >= 1 => Some(w as u32),
            Some(w) => {
                return Err(PrimeError::Protocol(format!(
                    "worker hint must be at least 1, got {}",
                    w
                )))
            }
        };
        let interval = Interval::new(low, high).map_err(|_| {
            PrimeError::Protocol(format!("range low {} exceeds high {}", low, high))
        })?;
        Ok(Self {
            worker_hint,
            interval,
        })
    }
}

/// Primes found by the responder, in discovery order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrimeReport {
    pub primes: Vec<i32>,
}

impl PrimeReport {
    pub fn new(primes: Vec<i32>) -> Self {
        Self { primes }
    }

    pub fn count(&self) -> usize {
        self.primes.len()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let count = i32::try_from(self.primes.len()).map_err(|_| {
            PrimeError::Protocol(format!("{} primes exceed i32 count field", self.primes.len()))
        })?;
        let mut buf = Vec::with_capacity(INT_WIDTH * (1 + self.primes.len()));
        buf.extend_from_slice(&count.to_le_bytes());
        for prime in &self.primes {
            buf.extend_from_slice(&prime.to_le_bytes());
        }
        Ok(buf)
    }

    /// Decode from a byte slice, returning the report and bytes consumed
    ///
    /// A count above `max_count` is a protocol error.
    pub fn decode(buf: &[u8], max_count: usize) -> Result<(Self, usize)> {
        let mut fields = FieldCursor::new(buf);
        let count = checked_count(fields.next_i32("count")?, max_count)?;
        let body = fields.take("primes", count * INT_WIDTH)?;
        Ok((Self::new(decode_ints(body)), fields.consumed()))
    }

    /// Decode just the count header
    fn decode_count(header: &[u8], max_count: usize) -> Result<usize> {
        checked_count(FieldCursor::new(header).next_i32("count")?, max_count)
    }

    /// Check every prime lies inside the interval that was handed out
    pub fn validate(&self, span: Interval) -> Result<()> {
        if self.primes.len() as u64 > span.len() {
            return Err(PrimeError::Protocol(format!(
                "{} primes reported for {} ({} integers)",
                self.primes.len(),
                span,
                span.len()
            )));
        }
        if let Some(stray) = self.primes.iter().find(|&&p| !span.contains(p)) {
            return Err(PrimeError::Protocol(format!(
                "reported prime {} lies outside {}",
                stray, span
            )));
        }
        Ok(())
    }
}

/// Sequential reader over fixed-width fields of a byte slice
struct FieldCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldCursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, field: &'static str, len: usize) -> Result<&'a [u8]> {
        let available = self.buf.len() - self.pos;
        if available < len {
            return Err(PrimeError::TransferIncomplete {
                field,
                expected: len,
                received: available,
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn next_i32(&mut self, field: &'static str) -> Result<i32> {
        let bytes = self.take(field, INT_WIDTH)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn consumed(&self) -> usize {
        self.pos
    }
}

fn decode_ints(body: &[u8]) -> Vec<i32> {
    body.chunks_exact(INT_WIDTH)
        .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn checked_count(count: i32, max_count: usize) -> Result<usize> {
    if count < 0 {
        return Err(PrimeError::Protocol(format!("negative prime count {}", count)));
    }
    let count = count as usize;
    if count > max_count {
        return Err(PrimeError::Protocol(format!(
            "prime count {} exceeds limit {}",
            count, max_count
        )));
    }
    Ok(count)
}

/// Read into `buf` until it is full or the stream ends
///
/// Returns the number of bytes that arrived. A short count is not an error
/// here: the decoder turns it into `TransferIncomplete` naming the field that
/// was cut off.
async fn fill<R>(reader: &mut R, buf: &mut [u8]) -> Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Read a range request from a stream
pub async fn read_range_request<R>(reader: &mut R, encoding: RangeEncoding) -> Result<RangeRequest>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 3 * INT_WIDTH];
    let buf = &mut buf[..encoding.request_len()];
    let filled = fill(reader, buf).await?;
    let (request, _) = RangeRequest::decode(&buf[..filled], encoding)?;
    Ok(request)
}

/// Write a range request and flush
pub async fn write_range_request<W>(writer: &mut W, request: &RangeRequest) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&request.encode()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a prime report, refusing counts above `max_count`
///
/// The count header is read first so the body buffer can be sized; both are
/// then decoded together by [`PrimeReport::decode`].
pub async fn read_prime_report<R>(reader: &mut R, max_count: usize) -> Result<PrimeReport>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; INT_WIDTH];
    let filled = fill(reader, &mut header).await?;
    let count = PrimeReport::decode_count(&header[..filled], max_count)?;

    let mut buf = vec![0u8; INT_WIDTH * (1 + count)];
    buf[..INT_WIDTH].copy_from_slice(&header);
    let filled = fill(reader, &mut buf[INT_WIDTH..]).await?;
    let (report, _) = PrimeReport::decode(&buf[..INT_WIDTH + filled], max_count)?;
    Ok(report)
}

/// Write a prime report and flush
pub async fn write_prime_report<W>(writer: &mut W, report: &PrimeReport) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&report.encode()?).await?;
    writer.flush().await?;
    Ok(())
}

/// Await `fut`, bounded by `limit` when one is configured
///
/// `None` blocks indefinitely.
pub async fn with_deadline<T, F>(limit: Option<Duration>, operation: &'static str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match limit {
        None => fut.await,
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| PrimeError::Timeout {
                operation,
                elapsed: limit,
            })?,
    }
}
