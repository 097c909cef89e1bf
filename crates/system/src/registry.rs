//! Counter source backed by the registry performance-data block.

use crate::counter::CounterSource;
use crate::perf_data::{find_raw_counter, PROCESSOR_QUEUE_LENGTH, SYSTEM_OBJECT};
use loadavg_core::{BackendStep, SampleError};
use tracing::debug;

/// Smallest capacity the buffer grows to from empty.
const MIN_GROWTH: usize = 256;

/// Outcome of one registry fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// The block was written; holds the number of bytes used.
    Complete(usize),
    /// The buffer was too small (`ERROR_MORE_DATA`). The OS does not say how
    /// much room it needs.
    MoreData,
    /// Any other status code.
    Failed(u32),
}

/// The registry performance-data key.
///
/// Implementors own the key handle and release it when dropped.
pub trait PerfDataRegistry: Send {
    /// Read the performance data for `object` (a title index as a decimal
    /// string) into `buf`.
    fn query(&mut self, object: &str, buf: &mut [u8]) -> FetchStatus;
}

/// Byte buffer that only ever grows.
#[derive(Debug)]
pub struct CounterBuffer {
    bytes: Vec<u8>,
}

impl CounterBuffer {
    pub fn with_capacity(capacity: usize) -> Result<Self, SampleError> {
        let mut buffer = Self { bytes: Vec::new() };
        buffer.ensure_capacity(capacity)?;
        Ok(buffer)
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Make room for at least `capacity` bytes. Existing content is not
    /// preserved in any meaningful way; the next fetch overwrites it.
    pub fn ensure_capacity(&mut self, capacity: usize) -> Result<(), SampleError> {
        if capacity <= self.bytes.len() {
            return Ok(());
        }
        self.bytes
            .try_reserve_exact(capacity - self.bytes.len())
            .map_err(|_| SampleError::AllocationFailure { requested: capacity })?;
        self.bytes.resize(capacity, 0);
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

/// Reads "Processor Queue Length" out of the System object's performance
/// data, keeping its buffer between samples.
pub struct RegistryCounterSource<R> {
    registry: R,
    buffer: CounterBuffer,
    max_capacity: usize,
}

impl<R: PerfDataRegistry> RegistryCounterSource<R> {
    /// `initial_capacity` bytes are allocated up front; the buffer doubles on
    /// demand but never beyond `max_capacity`.
    pub fn new(registry: R, initial_capacity: usize, max_capacity: usize) -> Result<Self, SampleError> {
        Ok(Self {
            registry,
            buffer: CounterBuffer::with_capacity(initial_capacity)?,
            max_capacity: max_capacity.max(initial_capacity),
        })
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Fetch the System object, doubling the buffer until it fits.
    /// Returns the number of valid bytes.
    fn fetch(&mut self) -> Result<usize, SampleError> {
        loop {
            match self.registry.query(SYSTEM_OBJECT, self.buffer.as_mut_slice()) {
                FetchStatus::Complete(len) => return Ok(len.min(self.buffer.capacity())),
                FetchStatus::MoreData => self.grow()?,
                FetchStatus::Failed(status) => {
                    return Err(SampleError::backend(BackendStep::RegistryFetch, status));
                }
            }
        }
    }

    fn grow(&mut self) -> Result<(), SampleError> {
        let current = self.buffer.capacity();
        let doubled = current.saturating_mul(2).max(MIN_GROWTH);
        if current >= self.max_capacity {
            return Err(SampleError::AllocationFailure { requested: doubled });
        }
        let next = doubled.min(self.max_capacity);
        self.buffer.ensure_capacity(next)?;
        debug!(from = current, to = next, "grew performance data buffer");
        Ok(())
    }
}

impl<R: PerfDataRegistry> CounterSource for RegistryCounterSource<R> {
    fn name(&self) -> &'static str {
        "registry"
    }

    fn sample(&mut self) -> Result<u32, SampleError> {
        let len = self.fetch()?;
        find_raw_counter(&self.buffer.as_slice()[..len], PROCESSOR_QUEUE_LENGTH)
    }
}
