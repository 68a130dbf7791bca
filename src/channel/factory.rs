//! Buffer and pipeline factory handles
//!
//! Channel configurations only store these; allocation and pipeline
//! construction happen in the transport that consumes the configuration.

use bytes::BytesMut;
use std::fmt;

/// Allocates buffers for a channel's reads and writes
pub trait BufferFactory: Send + Sync + fmt::Debug {
    /// Allocate an empty buffer with at least `capacity` bytes reserved
    fn buffer(&self, capacity: usize) -> BytesMut;
}

/// Plain heap allocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapBufferFactory;

impl BufferFactory for HeapBufferFactory {
    fn buffer(&self, capacity: usize) -> BytesMut {
        BytesMut::with_capacity(capacity)
    }
}

/// Builds the handler pipeline of newly accepted or connected channels
pub trait PipelineFactory: Send + Sync {
    /// Name used when the factory is logged or printed
    fn name(&self) -> &str;
}
