//! Pure transformations: no I/O, no shared state.

pub(crate) mod buffer;
pub(crate) mod decode;

pub(crate) use buffer::OrderedBuffer;
pub(crate) use decode::decode_body;
