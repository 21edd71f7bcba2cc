mod bytes;
mod native;

pub use bytes::ByteBackend;
pub use native::NativeBackend;
