pub mod backoff;
pub mod cache_padded;
pub mod cancel;

pub use backoff::Backoff;
pub use cache_padded::CachePadded;
pub use cancel::CancelFlag;
