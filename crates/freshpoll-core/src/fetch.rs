//! The upstream fetch seam.

use std::future::Future;

use crate::errors::FetchError;

/// One asynchronous read from the upstream source.
///
/// Implementations must tolerate being dropped mid-flight: a newer tick or a
/// detaching consumer cancels an outstanding fetch by dropping its future.
pub trait Fetcher: Send + Sync + 'static {
    type Value: Send + 'static;

    fn fetch(&self) -> impl Future<Output = Result<Self::Value, FetchError>> + Send;
}

impl<F, Fut, V> Fetcher for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, FetchError>> + Send,
    V: Send + 'static,
{
    type Value = V;

    fn fetch(&self) -> impl Future<Output = Result<V, FetchError>> + Send {
        self()
    }
}

/// A fetched value that names the segment it was published for.
///
/// Freshness is decided by comparing this against the wall-clock segment.
pub trait SegmentStamped {
    fn segment_index(&self) -> i64;
}

macro_rules! impl_segment_stamped {
    ($($ty:ty),* $(,)?) => {
        $(
            impl SegmentStamped for $ty {
                fn segment_index(&self) -> i64 {
                    i64::try_from(*self).unwrap_or(i64::MAX)
                }
            }
        )*
    };
}

impl_segment_stamped!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);
