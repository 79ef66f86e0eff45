//! Histogram counter types.
//!
//! Callers own their counters as plain integers. For the duration of one
//! histogram call the exclusive borrow is reinterpreted as a slice of the
//! matching atomic type, so that concurrently running blocks can update the
//! same bins with relaxed atomic adds.

use std::sync::atomic::{AtomicI32, AtomicU32, AtomicUsize, Ordering};
#[cfg(target_pointer_width = "64")]
use std::sync::atomic::{AtomicI64, AtomicU64};

/// Integer type usable as a global histogram counter.
pub trait Counter: Copy + Send + Sync + 'static {
    /// Atomic type with the same layout as `Self`.
    type Atomic: Send + Sync;

    /// View exclusively borrowed counters as atomics.
    fn as_atomic(counters: &mut [Self]) -> &[Self::Atomic];

    /// Add `n` (wrapping).
    fn atomic_add(counter: &Self::Atomic, n: u32);

    fn atomic_reset(counter: &Self::Atomic);
}

macro_rules! impl_counter {
    ($($int:ty => $atomic:ty),* $(,)?) => {$(
        impl Counter for $int {
            type Atomic = $atomic;

            #[inline]
            fn as_atomic(counters: &mut [Self]) -> &[Self::Atomic] {
                const {
                    assert!(size_of::<$int>() == size_of::<$atomic>());
                    assert!(align_of::<$int>() == align_of::<$atomic>());
                };
                // SAFETY: the atomic type has the same size, alignment and bit
                // validity as the integer (asserted above). The slice is
                // exclusively borrowed for the returned lifetime, so every
                // access to it in that time goes through the atomics.
                unsafe { &*(counters as *mut [Self] as *const [Self::Atomic]) }
            }

            #[inline]
            fn atomic_add(counter: &Self::Atomic, n: u32) {
                counter.fetch_add(n as $int, Ordering::Relaxed);
            }

            #[inline]
            fn atomic_reset(counter: &Self::Atomic) {
                counter.store(0, Ordering::Relaxed);
            }
        }
    )*};
}

impl_counter!(u32 => AtomicU32, i32 => AtomicI32, usize => AtomicUsize);

#[cfg(target_pointer_width = "64")]
impl_counter!(u64 => AtomicU64, i64 => AtomicI64);
