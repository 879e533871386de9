//! Reusable encoders.
//!
//! Encoding a record needs a scratch buffer. [`EncoderPool`] keeps released
//! encoders, buffer capacity included, so steady-state logging does not
//! allocate. The pool is an ordinary value: create one and hand it (usually in
//! an `Arc`) to whatever assembles records.
//!
//! - [`EncoderPool::acquire`] returns a [`PooledEncoder`] guard that goes back
//!   to the pool when dropped
//! - [`EncoderPool::take`] and [`EncoderPool::release`] do the same by hand,
//!   for encoders that outlive a scope
//!
//! Every encoder handed out is empty and owned by exactly one caller until it
//! is released.
//!
//! ```rust
//! use logfmt_encoder::{EncoderOptions, EncoderPool, ObjectEncoder};
//!
//! let pool = EncoderPool::new(EncoderOptions::default());
//! {
//!     let mut enc = pool.acquire();
//!     enc.add_string("k", "v");
//!     assert_eq!(enc.as_bytes(), b"k=v");
//! }
//! // The released encoder comes back empty.
//! assert!(pool.acquire().is_empty());
//! ```

use crate::{Encoder, EncoderOptions};
use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Idle encoders kept by default; releases beyond this are dropped.
pub const DEFAULT_MAX_IDLE: usize = 64;

/// A thread-safe free list of [`Encoder`]s sharing one set of options.
#[derive(Debug)]
pub struct EncoderPool {
    options: Arc<EncoderOptions>,
    idle: Mutex<Vec<Encoder>>,
    max_idle: usize,
    created: AtomicUsize,
}

/// Snapshot of pool counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Encoders waiting in the free list.
    pub idle: usize,
    /// Encoders allocated since the pool was created.
    pub created: usize,
}

impl EncoderPool {
    pub fn new(options: EncoderOptions) -> Self {
        EncoderPool::with_max_idle(options, DEFAULT_MAX_IDLE)
    }

    pub fn with_max_idle(options: EncoderOptions, max_idle: usize) -> Self {
        EncoderPool {
            options: Arc::new(options),
            idle: Mutex::new(Vec::new()),
            max_idle,
            created: AtomicUsize::new(0),
        }
    }

    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    /// Borrows an empty encoder for the current scope.
    pub fn acquire(&self) -> PooledEncoder<'_> {
        PooledEncoder {
            pool: self,
            encoder: self.take(),
        }
    }

    /// Removes an empty encoder from the pool, allocating one if none is idle.
    pub fn take(&self) -> Encoder {
        let recycled = self.idle.lock().pop();
        match recycled {
            Some(mut encoder) => {
                encoder.reset();
                if !Arc::ptr_eq(encoder.shared_options(), &self.options) {
                    encoder.set_shared_options(Arc::clone(&self.options));
                }
                encoder
            }
            None => {
                let created = self.created.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::trace!(created, "allocating encoder");
                Encoder::with_shared_options(Arc::clone(&self.options))
            }
        }
    }

    /// Returns an encoder for reuse. Its contents are cleared on the next
    /// [`take`](Self::take), not here, and its capacity is kept.
    pub fn release(&self, encoder: Encoder) {
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(encoder);
        } else {
            drop(idle);
            tracing::debug!(max_idle = self.max_idle, "pool full, dropping encoder");
        }
    }

    /// Copies `source` into a pooled encoder: same tokens, same options.
    pub fn clone_encoder(&self, source: &Encoder) -> Encoder {
        let mut encoder = self.take();
        encoder.clone_from(source);
        encoder
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            idle: self.idle.lock().len(),
            created: self.created.load(Ordering::Relaxed),
        }
    }
}

impl Default for EncoderPool {
    fn default() -> Self {
        EncoderPool::new(EncoderOptions::default())
    }
}

/// An encoder on loan from an [`EncoderPool`]; released on drop.
#[derive(Debug)]
pub struct PooledEncoder<'a> {
    pool: &'a EncoderPool,
    encoder: Encoder,
}

impl Deref for PooledEncoder<'_> {
    type Target = Encoder;

    fn deref(&self) -> &Encoder {
        &self.encoder
    }
}

impl DerefMut for PooledEncoder<'_> {
    fn deref_mut(&mut self) -> &mut Encoder {
        &mut self.encoder
    }
}

impl Drop for PooledEncoder<'_> {
    fn drop(&mut self) {
        // The placeholder has no buffer allocation.
        let placeholder = Encoder::detached(Arc::clone(&self.pool.options));
        let encoder = std::mem::replace(&mut self.encoder, placeholder);
        self.pool.release(encoder);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ObjectEncoder;

    #[test]
    fn test_release_keeps_capacity() {
        let pool = EncoderPool::new(EncoderOptions::new().with_initial_capacity(8));
        let mut enc = pool.take();
        for i in 0..100 {
            enc.add_i64("n", i);
        }
        let grown = enc.buffer().capacity();
        pool.release(enc);

        let enc = pool.take();
        assert!(enc.is_empty());
        assert_eq!(enc.buffer().capacity(), grown);
        assert_eq!(pool.stats().created, 1);
    }

    #[test]
    fn test_max_idle_bounds_free_list() {
        let pool = EncoderPool::with_max_idle(EncoderOptions::default(), 1);
        let a = pool.take();
        let b = pool.take();
        pool.release(a);
        pool.release(b);
        let stats = pool.stats();
        assert_eq!(stats.idle, 1);
        assert_eq!(stats.created, 2);
    }

    #[test]
    fn test_clone_encoder_copies_tokens() {
        let pool = EncoderPool::default();
        let mut source = Encoder::new(EncoderOptions::new().with_level_key("lvl"));
        source.add_bool("ok", true);
        let copy = pool.clone_encoder(&source);
        assert_eq!(copy.as_bytes(), b"ok=true");
        assert_eq!(copy.options().level_key, "lvl");
    }

    #[test]
    fn test_recycled_encoder_takes_pool_options() {
        let pool = EncoderPool::new(EncoderOptions::new().with_message_key("message"));
        let copy = pool.clone_encoder(&Encoder::default());
        assert_eq!(copy.options().message_key, "msg");
        pool.release(copy);
        assert_eq!(pool.take().options().message_key, "message");
    }
}
