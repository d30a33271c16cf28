//! Purpose: Kind-typed ownership of one native resource id with exactly-once release.
//! Exports: `ResourceId`, `HandleKind`, `NativeHandle`.
//! Role: Accounting only; each handle kind supplies its own native release call.
//! Invariants: `release` runs at most once per handle, guarded by a compare-and-swap.
//! Invariants: `live -> disposed` is terminal; dropping a live handle closes it.
//! Invariants: `release` waits for every in-flight `with_live` call on the handle.
use std::fmt;
use std::marker::PhantomData;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::error::{Error, ErrorKind};
use crate::core::resolver;

/// Opaque id of a native-owned object, meaningful only to the native library.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(transparent)]
pub struct ResourceId(i64);

impl ResourceId {
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A family of native objects sharing one release call.
pub trait HandleKind: 'static {
    const NAME: &'static str;

    /// Runs before a handle of this kind is built. Defaults to loading the
    /// process-wide native library, so release symbols are always resolvable.
    fn prepare() -> Result<(), Error> {
        resolver::ensure_loaded().map(|_| ())
    }

    fn release(id: ResourceId) -> Result<(), Error>;
}

pub struct NativeHandle<K: HandleKind> {
    id: ResourceId,
    disposed: AtomicBool,
    // Shared by in-flight native calls, taken exclusively before release.
    in_use: RwLock<()>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: HandleKind> NativeHandle<K> {
    /// Takes ownership of an id already produced by the native library.
    ///
    /// # Safety
    ///
    /// `id` must have been returned by the native constructor of kind `K`, must
    /// not be released yet, and must not be owned by another handle. The handle
    /// passes it to `K::release` when it is closed or dropped.
    pub unsafe fn from_raw(id: ResourceId) -> Result<Self, Error> {
        K::prepare()?;
        tracing::trace!(kind = K::NAME, id = id.as_raw(), "handle acquired");
        Ok(Self {
            id,
            disposed: AtomicBool::new(false),
            in_use: RwLock::new(()),
            _kind: PhantomData,
        })
    }

    /// Releases the native resource once. Later and concurrent calls are no-ops.
    ///
    /// A release failure is returned to the one caller that ran it; the handle
    /// stays disposed either way.
    pub fn close(&self) -> Result<(), Error> {
        if self
            .disposed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }
        // New `with_live` calls now see the handle disposed; wait out the ones already running.
        drop(self.in_use.write().unwrap_or_else(|poisoned| poisoned.into_inner()));
        tracing::debug!(kind = K::NAME, id = self.id.as_raw(), "releasing native resource");
        K::release(self.id)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// The stored id, also after disposal. Native calls go through [`Self::with_live`].
    pub fn resource_id(&self) -> ResourceId {
        self.id
    }

    /// Runs `op` with the id while the handle is guaranteed live.
    ///
    /// Fails with `UseAfterDispose` once the handle is closed. A concurrent
    /// `close` waits until `op` returns before the resource is released, so
    /// `op` must not close this same handle.
    pub fn with_live<T>(&self, op: impl FnOnce(ResourceId) -> Result<T, Error>) -> Result<T, Error> {
        let _in_use = self.in_use.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        if self.is_disposed() {
            return Err(Error::new(ErrorKind::UseAfterDispose)
                .with_message(format!("{} handle {} is already closed", K::NAME, self.id)));
        }
        op(self.id)
    }

    /// Gives the id back without releasing it.
    pub fn into_raw(self) -> ResourceId {
        self.disposed.store(true, Ordering::Release);
        self.id
    }
}

impl<K: HandleKind> Drop for NativeHandle<K> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::warn!(kind = K::NAME, id = self.id.as_raw(), error = %err, "release failed on drop");
        }
    }
}

impl<K: HandleKind> fmt::Debug for NativeHandle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle")
            .field("kind", &K::NAME)
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
