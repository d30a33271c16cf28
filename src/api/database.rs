//! Purpose: Database handle variant over the native `partition_link_db_*` exports.
//! Exports: `Database`, `DatabaseHandle`.
//! Role: The concrete handle kind exposed by the bindings (create, set string, dispose).
//! Invariants: Every native call runs inside `with_live`; closed handles fail with `UseAfterDispose`.
//! Invariants: Symbol names live only in this module.
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};

use crate::core::error::{Error, ErrorKind};
use crate::core::handle::{HandleKind, NativeHandle, ResourceId};
use crate::core::resolver::ensure_loaded;

const SYM_DB_NEW: &str = "partition_link_db_new";
const SYM_DB_FREE: &str = "partition_link_db_free";
const SYM_DB_SET_STR: &str = "partition_link_db_set_str";

type DbNewFn = unsafe extern "C" fn() -> i64;
type DbFreeFn = unsafe extern "C" fn(i64);
type DbSetStrFn = unsafe extern "C" fn(i64, *const c_char, *const c_char) -> c_int;

pub struct Database;

pub type DatabaseHandle = NativeHandle<Database>;

impl HandleKind for Database {
    const NAME: &'static str = "database";

    fn release(id: ResourceId) -> Result<(), Error> {
        let library = ensure_loaded()?;
        // SAFETY: signature matches the exported `partition_link_db_free(int64_t)`.
        let free: DbFreeFn = unsafe { library.symbol(SYM_DB_FREE) }?;
        // SAFETY: `id` came from `partition_link_db_new` and the CAS in `close` runs this once.
        unsafe { free(id.as_raw()) };
        Ok(())
    }
}

impl NativeHandle<Database> {
    /// Creates a native database and takes ownership of it.
    pub fn open() -> Result<Self, Error> {
        let library = ensure_loaded()?;
        // SAFETY: signature matches the exported `int64_t partition_link_db_new(void)`.
        let new_db: DbNewFn = unsafe { library.symbol(SYM_DB_NEW) }?;
        // SAFETY: no arguments; the native side allocates and returns an owned id.
        let raw = unsafe { new_db() };
        if raw == 0 {
            return Err(Error::new(ErrorKind::Native)
                .with_message(format!("{SYM_DB_NEW} returned a null database")));
        }
        // SAFETY: `raw` is a fresh, unowned id from `partition_link_db_new`.
        unsafe { Self::from_raw(ResourceId::from_raw(raw)) }
    }

    pub fn set_str(&self, key: &str, value: &str) -> Result<(), Error> {
        set_str_with(self, key, value, |id, key, value| {
            let library = ensure_loaded()?;
            // SAFETY: signature matches `int partition_link_db_set_str(int64_t, const char*, const char*)`.
            let set_str: DbSetStrFn = unsafe { library.symbol(SYM_DB_SET_STR) }?;
            // SAFETY: `with_live` keeps `id` unreleased for the call; both strings outlive it.
            Ok(unsafe { set_str(id.as_raw(), key.as_ptr(), value.as_ptr()) })
        })
    }
}

fn set_str_with<K: HandleKind>(
    handle: &NativeHandle<K>,
    key: &str,
    value: &str,
    call: impl FnOnce(ResourceId, &CStr, &CStr) -> Result<c_int, Error>,
) -> Result<(), Error> {
    let (key, value) = encode_pair(key, value)?;
    let status = handle.with_live(|id| call(id, &key, &value))?;
    if status != 0 {
        return Err(Error::new(ErrorKind::Native)
            .with_message(format!("{SYM_DB_SET_STR} failed with status {status}")));
    }
    Ok(())
}

fn encode_pair(key: &str, value: &str) -> Result<(CString, CString), Error> {
    let key = CString::new(key).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("key contains NUL")
            .with_source(err)
    })?;
    let value = CString::new(value).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("value contains NUL")
            .with_source(err)
    })?;
    Ok((key, value))
}
