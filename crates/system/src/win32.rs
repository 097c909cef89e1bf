//! Windows implementations of the two counter backends.
//!
//! Raw FFI against `pdh.dll` and `advapi32.dll`; everything above this module
//! only sees [`QueryBackend`] and [`PerfDataRegistry`].

use crate::query::{QueryBackend, QuerySession};
use crate::registry::{FetchStatus, PerfDataRegistry};
use std::ptr;

#[allow(non_camel_case_types, non_snake_case)]
mod ffi {
    pub type PDH_STATUS = u32;
    pub type PDH_HQUERY = isize;
    pub type PDH_HCOUNTER = isize;
    pub type HKEY = isize;
    pub type LSTATUS = i32;

    pub const ERROR_SUCCESS: LSTATUS = 0;
    pub const ERROR_MORE_DATA: LSTATUS = 234;
    /// `((HKEY)(ULONG_PTR)((LONG)0x80000004))`
    pub const HKEY_PERFORMANCE_DATA: HKEY = 0x8000_0004_u32 as i32 as isize;

    pub const PDH_CSTATUS_NEW_DATA: u32 = 0x0000_0001;
    pub const PDH_INVALID_HANDLE: PDH_STATUS = 0xC000_0BBC;
    pub const PDH_INVALID_DATA: PDH_STATUS = 0xC000_0BC6;

    #[repr(C)]
    pub struct FILETIME {
        pub dwLowDateTime: u32,
        pub dwHighDateTime: u32,
    }

    #[repr(C)]
    pub struct PDH_RAW_COUNTER {
        pub CStatus: u32,
        pub TimeStamp: FILETIME,
        pub FirstValue: i64,
        pub SecondValue: i64,
        pub MultiCount: u32,
    }

    #[link(name = "pdh")]
    extern "system" {
        pub fn PdhOpenQueryW(szDataSource: *const u16, dwUserData: usize, phQuery: *mut PDH_HQUERY) -> PDH_STATUS;
        pub fn PdhAddEnglishCounterW(
            hQuery: PDH_HQUERY,
            szFullCounterPath: *const u16,
            dwUserData: usize,
            phCounter: *mut PDH_HCOUNTER,
        ) -> PDH_STATUS;
        pub fn PdhCollectQueryData(hQuery: PDH_HQUERY) -> PDH_STATUS;
        pub fn PdhGetRawCounterValue(
            hCounter: PDH_HCOUNTER,
            lpdwType: *mut u32,
            pValue: *mut PDH_RAW_COUNTER,
        ) -> PDH_STATUS;
        pub fn PdhCloseQuery(hQuery: PDH_HQUERY) -> PDH_STATUS;
    }

    #[link(name = "advapi32")]
    extern "system" {
        pub fn RegQueryValueExW(
            hKey: HKEY,
            lpValueName: *const u16,
            lpReserved: *mut u32,
            lpType: *mut u32,
            lpData: *mut u8,
            lpcbData: *mut u32,
        ) -> LSTATUS;
        pub fn RegCloseKey(hKey: HKEY) -> LSTATUS;
    }
}

/// NUL-terminated UTF-16 copy of `s`.
fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

// ── PDH ───────────────────────────────────────────────────────────────────────

/// Local-machine PDH queries.
#[derive(Debug, Default)]
pub struct PdhBackend;

/// An open PDH query handle, closed on drop.
pub struct PdhSession {
    query: ffi::PDH_HQUERY,
    counter: Option<ffi::PDH_HCOUNTER>,
}

impl QueryBackend for PdhBackend {
    type Session = PdhSession;

    fn open(&mut self) -> Result<PdhSession, u32> {
        let mut query: ffi::PDH_HQUERY = 0;
        // SAFETY: a null data source selects real-time data; `query` is a
        // valid out pointer.
        let status = unsafe { ffi::PdhOpenQueryW(ptr::null(), 0, &mut query) };
        if status != 0 {
            return Err(status);
        }
        Ok(PdhSession { query, counter: None })
    }
}

impl QuerySession for PdhSession {
    fn add_counter(&mut self, path: &str) -> Result<(), u32> {
        let path = wide(path);
        let mut counter: ffi::PDH_HCOUNTER = 0;
        // SAFETY: `path` is NUL-terminated and outlives the call.
        let status = unsafe { ffi::PdhAddEnglishCounterW(self.query, path.as_ptr(), 0, &mut counter) };
        if status != 0 {
            return Err(status);
        }
        self.counter = Some(counter);
        Ok(())
    }

    fn collect(&mut self) -> Result<(), u32> {
        // SAFETY: `self.query` is open until drop.
        match unsafe { ffi::PdhCollectQueryData(self.query) } {
            0 => Ok(()),
            status => Err(status),
        }
    }

    fn raw_value(&self) -> Result<u32, u32> {
        let counter = self.counter.ok_or(ffi::PDH_INVALID_HANDLE)?;
        let mut raw = ffi::PDH_RAW_COUNTER {
            CStatus: 0,
            TimeStamp: ffi::FILETIME { dwLowDateTime: 0, dwHighDateTime: 0 },
            FirstValue: 0,
            SecondValue: 0,
            MultiCount: 0,
        };
        // SAFETY: `counter` belongs to the open query; `raw` is a valid out
        // pointer and the type pointer may be null.
        let status = unsafe { ffi::PdhGetRawCounterValue(counter, ptr::null_mut(), &mut raw) };
        if status != 0 {
            return Err(status);
        }
        if raw.CStatus > ffi::PDH_CSTATUS_NEW_DATA {
            return Err(raw.CStatus);
        }
        // PERF_COUNTER_RAWCOUNT: a 32-bit unsigned value.
        u32::try_from(raw.FirstValue).map_err(|_| ffi::PDH_INVALID_DATA)
    }
}

impl Drop for PdhSession {
    fn drop(&mut self) {
        // SAFETY: the handle came from PdhOpenQueryW and is closed once.
        unsafe {
            ffi::PdhCloseQuery(self.query);
        }
    }
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// `HKEY_PERFORMANCE_DATA`. The predefined key is opened implicitly by the
/// first query and released when this value is dropped.
#[derive(Debug)]
pub struct PerformanceDataKey {
    _private: (),
}

impl PerformanceDataKey {
    pub fn open() -> Self {
        Self { _private: () }
    }
}

impl PerfDataRegistry for PerformanceDataKey {
    fn query(&mut self, object: &str, buf: &mut [u8]) -> FetchStatus {
        let name = wide(object);
        let mut len = u32::try_from(buf.len()).unwrap_or(u32::MAX);
        // SAFETY: `name` is NUL-terminated; `buf` is writable for `len` bytes.
        let status = unsafe {
            ffi::RegQueryValueExW(
                ffi::HKEY_PERFORMANCE_DATA,
                name.as_ptr(),
                ptr::null_mut(),
                ptr::null_mut(),
                buf.as_mut_ptr(),
                &mut len,
            )
        };
        match status {
            ffi::ERROR_SUCCESS => FetchStatus::Complete(len as usize),
            ffi::ERROR_MORE_DATA => FetchStatus::MoreData,
            other => FetchStatus::Failed(other as u32),
        }
    }
}

impl Drop for PerformanceDataKey {
    fn drop(&mut self) {
        // SAFETY: closing the predefined key releases the performance-data
        // provider handles; done exactly once per key value.
        unsafe {
            ffi::RegCloseKey(ffi::HKEY_PERFORMANCE_DATA);
        }
    }
}
