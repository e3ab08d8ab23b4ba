//! Host backed by the native `libvoidstar` coverage library.

use crate::config::RuntimeConfig;
use crate::host::CoverageHost;
use edge_set::Edge;
use std::ffi::CString;

#[link(name = "voidstar")]
extern "C" {
    fn init_coverage_module(edge_count: usize, symbol_file_name: *const libc::c_char) -> usize;
    fn notify_coverage(edge_plus_module: usize) -> bool;
    fn fuzz_getchar() -> libc::c_int;
    fn fuzz_get_random() -> u64;
    fn fuzz_info_message(message: *const libc::c_char);
    fn fuzz_error_message(message: *const libc::c_char);
    fn fuzz_exit(exit_code: libc::c_int) -> !;
}

/// Interior NULs would truncate the message on the C side; drop them.
fn to_cstring(s: &str) -> CString {
    CString::new(s.replace('\0', "")).unwrap_or_default()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct VoidstarHost;

impl VoidstarHost {
    /// The native library owns its own harness channel, so nothing is read
    /// from the configuration.
    pub fn from_config(_config: &RuntimeConfig) -> Self {
        Self
    }
}

impl CoverageHost for VoidstarHost {
    fn init_coverage_module(&self, edge_count: usize, symbol_table: &str) -> u64 {
        let symbol_table = to_cstring(symbol_table);
        unsafe { init_coverage_module(edge_count, symbol_table.as_ptr()) as u64 }
    }

    fn notify_coverage(&self, edge_plus_module: Edge) -> bool {
        unsafe { notify_coverage(edge_plus_module as usize) }
    }

    fn getchar(&self) -> u8 {
        unsafe { fuzz_getchar() as u8 }
    }

    fn get_random(&self) -> u64 {
        unsafe { fuzz_get_random() }
    }

    fn info_message(&self, message: &str) {
        let message = to_cstring(message);
        unsafe { fuzz_info_message(message.as_ptr()) }
    }

    fn error_message(&self, message: &str) {
        let message = to_cstring(message);
        unsafe { fuzz_error_message(message.as_ptr()) }
    }

    fn exit(&self, exit_code: i32) -> ! {
        unsafe { fuzz_exit(exit_code) }
    }
}
