use crate::{
    config::RuntimeConfig,
    logging,
    notifier::EdgeNotifier,
    util::{abort, cstr_to_string},
};

#[cfg(not(feature = "voidstar"))]
pub type Host = crate::host::LocalHost;
#[cfg(feature = "voidstar")]
pub type Host = crate::voidstar::VoidstarHost;

lazy_static::lazy_static! {
    // Configuration is read once, the first time any entry point runs.
    pub static ref EDGE_RUNTIME: EdgeNotifier<Host> = build_runtime();
}

fn build_runtime() -> EdgeNotifier<Host> {
    let config = match RuntimeConfig::from_env() {
        Ok(config) => config,
        Err(err) => abort(&format!("invalid runtime configuration: {:#}", err)),
    };
    logging::init(&config);
    EdgeNotifier::new(Host::from_config(&config), config.verbose)
}

// ======== Public API ========

/// Initializes the instrumented module; aborts if called twice.
#[no_mangle]
pub extern "C" fn __edge_init_module(symbol_table: *const libc::c_char, edge_count: usize) -> u64 {
    let symbol_table = cstr_to_string(symbol_table);
    EDGE_RUNTIME
        .try_initialize_module(&symbol_table, edge_count)
        .unwrap_or_else(|misuse| abort(&misuse.to_string()))
}

/// Called on every edge; returns whether the edge fired for the first time.
/// Aborts if the module was never initialized.
#[no_mangle]
pub extern "C" fn __edge_notify(edge: usize) -> bool {
    EDGE_RUNTIME
        .try_notify(edge as u64)
        .unwrap_or_else(|misuse| abort(&misuse.to_string()))
}

#[cfg(not(feature = "voidstar"))]
#[no_mangle]
pub extern "C" fn __edge_count() -> u64 {
    EDGE_RUNTIME.host().edge_count()
}

/// Membership query for diagnostics; never records the edge.
#[cfg(not(feature = "voidstar"))]
#[no_mangle]
pub extern "C" fn __edge_seen(edge: usize) -> bool {
    match EDGE_RUNTIME.module_offset() {
        Some(offset) => EDGE_RUNTIME
            .host()
            .has_seen((edge as u64).wrapping_add(offset)),
        None => false,
    }
}

// ======== Harness pass-through ========

#[no_mangle]
pub extern "C" fn __fuzz_getchar() -> u8 {
    EDGE_RUNTIME.getchar()
}

#[no_mangle]
pub extern "C" fn __fuzz_get_random() -> u64 {
    EDGE_RUNTIME.get_random()
}

#[no_mangle]
pub extern "C" fn __fuzz_info_message(message: *const libc::c_char) {
    if message.is_null() {
        return;
    }
    EDGE_RUNTIME.info_message(&cstr_to_string(message));
}

#[no_mangle]
pub extern "C" fn __fuzz_error_message(message: *const libc::c_char) {
    if message.is_null() {
        return;
    }
    EDGE_RUNTIME.error_message(&cstr_to_string(message));
}

#[no_mangle]
pub extern "C" fn __fuzz_exit(exit_code: libc::c_int) -> ! {
    EDGE_RUNTIME.exit(exit_code)
}
