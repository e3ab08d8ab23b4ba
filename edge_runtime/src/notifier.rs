use crate::host::CoverageHost;
use crate::util::fatal;
use edge_set::Edge;
use std::env;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use thiserror::Error;

const UNINITIALIZED: u8 = 0;
const INITIALIZING: u8 = 1;
const READY: u8 = 2;

/// Usage violation: a programming defect in the instrumented program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Misuse {
    #[error("initialize_module() has already been called")]
    AlreadyInitialized,
    #[error("notify() called before the module was initialized")]
    NotInitialized,
}

/// Translates module-local edges into host notifications.
///
/// A notifier serves exactly one instrumented module: it must be initialized
/// once before any edge is reported, and a second initialization is a fatal
/// usage error.
#[derive(Debug)]
pub struct EdgeNotifier<H> {
    host: H,
    state: AtomicU8,
    offset: AtomicU64,
    verbose: bool,
}

impl<H: CoverageHost> EdgeNotifier<H> {
    pub fn new(host: H, verbose: bool) -> Self {
        Self {
            host,
            state: AtomicU8::new(UNINITIALIZED),
            offset: AtomicU64::new(0),
            verbose,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn is_initialized(&self) -> bool {
        self.state.load(Ordering::Acquire) == READY
    }

    pub fn module_offset(&self) -> Option<u64> {
        self.is_initialized()
            .then(|| self.offset.load(Ordering::Relaxed))
    }

    /// Registers the module with the host and returns its edge offset.
    ///
    /// # Panics
    ///
    /// Panics if the module was already initialized.
    pub fn initialize_module(&self, symbol_table: &str, edge_count: usize) -> u64 {
        self.try_initialize_module(symbol_table, edge_count)
            .unwrap_or_else(|misuse| fatal(&misuse.to_string()))
    }

    /// Like [`initialize_module`](Self::initialize_module), but hands the
    /// violation back so an FFI caller can abort instead of unwinding.
    pub fn try_initialize_module(&self, symbol_table: &str, edge_count: usize) -> Result<u64, Misuse> {
        if self
            .state
            .compare_exchange(UNINITIALIZED, INITIALIZING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Misuse::AlreadyInitialized);
        }

        let executable = env::current_exe()
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        self.host.info_message(&format!(
            "{} called initialize_module({}, {})",
            executable, symbol_table, edge_count
        ));

        let offset = self.host.init_coverage_module(edge_count, symbol_table);
        self.offset.store(offset, Ordering::Relaxed);
        self.state.store(READY, Ordering::Release);
        Ok(offset)
    }

    /// Reports `edge` and returns whether it fired for the first time.
    ///
    /// # Panics
    ///
    /// Panics if the module has not been initialized.
    pub fn notify(&self, edge: Edge) -> bool {
        self.try_notify(edge)
            .unwrap_or_else(|misuse| fatal(&misuse.to_string()))
    }

    pub fn try_notify(&self, edge: Edge) -> Result<bool, Misuse> {
        if self.state.load(Ordering::Acquire) != READY {
            return Err(Misuse::NotInitialized);
        }
        let offset = self.offset.load(Ordering::Relaxed);
        let first = self.host.notify_coverage(edge.wrapping_add(offset));
        if first && self.verbose {
            tracing::info!(edge, offset, "new edge");
        }
        Ok(first)
    }

    pub fn getchar(&self) -> u8 {
        self.host.getchar()
    }

    pub fn get_random(&self) -> u64 {
        self.host.get_random()
    }

    pub fn info_message(&self, message: &str) {
        self.host.info_message(message);
    }

    pub fn error_message(&self, message: &str) {
        self.host.error_message(message);
    }

    pub fn exit(&self, exit_code: i32) -> ! {
        self.host.exit(exit_code)
    }
}
