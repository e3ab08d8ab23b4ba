use crate::config::{RuntimeConfig, STDIN_FD};
use edge_set::{Edge, EdgeSet};
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// What `getchar` yields once the input is exhausted, matching a C `EOF`
/// narrowed to a byte.
pub const EOF_BYTE: u8 = u8::MAX;

/// The coverage subsystem the notifier reports into.
pub trait CoverageHost: Send + Sync {
    /// Registers a module of `edge_count` edges and returns its global offset.
    fn init_coverage_module(&self, edge_count: usize, symbol_table: &str) -> u64;
    /// Returns `true` when `edge_plus_module` is observed for the first time.
    fn notify_coverage(&self, edge_plus_module: Edge) -> bool;
    fn getchar(&self) -> u8;
    fn get_random(&self) -> u64;
    fn info_message(&self, message: &str);
    fn error_message(&self, message: &str);
    fn exit(&self, exit_code: i32) -> !;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub symbol_table: String,
    pub edge_count: usize,
    pub offset: u64,
}

/// In-process host: tracks coverage in an [`EdgeSet`] and logs messages
/// through `tracing`.
#[derive(Debug)]
pub struct LocalHost {
    edges: EdgeSet,
    next_offset: AtomicU64,
    modules: Mutex<Vec<ModuleInfo>>,
    input_fd: i32,
}

impl Default for LocalHost {
    fn default() -> Self {
        Self::new(STDIN_FD)
    }
}

impl LocalHost {
    pub fn new(input_fd: i32) -> Self {
        Self {
            edges: EdgeSet::new(),
            next_offset: AtomicU64::new(0),
            modules: Mutex::new(Vec::new()),
            input_fd,
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(config.input_fd)
    }

    pub fn edges(&self) -> &EdgeSet {
        &self.edges
    }

    /// Distinct edges observed across all modules.
    pub fn edge_count(&self) -> u64 {
        self.edges.len()
    }

    pub fn has_seen(&self, edge_plus_module: Edge) -> bool {
        self.edges.contains(edge_plus_module)
    }

    pub fn modules(&self) -> Vec<ModuleInfo> {
        self.modules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CoverageHost for LocalHost {
    fn init_coverage_module(&self, edge_count: usize, symbol_table: &str) -> u64 {
        let offset = self
            .next_offset
            .fetch_add(edge_count as u64, Ordering::AcqRel);
        self.modules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ModuleInfo {
                symbol_table: symbol_table.to_string(),
                edge_count,
                offset,
            });
        tracing::debug!(symbol_table, edge_count, offset, "registered coverage module");
        offset
    }

    fn notify_coverage(&self, edge_plus_module: Edge) -> bool {
        self.edges.insert(edge_plus_module)
    }

    fn getchar(&self) -> u8 {
        let mut byte = 0u8;
        loop {
            let n = unsafe { libc::read(self.input_fd, &mut byte as *mut u8 as *mut libc::c_void, 1) };
            if n == 1 {
                return byte;
            }
            if n < 0 && io::Error::last_os_error().kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return EOF_BYTE;
        }
    }

    fn get_random(&self) -> u64 {
        rand::random()
    }

    fn info_message(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn error_message(&self, message: &str) {
        tracing::error!("{}", message);
    }

    fn exit(&self, exit_code: i32) -> ! {
        let _ = io::stdout().flush();
        let _ = io::stderr().flush();
        unsafe { libc::exit(exit_code) }
    }
}
