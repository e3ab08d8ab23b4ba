use edge_runtime::host::CoverageHost;
use edge_runtime::notifier::{EdgeNotifier, Misuse};
use edge_set::EdgeSet;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

const MODULE_OFFSET: u64 = 1_000;

#[derive(Default)]
struct RecordingHost {
    edges: EdgeSet,
    registered: Mutex<Vec<(usize, String)>>,
    infos: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl CoverageHost for RecordingHost {
    fn init_coverage_module(&self, edge_count: usize, symbol_table: &str) -> u64 {
        self.registered
            .lock()
            .unwrap()
            .push((edge_count, symbol_table.to_string()));
        MODULE_OFFSET
    }

    fn notify_coverage(&self, edge_plus_module: u64) -> bool {
        self.edges.insert(edge_plus_module)
    }

    fn getchar(&self) -> u8 {
        b'x'
    }

    fn get_random(&self) -> u64 {
        4
    }

    fn info_message(&self, message: &str) {
        self.infos.lock().unwrap().push(message.to_string());
    }

    fn error_message(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    fn exit(&self, exit_code: i32) -> ! {
        panic!("exit({})", exit_code);
    }
}

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture_logs(f: impl FnOnce()) -> String {
    let buf = SharedBuf::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = buf.0.lock().unwrap().clone();
    String::from_utf8(bytes).unwrap()
}

fn initialized(verbose: bool) -> EdgeNotifier<RecordingHost> {
    let notifier = EdgeNotifier::new(RecordingHost::default(), verbose);
    assert_eq!(notifier.initialize_module("module.sym", 64), MODULE_OFFSET);
    notifier
}

#[test]
fn test_initialize_module() {
    let notifier = EdgeNotifier::new(RecordingHost::default(), false);
    assert!(!notifier.is_initialized());
    assert_eq!(notifier.module_offset(), None);

    assert_eq!(notifier.initialize_module("module.sym", 64), MODULE_OFFSET);
    assert!(notifier.is_initialized());
    assert_eq!(notifier.module_offset(), Some(MODULE_OFFSET));

    let host = notifier.host();
    assert_eq!(
        *host.registered.lock().unwrap(),
        vec![(64, "module.sym".to_string())]
    );
    let infos = host.infos.lock().unwrap();
    assert_eq!(infos.len(), 1);
    assert!(infos[0].ends_with("called initialize_module(module.sym, 64)"));
}

#[test]
#[should_panic(expected = "initialize_module() has already been called")]
fn test_double_initialization_is_fatal() {
    let notifier = initialized(false);
    notifier.initialize_module("other.sym", 8);
}

#[test]
#[should_panic(expected = "notify() called before the module was initialized")]
fn test_notify_before_initialization_is_fatal() {
    let notifier = EdgeNotifier::new(RecordingHost::default(), false);
    notifier.notify(1);
}

#[test]
fn test_notify_adds_module_offset() {
    let notifier = initialized(false);
    assert!(notifier.notify(5));
    assert!(!notifier.notify(5));
    assert!(notifier.notify(6));

    let edges = &notifier.host().edges;
    assert!(edges.contains(MODULE_OFFSET + 5));
    assert!(edges.contains(MODULE_OFFSET + 6));
    assert!(!edges.contains(5));
    assert_eq!(edges.len(), 2);
}

#[test]
fn test_notify_offset_wraps() {
    let notifier = initialized(false);
    assert!(notifier.notify(u64::MAX));
    assert!(notifier.host().edges.contains(MODULE_OFFSET - 1));
}

#[test]
fn test_concurrent_notify_reports_each_edge_once() {
    const EDGES: u64 = 2_000;
    const THREADS: usize = 16;
    let notifier = initialized(false);
    let first_seen = AtomicUsize::new(0);

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for edge in 0..EDGES {
                    if notifier.notify(edge) {
                        first_seen.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
        }
    });

    assert_eq!(first_seen.load(Ordering::Relaxed) as u64, EDGES);
    assert_eq!(notifier.host().edges.len(), EDGES);
}

#[test]
fn test_verbose_logs_first_observation() {
    let notifier = initialized(true);
    assert!(notifier.is_verbose());
    let logs = capture_logs(|| {
        notifier.notify(5);
        notifier.notify(5);
    });
    assert_eq!(logs.matches("new edge").count(), 1);
    assert!(logs.contains("edge=5"));
    assert!(logs.contains(&format!("offset={}", MODULE_OFFSET)));
}

#[test]
fn test_quiet_notifier_does_not_log_edges() {
    let notifier = initialized(false);
    let logs = capture_logs(|| {
        notifier.notify(5);
    });
    assert!(!logs.contains("new edge"));
}

#[test]
fn test_harness_pass_through() {
    let notifier = EdgeNotifier::new(RecordingHost::default(), false);
    assert_eq!(notifier.getchar(), b'x');
    assert_eq!(notifier.get_random(), 4);
    notifier.info_message("hello");
    notifier.error_message("oops");
    assert_eq!(*notifier.host().infos.lock().unwrap(), vec!["hello"]);
    assert_eq!(*notifier.host().errors.lock().unwrap(), vec!["oops"]);
}

#[test]
#[should_panic(expected = "exit(3)")]
fn test_exit_pass_through() {
    let notifier = EdgeNotifier::new(RecordingHost::default(), false);
    notifier.exit(3);
}

#[test]
fn test_misuse_is_reported_without_panicking() {
    let notifier = EdgeNotifier::new(RecordingHost::default(), false);
    assert_eq!(notifier.try_notify(1), Err(Misuse::NotInitialized));
    assert_eq!(notifier.try_initialize_module("module.sym", 64), Ok(MODULE_OFFSET));
    assert_eq!(
        notifier.try_initialize_module("module.sym", 64),
        Err(Misuse::AlreadyInitialized)
    );
    assert_eq!(notifier.try_notify(1), Ok(true));
    assert_eq!(notifier.try_notify(1), Ok(false));
    assert_eq!(
        Misuse::NotInitialized.to_string(),
        "notify() called before the module was initialized"
    );
}
