//! Diagnostic output tests
//!
//! Kept apart from the IPC tests because this binary installs the console
//! logger as the global `log` backend.

use l49_shim::sys::VCON_WRITE_SIZE;
use l49_shim::{ConsoleLogger, Shim};
use l4_mock::{MockKernel, MockThread};
use log::LevelFilter;

#[test]
fn test_puts_writes_to_log_console() {
    let kernel = MockKernel::new();
    let shim = Shim::new(kernel.thread());

    shim.puts("hello from p9root\n");
    assert_eq!(kernel.console_lines(), vec![b"hello from p9root\n".to_vec()]);
}

#[test]
fn test_puts_clamps_and_skips_empty() {
    let kernel = MockKernel::new();
    let shim = Shim::new(kernel.thread());

    shim.puts("");
    assert!(kernel.console_lines().is_empty());

    let limit = shim.limits().vcon_write_size;
    assert_eq!(limit, VCON_WRITE_SIZE);
    let long = "x".repeat(limit + 100);
    shim.puts(&long);
    let lines = kernel.console_lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].len(), limit);
}

#[test]
fn test_console_logger_routes_records() {
    let kernel = MockKernel::new();
    let logger: &'static ConsoleLogger<MockThread> =
        Box::leak(Box::new(ConsoleLogger::new(kernel.thread(), LevelFilter::Info)));
    logger.install().expect("first logger in this binary");

    log::info!(target: "p9cons", "server up on {}", 3);
    log::debug!("below the level filter");

    // Shim operations log too; a failing resolve stays below Info
    let shim = Shim::new(kernel.thread());
    assert_eq!(shim.get_cap("missing"), None);

    let lines = kernel.console_lines();
    assert_eq!(lines, vec![b"[INFO p9cons] server up on 3\n".to_vec()]);
}
