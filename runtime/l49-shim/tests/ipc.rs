//! End-to-end IPC tests against the mock kernel
//!
//! Client and server run on separate OS threads, each with its own UTCB,
//! and talk through mock IPC gates.

use std::thread;

use l49_shim::sys::{IpcErrorCode, MSG_MAX_BYTES, WORD_BYTES};
use l49_shim::{CapHandle, Delivery, IpcOp, NextMessage, Shim, ShimError, Source};
use l4_mock::{MockKernel, MockThread};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Spawn a server thread bound to `gate` that runs `serve` once
fn spawn_server<R, F>(kernel: &MockKernel, gate: usize, serve: F) -> thread::JoinHandle<R>
where
    R: Send + 'static,
    F: FnOnce(Shim<MockThread>) -> R + Send + 'static,
{
    let server = kernel.thread();
    server.bind(gate).expect("bind gate");
    thread::spawn(move || serve(Shim::new(server)))
}

fn padded(len: usize) -> usize {
    len.div_ceil(WORD_BYTES) * WORD_BYTES
}

#[test]
fn test_ping_pong_call() {
    init_logging();
    let kernel = MockKernel::new();
    let gate = kernel.create_gate("p9cons", 0x10);

    let server = spawn_server(&kernel, gate, |shim| {
        let mut req = [0u8; 64];
        let got = shim.recv(Source::Any, &mut req).expect("receive request");
        assert_eq!(&req[..4], b"ping");
        assert_eq!(got.label, 0x10);
        shim.reply(b"pong").expect("reply")
    });

    let client = Shim::new(kernel.thread());
    let cons = client.get_cap("p9cons").expect("p9cons published");
    let mut reply = [0xffu8; 16];
    let got = client.call(cons, b"ping", &mut reply).expect("call");

    assert_eq!(got.len, padded(4));
    assert!(!got.is_truncated());
    assert_eq!(&reply[..4], b"pong");
    assert!(reply[4..got.len].iter().all(|&b| b == 0));
    // Bytes beyond the reported length are untouched
    assert!(reply[got.len..].iter().all(|&b| b == 0xff));

    let outcome = server.join().unwrap();
    assert_eq!(outcome.delivery, Delivery::Delivered);
    assert_eq!(outcome.next, NextMessage::Empty);
}

#[test]
fn test_call_at_exact_capacity() {
    init_logging();
    let kernel = MockKernel::new();
    let gate = kernel.create_gate("big", 1);

    let server = spawn_server(&kernel, gate, |shim| {
        let mut req = vec![0u8; MSG_MAX_BYTES];
        let got = shim.recv(Source::Any, &mut req).unwrap();
        assert_eq!(got.len, MSG_MAX_BYTES);
        assert!(req.iter().all(|&b| b == 0xab));
        shim.reply(&req[..8]).unwrap()
    });

    let client = Shim::new(kernel.thread());
    let cap = client.get_cap("big").unwrap();
    let mut reply = [0u8; 8];

    let max_bytes = client.limits().max_bytes;
    assert_eq!(max_bytes, MSG_MAX_BYTES);
    let full = vec![0xabu8; max_bytes];
    let got = client.call(cap, &full, &mut reply).expect("full message fits");
    assert_eq!(got.len, 8);
    assert!(server.join().unwrap().is_delivered());

    // One byte more fails before the kernel is entered
    let before = kernel.ipc_count();
    let over = vec![0xabu8; max_bytes + 1];
    let err = client.call(cap, &over, &mut reply).unwrap_err();
    assert!(matches!(
        err,
        ShimError::Capacity { bytes, max_words, .. }
            if bytes == max_bytes + 1 && max_words == client.limits().max_words
    ));
    assert_eq!(err.status(), -1);
    assert!(matches!(client.send(cap, &over), Err(ShimError::Capacity { .. })));
    assert_eq!(kernel.ipc_count(), before);
}

#[test]
fn test_receive_truncates_silently() {
    init_logging();
    let kernel = MockKernel::new();
    let gate = kernel.create_gate("sink", 2);
    let cap = CapHandle::new(gate).unwrap();

    let server = spawn_server(&kernel, gate, move |shim| {
        let mut small = [0u8; 5];
        let got = shim.recv(cap, &mut small).unwrap();
        (got, small)
    });

    let client = Shim::new(kernel.thread());
    client.send(cap, b"0123456789abcdef").expect("send");

    let (got, small) = server.join().unwrap();
    assert_eq!(got.len, 5);
    assert_eq!(got.declared, 16);
    assert!(got.is_truncated());
    assert_eq!(&small, b"01234");
}

#[test]
fn test_open_wait_accepts_any_gate() {
    init_logging();
    let kernel = MockKernel::new();
    let first = kernel.create_gate("first", 0xa);
    let second = kernel.create_gate("second", 0xb);

    let server = kernel.thread();
    server.bind(first).unwrap();
    server.bind(second).unwrap();
    let server = thread::spawn(move || {
        let shim = Shim::new(server);
        let mut buf = [0u8; 8];
        let got = shim.recv(None::<CapHandle>, &mut buf).unwrap();
        (got.label, buf)
    });

    // Nothing was ever sent to "first"; the message arrives through "second"
    let client = Shim::new(kernel.thread());
    client.send(client.get_cap("second").unwrap(), b"hi").unwrap();

    let (label, buf) = server.join().unwrap();
    assert_eq!(label, 0xb);
    assert_eq!(&buf[..2], b"hi");
}

#[test]
fn test_send_to_dead_gate_fails() {
    init_logging();
    let kernel = MockKernel::new();
    let client = Shim::new(kernel.thread());

    // A syntactically valid handle that names nothing
    let ghost = CapHandle::new(0x123 << 12).unwrap();
    let err = client.send(ghost, b"anyone?").unwrap_err();
    assert_eq!(err, ShimError::Ipc { op: IpcOp::Send, code: IpcErrorCode::NotExistent });

    let mut reply = [0u8; 4];
    let err = client.call(ghost, b"anyone?", &mut reply).unwrap_err();
    assert_eq!(err, ShimError::Ipc { op: IpcOp::Call, code: IpcErrorCode::NotExistent });
}

#[test]
fn test_reply_without_caller_reports_both_phases() {
    init_logging();
    let kernel = MockKernel::new();
    let server = Shim::new(kernel.thread());

    let outcome = server.reply(b"nobody asked").expect("pack succeeded");
    assert_eq!(outcome.delivery, Delivery::Failed(IpcErrorCode::NotExistent));
    assert_eq!(outcome.next, NextMessage::NotAttempted);
    assert!(!outcome.is_delivered());

    // The failed reply leaves no partner behind on the thread
    let thread = server.into_inner();
    assert!(!thread.has_partner());
}

#[test]
fn test_server_loop_serves_several_clients() {
    init_logging();
    let kernel = MockKernel::new();
    let gate = kernel.create_gate("echo", 7);

    // A message picked up by the reply's wait tail is consumed, so the loop
    // has to serve it before going back to an open wait.
    let server = spawn_server(&kernel, gate, |shim| {
        let mut buf = [0u8; 32];
        let mut got = shim.recv(Source::Any, &mut buf).unwrap();
        for served in 1..=3 {
            let echo = buf[..got.len].to_vec();
            let outcome = shim.reply_and_wait(&echo, &mut buf).unwrap();
            assert!(outcome.is_delivered());
            got = match outcome.next {
                NextMessage::Arrived(next) => next,
                NextMessage::Empty if served < 3 => shim.recv(Source::Any, &mut buf).unwrap(),
                NextMessage::Empty => break,
                other => panic!("unexpected wait outcome {:?}", other),
            };
        }
    });

    let clients: Vec<_> = (0u8..3)
        .map(|i| {
            let shim = Shim::new(kernel.thread());
            thread::spawn(move || {
                let cap = shim.get_cap("echo").unwrap();
                let mut reply = [0u8; 32];
                let got = shim.call(cap, &[i; 3], &mut reply).unwrap();
                (i, got.len, reply)
            })
        })
        .collect();

    for client in clients {
        let (i, len, reply) = client.join().unwrap();
        assert_eq!(len, padded(3));
        assert_eq!(&reply[..3], &[i; 3]);
    }
    server.join().unwrap();
}

#[test]
fn test_resolver() {
    let kernel = MockKernel::new();
    let gate = kernel.create_gate("svc", 0);
    kernel.register("broken", l49_shim::sys::INVALID_CAP);
    kernel.register("null", 0);

    let shim = Shim::new(kernel.thread());
    assert_eq!(shim.get_cap("svc").map(CapHandle::raw), Some(gate));
    assert_eq!(shim.get_cap("missing"), None);
    assert_eq!(shim.get_cap("broken"), None);
    assert_eq!(shim.get_cap("null"), None);
    assert_eq!(shim.get_cap(""), None);
}
