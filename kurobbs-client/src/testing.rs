//! Local HTTP servers for exercising the client against canned responses.

use axum::Router;
use log::{Level, LevelFilter, Log, Metadata, Record};

use std::{
    cell::RefCell,
    net::{SocketAddr, TcpListener},
    sync::Once,
};

/// Serves `router` on an ephemeral port and returns its base url.
pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = axum::Server::from_tcp(listener)
        .unwrap()
        .serve(router.into_make_service());
    tokio::spawn(server);
    base_url(addr)
}

/// A base url nothing listens on.
pub fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    base_url(addr)
}

fn base_url(addr: SocketAddr) -> String {
    format!("http://{}", addr)
}

thread_local! {
    static CAPTURED: RefCell<Vec<(Level, String)>> = RefCell::new(Vec::new());
}

struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        CAPTURED.with(|c| {
            c.borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;
static INSTALL: Once = Once::new();

/// Starts recording log records emitted on the current thread.
/// `#[tokio::test]` runs on the test's own thread, so records stay per test.
pub fn capture_logs() {
    INSTALL.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });
    CAPTURED.with(|c| c.borrow_mut().clear());
}

pub fn captured(level: Level) -> Vec<String> {
    CAPTURED.with(|c| {
        c.borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    })
}
