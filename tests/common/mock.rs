//! In-process stand-in for the server under test
//!
//! A canned-response TCP listener plus a fake reload executable, so the
//! controller, clients and case engine can be exercised end to end without a
//! real server.

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

use ukaguzi::{ServerHandle, Settings};

/// How each accepted connection is answered.
pub enum MockBehavior {
    /// Write the same canned bytes to every connection, then close.
    Respond(String),
    /// Derive the response from the connection index and request text.
    RespondWith(Box<dyn Fn(usize, &str) -> String + Send + Sync>),
    /// Write bytes but keep the connection open afterwards.
    WriteThenHold(String),
    /// Accept and read, never answer, never close.
    Silent,
}

/// Minimal HTTP/1.1 response text with a correct content length.
pub fn http_response(status_line: &str, headers: &[(&str, &str)], body: &str) -> String {
    let mut response = format!("HTTP/1.1 {}\r\n", status_line);
    for (name, value) in headers {
        response += &format!("{}: {}\r\n", name, value);
    }
    response += &format!("Content-Length: {}\r\nConnection: close\r\n\r\n{}", body.len(), body);
    response
}

/// Response the readiness probe accepts for the given case identifier.
pub fn sentinel_response(case_id: &str) -> String {
    http_response("200 OK", &[("test-class", case_id)], "")
}

/// Canned-response server recording everything it receives.
pub struct MockSut {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<String>>>,
    accept_task: JoinHandle<()>,
}

impl MockSut {
    pub async fn start(response: &str) -> Self {
        Self::start_with(MockBehavior::Respond(response.to_string())).await
    }

    pub async fn start_with(behavior: MockBehavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock listener");
        let addr = listener.local_addr().expect("mock listener addr");

        let received = Arc::new(Mutex::new(Vec::new()));
        let behavior = Arc::new(behavior);
        let connections = Arc::new(AtomicUsize::new(0));

        let task_received = Arc::clone(&received);
        let accept_task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let behavior = Arc::clone(&behavior);
                let received = Arc::clone(&task_received);
                let index = connections.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve_connection(stream, behavior, received, index));
            }
        });

        MockSut {
            addr,
            received,
            accept_task,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Every non-empty request received so far, in arrival order.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().expect("mock request log").clone()
    }

    pub fn request_count(&self) -> usize {
        self.received().len()
    }
}

impl Drop for MockSut {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    behavior: Arc<MockBehavior>,
    received: Arc<Mutex<Vec<String>>>,
    index: usize,
) {
    let request = read_request(&mut stream).await;
    if !request.is_empty() {
        received.lock().expect("mock request log").push(request.clone());
    }

    match &*behavior {
        MockBehavior::Respond(text) => {
            let _ = stream.write_all(text.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
        MockBehavior::RespondWith(responder) => {
            let text = responder(index, &request);
            let _ = stream.write_all(text.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
        MockBehavior::WriteThenHold(text) => {
            let _ = stream.write_all(text.as_bytes()).await;
            sleep(Duration::from_secs(30)).await;
        }
        MockBehavior::Silent => {
            sleep(Duration::from_secs(30)).await;
        }
    }
}

// Read until the sender goes quiet or closes. A quiet period rather than a
// header-end scan keeps multi-block pipelined payloads intact.
async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        match timeout(Duration::from_millis(100), stream.read(&mut chunk)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => buf.extend_from_slice(&chunk[..n]),
            _ => break,
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

/// A complete fake installation: conventional directory layout, live pid
/// file, fake reload executable, and a mock listener on the probe port.
pub struct FakeSut {
    pub temp: tempfile::TempDir,
    pub mock: MockSut,
    pub settings: Settings,
}

impl FakeSut {
    /// `reload_script` is the body of the fake reload executable, e.g.
    /// `"exit 0"`, `"exit 1"` or `"sleep 5"`.
    pub async fn start(reload_script: &str, behavior: MockBehavior) -> Self {
        let temp = tempfile::TempDir::new().expect("temp work dir");
        let work = temp.path();

        let bin = work.join("target").join("server");
        fs::create_dir_all(bin.parent().expect("target dir")).expect("create target dir");
        fs::write(&bin, format!("#!/bin/sh\n{}\n", reload_script)).expect("write reload script");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&bin, fs::Permissions::from_mode(0o755))
                .expect("mark reload script executable");
        }

        let mock = MockSut::start_with(behavior).await;
        let settings = Settings::new("127.0.0.1", mock.port(), work, &bin);

        fs::create_dir_all(settings.conf_dir()).expect("create conf dir");
        fs::create_dir_all(settings.log_dir()).expect("create log dir");
        fs::create_dir_all(settings.content_dir()).expect("create content dir");
        fs::write(settings.log_dir().join("server.pid"), "12345").expect("write pid file");

        FakeSut {
            temp,
            mock,
            settings,
        }
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle::from_settings(&self.settings)
    }

    pub fn config_path(&self) -> PathBuf {
        self.handle().config_path()
    }

    pub fn remove_pid_file(&self) {
        let _ = fs::remove_file(self.handle().pid_file);
    }
}
