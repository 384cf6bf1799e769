// Shared test doubles. Compiled only for tests.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::auth::LoginIdentity;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::{HttpRequest, HttpResponse, Method, Transport};
use crate::core::pages::{PageControl, ProgressSink};
use crate::core::process::{ToolCommand, ToolOutput, ToolRunner};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Fresh scratch directory under the system temp dir.
pub fn temp_dir(label: &str) -> PathBuf {
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!(
        "ironlaunch-{label}-{}-{n}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

/// Write a zip archive holding the given `(name, contents)` entries.
pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    use std::io::Write;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    for (name, contents) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
        } else {
            zip.start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(contents).unwrap();
        }
    }
    zip.finish().unwrap();
}

// ── Transport ───────────────────────────────────────────

enum Reply {
    Response(HttpResponse),
    NetworkFailure,
}

/// Scripted transport. Unscripted URLs answer 404; every request is recorded.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    sticky: Mutex<HashMap<(Method, String), HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `method url` with `status` and `body`.
    pub fn reply(self, method: Method, url: &str, status: u16, body: impl AsRef<[u8]>) -> Self {
        self.sticky.lock().unwrap().insert(
            (method, url.to_string()),
            HttpResponse {
                status,
                date: None,
                body: body.as_ref().to_vec(),
            },
        );
        self
    }

    /// Answer the next `method url` once with `status` and `body`.
    pub fn reply_once(
        self,
        method: Method,
        url: &str,
        status: u16,
        body: impl AsRef<[u8]>,
    ) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry((method, url.to_string()))
            .or_default()
            .push_back(Reply::Response(HttpResponse {
                status,
                date: None,
                body: body.as_ref().to_vec(),
            }));
        self
    }

    pub fn fail_once(self, method: Method, url: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry((method, url.to_string()))
            .or_default()
            .push_back(Reply::NetworkFailure);
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count_for(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> LauncherResult<HttpResponse> {
        let key = (request.method, request.url.clone());
        self.requests.lock().unwrap().push(request);

        if let Some(reply) = self
            .routes
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(|queue| queue.pop_front())
        {
            return match reply {
                Reply::Response(response) => Ok(response),
                Reply::NetworkFailure => Err(LauncherError::Network("connection refused".into())),
            };
        }
        if let Some(response) = self.sticky.lock().unwrap().get(&key) {
            return Ok(response.clone());
        }
        Ok(HttpResponse {
            status: 404,
            date: None,
            body: Vec::new(),
        })
    }
}

// ── Pages ───────────────────────────────────────────────

/// Records every page transition as a short string.
#[derive(Default)]
pub struct RecordingPages {
    pub events: Mutex<Vec<String>>,
    pub cancel_immediately: bool,
}

impl RecordingPages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

struct RecordingProgress {
    completed: usize,
}

impl ProgressSink for RecordingProgress {
    fn set_current(&mut self, _name: &str) {}

    fn set_completed(&mut self, completed: usize) {
        self.completed = completed;
    }

    fn completed(&self) -> usize {
        self.completed
    }
}

#[async_trait]
impl PageControl for RecordingPages {
    fn show_wait(&self, title: &str) {
        self.push(format!("wait:{title}"));
    }

    fn show_wait_cancelable(&self, title: &str) -> CancellationToken {
        self.push(format!("wait-cancelable:{title}"));
        let token = CancellationToken::new();
        if self.cancel_immediately {
            token.cancel();
        }
        token
    }

    fn show_login(&self) {
        self.push("login".into());
    }

    fn show_logged_in(&self, identity: &LoginIdentity, offline: bool) {
        let mode = if offline { "offline" } else { "online" };
        self.push(format!("logged-in:{}:{mode}", identity.player_name));
    }

    async fn show_error(&self, title: &str, message: &str) {
        self.push(format!("error:{title}:{message}"));
    }

    fn show_download_progress(&self, title: &str, total: usize) -> Box<dyn ProgressSink> {
        self.push(format!("progress:{title}:{total}"));
        Box::new(RecordingProgress { completed: 0 })
    }
}

// ── External tools ──────────────────────────────────────

/// Answers every command with a fixed output and records the invocations,
/// detached spawns included.
pub struct ScriptedTools {
    pub output: ToolOutput,
    pub calls: Mutex<Vec<ToolCommand>>,
}

impl ScriptedTools {
    pub fn new(code: i32, stdout: &str) -> Self {
        Self {
            output: ToolOutput {
                code: Some(code),
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ToolCommand> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolRunner for ScriptedTools {
    async fn run(&self, command: &ToolCommand) -> LauncherResult<ToolOutput> {
        self.calls.lock().unwrap().push(command.clone());
        Ok(self.output.clone())
    }

    async fn spawn_detached(&self, command: &ToolCommand) -> LauncherResult<u32> {
        self.calls.lock().unwrap().push(command.clone());
        Ok(4242)
    }
}
