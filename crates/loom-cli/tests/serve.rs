//! End-to-end tests for `loom serve` speaking MCP over stdio.
//! Each test drives a real server process against its own LOOM_DATA_DIR.

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use assert_cmd::Command as CliCommand;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;

const REPLY_TIMEOUT: Duration = Duration::from_secs(10);
const EXIT_TIMEOUT: Duration = Duration::from_secs(5);

/// A running server plus a channel of the JSON lines it writes to stdout.
struct Session {
    child: Child,
    stdin: Option<ChildStdin>,
    replies: Receiver<Value>,
    next_id: u64,
}

impl Session {
    fn start(data_dir: &Path) -> Self {
        let mut child = Command::new(env!("CARGO_BIN_EXE_loom"))
            .arg("serve")
            .env("LOOM_DATA_DIR", data_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();

        let stdout = child.stdout.take().unwrap();
        let (tx, replies) = mpsc::channel();
        std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                if let Ok(message) = serde_json::from_str::<Value>(&line)
                    && tx.send(message).is_err()
                {
                    break;
                }
            }
        });

        let stdin = child.stdin.take();
        let mut session = Session {
            child,
            stdin,
            replies,
            next_id: 1,
        };
        let init = session.request(
            "initialize",
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "loom-tests", "version": "0.0.0" }
            }),
        );
        assert!(init["result"]["serverInfo"].is_object(), "bad init reply: {init}");
        session.send(&json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }));
        session
    }

    fn pid(&self) -> u32 {
        self.child.id()
    }

    fn send(&mut self, message: &Value) {
        let stdin = self.stdin.as_mut().unwrap();
        writeln!(stdin, "{message}").unwrap();
        stdin.flush().unwrap();
    }

    /// Send a request and block until the reply with the same id arrives.
    fn request(&mut self, method: &str, params: Value) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        self.send(&json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }));

        let deadline = Instant::now() + REPLY_TIMEOUT;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let message = self
                .replies
                .recv_timeout(remaining)
                .unwrap_or_else(|e| panic!("no reply to {method} (id {id}): {e}"));
            if message["id"] == json!(id) {
                return message;
            }
        }
    }

    /// Call a tool and decode the JSON text it returns.
    fn call(&mut self, tool: &str, arguments: Value) -> Value {
        let reply = self.request("tools/call", json!({ "name": tool, "arguments": arguments }));
        let text = reply["result"]["content"][0]["text"]
            .as_str()
            .unwrap_or_else(|| panic!("{tool} returned no text: {reply}"));
        serde_json::from_str(text).unwrap()
    }

    /// Close stdin and wait for the process to exit on its own.
    fn close(mut self) -> ExitStatus {
        drop(self.stdin.take());
        wait_with_deadline(&mut self.child)
    }
}

fn wait_with_deadline(child: &mut Child) -> ExitStatus {
    let deadline = Instant::now() + EXIT_TIMEOUT;
    while Instant::now() < deadline {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        std::thread::sleep(Duration::from_millis(25));
    }
    let _ = child.kill();
    panic!("loom serve did not exit within {EXIT_TIMEOUT:?}");
}

fn loom_cli(data_dir: &TempDir) -> CliCommand {
    let mut cmd = CliCommand::new(env!("CARGO_BIN_EXE_loom"));
    cmd.env("LOOM_DATA_DIR", data_dir.path());
    cmd
}

fn add(session: &mut Session, content: &str, tags: &[&str]) -> String {
    let added = session.call("loom_add", json!({ "content": content, "tags": tags }));
    added["id"].as_str().unwrap().to_string()
}

#[test]
fn added_records_survive_restart() {
    let dir = TempDir::new().unwrap();

    let mut first = Session::start(dir.path());
    let id = add(&mut first, "Sourdough starter needs feeding", &["baking"]);
    add(&mut first, "Rye flour ferments faster", &["baking"]);
    assert!(first.close().success());

    loom_cli(&dir)
        .args(["list", "--tag", "baking"])
        .assert()
        .success()
        .stdout(predicate::str::contains(id.as_str()))
        .stdout(predicate::str::contains("Rye flour"));

    let mut second = Session::start(dir.path());
    let stats = second.call("loom_stats", json!({}));
    assert_eq!(stats["records"], 2);
    assert!(second.close().success());
}

#[test]
fn cluster_answers_while_stdin_is_open() {
    let dir = TempDir::new().unwrap();
    let mut session = Session::start(dir.path());
    let rust_a = add(&mut session, "Borrow checker rejects aliasing", &["rust"]);
    let rust_b = add(&mut session, "Lifetimes tie references together", &["rust"]);
    add(&mut session, "Proofing dough overnight", &["baking"]);

    let result = session.call("loom_cluster", json!({ "strategy": "tag" }));
    assert_eq!(result["strategy"], "tag");
    let clusters = result["clusters"].as_array().unwrap();
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0]["name"], "rust");
    let mut members: Vec<&str> = clusters[0]["members"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    members.sort_unstable();
    let mut expected = vec![rust_a.as_str(), rust_b.as_str()];
    expected.sort_unstable();
    assert_eq!(members, expected);

    // The server is still live after answering.
    assert_eq!(session.call("loom_stats", json!({}))["records"], 3);
    assert!(session.close().success());
}

#[test]
fn clean_exit_removes_pidfile_and_truncates_wal() {
    let dir = TempDir::new().unwrap();
    let pidfile = dir.path().join("loom-serve.pid");

    let mut session = Session::start(dir.path());
    assert_eq!(
        std::fs::read_to_string(&pidfile).unwrap().trim(),
        session.pid().to_string()
    );
    add(&mut session, "WAL pages before checkpoint", &["storage"]);
    assert!(session.close().success());

    assert!(!pidfile.exists());
    let wal = dir.path().join("records.db-wal");
    if wal.exists() {
        assert_eq!(std::fs::metadata(&wal).unwrap().len(), 0);
    }
}

#[test]
fn earlier_server_leaves_a_later_servers_pidfile() {
    let dir = TempDir::new().unwrap();
    let pidfile = dir.path().join("loom-serve.pid");

    let first = Session::start(dir.path());
    let mut second = Session::start(dir.path());
    let second_pid = second.pid().to_string();
    assert_eq!(std::fs::read_to_string(&pidfile).unwrap().trim(), second_pid);

    assert!(first.close().success());
    assert_eq!(std::fs::read_to_string(&pidfile).unwrap().trim(), second_pid);

    // Both servers share the store.
    add(&mut second, "Still writable after the first server left", &[]);
    assert!(second.close().success());
    assert!(!pidfile.exists());
}

#[cfg(unix)]
#[test]
fn sigterm_exits_cleanly_and_keeps_writes() {
    let dir = TempDir::new().unwrap();
    let mut session = Session::start(dir.path());
    let id = add(&mut session, "Written just before SIGTERM", &["signals"]);

    let pid = libc::pid_t::try_from(session.pid()).unwrap();
    assert_eq!(unsafe { libc::kill(pid, libc::SIGTERM) }, 0);
    let status = wait_with_deadline(&mut session.child);
    assert!(status.success(), "exit status {status}");
    assert!(!dir.path().join("loom-serve.pid").exists());

    loom_cli(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains(id.as_str()));
}
