#![allow(dead_code)]

use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tempfile::TempDir;

pub const ADMIN_EMAIL: &str = "admin@uni.edu";

/// A running sidecar bound to a fresh workspace.
pub struct Sidecar {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    next_id: u64,
    pub dir: TempDir,
}

impl Sidecar {
    pub fn start() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = dir.path().join("portald.toml");
        std::fs::write(
            &config,
            format!("[auth]\nbootstrap_admins = [\"{}\"]\n", ADMIN_EMAIL),
        )
        .expect("write config");
        let workspace = dir.path().join("workspace");
        std::fs::create_dir_all(&workspace).expect("create workspace");

        let mut child = Command::new(env!("CARGO_BIN_EXE_portald"))
            .arg("--workspace")
            .arg(&workspace)
            .arg("--config")
            .arg(&config)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn portald");
        let stdin = child.stdin.take().expect("child stdin");
        let stdout = child.stdout.take().expect("child stdout");
        Self {
            child,
            stdin,
            reader: BufReader::new(stdout),
            next_id: 0,
            dir,
        }
    }

    pub fn workspace(&self) -> &Path {
        self.dir.path()
    }

    /// Sends one request and returns the raw response envelope.
    pub fn call(&mut self, method: &str, params: Value) -> Value {
        self.next_id += 1;
        let id = self.next_id.to_string();
        let payload = json!({ "id": id, "method": method, "params": params });
        writeln!(self.stdin, "{}", payload).expect("write request");
        self.stdin.flush().expect("flush request");

        let mut line = String::new();
        self.reader.read_line(&mut line).expect("read response line");
        assert!(!line.trim().is_empty(), "empty response for {}", method);
        let value: Value = serde_json::from_str(line.trim()).expect("parse response json");
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id.as_str()));
        value
    }

    pub fn ok(&mut self, method: &str, params: Value) -> Value {
        let resp = self.call(method, params);
        assert_eq!(
            resp.get("ok").and_then(|v| v.as_bool()),
            Some(true),
            "{} failed: {}",
            method,
            resp
        );
        resp["result"].clone()
    }

    /// Expects a failure and returns its error code.
    pub fn err(&mut self, method: &str, params: Value) -> String {
        let resp = self.call(method, params);
        assert_eq!(
            resp.get("ok").and_then(|v| v.as_bool()),
            Some(false),
            "{} unexpectedly succeeded: {}",
            method,
            resp
        );
        resp["error"]["code"].as_str().unwrap_or("unknown").to_string()
    }

    pub fn login(&mut self, email: &str) -> Value {
        self.ok("auth.login", json!({ "email": email }))["user"].clone()
    }

    pub fn login_admin(&mut self) -> Value {
        self.login(ADMIN_EMAIL)
    }

    /// Creates a user and has the admin make them a student; leaves the admin signed in.
    pub fn make_student(&mut self, email: &str, roll: &str) -> String {
        let user = self.login(email);
        self.login_admin();
        let promoted = self.ok(
            "admin.roles.assignStudent",
            json!({ "userId": user["id"], "rollNumber": roll }),
        );
        promoted["student"]["id"].as_str().expect("student id").to_string()
    }

    pub fn make_faculty(&mut self, email: &str) -> String {
        let user = self.login(email);
        self.login_admin();
        let promoted = self.ok(
            "admin.roles.assignFaculty",
            json!({ "userId": user["id"], "department": "CSE" }),
        );
        promoted["faculty"]["id"].as_str().expect("faculty id").to_string()
    }

    /// Signs in as `faculty_email` and creates an active project.
    pub fn create_project(&mut self, faculty_email: &str, title: &str) -> String {
        self.login(faculty_email);
        let project = self.ok(
            "projects.create",
            json!({
                "title": title,
                "description": "Detect things in images",
                "domain": "AIML",
                "status": "active",
                "course": "Capstone",
                "tags": ["ml", "cv"],
            }),
        );
        project["id"].as_str().expect("project id").to_string()
    }
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub fn str_of<'a>(value: &'a Value, key: &str) -> &'a str {
    value[key].as_str().unwrap_or_else(|| panic!("missing {} in {}", key, value))
}
