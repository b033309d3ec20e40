use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use rusqlite::{params, Connection};
use serde_json::Value;
use tempfile::TempDir;

const PASSPHRASE: &str = "correct-horse-battery";

fn bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_strongbox"))
}

struct Env {
    root: TempDir,
}

impl Env {
    fn new() -> Self {
        let root = TempDir::new().expect("tempdir");
        std::fs::create_dir_all(root.path().join("config").join("strongbox"))
            .expect("create config dir");
        std::fs::create_dir_all(root.path().join("data")).expect("create data dir");
        let env = Self { root };
        env.write_config("[wipe]\npass_delay_ms = 0\n");
        env
    }

    fn config_path(&self) -> PathBuf {
        self.root
            .path()
            .join("config")
            .join("strongbox")
            .join("config.toml")
    }

    fn vault_path(&self) -> PathBuf {
        self.root.path().join("data").join("strongbox").join("vault.db")
    }

    fn write_config(&self, contents: &str) {
        std::fs::write(self.config_path(), contents).expect("write config");
    }

    fn command(&self, passphrase: Option<&str>) -> Command {
        let mut cmd = Command::new(bin());
        cmd.env("HOME", self.root.path())
            .env("XDG_CONFIG_HOME", self.root.path().join("config"))
            .env("XDG_DATA_HOME", self.root.path().join("data"))
            .env("NO_COLOR", "1")
            .env_remove("STRONGBOX_VAULT")
            .env_remove("STRONGBOX_CONFIG")
            .env_remove("STRONGBOX_LOG")
            .env_remove("STRONGBOX_PASSPHRASE")
            .stdin(Stdio::null());
        if let Some(value) = passphrase {
            cmd.env("STRONGBOX_PASSPHRASE", value);
        }
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.command(Some(PASSPHRASE))
            .args(args)
            .output()
            .expect("run strongbox")
    }

    fn run_ok(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "strongbox {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8(output.stdout).expect("utf8 stdout")
    }

    fn run_json(&self, args: &[&str]) -> Value {
        serde_json::from_str(&self.run_ok(args)).expect("stdout is JSON")
    }

    fn init(&self) {
        self.run_ok(&["init"]);
    }

    fn add(&self, body: &str) -> String {
        self.run_ok(&["-q", "add", "--body", body]).trim().to_string()
    }
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn tamper_detail(vault: &Path, seq: u64, detail: &str) {
    let conn = Connection::open(vault).expect("open vault db");
    let raw: String = conn
        .query_row(
            "SELECT value FROM kv WHERE key = 'vault_tamper_log'",
            [],
            |row| row.get(0),
        )
        .expect("tamper log row");
    let mut records: Vec<Value> = serde_json::from_str(&raw).expect("log is JSON");
    let record = records
        .iter_mut()
        .find(|record| record["seq"] == seq)
        .expect("record present");
    record["detail"] = Value::String(detail.to_string());
    conn.execute(
        "UPDATE kv SET value = ?1 WHERE key = 'vault_tamper_log'",
        params![serde_json::to_string(&records).expect("serialize")],
    )
    .expect("update log");
}

#[test]
fn test_init_add_list_show() {
    let env = Env::new();
    let init = env.run_ok(&["init"]);
    assert!(init.contains("status=ok"));
    assert!(init.contains("iterations=100000"));
    assert!(env.vault_path().exists());

    // an existing config is left untouched
    let config = std::fs::read_to_string(env.config_path()).expect("read config");
    assert!(config.contains("pass_delay_ms = 0"));
    assert!(!config.contains("[vault]"));

    let id = env.add("first entry");
    let second = env.add("second entry");

    let list = env.run_json(&["list", "--json"]);
    let ids: Vec<&str> = list
        .as_array()
        .expect("array")
        .iter()
        .map(|entry| entry["id"].as_str().expect("id"))
        .collect();
    // newest first
    assert_eq!(ids, vec![second.as_str(), id.as_str()]);

    let limited = env.run_json(&["list", "--json", "--limit", "1"]);
    assert_eq!(limited.as_array().expect("array").len(), 1);
    assert_eq!(limited[0]["id"], second.as_str());

    let shown = env.run_json(&["show", &id, "--json"]);
    assert_eq!(shown["body"], "first entry");

    let plain = env.run_ok(&["show", &id]);
    assert!(plain.contains(&format!("id={}", id)));
    assert!(plain.trim_end().ends_with("first entry"));
}

#[test]
fn test_add_reads_body_from_stdin() {
    use std::io::Write;

    let env = Env::new();
    env.init();
    let mut child = env
        .command(Some(PASSPHRASE))
        .args(["-q", "add"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"piped entry\n")
        .expect("write stdin");
    let output = child.wait_with_output().expect("wait");
    assert!(output.status.success(), "{}", stderr(&output));
    let id = String::from_utf8(output.stdout).expect("utf8").trim().to_string();

    let shown = env.run_json(&["show", &id, "--json"]);
    assert_eq!(shown["body"], "piped entry");
}

#[test]
fn test_verify_head_and_log() {
    let env = Env::new();
    env.init();
    env.add("one");

    let verification = env.run_json(&["verify", "--json"]);
    assert_eq!(verification["ok"], true);
    assert_eq!(verification["breaks"], 0);

    let head = env.run_ok(&["head"]);
    let head = head.trim();
    assert_eq!(head.len(), 64);
    assert!(head.chars().all(|c| c.is_ascii_hexdigit()));

    let log = env.run_json(&["log", "--json"]);
    let events: Vec<&str> = log
        .as_array()
        .expect("array")
        .iter()
        .map(|block| block["event"].as_str().expect("event"))
        .collect();
    assert_eq!(
        events,
        vec!["vault_created", "unlocked", "entry_added", "chain_verified"]
    );
    assert_eq!(log[3]["blockHash"], head);

    let last_two = env.run_json(&["log", "--json", "--limit", "2"]);
    assert_eq!(last_two.as_array().expect("array").len(), 2);
    assert_eq!(last_two[0]["event"], "entry_added");
}

#[test]
fn test_tampering_fails_strict_verify() {
    let env = Env::new();
    env.init();
    env.add("one");
    env.add("two");

    tamper_detail(&env.vault_path(), 2, "nothing to see");

    let report = env.run_json(&["verify", "--json"]);
    assert_eq!(report["ok"], false);
    assert_eq!(report["breaks"], 1);
    assert_eq!(report["broken_seqs"], serde_json::json!([2]));

    let strict = env.run(&["verify", "--strict"]);
    assert_eq!(strict.status.code(), Some(6));
    let stdout = String::from_utf8_lossy(&strict.stdout);
    assert!(stdout.contains("Audit chain broken"));

    let check = env.run(&["check", "--json"]);
    assert_eq!(check.status.code(), Some(6));
    let health: Value = serde_json::from_slice(&check.stdout).expect("check JSON");
    assert_eq!(health["storage_ok"], true);
    assert_eq!(health["chain_breaks"], 1);
}

#[test]
fn test_check_reports_healthy_vault() {
    let env = Env::new();
    env.init();
    env.add("one");

    let health = env.run_json(&["check", "--json"]);
    assert_eq!(health["healthy"], true);
    assert_eq!(health["entry_count"], 1);
    assert_eq!(health["failing_entries"], serde_json::json!([]));

    let locked = env.run_json(&["check", "--json", "--no-unlock"]);
    assert!(locked["failing_entries"].is_null());
}

#[test]
fn test_export_writes_files() {
    let env = Env::new();
    env.init();
    env.add("one");
    let out_dir = env.root.path().join("exports");

    let out = env.run_ok(&[
        "export",
        "--dir",
        out_dir.to_str().expect("utf8 path"),
        "--name",
        "evidence",
    ]);
    assert!(out.contains("status=ok"));

    let jsonl = std::fs::read_to_string(out_dir.join("evidence.jsonl")).expect("jsonl");
    assert_eq!(jsonl.lines().count(), 3);
    let manifest: Value = serde_json::from_str(
        &std::fs::read_to_string(out_dir.join("evidence.manifest.json")).expect("manifest"),
    )
    .expect("manifest JSON");
    assert_eq!(manifest["count"], 3);
    assert_eq!(manifest["verify"]["ok"], true);

    let bad = env.run(&["export", "--dir", out_dir.to_str().unwrap(), "--name", "../x"]);
    assert_eq!(bad.status.code(), Some(4));
}

#[test]
fn test_wipe_then_show_is_not_initialized() {
    let env = Env::new();
    env.init();
    let id = env.add("secret");

    let refused = env.run(&["wipe"]);
    assert_eq!(refused.status.code(), Some(4));
    assert!(stderr(&refused).contains("--yes"));

    let out = env.run_ok(&["wipe", "--yes"]);
    assert!(out.contains("entries_overwritten=1"));
    assert!(out.contains("audit_log=kept"));

    let show = env.run(&["show", &id]);
    assert_eq!(show.status.code(), Some(3));
    assert!(stderr(&show).contains("strongbox init"));

    let log = env.run_json(&["log", "--json"]);
    let last = log.as_array().expect("array").last().expect("last block");
    assert_eq!(last["event"], "panic_wipe_completed");

    // same location can hold a fresh vault
    env.init();
    assert_eq!(env.run_json(&["list", "--json"]), serde_json::json!([]));
}

#[test]
fn test_wrong_passphrase_is_auth_failure() {
    let env = Env::new();
    env.init();

    let output = env
        .command(Some("not-the-passphrase"))
        .args(["show", "anything"])
        .output()
        .expect("run strongbox");
    assert_eq!(output.status.code(), Some(5));
    assert!(stderr(&output).contains("Incorrect passphrase"));

    let log = env.run_json(&["log", "--json"]);
    let events: Vec<&str> = log
        .as_array()
        .expect("array")
        .iter()
        .map(|block| block["event"].as_str().expect("event"))
        .collect();
    assert!(events.contains(&"unlock_failed"));
}

#[test]
fn test_missing_passphrase_without_tty() {
    let env = Env::new();
    env.init();
    let output = env
        .command(None)
        .args(["add", "--body", "x"])
        .output()
        .expect("run strongbox");
    assert_eq!(output.status.code(), Some(5));
    assert!(stderr(&output).contains("STRONGBOX_PASSPHRASE"));
}

#[test]
fn test_biometric_lock_blocks_non_interactive_unlock() {
    let env = Env::new();
    env.init();
    let id = env.add("guarded");

    env.run_ok(&["biometric", "on"]);
    let output = env.run(&["show", &id]);
    assert_eq!(output.status.code(), Some(5));
    assert!(stderr(&output).contains("Biometric check denied"));

    // listing needs no key, so it still works
    let list = env.run_json(&["list", "--json"]);
    assert_eq!(list.as_array().expect("array").len(), 1);

    let log = env.run_json(&["log", "--json"]);
    let events: Vec<&str> = log
        .as_array()
        .expect("array")
        .iter()
        .map(|block| block["event"].as_str().expect("event"))
        .collect();
    assert!(events.contains(&"biometric_changed"));
    assert!(events.contains(&"unlock_blocked"));
}

#[test]
fn test_missing_vault_hints_init() {
    let env = Env::new();
    let output = env.run(&["list"]);
    assert_eq!(output.status.code(), Some(3));
    let err = stderr(&output);
    assert!(err.contains("No vault found"));
    assert!(err.contains("strongbox init"));
}

#[test]
fn test_vault_flag_overrides_default_location() {
    let env = Env::new();
    let custom = env.root.path().join("elsewhere").join("mine.db");
    let custom_arg = custom.to_str().expect("utf8 path");

    env.run_ok(&["--vault", custom_arg, "init"]);
    assert!(custom.exists());
    assert!(!env.vault_path().exists());

    env.run_ok(&["--vault", custom_arg, "add", "--body", "over here"]);
    let list = env.run_json(&["--vault", custom_arg, "list", "--json"]);
    assert_eq!(list.as_array().expect("array").len(), 1);
}

#[test]
fn test_invalid_config_is_reported() {
    let env = Env::new();
    env.write_config("[security]\npbkdf2_iterations = 5\n");
    let output = env.run(&["init"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("pbkdf2_iterations"));
}

#[test]
fn test_weak_passphrase_init_leaves_no_vault_file() {
    let env = Env::new();
    let output = env
        .command(Some("short"))
        .arg("init")
        .output()
        .expect("run strongbox");
    assert_eq!(output.status.code(), Some(4));
    assert!(!env.vault_path().exists());

    let list = env.run(&["list"]);
    assert_eq!(list.status.code(), Some(3));
    assert!(stderr(&list).contains("strongbox init"));
}

#[test]
fn test_config_below_fixed_wipe_passes_is_rejected() {
    let env = Env::new();
    env.write_config("[wipe]\npasses = 1\n");
    let output = env.run(&["init"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("wipe.passes"));
    assert!(!env.vault_path().exists());
}
