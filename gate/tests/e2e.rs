//! End-to-end tests running the `gate` binary against real git repositories.

use serde_json::Value;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

fn gate_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_gate"))
}

fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn init_test_repo(dir: &Path) {
    run_git(dir, &["init"]);
    run_git(dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    run_git(dir, &["config", "user.email", "test@test.com"]);
    run_git(dir, &["config", "user.name", "Test"]);
    fs::write(dir.join("README.md"), "# test").unwrap();
    run_git(dir, &["add", "."]);
    run_git(dir, &["commit", "-m", "init"]);
}

struct GateOutput {
    code: i32,
    stdout: String,
    stderr: String,
}

impl GateOutput {
    fn json(&self) -> Value {
        serde_json::from_str(&self.stdout).unwrap()
    }
}

struct TestEnv {
    tmp: tempfile::TempDir,
}

impl TestEnv {
    fn new() -> Self {
        Self {
            tmp: tempfile::tempdir().unwrap(),
        }
    }

    /// A fresh directory under the test's temp dir, canonicalized.
    fn dir(&self, name: &str) -> PathBuf {
        let d = self.tmp.path().join(name);
        fs::create_dir_all(&d).unwrap();
        dunce::canonicalize(d).unwrap()
    }

    fn repo(&self, parent: &Path, name: &str) -> PathBuf {
        let d = parent.join(name);
        fs::create_dir_all(&d).unwrap();
        init_test_repo(&d);
        d
    }

    /// A bare remote holding one commit on `main`. Returns its path and commit.
    fn bare_remote(&self) -> (PathBuf, String) {
        let remote = self.dir("remote.git");
        run_git(&remote, &["init", "--bare"]);
        run_git(&remote, &["symbolic-ref", "HEAD", "refs/heads/main"]);

        let seed = self.repo(&self.dir("seed"), "repo");
        run_git(&seed, &["remote", "add", "origin", &remote.to_string_lossy()]);
        run_git(&seed, &["push", "-u", "origin", "main"]);
        let commit = run_git(&seed, &["rev-parse", "HEAD"]);
        (remote, commit)
    }

    fn gate(&self, root: &Path, args: &[&str], stdin: Option<&str>) -> GateOutput {
        let mut child = Command::new(gate_binary())
            .arg("-C")
            .arg(root)
            .args(args)
            .env("XDG_CACHE_HOME", self.tmp.path().join("cache"))
            .env("XDG_CONFIG_HOME", self.tmp.path().join("config"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();

        {
            let mut pipe = child.stdin.take().unwrap();
            if let Some(input) = stdin {
                pipe.write_all(input.as_bytes()).unwrap();
            }
        }

        let output = child.wait_with_output().unwrap();
        GateOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    fn capture(&self, root: &Path) -> GateOutput {
        let out = self.gate(root, &["capture"], None);
        assert_eq!(out.code, 0, "capture failed: {}", out.stderr);
        out
    }

    fn apply(&self, root: &Path, state: &str) -> GateOutput {
        let out = self.gate(root, &["apply"], Some(state));
        assert_eq!(out.code, 0, "apply failed: {}", out.stderr);
        out
    }
}

fn paths(state: &Value) -> Vec<&str> {
    state["repositories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["path"].as_str().unwrap())
        .collect()
}

#[test]
fn capture_empty_directory() {
    let env = TestEnv::new();
    let root = env.dir("work");

    let out = env.capture(&root);
    assert_eq!(out.stderr, "");
    assert_eq!(out.stdout, "{\n  \"repositories\": []\n}\n");
}

#[test]
fn capture_single_repo_without_remote() {
    let env = TestEnv::new();
    let root = env.dir("work");
    init_test_repo(&root);

    let out = env.capture(&root);
    assert_eq!(out.stderr, "");
    let state = out.json();
    let repos = state["repositories"].as_array().unwrap();
    assert_eq!(repos.len(), 1);
    let repo = &repos[0];
    assert_eq!(repo["path"], ".");
    assert_eq!(repo["branch"], "main");
    assert_eq!(repo["commit"].as_str().unwrap().len(), 40);
    assert_eq!(repo["is_worktree"], false);
    assert!(repo["main_checkout_path"].is_null());
    assert!(repo.get("remote_url").is_none());
}

#[test]
fn capture_records_origin_url() {
    let env = TestEnv::new();
    let (remote, _) = env.bare_remote();
    let root = env.dir("work");
    init_test_repo(&root);
    run_git(&root, &["remote", "add", "origin", &remote.to_string_lossy()]);

    let state = env.capture(&root).json();
    assert_eq!(
        state["repositories"][0]["remote_url"],
        remote.to_string_lossy().as_ref()
    );
}

#[test]
fn capture_warns_about_uncommitted_changes() {
    let env = TestEnv::new();
    let root = env.dir("work");
    init_test_repo(&root);
    fs::write(root.join("file2"), "uncommitted").unwrap();

    let out = env.capture(&root);
    assert!(out.stderr.contains("warning: . has uncommitted changes"));
    assert_eq!(paths(&out.json()), vec!["."]);
}

#[test]
fn capture_multiple_repos_sorted() {
    let env = TestEnv::new();
    let root = env.dir("work");
    env.repo(&root, "repo2");
    env.repo(&root, "repo1");
    fs::create_dir_all(root.join("plain/dir")).unwrap();

    let out = env.capture(&root);
    assert_eq!(out.stderr, "");
    assert_eq!(paths(&out.json()), vec!["repo1", "repo2"]);
}

#[test]
fn capture_subdirectories_are_not_repositories() {
    let env = TestEnv::new();
    let root = env.dir("work");
    let repo = env.repo(&root, "repo");
    fs::create_dir_all(repo.join("src/nested")).unwrap();
    fs::write(repo.join("src/nested/lib.rs"), "").unwrap();
    run_git(&repo, &["add", "."]);
    run_git(&repo, &["commit", "-m", "src"]);

    assert_eq!(paths(&env.capture(&root).json()), vec!["repo"]);
}

#[test]
fn capture_from_inside_a_repository_finds_ancestor() {
    let env = TestEnv::new();
    let root = env.dir("work");
    let repo = env.repo(&root, "repo");
    let inside = repo.join("src");
    fs::create_dir_all(&inside).unwrap();

    let state = env.capture(&inside).json();
    assert_eq!(paths(&state), vec![".."]);
}

#[test]
fn capture_worktree_relative_to_itself() {
    let env = TestEnv::new();
    let root = env.dir("work");
    let main = env.repo(&root, "main-repo");
    run_git(&main, &["worktree", "add", "-b", "feature-branch", "../worktree-branch"]);

    let out = env.capture(&root);
    assert_eq!(out.stderr, "");
    let state = out.json();
    assert_eq!(paths(&state), vec!["main-repo", "worktree-branch"]);

    let main_record = &state["repositories"][0];
    assert_eq!(main_record["is_worktree"], false);
    assert!(main_record["main_checkout_path"].is_null());

    let wt = &state["repositories"][1];
    assert_eq!(wt["is_worktree"], true);
    assert_eq!(wt["branch"], "feature-branch");
    assert_eq!(wt["main_checkout_path"], "../main-repo");
    assert_eq!(wt["commit"], main_record["commit"]);
    assert!(wt.get("remote_url").is_none());
}

#[test]
fn capture_nested_repositories() {
    let env = TestEnv::new();
    let root = env.dir("work");
    let outer = env.repo(&root, "outer");
    env.repo(&outer, "inner");

    let out = env.capture(&root);
    // The inner repository shows up as untracked content of the outer one
    assert!(out.stderr.contains("warning: outer has uncommitted changes"));
    assert!(!out.stderr.contains("outer/inner has uncommitted changes"));
    assert_eq!(paths(&out.json()), vec!["outer", "outer/inner"]);
}

#[test]
fn capture_detached_head() {
    let env = TestEnv::new();
    let root = env.dir("work");
    init_test_repo(&root);
    let commit = run_git(&root, &["rev-parse", "HEAD"]);
    run_git(&root, &["checkout", "--detach", "HEAD"]);

    let out = env.capture(&root);
    assert_eq!(out.stderr, "");
    let state = out.json();
    assert_eq!(state["repositories"][0]["branch"], "HEAD");
    assert_eq!(state["repositories"][0]["commit"], commit.as_str());
}

#[test]
fn capture_is_byte_identical_when_repeated() {
    let env = TestEnv::new();
    let root = env.dir("work");
    let main = env.repo(&root, "main-repo");
    run_git(&main, &["worktree", "add", "-b", "feature", "../wt"]);
    env.repo(&root, "other");

    assert_eq!(env.capture(&root).stdout, env.capture(&root).stdout);
}

#[test]
fn apply_clones_main_checkout() {
    let env = TestEnv::new();
    let (remote, commit) = env.bare_remote();
    let target = env.dir("target");

    let state = serde_json::json!({
        "repositories": [{
            "path": "group/main-repo",
            "remote_url": remote.to_string_lossy(),
            "branch": "main",
            "commit": commit,
            "is_worktree": false,
            "main_checkout_path": null,
        }]
    });
    let out = env.apply(&target, &state.to_string());
    assert!(out.stderr.contains("cloning group/main-repo"));
    assert!(out.stderr.contains(&format!("checked out main at {}", &commit[..12])));

    let clone = target.join("group/main-repo");
    assert_eq!(run_git(&clone, &["rev-parse", "--abbrev-ref", "HEAD"]), "main");
    assert_eq!(run_git(&clone, &["rev-parse", "HEAD"]), commit);
}

#[test]
fn apply_skips_existing_path() {
    let env = TestEnv::new();
    let target = env.dir("target");
    fs::create_dir_all(target.join("existing")).unwrap();
    fs::write(target.join("existing/keep.txt"), "untouched").unwrap();

    let state = r#"{"repositories":[{"path":"existing","remote_url":"https://example.invalid/x.git","branch":"main","commit":"abc"}]}"#;
    let out = env.apply(&target, state);
    assert_eq!(out.stderr, "warning: existing already exists, skipping\n");
    assert_eq!(
        fs::read_to_string(target.join("existing/keep.txt")).unwrap(),
        "untouched"
    );
    assert!(!target.join("existing/.git").exists());
}

#[test]
fn apply_worktree_listed_before_main_checkout() {
    let env = TestEnv::new();
    let (remote, commit) = env.bare_remote();
    let target = env.dir("target");

    let state = serde_json::json!({
        "repositories": [
            {
                "path": "worktree-dir",
                "branch": "feature",
                "commit": commit,
                "is_worktree": true,
                "main_checkout_path": "../main-repo",
            },
            {
                "path": "main-repo",
                "remote_url": remote.to_string_lossy(),
                "branch": "main",
                "commit": commit,
                "is_worktree": false,
                "main_checkout_path": null,
            },
        ]
    });
    let out = env.apply(&target, &state.to_string());
    assert!(out.stderr.contains("cloning main-repo"));
    assert!(out.stderr.contains("adding worktree worktree-dir from main-repo"));
    assert!(!out.stderr.contains("error:"), "stderr: {}", out.stderr);

    let wt = target.join("worktree-dir");
    assert_eq!(run_git(&wt, &["rev-parse", "--abbrev-ref", "HEAD"]), "feature");
    assert_eq!(run_git(&wt, &["rev-parse", "HEAD"]), commit);
    assert!(wt.join("../main-repo").is_dir());
}

#[test]
fn apply_continues_after_repository_failure() {
    let env = TestEnv::new();
    let (remote, commit) = env.bare_remote();
    let target = env.dir("target");

    let state = serde_json::json!({
        "repositories": [
            { "path": "a-no-remote", "branch": "main", "commit": commit },
            { "path": "b-orphan", "branch": "x", "commit": commit, "is_worktree": true,
              "main_checkout_path": "../missing" },
            { "path": "c-ok", "remote_url": remote.to_string_lossy(), "branch": "main",
              "commit": commit },
        ]
    });
    let out = env.apply(&target, &state.to_string());
    assert!(out.stderr.contains("error: a-no-remote: no remote URL for main checkout"));
    assert!(out.stderr.contains("error: b-orphan: main checkout missing does not exist"));
    assert!(target.join("c-ok/README.md").exists());
}

#[test]
fn apply_rejects_malformed_json() {
    let env = TestEnv::new();
    let target = env.dir("target");

    let out = env.gate(&target, &["apply"], Some("{\"repositories\": ["));
    assert_eq!(out.code, 1);
    assert!(out.stderr.contains("failed to parse JSON"));
}

#[test]
fn round_trip_reproduces_layout_and_is_idempotent() {
    let env = TestEnv::new();
    let (remote, _) = env.bare_remote();

    let source = env.dir("source");
    run_git(&source, &["clone", &remote.to_string_lossy(), "app"]);
    let app = source.join("app");
    run_git(&app, &["worktree", "add", "-b", "feature", "../app-feature"]);
    let captured = env.capture(&source).stdout;

    let target = env.dir("target");
    let first = env.apply(&target, &captured);
    assert!(!first.stderr.contains("error:"), "stderr: {}", first.stderr);
    assert_eq!(env.capture(&target).stdout, captured);

    let second = env.apply(&target, &captured);
    assert_eq!(
        second.stderr,
        "warning: app already exists, skipping\nwarning: app-feature already exists, skipping\n"
    );
}

#[test]
fn round_trip_keeps_detached_head_off_the_default_branch() {
    let env = TestEnv::new();
    let (remote, first) = env.bare_remote();

    // Advance main on the remote so the detached commit is behind it
    let pusher = env.dir("pusher");
    run_git(&pusher, &["clone", &remote.to_string_lossy(), "repo"]);
    let pusher = pusher.join("repo");
    run_git(&pusher, &["config", "user.email", "test@test.com"]);
    run_git(&pusher, &["config", "user.name", "Test"]);
    fs::write(pusher.join("second"), "2").unwrap();
    run_git(&pusher, &["add", "."]);
    run_git(&pusher, &["commit", "-m", "second"]);
    run_git(&pusher, &["push", "origin", "main"]);
    let second = run_git(&pusher, &["rev-parse", "HEAD"]);

    let source = env.dir("source");
    run_git(&source, &["clone", &remote.to_string_lossy(), "app"]);
    run_git(&source.join("app"), &["checkout", "--detach", &first]);
    let captured = env.capture(&source).stdout;
    assert_eq!(env.capture(&source).json()["repositories"][0]["branch"], "HEAD");

    let target = env.dir("target");
    let out = env.apply(&target, &captured);
    assert!(!out.stderr.contains("error:"), "stderr: {}", out.stderr);
    assert_eq!(env.capture(&target).stdout, captured);

    let restored = target.join("app");
    assert_eq!(run_git(&restored, &["rev-parse", "HEAD"]), first);
    assert_eq!(run_git(&restored, &["rev-parse", "main"]), second);
}

#[test]
fn apply_dry_run_changes_nothing() {
    let env = TestEnv::new();
    let (remote, commit) = env.bare_remote();
    let target = env.dir("target");

    let state = serde_json::json!({
        "repositories": [
            { "path": "main-repo", "remote_url": remote.to_string_lossy(), "branch": "main",
              "commit": commit },
            { "path": "wt", "branch": "feature", "commit": commit, "is_worktree": true,
              "main_checkout_path": "../main-repo" },
        ]
    });
    let out = env.gate(&target, &["apply", "--dry-run"], Some(&state.to_string()));
    assert_eq!(out.code, 0);
    assert!(out.stderr.contains("would clone main-repo"));
    assert!(out.stderr.contains("would add worktree wt from main-repo"));
    assert!(!target.join("main-repo").exists());
}
