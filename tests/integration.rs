use std::io::Write as _;
use std::path::Path;
use std::process::{Command, Output, Stdio};

/// Run the binary in `dir` with `script` piped to stdin as the operator.
fn fix_xrefs(dir: &Path, args: &[&str], script: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_fix-xrefs"))
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(script.as_bytes()).unwrap();
    child.wait_with_output().unwrap()
}

fn read(dir: &Path, name: &str) -> String {
    std::fs::read_to_string(dir.join(name)).unwrap()
}

#[test]
fn enter_and_pick_rewrites_file_and_ledger() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("intro.rst"), "See :meth:`.Foo.bar` for details.\n").unwrap();

    let out = fix_xrefs(dir.path(), &["intro.rst"], "eWidget.bar\n1");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    assert_eq!(read(dir.path(), "intro.rst"), "See Widget.bar for details.\n");
    assert_eq!(read(dir.path(), "fix_xref_state.txt"), "Foo.bar Widget.bar\n");

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("EXISTING TEXT: :meth:`.Foo.bar`"));
    assert!(String::from_utf8_lossy(&out.stderr).contains("1 files scanned, 1 written"));
}

#[test]
fn skipping_everything_leaves_tree_untouched() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("lib")).unwrap();
    let source = "class Engine:\n    \"\"\"See :class:`.Connection` and :meth:`.Engine.connect`.\"\"\"\n";
    std::fs::write(dir.path().join("lib/engine.py"), source).unwrap();

    for _ in 0..2 {
        let out = fix_xrefs(dir.path(), &["lib"], "ss");
        assert!(out.status.success());
    }
    assert_eq!(read(dir.path(), "lib/engine.py"), source);
    assert!(!dir.path().join("fix_xref_state.txt").exists());
}

#[test]
fn ledger_answers_carry_into_next_run() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.rst"), "Use :class:`.Foo` here.\n").unwrap();
    std::fs::write(dir.path().join("fix_xref_state.txt"), "Foo Bar\nFoo Baz\n").unwrap();

    let out = fix_xrefs(dir.path(), &["a.rst"], "2");
    assert!(out.status.success());
    assert_eq!(read(dir.path(), "a.rst"), "Use Baz here.\n");
    assert!(String::from_utf8_lossy(&out.stdout).contains("REPLACEMENTS: [1] Bar [2] Baz"));
    assert_eq!(read(dir.path(), "fix_xref_state.txt"), "Foo Bar\nFoo Baz\n");
}

#[test]
fn risky_lines_are_never_offered() {
    let dir = tempfile::tempdir().unwrap();
    let source = "@deprecated(\":class:`.Foo`\")\n# see :class:`.Foo`\nname = \":class:`.Foo`\"\n";
    std::fs::write(dir.path().join("m.py"), source).unwrap();

    let out = fix_xrefs(dir.path(), &["m.py"], "");
    assert!(out.status.success());
    assert_eq!(read(dir.path(), "m.py"), source);
    assert!(!String::from_utf8_lossy(&out.stdout).contains("EXISTING TEXT"));
}

#[test]
fn end_of_input_aborts_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let source = "one :class:`.A`\ntwo :class:`.B`\n";
    std::fs::write(dir.path().join("a.rst"), source).unwrap();

    let out = fix_xrefs(dir.path(), &["a.rst"], "eX\n1");
    assert!(out.status.success());
    assert_eq!(read(dir.path(), "a.rst"), source);
    assert_eq!(read(dir.path(), "fix_xref_state.txt"), "A X\n");
    assert!(String::from_utf8_lossy(&out.stderr).contains("Aborted."));
}

#[test]
fn corrupt_ledger_fails_before_touching_files() {
    let dir = tempfile::tempdir().unwrap();
    let source = "Use :class:`.Foo` here.\n";
    std::fs::write(dir.path().join("a.rst"), source).unwrap();
    std::fs::write(dir.path().join("fix_xref_state.txt"), "Foo Bar\ngarbage\n").unwrap();

    let out = fix_xrefs(dir.path(), &["a.rst"], "1");
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Ledger Corrupt"));
    assert_eq!(read(dir.path(), "a.rst"), source);
}

#[test]
fn missing_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = fix_xrefs(dir.path(), &["nowhere"], "");
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Path Not Found"));
}

#[test]
fn invalid_filter_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = fix_xrefs(dir.path(), &["--filter", "(", "."], "");
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Invalid Filter"));
}

#[test]
fn config_file_changes_ledger_location() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".fix_xrefs.toml"), "ledger = \"answers.log\"\n").unwrap();
    std::fs::write(dir.path().join("a.rst"), "Use :func:`.go` now.\n").unwrap();

    let out = fix_xrefs(dir.path(), &["a.rst"], "erun\n1");
    assert!(out.status.success());
    assert_eq!(read(dir.path(), "a.rst"), "Use run now.\n");
    assert_eq!(read(dir.path(), "answers.log"), "go run\n");
    assert!(!dir.path().join("fix_xref_state.txt").exists());
}

#[test]
fn unknown_config_key_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".fix_xrefs.toml"), "colour = true\n").unwrap();
    std::fs::write(dir.path().join("a.rst"), "text\n").unwrap();

    let out = fix_xrefs(dir.path(), &["a.rst"], "");
    assert_eq!(out.status.code(), Some(1));
}
