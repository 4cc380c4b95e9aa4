use std::process::Command;

fn run_tinyjit(args: &[&str]) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_tinyjit"))
        .args(args)
        .output()
        .expect("failed to execute tinyjit");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();

    (stdout, stderr, success)
}

fn assert_success(args: &[&str]) -> String {
    let (stdout, stderr, success) = run_tinyjit(args);
    assert!(success, "command should succeed, stderr:\n{}", stderr);
    stdout
}

fn assert_failure(args: &[&str]) -> String {
    let (_, stderr, success) = run_tinyjit(args);
    assert!(!success, "command should fail");
    stderr
}

#[cfg(target_arch = "x86_64")]
#[test]
fn test_run_constant() {
    assert_eq!(assert_success(&["run", "constant", "42"]), "42\n");
    assert_eq!(assert_success(&["run", "constant", "-1"]), "-1\n");
    assert_eq!(assert_success(&["run", "constant"]), "0\n");
}

#[cfg(target_arch = "x86_64")]
#[test]
fn test_run_identity() {
    assert_eq!(assert_success(&["run", "identity", "100"]), "100\n");
    assert_eq!(assert_success(&["run", "identity", "-1"]), "-1\n");
}

#[cfg(target_arch = "x86_64")]
#[test]
fn test_run_increment() {
    assert_eq!(assert_success(&["run", "increment", "42"]), "43\n");
    assert_eq!(assert_success(&["run", "increment", "-1"]), "0\n");
}

#[test]
fn test_dump_human() {
    let stdout = assert_success(&["dump", "constant", "42"]);
    assert_eq!(
        stdout,
        "; constant (8 bytes)\n\
         0000  48 c7 c0 2a 00 00 00     mov rax, 42\n\
         0007  c3                       ret\n"
    );
}

#[test]
fn test_dump_json() {
    let stdout = assert_success(&["dump", "increment", "--format", "json"]);
    let doc: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(doc["program"], "increment");
    assert_eq!(doc["size"], 29);
    let lines = doc["lines"].as_array().unwrap();
    assert_eq!(lines.len(), 8);
    assert_eq!(lines[3]["text"], "mov rax, rdi");
    assert_eq!(lines[3]["offset"], 16);
    assert_eq!(lines[3]["bytes"], serde_json::json!([0x48, 0x89, 0xF8]));
}

#[test]
fn test_dump_format_from_config() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, b"dump_format = \"json\"\n").unwrap();
    let path = file.path().to_str().unwrap();

    let stdout = assert_success(&["--config", path, "dump", "identity"]);
    assert!(serde_json::from_str::<serde_json::Value>(&stdout).is_ok());

    // An explicit flag wins over the file
    let stdout = assert_success(&["--config", path, "dump", "identity", "--format", "human"]);
    assert!(stdout.starts_with("; identity (22 bytes)\n"));
}

#[test]
fn test_constant_out_of_range() {
    let stderr = assert_failure(&["dump", "constant", "4294967296"]);
    assert!(stderr.contains("does not fit in a 32-bit immediate"), "{}", stderr);
}

#[test]
fn test_missing_config_file() {
    let stderr = assert_failure(&["--config", "/nonexistent/tinyjit.toml", "dump", "constant"]);
    assert!(stderr.starts_with("error: failed to read"), "{}", stderr);
}

#[test]
fn test_trace_jit_logs_encodings() {
    let (_, stderr, success) = run_tinyjit(&["--trace-jit", "dump", "constant", "7"]);
    assert!(success);
    assert!(stderr.contains("mov rax, 7"), "{}", stderr);
}

#[cfg(target_arch = "x86_64")]
#[test]
fn test_huge_arena_size_fails_cleanly() {
    let stderr = assert_failure(&[
        "--arena-size",
        "18446744073709551615",
        "run",
        "constant",
        "1",
    ]);
    assert!(stderr.starts_with("error: memory allocation failed"), "{}", stderr);
}
