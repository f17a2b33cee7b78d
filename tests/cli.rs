use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

fn stackcc(args: &[&str]) -> Output {
  Command::new(env!("CARGO_BIN_EXE_stackcc"))
    .args(args)
    .env_remove("RUST_LOG")
    .output()
    .expect("failed to launch stackcc")
}

fn scratch(name: &str) -> PathBuf {
  let dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("stackcc_cli");
  std::fs::create_dir_all(&dir).unwrap();
  dir.join(name)
}

#[test]
fn prints_assembly_on_success() {
  let out = stackcc(&["--dialect", "expr", "1+2"]);
  assert!(out.status.success());
  let stdout = String::from_utf8(out.stdout).unwrap();
  assert!(stdout.starts_with(".intel_syntax noprefix\n.global main\nmain:\n"));
  assert!(out.stderr.is_empty());
}

#[test]
fn syntax_error_points_at_end_of_input() {
  let out = stackcc(&["-d", "expr", "1+"]);
  assert_eq!(out.status.code(), Some(1));
  let stderr = String::from_utf8(out.stderr).unwrap();
  assert_eq!(stderr, "1+\n  ^ expected a number, but reached end of input\n");
  assert!(out.stdout.is_empty());
}

#[test]
fn lexical_error_shows_the_line() {
  let out = stackcc(&["-d", "stmt", "a = 1;\nb = a # 2;"]);
  assert!(!out.status.success());
  let stderr = String::from_utf8(out.stderr).unwrap();
  assert!(stderr.starts_with("b = a # 2;\n      ^ invalid token: '#'"));
}

#[test]
fn reads_program_from_stdin() {
  let mut child = Command::new(env!("CARGO_BIN_EXE_stackcc"))
    .env_remove("RUST_LOG")
    .stdin(Stdio::piped())
    .stdout(Stdio::piped())
    .spawn()
    .unwrap();
  child
    .stdin
    .take()
    .unwrap()
    .write_all(b"main() {\n  return 0;\n}\n")
    .unwrap();
  let out = child.wait_with_output().unwrap();
  assert!(out.status.success());
  assert!(String::from_utf8(out.stdout).unwrap().contains("main:\n"));
}

#[test]
fn reads_program_from_file_and_writes_output() {
  let input = scratch("prog.c");
  let output = scratch("prog.s");
  std::fs::write(&input, "main() { return 3; }").unwrap();
  let out = stackcc(&[
    "--file",
    input.to_str().unwrap(),
    "-o",
    output.to_str().unwrap(),
  ]);
  assert!(out.status.success());
  assert!(out.stdout.is_empty());
  let asm = std::fs::read_to_string(&output).unwrap();
  assert!(asm.contains("  push 3\n"));
}

#[test]
fn writes_debug_dumps() {
  let tokens = scratch("dump.tokens");
  let ast = scratch("dump.ast");
  let out = stackcc(&[
    "-d",
    "stmt",
    "--dump-tokens",
    tokens.to_str().unwrap(),
    "--dump-ast",
    ast.to_str().unwrap(),
    "a = 1 + 2;",
  ]);
  assert!(out.status.success());
  assert_eq!(
    std::fs::read_to_string(&tokens).unwrap(),
    "{a, =, 1, +, 2, ;}"
  );
  assert_eq!(
    std::fs::read_to_string(&ast).unwrap(),
    "main() {\n  (=\n    a\n    (+ 1 2)\n  )\n}\n"
  );
}

#[test]
fn missing_input_file_is_reported() {
  let out = stackcc(&["--file", "/nonexistent/stackcc/input.c"]);
  assert_eq!(out.status.code(), Some(1));
  let stderr = String::from_utf8(out.stderr).unwrap();
  assert!(stderr.starts_with("cannot read /nonexistent/stackcc/input.c"));
}
