//! Drive the `edgecov` binary.

use std::path::Path;
use std::process::{Command, Output};

use edgecov::{Module, save_module};
use edgecov_ir::{Function, IRBuilder, Operand, Terminator, Type};

fn edgecov(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_edgecov"))
        .args(args)
        .env_remove("AFL_INST_WHITELIST")
        .env_remove("AFL_INST_RATIO")
        .env_remove("AFL_QUIET")
        .env_remove("AFL_HARDEN")
        .env_remove("RUST_LOG")
        .output()
        .expect("spawn edgecov")
}

/// `main() -> 7` through two blocks.
fn write_module(path: &Path) {
    let mut f = Function::new("main", vec![], Some(Type::I64));
    let entry = f.add_block("entry");
    let exit = f.add_block("exit");
    IRBuilder::at_end(&mut f, entry)
        .expect("entry")
        .terminate(Terminator::br(exit));
    IRBuilder::at_end(&mut f, exit)
        .expect("exit")
        .terminate(Terminator::ret(Some(Operand::i64(7))));
    let mut m = Module::new("cli");
    m.add_function(f);
    save_module(&m, path).expect("save module");
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

#[test]
fn instrument_then_run() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("in.json");
    let output = dir.path().join("out.json");
    write_module(&input);

    let out = edgecov(&[
        "instrument",
        path_str(&input),
        "-o",
        path_str(&output),
        "--seed",
        "5",
        "--quiet",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(output.exists());

    let out = edgecov(&["run", path_str(&output)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("returned 7"), "{stdout}");
    assert!(stdout.contains("edges hit"), "{stdout}");
}

#[test]
fn emit_text() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("in.json");
    write_module(&input);

    let out = edgecov(&["instrument", path_str(&input), "--emit-text", "--quiet"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("@__afl_prev_loc"));
    assert!(stdout.contains("!nosanitize"));
}

fn read(path: &Path) -> Vec<u8> {
    std::fs::read(path).expect("read module file")
}

#[test]
fn bad_ratio_exits_with_failure() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("in.json");
    let output = dir.path().join("out.json");
    write_module(&input);
    let before = read(&input);

    for ratio in ["0", "101", "abc"] {
        let out = edgecov(&["instrument", path_str(&input), "--ratio", ratio]);
        assert_eq!(out.status.code(), Some(1), "ratio {ratio}");
        assert!(String::from_utf8_lossy(&out.stderr).contains("AFL_INST_RATIO"));
        assert_eq!(read(&input), before, "ratio {ratio} rewrote the input");

        let out = edgecov(&[
            "instrument",
            path_str(&input),
            "-o",
            path_str(&output),
            "--ratio",
            ratio,
        ]);
        assert_eq!(out.status.code(), Some(1), "ratio {ratio}");
        assert!(!output.exists(), "ratio {ratio} wrote an output file");
    }
}

#[test]
fn ratio_from_environment() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("in.json");
    write_module(&input);
    let before = read(&input);

    let out = Command::new(env!("CARGO_BIN_EXE_edgecov"))
        .args(["instrument", path_str(&input), "--quiet"])
        .env("AFL_INST_RATIO", "0")
        .output()
        .expect("spawn edgecov");
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(read(&input), before);
}

#[test]
fn missing_whitelist_exits_with_failure() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("in.json");
    let output = dir.path().join("out.json");
    write_module(&input);
    let before = read(&input);
    let list = dir.path().join("missing.txt");

    let out = edgecov(&["instrument", path_str(&input), "--whitelist", path_str(&list)]);
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(read(&input), before);

    let out = edgecov(&[
        "instrument",
        path_str(&input),
        "-o",
        path_str(&output),
        "--whitelist",
        path_str(&list),
    ]);
    assert_eq!(out.status.code(), Some(1));
    assert!(!output.exists());
}
