use assert_cmd::cargo; // Add methods on commands
use predicates::prelude::*; // Used for writing assertions
use tempfile;
use ti99check::gen::random_block;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

#[test]
fn disk_pipeline() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let dimg = dir.path().join("work.dsk");
    let src = "       AORG >A000\nSTART  DATA >1234\n       END\n";
    cargo::cargo_bin_cmd!("ti99check")
        .arg("mkdsk").arg("-v").arg("WORK").arg("-s").arg("360").arg("-d").arg(&dimg)
        .assert()
        .success();
    assert_eq!(std::fs::metadata(&dimg)?.len(),360*256);
    cargo::cargo_bin_cmd!("ti99check")
        .arg("put").arg("-f").arg("SRC").arg("-t").arg("DIS/VAR80").arg("-d").arg(&dimg)
        .write_stdin(src)
        .assert()
        .success();
    cargo::cargo_bin_cmd!("ti99check")
        .arg("put").arg("-f").arg("DATA").arg("-t").arg("INT/FIX 128").arg("-d").arg(&dimg)
        .write_stdin(vec![0x55;128*7])
        .assert()
        .success();
    cargo::cargo_bin_cmd!("ti99check")
        .arg("catalog").arg("-d").arg(&dimg)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("WORK       (TI disk)"))
        .stdout(predicate::str::contains("DATA          5  INT/FIX 128     1024 B     7 recs"))
        .stdout(predicate::str::contains("SRC           2  DIS/VAR 80"));
    cargo::cargo_bin_cmd!("ti99check")
        .arg("get").arg("-f").arg("SRC").arg("-d").arg(&dimg)
        .assert()
        .success()
        .stdout(src);
    Ok(())
}

#[test]
fn rename_protect_delete() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let dimg = dir.path().join("work.dsk");
    cargo::cargo_bin_cmd!("ti99check")
        .arg("mkdsk").arg("-v").arg("WORK").arg("-d").arg(&dimg)
        .assert()
        .success();
    cargo::cargo_bin_cmd!("ti99check")
        .arg("put").arg("-f").arg("PROG").arg("-t").arg("PROGRAM").arg("-d").arg(&dimg)
        .write_stdin(vec![0xa0;600])
        .assert()
        .success();
    cargo::cargo_bin_cmd!("ti99check")
        .arg("rename").arg("-f").arg("PROG").arg("-n").arg("LOADER").arg("-d").arg(&dimg)
        .assert()
        .success();
    cargo::cargo_bin_cmd!("ti99check")
        .arg("protect").arg("-f").arg("LOADER").arg("-d").arg(&dimg)
        .assert()
        .success();
    cargo::cargo_bin_cmd!("ti99check")
        .arg("delete").arg("-f").arg("LOADER").arg("-d").arg(&dimg)
        .assert()
        .failure()
        .stderr(predicate::str::contains("FileProtected"));
    cargo::cargo_bin_cmd!("ti99check")
        .arg("protect").arg("--off").arg("-f").arg("LOADER").arg("-d").arg(&dimg)
        .assert()
        .success();
    cargo::cargo_bin_cmd!("ti99check")
        .arg("delete").arg("-f").arg("LOADER").arg("-d").arg(&dimg)
        .assert()
        .success();
    cargo::cargo_bin_cmd!("ti99check")
        .arg("get").arg("-f").arg("LOADER").arg("-d").arg(&dimg)
        .assert()
        .failure()
        .stderr(predicate::str::contains("FileNotFound"));
    Ok(())
}

#[test]
fn put_conflict_and_bad_format() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let dimg = dir.path().join("work.dsk");
    cargo::cargo_bin_cmd!("ti99check")
        .arg("mkdsk").arg("-v").arg("WORK").arg("-d").arg(&dimg)
        .assert()
        .success();
    cargo::cargo_bin_cmd!("ti99check")
        .arg("mkdsk").arg("-v").arg("WORK").arg("-d").arg(&dimg)
        .assert()
        .failure();
    cargo::cargo_bin_cmd!("ti99check")
        .arg("put").arg("-f").arg("A").arg("-t").arg("PROGRAM").arg("-d").arg(&dimg)
        .write_stdin("X")
        .assert()
        .success();
    cargo::cargo_bin_cmd!("ti99check")
        .arg("put").arg("-f").arg("A").arg("-t").arg("PROGRAM").arg("-d").arg(&dimg)
        .write_stdin("X")
        .assert()
        .failure()
        .stderr(predicate::str::contains("NameConflict"));
    cargo::cargo_bin_cmd!("ti99check")
        .arg("put").arg("-f").arg("B").arg("-t").arg("DIS/FOO 80").arg("-d").arg(&dimg)
        .write_stdin("X")
        .assert()
        .failure()
        .stderr(predicate::str::contains("UnknownFormat"));
    Ok(())
}

#[test]
fn gen_images() -> STDRESULT {
    // 16 bytes hold 6 source words and 2 filler words
    cargo::cargo_bin_cmd!("ti99check")
        .arg("gen").arg("-m").arg("exhaustive").arg("-i").arg("1").arg("-c").arg("16")
        .assert()
        .success()
        .stdout(vec![0u8,6,0,7,0,8,0,9,0,10,0,11,0x10,0,0x10,0]);
    let expected = random_block(0,2048,0x1000).data;
    cargo::cargo_bin_cmd!("ti99check")
        .arg("gen").arg("-m").arg("random").arg("-s").arg("0").arg("-b").arg("0x1000")
        .assert()
        .success()
        .stdout(expected);
    cargo::cargo_bin_cmd!("ti99check")
        .arg("gen").arg("-m").arg("exhaustive").arg("-i").arg("100000")
        .assert()
        .failure()
        .stderr(predicate::str::contains("OutOfRange"));
    cargo::cargo_bin_cmd!("ti99check")
        .arg("gen").arg("-m").arg("random")
        .assert()
        .failure()
        .code(2);
    Ok(())
}

#[test]
fn masked_compare() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let a = dir.path().join("a.bin");
    let b = dir.path().join("b.bin");
    std::fs::write(&a,[1u8,2,3,4,5,6,7,8])?;
    std::fs::write(&b,[1u8,2,3,0xff,5,6,7,8,0,0])?;
    cargo::cargo_bin_cmd!("ti99check")
        .arg("cmp").arg(&a).arg(&b).arg("--tolerance").arg("2")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Mismatch"))
        .stderr(predicate::str::contains("offset: 3"));
    cargo::cargo_bin_cmd!("ti99check")
        .arg("cmp").arg(&a).arg(&b).arg("-m").arg("0x3:1").arg("--tolerance").arg("2")
        .assert()
        .success()
        .stderr(predicate::str::contains("artifacts match"));
    cargo::cargo_bin_cmd!("ti99check")
        .arg("cmp").arg(&a).arg(&b).arg("-m").arg("3:1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("LengthMismatch"));
    Ok(())
}

#[test]
fn text_compare() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    std::fs::write(&a,"DATA     5  INT/FIX 128  2020-01-02\n")?;
    std::fs::write(&b,"DATA     5  INT/FIX 128  1999-12-31\n")?;
    cargo::cargo_bin_cmd!("ti99check")
        .arg("cmp").arg(&a).arg(&b).arg("--text").arg("23")
        .assert()
        .success();
    cargo::cargo_bin_cmd!("ti99check")
        .arg("cmp").arg(&a).arg(&b).arg("--text").arg("40")
        .assert()
        .failure()
        .stderr(predicate::str::contains("FormatMismatch"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn run_with_copy_tools() -> STDRESULT {
    // `cp` is its own inverse, so every round trip must pass
    let dir = tempfile::tempdir()?;
    let cfg = dir.path().join("tools.json");
    std::fs::write(&cfg,r#"{
        "tools": {
            "asm": { "program": "cp", "args": ["{in}","{out}"], "defaults_var": "XAS99" },
            "disasm": { "program": "cp", "args": ["{in}","{out}"], "defaults_var": "XDA99" }
        },
        "vectors": { "random_runs": 3, "block_size": 512 },
        "compare": { "length_tolerance": 0 }
    }"#)?;
    cargo::cargo_bin_cmd!("ti99check")
        .arg("run").arg("-c").arg(&cfg)
        .assert()
        .success()
        .stdout(predicate::str::contains("random seed 2 size 512"))
        .stdout(predicate::str::contains(" passed"))
        .stdout(predicate::str::contains("FAIL").not());
    Ok(())
}

#[cfg(unix)]
#[test]
fn run_reports_failures() -> STDRESULT {
    // `true` writes nothing, so reading the result fails
    let dir = tempfile::tempdir()?;
    let cfg = dir.path().join("tools.json");
    std::fs::write(&cfg,r#"{
        "tools": {
            "asm": { "program": "true", "args": ["{in}","{out}"] },
            "disasm": { "program": "cp", "args": ["{in}","{out}"] }
        },
        "vectors": { "random_runs": 2, "block_size": 64 }
    }"#)?;
    cargo::cargo_bin_cmd!("ti99check")
        .arg("run").arg("-c").arg(&cfg)
        .assert()
        .failure()
        .stdout(predicate::str::contains("FAIL"))
        .stderr(predicate::str::contains("ScenariosFailed(2)"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn run_error_fixtures() -> STDRESULT {
    // the shell assembler reports an error on line 3 of whatever it is given
    let dir = tempfile::tempdir()?;
    let cfg = dir.path().join("tools.json");
    std::fs::create_dir(dir.path().join("errors"))?;
    std::fs::write(dir.path().join("errors").join("marked.asm"),"       AORG >A000\n       DATA 1\n       BADOP R1   ; ERROR\n       END\n")?;
    std::fs::write(dir.path().join("errors").join("unmarked.asm"),"       AORG >A000\n       DATA 1\n       BADOP R1\n       END\n")?;
    std::fs::write(&cfg,r#"{
        "tools": {
            "asm": { "program": "sh", "args": ["-c","echo '[0003] Error: Unknown opcode' >&2; echo '1 error, 0 warnings' >&2; exit 1","xas99","{in}"] }
        },
        "fixtures": ["errors/marked.asm","errors/unmarked.asm"]
    }"#)?;
    cargo::cargo_bin_cmd!("ti99check")
        .arg("run").arg("-c").arg(&cfg).arg("-m").arg("errors")
        .assert()
        .failure()
        .stdout(predicate::str::contains("PASS").and(predicate::str::contains("errors/marked.asm")))
        .stdout(predicate::str::contains("FAIL").and(predicate::str::contains("errors/unmarked.asm")))
        .stderr(predicate::str::contains("ScenariosFailed(1)"));
    Ok(())
}

#[test]
fn run_needs_tools() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let cfg = dir.path().join("tools.json");
    std::fs::write(&cfg,r#"{ "tools": { "asm": { "program": "xas99.py" } } }"#)?;
    cargo::cargo_bin_cmd!("ti99check")
        .arg("run").arg("-c").arg(&cfg)
        .assert()
        .failure()
        .stderr(predicate::str::contains("MissingTool(\"disasm\")"));
    Ok(())
}

#[test]
fn completions() -> STDRESULT {
    cargo::cargo_bin_cmd!("ti99check")
        .arg("completions").arg("-s").arg("bash")
        .assert()
        .success()
        .stdout(predicate::str::contains("ti99check"));
    Ok(())
}
