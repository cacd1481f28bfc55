use std::path::PathBuf;

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_storyreel")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "storyreel.exe"
            } else {
                "storyreel"
            });
            p
        })
}

#[test]
fn cli_chunks_prints_chunks_and_paragraphs() {
    let dir = PathBuf::from("target").join("cli_smoke");
    std::fs::create_dir_all(&dir).unwrap();

    let script_path = dir.join("script.txt");
    std::fs::write(
        &script_path,
        "เสียงบรรยาย: First scene line. [music swells]\n\nSecond scene line!\n\nThird one?",
    )
    .unwrap();

    let out = std::process::Command::new(exe())
        .args(["chunks", "--script"])
        .arg(&script_path)
        .output()
        .unwrap();

    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("# speech chunks"));
    assert!(stdout.contains("First scene line."));
    assert!(!stdout.contains("music swells"));
    assert!(!stdout.contains("เสียงบรรยาย:"));

    let paragraphs = stdout
        .split("# scene paragraphs")
        .nth(1)
        .unwrap()
        .lines()
        .filter(|l| !l.trim().is_empty())
        .count();
    assert_eq!(paragraphs, 3);
}

#[test]
fn cli_generate_without_credentials_fails_cleanly() {
    let dir = PathBuf::from("target").join("cli_smoke");
    std::fs::create_dir_all(&dir).unwrap();
    let script_path = dir.join("script_nocreds.txt");
    std::fs::write(&script_path, "Hello.").unwrap();

    let out = std::process::Command::new(exe())
        .args(["generate", "--topic", "t", "--voice", "v", "--script"])
        .arg(&script_path)
        .env_remove("GOOGLE_TTS_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .env_remove("IMAGE_API_URL")
        .output()
        .unwrap();

    assert!(!out.status.success());
}
