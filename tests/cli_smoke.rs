use std::path::PathBuf;
use std::process::Command;

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_mapshot")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "mapshot.exe"
            } else {
                "mapshot"
            });
            p
        })
}

#[test]
fn cli_writes_png_file() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("maps").join("alps.png");

    let status = Command::new(exe())
        .args(["-b", "5,45,7,47", "-w", "1in", "-h", "0.5in", "-d", "72", "-o"])
        .arg(&out_path)
        .status()
        .unwrap();

    assert!(status.success());
    let img = image::open(&out_path).unwrap();
    assert_eq!((img.width(), img.height()), (72, 36));
}

#[test]
fn cli_streams_to_stdout_without_output() {
    let output = Command::new(exe())
        .args(["--bounds", "-1,-1,1,1", "--width", "40", "--height", "30"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(&output.stdout[..8], b"\x89PNG\r\n\x1a\n");
}

#[test]
fn cli_rejects_inverted_bounds() {
    let output = Command::new(exe())
        .args(["-b", "7,45,5,47", "-w", "40", "-h", "30"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn cli_reads_style_json() {
    let dir = tempfile::tempdir().unwrap();
    let style_path = dir.path().join("style.json");
    std::fs::write(
        &style_path,
        r#"{ "background": [0, 0, 255, 255], "graticule_step_deg": 100.0 }"#,
    )
    .unwrap();
    let out_path = dir.path().join("blue.png");

    let status = Command::new(exe())
        .args(["-b", "5,45,7,47", "-w", "16", "-h", "16", "--style"])
        .arg(&style_path)
        .arg("-o")
        .arg(&out_path)
        .status()
        .unwrap();

    assert!(status.success());
    let img = image::open(&out_path).unwrap().to_rgba8();
    assert_eq!(img.get_pixel(0, 0).0, [0, 0, 255, 255]);
}

#[test]
fn cli_fails_when_the_output_device_is_full() {
    let full = std::path::Path::new("/dev/full");
    if !full.exists() {
        return;
    }

    let output = Command::new(exe())
        .args(["-b", "5,45,7,47", "-w", "40", "-h", "30", "-o"])
        .arg(full)
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("saved 40x30 image"), "{stderr}");
}
