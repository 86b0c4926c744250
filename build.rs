use std::env;
use std::path::{Path, PathBuf};

fn main() {
    for variable in [
        "FFMPEG_DIR",
        "PKG_CONFIG_PATH",
        "VCPKG_ROOT",
        "VCPKGRS_DYNAMIC",
        "VCPKGRS_TRIPLET",
    ] {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    if let Some(directory) = env::var_os("FFMPEG_DIR") {
        check_ffmpeg_dir(Path::new(&directory));
        return;
    }

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os == "windows" {
        hint_vcpkg();
    }
}

/// Warn early when `FFMPEG_DIR` cannot satisfy the parser and decoder headers.
fn check_ffmpeg_dir(directory: &Path) {
    let header = directory.join("include").join("libavcodec").join("avcodec.h");
    if !header.exists() {
        println!(
            "cargo:warning=FFMPEG_DIR={} has no include/libavcodec/avcodec.h; ffmpeg-sys-next will likely fail to bind the stream parser API.",
            directory.display(),
        );
    }
}

fn hint_vcpkg() {
    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        println!(
            "cargo:warning=FFMPEG_DIR is not set. On Windows, install FFmpeg via vcpkg and set VCPKG_ROOT + FFMPEG_DIR for reliable builds."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let ffmpeg_dir = PathBuf::from(&vcpkg_root).join("installed").join(&triplet);

    if !ffmpeg_dir.exists() {
        println!(
            "cargo:warning=VCPKG_ROOT is set but no FFmpeg install was found at {}.",
            ffmpeg_dir.display(),
        );
        return;
    }

    println!(
        "cargo:warning=Detected vcpkg FFmpeg at {}. Set FFMPEG_DIR={} to make ffmpeg-sys-next discovery explicit.",
        ffmpeg_dir.display(),
        ffmpeg_dir.display(),
    );
    if env::var_os("VCPKGRS_DYNAMIC").is_none() {
        println!(
            "cargo:warning=Consider setting VCPKGRS_DYNAMIC=1 when using vcpkg dynamic FFmpeg builds on Windows."
        );
    }
}
