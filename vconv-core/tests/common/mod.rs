// vconv-core/tests/common/mod.rs
//
// Shell-script stand-ins for the encoder binary. The scripts are written once
// per test binary, before any of them is executed: writing an executable
// while another thread forks can otherwise fail the exec with ETXTBSY.

#![cfg(unix)]
#![allow(dead_code)]

use once_cell::sync::Lazy;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Prints `$@` one per line into the output path (the last argument).
const RECORD_ARGS: &str = r#"for last in "$@"; do :; done
printf '%s\n' "$@" > "$last"
"#;

const ENCODER_LISTING: &str = r#"for arg in "$@"; do
  if [ "$arg" = "-encoders" ]; then
    echo "Encoders:"
    echo " V..... = Video"
    echo " ------"
    echo " V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC (codec h264)"
    echo " V....D h264_nvenc           NVIDIA NVENC H.264 encoder (codec h264)"
    echo " A....D aac                  AAC (Advanced Audio Coding)"
    exit 0
  fi
done
"#;

/// Announces 120s of input and reports 30/60/120s at 1.0x, then succeeds.
const COMPLETES: &str = r#"echo "Input #0, matroska,webm, from 'input.mkv':" >&2
echo "  Duration: 00:02:00.00, start: 0.000000, bitrate: 1205 kb/s" >&2
echo "Stream mapping:" >&2
printf 'frame=  750 fps=250 q=28.0 size=    1024kB time=00:00:30.00 bitrate= 279.6kbits/s speed=1.0x\r' >&2
printf 'frame= 1500 fps=250 q=28.0 size=    2048kB time=00:01:00.00 bitrate= 279.6kbits/s speed=1.0x\r' >&2
printf 'frame= 3000 fps=250 q=28.0 size=    4096kB time=00:02:00.00 bitrate= 279.6kbits/s speed=1.0x\r' >&2
echo "" >&2
echo "video:4000kB audio:96kB subtitle:0kB" >&2
exit 0
"#;

/// Reports a timestamp that goes backwards.
const REWINDS: &str = r#"echo "  Duration: 00:01:40.00, start: 0.000000, bitrate: 1205 kb/s" >&2
printf 'frame=1 time=00:00:30.00 bitrate=1k speed=2.0x\r' >&2
printf 'frame=2 time=00:00:20.00 bitrate=1k speed=2.0x\r' >&2
printf 'frame=3 time=00:01:00.00 bitrate=1k speed=2.0x\r' >&2
echo "  Duration: 00:09:00.00, start: 0.000000, bitrate: 1205 kb/s" >&2
exit 0
"#;

const FAILS: &str = r#"echo "input.mkv: Invalid data found when processing input" >&2
exit 3
"#;

/// A ten second encode.
const SLOW: &str = r#"echo "  Duration: 00:00:10.00, start: 0.000000, bitrate: 1205 kb/s" >&2
i=0
while [ $i -lt 100 ]; do
  printf 'frame=%d time=00:00:0%d.00 bitrate=1k speed=1.0x\r' $i $((i / 10)) >&2
  sleep 0.1
  i=$((i + 1))
done
exit 0
"#;

pub struct Fixtures {
    dir: TempDir,
}

impl Fixtures {
    /// Answers `-encoders` with a listing containing `h264_nvenc`, otherwise
    /// records its arguments and completes a 120s encode.
    pub fn completes(&self) -> PathBuf {
        self.path("fake-ffmpeg-ok")
    }

    pub fn rewinds(&self) -> PathBuf {
        self.path("fake-ffmpeg-rewind")
    }

    /// Exits with code 3, also for the probe.
    pub fn fails(&self) -> PathBuf {
        self.path("fake-ffmpeg-fail")
    }

    /// Records its arguments and runs for ten seconds.
    pub fn slow(&self) -> PathBuf {
        self.path("fake-ffmpeg-slow")
    }

    /// Like `slow`, but ignores SIGTERM.
    pub fn stubborn(&self) -> PathBuf {
        self.path("fake-ffmpeg-stubborn")
    }

    /// Hangs on the capability probe; encodes complete immediately.
    pub fn hangs_on_probe(&self) -> PathBuf {
        self.path("fake-ffmpeg-hang")
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

pub static FIXTURES: Lazy<Fixtures> = Lazy::new(|| {
    let dir = tempfile::tempdir().expect("create fixture dir");
    let scripts = [
        ("fake-ffmpeg-ok", format!("{ENCODER_LISTING}{RECORD_ARGS}{COMPLETES}")),
        ("fake-ffmpeg-rewind", format!("{RECORD_ARGS}{REWINDS}")),
        ("fake-ffmpeg-fail", FAILS.to_string()),
        ("fake-ffmpeg-slow", format!("{RECORD_ARGS}{SLOW}")),
        ("fake-ffmpeg-stubborn", format!("trap '' TERM\n{RECORD_ARGS}{SLOW}")),
        (
            "fake-ffmpeg-hang",
            format!(
                "for arg in \"$@\"; do\n  if [ \"$arg\" = \"-encoders\" ]; then\n    sleep 5\n    exit 0\n  fi\ndone\n{RECORD_ARGS}exit 0\n"
            ),
        ),
    ];
    for (name, body) in scripts {
        write_script(&dir.path().join(name), &body);
    }
    Fixtures { dir }
});

pub fn write_script(path: &Path, body: &str) {
    fs::write(path, format!("#!/bin/sh\n{body}")).expect("write fixture script");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod fixture script");
}

/// A scratch directory holding an input file.
pub fn workspace() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create workspace");
    let input = dir.path().join("input.mkv");
    fs::write(&input, b"not really a video").expect("write input");
    (dir, input)
}

/// Whether a process with this pid still exists.
pub fn process_exists(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    kill(Pid::from_raw(pid as i32), None).is_ok()
}
