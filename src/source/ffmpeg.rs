// SYNOID Panel FFmpeg Source
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Decodes a video through an ffmpeg child process emitting raw rgb24 frames
// on stdout. Native size and frame rate come from ffprobe. Looping respawns
// the decoder, which only works for inputs that can be reopened.

use std::ffi::OsString;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use image::RgbImage;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{FrameSource, Next, SourceError};
use crate::engine::{Frame, Resolution};

/// Input name that reads the container from stdin.
pub const STDIN_INPUT: &str = "-";

/// What ffprobe reports about the first video stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeInfo {
    pub native: Resolution,
    pub fps: Option<f64>,
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Parse an ffprobe rational such as `30000/1001` or a plain number.
/// Zero and undefined rates (`0/0`) yield `None`.
pub fn parse_frame_rate(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let rate = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Parse ffprobe's JSON output (`-of json`).
pub fn parse_probe(json: &str) -> Result<ProbeInfo, SourceError> {
    let output: ProbeOutput =
        serde_json::from_str(json).map_err(|e| SourceError::Probe(format!("bad ffprobe JSON: {}", e)))?;

    let stream = output
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::Probe("no video stream found".to_string()))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(SourceError::Probe("video stream has no dimensions".to_string())),
    };

    let fps = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| stream.avg_frame_rate.as_deref().and_then(parse_frame_rate));

    Ok(ProbeInfo {
        native: Resolution::new(width, height),
        fps,
    })
}

/// Describe the first video stream of `input` using ffprobe.
pub fn probe(input: &Path) -> Result<ProbeInfo, SourceError> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate,avg_frame_rate",
            "-of",
            "json",
        ])
        .arg(input)
        .stdin(Stdio::null())
        .output()?;

    if !output.status.success() {
        return Err(SourceError::Probe(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    parse_probe(&String::from_utf8_lossy(&output.stdout))
}

/// Video decoded by an ffmpeg child process.
pub struct FfmpegSource {
    input: PathBuf,
    target: Resolution,
    /// Size of the raw frames ffmpeg writes to the pipe
    decoded: Resolution,
    /// Let ffmpeg scale (stdin inputs cannot be probed up front)
    scale_in_decoder: bool,
    fps: Option<f64>,
    seekable: bool,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    cursor: u64,
}

impl FfmpegSource {
    /// Open `input` (a file path, a stream URL, or `-` for stdin) and start
    /// decoding.
    pub fn open(input: &Path, target: Resolution) -> Result<Self, SourceError> {
        let mut source = if input == Path::new(STDIN_INPUT) {
            info!("[SOURCE] Reading container from stdin (looping unavailable)");
            Self::unstarted(input, target, target, None, false, true)
        } else {
            let seekable = match std::fs::metadata(input) {
                Ok(meta) => meta.is_file(),
                Err(e) if input.to_string_lossy().contains("://") => {
                    debug!("[SOURCE] {:?} is not a local file ({}), treating as a stream", input, e);
                    false
                }
                Err(e) => return Err(SourceError::Io(e)),
            };
            let info = probe(input)?;
            info!(
                "[SOURCE] {:?}: {} native, {} fps reported, seekable={}",
                input,
                info.native,
                info.fps.map(|f| format!("{:.2}", f)).unwrap_or_else(|| "no".to_string()),
                seekable
            );
            Self::unstarted(input, target, info.native, info.fps, seekable, false)
        };

        source.spawn()?;
        Ok(source)
    }

    fn unstarted(
        input: &Path,
        target: Resolution,
        decoded: Resolution,
        fps: Option<f64>,
        seekable: bool,
        scale_in_decoder: bool,
    ) -> Self {
        Self {
            input: input.to_path_buf(),
            target,
            decoded,
            scale_in_decoder,
            fps,
            seekable,
            child: None,
            stdout: None,
            cursor: 0,
        }
    }

    /// Arguments for the decoder process. Probed inputs keep their stored
    /// orientation so the pipe carries exactly `decoded`-sized frames.
    fn decoder_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-v".into(), "error".into()];
        if self.scale_in_decoder {
            args.extend(["-i".into(), self.input.clone().into_os_string()]);
            args.push("-vf".into());
            args.push(format!("scale={}:{}", self.target.width, self.target.height).into());
        } else {
            args.extend(["-nostdin".into(), "-noautorotate".into()]);
            args.extend(["-i".into(), self.input.clone().into_os_string()]);
        }
        args.extend(["-an", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"].map(OsString::from));
        args
    }

    fn spawn(&mut self) -> Result<(), SourceError> {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(self.decoder_args())
            .stdin(if self.scale_in_decoder { Stdio::inherit() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = cmd.spawn()?;
        let stdout = child.stdout.take().ok_or_else(|| {
            SourceError::Io(std::io::Error::new(ErrorKind::BrokenPipe, "ffmpeg stdout unavailable"))
        })?;

        debug!("[SOURCE] ffmpeg decoder started (pid {})", child.id());
        self.child = Some(child);
        self.stdout = Some(stdout);
        self.cursor = 0;
        Ok(())
    }

    fn kill(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    pub fn is_seekable(&self) -> bool {
        self.seekable
    }
}

impl FrameSource for FfmpegSource {
    fn next_frame(&mut self) -> Next {
        let Some(stdout) = self.stdout.as_mut() else {
            return Next::EndOfStream;
        };

        let mut raw = vec![0u8; self.decoded.pixels() * 3];
        match stdout.read_exact(&mut raw) {
            Ok(()) => {}
            Err(e) => {
                if e.kind() == ErrorKind::UnexpectedEof {
                    debug!("[SOURCE] ffmpeg reached end of stream after {} frames", self.cursor);
                } else {
                    warn!("[SOURCE] ffmpeg pipe read failed after {} frames: {}", self.cursor, e);
                }
                self.kill();
                return Next::EndOfStream;
            }
        }

        let Some(image) = RgbImage::from_raw(self.decoded.width, self.decoded.height, raw) else {
            warn!("[SOURCE] Raw frame does not match {}", self.decoded);
            self.kill();
            return Next::EndOfStream;
        };

        let seq = self.cursor;
        self.cursor += 1;
        Next::Frame(Frame::normalized(seq, image, self.target))
    }

    fn restart(&mut self) -> Result<(), SourceError> {
        if !self.seekable {
            return Err(SourceError::NotSeekable(self.input.display().to_string()));
        }
        self.kill();
        self.spawn()
    }

    fn reported_fps(&self) -> Option<f64> {
        self.fps
    }

    fn release(&mut self) {
        if self.child.is_some() {
            debug!("[SOURCE] Releasing ffmpeg decoder for {:?}", self.input);
        }
        self.kill();
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        let ntsc = parse_frame_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("0/1"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }

    #[test]
    fn test_parse_probe_json() {
        let json = r#"{
            "programs": [],
            "streams": [
                { "width": 480, "height": 360, "r_frame_rate": "0/0", "avg_frame_rate": "15/1" }
            ]
        }"#;
        let info = parse_probe(json).unwrap();
        assert_eq!(info.native, Resolution::new(480, 360));
        assert_eq!(info.fps, Some(15.0));
    }

    #[test]
    fn test_parse_probe_without_video_stream() {
        let err = parse_probe(r#"{ "streams": [] }"#).unwrap_err();
        assert!(matches!(err, SourceError::Probe(_)));

        let err = parse_probe(r#"{ "streams": [ { "r_frame_rate": "30/1" } ] }"#).unwrap_err();
        assert!(err.to_string().contains("dimensions"));
    }

    #[test]
    fn test_parse_probe_keeps_stored_size_of_rotated_stream() {
        let json = r#"{
            "streams": [
                {
                    "width": 1920, "height": 1080, "r_frame_rate": "30/1",
                    "side_data_list": [ { "side_data_type": "Display Matrix", "rotation": -90 } ],
                    "tags": { "rotate": "90" }
                }
            ]
        }"#;
        let info = parse_probe(json).unwrap();
        assert_eq!(info.native, Resolution::new(1920, 1080));
    }

    #[test]
    fn test_probed_input_decodes_without_autorotation() {
        let source = FfmpegSource::unstarted(
            Path::new("clip.mp4"),
            Resolution::new(320, 240),
            Resolution::new(1920, 1080),
            Some(30.0),
            true,
            false,
        );
        let args = source.decoder_args();
        let at = |flag: &str| args.iter().position(|a| a == flag);
        let input = at("-i").unwrap();
        assert!(at("-noautorotate").unwrap() < input, "input option must precede -i");
        assert_eq!(args[input + 1], OsString::from("clip.mp4"));
        assert!(at("-vf").is_none());
    }

    #[test]
    fn test_stdin_input_is_scaled_by_decoder() {
        let source = FfmpegSource::unstarted(
            Path::new(STDIN_INPUT),
            Resolution::new(320, 240),
            Resolution::new(320, 240),
            None,
            false,
            true,
        );
        let args = source.decoder_args();
        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[vf + 1], OsString::from("scale=320:240"));
        assert!(!args.iter().any(|a| a == "-noautorotate"));
    }

    #[test]
    fn test_stdin_source_is_not_seekable() {
        let mut source = FfmpegSource::unstarted(
            Path::new(STDIN_INPUT),
            Resolution::new(8, 8),
            Resolution::new(8, 8),
            None,
            false,
            true,
        );
        assert!(matches!(source.restart(), Err(SourceError::NotSeekable(_))));
        assert!(matches!(source.next_frame(), Next::EndOfStream));
    }
}
