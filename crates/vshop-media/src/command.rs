//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Where FFmpeg writes its output.
#[derive(Debug, Clone)]
enum OutputTarget {
    File(PathBuf),
    Stdout,
}

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file or stdout
    output: OutputTarget,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a command writing to a file.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self::with_target(input, OutputTarget::File(output.as_ref().to_path_buf()))
    }

    /// Create a command writing to stdout (`pipe:1`).
    pub fn to_stdout(input: impl AsRef<Path>) -> Self {
        Self::with_target(input, OutputTarget::Stdout)
    }

    fn with_target(input: impl AsRef<Path>, output: OutputTarget) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output,
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Set seek position (before input).
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Extract single frame.
    pub fn single_frame(self) -> Self {
        self.output_arg("-frames:v").output_arg("1")
    }

    /// Emit raw packed RGB24 pixels.
    pub fn raw_rgb(self) -> Self {
        self.output_arg("-f")
            .output_arg("rawvideo")
            .output_arg("-pix_fmt")
            .output_arg("rgb24")
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        args.extend(self.input_args.clone());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.clone());

        match &self.output {
            OutputTarget::File(path) => args.push(path.to_string_lossy().to_string()),
            OutputTarget::Stdout => args.push("pipe:1".to_string()),
        }

        args
    }
}

/// Runner for FFmpeg commands.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run an FFmpeg command that writes a file.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run_capture(cmd).await.map(|_| ())
    }

    /// Run an FFmpeg command and return what it wrote to stdout.
    pub async fn run_capture(&self, cmd: &FfmpegCommand) -> MediaResult<Vec<u8>> {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match self.timeout_secs {
            Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), child).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!("FFmpeg timed out after {} seconds", secs);
                    return Err(MediaError::ffmpeg_failed(
                        format!("timed out after {secs} seconds"),
                        None,
                        None,
                    ));
                }
            },
            None => child.await?,
        };

        if !output.status.success() {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some(String::from_utf8_lossy(&output.stderr).to_string()),
                output.status.code(),
            ));
        }

        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_grab_args() {
        let cmd = FfmpegCommand::to_stdout("/videos/in.mp4")
            .seek(5.0)
            .single_frame()
            .raw_rgb();
        let args = cmd.build_args();

        assert_eq!(args[0], "-y");
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input);
        assert_eq!(args[ss + 1], "5.000");
        assert!(args.contains(&"rgb24".to_string()));
        assert_eq!(args.last().unwrap(), "pipe:1");
    }

    #[test]
    fn test_file_output_args() {
        let cmd = FfmpegCommand::new("in.mp4", "out.jpg")
            .single_frame()
            .video_filter("scale=480:-2");
        let args = cmd.build_args();
        assert_eq!(args.last().unwrap(), "out.jpg");
        assert!(args.contains(&"scale=480:-2".to_string()));
    }
}
