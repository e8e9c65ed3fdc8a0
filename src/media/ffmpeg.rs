/*!
 * ffmpeg/ffprobe subprocess wrappers.
 *
 * Every invocation runs under a timeout; stderr is filtered down to the
 * lines that explain a failure before it is reported.
 */

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info};
use rand::Rng;
use tokio::process::Command;

use crate::app_config::VideoConfig;
use crate::errors::MediaError;
use crate::media::MediaTools;

/// Media operations backed by the ffmpeg command line tools
#[derive(Debug, Clone)]
pub struct FfmpegTools {
    video: VideoConfig,
    timeout: Duration,
}

impl FfmpegTools {
    pub fn new(video: &VideoConfig) -> Self {
        Self {
            video: video.clone(),
            timeout: Duration::from_secs(video.ffmpeg_timeout_secs),
        }
    }

    /// Run ffmpeg with `args`, overwriting outputs
    async fn ffmpeg(&self, args: &[String]) -> Result<(), MediaError> {
        debug!("ffmpeg {}", args.join(" "));
        let future = Command::new("ffmpeg")
            .arg("-y")
            .arg("-hide_banner")
            .args(args)
            .kill_on_drop(true)
            .output();

        let output = tokio::select! {
            result = future => result.map_err(|e| MediaError::ToolFailed {
                tool: "ffmpeg".to_string(),
                message: format!("failed to execute: {}", e),
            })?,
            _ = tokio::time::sleep(self.timeout) => {
                return Err(MediaError::Timeout {
                    tool: "ffmpeg".to_string(),
                    secs: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let filtered = filter_ffmpeg_stderr(&stderr);
            error!("ffmpeg failed: {}", filtered);
            return Err(MediaError::ToolFailed {
                tool: "ffmpeg".to_string(),
                message: filtered,
            });
        }
        Ok(())
    }

    /// Copy a random window of `target` seconds out of a longer video
    async fn extract_random_segment(&self, input: &Path, output: &Path, total: f64, target: f64) -> Result<(), MediaError> {
        let latest_start = (total - target).max(0.0);
        let start = if latest_start > 0.0 {
            rand::rng().random_range(0.0..latest_start)
        } else {
            0.0
        };
        info!("Using background segment {:.2}s..{:.2}s of {:.2}s", start, start + target, total);

        self.ffmpeg(&[
            "-ss".into(),
            format!("{:.3}", start),
            "-i".into(),
            path_arg(input),
            "-t".into(),
            format!("{:.3}", target),
            "-c".into(),
            "copy".into(),
            path_arg(output),
        ])
        .await
    }

    /// Repeat a short video until it covers `target` seconds
    async fn loop_video(&self, input: &Path, output: &Path, total: f64, target: f64, work_dir: &Path) -> Result<(), MediaError> {
        let repeats = (target / total.max(0.1)).ceil().max(1.0) as usize + 1;
        let list_path = work_dir.join("temp_concat_list.txt");
        let absolute = std::fs::canonicalize(input).unwrap_or_else(|_| input.to_path_buf());
        let line = format!("file '{}'\n", absolute.to_string_lossy().replace('\'', "'\\''"));

        tokio::fs::write(&list_path, line.repeat(repeats))
            .await
            .map_err(|e| MediaError::ToolFailed {
                tool: "ffmpeg".to_string(),
                message: format!("cannot write concat list: {}", e),
            })?;
        info!("Looping {:.2}s background {} times to cover {:.2}s", total, repeats, target);

        self.ffmpeg(&[
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            path_arg(&list_path),
            "-t".into(),
            format!("{:.3}", target),
            "-c".into(),
            "copy".into(),
            path_arg(output),
        ])
        .await
    }

    /// Crop to 9:16 and scale to the configured size, dropping audio
    async fn crop_to_vertical(&self, input: &Path, output: &Path) -> Result<(), MediaError> {
        self.ffmpeg(&[
            "-i".into(),
            path_arg(input),
            "-vf".into(),
            format!("crop=ih*9/16:ih,scale={}:{}", self.video.width, self.video.height),
            "-c:v".into(),
            self.video.video_codec.clone(),
            "-preset".into(),
            self.video.preset.clone(),
            "-crf".into(),
            self.video.crf.to_string(),
            "-an".into(),
            path_arg(output),
        ])
        .await
    }
}

#[async_trait]
impl MediaTools for FfmpegTools {
    async fn probe_duration(&self, path: &Path) -> Result<f64, MediaError> {
        let future = Command::new("ffprobe")
            .args(["-v", "error", "-show_entries", "format=duration", "-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(path)
            .kill_on_drop(true)
            .output();

        let output = tokio::select! {
            result = future => result.map_err(|e| MediaError::ToolFailed {
                tool: "ffprobe".to_string(),
                message: format!("failed to execute: {}", e),
            })?,
            _ = tokio::time::sleep(Duration::from_secs(60)) => {
                return Err(MediaError::Timeout { tool: "ffprobe".to_string(), secs: 60 });
            }
        };

        if !output.status.success() {
            return Err(MediaError::ToolFailed {
                tool: "ffprobe".to_string(),
                message: filter_ffmpeg_stderr(&String::from_utf8_lossy(&output.stderr)),
            });
        }

        parse_duration(&String::from_utf8_lossy(&output.stdout))
    }

    async fn convert_audio(&self, input: &Path, output: &Path) -> Result<(), MediaError> {
        let delay = self.video.lead_in_silence_ms;
        self.ffmpeg(&[
            "-i".into(),
            path_arg(input),
            "-af".into(),
            format!("adelay={}:all=1", delay),
            "-ac".into(),
            "1".into(),
            "-ar".into(),
            "16000".into(),
            "-c:a".into(),
            "pcm_s16le".into(),
            path_arg(output),
        ])
        .await
    }

    async fn prepare_background(&self, background: &Path, target: f64, work_dir: &Path) -> Result<PathBuf, MediaError> {
        let total = self.probe_duration(background).await?;
        let segment = work_dir.join("temp_segment.mp4");

        if total < target {
            self.loop_video(background, &segment, total, target, work_dir).await?;
        } else {
            self.extract_random_segment(background, &segment, total, target).await?;
        }

        let cropped = work_dir.join("temp_cropped.mp4");
        self.crop_to_vertical(&segment, &cropped).await?;
        Ok(cropped)
    }

    async fn composite(&self, video: &Path, subtitles: &Path, audio: &Path, output: &Path) -> Result<(), MediaError> {
        let work_dir = output.parent().unwrap_or_else(|| Path::new("."));
        let subtitled = work_dir.join("temp_subtitled.mp4");

        self.ffmpeg(&[
            "-i".into(),
            path_arg(video),
            "-vf".into(),
            format!("subtitles='{}'", escape_filter_path(subtitles)),
            "-c:v".into(),
            self.video.video_codec.clone(),
            "-preset".into(),
            self.video.preset.clone(),
            "-crf".into(),
            self.video.crf.to_string(),
            "-c:a".into(),
            "copy".into(),
            path_arg(&subtitled),
        ])
        .await?;

        self.ffmpeg(&[
            "-i".into(),
            path_arg(&subtitled),
            "-i".into(),
            path_arg(audio),
            "-map".into(),
            "0:v:0".into(),
            "-map".into(),
            "1:a:0".into(),
            "-c:v".into(),
            "copy".into(),
            "-c:a".into(),
            self.video.audio_codec.clone(),
            "-b:a".into(),
            self.video.audio_bitrate.clone(),
            "-shortest".into(),
            path_arg(output),
        ])
        .await
    }

    async fn trim_to_duration(&self, video: &Path, duration: f64) -> Result<(), MediaError> {
        let trimmed = video.with_extension("trimmed.mp4");
        self.ffmpeg(&[
            "-i".into(),
            path_arg(video),
            "-t".into(),
            format!("{:.3}", duration),
            "-c".into(),
            "copy".into(),
            path_arg(&trimmed),
        ])
        .await?;

        tokio::fs::rename(&trimmed, video)
            .await
            .map_err(|e| MediaError::ToolFailed {
                tool: "ffmpeg".to_string(),
                message: format!("cannot replace {} with trimmed video: {}", video.display(), e),
            })
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Parse ffprobe's `format=duration` output
pub fn parse_duration(stdout: &str) -> Result<f64, MediaError> {
    let text = stdout.trim();
    let duration: f64 = text
        .parse()
        .map_err(|_| MediaError::InvalidDuration(format!("'{}' is not a number", text)))?;
    if !duration.is_finite() || duration <= 0.0 {
        return Err(MediaError::InvalidDuration(format!("{} is not positive", duration)));
    }
    Ok(duration)
}

/// Escape a path for use inside an ffmpeg filter argument
pub fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', "\\'")
}

/// Keep only the stderr lines that describe the failure, dropping the
/// version banner, build configuration and stream metadata.
pub fn filter_ffmpeg_stderr(stderr: &str) -> String {
    let noise_prefixes = [
        "ffmpeg version",
        "ffprobe version",
        "built with",
        "configuration:",
        "lib",
        "Input #",
        "Metadata:",
        "Duration:",
        "Stream #",
        "Output #",
        "Stream mapping:",
        "Press [q]",
        "frame=",
        "size=",
        "encoder",
        "handler_name",
        "major_brand",
        "minor_version",
        "compatible_brands",
        "creation_time",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !noise_prefixes.iter().any(|p| line.starts_with(p)))
        .collect();

    if meaningful.is_empty() {
        "unknown ffmpeg error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}
