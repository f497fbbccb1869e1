//! YouTube video download (yt-dlp) and frame sampling (ffmpeg).

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, warn};
use url::Url;

use crate::models::{frame_file_stem, IMAGE_EXTENSIONS};

/// Base name of the downloaded video inside the run directory.
const VIDEO_STEM: &str = "video";

/// Check if a URL is a YouTube video URL.
pub fn is_youtube_url(url: &str) -> bool {
    url.contains("youtube.com/watch")
        || url.contains("youtube.com/embed/")
        || url.contains("youtube.com/shorts/")
        || url.contains("youtu.be/")
        || url.contains("youtube.com/v/")
}

/// Extract the video id from a YouTube URL.
///
/// Handles `watch?v=<id>`, `youtu.be/<id>`, `/embed/<id>`, `/shorts/<id>`
/// and `/v/<id>`.
pub fn video_id(source: &str) -> Option<String> {
    let url = Url::parse(source.trim()).ok()?;
    let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");

    let id = match host {
        "youtu.be" => url.path_segments()?.next().map(str::to_string),
        "youtube.com" | "music.youtube.com" | "youtube-nocookie.com" => {
            let mut segments = url.path_segments()?;
            match segments.next() {
                Some("watch") => url
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned()),
                Some("embed") | Some("shorts") | Some("v") | Some("live") => {
                    segments.next().map(str::to_string)
                }
                _ => None,
            }
        }
        _ => None,
    }?;

    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then_some(id)
}

/// Metadata returned by yt-dlp.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub fps: Option<f64>,
}

/// Result of a YouTube download.
#[derive(Debug)]
pub struct DownloadResult {
    pub video_path: PathBuf,
    pub metadata: VideoMetadata,
}

/// Download a YouTube video into `output_dir` as `video.mp4`.
pub async fn download_video(url: &str, output_dir: &Path) -> Result<DownloadResult> {
    info!("Downloading YouTube video: {}", url);

    let metadata = fetch_metadata(url).await?;
    debug!("Video metadata: {:?}", metadata);

    tokio::fs::create_dir_all(output_dir).await?;

    let output_template = output_dir
        .join(format!("{}.%(ext)s", VIDEO_STEM))
        .to_string_lossy()
        .to_string();

    let output = Command::new("yt-dlp")
        .args([
            "--no-playlist",
            "--format",
            "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best",
            "--merge-output-format",
            "mp4",
            "--output",
            &output_template,
            "--no-progress",
            "--quiet",
        ])
        .arg(url)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .context("Failed to execute yt-dlp")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("yt-dlp stderr: {}", stderr);
        anyhow::bail!("yt-dlp failed: {}", stderr.trim());
    }

    let expected_path = output_dir.join(format!("{}.mp4", VIDEO_STEM));
    if expected_path.exists() {
        info!("Downloaded: {:?}", expected_path);
        return Ok(DownloadResult {
            video_path: expected_path,
            metadata,
        });
    }

    // yt-dlp may keep another container when merging is not possible
    let mut entries = tokio::fs::read_dir(output_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.file_stem().is_some_and(|s| s == VIDEO_STEM) {
            info!("Downloaded: {:?}", path);
            return Ok(DownloadResult {
                video_path: path,
                metadata,
            });
        }
    }
    anyhow::bail!("Downloaded file not found for video {}", metadata.id)
}

/// Fetch video metadata without downloading.
pub async fn fetch_metadata(url: &str) -> Result<VideoMetadata> {
    let output = Command::new("yt-dlp")
        .args(["--dump-json", "--no-playlist"])
        .arg(url)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .context("Failed to execute yt-dlp for metadata")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("yt-dlp metadata fetch failed: {}", stderr.trim());
    }

    let metadata: VideoMetadata =
        serde_json::from_slice(&output.stdout).context("Failed to parse yt-dlp JSON output")?;

    Ok(metadata)
}

/// Sample frames from a video at `fps` frames per second.
///
/// Frames are written as `frame_0000.jpg`, `frame_0001.jpg`, ... and the
/// sorted list of frame paths is returned.
pub async fn extract_frames(video_path: &Path, frames_dir: &Path, fps: f64) -> Result<Vec<PathBuf>> {
    if !(fps.is_finite() && fps > 0.0) {
        anyhow::bail!("Sampling rate must be positive, got {}", fps);
    }
    tokio::fs::create_dir_all(frames_dir).await?;

    info!(
        "Extracting frames at {} fps from {}",
        fps,
        video_path.display()
    );

    let pattern = frames_dir
        .join(format!("frame_%04d.{}", IMAGE_EXTENSIONS[1]))
        .to_string_lossy()
        .to_string();

    let output = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-y", "-i"])
        .arg(video_path)
        .args(["-vf", &format!("fps={}", fps)])
        .args(["-start_number", "0", "-q:v", "2"])
        .arg(&pattern)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .context("Failed to execute ffmpeg")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("ffmpeg failed: {}", stderr.trim());
    }

    let frames = list_frames(frames_dir)?;
    if frames.is_empty() {
        anyhow::bail!("ffmpeg produced no frames from {}", video_path.display());
    }
    info!("Extracted {} frames", frames.len());
    Ok(frames)
}

/// Frame images in `frames_dir`, sorted by file name.
pub fn list_frames(frames_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut frames: Vec<PathBuf> = std::fs::read_dir(frames_dir)
        .with_context(|| format!("Failed to read {}", frames_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        })
        .collect();
    frames.sort();
    Ok(frames)
}

/// Expected image path for a sampling index.
pub fn frame_path(frames_dir: &Path, index: usize) -> PathBuf {
    frames_dir.join(format!("{}.{}", frame_file_stem(index), IMAGE_EXTENSIONS[1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_is_youtube_url() {
        assert!(is_youtube_url("https://www.youtube.com/watch?v=abc123"));
        assert!(is_youtube_url("https://youtube.com/embed/abc123"));
        assert!(is_youtube_url("https://youtu.be/abc123"));
        assert!(!is_youtube_url("https://example.com/video.mp4"));
        assert!(!is_youtube_url("https://vimeo.com/123456"));
    }

    #[test]
    fn test_video_id() {
        assert_eq!(
            video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            video_id("https://youtu.be/dQw4w9WgXcQ?si=x").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            video_id("https://www.youtube.com/embed/abc_-12").as_deref(),
            Some("abc_-12")
        );
        assert_eq!(
            video_id("https://youtube.com/shorts/xyz789").as_deref(),
            Some("xyz789")
        );
    }

    #[test]
    fn test_video_id_rejects_bad_urls() {
        assert_eq!(video_id("https://www.youtube.com/watch"), None);
        assert_eq!(video_id("https://www.youtube.com/watch?v="), None);
        assert_eq!(video_id("https://vimeo.com/123456"), None);
        assert_eq!(video_id("not a url"), None);
        assert_eq!(video_id("https://youtu.be/a%20b"), None);
    }

    #[test]
    fn test_list_frames_sorted_images_only() {
        let dir = tempdir().unwrap();
        for name in ["frame_0002.jpg", "frame_0000.jpg", "frame_0001.png", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let frames = list_frames(dir.path()).unwrap();
        let names: Vec<String> = frames
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["frame_0000.jpg", "frame_0001.png", "frame_0002.jpg"]);
    }

    #[test]
    fn test_frame_path() {
        assert_eq!(
            frame_path(Path::new("/run/frames"), 7),
            PathBuf::from("/run/frames/frame_0007.jpg")
        );
    }
}
