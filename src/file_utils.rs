use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use log::{debug, warn};
use rand::seq::IndexedRandom;
use walkdir::WalkDir;

// @module: File and directory utilities

/// Prefix of intermediate files removed after a run
pub const TEMP_PREFIX: &str = "temp_";

/// Video extensions accepted as backgrounds
pub const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "mov", "mkv", "webm"];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Find files with any of `extensions` under `dir`, sorted by path
    pub fn find_files<P: AsRef<Path>>(dir: P, extensions: &[&str]) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension() {
                    let ext = ext.to_string_lossy();
                    if extensions.iter().any(|e| ext.eq_ignore_ascii_case(e.trim_start_matches('.'))) {
                        result.push(path.to_path_buf());
                    }
                }
            }
        }

        result.sort();
        Ok(result)
    }

    /// Pick a background video: `source` itself if it is a file, otherwise a
    /// random video found under it
    pub fn pick_background<P: AsRef<Path>>(source: P) -> Result<PathBuf> {
        let source = source.as_ref();
        if Self::file_exists(source) {
            return Ok(source.to_path_buf());
        }
        if !Self::dir_exists(source) {
            return Err(anyhow!("Background source does not exist: {:?}", source));
        }

        let candidates = Self::find_files(source, &VIDEO_EXTENSIONS)?;
        candidates
            .choose(&mut rand::rng())
            .cloned()
            .ok_or_else(|| anyhow!("No background videos found in {:?}", source))
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path).with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content).with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Delete intermediate files in `dir`. Failures are logged and skipped.
    pub fn cleanup_temp_files<P: AsRef<Path>>(dir: P) -> usize {
        let dir = dir.as_ref();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Could not list {:?} for cleanup: {}", dir, e);
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            if !path.is_file() || !(name.starts_with(TEMP_PREFIX) || name.ends_with(".tmp")) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove temporary file {:?}: {}", path, e),
            }
        }
        debug!("Removed {} temporary files from {:?}", removed, dir);
        removed
    }
}

/// Paths of everything one voice run writes
#[derive(Debug, Clone, PartialEq)]
pub struct RunArtifacts {
    /// `<root>/<timestamp>_<voice>/`
    pub dir: PathBuf,
    /// `<voice>_<YYYYMMDD>`
    pub base: String,
    pub text: PathBuf,
    pub processed_text: PathBuf,
    pub audio: PathBuf,
    pub audio_converted: PathBuf,
    pub subtitles: PathBuf,
    pub final_video: PathBuf,
}

impl RunArtifacts {
    /// Layout for `voice` in a run started at `started`
    pub fn new<P: AsRef<Path>>(root: P, started: &DateTime<Local>, voice: &str) -> Self {
        let timestamp = started.format("%Y%m%d_%H%M%S").to_string();
        let dir = root.as_ref().join(format!("{}_{}", timestamp, voice));
        let base = format!("{}_{}", voice, started.format("%Y%m%d"));
        let file = |suffix: &str| dir.join(format!("{}_{}", base, suffix));

        Self {
            text: file("text.txt"),
            processed_text: file("processed_text.txt"),
            audio: file("audio.mp3"),
            audio_converted: file("audio_converted.wav"),
            subtitles: file("subtitles.ass"),
            final_video: file("final.mp4"),
            dir,
            base,
        }
    }

    /// Create the run directory
    pub fn create(&self) -> Result<()> {
        FileManager::ensure_dir(&self.dir)
    }

    /// Path for an intermediate file, removed by `cleanup`
    pub fn temp_file(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}{}", TEMP_PREFIX, name))
    }

    /// Best-effort removal of intermediate files
    pub fn cleanup(&self) -> usize {
        FileManager::cleanup_temp_files(&self.dir)
    }
}
