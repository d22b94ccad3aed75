use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Result, anyhow};

pub const DEFAULT_AUDIO_PATH: &str = "./assets/ppe-warning.mp3";
const AUDIO_EXTENSIONS: [&str; 2] = [".mp3", ".aac"];

/// True when `filename` ends in one of the supported audio extensions.
pub fn validate_audio_file(filename: &str) -> bool {
    AUDIO_EXTENSIONS.iter().any(|ext| filename.ends_with(ext))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidAudioFile(pub String);

impl fmt::Display for InvalidAudioFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "The audio file is not a valid type. Audio file must be of type .mp3 or .aac."
        )
    }
}

impl std::error::Error for InvalidAudioFile {}

/// Warning sound played on a confident non-compliance answer.
/// Only the extension is checked up front; the file is first opened when played.
#[derive(Debug, Clone)]
pub struct AudioAlert {
    path: PathBuf,
}

impl AudioAlert {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, InvalidAudioFile> {
        let path = path.into();
        let name = path.to_string_lossy().into_owned();
        if validate_audio_file(&name) {
            Ok(Self { path })
        } else {
            Err(InvalidAudioFile(name))
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Plays an audio file to completion.
pub trait AlertPlayer {
    fn play(&self, path: &Path) -> Result<()>;
}

/// Delegates playback to an external command-line player.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandPlayer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// `afplay` on macOS, `ffplay` elsewhere.
    pub fn system_default() -> Self {
        if cfg!(target_os = "macos") {
            Self::new("afplay", vec![])
        } else {
            Self::new(
                "ffplay",
                ["-nodisp", "-autoexit", "-loglevel", "error"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            )
        }
    }
}

impl AlertPlayer for CommandPlayer {
    fn play(&self, path: &Path) -> Result<()> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .output()
            .map_err(|e| anyhow!("{} not available: {}", self.program, e))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(anyhow!(
                "{} could not play {}: {}",
                self.program,
                path.display(),
                stderr.trim()
            ))
        }
    }
}
