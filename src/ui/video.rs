/// Video finale: hands the clip to an external player process.
///
/// The terminal can't show video, so the configured command (by default
/// `mpv --really-quiet`) is spawned with the clip path as its last argument.
/// The player is fire-and-forget; it is killed when the greeting exits.

use std::path::Path;
use std::process::{Child, Command, Stdio};

use crate::error::MediaError;

pub struct VideoPlayer {
    command: Vec<String>,
    child: Option<Child>,
}

impl VideoPlayer {
    pub fn new(command: Vec<String>) -> Self {
        VideoPlayer { command, child: None }
    }

    /// Start playback. A second call while a player is running is ignored.
    pub fn play(&mut self, clip: &Path) -> Result<(), MediaError> {
        if self.is_playing() {
            return Ok(());
        }
        let (program, args) = self.command.split_first().ok_or(MediaError::NoVideoPlayer)?;
        if !clip.exists() {
            return Err(MediaError::Open {
                path: clip.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        let child = Command::new(program)
            .args(args)
            .arg(clip)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| MediaError::Launch { command: program.clone(), source })?;
        log::info!("video started: {} {}", program, clip.display());
        self.child = Some(child);
        Ok(())
    }

    pub fn is_playing(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    pub fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if matches!(child.try_wait(), Ok(None)) {
                if let Err(e) = child.kill() {
                    log::warn!("could not stop video player: {e}");
                }
            }
            let _ = child.wait();
        }
    }
}

impl Drop for VideoPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip() -> std::path::PathBuf {
        // Any existing file will do as a stand-in clip.
        std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml")
    }

    #[test]
    fn empty_command_is_rejected() {
        let mut v = VideoPlayer::new(vec![]);
        assert!(matches!(v.play(&clip()), Err(MediaError::NoVideoPlayer)));
    }

    #[test]
    fn missing_clip_is_rejected() {
        let mut v = VideoPlayer::new(vec!["mpv".into()]);
        let err = v.play(Path::new("/nonexistent/finale.mp4")).expect_err("missing clip");
        assert!(matches!(err, MediaError::Open { .. }));
        assert!(!v.is_playing());
    }

    #[test]
    fn missing_player_reports_launch_error() {
        let mut v = VideoPlayer::new(vec!["wishcard-no-such-player-xyz".into()]);
        let err = v.play(&clip()).expect_err("no such program");
        assert!(matches!(err, MediaError::Launch { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn player_runs_and_is_reaped() {
        let mut v = VideoPlayer::new(vec!["true".into()]);
        assert!(v.play(&clip()).is_ok());
        v.stop();
        assert!(!v.is_playing());
    }
}
