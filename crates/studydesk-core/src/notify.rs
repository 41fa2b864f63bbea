//! Notification cue played when a countdown reaches zero.
//!
//! Playback is best-effort: [`play_best_effort`] logs failures and never
//! reports them back to the timer.

use std::io::Write;
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::NotifyError;

#[cfg(feature = "sound")]
pub use sound::SoundFileNotifier;

/// Something that can emit the end-of-session cue.
pub trait Notifier: Send + Sync {
    /// Identifier used in logs (e.g. "bell", "sound").
    fn name(&self) -> &str;

    /// Emit the cue once.
    fn play(&self) -> Result<(), NotifyError>;
}

/// Play the cue, swallowing (and logging) any failure.
pub fn play_best_effort(notifier: &dyn Notifier) {
    match notifier.play() {
        Ok(()) => debug!(notifier = notifier.name(), "notification played"),
        Err(e) => warn!(notifier = notifier.name(), error = %e, "notification failed"),
    }
}

/// Writes an ASCII BEL to the wrapped writer (stderr by default).
pub struct TerminalBell<W: Write + Send = std::io::Stderr> {
    out: Mutex<W>,
}

impl TerminalBell<std::io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

impl<W: Write + Send> TerminalBell<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> Notifier for TerminalBell<W> {
    fn name(&self) -> &str {
        "bell"
    }

    fn play(&self) -> Result<(), NotifyError> {
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        out.write_all(b"\x07")?;
        out.flush()?;
        Ok(())
    }
}

/// Does nothing. Used when the bell is turned off or in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn name(&self) -> &str {
        "silent"
    }

    fn play(&self) -> Result<(), NotifyError> {
        Ok(())
    }
}

#[cfg(feature = "sound")]
mod sound {
    use std::fs::File;
    use std::io::BufReader;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use rodio::{Decoder, OutputStream, Sink};
    use tracing::{debug, warn};

    use super::{play_best_effort, Notifier, TerminalBell};
    use crate::error::NotifyError;

    /// Plays an audio file (wav, ogg or mp3) on the default output device.
    ///
    /// Decoding and playback run on a detached thread. When no output device
    /// can be opened the fallback notifier (the terminal bell unless
    /// replaced) is played instead.
    pub struct SoundFileNotifier {
        path: PathBuf,
        volume: f32,
        fallback: Arc<dyn Notifier>,
    }

    impl SoundFileNotifier {
        pub fn new(path: impl Into<PathBuf>) -> Result<Self, NotifyError> {
            let path = path.into();
            if !path.is_file() {
                return Err(NotifyError::SoundFileMissing(path));
            }
            Ok(Self {
                path,
                volume: 1.0,
                fallback: Arc::new(TerminalBell::stderr()),
            })
        }

        /// Volume in percent, capped at 100.
        pub fn with_volume(mut self, percent: u8) -> Self {
            self.volume = f32::from(percent.min(100)) / 100.0;
            self
        }

        pub fn with_fallback(mut self, fallback: Arc<dyn Notifier>) -> Self {
            self.fallback = fallback;
            self
        }

        pub fn path(&self) -> &Path {
            &self.path
        }
    }

    impl Notifier for SoundFileNotifier {
        fn name(&self) -> &str {
            "sound"
        }

        fn play(&self) -> Result<(), NotifyError> {
            // Opened here so a file removed after startup is reported.
            let file = File::open(&self.path).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => NotifyError::SoundFileMissing(self.path.clone()),
                _ => NotifyError::Io(e),
            })?;

            let path = self.path.clone();
            let volume = self.volume;
            let fallback = Arc::clone(&self.fallback);
            std::thread::spawn(move || {
                let (_stream, stream_handle) = match OutputStream::try_default() {
                    Ok(output) => output,
                    Err(e) => {
                        debug!(error = %e, "no audio output, using fallback cue");
                        play_best_effort(fallback.as_ref());
                        return;
                    }
                };
                let source = match Decoder::new(BufReader::new(file)) {
                    Ok(source) => source,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "cannot decode sound file");
                        play_best_effort(fallback.as_ref());
                        return;
                    }
                };
                let sink = match Sink::try_new(&stream_handle) {
                    Ok(sink) => sink,
                    Err(e) => {
                        debug!(error = %e, "cannot open audio sink, using fallback cue");
                        play_best_effort(fallback.as_ref());
                        return;
                    }
                };

                sink.set_volume(volume);
                sink.append(source);
                sink.sleep_until_end();
            });
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl Notifier for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn play(&self) -> Result<(), NotifyError> {
            Err(NotifyError::Io(std::io::ErrorKind::BrokenPipe.into()))
        }
    }

    #[test]
    fn bell_writes_bel_byte() {
        let bell = TerminalBell::new(Vec::new());
        bell.play().unwrap();
        bell.play().unwrap();
        assert_eq!(bell.into_inner(), b"\x07\x07");
    }

    #[test]
    fn best_effort_swallows_failures() {
        play_best_effort(&Failing);
        play_best_effort(&SilentNotifier);
    }

    #[cfg(feature = "sound")]
    #[test]
    fn sound_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("cue.ogg");
        assert!(matches!(
            SoundFileNotifier::new(&missing),
            Err(NotifyError::SoundFileMissing(p)) if p == missing
        ));
        // A directory is not a playable file either.
        assert!(SoundFileNotifier::new(dir.path()).is_err());
    }

    #[cfg(feature = "sound")]
    #[test]
    fn sound_file_removed_after_startup_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cue.wav");
        std::fs::write(&path, b"RIFF").unwrap();

        let notifier = SoundFileNotifier::new(&path).unwrap().with_volume(250);
        assert_eq!(notifier.name(), "sound");
        assert_eq!(notifier.path(), path.as_path());

        std::fs::remove_file(&path).unwrap();
        assert!(matches!(
            notifier.play(),
            Err(NotifyError::SoundFileMissing(_))
        ));
    }
}
