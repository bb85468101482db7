//! Audio playback and play counting
//!
//! A play is counted when a clip plays to its end; pausing, resuming and
//! replaying a partial clip do not count.

use parking_lot::Mutex;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::{Child, Command};
use tracing::{debug, warn};
use url::Url;

use crate::core::context::AppContext;
use crate::core::error::{Error, Result};
use crate::core::request::{Resource, Ticket};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    Started,
    Paused,
    Resumed,
    Ended,
}

/// Something that can play one media resource at a time
pub trait MediaBackend: Send {
    /// Replace the source; playback is stopped
    fn load(&mut self, url: &Url) -> Result<()>;

    fn play(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    fn stop(&mut self);

    fn has_source(&self) -> bool;

    fn is_playing(&self) -> bool;

    /// Events since the last poll
    fn poll_events(&mut self) -> Vec<PlaybackEvent>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Track {
    username: String,
    speaker: String,
    file_name: String,
}

pub struct AudioPlayer<B: MediaBackend> {
    ctx: AppContext,
    backend: B,
    track: Option<Track>,
    ticket: Option<Ticket>,
    play_count: Arc<Mutex<u32>>,
}

impl<B: MediaBackend> AudioPlayer<B> {
    pub fn new(ctx: AppContext, backend: B) -> Self {
        Self {
            ctx,
            backend,
            track: None,
            ticket: None,
            play_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn play_count(&self) -> u32 {
        *self.play_count.lock()
    }

    pub fn is_playing(&self) -> bool {
        self.backend.is_playing()
    }

    /// Point the player at a clip and fetch its play count in the background
    pub fn load_audio(&mut self, path: &str, file_name: &str, speaker: &str) -> Result<()> {
        let url = self.ctx.api.resolve(path)?;
        self.backend.stop();
        self.backend.load(&url)?;

        let track = Track {
            username: self.ctx.username().to_string(),
            speaker: speaker.to_string(),
            file_name: file_name.to_string(),
        };
        *self.play_count.lock() = 0;

        let tokens = self.ctx.tokens.clone();
        let ticket = tokens.begin(Resource::PlayCount);
        self.ticket = Some(ticket);

        let api = self.ctx.api.clone();
        let count = self.play_count.clone();
        let fetch = track.clone();
        let task_tokens = tokens.clone();
        let handle = tokio::spawn(async move {
            match api
                .get_play_count(&fetch.username, &fetch.speaker, &fetch.file_name)
                .await
            {
                Ok(n) if task_tokens.is_current(&ticket) => *count.lock() = n,
                Ok(_) => debug!(file = %fetch.file_name, "dropping stale play count"),
                Err(e) => warn!(file = %fetch.file_name, error = %e, "failed to fetch play count"),
            }
        });
        tokens.attach(&ticket, handle.abort_handle());

        self.track = Some(track);
        Ok(())
    }

    pub fn toggle_play_pause(&mut self) -> Result<()> {
        if !self.backend.has_source() {
            return Ok(());
        }
        if self.backend.is_playing() {
            self.backend.pause()
        } else {
            self.backend.play()
        }
    }

    /// Drain backend events; a finished clip records one play
    pub fn handle_events(&mut self) -> Vec<PlaybackEvent> {
        let events = self.backend.poll_events();
        if events.contains(&PlaybackEvent::Ended) {
            self.increment_play_count();
        }
        events
    }

    /// Fire-and-forget; the displayed count updates only if the clip is still current
    fn increment_play_count(&self) {
        let (Some(track), Some(ticket)) = (self.track.clone(), self.ticket) else {
            return;
        };
        let api = self.ctx.api.clone();
        let tokens = self.ctx.tokens.clone();
        let count = self.play_count.clone();

        tokio::spawn(async move {
            match api
                .save_play_count(&track.username, &track.speaker, &track.file_name)
                .await
            {
                Ok(n) if tokens.is_current(&ticket) => *count.lock() = n,
                Ok(_) => debug!(file = %track.file_name, "play recorded for a clip no longer shown"),
                Err(e) => warn!(file = %track.file_name, error = %e, "failed to save play count"),
            }
        });
    }

    pub fn stop(&mut self) {
        self.backend.stop();
    }
}

/// Plays clips by spawning an external command (ffplay by default)
pub struct ExternalPlayer {
    command: Vec<String>,
    source: Option<Url>,
    child: Option<Child>,
    paused: bool,
    events: Vec<PlaybackEvent>,
}

impl ExternalPlayer {
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            source: None,
            child: None,
            paused: false,
            events: Vec::new(),
        }
    }

    fn spawn(&mut self, url: &Url) -> Result<()> {
        let (program, args) = self.command.split_first().ok_or_else(|| Error::Player {
            message: "no player command configured".to_string(),
        })?;
        let child = Command::new(program)
            .args(args)
            .arg(url.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Player {
                message: format!("failed to start '{}': {}", program, e),
            })?;
        debug!(program = %program, pid = ?child.id(), "player started");
        self.child = Some(child);
        self.paused = false;
        Ok(())
    }

    #[cfg(unix)]
    fn signal(&self, signal: libc::c_int) -> Result<()> {
        let Some(pid) = self.child.as_ref().and_then(|c| c.id()) else {
            return Ok(());
        };
        // SAFETY: pid belongs to a child we spawned and have not yet reaped
        let rc = unsafe { libc::kill(pid as libc::pid_t, signal) };
        if rc == 0 {
            Ok(())
        } else {
            Err(Error::Player {
                message: format!("signal {} to player failed: {}", signal, std::io::Error::last_os_error()),
            })
        }
    }
}

impl MediaBackend for ExternalPlayer {
    fn load(&mut self, url: &Url) -> Result<()> {
        self.stop();
        self.source = Some(url.clone());
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        if self.child.is_some() && self.paused {
            #[cfg(unix)]
            self.signal(libc::SIGCONT)?;
            self.paused = false;
            self.events.push(PlaybackEvent::Resumed);
            return Ok(());
        }
        let url = self.source.clone().ok_or_else(|| Error::Player {
            message: "no clip loaded".to_string(),
        })?;
        self.spawn(&url)?;
        self.events.push(PlaybackEvent::Started);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        if self.child.is_none() || self.paused {
            return Ok(());
        }
        #[cfg(unix)]
        {
            self.signal(libc::SIGSTOP)?;
            self.paused = true;
        }
        #[cfg(not(unix))]
        {
            // No suspend without signals; stopping restarts the clip on next play
            self.stop();
        }
        self.events.push(PlaybackEvent::Paused);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            #[cfg(unix)]
            if self.paused {
                if let Some(pid) = child.id() {
                    // SAFETY: see `signal`; a stopped process must be resumed to die cleanly
                    unsafe {
                        libc::kill(pid as libc::pid_t, libc::SIGCONT);
                    }
                }
            }
            if let Err(e) = child.start_kill() {
                debug!(error = %e, "player already gone");
            }
        }
        self.paused = false;
    }

    fn has_source(&self) -> bool {
        self.source.is_some()
    }

    fn is_playing(&self) -> bool {
        self.child.is_some() && !self.paused
    }

    fn poll_events(&mut self) -> Vec<PlaybackEvent> {
        if let Some(child) = self.child.as_mut() {
            match child.try_wait() {
                Ok(Some(status)) => {
                    self.child = None;
                    self.paused = false;
                    if status.success() {
                        self.events.push(PlaybackEvent::Ended);
                    } else {
                        debug!(?status, "player exited without finishing");
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "failed to poll player"),
            }
        }
        std::mem::take(&mut self.events)
    }
}

impl Drop for ExternalPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Backend that only records what was asked of it
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub loaded: Vec<Url>,
    pub playing: bool,
    pending: Vec<PlaybackEvent>,
}

impl RecordingBackend {
    /// Simulate the current clip playing to its end
    pub fn finish(&mut self) {
        self.playing = false;
        self.pending.push(PlaybackEvent::Ended);
    }
}

impl MediaBackend for RecordingBackend {
    fn load(&mut self, url: &Url) -> Result<()> {
        self.loaded.push(url.clone());
        self.playing = false;
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        self.playing = true;
        self.pending.push(PlaybackEvent::Started);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.playing = false;
        self.pending.push(PlaybackEvent::Paused);
        Ok(())
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn has_source(&self) -> bool {
        !self.loaded.is_empty()
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn poll_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.pending)
    }
}
