//! Decoding device: the black box that turns a source locator into sound
//!
//! The session only talks to [`PlaybackDevice`] and listens to [`DeviceEvent`]s.
//! [`RodioDevice`] is the bundled implementation; it owns a dedicated audio
//! thread because rodio's output stream cannot leave the thread that opened it.

use std::io::{Cursor, Read};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::error::PlayerError;

pub const DEVICE_NAME: &str = "tunebox";

/// How often the audio thread reports position
const TICK: Duration = Duration::from_millis(250);

/// Lifecycle events emitted by a device. Source-bound events carry the locator
/// they belong to so late events for a replaced source can be dropped.
#[derive(Clone, Debug, PartialEq)]
pub enum DeviceEvent {
    MetadataLoaded { source: String, duration: f64 },
    TimeUpdate { source: String, position: f64 },
    Ended { source: String },
    VolumeChanged { volume: f32 },
    PlaybackRejected { reason: String },
    LoadFailed { source: String, reason: String },
}

pub type DeviceEventChannel = UnboundedReceiver<DeviceEvent>;

pub trait PlaybackDevice: Send + Sync {
    fn load(&self, source: &str) -> Result<(), PlayerError>;
    fn play(&self) -> Result<(), PlayerError>;
    fn pause(&self) -> Result<(), PlayerError>;
    fn seek(&self, seconds: f64) -> Result<(), PlayerError>;
    fn set_volume(&self, volume: f32) -> Result<(), PlayerError>;
    fn stop(&self) -> Result<(), PlayerError>;
    /// Duration of the loaded source; NaN until known
    fn duration(&self) -> f64;
    fn current_time(&self) -> f64;
}

#[derive(Debug)]
enum AudioCommand {
    Load(String),
    Loaded { source: String, bytes: Vec<u8> },
    FetchFailed { source: String, reason: String },
    Play,
    Pause,
    Seek(f64),
    SetVolume(f32),
    Stop,
}

/// What the device exposes synchronously
#[derive(Clone, Debug)]
struct DeviceStatus {
    source: Option<String>,
    duration: f64,
    position: f64,
}

impl Default for DeviceStatus {
    fn default() -> Self {
        Self {
            source: None,
            duration: f64::NAN,
            position: 0.0,
        }
    }
}

impl DeviceStatus {
    fn is_current(&self, source: &str) -> bool {
        self.source.as_deref() == Some(source)
    }

    /// Store the duration only if `source` is still the one last loaded.
    fn record_duration(&mut self, source: &str, duration: f64) -> bool {
        let current = self.is_current(source);
        if current {
            self.duration = duration;
        }
        current
    }

    fn record_position(&mut self, source: &str, position: f64) -> bool {
        let current = self.is_current(source);
        if current {
            self.position = position;
        }
        current
    }
}

pub struct RodioDevice {
    commands: Sender<AudioCommand>,
    status: Arc<Mutex<DeviceStatus>>,
}

impl RodioDevice {
    /// Start the audio thread and return the device plus its event channel.
    pub fn spawn(initial_volume: f32) -> Result<(Self, DeviceEventChannel)> {
        let (command_tx, command_rx) = mpsc::channel();
        let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel();
        let status = Arc::new(Mutex::new(DeviceStatus::default()));

        let thread_status = status.clone();
        let loader = command_tx.clone();
        thread::Builder::new()
            .name("audio".to_string())
            .spawn(move || {
                run_audio_thread(command_rx, loader, event_tx, thread_status, initial_volume)
            })?;

        tracing::info!(device = DEVICE_NAME, "Audio device started");
        Ok((
            Self {
                commands: command_tx,
                status,
            },
            event_rx,
        ))
    }

    fn send(&self, command: AudioCommand) -> Result<(), PlayerError> {
        self.commands
            .send(command)
            .map_err(|_| PlayerError::DeviceUnavailable("audio thread stopped".to_string()))
    }

    fn status(&self) -> MutexGuard<'_, DeviceStatus> {
        lock_status(&self.status)
    }
}

impl PlaybackDevice for RodioDevice {
    fn load(&self, source: &str) -> Result<(), PlayerError> {
        {
            let mut status = self.status();
            status.source = Some(source.to_string());
            status.duration = f64::NAN;
            status.position = 0.0;
        }
        self.send(AudioCommand::Load(source.to_string()))
    }

    fn play(&self) -> Result<(), PlayerError> {
        self.send(AudioCommand::Play)
    }

    fn pause(&self) -> Result<(), PlayerError> {
        self.send(AudioCommand::Pause)
    }

    fn seek(&self, seconds: f64) -> Result<(), PlayerError> {
        self.status().position = seconds;
        self.send(AudioCommand::Seek(seconds))
    }

    fn set_volume(&self, volume: f32) -> Result<(), PlayerError> {
        self.send(AudioCommand::SetVolume(volume))
    }

    fn stop(&self) -> Result<(), PlayerError> {
        *self.status() = DeviceStatus::default();
        self.send(AudioCommand::Stop)
    }

    fn duration(&self) -> f64 {
        self.status().duration
    }

    fn current_time(&self) -> f64 {
        self.status().position
    }
}

fn lock_status(status: &Mutex<DeviceStatus>) -> MutexGuard<'_, DeviceStatus> {
    status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Wall-clock position of the playing source
#[derive(Clone, Copy, Debug, Default)]
struct PlayClock {
    offset: f64,
    started: Option<Instant>,
}

impl PlayClock {
    fn position_at(&self, now: Instant) -> f64 {
        self.offset
            + self
                .started
                .map_or(0.0, |started| now.duration_since(started).as_secs_f64())
    }

    fn start(&mut self, now: Instant) {
        if self.started.is_none() {
            self.started = Some(now);
        }
    }

    fn stop(&mut self, now: Instant) {
        self.offset = self.position_at(now);
        self.started = None;
    }

    fn set(&mut self, position: f64, now: Instant) {
        self.offset = position;
        if self.started.is_some() {
            self.started = Some(now);
        }
    }

    fn is_running(&self) -> bool {
        self.started.is_some()
    }
}

/// Per-source state owned by the audio thread
#[derive(Default)]
struct Deck {
    source: Option<String>,
    sink: Option<Sink>,
    clock: PlayClock,
    duration: f64,
    ended_reported: bool,
}

impl Deck {
    fn reset(&mut self, source: Option<String>) {
        self.sink = None;
        self.source = source;
        self.clock = PlayClock::default();
        self.duration = f64::NAN;
        self.ended_reported = false;
    }
}

struct AudioThread {
    handle: OutputStreamHandle,
    loader: Sender<AudioCommand>,
    events: UnboundedSender<DeviceEvent>,
    status: Arc<Mutex<DeviceStatus>>,
    volume: f32,
    deck: Deck,
}

fn run_audio_thread(
    commands: Receiver<AudioCommand>,
    loader: Sender<AudioCommand>,
    events: UnboundedSender<DeviceEvent>,
    status: Arc<Mutex<DeviceStatus>>,
    volume: f32,
) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!(error = %e, "No audio output available, device disabled");
            return;
        }
    };

    let mut audio = AudioThread {
        handle,
        loader,
        events,
        status,
        volume,
        deck: Deck::default(),
    };
    let mut last_tick = Instant::now();

    loop {
        match commands.recv_timeout(TICK) {
            Ok(command) => audio.handle(command),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if last_tick.elapsed() >= TICK {
            last_tick = Instant::now();
            audio.tick(last_tick);
        }
    }

    tracing::debug!("Audio thread shutting down");
}

impl AudioThread {
    fn handle(&mut self, command: AudioCommand) {
        match command {
            AudioCommand::Load(source) => {
                tracing::debug!(source = %source, "Loading source");
                self.deck.reset(Some(source.clone()));
                let loader = self.loader.clone();
                thread::spawn(move || {
                    let message = match fetch_source(&source) {
                        Ok(bytes) => AudioCommand::Loaded { source, bytes },
                        Err(e) => AudioCommand::FetchFailed {
                            source,
                            reason: e.to_string(),
                        },
                    };
                    let _ = loader.send(message);
                });
            }
            AudioCommand::Loaded { source, bytes } => {
                if self.deck.source.as_deref() != Some(source.as_str()) {
                    tracing::trace!(source = %source, "Discarding bytes for replaced source");
                    return;
                }
                self.attach(source, bytes);
            }
            AudioCommand::FetchFailed { source, reason } => {
                if self.deck.source.as_deref() == Some(source.as_str()) {
                    self.emit(DeviceEvent::LoadFailed { source, reason });
                }
            }
            AudioCommand::Play => match &self.deck.sink {
                Some(sink) => {
                    sink.play();
                    self.deck.clock.start(Instant::now());
                }
                None => self.emit(DeviceEvent::PlaybackRejected {
                    reason: "no source ready".to_string(),
                }),
            },
            AudioCommand::Pause => {
                if let Some(sink) = &self.deck.sink {
                    sink.pause();
                }
                self.deck.clock.stop(Instant::now());
            }
            AudioCommand::Seek(seconds) => {
                let Some(sink) = &self.deck.sink else {
                    return;
                };
                match sink.try_seek(Duration::from_secs_f64(seconds.max(0.0))) {
                    Ok(()) => {
                        self.deck.clock.set(seconds, Instant::now());
                        self.deck.ended_reported = false;
                    }
                    Err(e) => self.emit(DeviceEvent::PlaybackRejected {
                        reason: format!("seek failed: {e}"),
                    }),
                }
            }
            AudioCommand::SetVolume(volume) => {
                self.volume = volume;
                if let Some(sink) = &self.deck.sink {
                    sink.set_volume(volume);
                }
                self.emit(DeviceEvent::VolumeChanged { volume });
            }
            AudioCommand::Stop => {
                self.deck.reset(None);
            }
        }
    }

    /// Decode fetched bytes into a fresh, paused sink
    fn attach(&mut self, source: String, bytes: Vec<u8>) {
        let decoder = match Decoder::new(Cursor::new(bytes)) {
            Ok(decoder) => decoder,
            Err(e) => {
                self.emit(DeviceEvent::LoadFailed { source, reason: e.to_string() });
                return;
            }
        };
        let sink = match Sink::try_new(&self.handle) {
            Ok(sink) => sink,
            Err(e) => {
                self.emit(DeviceEvent::LoadFailed { source, reason: e.to_string() });
                return;
            }
        };

        let duration = decoder
            .total_duration()
            .map_or(f64::NAN, |d| d.as_secs_f64());

        // A newer load may already be queued behind these bytes
        if !lock_status(&self.status).record_duration(&source, duration) {
            tracing::trace!(source = %source, "Discarding decode for superseded source");
            return;
        }

        sink.set_volume(self.volume);
        sink.pause();
        sink.append(decoder);

        self.deck.sink = Some(sink);
        self.deck.duration = duration;

        tracing::debug!(source = %source, duration, "Source decoded");
        self.emit(DeviceEvent::MetadataLoaded { source, duration });
    }

    fn tick(&mut self, now: Instant) {
        let (Some(source), Some(sink)) = (&self.deck.source, &self.deck.sink) else {
            return;
        };
        let source = source.clone();

        if sink.empty() && !self.deck.ended_reported {
            self.deck.ended_reported = true;
            self.deck.clock.stop(now);
            self.emit(DeviceEvent::Ended { source });
            return;
        }

        if !self.deck.clock.is_running() {
            return;
        }

        let mut position = self.deck.clock.position_at(now);
        if self.deck.duration.is_finite() {
            position = position.min(self.deck.duration);
        }
        if lock_status(&self.status).record_position(&source, position) {
            self.emit(DeviceEvent::TimeUpdate { source, position });
        }
    }

    fn emit(&self, event: DeviceEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("No listener for device events");
        }
    }
}

/// Fetch the raw bytes behind a locator (`http(s)://` or `file://`)
fn fetch_source(locator: &str) -> Result<Vec<u8>> {
    if let Some(path) = locator.strip_prefix("file://") {
        return Ok(std::fs::read(path)?);
    }

    let response = ureq::get(locator).call()?;
    let mut bytes = Vec::new();
    response.into_reader().read_to_end(&mut bytes)?;
    tracing::debug!(locator, size = bytes.len(), "Source fetched");
    Ok(bytes)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Clone, Debug, PartialEq)]
    pub(crate) enum DeviceCommand {
        Load(String),
        Play,
        Pause,
        Seek(f64),
        SetVolume(f32),
        Stop,
    }

    /// Scriptable in-memory device
    pub(crate) struct FakeDevice {
        pub commands: Mutex<Vec<DeviceCommand>>,
        pub duration: Mutex<f64>,
        pub position: Mutex<f64>,
        pub reject_play: AtomicBool,
    }

    impl Default for FakeDevice {
        fn default() -> Self {
            Self {
                commands: Mutex::new(Vec::new()),
                duration: Mutex::new(f64::NAN),
                position: Mutex::new(0.0),
                reject_play: AtomicBool::new(false),
            }
        }
    }

    impl FakeDevice {
        pub fn set_duration(&self, duration: f64) {
            *self.duration.lock().unwrap() = duration;
        }

        pub fn set_position(&self, position: f64) {
            *self.position.lock().unwrap() = position;
        }

        pub fn reject_play(&self, reject: bool) {
            self.reject_play.store(reject, Ordering::SeqCst);
        }

        pub fn commands(&self) -> Vec<DeviceCommand> {
            self.commands.lock().unwrap().clone()
        }

        pub fn clear(&self) {
            self.commands.lock().unwrap().clear();
        }

        fn record(&self, command: DeviceCommand) {
            self.commands.lock().unwrap().push(command);
        }
    }

    impl PlaybackDevice for FakeDevice {
        fn load(&self, source: &str) -> Result<(), PlayerError> {
            self.set_duration(f64::NAN);
            self.set_position(0.0);
            self.record(DeviceCommand::Load(source.to_string()));
            Ok(())
        }

        fn play(&self) -> Result<(), PlayerError> {
            self.record(DeviceCommand::Play);
            if self.reject_play.load(Ordering::SeqCst) {
                return Err(PlayerError::DeviceUnavailable("autoplay blocked".to_string()));
            }
            Ok(())
        }

        fn pause(&self) -> Result<(), PlayerError> {
            self.record(DeviceCommand::Pause);
            Ok(())
        }

        fn seek(&self, seconds: f64) -> Result<(), PlayerError> {
            self.set_position(seconds);
            self.record(DeviceCommand::Seek(seconds));
            Ok(())
        }

        fn set_volume(&self, volume: f32) -> Result<(), PlayerError> {
            self.record(DeviceCommand::SetVolume(volume));
            Ok(())
        }

        fn stop(&self) -> Result<(), PlayerError> {
            self.record(DeviceCommand::Stop);
            Ok(())
        }

        fn duration(&self) -> f64 {
            *self.duration.lock().unwrap()
        }

        fn current_time(&self) -> f64 {
            *self.position.lock().unwrap()
        }
    }
}
