//! Scripted engine, filesystem, and randomness for unit tests.

#![allow(clippy::unwrap_used)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use murmur_audio::{AudioBackend, ChannelError, ChannelResult};
use murmur_core::{ChannelId, Error, PoolKind, Result, SoundId};

use crate::fs::{AssetSource, DirEntryInfo};
use crate::pool::{Pools, SoundPool};
use crate::random::RandomSource;
use crate::scheduler::{Scheduler, TickOutcome};

/// Length every mock sound reports.
pub const MOCK_LENGTH_MS: u32 = 10_000;

/// An engine call, as recorded by [`MockEngine`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Call {
    Create(SoundId),
    Play { sound: SoundId, paused: bool },
    IsPlaying(ChannelId),
    Position(ChannelId),
    SetVolume { channel: ChannelId, volume: f32 },
    SetPaused { channel: ChannelId, paused: bool },
    Update,
    Release(SoundId),
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ChannelState {
    Live {
        position_ms: u32,
        volume: f32,
        paused: bool,
    },
    Finished,
    Stolen,
    Invalid,
    Failed,
}

#[derive(Debug, Default)]
struct State {
    sounds: HashMap<SoundId, u32>,
    next_sound: u32,
    channels: Vec<ChannelState>,
    calls: Vec<Call>,
    fail_updates: bool,
    closed: bool,
}

impl State {
    fn channel(&self, channel: ChannelId) -> ChannelResult<ChannelState> {
        match self.channels.get(channel.index as usize) {
            Some(ChannelState::Stolen) => Err(ChannelError::Stolen),
            Some(ChannelState::Invalid) | None => Err(ChannelError::InvalidHandle),
            Some(ChannelState::Failed) => {
                Err(Error::Engine("scripted channel failure".into()).into())
            }
            Some(state) => Ok(*state),
        }
    }

    fn live_mut(&mut self, channel: ChannelId) -> ChannelResult<(&mut f32, &mut bool)> {
        match self.channel(channel)? {
            ChannelState::Live { .. } => {}
            _ => return Err(ChannelError::InvalidHandle),
        }
        match &mut self.channels[channel.index as usize] {
            ChannelState::Live { volume, paused, .. } => Ok((volume, paused)),
            _ => Err(ChannelError::InvalidHandle),
        }
    }
}

/// Engine double with shared state: clones observe the same engine, so a
/// test can keep a handle after moving one into a `Session`.
///
/// Every channel gets its own index and never moves on its own; tests
/// script positions and losses explicitly. Files whose name contains
/// `corrupt` fail to decode.
#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    state: Rc<RefCell<State>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut self.state.borrow_mut().calls)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn loaded_sounds(&self) -> usize {
        self.state.borrow().sounds.len()
    }

    pub fn channels_started(&self) -> usize {
        self.state.borrow().channels.len()
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }

    pub fn is_live(&self, channel: ChannelId) -> bool {
        matches!(
            self.state.borrow().channel(channel),
            Ok(ChannelState::Live { .. })
        )
    }

    pub fn volume_of(&self, channel: ChannelId) -> f32 {
        match self.state.borrow().channel(channel) {
            Ok(ChannelState::Live { volume, .. }) => volume,
            other => panic!("{channel} is not live: {other:?}"),
        }
    }

    pub fn is_paused(&self, channel: ChannelId) -> bool {
        match self.state.borrow().channel(channel) {
            Ok(ChannelState::Live { paused, .. }) => paused,
            other => panic!("{channel} is not live: {other:?}"),
        }
    }

    pub fn set_position(&self, channel: ChannelId, position: u32) {
        let mut state = self.state.borrow_mut();
        match &mut state.channels[channel.index as usize] {
            ChannelState::Live { position_ms, .. } => *position_ms = position,
            other => panic!("{channel} is not live: {other:?}"),
        }
    }

    fn mark(&self, channel: ChannelId, to: ChannelState) {
        self.state.borrow_mut().channels[channel.index as usize] = to;
    }

    /// The channel played to its end.
    pub fn finish(&self, channel: ChannelId) {
        self.mark(channel, ChannelState::Finished);
    }

    /// Another sound took the channel.
    pub fn steal(&self, channel: ChannelId) {
        self.mark(channel, ChannelState::Stolen);
    }

    /// The handle went stale.
    pub fn invalidate(&self, channel: ChannelId) {
        self.mark(channel, ChannelState::Invalid);
    }

    /// Calls on the channel fail with an engine error.
    pub fn fail_channel(&self, channel: ChannelId) {
        self.mark(channel, ChannelState::Failed);
    }

    pub fn fail_updates(&self) {
        self.state.borrow_mut().fail_updates = true;
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl AudioBackend for MockEngine {
    fn create_sound(&mut self, path: &Path) -> Result<SoundId> {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        if name.is_some_and(|n| n.contains("corrupt")) {
            return Err(Error::Decode(format!("{}: not a sound", path.display())));
        }

        let mut state = self.state.borrow_mut();
        let id = SoundId(state.next_sound);
        state.next_sound += 1;
        state.sounds.insert(id, MOCK_LENGTH_MS);
        state.calls.push(Call::Create(id));
        Ok(id)
    }

    fn play_sound(&mut self, sound: SoundId, paused: bool) -> Result<ChannelId> {
        self.record(Call::Play { sound, paused });
        let mut state = self.state.borrow_mut();
        if !state.sounds.contains_key(&sound) {
            return Err(Error::Engine(format!("unknown {sound}")));
        }
        let index = state.channels.len() as u32;
        state.channels.push(ChannelState::Live {
            position_ms: 0,
            volume: 1.0,
            paused,
        });
        Ok(ChannelId::new(index, 0))
    }

    fn is_playing(&self, channel: ChannelId) -> ChannelResult<bool> {
        self.record(Call::IsPlaying(channel));
        match self.state.borrow().channel(channel)? {
            ChannelState::Live { .. } => Ok(true),
            _ => Ok(false),
        }
    }

    fn position_ms(&self, channel: ChannelId) -> ChannelResult<u32> {
        self.record(Call::Position(channel));
        match self.state.borrow().channel(channel)? {
            ChannelState::Live { position_ms, .. } => Ok(position_ms),
            _ => Err(ChannelError::InvalidHandle),
        }
    }

    fn set_position_ms(&mut self, channel: ChannelId, position_ms: u32) -> ChannelResult<()> {
        if !matches!(self.state.borrow().channel(channel)?, ChannelState::Live { .. }) {
            return Err(ChannelError::InvalidHandle);
        }
        self.set_position(channel, position_ms);
        Ok(())
    }

    fn sound_length_ms(&self, sound: SoundId) -> Result<u32> {
        self.state
            .borrow()
            .sounds
            .get(&sound)
            .copied()
            .ok_or_else(|| Error::Engine(format!("unknown {sound}")))
    }

    fn set_volume(&mut self, channel: ChannelId, volume: f32) -> ChannelResult<()> {
        self.record(Call::SetVolume { channel, volume });
        let mut state = self.state.borrow_mut();
        let (current, _) = state.live_mut(channel)?;
        *current = volume.clamp(0.0, 1.0);
        Ok(())
    }

    fn set_paused(&mut self, channel: ChannelId, paused: bool) -> ChannelResult<()> {
        self.record(Call::SetPaused { channel, paused });
        let mut state = self.state.borrow_mut();
        let (_, current) = state.live_mut(channel)?;
        *current = paused;
        Ok(())
    }

    fn update(&mut self) -> Result<()> {
        self.record(Call::Update);
        if self.state.borrow().fail_updates {
            return Err(Error::Engine("scripted update failure".into()));
        }
        Ok(())
    }

    fn release_sound(&mut self, sound: SoundId) -> Result<()> {
        self.record(Call::Release(sound));
        self.state
            .borrow_mut()
            .sounds
            .remove(&sound)
            .map(|_| ())
            .ok_or_else(|| Error::Engine(format!("release of unknown {sound}")))
    }

    fn close(&mut self) -> Result<()> {
        self.record(Call::Close);
        self.state.borrow_mut().closed = true;
        Ok(())
    }
}

/// In-memory directory tree. Directories are listed by their files.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    dirs: HashMap<PathBuf, Vec<DirEntryInfo>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory holding `count` files named `{stem}-{n}.ogg`.
    pub fn with_files(mut self, dir: &str, stem: &str, count: usize) -> Self {
        let dir = PathBuf::from(dir);
        let entries = (0..count)
            .map(|n| DirEntryInfo {
                path: dir.join(format!("{stem}-{n}.ogg")),
                is_dir: false,
            })
            .collect();
        self.dirs.insert(dir, entries);
        self
    }
}

impl AssetSource for MemoryFs {
    fn exists(&self, path: &Path) -> bool {
        self.dirs.contains_key(path)
    }

    fn entries(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        self.dirs
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }
}

/// Random source returning scripted indices (cycled, then zero) and the
/// midpoint of every offset range.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    indices: VecDeque<usize>,
}

impl ScriptedRandom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indices(indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            indices: indices.into_iter().collect(),
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn index(&mut self, len: usize) -> usize {
        self.indices.pop_front().unwrap_or(0) % len.max(1)
    }

    fn offset(&mut self, range: Duration) -> Duration {
        if range < Duration::from_millis(2) {
            return Duration::ZERO;
        }
        range / 2
    }
}

/// A mock engine with both pools loaded from memory.
pub struct Fixture {
    pub engine: MockEngine,
    pub ambient: SoundPool,
    pub voice: SoundPool,
    pub now: Instant,
}

impl Fixture {
    pub fn new(ambient: usize, voice: usize) -> Self {
        let fs = MemoryFs::new()
            .with_files("sound", "ambient", ambient)
            .with_files("voice", "voice", voice);
        let mut engine = MockEngine::new();
        let ambient =
            SoundPool::load(&mut engine, &fs, PoolKind::Ambient, Path::new("sound")).unwrap();
        let voice = SoundPool::load(&mut engine, &fs, PoolKind::Voice, Path::new("voice")).unwrap();
        engine.take_calls();

        Self {
            engine,
            ambient,
            voice,
            now: Instant::now(),
        }
    }

    pub fn start<R: RandomSource>(&mut self, scheduler: &mut Scheduler<R>) -> Result<()> {
        let pools = Pools {
            ambient: &self.ambient,
            voice: &self.voice,
        };
        scheduler.start(&mut self.engine, pools, self.now)
    }

    pub fn tick<R: RandomSource>(&mut self, scheduler: &mut Scheduler<R>) -> Result<TickOutcome> {
        self.tick_at(scheduler, self.now)
    }

    pub fn tick_at<R: RandomSource>(
        &mut self,
        scheduler: &mut Scheduler<R>,
        now: Instant,
    ) -> Result<TickOutcome> {
        let pools = Pools {
            ambient: &self.ambient,
            voice: &self.voice,
        };
        scheduler.tick(&mut self.engine, pools, now)
    }
}
