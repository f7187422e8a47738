//! Owns the engine, both pools, and the scheduler for one run.
//!
//! Teardown is tied to `Drop`: voice sounds are released first, then
//! ambient sounds, then the engine is closed. This runs on every exit path,
//! including a failed `open` and an error out of `tick`.

use std::path::Path;
use std::time::Instant;

use murmur_audio::AudioBackend;
use murmur_core::{Config, Error, PoolKind, Result};
use tracing::{debug, info, warn};

use crate::fs::AssetSource;
use crate::pool::{Pools, SoundPool};
use crate::random::RandomSource;
use crate::scheduler::{Scheduler, SchedulerConfig, TickOutcome};

pub struct Session<E: AudioBackend, R: RandomSource> {
    engine: E,
    // Options so a half-loaded session can still be dropped cleanly.
    ambient: Option<SoundPool>,
    voice: Option<SoundPool>,
    scheduler: Scheduler<R>,
}

impl<E: AudioBackend, R: RandomSource> Session<E, R> {
    /// Load the ambient pool, then the voice pool.
    ///
    /// On failure everything loaded so far is released and the engine is
    /// closed before the error is returned.
    pub fn open<F: AssetSource + ?Sized>(
        engine: E,
        fs: &F,
        config: &Config,
        rng: R,
    ) -> Result<Self> {
        let mut session = Self {
            engine,
            ambient: None,
            voice: None,
            scheduler: Scheduler::new(SchedulerConfig::from(config), rng),
        };

        session.ambient = Some(session.load(fs, PoolKind::Ambient, &config.ambient_dir)?);
        session.voice = Some(session.load(fs, PoolKind::Voice, &config.voice_dir)?);
        Ok(session)
    }

    fn load<F: AssetSource + ?Sized>(
        &mut self,
        fs: &F,
        kind: PoolKind,
        dir: &Path,
    ) -> Result<SoundPool> {
        SoundPool::load(&mut self.engine, fs, kind, dir)
    }

    fn parts(&mut self) -> Result<(&mut E, Pools<'_>, &mut Scheduler<R>)> {
        let (Some(ambient), Some(voice)) = (&self.ambient, &self.voice) else {
            return Err(Error::Engine("session has no sound pools".into()));
        };
        Ok((
            &mut self.engine,
            Pools { ambient, voice },
            &mut self.scheduler,
        ))
    }

    /// Start the first ambient track.
    pub fn start(&mut self, now: Instant) -> Result<()> {
        let (engine, pools, scheduler) = self.parts()?;
        scheduler.start(engine, pools, now)?;
        info!("Playback started");
        Ok(())
    }

    /// One scheduler step. Errors are fatal; drop the session afterwards.
    pub fn tick(&mut self, now: Instant) -> Result<TickOutcome> {
        let (engine, pools, scheduler) = self.parts()?;
        scheduler.tick(engine, pools, now)
    }

    pub const fn scheduler(&self) -> &Scheduler<R> {
        &self.scheduler
    }

    pub const fn ambient(&self) -> Option<&SoundPool> {
        self.ambient.as_ref()
    }

    pub const fn voice(&self) -> Option<&SoundPool> {
        self.voice.as_ref()
    }
}

impl<E: AudioBackend, R: RandomSource> Drop for Session<E, R> {
    fn drop(&mut self) {
        debug!("Tearing down session");
        if let Some(mut voice) = self.voice.take() {
            voice.release(&mut self.engine);
        }
        if let Some(mut ambient) = self.ambient.take() {
            ambient.release(&mut self.engine);
        }
        if let Err(e) = self.engine.close() {
            warn!("Failed to close audio engine: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::path::PathBuf;

    use super::*;
    use crate::scheduler::CrossfadeState;
    use crate::testing::{Call, MemoryFs, MockEngine, ScriptedRandom};

    fn config() -> Config {
        Config {
            ambient_dir: PathBuf::from("sound"),
            voice_dir: PathBuf::from("voice"),
            ..Config::default()
        }
    }

    fn fs() -> MemoryFs {
        MemoryFs::new()
            .with_files("sound", "ambient", 3)
            .with_files("voice", "voice", 2)
    }

    fn open(engine: &MockEngine, fs: &MemoryFs) -> Result<Session<MockEngine, ScriptedRandom>> {
        Session::open(engine.clone(), fs, &config(), ScriptedRandom::new())
    }

    fn releases(calls: &[Call]) -> Vec<u32> {
        calls
            .iter()
            .filter_map(|c| match c {
                Call::Release(id) => Some(id.0),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_open_loads_both_pools() {
        let engine = MockEngine::new();
        let session = open(&engine, &fs()).unwrap();

        assert_eq!(session.ambient().unwrap().len(), 3);
        assert_eq!(session.voice().unwrap().len(), 2);
        assert_eq!(engine.loaded_sounds(), 5);
        assert_eq!(session.scheduler().state(), CrossfadeState::Idle);
    }

    #[test]
    fn test_drop_releases_voice_then_ambient_then_closes() {
        let engine = MockEngine::new();
        let mut session = open(&engine, &fs()).unwrap();
        session.start(Instant::now()).unwrap();
        session.tick(Instant::now()).unwrap();
        engine.take_calls();

        drop(session);

        let calls = engine.take_calls();
        // Ambient sounds were created first (0..3), voices after (3..5).
        assert_eq!(releases(&calls), vec![3, 4, 0, 1, 2]);
        assert_eq!(calls.last(), Some(&Call::Close));
        assert_eq!(engine.loaded_sounds(), 0);
        assert!(engine.is_closed());
    }

    #[test]
    fn test_missing_voice_dir_releases_ambient() {
        let engine = MockEngine::new();
        let fs = MemoryFs::new().with_files("sound", "ambient", 2);

        let err = open(&engine, &fs).err().unwrap();

        assert!(matches!(err, Error::PathNotFound(p) if p == Path::new("voice")));
        assert_eq!(engine.loaded_sounds(), 0);
        assert!(engine.is_closed());
    }

    #[test]
    fn test_empty_ambient_dir_fails() {
        let engine = MockEngine::new();
        let fs = MemoryFs::new()
            .with_files("sound", "ambient", 0)
            .with_files("voice", "voice", 1);

        let err = open(&engine, &fs).err().unwrap();
        assert!(matches!(err, Error::EmptyPool(_)));
        // The voice pool is never attempted.
        assert_eq!(engine.loaded_sounds(), 0);
        assert!(!engine.calls().iter().any(|c| matches!(c, Call::Create(_))));
    }

    #[test]
    fn test_tick_error_then_drop_still_tears_down() {
        let engine = MockEngine::new();
        let mut session = open(&engine, &fs()).unwrap();
        session.start(Instant::now()).unwrap();

        engine.fail_updates();
        assert!(session.tick(Instant::now()).is_err());

        drop(session);
        assert_eq!(engine.loaded_sounds(), 0);
        assert!(engine.is_closed());
    }
}
