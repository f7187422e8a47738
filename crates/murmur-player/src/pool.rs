//! Sound pools: every file of a directory, decoded up front.

use std::path::{Path, PathBuf};

use murmur_audio::AudioBackend;
use murmur_core::{Error, PoolKind, Result, SoundId};
use tracing::{debug, error, info, warn};

use crate::fs::AssetSource;
use crate::random::RandomSource;

/// A decoded sound ready to be played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundAsset {
    pub id: SoundId,
    pub path: PathBuf,
    pub length_ms: u32,
}

/// Non-empty, ordered collection of decoded sounds from one directory.
#[derive(Debug)]
pub struct SoundPool {
    kind: PoolKind,
    dir: PathBuf,
    assets: Vec<SoundAsset>,
}

impl SoundPool {
    /// Decode every non-directory entry of `dir` (not recursive).
    ///
    /// A missing directory, an entry the engine cannot decode, or a
    /// directory with no files are all errors. Nothing stays loaded when
    /// this fails.
    pub fn load<E, F>(engine: &mut E, fs: &F, kind: PoolKind, dir: &Path) -> Result<Self>
    where
        E: AudioBackend + ?Sized,
        F: AssetSource + ?Sized,
    {
        if !fs.exists(dir) {
            error!("{} does not exist", dir.display());
            return Err(Error::PathNotFound(dir.to_path_buf()));
        }

        let mut pool = Self {
            kind,
            dir: dir.to_path_buf(),
            assets: Vec::new(),
        };

        if let Err(e) = pool.fill(engine, fs) {
            pool.release(engine);
            return Err(e);
        }

        if pool.assets.is_empty() {
            error!("{} has no sound files", dir.display());
            return Err(Error::EmptyPool(dir.to_path_buf()));
        }

        info!(
            "Loaded {} {} sounds from {}",
            pool.assets.len(),
            kind,
            dir.display()
        );
        Ok(pool)
    }

    fn fill<E, F>(&mut self, engine: &mut E, fs: &F) -> Result<()>
    where
        E: AudioBackend + ?Sized,
        F: AssetSource + ?Sized,
    {
        for entry in fs.entries(&self.dir)? {
            if entry.is_dir {
                continue;
            }

            let id = engine.create_sound(&entry.path)?;
            // Registered before the length query so a failure still
            // releases it.
            self.assets.push(SoundAsset {
                id,
                path: entry.path,
                length_ms: 0,
            });

            let length_ms = engine.sound_length_ms(id)?;
            if let Some(asset) = self.assets.last_mut() {
                asset.length_ms = length_ms;
                debug!("{} {}: {} ms", self.kind, asset.path.display(), length_ms);
            }
        }
        Ok(())
    }

    pub const fn kind(&self) -> PoolKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Only true after [`SoundPool::release`].
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SoundAsset> {
        self.assets.iter()
    }

    /// Uniformly random asset.
    pub fn pick<R: RandomSource + ?Sized>(&self, rng: &mut R) -> &SoundAsset {
        let index = rng.index(self.assets.len()).min(self.assets.len() - 1);
        &self.assets[index]
    }

    /// Release every asset. Failures are logged, not returned; the pool is
    /// empty afterwards.
    pub fn release<E: AudioBackend + ?Sized>(&mut self, engine: &mut E) {
        let count = self.assets.len();
        for asset in self.assets.drain(..) {
            if let Err(e) = engine.release_sound(asset.id) {
                warn!("Failed to release {}: {e}", asset.path.display());
            }
        }
        if count > 0 {
            debug!("Released {count} {} sounds", self.kind);
        }
    }
}

/// Both pools, borrowed for one scheduler call.
#[derive(Debug, Clone, Copy)]
pub struct Pools<'a> {
    pub ambient: &'a SoundPool,
    pub voice: &'a SoundPool,
}
