//! Level sources.
//!
//! Level loading is asynchronous; the scene only ever sees a parsed and
//! validated [`LevelConfig`].

use std::{collections::HashMap, path::PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use kinetic_shared::level::LevelConfig;
use tracing::debug;

/// Where level data comes from.
#[async_trait(?Send)]
pub trait LevelSource {
    /// Fetches, parses and validates level `id`.
    async fn fetch(&self, id: u32) -> anyhow::Result<LevelConfig>;
}

/// Reads `level_<id>.json` files from a directory.
#[derive(Debug, Clone)]
pub struct FsLevelSource {
    dir: PathBuf,
}

impl FsLevelSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, id: u32) -> PathBuf {
        self.dir.join(format!("level_{id}.json"))
    }
}

#[async_trait(?Send)]
impl LevelSource for FsLevelSource {
    async fn fetch(&self, id: u32) -> anyhow::Result<LevelConfig> {
        let path = self.path_for(id);
        debug!(path = %path.display(), "Reading level");
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("read level {}", path.display()))?;
        let level = LevelConfig::from_json_str(&text)?;
        if level.id != id {
            anyhow::bail!("{} declares id {}, expected {}", path.display(), level.id, id);
        }
        Ok(level)
    }
}

/// Raw level JSON held in memory, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct MemoryLevelSource {
    levels: HashMap<u32, String>,
}

impl MemoryLevelSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, id: u32, json: impl Into<String>) -> Self {
        self.insert(id, json);
        self
    }

    pub fn insert(&mut self, id: u32, json: impl Into<String>) {
        self.levels.insert(id, json.into());
    }
}

#[async_trait(?Send)]
impl LevelSource for MemoryLevelSource {
    async fn fetch(&self, id: u32) -> anyhow::Result<LevelConfig> {
        let text = self
            .levels
            .get(&id)
            .with_context(|| format!("no level {id}"))?;
        LevelConfig::from_json_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEVEL_3: &str = r#"{"id": 3, "entities": [
        {"kind": "player", "position": {"x": 50, "y": 584}}
    ]}"#;

    #[tokio::test]
    async fn memory_source_parses_known_levels() {
        let source = MemoryLevelSource::new().with_level(3, LEVEL_3);
        let level = source.fetch(3).await.unwrap();
        assert_eq!(level.id, 3);
        assert!(source.fetch(4).await.is_err());
    }

    #[tokio::test]
    async fn fs_source_reads_and_checks_id() -> anyhow::Result<()> {
        let dir = std::env::temp_dir().join(format!("kinetic-levels-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await?;
        let source = FsLevelSource::new(&dir);
        tokio::fs::write(source.path_for(3), LEVEL_3).await?;
        tokio::fs::write(source.path_for(5), LEVEL_3).await?;

        assert_eq!(source.fetch(3).await?.id, 3);
        let err = source.fetch(5).await.unwrap_err();
        assert!(err.to_string().contains("expected 5"));
        assert!(source.fetch(9).await.is_err());

        tokio::fs::remove_dir_all(&dir).await?;
        Ok(())
    }
}
