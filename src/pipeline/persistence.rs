// Saves the pattern on quit and brings it back on the next start.
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::pipeline::pattern::Pattern;

const GRIDSYNTH_DIR: &str = ".gridsynth";
const PATTERN_FILE: &str = "pattern.json";

// <project_dir>/.gridsynth/pattern.json
pub fn pattern_file_path(project_dir: &Path) -> PathBuf {
    project_dir.join(GRIDSYNTH_DIR).join(PATTERN_FILE)
}

// None when there is nothing saved yet or the file doesn't parse
pub fn load_pattern(project_dir: &Path) -> Option<Pattern> {
    let path = pattern_file_path(project_dir);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(pattern) => Some(pattern),
        Err(e) => {
            tracing::warn!(path = %path.display(), "ignoring unreadable pattern: {e}");
            None
        }
    }
}

pub fn save_pattern(project_dir: &Path, pattern: &Pattern) -> anyhow::Result<()> {
    let path = pattern_file_path(project_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(pattern)?;
    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::InstrumentKind;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gridsynth-{}-{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn saved_pattern_loads_back() {
        let dir = scratch_dir("roundtrip");
        let mut pattern = Pattern::default();
        pattern.set_active(InstrumentKind::Clap, 4, true);
        pattern.set_melody(InstrumentKind::Lead, 4, 440.0);
        save_pattern(&dir, &pattern).unwrap();
        assert_eq!(load_pattern(&dir), Some(pattern));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_or_broken_file_loads_nothing() {
        let dir = scratch_dir("broken");
        assert_eq!(load_pattern(&dir), None);
        std::fs::create_dir_all(dir.join(GRIDSYNTH_DIR)).unwrap();
        std::fs::write(pattern_file_path(&dir), "{ not json").unwrap();
        assert_eq!(load_pattern(&dir), None);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
