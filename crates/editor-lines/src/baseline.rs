//! Baseline providers.
//!
//! A baseline is the last known saved or committed text of a document; change tracking diffs
//! the live buffer against it. Hosts plug in where baselines come from (a directory snapshot,
//! a VCS blob, an in-memory copy) through [`BaselineProvider`].

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::buffer::split_lines;

/// Source of baseline content.
pub trait BaselineProvider {
    /// Open the baseline of `path`.
    ///
    /// Returns `Ok(None)` when this provider has no baseline for the document.
    fn open_baseline(&self, path: &Path) -> io::Result<Option<Box<dyn Read + '_>>>;
}

impl<P: BaselineProvider + ?Sized> BaselineProvider for &P {
    fn open_baseline(&self, path: &Path) -> io::Result<Option<Box<dyn Read + '_>>> {
        (**self).open_baseline(path)
    }
}

/// Provider that never has a baseline.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBaseline;

impl BaselineProvider for NoBaseline {
    fn open_baseline(&self, _path: &Path) -> io::Result<Option<Box<dyn Read + '_>>> {
        Ok(None)
    }
}

/// In-memory baselines keyed by document path.
#[derive(Debug, Clone, Default)]
pub struct StaticBaselineProvider {
    baselines: HashMap<PathBuf, Vec<u8>>,
}

impl StaticBaselineProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the baseline of `path`.
    pub fn set(&mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        self.baselines.insert(path.into(), content.into());
    }

    /// Builder-style [`StaticBaselineProvider::set`].
    pub fn with(mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        self.set(path, content);
        self
    }

    /// Forget the baseline of `path`.
    pub fn remove(&mut self, path: &Path) -> Option<Vec<u8>> {
        self.baselines.remove(path)
    }
}

impl BaselineProvider for StaticBaselineProvider {
    fn open_baseline(&self, path: &Path) -> io::Result<Option<Box<dyn Read + '_>>> {
        Ok(self
            .baselines
            .get(path)
            .map(|bytes| Box::new(bytes.as_slice()) as Box<dyn Read + '_>))
    }
}

/// Reads baselines from a snapshot directory mirroring the workspace layout.
///
/// A document at `<workspace>/src/lib.rs` has its baseline at `<snapshot_dir>/src/lib.rs`.
/// Documents outside the workspace have no baseline.
#[derive(Debug, Clone)]
pub struct FileBaselineProvider {
    workspace: PathBuf,
    snapshot_dir: PathBuf,
}

impl FileBaselineProvider {
    /// Create a provider for `workspace` backed by `snapshot_dir`.
    pub fn new(workspace: impl Into<PathBuf>, snapshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            snapshot_dir: snapshot_dir.into(),
        }
    }

    /// Snapshot path for `path`, if it lies inside the workspace.
    pub fn snapshot_path(&self, path: &Path) -> Option<PathBuf> {
        let relative = if path.is_absolute() {
            path.strip_prefix(&self.workspace).ok()?
        } else {
            path
        };
        Some(self.snapshot_dir.join(relative))
    }
}

impl BaselineProvider for FileBaselineProvider {
    fn open_baseline(&self, path: &Path) -> io::Result<Option<Box<dyn Read + '_>>> {
        let Some(snapshot) = self.snapshot_path(path) else {
            return Ok(None);
        };
        match File::open(&snapshot) {
            Ok(file) => Ok(Some(Box::new(file))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Ordered chain of providers; the first one with a baseline wins.
#[derive(Default)]
pub struct BaselineProviders {
    providers: Vec<Box<dyn BaselineProvider + Send + Sync>>,
}

impl BaselineProviders {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider with the lowest priority so far.
    pub fn push<P>(&mut self, provider: P)
    where
        P: BaselineProvider + Send + Sync + 'static,
    {
        self.providers.push(Box::new(provider));
    }

    /// Builder-style [`BaselineProviders::push`].
    pub fn with<P>(mut self, provider: P) -> Self
    where
        P: BaselineProvider + Send + Sync + 'static,
    {
        self.push(provider);
        self
    }

    /// Number of providers in the chain.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns `true` if the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for BaselineProviders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaselineProviders")
            .field("len", &self.providers.len())
            .finish()
    }
}

impl BaselineProvider for BaselineProviders {
    fn open_baseline(&self, path: &Path) -> io::Result<Option<Box<dyn Read + '_>>> {
        for provider in &self.providers {
            if let Some(reader) = provider.open_baseline(path)? {
                return Ok(Some(reader));
            }
        }
        Ok(None)
    }
}

/// Read and decode the baseline of `path` into lines.
///
/// Invalid UTF-8 is replaced with U+FFFD; line breaks are normalized like the buffer's.
pub fn load_baseline(
    provider: &dyn BaselineProvider,
    path: &Path,
) -> io::Result<Option<Vec<String>>> {
    let Some(mut reader) = provider.open_baseline(path)? else {
        return Ok(None);
    };
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(Some(split_lines(&String::from_utf8_lossy(&bytes))))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingProvider;

    impl BaselineProvider for FailingProvider {
        fn open_baseline(&self, _path: &Path) -> io::Result<Option<Box<dyn Read + '_>>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
    }

    #[test]
    fn test_static_provider() {
        let provider = StaticBaselineProvider::new().with("a.txt", "one\r\ntwo");
        let lines = load_baseline(&provider, Path::new("a.txt")).unwrap();
        assert_eq!(lines, Some(vec!["one".to_string(), "two".to_string()]));
        assert_eq!(load_baseline(&provider, Path::new("b.txt")).unwrap(), None);
    }

    #[test]
    fn test_lossy_decoding() {
        let provider = StaticBaselineProvider::new().with("bin", vec![b'a', 0xff, b'\n', b'b']);
        let lines = load_baseline(&provider, Path::new("bin")).unwrap().unwrap();
        assert_eq!(lines, vec!["a\u{fffd}".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_chain_first_hit_wins() {
        let chain = BaselineProviders::new()
            .with(NoBaseline)
            .with(StaticBaselineProvider::new().with("x", "first"))
            .with(StaticBaselineProvider::new().with("x", "second"));
        let lines = load_baseline(&chain, Path::new("x")).unwrap();
        assert_eq!(lines, Some(vec!["first".to_string()]));
    }

    #[test]
    fn test_chain_propagates_errors() {
        let chain = BaselineProviders::new().with(FailingProvider);
        let err = load_baseline(&chain, Path::new("x")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_file_provider() {
        let root = std::env::temp_dir().join(format!("editor-lines-baseline-{}", std::process::id()));
        let workspace = root.join("ws");
        let snapshots = root.join("snap");
        std::fs::create_dir_all(snapshots.join("src")).unwrap();
        std::fs::write(snapshots.join("src").join("lib.rs"), "fn main() {}\n").unwrap();

        let provider = FileBaselineProvider::new(&workspace, &snapshots);
        let lines = load_baseline(&provider, &workspace.join("src").join("lib.rs")).unwrap();
        assert_eq!(lines, Some(vec!["fn main() {}".to_string(), String::new()]));

        assert_eq!(
            load_baseline(&provider, &workspace.join("missing.rs")).unwrap(),
            None
        );
        assert_eq!(
            load_baseline(&provider, &root.join("elsewhere").join("lib.rs")).unwrap(),
            None
        );

        std::fs::remove_dir_all(&root).unwrap();
    }
}
