//! Content-addressed dependency cache
//!
//! Artifacts are looked up first in the read-only offline roots shipped
//! with the buildpack, then in the writable download root. A miss
//! downloads the artifact, verifying its SHA-256 while it streams to disk.

use crate::dependency::BuildpackDependency;
use crate::error::{BuildpackError, BuildpackResult};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory inside the buildpack holding vendored dependencies
const OFFLINE_DIR: &str = "dependencies";

/// Directory under the user cache dir used for downloads
const DOWNLOAD_DIR: &str = "solana-buildpack";

/// Scheme of local artifact sources
const FILE_SCHEME: &str = "file://";

/// Suffix of artifacts that are still being written
const PARTIAL_SUFFIX: &str = ".partial";

/// Resolves dependency artifacts to verified files on disk
#[derive(Debug, Clone)]
pub struct DependencyCache {
    offline_roots: Vec<PathBuf>,
    download_root: PathBuf,
}

impl DependencyCache {
    /// Create a cache over explicit roots
    pub fn new(offline_roots: Vec<PathBuf>, download_root: PathBuf) -> Self {
        Self {
            offline_roots,
            download_root,
        }
    }

    /// Create the default cache for a buildpack installed at `buildpack_dir`
    pub fn for_buildpack(buildpack_dir: Option<&Path>) -> Self {
        let offline_roots = buildpack_dir
            .map(|dir| vec![dir.join(OFFLINE_DIR)])
            .unwrap_or_default();
        let download_root = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(DOWNLOAD_DIR);
        Self::new(offline_roots, download_root)
    }

    /// Root downloads are written to
    pub fn download_root(&self) -> &Path {
        &self.download_root
    }

    /// Return the path of the verified artifact for `dependency`
    ///
    /// Cached copies are returned as-is; anything else is fetched from the
    /// dependency URI and rejected if its SHA-256 does not match.
    pub async fn artifact(&self, dependency: &BuildpackDependency) -> BuildpackResult<PathBuf> {
        for root in self.offline_roots.iter().chain(std::iter::once(&self.download_root)) {
            if let Some(path) = cached(root, dependency).await {
                debug!("Cache hit for {} in {}", dependency, root.display());
                return Ok(path);
            }
        }

        info!("Downloading {} from {}", dependency, dependency.uri);
        let dependency = dependency.clone();
        let root = self.download_root.clone();
        tokio::task::spawn_blocking(move || download(&root, &dependency))
            .await
            .map_err(|e| BuildpackError::Internal(format!("download task failed: {}", e)))?
    }
}

/// Look up a complete cache entry for `dependency` under `root`
async fn cached(root: &Path, dependency: &BuildpackDependency) -> Option<PathBuf> {
    let descriptor = root.join(format!("{}.toml", dependency.sha256));
    let artifact = root.join(&dependency.sha256).join(dependency.file_name());

    let descriptor_exists = tokio::fs::try_exists(&descriptor).await.unwrap_or(false);
    let artifact_exists = tokio::fs::try_exists(&artifact).await.unwrap_or(false);
    (descriptor_exists && artifact_exists).then_some(artifact)
}

/// Download `dependency` into `root`, verifying its checksum
fn download(root: &Path, dependency: &BuildpackDependency) -> BuildpackResult<PathBuf> {
    let dir = root.join(&dependency.sha256);
    fs::create_dir_all(&dir)
        .map_err(|e| BuildpackError::io(format!("creating cache dir {}", dir.display()), e))?;

    let artifact = dir.join(dependency.file_name());
    let partial = dir.join(format!("{}{}", dependency.file_name(), PARTIAL_SUFFIX));

    let reader = open_source(&dependency.uri)?;
    let actual = match write_hashed(reader, &partial) {
        Ok(actual) => actual,
        Err(e) => {
            let _ = fs::remove_file(&partial);
            return Err(BuildpackError::Download {
                uri: dependency.uri.clone(),
                reason: e.to_string(),
            });
        }
    };

    if !actual.eq_ignore_ascii_case(&dependency.sha256) {
        let _ = fs::remove_dir_all(&dir);
        return Err(BuildpackError::ChecksumMismatch {
            uri: dependency.uri.clone(),
            expected: dependency.sha256.clone(),
            actual,
        });
    }

    fs::rename(&partial, &artifact)
        .map_err(|e| BuildpackError::io(format!("moving {} into place", artifact.display()), e))?;

    let descriptor = root.join(format!("{}.toml", dependency.sha256));
    fs::write(&descriptor, toml::to_string(dependency)?)
        .map_err(|e| BuildpackError::io(format!("writing {}", descriptor.display()), e))?;

    debug!("Cached {} at {}", dependency, artifact.display());
    Ok(artifact)
}

/// Open a reader over the artifact at `uri`
fn open_source(uri: &str) -> BuildpackResult<Box<dyn Read + Send>> {
    if let Some(path) = uri.strip_prefix(FILE_SCHEME) {
        let file = fs::File::open(path).map_err(|e| BuildpackError::Download {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        return Ok(Box::new(file));
    }

    let response = ureq::get(uri).call().map_err(|e| BuildpackError::Download {
        uri: uri.to_string(),
        reason: e.to_string(),
    })?;
    Ok(Box::new(response.into_body().into_reader()))
}

/// Copy `reader` to `path`, returning the hex SHA-256 of the bytes written
fn write_hashed(mut reader: impl Read, path: &Path) -> std::io::Result<String> {
    let mut file = fs::File::create(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];

    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        file.write_all(&buffer[..read])?;
    }
    file.sync_all()?;

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::tests::dependency;
    use tempfile::TempDir;

    const CONTENT: &[u8] = b"solana release archive";

    fn sha256(bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }

    fn local_dependency(source: &Path) -> BuildpackDependency {
        let mut dep = dependency("1.17.17");
        dep.uri = format!("file://{}", source.display());
        dep.sha256 = sha256(CONTENT);
        dep
    }

    #[tokio::test]
    async fn downloads_and_verifies_local_artifact() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("solana.tar.gz");
        fs::write(&source, CONTENT).unwrap();
        let dep = local_dependency(&source);
        let cache = DependencyCache::new(vec![], dir.path().join("cache"));

        let artifact = cache.artifact(&dep).await.unwrap();

        assert_eq!(artifact, dir.path().join("cache").join(&dep.sha256).join("solana.tar.gz"));
        assert_eq!(fs::read(&artifact).unwrap(), CONTENT);

        let descriptor = dir.path().join("cache").join(format!("{}.toml", dep.sha256));
        let recorded: BuildpackDependency =
            toml::from_str(&fs::read_to_string(descriptor).unwrap()).unwrap();
        assert_eq!(recorded, dep);
    }

    #[tokio::test]
    async fn second_lookup_hits_cache() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("solana.tar.gz");
        fs::write(&source, CONTENT).unwrap();
        let dep = local_dependency(&source);
        let cache = DependencyCache::new(vec![], dir.path().join("cache"));

        let first = cache.artifact(&dep).await.unwrap();
        fs::remove_file(&source).unwrap();
        let second = cache.artifact(&dep).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn checksum_mismatch_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("solana.tar.gz");
        fs::write(&source, b"tampered").unwrap();
        let dep = local_dependency(&source);
        let cache = DependencyCache::new(vec![], dir.path().join("cache"));

        let err = cache.artifact(&dep).await.unwrap_err();

        assert!(matches!(err, BuildpackError::ChecksumMismatch { .. }));
        assert!(!dir.path().join("cache").join(&dep.sha256).exists());
        assert!(!dir.path().join("cache").join(format!("{}.toml", dep.sha256)).exists());
    }

    #[tokio::test]
    async fn offline_root_is_preferred() {
        let dir = TempDir::new().unwrap();
        let dep = local_dependency(&dir.path().join("missing.tar.gz"));

        let offline = dir.path().join("dependencies");
        fs::create_dir_all(offline.join(&dep.sha256)).unwrap();
        fs::write(offline.join(&dep.sha256).join("missing.tar.gz"), CONTENT).unwrap();
        fs::write(offline.join(format!("{}.toml", dep.sha256)), "").unwrap();

        let cache = DependencyCache::new(vec![offline.clone()], dir.path().join("cache"));
        let artifact = cache.artifact(&dep).await.unwrap();

        assert!(artifact.starts_with(&offline));
    }

    #[tokio::test]
    async fn missing_source_is_download_error() {
        let dir = TempDir::new().unwrap();
        let dep = local_dependency(&dir.path().join("missing.tar.gz"));
        let cache = DependencyCache::new(vec![], dir.path().join("cache"));

        let err = cache.artifact(&dep).await.unwrap_err();
        assert!(matches!(err, BuildpackError::Download { .. }));
    }

    #[test]
    fn default_roots_follow_buildpack_dir() {
        let cache = DependencyCache::for_buildpack(Some(Path::new("/cnb/buildpacks/solana")));
        assert_eq!(
            cache.offline_roots,
            vec![PathBuf::from("/cnb/buildpacks/solana/dependencies")]
        );
        assert!(cache.download_root().ends_with(DOWNLOAD_DIR));
    }
}
