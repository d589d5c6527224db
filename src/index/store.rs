use std::io::Write;
use std::path::Path;

use tracing::debug;

use super::FileIndex;

/// Current index format version. Bump when `FileRecord` layout changes.
pub const INDEX_VERSION: u32 = 1;

/// Envelope wrapping the serialized index with its format version.
#[derive(serde::Serialize, serde::Deserialize)]
struct IndexEnvelope {
    version: u32,
    index: FileIndex,
}

/// Save the index to `path` atomically using bincode serialization.
///
/// Writes to a temp file in the same directory, then renames over the target.
pub fn save_index(path: &Path, index: &FileIndex) -> anyhow::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)?;

    let envelope = IndexEnvelope {
        version: INDEX_VERSION,
        index: index.clone(),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    bincode::serde::encode_into_std_write(&envelope, &mut tmp, bincode::config::standard())?;
    tmp.as_file().flush()?;
    tmp.persist(path)?;

    Ok(())
}

/// Load the index from `path`. A missing, corrupt or version-mismatched file
/// yields an empty index.
pub fn load_index(path: &Path) -> FileIndex {
    let Ok(bytes) = std::fs::read(path) else {
        return FileIndex::new();
    };
    let result =
        bincode::serde::decode_from_slice::<IndexEnvelope, _>(&bytes, bincode::config::standard());
    match result {
        Ok((envelope, _)) if envelope.version == INDEX_VERSION => envelope.index,
        Ok((envelope, _)) => {
            debug!(
                "index version {} != {INDEX_VERSION}; starting empty",
                envelope.version
            );
            FileIndex::new()
        }
        Err(err) => {
            debug!("unreadable index {}: {err}", path.display());
            FileIndex::new()
        }
    }
}
