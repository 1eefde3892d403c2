//! Turns a resolved path into a listing or a file view.

use chrono::{DateTime, Local};
use std::{io, path::Path};
use tokio::{fs, io::AsyncReadExt};
use tracing::{debug, warn};

use crate::{
    error::BrowseError,
    language::language_for,
    resolver::{BaseRoot, ResolvedPath},
};

/// Files above this size are never read for inline display.
pub const MAX_INLINE_SIZE: u64 = 1024 * 1024;

#[derive(Debug)]
pub enum Classification {
    Listing(DirectoryListing),
    File(FileView),
}

#[derive(Debug, Default)]
pub struct DirectoryListing {
    pub entries: Vec<DirEntryInfo>,
}

#[derive(Debug, Clone)]
pub struct DirEntryInfo {
    pub name: String,
    pub path: String, // Relative to the base root, `/`-separated
    pub is_dir: bool,
    pub size: u64, // 0 for directories
    pub modified: Option<DateTime<Local>>,
}

#[derive(Debug)]
pub enum FileView {
    Text(TextContent),
    TooLarge { size: u64 },
    Binary { size: u64 },
}

#[derive(Debug)]
pub struct TextContent {
    pub content: String,
    pub language: &'static str,
    pub mime_type: String,
    pub size: u64,
}

/// Inspects `resolved` once and decides how it should be presented.
pub async fn classify(
    base: &BaseRoot,
    resolved: &ResolvedPath,
) -> Result<Classification, BrowseError> {
    let metadata = fs::metadata(resolved).await.map_err(BrowseError::from_io)?;

    if metadata.is_dir() {
        let listing = list_directory(base, resolved).await.map_err(|e| {
            warn!("Failed to list {}: {}", resolved.as_path().display(), e);
            BrowseError::Internal(e)
        })?;
        Ok(Classification::Listing(listing))
    } else if metadata.is_file() {
        view_file(resolved).await.map(Classification::File)
    } else {
        // Sockets, fifos and devices are neither browsable nor viewable.
        Err(BrowseError::NotFound)
    }
}

async fn list_directory(base: &BaseRoot, dir: &ResolvedPath) -> io::Result<DirectoryListing> {
    let mut reader = fs::read_dir(dir).await?;
    let dir_rel = base.relative(dir);
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let name = match entry.file_name().into_string() {
            Ok(n) => n,
            Err(raw) => {
                warn!(
                    "Skipping entry with non-UTF8 filename {:?} in {}",
                    raw,
                    dir.as_path().display()
                );
                continue;
            }
        };

        if name.starts_with('.') {
            continue;
        }

        // Follows symlinks so a linked directory is browsable like a real one.
        let metadata = fs::metadata(entry.path()).await?;
        let is_dir = metadata.is_dir();

        entries.push(DirEntryInfo {
            path: if dir_rel.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", dir_rel, name)
            },
            name,
            is_dir,
            size: if is_dir { 0 } else { metadata.len() },
            modified: metadata.modified().ok().map(DateTime::<Local>::from),
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(DirectoryListing { entries })
}

async fn view_file(resolved: &ResolvedPath) -> Result<FileView, BrowseError> {
    let path = resolved.as_path();
    let file = fs::File::open(path).await.map_err(BrowseError::from_io)?;
    let size = file.metadata().await?.len();

    if size > MAX_INLINE_SIZE {
        debug!("{} is {} bytes, not reading", path.display(), size);
        return Ok(FileView::TooLarge { size });
    }

    // One byte past the limit is enough to notice a file that grew since the stat.
    let mut bytes = Vec::with_capacity(size as usize);
    file.take(MAX_INLINE_SIZE + 1).read_to_end(&mut bytes).await?;
    if bytes.len() as u64 > MAX_INLINE_SIZE {
        return Ok(FileView::TooLarge {
            size: bytes.len() as u64,
        });
    }

    // Highlighting follows the requested name, so a symlink shows as what it is called.
    let name = Path::new(resolved.name().unwrap_or_default());
    match String::from_utf8(bytes) {
        Ok(content) => Ok(FileView::Text(TextContent {
            content,
            language: language_for(name),
            mime_type: mime_guess::from_path(name).first_or_text_plain().to_string(),
            size,
        })),
        Err(_) => Ok(FileView::Binary { size }),
    }
}
