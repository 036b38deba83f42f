use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod archive;
pub mod area;
pub mod reorder;
pub mod report;

#[cfg(test)]
mod test_fixture;

pub use archive::{ArchiveEntry, ArchiveWriter, EntryReader};
pub use area::{Actor, AreaResource, Container, Item};
pub use reorder::{sort_container_items, ReorderSummary};
pub use report::{report, AreaSummary, ContainerSummary};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SorterSettings {
    pub input_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub area: Option<String>,
    pub sort: bool,
    pub debug: bool,
}

#[derive(Debug, Error)]
pub enum SorterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("truncated {context}: expected {expected} bytes, got {got}")]
    Truncated {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("bad {context} tag: expected {expected:?}, found {found:?}")]
    Format {
        context: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("entry '{name}' decompressed to {actual} bytes but its header records {expected}")]
    Integrity {
        name: String,
        expected: u32,
        actual: usize,
    },

    #[error(
        "{array} array at offset {offset:#06X} ({count} records of {stride:#X} bytes) \
         extends past the end of the {len}-byte area"
    )]
    RecordsOutOfBounds {
        array: &'static str,
        offset: usize,
        count: usize,
        stride: usize,
        len: usize,
    },

    #[error("container {container} references items {start}..{end} but the area only has {item_count}")]
    ItemRangeOutOfBounds {
        container: usize,
        start: u64,
        end: u64,
        item_count: usize,
    },

    #[error("value {value:?} does not fit a {width}-byte ASCII field")]
    FieldTooLong { value: String, width: usize },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SorterError>;

/// One line of the entry listing produced when no area is requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryListing {
    pub name: String,
    pub uncompressed_length: u32,
    pub compressed_length: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Listed {
        entries: Vec<EntryListing>,
    },
    AreaNotFound {
        area: String,
    },
    Reported {
        area: String,
        before: AreaSummary,
        after: Option<AreaSummary>,
        reorder: Option<ReorderSummary>,
        output_path: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct RunLog<'a> {
    settings: &'a SorterSettings,
    outcome: &'a RunOutcome,
}

fn open_archive(path: &Path) -> Result<EntryReader<BufReader<File>>> {
    let file = File::open(path)?;
    EntryReader::new(BufReader::new(file))
}

/// Lists every entry of the save archive in file order.
pub fn list_entries(path: &Path) -> Result<Vec<EntryListing>> {
    let mut listing = Vec::new();
    for entry in open_archive(path)? {
        let entry = entry?;
        listing.push(EntryListing {
            name: entry.name().to_string(),
            uncompressed_length: entry.uncompressed_length,
            compressed_length: entry.compressed_length(),
        });
    }
    Ok(listing)
}

/// Decodes the first entry named `area_name` as an area resource.
pub fn load_area(path: &Path, area_name: &str) -> Result<Option<AreaResource>> {
    for entry in open_archive(path)? {
        let entry = entry?;
        if entry.name() != area_name {
            continue;
        }
        let data = entry.decompress()?;
        debug!(
            area = area_name,
            compressed = entry.compressed_length(),
            uncompressed = data.len(),
            "decompressed area entry"
        );
        return AreaResource::parse(data).map(Some);
    }
    Ok(None)
}

/// Re-reads the archive at `path` from the start and re-emits it, swapping the
/// payload of the first entry named `area_name` for `payload`.
///
/// Every other entry keeps its original compressed bytes. Returns `None` when
/// no entry matched.
pub fn rewrite_archive(path: &Path, area_name: &str, payload: &[u8]) -> Result<Option<Vec<u8>>> {
    let mut writer = ArchiveWriter::new(Vec::new())?;
    let mut replaced = false;

    for entry in open_archive(path)? {
        let entry = entry?;
        if !replaced && entry.name() == area_name {
            let updated = entry.with_payload(payload)?;
            debug!(
                area = area_name,
                old_compressed = entry.compressed_length(),
                new_compressed = updated.compressed_length(),
                "replaced area payload"
            );
            writer.write_entry(&updated)?;
            replaced = true;
        } else {
            writer.write_entry(&entry)?;
        }
    }

    let out = writer.finish()?;
    Ok(replaced.then_some(out))
}

fn validate_settings(settings: &SorterSettings) -> Result<()> {
    if !settings.input_path.exists() {
        return Err(SorterError::Config(format!(
            "Input path does not exist: {}",
            settings.input_path.display()
        )));
    }

    if settings.sort {
        if settings.area.is_none() {
            return Err(SorterError::Config(
                "sorting requires an area name".to_string(),
            ));
        }
        if settings.output_path.is_none() {
            return Err(SorterError::Config(
                "sorting requires an output path".to_string(),
            ));
        }
    }

    Ok(())
}

fn run_log_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".log.json");
    PathBuf::from(name)
}

pub fn run(settings: &SorterSettings) -> Result<RunOutcome> {
    validate_settings(settings)?;

    let Some(area_name) = settings.area.as_deref() else {
        let entries = list_entries(&settings.input_path)?;
        info!(entries = entries.len(), "listed save archive");
        return Ok(RunOutcome::Listed { entries });
    };

    let Some(mut area) = load_area(&settings.input_path, area_name)? else {
        warn!(area = area_name, "area not found in save archive");
        return Ok(RunOutcome::AreaNotFound {
            area: area_name.to_string(),
        });
    };

    info!(
        area = area_name,
        actors = area.actors().len(),
        items = area.items().len(),
        containers = area.containers().len(),
        "parsed area"
    );
    let before = AreaSummary::from_area(&area)?;

    let output_path = match (settings.sort, settings.output_path.as_ref()) {
        (true, Some(output_path)) => output_path,
        _ => {
            return Ok(RunOutcome::Reported {
                area: area_name.to_string(),
                before,
                after: None,
                reorder: None,
                output_path: None,
            });
        }
    };

    let reorder = sort_container_items(&mut area)?;
    info!(
        sorted = reorder.containers_sorted,
        skipped = reorder.containers_skipped,
        moved = reorder.slots_moved,
        "sorted container items"
    );
    let after = AreaSummary::from_area(&area)?;

    let rebuilt = rewrite_archive(&settings.input_path, area_name, area.as_bytes())?
        .ok_or_else(|| {
            SorterError::Config(format!(
                "area '{area_name}' disappeared from {} between passes",
                settings.input_path.display()
            ))
        })?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(output_path, &rebuilt)?;
    info!(path = %output_path.display(), bytes = rebuilt.len(), "wrote save archive");

    let outcome = RunOutcome::Reported {
        area: area_name.to_string(),
        before,
        after: Some(after),
        reorder: Some(reorder),
        output_path: Some(output_path.clone()),
    };

    if settings.debug {
        let log = RunLog {
            settings,
            outcome: &outcome,
        };
        let text = serde_json::to_string_pretty(&log)
            .map_err(|e| SorterError::Config(format!("failed to serialise run log: {e}")))?;
        fs::write(run_log_path(output_path), text)?;
    }

    Ok(outcome)
}
