//! Parsers for the TFVC command-line client output.
//!
//! Two outputs are understood:
//!
//! - `tf workfold <path>`: the collection URL and the server to local
//!   folder mappings of the workspace
//! - `tf status <path> -recursive -format:detailed`: one block per pending
//!   change, a server item line followed by indented `Key : value` lines

use std::path::PathBuf;

/// One server folder mapped to a local folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkfoldMapping {
    pub server_path: String,
    pub local_path: PathBuf,
}

/// Parsed `tf workfold` output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workfold {
    pub collection: Option<String>,
    pub mappings: Vec<WorkfoldMapping>,
}

impl Workfold {
    /// Local path of a server item through the most specific mapping
    pub fn local_path_for(&self, server_item: &str) -> Option<PathBuf> {
        self.mappings
            .iter()
            .filter(|m| server_path_starts_with(server_item, &m.server_path))
            .max_by_key(|m| m.server_path.len())
            .map(|m| {
                server_item[m.server_path.len()..]
                    .split('/')
                    .filter(|part| !part.is_empty())
                    .fold(m.local_path.clone(), |path, part| path.join(part))
            })
    }
}

/// Server paths are case-insensitive and a prefix must end on a folder
fn server_path_starts_with(item: &str, folder: &str) -> bool {
    let folder = folder.trim_end_matches('/');
    if item.len() < folder.len() || !item.is_char_boundary(folder.len()) {
        return false;
    }
    let (head, rest) = item.split_at(folder.len());
    head.eq_ignore_ascii_case(folder) && (rest.is_empty() || rest.starts_with('/'))
}

pub fn parse_workfold(output: &str) -> Workfold {
    let mut workfold = Workfold::default();

    for line in output.lines() {
        let line = line.trim();
        if let Some(url) = line.strip_prefix("Collection:") {
            workfold.collection = Some(url.trim().trim_end_matches('/').to_string());
            continue;
        }
        // Cloaked folders have no local path
        if !line.starts_with("$/") {
            continue;
        }
        if let Some((server, local)) = line.split_once(": ") {
            let local = local.trim();
            if local.is_empty() {
                continue;
            }
            workfold.mappings.push(WorkfoldMapping {
                server_path: server.trim().trim_end_matches('/').to_string(),
                local_path: PathBuf::from(local),
            });
        }
    }

    workfold
}

/// One pending change from `tf status -format:detailed`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusEntry {
    pub server_item: String,
    pub change: String,
    pub local_item: Option<PathBuf>,
    pub source_item: Option<String>,
}

pub fn parse_detailed_status(output: &str) -> Vec<StatusEntry> {
    let mut entries = Vec::new();
    let mut current: Option<StatusEntry> = None;

    for line in output.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            entries.extend(current.take());
            continue;
        }

        if !line.starts_with(char::is_whitespace) && trimmed.starts_with("$/") {
            entries.extend(current.take());
            current = Some(StatusEntry {
                server_item: strip_version(trimmed).to_string(),
                ..StatusEntry::default()
            });
            continue;
        }

        let Some(entry) = current.as_mut() else {
            continue;
        };
        let Some((key, value)) = trimmed.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "change" => entry.change = value.to_ascii_lowercase(),
            "local item" => entry.local_item = Some(PathBuf::from(strip_machine(value))),
            "source item" => entry.source_item = Some(strip_version(value).to_string()),
            _ => {}
        }
    }
    entries.extend(current);

    entries
}

/// `$/Proj/a.cs;C42` -> `$/Proj/a.cs`
fn strip_version(item: &str) -> &str {
    item.split(';').next().unwrap_or(item).trim()
}

/// `[MACHINE] /home/u/ws/a.cs` -> `/home/u/ws/a.cs`
fn strip_machine(value: &str) -> &str {
    if value.starts_with('[') {
        if let Some(end) = value.find("] ") {
            return value[end + 2..].trim();
        }
    }
    value
}
