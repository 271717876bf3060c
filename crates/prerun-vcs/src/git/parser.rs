//! Parsers for git command output.

use prerun_core::{ChangeKind, CvsResource};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

use crate::paths::absolute;

/// `XY PATH` where X, the index column, is one we report
fn porcelain_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([MADRC]). (.+)$").expect("valid porcelain regex"))
}

/// Parse `git status --porcelain` output into resources under `root`.
///
/// Only the index column is inspected, so unstaged-only and untracked entries
/// are skipped, as is anything that does not look like a porcelain line.
/// Copies are reported as additions of the new path.
pub fn parse_porcelain_status(root: &Path, output: &str) -> Vec<CvsResource> {
    let mut resources = Vec::new();

    // Only the end of the output is trimmed: leading spaces are the X column
    for line in output.trim_end().lines() {
        let Some(captures) = porcelain_regex().captures(line) else {
            continue;
        };
        let code = &captures[1];
        let path_field = captures[2].trim();

        let resource = match code {
            "M" => status_resource(ChangeKind::Modified, root, path_field),
            "A" => status_resource(ChangeKind::Added, root, path_field),
            "D" => status_resource(ChangeKind::Deleted, root, path_field),
            "R" => split_rename(path_field).map(|(old, new)| {
                CvsResource::renamed(absolute(root, &new), absolute(root, &old), new)
            }),
            "C" => split_rename(path_field)
                .and_then(|(_, new)| status_resource(ChangeKind::Added, root, &new)),
            _ => None,
        };

        match resource {
            Some(resource) => resources.push(resource),
            None => debug!("Skipping porcelain line: {}", line),
        }
    }

    debug!("{} changed resource(s) detected", resources.len());
    resources
}

fn status_resource(kind: ChangeKind, root: &Path, path_field: &str) -> Option<CvsResource> {
    let relative = unquote(path_field);
    CvsResource::new(kind, absolute(root, &relative), relative).ok()
}

fn split_rename(path_field: &str) -> Option<(String, String)> {
    let (old, new) = path_field.split_once("->")?;
    let (old, new) = (unquote(old.trim()), unquote(new.trim()));
    if old.is_empty() || new.is_empty() {
        return None;
    }
    Some((old, new))
}

/// Git quotes paths with unusual characters (`core.quotePath`): strip the
/// outer quotes and decode the C-style escapes inside
fn unquote(path: &str) -> String {
    match path.strip_prefix('"').and_then(|p| p.strip_suffix('"')) {
        Some(quoted) => decode_c_escapes(quoted),
        None => path.to_string(),
    }
}

/// Decode `\\`, `\"`, `\t`, `\n` and friends plus `\ooo` octal bytes, which
/// git uses for every non-ASCII byte of a UTF-8 path
fn decode_c_escapes(quoted: &str) -> String {
    let mut bytes = Vec::with_capacity(quoted.len());
    let mut input = quoted.bytes().peekable();

    while let Some(byte) = input.next() {
        if byte != b'\\' {
            bytes.push(byte);
            continue;
        }
        match input.next() {
            Some(digit @ b'0'..=b'7') => {
                let mut value = u32::from(digit - b'0');
                for _ in 0..2 {
                    match input.peek() {
                        Some(&next @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(next - b'0');
                            input.next();
                        }
                        _ => break,
                    }
                }
                bytes.push((value & 0xff) as u8);
            }
            Some(b'a') => bytes.push(0x07),
            Some(b'b') => bytes.push(0x08),
            Some(b'f') => bytes.push(0x0c),
            Some(b'n') => bytes.push(b'\n'),
            Some(b'r') => bytes.push(b'\r'),
            Some(b't') => bytes.push(b'\t'),
            Some(b'v') => bytes.push(0x0b),
            Some(other) => bytes.push(other),
            None => bytes.push(b'\\'),
        }
    }

    String::from_utf8_lossy(&bytes).into_owned()
}

/// First line of the output, trimmed; empty if there is none
pub fn first_line(output: &str) -> &str {
    output.lines().next().map(str::trim).unwrap_or("")
}

/// `--since` value for the first day of the month `date` falls in
pub fn first_month_since(date: chrono::NaiveDate) -> String {
    use chrono::Datelike;
    format!("{}.{}.1", date.year(), date.month())
}

/// Format a resource path for a remote run:
/// `jetbrains.git://<first>-<last>||<relative>`, without `<first>-` when
/// there is no first-month revision
pub fn format_server_path(first_month_rev: &str, last_rev: &str, relative: &str) -> String {
    if first_month_rev.is_empty() {
        format!("jetbrains.git://{}||{}", last_rev, relative)
    } else {
        format!("jetbrains.git://{}-{}||{}", first_month_rev, last_rev, relative)
    }
}
