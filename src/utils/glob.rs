//! Local filesystem glob resolution for webhook uploads.
//!
//! Supports `*` and `?` inside a path segment and `**` as a whole segment (zero or more
//! directories; a trailing `**` matches like `*`). Symlinked directories are not
//! descended into by `**`. Like shell globs, wildcards do not match names starting with
//! `.` unless the segment pattern itself starts with `.`. Only regular files are returned.

use regex::Regex;
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};

enum Segment {
    Literal(OsString),
    Wildcard { regex: Regex, dotfiles: bool },
    Recursive,
}

fn has_wildcard(s: &str) -> bool {
    s.contains('*') || s.contains('?')
}

fn compile_segment(segment: &str) -> Segment {
    if segment == "**" {
        return Segment::Recursive;
    }
    if !has_wildcard(segment) {
        return Segment::Literal(OsString::from(segment));
    }
    let escaped = regex::escape(segment)
        .replace("\\*", "[^/]*")
        .replace("\\?", "[^/]");
    match Regex::new(&format!("^{}$", escaped)) {
        Ok(regex) => Segment::Wildcard {
            regex,
            dotfiles: segment.starts_with('.'),
        },
        // An escaped pattern always compiles; fall back to literal matching regardless.
        Err(_) => Segment::Literal(OsString::from(segment)),
    }
}

/// Split a pattern into a literal base directory and the segments left to match.
fn split_pattern(pattern: &str) -> (PathBuf, Vec<Segment>) {
    let mut base = PathBuf::new();
    let mut segments = Vec::new();
    for component in Path::new(pattern).components() {
        match component {
            Component::Normal(part) => {
                let part_str = part.to_string_lossy();
                if segments.is_empty() && !has_wildcard(&part_str) && part_str != "**" {
                    base.push(part);
                } else {
                    segments.push(compile_segment(&part_str));
                }
            }
            other if segments.is_empty() => base.push(other.as_os_str()),
            other => segments.push(Segment::Literal(other.as_os_str().to_os_string())),
        }
    }
    (base, segments)
}

fn read_dir_sorted(dir: &Path) -> Vec<(PathBuf, fs::FileType)> {
    let lookup = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    let Ok(entries) = fs::read_dir(lookup) else {
        return Vec::new();
    };
    let mut children: Vec<(PathBuf, fs::FileType)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let file_type = entry.file_type().ok()?;
            Some((dir.join(entry.file_name()), file_type))
        })
        .collect();
    children.sort_by(|a, b| a.0.cmp(&b.0));
    children
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

fn walk(dir: &Path, segments: &[Segment], out: &mut Vec<PathBuf>) {
    let Some((head, rest)) = segments.split_first() else {
        if dir.is_file() {
            out.push(dir.to_path_buf());
        }
        return;
    };

    match head {
        Segment::Literal(name) => walk(&dir.join(name), rest, out),
        // A trailing `**` behaves like `*`.
        Segment::Recursive if rest.is_empty() => {
            for (child, _) in read_dir_sorted(dir) {
                if !is_hidden(&child) && child.is_file() {
                    out.push(child);
                }
            }
        }
        Segment::Recursive => {
            walk(dir, rest, out);
            // DirEntry::file_type does not follow symlinks, so linked directories are skipped.
            for (child, file_type) in read_dir_sorted(dir) {
                if file_type.is_dir() && !is_hidden(&child) {
                    walk(&child, segments, out);
                }
            }
        }
        Segment::Wildcard { regex, dotfiles } => {
            for (child, _) in read_dir_sorted(dir) {
                let Some(name) = child.file_name() else {
                    continue;
                };
                let name = name.to_string_lossy();
                if name.starts_with('.') && !dotfiles {
                    continue;
                }
                if regex.is_match(&name) {
                    walk(&child, rest, out);
                }
            }
        }
    }
}

/// Resolve `pattern` against the local filesystem.
///
/// Returns matching regular files, sorted and de-duplicated. Unreadable directories are
/// skipped; an empty result is the caller's to interpret.
pub fn resolve(pattern: &str) -> Vec<PathBuf> {
    let (base, segments) = split_pattern(pattern);
    let mut out = Vec::new();
    walk(&base, &segments, &mut out);
    out.sort();
    out.dedup();
    out
}
