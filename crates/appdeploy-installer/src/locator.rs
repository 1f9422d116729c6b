use std::cmp::Ordering;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

const DESKTOP_APP_INSTALLER_DIR: &str = "Microsoft.DesktopAppInstaller_*_x64__8wekyb3d8bbwe";

/// Built-in candidate list for the package manager, in priority order.
pub fn default_candidate_patterns(manager: &str) -> Vec<PathBuf> {
    default_candidate_patterns_with_env(manager, |key| std::env::var_os(key))
}

pub fn default_candidate_patterns_with_env<Lookup>(manager: &str, lookup: Lookup) -> Vec<PathBuf>
where
    Lookup: Fn(&str) -> Option<OsString>,
{
    let exe_name = manager_exe_name(manager);
    let mut patterns = Vec::new();

    let program_files_native = lookup("ProgramW6432").or_else(|| lookup("ProgramFiles"));
    if let Some(root) = program_files_native {
        patterns.push(
            PathBuf::from(root)
                .join("WindowsApps")
                .join(DESKTOP_APP_INSTALLER_DIR)
                .join(&exe_name),
        );
    }
    if let Some(root) = lookup("ProgramFiles(x86)") {
        patterns.push(
            PathBuf::from(root)
                .join("WindowsApps")
                .join(DESKTOP_APP_INSTALLER_DIR)
                .join(&exe_name),
        );
    }
    if let Some(root) = lookup("SystemRoot") {
        patterns.push(
            PathBuf::from(root)
                .join("System32")
                .join("config")
                .join("systemprofile")
                .join("AppData")
                .join("Local")
                .join("Microsoft")
                .join("WindowsApps")
                .join(&exe_name),
        );
    }
    if let Some(root) = lookup("LOCALAPPDATA") {
        patterns.push(
            PathBuf::from(root)
                .join("Microsoft")
                .join("WindowsApps")
                .join(&exe_name),
        );
    }

    patterns
}

fn manager_exe_name(manager: &str) -> String {
    if Path::new(manager).extension().is_some() {
        manager.to_string()
    } else {
        format!("{manager}.exe")
    }
}

/// Resolves the package manager through the host command lookup, then the candidate list.
pub fn resolve_manager_path(manager: &str, patterns: &[PathBuf]) -> Option<PathBuf> {
    match which::which(manager) {
        Ok(path) => {
            log::debug!("resolved {manager} on PATH: {}", path.display());
            Some(path)
        }
        Err(err) => {
            log::debug!("{manager} is not on PATH ({err}); searching candidate paths");
            locate_executable(patterns)
        }
    }
}

/// Same as [`resolve_manager_path`] with an explicit search path and working directory.
pub fn resolve_manager_path_in(
    manager: &str,
    path_var: Option<&OsStr>,
    cwd: &Path,
    patterns: &[PathBuf],
) -> Option<PathBuf> {
    match which::which_in(manager, path_var, cwd) {
        Ok(path) => Some(path),
        Err(err) => {
            log::debug!("{manager} is not on the search path ({err}); searching candidate paths");
            locate_executable_from(patterns, cwd)
        }
    }
}

/// Returns the first existing file matched by `patterns`, trying them in order.
///
/// Patterns that fail to expand are skipped; absence is never an error. Relative patterns
/// resolve against the working directory, and the returned path is always absolute.
pub fn locate_executable(patterns: &[PathBuf]) -> Option<PathBuf> {
    let base = match std::env::current_dir() {
        Ok(base) => base,
        Err(err) => {
            log::debug!("working directory unavailable ({err}); relative candidates skipped");
            return locate_executable_from(
                &patterns
                    .iter()
                    .filter(|pattern| pattern.is_absolute())
                    .cloned()
                    .collect::<Vec<_>>(),
                Path::new("/"),
            );
        }
    };
    locate_executable_from(patterns, &base)
}

/// Same as [`locate_executable`] with relative patterns resolved against `base`.
pub fn locate_executable_from(patterns: &[PathBuf], base: &Path) -> Option<PathBuf> {
    for pattern in patterns {
        let pattern = absolute_from(base, pattern);
        let pattern = pattern.as_path();
        let candidates = match expand_pattern(pattern) {
            Ok(candidates) => candidates,
            Err(err) => {
                log::debug!("skipping candidate {}: {err}", pattern.display());
                continue;
            }
        };
        if let Some(found) = candidates.into_iter().find(|candidate| candidate.is_file()) {
            log::debug!("resolved {} from {}", found.display(), pattern.display());
            return Some(found);
        }
        log::debug!("no executable matched {}", pattern.display());
    }
    None
}

fn absolute_from(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    joined
        .components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

struct WildcardSplit {
    parent: PathBuf,
    segment: String,
    rest: Option<PathBuf>,
}

fn split_wildcard(pattern: &Path) -> Option<WildcardSplit> {
    let components = pattern.components().collect::<Vec<_>>();
    let index = components.iter().position(|component| {
        matches!(component, Component::Normal(value) if value.to_string_lossy().contains('*'))
    })?;

    let parent = components[..index].iter().collect::<PathBuf>();
    let segment = components[index].as_os_str().to_string_lossy().into_owned();
    let rest = components[index + 1..].iter().collect::<PathBuf>();
    Some(WildcardSplit {
        parent: if parent.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            parent
        },
        segment,
        rest: (!rest.as_os_str().is_empty()).then_some(rest),
    })
}

/// Expands a pattern to the concrete paths it may denote.
///
/// A literal pattern yields itself. A wildcard pattern yields one path per matching entry
/// of the wildcard's parent directory, newest version first: names are compared by their
/// digit runs as numbers, so `Pkg1.10` sorts ahead of `Pkg1.9`.
pub fn expand_pattern(pattern: &Path) -> io::Result<Vec<PathBuf>> {
    let Some(split) = split_wildcard(pattern) else {
        return Ok(vec![pattern.to_path_buf()]);
    };

    let mut matches = Vec::new();
    for entry in fs::read_dir(&split.parent)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if !segment_matches(&split.segment, name) {
            continue;
        }
        let path = match &split.rest {
            Some(rest) => entry.path().join(rest),
            None => entry.path(),
        };
        matches.push((name.to_string(), path));
    }

    matches.sort_by(|left, right| compare_versioned_names(&right.0, &left.0));
    Ok(matches.into_iter().map(|(_, path)| path).collect())
}

/// Orders names by alternating text and number runs, comparing digit runs numerically.
pub(crate) fn compare_versioned_names(left: &str, right: &str) -> Ordering {
    let mut left_runs = name_runs(left);
    let mut right_runs = name_runs(right);
    loop {
        match (left_runs.next(), right_runs.next()) {
            (None, None) => return left.cmp(right),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ordering = match (l, r) {
                    (NameRun::Number(l), NameRun::Number(r)) => {
                        let l = l.trim_start_matches('0');
                        let r = r.trim_start_matches('0');
                        l.len().cmp(&r.len()).then_with(|| l.cmp(r))
                    }
                    (NameRun::Number(_), NameRun::Text(_)) => Ordering::Less,
                    (NameRun::Text(_), NameRun::Number(_)) => Ordering::Greater,
                    (NameRun::Text(l), NameRun::Text(r)) => l.cmp(r),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

enum NameRun<'a> {
    Text(&'a str),
    Number(&'a str),
}

fn name_runs(name: &str) -> impl Iterator<Item = NameRun<'_>> {
    let mut rest = name;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let is_digit = first.is_ascii_digit();
        let end = rest
            .find(|c: char| c.is_ascii_digit() != is_digit)
            .unwrap_or(rest.len());
        let (run, tail) = rest.split_at(end);
        rest = tail;
        Some(if is_digit {
            NameRun::Number(run)
        } else {
            NameRun::Text(run)
        })
    })
}

/// Matches one path segment against a pattern where `*` stands for any character run.
pub(crate) fn segment_matches(pattern: &str, name: &str) -> bool {
    if cfg!(windows) {
        segment_matches_exact(&pattern.to_lowercase(), &name.to_lowercase())
    } else {
        segment_matches_exact(pattern, name)
    }
}

fn segment_matches_exact(pattern: &str, name: &str) -> bool {
    let parts = pattern.split('*').collect::<Vec<_>>();
    let [first, middle @ .., last] = parts.as_slice() else {
        return pattern == name;
    };

    let Some(mut remaining) = name.strip_prefix(first) else {
        return false;
    };
    for part in middle {
        let Some(index) = remaining.find(part) else {
            return false;
        };
        remaining = &remaining[index + part.len()..];
    }
    remaining.ends_with(last)
}
