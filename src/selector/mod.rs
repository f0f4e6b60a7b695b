use std::cmp::Ordering;

use crate::engine::models::VersionDescriptor;

/// Ordering used for every version listing: newest release first.
///
/// Entries whose date cannot be parsed sort after every dated entry. Equal
/// dates fall back to the version number (highest first) and finally to the
/// raw version string, so the order is total and sorting is idempotent.
pub fn newest_first(a: &VersionDescriptor, b: &VersionDescriptor) -> Ordering {
    let by_date = match (a.released_at(), b.released_at()) {
        (Some(a_ts), Some(b_ts)) => b_ts.cmp(&a_ts),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_date
        .then_with(|| compare_versions(&b.version, &a.version))
        .then_with(|| b.version.cmp(&a.version))
}

pub fn sort_by_release_date(versions: &mut [VersionDescriptor]) {
    versions.sort_by(newest_first);
}

/// Sorted copy of `versions`; the input is left untouched.
pub fn sorted_by_release_date(versions: &[VersionDescriptor]) -> Vec<VersionDescriptor> {
    let mut sorted = versions.to_vec();
    sort_by_release_date(&mut sorted);
    sorted
}

/// Pick the version offered by default: the most recent release.
pub fn select_default(versions: &[VersionDescriptor]) -> Option<&VersionDescriptor> {
    versions.iter().min_by(|a, b| newest_first(a, b))
}

/// Normalize version string by removing 'v' prefix and cleaning up.
fn normalize_version(version: &str) -> &str {
    version.trim().trim_start_matches('v')
}

/// Compare two dotted numeric versions, `v` prefix tolerated.
/// Missing components count as zero, so "1.0" equals "1.0.0".
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parts_a = parse_version_parts(normalize_version(a));
    let parts_b = parse_version_parts(normalize_version(b));

    let max_len = parts_a.len().max(parts_b.len());
    for i in 0..max_len {
        let a_part = parts_a.get(i).copied().unwrap_or(0);
        let b_part = parts_b.get(i).copied().unwrap_or(0);
        match a_part.cmp(&b_part) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    Ordering::Equal
}

/// Parse version string into parts (e.g., "0.1.5" -> [0, 1, 5]).
fn parse_version_parts(version: &str) -> Vec<u32> {
    version
        .split('.')
        .filter_map(|part| part.parse::<u32>().ok())
        .collect()
}
