//! Property-based tests for identifier normalization and dependency dedup.

#[cfg(test)]
mod proptest_tests {
    use std::collections::HashSet;

    use crate::identifier::{escape_module_path, RepoId, DEFAULT_HOST};
    use crate::manifest::{dedup_by_path, Dependency};
    use proptest::prelude::*;

    const SEGMENT: &str = "[a-zA-Z0-9][a-zA-Z0-9_.-]{0,15}";

    fn segment() -> impl Strategy<Value = String> {
        SEGMENT.prop_filter("not a .git suffix", |s| !s.ends_with(".git"))
    }

    // ============================================================================
    // RepoId property tests
    // ============================================================================

    proptest! {
        /// Property: parsing a canonical URL gives back the same canonical URL
        #[test]
        fn canonical_url_is_a_fixed_point(host in "[a-z]{1,10}\\.com", owner in segment(), name in segment()) {
            let id = RepoId::parse(&format!("{}/{}/{}", host, owner, name)).unwrap();
            let canonical = id.canonical_url();
            prop_assert_eq!(RepoId::parse(&canonical).unwrap().canonical_url(), canonical);
        }

        /// Property: scheme, `.git` and trailing slash never change the key
        #[test]
        fn url_spellings_share_a_key(host in "[a-z]{1,10}\\.com", owner in segment(), name in segment()) {
            let plain = RepoId::parse(&format!("{}/{}/{}", host, owner, name)).unwrap();
            for spelling in [
                format!("https://{}/{}/{}.git", host, owner, name),
                format!("https://{}/{}/{}/", host, owner, name),
                format!("{}/{}/{}.git", host, owner, name),
            ] {
                let parsed = RepoId::parse(&spelling).unwrap();
                prop_assert_eq!(parsed.canonical_url(), plain.canonical_url());
            }
        }

        /// Property: a bare owner/name lands on the default host
        #[test]
        fn bare_spelling_shares_default_host_key(owner in segment(), name in segment()) {
            let bare = RepoId::parse(&format!("{}/{}", owner, name)).unwrap();
            for spelling in [
                format!("{}/{}/{}", DEFAULT_HOST, owner, name),
                format!("https://{}/{}/{}.git", DEFAULT_HOST, owner, name),
                format!("{}/{}/", owner, name),
            ] {
                let parsed = RepoId::parse(&spelling).unwrap();
                prop_assert_eq!(parsed.canonical_url(), bare.canonical_url());
            }
        }

        /// Property: the canonical URL always carries a host
        #[test]
        fn canonical_url_is_host_qualified(owner in segment(), name in segment()) {
            let id = RepoId::parse(&format!("{}/{}", owner, name)).unwrap();
            prop_assert_eq!(id.canonical_url().split('/').count(), 3);
        }

        /// Property: the canonical name is the last path segment
        #[test]
        fn name_is_last_segment(owner in segment(), name in segment()) {
            let id = RepoId::parse(&format!("{}/{}", owner, name)).unwrap();
            prop_assert_eq!(&id.name, &name);
            let suffix = format!("/{}.git", name);
            prop_assert!(id.clone_url().ends_with(&suffix));
        }
    }

    // ============================================================================
    // Module path escaping property tests
    // ============================================================================

    proptest! {
        /// Property: escaped paths contain no upper-case letters
        #[test]
        fn escaped_path_is_lower_case(path in "[a-zA-Z0-9./-]{1,40}") {
            let escaped = escape_module_path(&path);
            prop_assert!(!escaped.chars().any(|c| c.is_ascii_uppercase()));
        }

        /// Property: lower-case paths are left alone
        #[test]
        fn lower_case_path_unchanged(path in "[a-z0-9./-]{1,40}") {
            prop_assert_eq!(escape_module_path(&path), path);
        }
    }

    // ============================================================================
    // dedup_by_path property tests
    // ============================================================================

    proptest! {
        /// Property: dedup leaves unique paths, first occurrence first
        #[test]
        fn dedup_keeps_first_occurrences(paths in prop::collection::vec("[a-c]{1,2}", 0..30)) {
            let deps: Vec<Dependency> = paths
                .iter()
                .enumerate()
                .map(|(i, p)| Dependency::new(format!("example.com/{}", p), format!("v1.0.{}", i)))
                .collect();
            let deduped = dedup_by_path(deps.clone());

            let unique: HashSet<&str> = deduped.iter().map(|d| d.path.as_str()).collect();
            prop_assert_eq!(unique.len(), deduped.len());

            let mut seen = HashSet::new();
            let expected: Vec<&Dependency> = deps.iter().filter(|d| seen.insert(d.path.clone())).collect();
            prop_assert_eq!(deduped.iter().collect::<Vec<_>>(), expected);
        }

        /// Property: dedup is idempotent
        #[test]
        fn dedup_is_idempotent(paths in prop::collection::vec("[a-d]", 0..20)) {
            let deps: Vec<Dependency> = paths
                .iter()
                .map(|p| Dependency::new(p.clone(), "v0.1.0"))
                .collect();
            let once = dedup_by_path(deps);
            prop_assert_eq!(dedup_by_path(once.clone()), once);
        }
    }
}
