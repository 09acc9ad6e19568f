use loom_core::CachingMode;

use crate::path::VfsPath;

/// What to do with a directory listing on access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    UseCache,
    Refresh,
    /// The directory timestamp reads as `0`: treat it as deleted without scanning.
    Empty,
}

/// Cached child listing of one directory.
#[derive(Debug, Default)]
pub(crate) struct Listing {
    pub(crate) files: Option<Vec<VfsPath>>,
    pub(crate) dirs: Option<Vec<VfsPath>>,
    /// Directory timestamp observed at the last refresh; `None` until the first refresh.
    pub(crate) last_timestamp: Option<i64>,
    /// Wall clock time of the last refresh.
    pub(crate) last_refresh: i64,
}

/// Two timestamps closer than this are indistinguishable on coarse-grained file systems.
pub(crate) const FUZZY_WINDOW_MILLIS: i64 = 16;

impl Listing {
    pub(crate) fn is_populated(&self) -> bool {
        self.files.is_some() && self.dirs.is_some()
    }

    /// `current` is the directory's modification timestamp, read only for the timestamp modes.
    pub(crate) fn decide(&self, mode: CachingMode, current: i64) -> Decision {
        match mode {
            CachingMode::NoCaching => Decision::Refresh,
            CachingMode::FullCaching => {
                if self.is_populated() {
                    Decision::UseCache
                } else {
                    Decision::Refresh
                }
            }
            CachingMode::CheckTimestamps => match self.last_timestamp {
                None => Decision::Refresh,
                Some(_) if current == 0 => Decision::Empty,
                Some(last) if last != current => Decision::Refresh,
                Some(_) => Decision::UseCache,
            },
            CachingMode::FuzzyTimestamps => match self.last_timestamp {
                None => Decision::Refresh,
                Some(_) if current == 0 => Decision::Empty,
                Some(last) if last != current => Decision::Refresh,
                Some(_) => {
                    // A refresh that happened within the window of the directory's own timestamp
                    // may have missed a change carrying the same timestamp.
                    let delta = self.last_refresh - current;
                    if -FUZZY_WINDOW_MILLIS < delta && delta < FUZZY_WINDOW_MILLIS {
                        Decision::Refresh
                    } else {
                        Decision::UseCache
                    }
                }
            },
        }
    }

    pub(crate) fn store(
        &mut self,
        files: Vec<VfsPath>,
        dirs: Vec<VfsPath>,
        timestamp: i64,
        now: i64,
    ) {
        self.files = Some(files);
        self.dirs = Some(dirs);
        self.last_timestamp = Some(timestamp);
        self.last_refresh = now;
    }

    pub(crate) fn set_empty(&mut self) {
        self.files = Some(Vec::new());
        self.dirs = Some(Vec::new());
    }

    pub(crate) fn clear(&mut self) {
        *self = Listing::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refreshed(timestamp: i64, now: i64) -> Listing {
        let mut listing = Listing::default();
        listing.store(Vec::new(), Vec::new(), timestamp, now);
        listing
    }

    #[test]
    fn unset_timestamp_always_refreshes() {
        let listing = Listing::default();
        for mode in [
            CachingMode::NoCaching,
            CachingMode::CheckTimestamps,
            CachingMode::FuzzyTimestamps,
            CachingMode::FullCaching,
        ] {
            assert_eq!(listing.decide(mode, 1_000), Decision::Refresh, "{mode}");
        }
    }

    #[test]
    fn check_timestamps_compares_exactly_and_treats_zero_as_deleted() {
        let listing = refreshed(1_000, 1_005);
        assert_eq!(
            listing.decide(CachingMode::CheckTimestamps, 1_000),
            Decision::UseCache
        );
        assert_eq!(
            listing.decide(CachingMode::CheckTimestamps, 1_001),
            Decision::Refresh
        );
        assert_eq!(
            listing.decide(CachingMode::CheckTimestamps, 0),
            Decision::Empty
        );
    }

    #[test]
    fn fuzzy_timestamps_rescan_inside_the_window() {
        assert_eq!(
            refreshed(1_000, 1_015).decide(CachingMode::FuzzyTimestamps, 1_000),
            Decision::Refresh
        );
        assert_eq!(
            refreshed(1_000, 985).decide(CachingMode::FuzzyTimestamps, 1_000),
            Decision::Refresh
        );
        assert_eq!(
            refreshed(1_000, 1_016).decide(CachingMode::FuzzyTimestamps, 1_000),
            Decision::UseCache
        );
        assert_eq!(
            refreshed(1_000, 5_000).decide(CachingMode::FuzzyTimestamps, 1_001),
            Decision::Refresh
        );
    }

    #[test]
    fn full_caching_lists_once() {
        let listing = refreshed(1_000, 1_000);
        assert_eq!(
            listing.decide(CachingMode::FullCaching, 99_999),
            Decision::UseCache
        );
        assert_eq!(
            listing.decide(CachingMode::NoCaching, 1_000),
            Decision::Refresh
        );
    }
}
