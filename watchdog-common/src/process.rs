use crate::MatchStrategy;

/// Lower-cased listing of the process names running on the host at one instant.
///
/// One name per line. Ordering and de-duplication are not guaranteed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSnapshot {
    listing: String,
}

impl ProcessSnapshot {
    pub fn from_listing(raw: &str) -> Self {
        Self {
            listing: raw.to_lowercase(),
        }
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_string())
            .filter(|n| !n.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        Self::from_listing(&joined)
    }

    /// An empty snapshot means acquisition produced nothing usable.
    pub fn is_empty(&self) -> bool {
        self.listing.trim().is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.listing
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.listing.lines().map(str::trim).filter(|l| !l.is_empty())
    }

    /// `name` must already be lower-cased.
    pub fn matches(&self, name: &str, strategy: MatchStrategy) -> bool {
        if name.is_empty() {
            return false;
        }
        match strategy {
            MatchStrategy::Substring => self.listing.contains(name),
            MatchStrategy::Exact => self
                .names()
                .any(|line| line == name || basename(line) == name),
        }
    }
}

fn basename(line: &str) -> &str {
    line.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_is_lowercased() {
        let snap = ProcessSnapshot::from_listing("Chrome.EXE\nbash\n");
        assert!(snap.matches("chrome.exe", MatchStrategy::Substring));
        assert_eq!(snap.names().collect::<Vec<_>>(), vec!["chrome.exe", "bash"]);
    }

    #[test]
    fn whitespace_only_listing_is_empty() {
        assert!(ProcessSnapshot::from_listing(" \n\t\n").is_empty());
        assert!(ProcessSnapshot::default().is_empty());
        assert!(!ProcessSnapshot::from_listing("init").is_empty());
    }

    #[test]
    fn substring_matches_inside_longer_names() {
        let snap = ProcessSnapshot::from_listing("googlechrome.exe\n");
        assert!(snap.matches("chrome", MatchStrategy::Substring));
        assert!(!snap.matches("chrome", MatchStrategy::Exact));
    }

    #[test]
    fn exact_matches_basename_of_full_paths() {
        let snap = ProcessSnapshot::from_listing(
            "/usr/lib/firefox/firefox\n/applications/zoom.us.app/contents/macos/zoom.us\n",
        );
        assert!(snap.matches("firefox", MatchStrategy::Exact));
        assert!(snap.matches("zoom.us", MatchStrategy::Exact));
        assert!(!snap.matches("zoom", MatchStrategy::Exact));
    }

    #[test]
    fn empty_name_never_matches() {
        let snap = ProcessSnapshot::from_listing("bash\n");
        assert!(!snap.matches("", MatchStrategy::Substring));
        assert!(!snap.matches("", MatchStrategy::Exact));
    }

    #[test]
    fn from_names_skips_blank_entries() {
        let snap = ProcessSnapshot::from_names(["Explorer.exe", "  ", "Teams.exe"]);
        assert_eq!(snap.as_str(), "explorer.exe\nteams.exe");
    }
}
