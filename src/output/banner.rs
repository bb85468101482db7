//! Auto-dismissing result messages

use std::time::{Duration, Instant};

use crate::core::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone)]
pub struct Banner {
    pub kind: BannerKind,
    pub text: String,
    shown_at: Instant,
}

impl Banner {
    pub fn is_error(&self) -> bool {
        self.kind == BannerKind::Error
    }
}

/// Holds at most one banner; a new one replaces the old
#[derive(Debug, Clone)]
pub struct BannerBoard {
    ttl: Duration,
    current: Option<Banner>,
}

impl BannerBoard {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, current: None }
    }

    pub fn show(&mut self, kind: BannerKind, text: impl Into<String>) {
        self.current = Some(Banner {
            kind,
            text: text.into(),
            shown_at: Instant::now(),
        });
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.show(BannerKind::Success, text);
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.show(BannerKind::Info, text);
    }

    /// Show a failure with its context, e.g. `"Save failed: ..."`
    pub fn error(&mut self, context: &str, err: &Error) {
        let text = if err.is_network() {
            format!("{}: network error, check your connection ({})", context, err)
        } else {
            format!("{}: {}", context, err)
        };
        self.show(BannerKind::Error, text);
    }

    /// The banner, while it has not expired
    pub fn current(&self) -> Option<&Banner> {
        self.current_at(Instant::now())
    }

    fn current_at(&self, now: Instant) -> Option<&Banner> {
        self.current
            .as_ref()
            .filter(|b| now.saturating_duration_since(b.shown_at) < self.ttl)
    }

    /// Take the banner for printing, leaving the board empty
    pub fn take(&mut self) -> Option<Banner> {
        let now = Instant::now();
        let live = self.current_at(now).is_some();
        let banner = self.current.take();
        banner.filter(|_| live)
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

impl Default for BannerBoard {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_banner_replaces_old() {
        let mut board = BannerBoard::default();
        board.success("Saved");
        board.info("Loading");
        let banner = board.current().unwrap();
        assert_eq!(banner.kind, BannerKind::Info);
        assert_eq!(banner.text, "Loading");
    }

    #[test]
    fn test_banner_expires() {
        let mut board = BannerBoard::new(Duration::from_secs(5));
        board.success("Saved");
        let shown = board.current.as_ref().unwrap().shown_at;
        assert!(board.current_at(shown + Duration::from_secs(4)).is_some());
        assert!(board.current_at(shown + Duration::from_secs(5)).is_none());
    }

    #[test]
    fn test_network_errors_are_labelled() {
        let mut board = BannerBoard::default();
        board.error(
            "Save failed",
            &Error::Network {
                message: "connection refused".to_string(),
            },
        );
        let banner = board.take().unwrap();
        assert!(banner.is_error());
        assert!(banner.text.starts_with("Save failed: network error"));
        assert!(board.current().is_none());
    }
}
