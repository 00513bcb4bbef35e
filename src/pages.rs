//! Contest page rendering.
//!
//! Turns a [`Snapshot`] into pre-rendered [`Page`]s: either the full listing
//! split into fixed-size pages, or a single contest shown in a caller-chosen
//! UTC offset.

use crate::contests::{Contest, Snapshot};
use crate::error::{Result, WatchError};
use chrono::{FixedOffset, Offset, Utc};
use rand::seq::SliceRandom;
use std::fmt;
use std::str::FromStr;

/// Title shown above every listing page.
pub const LISTING_TITLE: &str = "Future contests on Codeforces";

/// Notice shown on the placeholder page of an empty listing.
pub const NO_CONTESTS_NOTICE: &str = "No contests scheduled";

/// Fill used to right-align durations inside a page.
pub const DURATION_PAD: char = '\u{2001}';

/// Codeforces brand colours; each page gets one at build time.
pub const ACCENT_COLORS: [u32; 3] = [0xFFCA1F, 0x198BCC, 0xFF2020];

const START_FORMAT: &str = "%d %b %y, %H:%M";

fn pick_color() -> u32 {
    ACCENT_COLORS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(ACCENT_COLORS[0])
}

/// A fixed UTC offset parsed from `±HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtcOffset {
    offset: FixedOffset,
}

impl UtcOffset {
    /// UTC itself.
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    /// Parse `±HH:MM` with `HH` in `00..=23` and `MM` in `00..=59`.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = || WatchError::InvalidTimezoneFormat(raw.to_owned());

        let bytes = raw.as_bytes();
        if bytes.len() != 6 || bytes[3] != b':' {
            return Err(invalid());
        }
        let sign = match bytes[0] {
            b'+' => 1,
            b'-' => -1,
            _ => return Err(invalid()),
        };
        let two_digits = |pair: &[u8]| -> Option<i32> {
            if pair.iter().all(u8::is_ascii_digit) {
                Some(i32::from(pair[0] - b'0') * 10 + i32::from(pair[1] - b'0'))
            } else {
                None
            }
        };
        let hours = two_digits(&bytes[1..3]).ok_or_else(invalid)?;
        let minutes = two_digits(&bytes[4..6]).ok_or_else(invalid)?;
        if hours > 23 || minutes > 59 {
            return Err(invalid());
        }

        let offset =
            FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)?;
        Ok(Self { offset })
    }

    pub fn as_fixed(&self) -> FixedOffset {
        self.offset
    }
}

impl Default for UtcOffset {
    fn default() -> Self {
        Self::utc()
    }
}

impl FromStr for UtcOffset {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// `UTC` for a zero offset, otherwise `UTC±HH:MM`.
impl fmt::Display for UtcOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.offset.local_minus_utc();
        if secs == 0 {
            return f.write_str("UTC");
        }
        let sign = if secs < 0 { '-' } else { '+' };
        let abs = secs.unsigned_abs();
        write!(f, "UTC{sign}{:02}:{:02}", abs / 3600, (abs % 3600) / 60)
    }
}

/// One rendered contest line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    pub name: String,
    pub id: i64,
    /// Localized start, e.g. `01 Jan 24, 05:30 UTC+05:30`.
    pub start: String,
    /// Duration right-aligned to the widest duration on the same page.
    pub duration: String,
    /// Deep link to the contest page.
    pub url: String,
}

/// An immutable page of rendered entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub title: String,
    pub entries: Vec<PageEntry>,
    /// Zero-based page index.
    pub index: usize,
    /// Number of pages in the sequence this page belongs to.
    pub total: usize,
    /// Text shown instead of entries (empty listing).
    pub notice: Option<String>,
    /// Accent colour, fixed for the page's lifetime so re-renders match.
    pub color: u32,
}

impl Page {
    fn placeholder(notice: &str) -> Self {
        Self {
            title: LISTING_TITLE.to_owned(),
            entries: Vec::new(),
            index: 0,
            total: 1,
            notice: Some(notice.to_owned()),
            color: pick_color(),
        }
    }

    /// `Page i / n` footer text.
    pub fn footer(&self) -> String {
        format!("Page {} / {}", self.index + 1, self.total)
    }
}

/// `{d}d {h}h {m}m`, dropping the day part when it is zero.
pub fn format_duration(total_secs: u64) -> String {
    let (days, rem) = (total_secs / 86_400, total_secs % 86_400);
    let (hours, rem) = (rem / 3600, rem % 3600);
    let minutes = rem / 60;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else {
        format!("{hours}h {minutes}m")
    }
}

fn format_start(contest: &Contest, offset: UtcOffset) -> String {
    match contest.start {
        Some(start) => format!(
            "{} {offset}",
            start.with_timezone(&offset.as_fixed()).format(START_FORMAT)
        ),
        None => "TBA".to_owned(),
    }
}

fn pad_left(value: &str, width: usize) -> String {
    let len = value.chars().count();
    let mut padded: String = std::iter::repeat_n(DURATION_PAD, width.saturating_sub(len)).collect();
    padded.push_str(value);
    padded
}

/// Builds listing and single-contest pages.
#[derive(Debug, Clone)]
pub struct PageBuilder {
    contest_url_base: String,
}

impl Default for PageBuilder {
    fn default() -> Self {
        Self::new("https://codeforces.com/contest/")
    }
}

impl PageBuilder {
    pub fn new(contest_url_base: impl Into<String>) -> Self {
        Self {
            contest_url_base: contest_url_base.into(),
        }
    }

    fn render(&self, contest: &Contest, offset: UtcOffset) -> PageEntry {
        PageEntry {
            name: contest.name.clone(),
            id: contest.id,
            start: format_start(contest, offset),
            duration: format_duration(contest.duration_secs),
            url: format!("{}{}", self.contest_url_base, contest.id),
        }
    }

    /// Split the snapshot into pages of at most `page_size` entries, in UTC.
    ///
    /// An empty snapshot yields one placeholder page. A `page_size` of zero
    /// is treated as one.
    pub fn build_pages(&self, snapshot: &Snapshot, page_size: usize) -> Vec<Page> {
        if snapshot.is_empty() {
            return vec![Page::placeholder(NO_CONTESTS_NOTICE)];
        }

        let chunks: Vec<&[Contest]> = snapshot.contests().chunks(page_size.max(1)).collect();
        let total = chunks.len();

        chunks
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| {
                let mut entries: Vec<PageEntry> = chunk
                    .iter()
                    .map(|c| self.render(c, UtcOffset::utc()))
                    .collect();
                let width = entries
                    .iter()
                    .map(|e| e.duration.chars().count())
                    .max()
                    .unwrap_or(0);
                for entry in &mut entries {
                    entry.duration = pad_left(&entry.duration, width);
                }
                Page {
                    title: LISTING_TITLE.to_owned(),
                    entries,
                    index,
                    total,
                    notice: None,
                    color: pick_color(),
                }
            })
            .collect()
    }

    /// Render one contest in the given offset (`None` means UTC).
    pub fn build_single_view(
        &self,
        snapshot: &Snapshot,
        id: i64,
        offset: Option<&str>,
    ) -> Result<Page> {
        let contest = snapshot.get(id).ok_or(WatchError::ContestNotFound(id))?;
        let offset = offset.map(UtcOffset::parse).transpose()?.unwrap_or_default();

        Ok(Page {
            title: contest.name.clone(),
            entries: vec![self.render(contest, offset)],
            index: 0,
            total: 1,
            notice: None,
            color: pick_color(),
        })
    }
}
