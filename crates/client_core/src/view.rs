//! Owned view-models for the results display.
//!
//! A [`ResultsView`] is built from one match response and handed to
//! [`render`], which writes into any `fmt::Write` sink. Each upload replaces
//! the whole view, so "clear then repopulate" is the type's construction, not
//! a mutation of shared display state.

use std::fmt;

use shared::protocol::Match;

/// Matches scoring below this are hidden from the carousel.
pub const CLOSE_MATCH_THRESHOLD: f32 = 0.88;

/// Width of one carousel item; the strip advances by exactly this per step.
pub const ITEM_WIDTH_PX: u32 = 150;

/// Photo width inside a carousel item.
pub const PHOTO_WIDTH_PX: u32 = 112;

/// Photo width in the flat list.
const LIST_PHOTO_WIDTH_PX: u32 = 150;

/// Shown when no match clears [`CLOSE_MATCH_THRESHOLD`].
pub const NO_CLOSE_MATCHES: &str = "No close matches found.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Score-filtered, wraparound-navigable pager.
    #[default]
    Carousel,
    /// Every match in response order, unfiltered.
    List,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultsView {
    /// Nothing uploaded yet; renders as nothing.
    Idle,
    /// Informational text standing in for the results.
    Notice(String),
    /// Rendered verbatim: `Error: <status text>`.
    Error(String),
    List(Vec<Match>),
    Carousel(Carousel),
}

impl ResultsView {
    pub fn from_matches(matches: Vec<Match>, mode: DisplayMode) -> Self {
        match mode {
            DisplayMode::List => ResultsView::List(matches),
            DisplayMode::Carousel => match Carousel::from_matches(matches) {
                Some(carousel) => ResultsView::Carousel(carousel),
                None => ResultsView::Notice(NO_CLOSE_MATCHES.to_string()),
            },
        }
    }

    pub fn error(status_text: &str) -> Self {
        ResultsView::Error(format!("Error: {status_text}"))
    }
}

/// Wraparound pager over the close matches of one response.
///
/// The index always stays in `[0, len)`; `next`/`previous` wrap at the ends.
#[derive(Debug, Clone, PartialEq)]
pub struct Carousel {
    matches: Vec<Match>,
    index: usize,
}

impl Carousel {
    /// Keep only matches at or above [`CLOSE_MATCH_THRESHOLD`], in response
    /// order. `None` when nothing survives; no carousel is constructed for
    /// an empty set.
    pub fn from_matches(matches: Vec<Match>) -> Option<Self> {
        let matches: Vec<Match> = matches
            .into_iter()
            .filter(|m| m.score >= CLOSE_MATCH_THRESHOLD)
            .collect();
        if matches.is_empty() {
            return None;
        }
        Some(Self { matches, index: 0 })
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> &Match {
        &self.matches[self.index]
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn next(&mut self) {
        self.index = (self.index + 1) % self.matches.len();
    }

    pub fn previous(&mut self) {
        self.index = (self.index + self.matches.len() - 1) % self.matches.len();
    }

    /// Horizontal offset of the visible strip: the per-item width times the
    /// current index. Applied directly on every navigation, no animation.
    pub fn offset_px(&self) -> u32 {
        self.index as u32 * ITEM_WIDTH_PX
    }
}

/// `Rex (91.2%)`: the score as a percentage to one decimal place.
pub fn match_label(candidate: &Match) -> String {
    format!("{} ({:.1}%)", candidate.name, candidate.score * 100.0)
}

pub fn render(view: &ResultsView, out: &mut impl fmt::Write) -> fmt::Result {
    match view {
        ResultsView::Idle => Ok(()),
        ResultsView::Notice(text) | ResultsView::Error(text) => write!(out, "{text}"),
        ResultsView::List(matches) => {
            for (i, candidate) in matches.iter().enumerate() {
                if i > 0 {
                    writeln!(out)?;
                }
                writeln!(out, "{}", match_label(candidate))?;
                write!(
                    out,
                    "  [photo {} width={LIST_PHOTO_WIDTH_PX}]",
                    candidate.photo_url
                )?;
            }
            Ok(())
        }
        ResultsView::Carousel(carousel) => {
            writeln!(out, "< {}/{} >", carousel.index() + 1, carousel.len())?;
            writeln!(out, "{}", match_label(carousel.current()))?;
            write!(
                out,
                "  [photo {} width={PHOTO_WIDTH_PX}]",
                carousel.current().photo_url
            )
        }
    }
}

/// Convenience for surfaces that want the whole frame as a string.
pub fn render_to_string(view: &ResultsView) -> String {
    let mut out = String::new();
    render(view, &mut out).expect("fmt::Write to String cannot fail");
    out
}
