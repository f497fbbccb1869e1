//! Vertical flow of the report pages.
//!
//! Coordinates are millimetres from the top-left corner of an A4 page.

/// A4 width.
pub const PAGE_WIDTH: f64 = 210.0;
/// A4 height.
pub const PAGE_HEIGHT: f64 = 297.0;
pub const MARGIN: f64 = 10.0;
/// Usable width between the side margins.
pub const CONTENT_WIDTH: f64 = PAGE_WIDTH - 2.0 * MARGIN;
/// Height of the title band drawn on every page.
pub const HEADER_HEIGHT: f64 = 25.0;
/// First line below the header band.
pub const CONTENT_TOP: f64 = 34.0;
/// Nothing but the footer is placed below this line.
pub const CONTENT_BOTTOM: f64 = 280.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutState {
    /// The cursor is inside the usable area.
    Normal,
    /// Content ran past the bottom; the next reservation starts a new page.
    OverflowPending,
}

/// Cursor over an open-ended sequence of pages.
#[derive(Debug, Clone)]
pub struct Layout {
    page: usize,
    y: f64,
    state: LayoutState,
}

impl Default for Layout {
    fn default() -> Self {
        Self::new()
    }
}

impl Layout {
    /// Starts on page 1, below the header.
    pub fn new() -> Self {
        Self {
            page: 1,
            y: CONTENT_TOP,
            state: LayoutState::Normal,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn state(&self) -> LayoutState {
        self.state
    }

    /// Whether `height` more millimetres fit on the current page.
    pub fn fits(&self, height: f64) -> bool {
        self.state == LayoutState::Normal && self.y + height <= CONTENT_BOTTOM
    }

    /// Make room for a block of `height`, breaking the page first if it
    /// does not fit. Returns true when a page break happened.
    pub fn reserve(&mut self, height: f64) -> bool {
        if self.fits(height) {
            return false;
        }
        self.break_page();
        true
    }

    /// Start a new page unconditionally.
    pub fn break_page(&mut self) {
        self.page += 1;
        self.y = CONTENT_TOP;
        self.state = LayoutState::Normal;
    }

    /// Move the cursor down after placing content.
    pub fn advance(&mut self, height: f64) {
        self.y += height;
        if self.y > CONTENT_BOTTOM {
            self.state = LayoutState::OverflowPending;
        }
    }

    /// Vertical gap between blocks. A gap never runs past the bottom line;
    /// whatever does not fit is dropped and the next block starts a page.
    pub fn skip(&mut self, gap: f64) {
        if self.state == LayoutState::Normal {
            self.y = (self.y + gap).min(CONTENT_BOTTOM);
        }
    }

    /// Space left on the current page.
    pub fn remaining(&self) -> f64 {
        (CONTENT_BOTTOM - self.y).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_within_page() {
        let mut layout = Layout::new();
        assert!(!layout.reserve(100.0));
        assert_eq!(layout.page(), 1);
        assert_eq!(layout.y(), CONTENT_TOP);
    }

    #[test]
    fn test_reserve_breaks_when_block_does_not_fit() {
        let mut layout = Layout::new();
        layout.advance(240.0);
        assert!(layout.reserve(15.0));
        assert_eq!(layout.page(), 2);
        assert_eq!(layout.y(), CONTENT_TOP);
    }

    #[test]
    fn test_overflow_forces_break_on_next_reserve() {
        let mut layout = Layout::new();
        layout.advance(300.0);
        assert_eq!(layout.state(), LayoutState::OverflowPending);
        assert!(!layout.fits(0.0));
        assert!(layout.reserve(0.0));
        assert_eq!(layout.state(), LayoutState::Normal);
        assert_eq!(layout.page(), 2);
    }

    #[test]
    fn test_skip_stops_at_bottom() {
        let mut layout = Layout::new();
        layout.advance(CONTENT_BOTTOM - CONTENT_TOP - 2.0);
        layout.skip(5.0);
        assert_eq!(layout.y(), CONTENT_BOTTOM);
        assert_eq!(layout.state(), LayoutState::Normal);
        assert!(layout.reserve(1.0));
        assert_eq!(layout.page(), 2);
    }

    #[test]
    fn test_exact_fit_does_not_break() {
        let mut layout = Layout::new();
        assert!(!layout.reserve(CONTENT_BOTTOM - CONTENT_TOP));
        assert_eq!(layout.remaining(), CONTENT_BOTTOM - CONTENT_TOP);
    }
}
