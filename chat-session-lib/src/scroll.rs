//! Auto-scroll bookkeeping for the message pane.
//!
//! The host reports viewport measurements; the tracker decides whether a new
//! bubble should pull the view to the bottom or surface a "jump to bottom"
//! button instead.

use shared::protocol::SCROLL_BOTTOM_THRESHOLD_PX;

/// Scroll metrics of the message container, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub scroll_top: i32,
    pub scroll_height: i32,
    pub client_height: i32,
}

impl Viewport {
    pub fn distance_from_bottom(&self) -> i32 {
        self.scroll_height - self.scroll_top - self.client_height
    }

    pub fn is_near_bottom(&self) -> bool {
        self.distance_from_bottom() <= SCROLL_BOTTOM_THRESHOLD_PX
    }
}

#[derive(Debug)]
pub struct ScrollTracker {
    near_bottom: bool,
    jump_visible: bool,
    scroll_requested: bool,
}

impl Default for ScrollTracker {
    fn default() -> Self {
        Self {
            near_bottom: true,
            jump_visible: false,
            scroll_requested: false,
        }
    }
}

impl ScrollTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest measurement (scroll events, or right before new
    /// content is dispatched).
    pub fn observe(&mut self, viewport: Viewport) {
        self.near_bottom = viewport.is_near_bottom();
        if self.near_bottom {
            self.jump_visible = false;
        }
    }

    /// Called before a bubble is appended.
    pub fn before_append(&mut self) {
        if self.near_bottom {
            self.scroll_requested = true;
        } else {
            self.jump_visible = true;
        }
    }

    /// The "jump to bottom" control was clicked.
    pub fn jump_to_bottom(&mut self) {
        self.near_bottom = true;
        self.jump_visible = false;
        self.scroll_requested = true;
    }

    /// Whether the host should smooth-scroll to the bottom after drawing.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_requested)
    }

    pub fn jump_visible(&self) -> bool {
        self.jump_visible
    }

    pub fn is_near_bottom(&self) -> bool {
        self.near_bottom
    }
}
