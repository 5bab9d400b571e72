/// Manual-browsing highlight, kept apart from the playing index.
///
/// The rendering surface only ever projects `highlighted`; it is never read
/// back from the surface.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SelectionController {
    highlighted: Option<usize>,
    overlay_visible: bool,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    pub fn move_down(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        self.highlighted = Some(match self.highlighted {
            Some(i) if i + 1 < len => i + 1,
            Some(_) => 0,
            None => 0,
        });
        self.highlighted
    }

    pub fn move_up(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        self.highlighted = Some(match self.highlighted {
            Some(i) if i > 0 && i < len => i - 1,
            Some(_) => len - 1,
            None => 0,
        });
        self.highlighted
    }

    /// Show the overlay with the playing item highlighted.
    pub fn show_overlay(&mut self, current: Option<usize>) {
        self.overlay_visible = true;
        self.highlighted = current;
    }

    /// Hide the overlay; the highlight snaps back to the playing item.
    pub fn dismiss_overlay(&mut self, current: Option<usize>) {
        self.overlay_visible = false;
        self.highlighted = current;
    }

    /// Returns the new visibility.
    pub fn toggle_overlay(&mut self, current: Option<usize>) -> bool {
        if self.overlay_visible {
            self.dismiss_overlay(current);
        } else {
            self.show_overlay(current);
        }
        self.overlay_visible
    }

    /// Index to start when the user commits.  With nothing highlighted the
    /// first item is highlighted instead and nothing is committed.
    pub fn commit(&mut self, len: usize) -> Option<usize> {
        match self.highlighted {
            Some(i) if i < len => Some(i),
            _ => {
                self.highlighted = (len > 0).then_some(0);
                None
            }
        }
    }

    /// Resync after the playlist was replaced.
    pub fn reconcile(&mut self, len: usize, current: Option<usize>) {
        if self.highlighted.map_or(true, |i| i >= len) {
            self.highlighted = current;
        }
    }
}
