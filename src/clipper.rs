//! # View clipper
//!
//! Pure windowing over the store's chord view: tracks an estimated playback
//! position, computes the visible time window around it and hands back the
//! chord entries (and measure gridlines) that fall inside. No rendering here;
//! a display adapter draws whatever this returns.
//!
//! The clipper is built for single-threaded use from a display refresh timer.
//! Its internal buffer is not synchronized, and `update_position` assumes a
//! single writer: a racing caller can at worst reset the estimate to a
//! slightly older value, which the next authoritative position corrects.

use std::sync::Arc;

use crate::store::{ChordEntry, MidiStore};

pub const DEFAULT_VIEW_WIDTH: f64 = 20.0;
pub const DEFAULT_MARKER_PERCENT: f64 = 25.0;

// Seconds of slack fetched either side of the window so entries slide in and
// off screen instead of popping.
const WINDOW_PADDING: f64 = 2.0;

#[derive(Clone, Debug)]
struct WindowBuffer {
    start: f64,
    end: f64,
    entries: Vec<ChordEntry>,
}

/// Maintains the visible window over one store's chord view
pub struct ChordClipper {
    store: Arc<MidiStore>,
    most_recent_position: f64,
    estimated_position: f64,
    view_width: f64,
    marker_percent: f64,
    buffer: Option<WindowBuffer>,
}

impl ChordClipper {
    pub fn new(store: Arc<MidiStore>) -> ChordClipper {
        ChordClipper {
            store: store,
            most_recent_position: 0.0,
            estimated_position: 0.0,
            view_width: DEFAULT_VIEW_WIDTH,
            marker_percent: DEFAULT_MARKER_PERCENT,
            buffer: None,
        }
    }

    /// Advance the estimated playback position
    ///
    /// Snaps to the store's last reported position when that has changed;
    /// otherwise, while playing, extrapolates by the wall-clock milliseconds
    /// since the previous call. Stopped with no new position means no motion.
    pub fn update_position(&mut self, ms_since_last_update: f64) {
        let last_seen = self.store.last_event_seconds();
        if last_seen != self.most_recent_position {
            self.most_recent_position = last_seen;
            self.estimated_position = last_seen;
        } else if self.store.is_playing() {
            self.estimated_position += ms_since_last_update / 1000.0;
        }
    }

    pub fn estimated_position(&self) -> f64 {
        self.estimated_position
    }

    pub fn view_width(&self) -> f64 {
        self.view_width
    }

    /// Set the window width in seconds, clamped to [1, 100]
    pub fn set_view_width(&mut self, seconds: f64) {
        self.view_width = seconds.max(1.0).min(100.0);
    }

    pub fn marker_percent(&self) -> f64 {
        self.marker_percent
    }

    /// Set where "now" sits in the window, as a percentage of the width
    /// from the left edge, clamped to [0, 100]
    pub fn set_marker_percent(&mut self, percent: f64) {
        self.marker_percent = percent.max(0.0).min(100.0);
    }

    /// The note marker's offset from the window's left edge, in seconds
    pub fn marker_offset(&self) -> f64 {
        self.view_width * self.marker_percent / 100.0
    }

    /// The current view window as (start, end) seconds
    pub fn window(&self) -> (f64, f64) {
        let start = self.estimated_position - self.marker_offset();
        (start, start + self.view_width)
    }

    /// The chord entries visible in the current window
    ///
    /// Times are rebased so 0 is the window's left edge. The window is
    /// padded on both sides, and strictly forward motion only fetches the
    /// delta beyond the previously buffered region, trimming entries that
    /// scrolled off the front. A jump, rewind or first call replaces the
    /// buffer wholesale.
    pub fn display_chords(&mut self) -> Vec<(f64, String)> {
        let (start, end) = self.window();
        let padded_start = start - WINDOW_PADDING;
        let padded_end = end + WINDOW_PADDING;

        let forward = match self.buffer {
            Some(ref buf) => {
                padded_start >= buf.start && padded_start <= buf.end && padded_end > buf.end
            }
            None => false,
        };

        let buffered = if forward { self.buffer.take() } else { None };
        let entries = match buffered {
            Some(mut buf) => {
                for entry in self.store.query_window(buf.end, padded_end) {
                    let newer = match buf.entries.last() {
                        Some(last) => entry.seconds > last.seconds,
                        None => true,
                    };
                    if newer {
                        buf.entries.push(entry);
                    }
                }
                buf.entries.retain(|e| e.seconds >= padded_start);
                buf.entries
            }
            None => self.store.query_window(padded_start, padded_end),
        };

        let display = entries
            .iter()
            .map(|e| (e.seconds - start, e.name.clone()))
            .collect();
        self.buffer = Some(WindowBuffer {
            start: padded_start,
            end: padded_end,
            entries: entries,
        });
        display
    }

    /// Measure boundaries visible in the window as (measure number, seconds
    /// from the window's left edge)
    ///
    /// Empty until the host has supplied both tempo and time signature.
    /// Numbering is 1-based; when the left edge is not itself a boundary the
    /// first visible line already belongs to the next measure.
    pub fn measure_gridlines(&self) -> Vec<(i64, f64)> {
        let bp_minute = match self.store.bp_minute() {
            Some(v) => v,
            None => return Vec::new(),
        };
        let bp_measure = match self.store.bp_measure() {
            Some(v) => v,
            None => return Vec::new(),
        };
        if bp_minute <= 0.0 || bp_measure <= 0.0 {
            return Vec::new();
        }

        let seconds_per_measure = 60.0 / (bp_minute / bp_measure);
        let (start, _) = self.window();

        let base = (start / seconds_per_measure).floor();
        let mut boundary = base * seconds_per_measure;
        let mut number = base as i64 + 1;
        if boundary < start {
            boundary += seconds_per_measure;
            number += 1;
        }

        let mut lines = Vec::new();
        while boundary - start <= self.view_width {
            lines.push((number, boundary - start));
            boundary += seconds_per_measure;
            number += 1;
        }
        lines
    }

    /// Shift the view by a fraction of its width; ignored during playback
    pub fn scroll_wheel_nudge(&mut self, fraction: f64) {
        if self.store.is_playing() {
            return;
        }
        self.estimated_position += fraction * self.view_width;
    }
}
