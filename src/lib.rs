//! # Chordscope
//!
//! Names musical chords from sets of MIDI note numbers and keeps a scrolling,
//! time-windowed view of those chords in sync with a playback position.
//!
//! The crate is made of three parts, in dependency order:
//!
//! - `name`: pure chord naming, a set of note numbers in and a name out
//! - `store`: a time-indexed record of note on/off events with a derived,
//!   periodically rebuilt chord view
//! - `clipper`: the sliding window over that view, anchored to an estimated
//!   playback position

mod clipper;
mod err;
mod name;
mod store;

extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate serde_json;

pub use crate::clipper::{ChordClipper, DEFAULT_MARKER_PERCENT, DEFAULT_VIEW_WIDTH};
pub use crate::err::StateErr;
pub use crate::name::{has_accidental, name_chord, note_name};
pub use crate::store::{BucketState, ChordEntry, MidiStore, Snapshot, DEFAULT_QUANTIZATION};
