//! # Event store
//!
//! The time-indexed record of note on/off events for a track. Events arrive
//! from the playback host at high frequency on its processing thread while a
//! display timer reads the store, so the bucket collection sits behind one
//! mutex and the derived chord view behind a second, independent one. A
//! rebuild reads the buckets under the first lock and installs the new view
//! under the second, so view readers never wait on the O(n) rebuild walk;
//! they may briefly see a view that lags the events by up to a second.
//!
//! Event times are quantized to a configurable step (default 1000) before
//! storage to absorb timing jitter from the host. Two writes to the same
//! note at the same quantized time resolve to last-write-wins in arrival
//! order; which of a truly simultaneous on and off "really" came first is
//! ambiguous in the source MIDI, and no tie-break beyond arrival order is
//! attempted.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use serde_json;

use crate::err::StateErr;
use crate::name::name_chord;

pub const DEFAULT_QUANTIZATION: i64 = 1000;

const SNAPSHOT_VERSION: u32 = 1;
const REBUILD_INTERVAL_MS: u64 = 1000;

/// One entry of the static chord view: a chord starting at a point in time
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChordEntry {
    pub seconds: f64,
    pub name: String,
}

/// The note changes recorded at one quantized instant
///
/// `seconds` is the host-reported real time of the instant; it defaults to
/// zero until the host supplies it, which may happen after the bucket is
/// created.
#[derive(Clone, Debug)]
struct TimeBucket {
    time: i64,
    seconds: f64,
    notes: BTreeMap<i32, bool>,
}

impl TimeBucket {
    fn new(time: i64) -> TimeBucket {
        TimeBucket {
            time: time,
            seconds: 0.0,
            notes: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Default)]
struct TrackData {
    name: String,
    buckets: Vec<TimeBucket>,
    // Highest bucket time seen. Playback normally moves forward, so the
    // common insert is an O(1) append; anything else falls back to a binary
    // search for the insert position.
    max_time: i64,
}

#[derive(Clone, Copy, Debug, Default)]
struct Tempo {
    bp_minute: Option<f64>,
    bp_measure: Option<f64>,
}

/// Persisted state shape of a [`MidiStore`], version tagged
///
/// The encoding is the persistence layer's business; this type only fixes
/// the logical shape, with JSON helpers for convenience.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub name: String,
    pub quantization: i64,
    pub buckets: Vec<BucketState>,
}

/// One bucket of a [`Snapshot`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BucketState {
    pub time: i64,
    pub seconds: f64,
    pub notes: Vec<(i32, bool)>,
}

impl Snapshot {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap()
    }

    pub fn from_json(data: &str) -> Result<Snapshot, StateErr> {
        let snapshot = serde_json::from_str(data)?;
        Ok(snapshot)
    }
}

/// The store of midi note events for one track
///
/// Created once per session and shared by reference with every component
/// that needs it. All methods take `&self`; interior locks make the store
/// safe to share between the host's processing thread and the display
/// thread.
#[derive(Debug)]
pub struct MidiStore {
    track: Mutex<TrackData>,
    view: Mutex<Vec<ChordEntry>>,
    view_stale: AtomicBool,
    last_rebuild_ms: AtomicU64,
    last_query_hits: AtomicUsize,
    recording: AtomicBool,
    playing: AtomicBool,
    quantization: AtomicI64,
    last_event_time: AtomicI64,
    last_event_seconds: Mutex<f64>,
    short_chord_threshold: Mutex<f64>,
    tempo: Mutex<Tempo>,
}

impl Default for MidiStore {
    fn default() -> MidiStore {
        MidiStore::new()
    }
}

impl MidiStore {
    pub fn new() -> MidiStore {
        MidiStore {
            track: Mutex::new(TrackData::default()),
            view: Mutex::new(Vec::new()),
            view_stale: AtomicBool::new(false),
            last_rebuild_ms: AtomicU64::new(0),
            last_query_hits: AtomicUsize::new(0),
            recording: AtomicBool::new(true),
            playing: AtomicBool::new(false),
            quantization: AtomicI64::new(DEFAULT_QUANTIZATION),
            last_event_time: AtomicI64::new(0),
            last_event_seconds: Mutex::new(0.0),
            short_chord_threshold: Mutex::new(0.0),
            tempo: Mutex::new(Tempo::default()),
        }
    }

    /// Record a note on/off event, quantizing its time
    ///
    /// Does nothing while recording is disabled. Re-recording a note in the
    /// state it already has at that time rewrites the value but does not
    /// mark the chord view stale.
    pub fn add_note_event(&self, time: i64, note: i32, is_on: bool) {
        if !self.recording.load(Ordering::Relaxed) {
            return;
        }

        let time = self.quantize(time);
        let mut track = self.track.lock().unwrap();
        let changed = {
            let bucket = ensure_bucket(&mut track, time);
            bucket.notes.insert(note, is_on) != Some(is_on)
        };
        drop(track);

        if changed {
            self.view_stale.store(true, Ordering::Release);
        }
    }

    /// Attach the host-reported time in seconds to an existing bucket
    ///
    /// No-op when no event was recorded at that (quantized) time.
    pub fn set_event_seconds(&self, time: i64, seconds: f64) {
        let time = self.quantize(time);
        let mut track = self.track.lock().unwrap();
        if let Ok(pos) = track.buckets.binary_search_by_key(&time, |b| b.time) {
            if track.buckets[pos].seconds != seconds {
                track.buckets[pos].seconds = seconds;
                drop(track);
                self.view_stale.store(true, Ordering::Release);
            }
        }
    }

    /// Notes with an explicit ON event at exactly the given quantized time
    ///
    /// This is not the full sounding set; see
    /// [`notes_sounding_in_range`](#method.notes_sounding_in_range) for that.
    pub fn notes_on_at(&self, time: i64) -> Vec<i32> {
        let time = self.quantize(time);
        let track = self.track.lock().unwrap();
        match track.buckets.binary_search_by_key(&time, |b| b.time) {
            Ok(pos) => track.buckets[pos]
                .notes
                .iter()
                .filter(|&(_, &is_on)| is_on)
                .map(|(&note, _)| note)
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// The notes sounding at `end`, replaying on/off transitions in order
    ///
    /// Transitions before `start` are skipped; that is an efficiency hint
    /// rather than a scoping rule, and callers wanting the true sounding set
    /// pass 0 so that every earlier off event is honoured.
    pub fn notes_sounding_in_range(&self, start: i64, end: i64) -> Vec<i32> {
        let track = self.track.lock().unwrap();
        let mut sounding = BTreeSet::new();
        for bucket in &track.buckets {
            if bucket.time < start {
                continue;
            }
            if bucket.time > end {
                break;
            }
            apply_transitions(&mut sounding, bucket);
        }
        sounding.into_iter().collect()
    }

    /// The host-reported seconds of the bucket at the given quantized time,
    /// or zero when unset or absent
    pub fn event_seconds(&self, time: i64) -> f64 {
        let time = self.quantize(time);
        let track = self.track.lock().unwrap();
        match track.buckets.binary_search_by_key(&time, |b| b.time) {
            Ok(pos) => track.buckets[pos].seconds,
            Err(_) => 0.0,
        }
    }

    /// All bucket times, in increasing order
    pub fn event_times(&self) -> Vec<i64> {
        let track = self.track.lock().unwrap();
        track.buckets.iter().map(|b| b.time).collect()
    }

    pub fn has_data(&self) -> bool {
        !self.track.lock().unwrap().buckets.is_empty()
    }

    /// Remove all recorded events
    ///
    /// Works regardless of the recording flag; clearing is a user action,
    /// not a recording one.
    pub fn clear(&self) {
        let mut track = self.track.lock().unwrap();
        track.buckets.clear();
        track.max_time = 0;
        drop(track);
        self.view_stale.store(true, Ordering::Release);
    }

    pub fn set_name(&self, name: &str) {
        self.track.lock().unwrap().name = name.to_string();
    }

    pub fn name(&self) -> String {
        self.track.lock().unwrap().name.clone()
    }

    pub fn set_recording_enabled(&self, enabled: bool) {
        self.recording.store(enabled, Ordering::Relaxed);
    }

    pub fn is_recording_enabled(&self) -> bool {
        self.recording.load(Ordering::Relaxed)
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Relaxed);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    pub fn set_last_event_time(&self, time: i64) {
        self.last_event_time.store(time, Ordering::Relaxed);
    }

    pub fn last_event_time(&self) -> i64 {
        self.last_event_time.load(Ordering::Relaxed)
    }

    pub fn set_last_event_seconds(&self, seconds: f64) {
        *self.last_event_seconds.lock().unwrap() = seconds;
    }

    pub fn last_event_seconds(&self) -> f64 {
        *self.last_event_seconds.lock().unwrap()
    }

    /// Set the time quantization step
    ///
    /// A step of zero or less silently falls back to the default; there is
    /// no error channel for configuration here.
    pub fn set_quantization(&self, quantization: i64) {
        let quantization = if quantization <= 0 {
            DEFAULT_QUANTIZATION
        } else {
            quantization
        };
        self.quantization.store(quantization, Ordering::Relaxed);
    }

    pub fn quantization(&self) -> i64 {
        self.quantization.load(Ordering::Relaxed)
    }

    pub fn set_bp_minute(&self, beats_per_minute: f64) {
        self.tempo.lock().unwrap().bp_minute = Some(beats_per_minute);
    }

    /// Beats per minute, absent until the host supplies it
    pub fn bp_minute(&self) -> Option<f64> {
        self.tempo.lock().unwrap().bp_minute
    }

    pub fn set_bp_measure(&self, beats_per_measure: f64) {
        self.tempo.lock().unwrap().bp_measure = Some(beats_per_measure);
    }

    /// Beats per measure, absent until the host supplies it
    pub fn bp_measure(&self) -> Option<f64> {
        self.tempo.lock().unwrap().bp_measure
    }

    /// Chords shorter than this many seconds are dropped from the view
    pub fn set_short_chord_threshold(&self, seconds: f64) {
        *self.short_chord_threshold.lock().unwrap() = seconds;
    }

    pub fn short_chord_threshold(&self) -> f64 {
        *self.short_chord_threshold.lock().unwrap()
    }

    pub fn is_view_stale(&self) -> bool {
        self.view_stale.load(Ordering::Acquire)
    }

    /// Rebuild the static chord view from scratch
    ///
    /// Walks every bucket in time order replaying note transitions, emitting
    /// an entry whenever the sounding set names a different (non-empty)
    /// chord than the previous entry, then filters out short-lived chords.
    /// The bucket lock is released before the new view is installed.
    pub fn rebuild_chord_view(&self) {
        let (entries, end_of_data) = {
            let track = self.track.lock().unwrap();
            let mut entries: Vec<ChordEntry> = Vec::new();
            let mut sounding = BTreeSet::new();

            for bucket in &track.buckets {
                apply_transitions(&mut sounding, bucket);
                let notes: Vec<i32> = sounding.iter().cloned().collect();
                let name = name_chord(&notes);
                let differs = match entries.last() {
                    Some(last) => last.name != name,
                    None => true,
                };
                if !name.is_empty() && differs {
                    entries.push(ChordEntry {
                        seconds: bucket.seconds,
                        name: name,
                    });
                }
            }

            let end_of_data = track.buckets.last().map(|b| b.seconds).unwrap_or(0.0);
            (entries, end_of_data)
        };

        let threshold = self.short_chord_threshold();
        let entries = remove_short_chords(entries, threshold, end_of_data);
        *self.view.lock().unwrap() = entries;
    }

    /// Rebuild the chord view if it is stale, at most once per second
    ///
    /// `now_ms` is the caller's wall clock. Returns whether a rebuild ran.
    pub fn refresh_view_if_stale(&self, now_ms: u64) -> bool {
        if !self.view_stale.load(Ordering::Acquire) {
            return false;
        }

        let last = self.last_rebuild_ms.load(Ordering::Relaxed);
        if last != 0 && now_ms.saturating_sub(last) < REBUILD_INTERVAL_MS {
            return false;
        }

        self.last_rebuild_ms.store(now_ms, Ordering::Relaxed);
        self.view_stale.store(false, Ordering::Release);
        self.rebuild_chord_view();
        true
    }

    /// Chord view entries with `start <= seconds <= end`
    pub fn query_window(&self, start: f64, end: f64) -> Vec<ChordEntry> {
        let view = self.view.lock().unwrap();
        let from = match view.binary_search_by(|e| e.seconds.partial_cmp(&start).unwrap()) {
            Ok(pos) => pos,
            Err(pos) => pos,
        };

        let mut hits = Vec::new();
        for entry in &view[from..] {
            if entry.seconds > end {
                break;
            }
            hits.push(entry.clone());
        }

        self.last_query_hits.store(hits.len(), Ordering::Relaxed);
        hits
    }

    /// Entry count returned by the most recent window query, for diagnostics
    pub fn last_query_hits(&self) -> usize {
        self.last_query_hits.load(Ordering::Relaxed)
    }

    /// Capture the persistable state
    pub fn snapshot(&self) -> Snapshot {
        let track = self.track.lock().unwrap();
        Snapshot {
            version: SNAPSHOT_VERSION,
            name: track.name.clone(),
            quantization: self.quantization(),
            buckets: track
                .buckets
                .iter()
                .map(|bucket| BucketState {
                    time: bucket.time,
                    seconds: bucket.seconds,
                    notes: bucket.notes.iter().map(|(&n, &on)| (n, on)).collect(),
                })
                .collect(),
        }
    }

    /// Replace the store's state with a previously captured snapshot
    ///
    /// Snapshots with an unknown or future version are rejected and the
    /// current state is left untouched.
    pub fn replace_state(&self, snapshot: &Snapshot) -> Result<(), StateErr> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StateErr::UnsupportedVersion(snapshot.version));
        }

        let mut buckets: Vec<TimeBucket> = snapshot
            .buckets
            .iter()
            .map(|state| {
                let mut bucket = TimeBucket::new(state.time);
                bucket.seconds = state.seconds;
                bucket.notes = state.notes.iter().cloned().collect();
                bucket
            })
            .collect();
        buckets.sort_by_key(|b| b.time);
        let max_time = buckets.last().map(|b| b.time).unwrap_or(0);

        self.set_quantization(snapshot.quantization);
        let mut track = self.track.lock().unwrap();
        track.name = snapshot.name.clone();
        track.buckets = buckets;
        track.max_time = max_time;
        drop(track);

        self.view_stale.store(true, Ordering::Release);
        Ok(())
    }

    /// Round a raw time to the nearest multiple of the quantization step
    fn quantize(&self, time: i64) -> i64 {
        let step = self.quantization.load(Ordering::Relaxed);
        (time + step / 2) / step * step
    }
}

fn ensure_bucket(track: &mut TrackData, time: i64) -> &mut TimeBucket {
    if track.buckets.is_empty() || time > track.max_time {
        track.max_time = time;
        track.buckets.push(TimeBucket::new(time));
        let last = track.buckets.len() - 1;
        return &mut track.buckets[last];
    }

    match track.buckets.binary_search_by_key(&time, |b| b.time) {
        Ok(pos) => &mut track.buckets[pos],
        Err(pos) => {
            track.buckets.insert(pos, TimeBucket::new(time));
            &mut track.buckets[pos]
        }
    }
}

fn apply_transitions(sounding: &mut BTreeSet<i32>, bucket: &TimeBucket) {
    for (&note, &is_on) in &bucket.notes {
        if is_on {
            sounding.insert(note);
        } else {
            sounding.remove(&note);
        }
    }
}

/// Drop view entries shorter than `threshold` seconds
///
/// An entry's duration runs to the next entry, or to the time of the last
/// recorded event for the final entry. When a removal leaves two neighbours
/// with the same chord name they merge into one run.
fn remove_short_chords(entries: Vec<ChordEntry>, threshold: f64, end_of_data: f64) -> Vec<ChordEntry> {
    if threshold <= 0.0 {
        return entries;
    }

    let mut kept: Vec<ChordEntry> = Vec::with_capacity(entries.len());
    for i in 0..entries.len() {
        let end = if i + 1 < entries.len() {
            entries[i + 1].seconds
        } else {
            end_of_data
        };
        if end - entries[i].seconds < threshold {
            continue;
        }
        let duplicate = match kept.last() {
            Some(last) => last.name == entries[i].name,
            None => false,
        };
        if !duplicate {
            kept.push(entries[i].clone());
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store() {
        let store = MidiStore::new();
        assert!(!store.has_data());
        assert_eq!(store.notes_on_at(3333), Vec::<i32>::new());
        assert_eq!(store.event_times(), Vec::<i64>::new());
        assert_eq!(store.event_seconds(100), 0.0);
    }

    #[test]
    fn test_note_storage() {
        let store = MidiStore::new();
        store.set_quantization(1);

        store.add_note_event(50, 123, true);
        assert_eq!(store.notes_on_at(50), vec![123]);

        store.add_note_event(50, 15, true);
        assert_eq!(store.notes_on_at(50), vec![15, 123]);

        // duplicates collapse onto the same entry
        store.add_note_event(50, 15, true);
        assert_eq!(store.notes_on_at(50), vec![15, 123]);
        assert!(store.has_data());
    }

    #[test]
    fn test_quantization_buckets() {
        let store = MidiStore::new();
        assert_eq!(store.quantization(), DEFAULT_QUANTIZATION);

        store.add_note_event(5123, 60, true);
        assert_eq!(store.event_times(), vec![5000]);
        // any query rounding to 5000 finds the event
        assert_eq!(store.notes_on_at(5123), vec![60]);
        assert_eq!(store.notes_on_at(4700), vec![60]);
        // one rounding to a different bucket does not
        assert_eq!(store.notes_on_at(5600), Vec::<i32>::new());
    }

    #[test]
    fn test_quantization_range_check() {
        let store = MidiStore::new();
        store.set_quantization(0);
        assert_eq!(store.quantization(), DEFAULT_QUANTIZATION);
        store.set_quantization(-5);
        assert_eq!(store.quantization(), DEFAULT_QUANTIZATION);
        store.set_quantization(250);
        assert_eq!(store.quantization(), 250);
    }

    #[test]
    fn test_insert_out_of_order() {
        let store = MidiStore::new();
        store.set_quantization(1);
        store.add_note_event(30, 62, true);
        store.add_note_event(10, 60, true);
        store.add_note_event(20, 61, true);
        assert_eq!(store.event_times(), vec![10, 20, 30]);
    }

    #[test]
    fn test_sounding_in_range() {
        let store = MidiStore::new();
        store.set_quantization(1);
        store.add_note_event(10, 60, true);
        store.add_note_event(20, 64, true);
        store.add_note_event(30, 60, false);
        store.add_note_event(40, 67, true);

        assert_eq!(store.notes_sounding_in_range(0, 25), vec![60, 64]);
        assert_eq!(store.notes_sounding_in_range(0, 35), vec![64]);
        assert_eq!(store.notes_sounding_in_range(0, 50), vec![64, 67]);
        // the start bound skips earlier transitions, including the off at 30
        assert_eq!(store.notes_sounding_in_range(35, 50), vec![67]);
    }

    #[test]
    fn test_same_tick_last_write_wins() {
        let store = MidiStore::new();
        store.set_quantization(1);
        store.add_note_event(10, 60, true);
        store.add_note_event(10, 60, false);
        assert_eq!(store.notes_sounding_in_range(0, 10), Vec::<i32>::new());

        let store = MidiStore::new();
        store.set_quantization(1);
        store.add_note_event(10, 60, false);
        store.add_note_event(10, 60, true);
        assert_eq!(store.notes_sounding_in_range(0, 10), vec![60]);
    }

    #[test]
    fn test_recording_flag() {
        let store = MidiStore::new();
        store.set_recording_enabled(false);
        store.add_note_event(1000, 60, true);
        assert!(!store.has_data());

        store.set_recording_enabled(true);
        store.add_note_event(1000, 60, true);
        assert!(store.has_data());

        // clear ignores the recording flag
        store.set_recording_enabled(false);
        store.clear();
        assert!(!store.has_data());
    }

    #[test]
    fn test_staleness_marking() {
        let store = MidiStore::new();
        store.set_quantization(1);
        assert!(!store.is_view_stale());

        store.add_note_event(10, 60, true);
        assert!(store.is_view_stale());
        assert!(store.refresh_view_if_stale(5000));
        assert!(!store.is_view_stale());

        // rewriting the same value is not a data change
        store.add_note_event(10, 60, true);
        assert!(!store.is_view_stale());

        store.add_note_event(10, 60, false);
        assert!(store.is_view_stale());
        // throttled: too soon after the last rebuild
        assert!(!store.refresh_view_if_stale(5500));
        assert!(store.refresh_view_if_stale(6000));
    }

    #[test]
    fn test_set_event_seconds_requires_bucket() {
        let store = MidiStore::new();
        store.set_quantization(1);
        store.set_event_seconds(10, 1.5);
        assert_eq!(store.event_seconds(10), 0.0);

        store.add_note_event(10, 60, true);
        store.set_event_seconds(10, 1.5);
        assert_eq!(store.event_seconds(10), 1.5);
    }

    #[test]
    fn test_rebuild_chord_view() {
        let store = MidiStore::new();
        store.set_quantization(1);

        // C major triad
        for &note in &[60, 64, 67] {
            store.add_note_event(10, note, true);
        }
        store.set_event_seconds(10, 1.0);
        for &note in &[60, 64, 67] {
            store.add_note_event(20, note, false);
        }
        // F major triad
        for &note in &[65, 69, 72] {
            store.add_note_event(30, note, true);
        }
        store.set_event_seconds(30, 3.0);

        store.rebuild_chord_view();
        let entries = store.query_window(0.0, 10.0);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["C", "F"]);
        assert_eq!(entries[0].seconds, 1.0);
        assert_eq!(entries[1].seconds, 3.0);
        assert_eq!(store.last_query_hits(), 2);
    }

    #[test]
    fn test_query_window_bounds() {
        let store = MidiStore::new();
        store.set_quantization(1);
        store.add_note_event(10, 60, true);
        store.set_event_seconds(10, 1.0);
        store.add_note_event(20, 60, false);
        store.add_note_event(30, 65, true);
        store.set_event_seconds(30, 3.0);
        store.rebuild_chord_view();

        assert_eq!(store.query_window(0.0, 0.5).len(), 0);
        assert_eq!(store.query_window(1.0, 3.0).len(), 2);
        assert_eq!(store.query_window(1.1, 2.9).len(), 0);
        assert_eq!(store.query_window(2.0, 10.0).len(), 1);
    }

    #[test]
    fn test_short_chord_merges_identical_neighbours() {
        let store = MidiStore::new();
        store.set_quantization(1);
        store.set_short_chord_threshold(0.5);

        // C ... brief F ... C again
        store.add_note_event(0, 60, true);
        store.set_event_seconds(0, 0.0);
        store.add_note_event(100, 60, false);
        store.add_note_event(100, 65, true);
        store.set_event_seconds(100, 10.0);
        store.add_note_event(101, 65, false);
        store.add_note_event(101, 60, true);
        store.set_event_seconds(101, 10.1);
        store.add_note_event(300, 60, false);
        store.set_event_seconds(300, 20.0);

        store.rebuild_chord_view();
        let entries = store.query_window(0.0, 30.0);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "C");
        assert_eq!(entries[0].seconds, 0.0);
    }

    #[test]
    fn test_short_chord_removal_without_merge() {
        let store = MidiStore::new();
        store.set_quantization(1);
        store.set_short_chord_threshold(0.5);

        // C ... brief F ... G
        store.add_note_event(0, 60, true);
        store.set_event_seconds(0, 0.0);
        store.add_note_event(100, 60, false);
        store.add_note_event(100, 65, true);
        store.set_event_seconds(100, 10.0);
        store.add_note_event(101, 65, false);
        store.add_note_event(101, 67, true);
        store.set_event_seconds(101, 10.1);
        store.add_note_event(300, 67, false);
        store.set_event_seconds(300, 20.0);

        store.rebuild_chord_view();
        let entries = store.query_window(0.0, 30.0);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["C", "G"]);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let store = MidiStore::new();
        store.set_quantization(1);
        store.set_name("take one");
        store.add_note_event(10, 60, true);
        store.set_event_seconds(10, 1.0);
        store.add_note_event(20, 60, false);

        let snapshot = store.snapshot();
        let parsed = Snapshot::from_json(&snapshot.to_json()).unwrap();
        assert_eq!(parsed, snapshot);

        let other = MidiStore::new();
        other.replace_state(&parsed).unwrap();
        assert_eq!(other.name(), "take one");
        assert_eq!(other.quantization(), 1);
        assert_eq!(other.event_times(), vec![10, 20]);
        assert_eq!(other.notes_on_at(10), vec![60]);
        assert_eq!(other.event_seconds(10), 1.0);
        assert!(other.is_view_stale());
    }

    #[test]
    fn test_replace_state_rejects_unknown_version() {
        let store = MidiStore::new();
        store.set_quantization(1);
        store.add_note_event(10, 60, true);

        let mut snapshot = store.snapshot();
        snapshot.version = 99;

        let other = MidiStore::new();
        other.add_note_event(7000, 50, true);
        let res = other.replace_state(&snapshot);
        assert_eq!(res, Err(StateErr::UnsupportedVersion(99)));
        // prior state retained
        assert_eq!(other.event_times(), vec![7000]);
    }

    #[test]
    fn test_malformed_snapshot() {
        assert_eq!(
            Snapshot::from_json("not even json"),
            Err(StateErr::MalformedSnapshot)
        );
    }
}
