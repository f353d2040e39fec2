//! # Chord naming
//!
//! Pure functions mapping sets of MIDI note numbers to chord name strings.
//! This is a heuristic classifier, not a music-theoretically complete one:
//! spelling is fixed to flats (Gb rather than F#) with no key awareness, and
//! voicings that match none of the interval tables degrade to the bare root
//! name. The interval tables are a compatibility surface and must not be
//! "improved" without revisiting every caller and test.

use std::collections::BTreeSet;

const NOTE_NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Name a chord from the given MIDI note numbers
///
/// The notes may arrive in any order and span any octaves; the result depends
/// only on the pitch-class set and which pitch class is the bass. An empty
/// input yields an empty string.
pub fn name_chord(notes: &[i32]) -> String {
    if notes.is_empty() {
        return String::new();
    }

    let reduced = reduce(notes);
    match reduced.len() {
        1 => note_name(reduced[0]).to_string(),
        2 => two_note_name(&reduced),
        _ => multi_note_name(reduced),
    }
}

/// The display name of a note's pitch class, using flat spelling
pub fn note_name(note: i32) -> &'static str {
    match NOTE_NAMES.get(note.rem_euclid(12) as usize) {
        Some(name) => name,
        None => "unknown note",
    }
}

/// Whether a chord name carries a flat or sharp symbol
///
/// Advisory query for display layers that substitute music glyphs for the
/// plain 'b'/'#' characters. The root letter itself never counts.
pub fn has_accidental(name: &str) -> bool {
    name.len() > 1 && (name[1..].contains('b') || name[1..].contains('#'))
}

/// Reduce notes to a deduplicated single-octave span rebased on the bass
///
/// Every note maps to its pitch class, then classes below the bass's class
/// are lifted an octave so the bass keeps its bottom position. The result is
/// ascending and lies in `[bass, bass + 11]`.
fn reduce(notes: &[i32]) -> Vec<i32> {
    let bottom = match notes.iter().min() {
        Some(&note) => note.rem_euclid(12),
        None => return Vec::new(),
    };

    let mut unique = BTreeSet::new();
    for &note in notes {
        let mut pitch = note.rem_euclid(12);
        if pitch < bottom {
            pitch += 12;
        }
        unique.insert(pitch);
    }
    unique.into_iter().collect()
}

fn two_note_name(notes: &[i32]) -> String {
    // Some of these intervals are dubious as chords (a bare tritone, say);
    // those name as just the root.
    let modifier = match notes[1] - notes[0] {
        2 => "2",
        3 => "min",
        5 => "4",
        9 => "6",
        10 | 11 => "7",
        _ => "",
    };
    format!("{}{}", note_name(notes[0]), modifier)
}

fn multi_note_name(mut notes: Vec<i32>) -> String {
    let orig_bass = notes[0];
    let inverted = rotate_inversion(&mut notes);
    let bass = notes[0];

    // Notes a 2nd, 4th or 6th above the bass are 9th/11th/13th extensions
    // and stay out of the triad/seventh classification. They are collected
    // but not yet used for naming.
    let mut core = Vec::with_capacity(notes.len());
    let mut extensions = Vec::new();
    for &note in &notes {
        match note - bass {
            2 | 5 | 9 => extensions.push(note),
            _ => core.push(note),
        }
    }

    let interval1 = if core.len() > 1 { core[1] - core[0] } else { 0 };
    let interval2 = if core.len() > 2 { core[2] - core[1] } else { 0 };
    let interval3 = if core.len() > 3 { core[3] - core[2] } else { 0 };

    let mut chord = format!("{}{}", note_name(bass), quality(interval1, interval2, interval3));
    if inverted {
        // Slash notation: C-F-A is the 2nd inversion of F major, shown as F/C
        chord.push('/');
        chord.push_str(note_name(orig_bass));
    }
    chord
}

/// Un-invert a bass-heavy voicing in place
///
/// Finds the single largest gap between adjacent reduced notes. A gap of 5 or
/// more semitones reads as an inversion: the notes before the gap move up an
/// octave and rotate to the end, so C-F-A becomes F-A-C. Returns whether a
/// rotation happened.
fn rotate_inversion(notes: &mut Vec<i32>) -> bool {
    let mut max_gap = 0;
    let mut gap_pos = 0;
    for i in 1..notes.len() {
        let gap = notes[i] - notes[i - 1];
        if gap > max_gap {
            max_gap = gap;
            gap_pos = i;
        }
    }

    if max_gap < 5 {
        return false;
    }

    for note in &mut notes[..gap_pos] {
        *note += 12;
    }
    notes.rotate_left(gap_pos);
    true
}

fn quality(interval1: i32, interval2: i32, interval3: i32) -> &'static str {
    match (interval1, interval2, interval3) {
        (4, 3, 0) => "",
        (3, 4, 0) => "min",
        (3, 3, 0) => "dim",
        (4, 4, 0) => "aug",
        (4, 3, 3) => "7",
        (4, 3, 4) => "M7",
        (3, 4, 3) => "m7",
        (3, 3, 4) => "m7b5",
        (3, 3, 3) => "m7",
        (4, 4, 3) => "M7+",
        (3, 4, 4) => "m-7",
        _ => "",
    }
}
