//! # Note Catalog Module
//!
//! This module defines the static table of musical notes the tuner can
//! identify. Notes are laid out in ascending frequency order using equal
//! temperament with A4 = 440 Hz, and the catalog is built once at startup
//! and never mutated afterwards.
//!
//! ## Features
//! - Five-octave chromatic range (C2 to B6, 60 notes)
//! - Equal temperament frequency calculations
//! - O(log n) note id lookups
//! - Stable ascending-frequency ordering for UI layout

use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::fmt;

/// Whether a note carries an accidental. Only sharps appear in the
/// catalog; flats are spelled as the enharmonic sharp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accidental {
    Natural,
    Sharp,
}

/// A single musical note with its equal-tempered reference frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// Unique id, printed name plus octave (e.g. "A4", "C#3").
    pub id: String,
    /// Letter name without the accidental (e.g. "A", "C").
    pub name: String,
    /// Natural or sharp.
    pub accidental: Accidental,
    /// Scientific pitch notation octave number.
    pub octave: i32,
    /// Equal-tempered reference frequency in Hz.
    pub reference_frequency_hz: f64,
}

impl Note {
    /// Printed letter name with accidental but without the octave
    /// (e.g. "A#"), as shown on the note strip.
    pub fn letter_name(&self) -> String {
        match self.accidental {
            Accidental::Natural => self.name.clone(),
            Accidental::Sharp => format!("{}#", self.name),
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// The ordered, immutable table of notes the tuner matches against.
///
/// Frequencies are strictly increasing by catalog order and every id is
/// unique; both properties are relied upon by the matcher's tie-breaking
/// and by the UI's note strip layout.
#[derive(Debug, Clone)]
pub struct NoteCatalog {
    notes: Vec<Note>,
    by_id: BTreeMap<String, usize>,
}

/// Lowest catalog note, C2, as a MIDI note number.
const FIRST_MIDI_NOTE: i32 = 36;
/// Number of chromatic notes in the catalog (C2 through B6).
const CATALOG_LEN: i32 = 60;
/// MIDI note number of the A4 reference.
const MIDI_A4: i32 = 69;
/// Reference pitch for A4 in Hz.
const A4_HZ: f64 = 440.0;

/// Note letter names within one octave, starting at C.
const NOTE_NAMES: [(&str, Accidental); 12] = [
    ("C", Accidental::Natural),
    ("C", Accidental::Sharp),
    ("D", Accidental::Natural),
    ("D", Accidental::Sharp),
    ("E", Accidental::Natural),
    ("F", Accidental::Natural),
    ("F", Accidental::Sharp),
    ("G", Accidental::Natural),
    ("G", Accidental::Sharp),
    ("A", Accidental::Natural),
    ("A", Accidental::Sharp),
    ("B", Accidental::Natural),
];

/// Statically computed standard catalog, built once on first use.
static STANDARD: Lazy<NoteCatalog> = Lazy::new(NoteCatalog::standard);

impl NoteCatalog {
    /// Builds the standard C2..B6 equal-temperament catalog.
    ///
    /// The frequency of each note is `440 * 2^(n/12)` where `n` is the
    /// number of semitones away from A4.
    pub fn standard() -> Self {
        let mut notes = Vec::with_capacity(CATALOG_LEN as usize);
        for midi in FIRST_MIDI_NOTE..(FIRST_MIDI_NOTE + CATALOG_LEN) {
            let frequency = A4_HZ * 2.0_f64.powf((midi - MIDI_A4) as f64 / 12.0);
            let (name, accidental) = NOTE_NAMES[(midi % 12) as usize];
            // MIDI octaves change at C; C4 is note number 60.
            let octave = midi / 12 - 1;
            let suffix = match accidental {
                Accidental::Natural => "",
                Accidental::Sharp => "#",
            };
            notes.push(Note {
                id: format!("{}{}{}", name, suffix, octave),
                name: name.to_string(),
                accidental,
                octave,
                reference_frequency_hz: frequency,
            });
        }
        Self::from_notes(notes)
    }

    /// Builds a catalog from an already-ordered note list.
    ///
    /// # Panics
    /// * If the notes are not strictly increasing in frequency, or if two
    ///   notes share an id. Both indicate a programming error in the
    ///   table definition, not a runtime condition.
    pub fn from_notes(notes: Vec<Note>) -> Self {
        let mut by_id = BTreeMap::new();
        for (i, note) in notes.iter().enumerate() {
            if i > 0 {
                assert!(
                    notes[i - 1].reference_frequency_hz < note.reference_frequency_hz,
                    "catalog frequencies must be strictly increasing"
                );
            }
            let previous = by_id.insert(note.id.clone(), i);
            assert!(previous.is_none(), "duplicate note id: {}", note.id);
        }
        Self { notes, by_id }
    }

    /// Returns a shared reference to the standard catalog.
    pub fn shared() -> &'static NoteCatalog {
        &STANDARD
    }

    /// Looks a note up by its id.
    ///
    /// # Returns
    /// * `Some(note)` - The note with the given id
    /// * `None` - No such note in the catalog
    pub fn lookup(&self, id: &str) -> Option<&Note> {
        self.by_id.get(id).map(|&i| &self.notes[i])
    }

    /// All notes in ascending frequency order.
    pub fn all(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_is_ordered_and_unique() {
        let catalog = NoteCatalog::standard();
        assert_eq!(catalog.len(), 60);

        let notes = catalog.all();
        for pair in notes.windows(2) {
            assert!(
                pair[0].reference_frequency_hz < pair[1].reference_frequency_hz,
                "{} ({} Hz) should be below {} ({} Hz)",
                pair[0].id,
                pair[0].reference_frequency_hz,
                pair[1].id,
                pair[1].reference_frequency_hz
            );
        }
    }

    #[test]
    fn well_known_reference_frequencies() {
        let catalog = NoteCatalog::standard();

        let a4 = catalog.lookup("A4").expect("A4 should exist");
        assert!((a4.reference_frequency_hz - 440.0).abs() < 1e-9);
        assert_eq!(a4.name, "A");
        assert_eq!(a4.accidental, Accidental::Natural);
        assert_eq!(a4.octave, 4);

        let c5 = catalog.lookup("C5").expect("C5 should exist");
        assert!(
            (c5.reference_frequency_hz - 523.2511).abs() < 1e-3,
            "C5 should be ~523.25 Hz, got {}",
            c5.reference_frequency_hz
        );

        let csharp3 = catalog.lookup("C#3").expect("C#3 should exist");
        assert_eq!(csharp3.accidental, Accidental::Sharp);
        assert!((csharp3.reference_frequency_hz - 138.5913).abs() < 1e-3);
    }

    #[test]
    fn lookup_of_unknown_id_is_none() {
        let catalog = NoteCatalog::shared();
        assert!(catalog.lookup("H4").is_none());
        // Outside the C2..B6 range.
        assert!(catalog.lookup("A0").is_none());
        assert!(catalog.lookup("C8").is_none());
    }
}
