//! End-to-end MusicXML import: parse a small partwise document and confirm
//! the converted movement carries the expected staves, notes and rests.

use engrave_core::domain::errors::Diagnostics;
use engrave_core::domain::ids::BarIndex;
use engrave_core::domain::readers::musicxml::MusicXmlReader;

const TWO_MEASURE_SCORE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<score-partwise>
  <part-list>
    <score-part id="P1"><part-name>Flute</part-name></score-part>
  </part-list>
  <part id="P1">
    <measure number="1">
      <attributes>
        <divisions>2</divisions>
        <key><fifths>0</fifths></key>
        <time><beats>4</beats><beat-type>4</beat-type></time>
        <clef><sign>G</sign><line>2</line></clef>
      </attributes>
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>2</duration><type>quarter</type></note>
      <note><pitch><step>E</step><octave>4</octave></pitch><duration>2</duration><type>quarter</type></note>
      <note><rest/><duration>4</duration><type>half</type></note>
    </measure>
    <measure number="2">
      <note><pitch><step>G</step><octave>4</octave></pitch><duration>8</duration><type>whole</type></note>
    </measure>
  </part>
</score-partwise>"#;

#[test]
fn imports_two_measures_into_one_stave() {
    let mut diagnostics = Diagnostics::new(None);
    let (movement, warnings) =
        MusicXmlReader::read_bytes(TWO_MEASURE_SCORE.as_bytes(), &mut diagnostics).unwrap();

    assert_eq!(movement.stave_count(), 1);
    assert_eq!(movement.stave(0).bar_count(), 2);
    assert!(warnings.is_empty());
}

#[test]
fn first_two_notes_form_a_chord_continuation_free_run() {
    let mut diagnostics = Diagnostics::new(None);
    let (movement, _) =
        MusicXmlReader::read_bytes(TWO_MEASURE_SCORE.as_bytes(), &mut diagnostics).unwrap();

    let stave = movement.stave(0);
    let bar = stave.bar(BarIndex(0));
    let notes: Vec<_> = bar
        .iter()
        .filter_map(|(_, item)| item.kind.as_note())
        .collect();
    // Two pitched quarter notes plus a half rest, none of them chord members.
    assert_eq!(notes.len(), 3);
}

#[test]
fn detects_a_non_musicxml_document() {
    let mut diagnostics = Diagnostics::new(None);
    let result = MusicXmlReader::read_bytes(b"not xml at all", &mut diagnostics);
    assert!(result.is_err());
}
