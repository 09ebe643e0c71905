//! Streaming MusicXML parser, built on `quick-xml`'s pull-event reader —
//! the same idiom the engine's teacher codebase uses for its own MusicXML
//! import: one function per element, matching `Event::Start`/`Empty`/`End`,
//! with byte-string tag-name comparisons rather than building a DOM first.

use super::errors::ImportError;
use super::types::{AttributesData, BackupForward, MeasureData, NoteData, PartData, PartListEntry, PitchData, ScorePartwiseData};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

pub fn parse_score_partwise(xml: &str) -> Result<ScorePartwiseData, ImportError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut score = ScorePartwiseData::default();

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| ImportError::Xml {
            offset: reader.buffer_position(),
            message: e.to_string(),
        })? {
            Event::Start(e) if e.name().as_ref() == b"part-list" => {
                score.part_list = parse_part_list(&mut reader)?;
            }
            Event::Start(e) if e.name().as_ref() == b"part" => {
                let id = attr(&e, b"id").unwrap_or_default();
                score.parts.push(parse_part(&mut reader, id)?);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if score.parts.is_empty() && score.part_list.is_empty() {
        return Err(ImportError::NotMusicXml(
            "document has neither <part-list> nor <part>".into(),
        ));
    }
    Ok(score)
}

fn attr(start: &BytesStart, name: &[u8]) -> Option<String> {
    start.attributes().flatten().find_map(|a| {
        if a.key.as_ref() == name {
            Some(String::from_utf8_lossy(&a.value).into_owned())
        } else {
            None
        }
    })
}

fn parse_part_list(reader: &mut Reader<&[u8]>) -> Result<Vec<PartListEntry>, ImportError> {
    let mut buf = Vec::new();
    let mut entries = Vec::new();
    let mut current_id = None;
    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err(reader))? {
            Event::Start(e) if e.name().as_ref() == b"score-part" => {
                current_id = attr(&e, b"id");
            }
            Event::Start(e) if e.name().as_ref() == b"part-name" => {
                let name = read_text(reader)?;
                if let Some(id) = current_id.take() {
                    entries.push(PartListEntry { id, name });
                }
            }
            Event::End(e) if e.name().as_ref() == b"part-list" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(entries)
}

fn parse_part(reader: &mut Reader<&[u8]>, id: String) -> Result<PartData, ImportError> {
    let mut buf = Vec::new();
    let mut part = PartData { id, measures: Vec::new() };
    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err(reader))? {
            Event::Start(e) if e.name().as_ref() == b"measure" => {
                let number = attr(&e, b"number").unwrap_or_default();
                part.measures.push(parse_measure(reader, number)?);
            }
            Event::End(e) if e.name().as_ref() == b"part" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(part)
}

fn parse_measure(reader: &mut Reader<&[u8]>, number: String) -> Result<MeasureData, ImportError> {
    let mut buf = Vec::new();
    let mut measure = MeasureData {
        number,
        ..Default::default()
    };
    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err(reader))? {
            Event::Start(e) if e.name().as_ref() == b"attributes" => {
                measure.attributes = Some(parse_attributes(reader)?);
            }
            Event::Start(e) if e.name().as_ref() == b"note" => {
                let note = parse_note(reader)?;
                measure.notes.push(note);
            }
            Event::Empty(e) if e.name().as_ref() == b"note" => {
                measure.notes.push(NoteData::default());
            }
            Event::Start(e) if e.name().as_ref() == b"backup" => {
                let duration = parse_single_i64(reader, b"backup")?;
                measure.backups.push(BackupForward::Backup {
                    duration,
                    after_note_index: measure.notes.len(),
                });
            }
            Event::Start(e) if e.name().as_ref() == b"forward" => {
                let duration = parse_single_i64(reader, b"forward")?;
                measure.backups.push(BackupForward::Forward {
                    duration,
                    after_note_index: measure.notes.len(),
                });
            }
            Event::End(e) if e.name().as_ref() == b"measure" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(measure)
}

/// Parse a `<duration>` nested one level inside `closing_tag` (used by both
/// `<backup>` and `<forward>`, which otherwise differ only in semantics).
fn parse_single_i64(reader: &mut Reader<&[u8]>, closing_tag: &[u8]) -> Result<i64, ImportError> {
    let mut buf = Vec::new();
    let mut value = 0i64;
    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err(reader))? {
            Event::Start(e) if e.name().as_ref() == b"duration" => {
                value = read_text(reader)?.trim().parse().unwrap_or(0);
            }
            Event::End(e) if e.name().as_ref() == closing_tag => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(value)
}

fn parse_attributes(reader: &mut Reader<&[u8]>) -> Result<AttributesData, ImportError> {
    let mut buf = Vec::new();
    let mut attrs = AttributesData::default();
    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err(reader))? {
            Event::Start(e) if e.name().as_ref() == b"divisions" => {
                attrs.divisions = read_text(reader)?.trim().parse().ok();
            }
            Event::Start(e) if e.name().as_ref() == b"fifths" => {
                attrs.fifths = read_text(reader)?.trim().parse().ok();
            }
            Event::Start(e) if e.name().as_ref() == b"mode" => {
                attrs.mode = Some(read_text(reader)?);
            }
            Event::Start(e) if e.name().as_ref() == b"beats" => {
                attrs.beats = read_text(reader)?.trim().parse().ok();
            }
            Event::Start(e) if e.name().as_ref() == b"beat-type" => {
                attrs.beat_type = read_text(reader)?.trim().parse().ok();
            }
            Event::Start(e) if e.name().as_ref() == b"sign" => {
                attrs.clef_sign = Some(read_text(reader)?);
            }
            Event::Start(e) if e.name().as_ref() == b"line" => {
                attrs.clef_line = read_text(reader)?.trim().parse().ok();
            }
            Event::Start(e) if e.name().as_ref() == b"clef-octave-change" => {
                attrs.clef_octave_change = read_text(reader)?.trim().parse().ok();
            }
            Event::End(e) if e.name().as_ref() == b"attributes" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(attrs)
}

fn parse_note(reader: &mut Reader<&[u8]>) -> Result<NoteData, ImportError> {
    let mut buf = Vec::new();
    let mut note = NoteData::default();
    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err(reader))? {
            Event::Empty(e) if e.name().as_ref() == b"rest" => {
                note.is_rest = true;
            }
            Event::Start(e) if e.name().as_ref() == b"rest" => {
                note.is_rest = true;
            }
            Event::Empty(e) if e.name().as_ref() == b"chord" => {
                note.chord = true;
            }
            Event::Start(e) if e.name().as_ref() == b"pitch" => {
                note.pitch = Some(parse_pitch(reader)?);
            }
            Event::Start(e) if e.name().as_ref() == b"duration" => {
                note.duration = read_text(reader)?.trim().parse().unwrap_or(0);
            }
            Event::Start(e) if e.name().as_ref() == b"type" => {
                note.note_type = Some(read_text(reader)?);
            }
            Event::Empty(e) if e.name().as_ref() == b"dot" => {
                note.dots += 1;
            }
            Event::Start(e) if e.name().as_ref() == b"voice" => {
                note.voice = Some(read_text(reader)?);
            }
            Event::Start(e) if e.name().as_ref() == b"staff" => {
                note.staff = read_text(reader)?.trim().parse().ok();
            }
            Event::Empty(e) if e.name().as_ref() == b"tie" => {
                tie_flag(&e, &mut note);
            }
            Event::Start(e) if e.name().as_ref() == b"accidental" => {
                note.accidental = Some(read_text(reader)?);
            }
            Event::Start(e) if e.name().as_ref() == b"time-modification" => {
                parse_time_modification(reader, &mut note)?;
            }
            Event::End(e) if e.name().as_ref() == b"note" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(note)
}

fn tie_flag(start: &BytesStart, note: &mut NoteData) {
    match attr(start, b"type").as_deref() {
        Some("start") => note.tie_start = true,
        Some("stop") => note.tie_stop = true,
        _ => {}
    }
}

fn parse_pitch(reader: &mut Reader<&[u8]>) -> Result<PitchData, ImportError> {
    let mut buf = Vec::new();
    let mut pitch = PitchData::default();
    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err(reader))? {
            Event::Start(e) if e.name().as_ref() == b"step" => {
                pitch.step = read_text(reader)?.chars().next().unwrap_or('C');
            }
            Event::Start(e) if e.name().as_ref() == b"alter" => {
                pitch.alter = read_text(reader)?.trim().parse().unwrap_or(0);
            }
            Event::Start(e) if e.name().as_ref() == b"octave" => {
                pitch.octave = read_text(reader)?.trim().parse().unwrap_or(4);
            }
            Event::End(e) if e.name().as_ref() == b"pitch" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(pitch)
}

fn parse_time_modification(reader: &mut Reader<&[u8]>, note: &mut NoteData) -> Result<(), ImportError> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err(reader))? {
            Event::Start(e) if e.name().as_ref() == b"actual-notes" => {
                note.time_mod_actual = read_text(reader)?.trim().parse().ok();
            }
            Event::Start(e) if e.name().as_ref() == b"normal-notes" => {
                note.time_mod_normal = read_text(reader)?.trim().parse().ok();
            }
            Event::End(e) if e.name().as_ref() == b"time-modification" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn read_text(reader: &mut Reader<&[u8]>) -> Result<String, ImportError> {
    let mut buf = Vec::new();
    let text = match reader.read_event_into(&mut buf).map_err(xml_err(reader))? {
        Event::Text(t) => t.unescape().map(|c| c.into_owned()).unwrap_or_default(),
        _ => String::new(),
    };
    Ok(text)
}

fn xml_err<'a>(reader: &'a Reader<&[u8]>) -> impl Fn(quick_xml::Error) -> ImportError + 'a {
    move |e| ImportError::Xml {
        offset: reader.buffer_position(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_part_single_measure_note() {
        let xml = r#"<?xml version="1.0"?>
        <score-partwise>
          <part-list><score-part id="P1"><part-name>Flute</part-name></score-part></part-list>
          <part id="P1">
            <measure number="1">
              <attributes><divisions>1</divisions></attributes>
              <note><pitch><step>C</step><octave>4</octave></pitch><duration>4</duration><type>quarter</type></note>
            </measure>
          </part>
        </score-partwise>"#;
        let score = parse_score_partwise(xml).unwrap();
        assert_eq!(score.part_list.len(), 1);
        assert_eq!(score.part_list[0].name, "Flute");
        assert_eq!(score.parts[0].measures[0].notes[0].pitch.as_ref().unwrap().step, 'C');
    }

    #[test]
    fn rejects_document_without_score_partwise_content() {
        let result = parse_score_partwise("<not-musicxml/>");
        assert!(result.is_err());
    }

    #[test]
    fn backup_is_recorded_at_its_position_in_the_note_list() {
        let xml = r#"<score-partwise>
          <part id="P1"><measure number="1">
            <note><pitch><step>C</step><octave>4</octave></pitch><duration>4</duration></note>
            <backup><duration>4</duration></backup>
            <note><pitch><step>E</step><octave>4</octave></pitch><duration>4</duration></note>
          </measure></part>
        </score-partwise>"#;
        let score = parse_score_partwise(xml).unwrap();
        let measure = &score.parts[0].measures[0];
        assert_eq!(measure.backups.len(), 1);
        match measure.backups[0] {
            BackupForward::Backup { duration, after_note_index } => {
                assert_eq!(duration, 4);
                assert_eq!(after_note_index, 1);
            }
            _ => panic!("expected a backup"),
        }
    }
}
