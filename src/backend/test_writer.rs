//! A reference/test [`OutputSink`] that records every call as a line of
//! text, coalescing redundant state-change calls (setting the same colour,
//! dash pattern, line cap or join twice in a row) the way a real backend
//! would need to in order to avoid bloating its output (§4.8).

use super::{Color, DashPattern, LineCap, LineJoin, OutputSink};

#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    BeginPage(f64, f64),
    EndPage,
    SetColor(Color),
    SetLineWidth(f64),
    SetLineCap(LineCap),
    SetLineJoin(LineJoin),
    SetDash(DashPattern),
    MoveTo(f64, f64),
    LineTo(f64, f64),
    CurveTo(f64, f64, f64, f64, f64, f64),
    ClosePath,
    Fill,
    Stroke,
    DrawGlyph(char),
    DrawText(String),
    SaveState,
    RestoreState,
    Translate(f64, f64),
    Scale(f64, f64),
    Comment(String),
}

#[derive(Default)]
pub struct TestWriter {
    pub records: Vec<Recorded>,
    current_color: Option<Color>,
    current_dash: Option<DashPattern>,
    current_cap: Option<LineCap>,
    current_join: Option<LineJoin>,
}

impl TestWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputSink for TestWriter {
    fn begin_page(&mut self, width: f64, height: f64) {
        self.records.push(Recorded::BeginPage(width, height));
    }

    fn end_page(&mut self) {
        self.records.push(Recorded::EndPage);
    }

    fn set_color(&mut self, color: Color) {
        if self.current_color == Some(color) {
            return;
        }
        self.current_color = Some(color);
        self.records.push(Recorded::SetColor(color));
    }

    fn set_line_width(&mut self, width: f64) {
        self.records.push(Recorded::SetLineWidth(width));
    }

    fn set_line_cap(&mut self, cap: LineCap) {
        if self.current_cap == Some(cap) {
            return;
        }
        self.current_cap = Some(cap);
        self.records.push(Recorded::SetLineCap(cap));
    }

    fn set_line_join(&mut self, join: LineJoin) {
        if self.current_join == Some(join) {
            return;
        }
        self.current_join = Some(join);
        self.records.push(Recorded::SetLineJoin(join));
    }

    fn set_dash(&mut self, pattern: DashPattern) {
        if self.current_dash == Some(pattern) {
            return;
        }
        self.current_dash = Some(pattern);
        self.records.push(Recorded::SetDash(pattern));
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.records.push(Recorded::MoveTo(x, y));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.records.push(Recorded::LineTo(x, y));
    }

    fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) {
        self.records.push(Recorded::CurveTo(x1, y1, x2, y2, x3, y3));
    }

    fn close_path(&mut self) {
        self.records.push(Recorded::ClosePath);
    }

    fn fill(&mut self) {
        self.records.push(Recorded::Fill);
    }

    fn stroke(&mut self) {
        self.records.push(Recorded::Stroke);
    }

    fn draw_glyph(&mut self, _font: &str, _size: f64, _x: f64, _y: f64, glyph: char) {
        self.records.push(Recorded::DrawGlyph(glyph));
    }

    fn draw_text(&mut self, _font: &str, _size: f64, _x: f64, _y: f64, text: &str) {
        self.records.push(Recorded::DrawText(text.to_string()));
    }

    fn save_state(&mut self) {
        self.records.push(Recorded::SaveState);
    }

    fn restore_state(&mut self) {
        self.records.push(Recorded::RestoreState);
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.records.push(Recorded::Translate(dx, dy));
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.records.push(Recorded::Scale(sx, sy));
    }

    fn comment(&mut self, text: &str) {
        self.records.push(Recorded::Comment(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_identical_color_is_coalesced_away() {
        let mut writer = TestWriter::new();
        writer.set_color(Color::BLACK);
        writer.set_color(Color::BLACK);
        writer.set_color(Color { r: 1.0, g: 0.0, b: 0.0 });
        let color_changes = writer
            .records
            .iter()
            .filter(|r| matches!(r, Recorded::SetColor(_)))
            .count();
        assert_eq!(color_changes, 2);
    }

    #[test]
    fn repeated_identical_dash_pattern_is_coalesced_away() {
        let mut writer = TestWriter::new();
        writer.set_dash(DashPattern::Solid);
        writer.set_dash(DashPattern::Solid);
        writer.set_dash(DashPattern::Dashed { on: 4.0, off: 2.0 });
        let dash_changes = writer.records.iter().filter(|r| matches!(r, Recorded::SetDash(_))).count();
        assert_eq!(dash_changes, 2);
    }

    #[test]
    fn drawing_calls_are_never_coalesced() {
        let mut writer = TestWriter::new();
        writer.move_to(0.0, 0.0);
        writer.move_to(0.0, 0.0);
        assert_eq!(writer.records.len(), 2);
    }
}
