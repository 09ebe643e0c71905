//! Native-notation reader: preprocessor + lexer + parser, assembled into a
//! single entry point that produces a [`Movement`] with one stave (§4.2).

pub mod lexer;
pub mod parser;
pub mod preprocessor;

use crate::domain::bar::Bar;
use crate::domain::errors::{Diagnostics, EngraveError, Severity};
use crate::domain::item::ItemKind;
use crate::domain::movement::Movement;
use crate::domain::stave::Stave;
use crate::domain::value_objects::Clef;
use preprocessor::{FsIncludeResolver, IncludeResolver, Preprocessor};
use std::path::Path;

pub struct NativeReader<'a> {
    resolver: &'a dyn IncludeResolver,
}

impl<'a> NativeReader<'a> {
    pub fn new(resolver: &'a dyn IncludeResolver) -> Self {
        Self { resolver }
    }

    pub fn with_fs_includes() -> NativeReader<'static> {
        NativeReader {
            resolver: &FsIncludeResolver,
        }
    }

    pub fn read(
        &self,
        source: &str,
        path: &Path,
        diagnostics: &mut Diagnostics,
    ) -> Result<Movement, EngraveError> {
        let mut pre = Preprocessor::new(self.resolver);
        let expanded = pre.expand(source, path)?;

        let (parsed_bars, key) = parser::parse_bars(&expanded)?;

        let mut movement = Movement::new();
        let mut stave = Stave::new("Part 1", Clef::Treble, key);
        for items in parsed_bars {
            let mut bar = Bar::new();
            let mut last_note_idx = None;
            for mut kind in items {
                if let ItemKind::Tie(ref mut tie) = kind {
                    tie.preceding_note = last_note_idx;
                }
                let idx = bar.push_back(kind);
                if matches!(bar.get(idx).kind, ItemKind::Note(_) | ItemKind::ChordContinuation(_)) {
                    last_note_idx = Some(idx);
                }
            }
            bar.check_terminated(diagnostics, false);
            stave.push_bar(bar);
        }
        let bar_count = stave.bar_count();
        movement.add_stave(stave);
        movement.assign_bar_numbers(bar_count, 1, None);
        movement.check_bar_counts_consistent(diagnostics);

        if diagnostics.max_severity().map_or(false, |s| s >= Severity::Fatal) {
            return Err(EngraveError::Message("native source had fatal diagnostics".into()));
        }

        Ok(movement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoIncludes;
    impl IncludeResolver for NoIncludes {
        fn resolve(&self, _from: &Path, target: &str) -> Result<String, EngraveError> {
            Err(EngraveError::Message(format!("no such include: {target}")))
        }
    }

    #[test]
    fn reads_two_bars_into_one_stave() {
        let resolver = NoIncludes;
        let reader = NativeReader::new(&resolver);
        let mut diagnostics = Diagnostics::new(None);
        let movement = reader
            .read("c d e f |\ng a b c' |\n", Path::new("in.ntn"), &mut diagnostics)
            .unwrap();
        assert_eq!(movement.stave_count(), 1);
        assert_eq!(movement.stave(0).bar_count(), 2);
    }
}
