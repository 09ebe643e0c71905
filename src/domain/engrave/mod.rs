//! Engraving transforms (§4.1–4.3): the passes that turn a reader's raw IR
//! into print-ready IR — stem direction, chord sort/accidental layout, and
//! (eventually) beaming.

pub mod chord;
pub mod stems;

pub use chord::layout_chord;
pub use stems::{setbeamstems, StemResolver};
