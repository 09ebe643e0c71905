//! Domain layer: the bar-item intermediate representation (§3), the
//! transforms that operate on it (§4.1–4.3), and the readers that build it
//! (§4.2, native notation and MusicXML).

pub mod arena;
pub mod bar;
pub mod engrave;
pub mod errors;
pub mod ids;
pub mod item;
pub mod movement;
pub mod readers;
pub mod stave;
pub mod value_objects;

pub use bar::Bar;
pub use errors::{Diagnostics, EngraveError, Severity};
pub use ids::{BarIndex, ItemIndex, MovementId, StaveId};
pub use item::{Item, ItemKind};
pub use movement::Movement;
pub use stave::Stave;
