//! Line/page breaking and justification (§4.5).
//!
//! Breaking walks a five-state machine — `NewMovement → NewSystem →
//! InSystem → (DoneSystem | DoneMovement)` — deciding after each bar
//! whether the system has room for another bar, must break here, or (for
//! the last bar of the movement) the run is finished. Once a system's bar
//! set is fixed, `justify` stretches it to the page width by a
//! stretch-and-reconverge loop: stretching changes a bar's internal extras
//! (wider note spacing can force wider accidental columns), so the target
//! width is approached iteratively rather than solved for in one step.

use crate::domain::ids::BarIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    NewMovement,
    NewSystem,
    InSystem,
    DoneSystem,
    DoneMovement,
}

/// Maximum stretch-and-reconverge iterations (§4.5): past this the engine
/// accepts whatever residual error remains rather than looping forever on
/// a system whose extras keep shifting under stretch.
pub const MAX_JUSTIFY_ITERATIONS: u32 = 4;

/// Width reconverges once within this fraction of the target width.
const JUSTIFY_TOLERANCE: f64 = 0.001;

#[derive(Debug, Clone)]
pub struct System {
    pub bars: Vec<BarIndex>,
    pub natural_width: f64,
    /// Set when this system continues a tie/slur/beam from the system
    /// before it, so the breaker and the tie-geometry pass (§4.6) both know
    /// not to expect a fresh attack at the system's first note.
    pub continues_from_previous: bool,
}

pub struct Breaker {
    state: BreakerState,
    page_width: f64,
    current: System,
    systems: Vec<System>,
}

impl Breaker {
    pub fn new(page_width: f64) -> Self {
        Self {
            state: BreakerState::NewMovement,
            page_width,
            current: System {
                bars: Vec::new(),
                natural_width: 0.0,
                continues_from_previous: false,
            },
            systems: Vec::new(),
        }
    }

    pub fn state(&self) -> BreakerState {
        self.state
    }

    /// Feed one more bar's natural (unstretched) width into the state
    /// machine. Returns `true` if this bar started a new system (i.e. the
    /// previous system just broke).
    pub fn push_bar(&mut self, bar: BarIndex, width: f64, force_break: bool) -> bool {
        self.state = match self.state {
            BreakerState::NewMovement => BreakerState::NewSystem,
            BreakerState::DoneSystem => BreakerState::NewSystem,
            other => other,
        };

        let would_overflow = self.current.natural_width + width > self.page_width && !self.current.bars.is_empty();
        let started_new_system = if would_overflow || force_break && !self.current.bars.is_empty() {
            self.finish_system();
            true
        } else {
            false
        };

        self.current.bars.push(bar);
        self.current.natural_width += width;
        self.state = BreakerState::InSystem;
        started_new_system
    }

    fn finish_system(&mut self) {
        let finished = std::mem::replace(
            &mut self.current,
            System {
                bars: Vec::new(),
                natural_width: 0.0,
                continues_from_previous: false,
            },
        );
        self.systems.push(finished);
        self.state = BreakerState::DoneSystem;
    }

    /// Finalize the movement: flush whatever system is in progress.
    pub fn finish_movement(mut self) -> Vec<System> {
        if !self.current.bars.is_empty() {
            self.systems.push(self.current);
        }
        self.state = BreakerState::DoneMovement;
        self.systems
    }

    /// Mark the system that owns `bar` (by searching already-finished
    /// systems first, then the in-progress one) as a tie/slur/beam
    /// continuation from the previous system.
    pub fn setcont(&mut self, system_index: usize) {
        if let Some(system) = self.systems.get_mut(system_index) {
            system.continues_from_previous = true;
        } else if system_index == self.systems.len() {
            self.current.continues_from_previous = true;
        }
    }
}

/// Stretch-and-reconverge justification: given each bar's natural width and
/// a function recomputing natural widths under a stretch factor (since
/// wider note spacing can force wider accidental/underlay columns),
/// converge the total system width onto `target_width`.
pub fn justify<F>(natural_widths: &[f64], target_width: f64, mut recompute: F) -> Vec<f64>
where
    F: FnMut(&[f64], f64) -> Vec<f64>,
{
    let mut widths = natural_widths.to_vec();
    let mut scale = if widths.iter().sum::<f64>() > 0.0 {
        target_width / widths.iter().sum::<f64>()
    } else {
        1.0
    };

    for _ in 0..MAX_JUSTIFY_ITERATIONS {
        widths = recompute(natural_widths, scale);
        let total: f64 = widths.iter().sum();
        if total <= 0.0 {
            break;
        }
        let error = (target_width - total) / target_width;
        if error.abs() <= JUSTIFY_TOLERANCE {
            break;
        }
        scale *= target_width / total;
    }
    widths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breaker_starts_a_new_system_when_a_bar_would_overflow() {
        let mut breaker = Breaker::new(100.0);
        breaker.push_bar(BarIndex(0), 40.0, false);
        breaker.push_bar(BarIndex(1), 40.0, false);
        let started_new = breaker.push_bar(BarIndex(2), 40.0, false);
        assert!(started_new);
        let systems = breaker.finish_movement();
        assert_eq!(systems.len(), 2);
        assert_eq!(systems[0].bars.len(), 2);
        assert_eq!(systems[1].bars.len(), 1);
    }

    #[test]
    fn forced_break_starts_a_new_system_even_with_room_left() {
        let mut breaker = Breaker::new(1000.0);
        breaker.push_bar(BarIndex(0), 40.0, false);
        let started_new = breaker.push_bar(BarIndex(1), 40.0, true);
        assert!(started_new);
    }

    #[test]
    fn justify_converges_on_target_width_for_a_linear_model() {
        let natural = vec![10.0, 20.0, 30.0];
        let widths = justify(&natural, 120.0, |base, scale| base.iter().map(|w| w * scale).collect());
        let total: f64 = widths.iter().sum();
        assert!((total - 120.0).abs() < 0.5);
    }

    #[test]
    fn setcont_flags_an_already_finished_system() {
        let mut breaker = Breaker::new(50.0);
        breaker.push_bar(BarIndex(0), 40.0, false);
        breaker.push_bar(BarIndex(1), 40.0, false);
        breaker.setcont(0);
        let systems = breaker.finish_movement();
        assert!(systems[0].continues_from_previous);
    }
}
