//! Daily routines: named, timed habits checked off each day.

pub mod model;
pub mod panel;

pub use model::{NewRoutine, Routine};
pub use panel::RoutinePanel;
