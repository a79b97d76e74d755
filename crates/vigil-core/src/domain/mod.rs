//! Domain model (ids, subjects, cadence, cycle results, events).

pub mod cadence;
pub mod cycle;
pub mod events;
pub mod ids;
pub mod subject;

pub use cadence::{Cadence, ParseCadenceError};
pub use cycle::CycleResult;
pub use events::{CycleCompleted, DeceasedDetected};
pub use ids::{CycleId, SubjectId};
pub use subject::Subject;
