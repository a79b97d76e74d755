//! Ports: the abstraction layer between the polling core and its
//! collaborators.
//!
//! Each trait hides one external system (the subject registry, the
//! reference source, the host scheduler, the push gateway) so the core can
//! be exercised against in-memory fakes and the adapters in `impls` can be
//! swapped per host.

pub mod clock;
pub mod lookup;
pub mod push;
pub mod store;
pub mod wake;

pub use clock::{Clock, FixedClock, SystemClock};
pub use lookup::ReferenceLookup;
pub use push::{PushNote, PushSender};
pub use store::SubjectStore;
pub use wake::{UnsupportedWake, WakeRequester};
