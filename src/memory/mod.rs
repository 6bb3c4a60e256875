// Mon Oct 12 2026 - Alex

pub mod address;
pub mod arch;
pub mod error;
pub mod fault;
pub mod guard;
pub mod maps;
pub mod probe;
pub mod protection;
pub mod range;
pub mod region;
pub mod traits;

pub use address::{Address, WORD_SIZE};
pub use error::MemoryError;
pub use fault::FaultKind;
pub use guard::{fault_dispositions, guard_phase, guard_stats, GuardPhase, GuardStats, SignalDisposition};
pub use maps::{parse_maps, self_regions, MappingSizer};
pub use probe::{probe, FaultGuardedProber, ProbeOutcome, DEFAULT_MAX_PROBE_LEN};
pub use protection::Protection;
pub use range::MemoryRange;
pub use region::MemoryRegion;
pub use traits::MemoryProbe;
