pub mod dedupe;
pub mod filter;
pub mod harvester;
pub mod stats;

pub use dedupe::{dedupe, DeduplicatedSet};
pub use filter::{filter_new, NewRecordSet};
pub use harvester::{HarvestReport, Harvester, RunOutcome};
pub use stats::HarvestStats;
