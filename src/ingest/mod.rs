/// Reference data acquisition.
///
/// A `ReferenceSource` produces the latest reference sample for each region
/// it knows about. The `ReferenceStore` calls it on refresh and swaps the
/// whole result in at once; regions missing from the result simply have no
/// reference data until the next refresh.
///
/// - `fixtures`: fixed CPCB-pattern samples (the default source)
/// - `ogd`: Open Government Data API client (network-backed)

pub mod fixtures;
pub mod ogd;

use std::collections::HashMap;

use crate::error::ReferenceError;
use crate::model::ReferenceSample;

/// Fetches reference samples keyed by region name.
pub trait ReferenceSource: Send + Sync {
    fn fetch(&self) -> Result<HashMap<String, ReferenceSample>, ReferenceError>;

    /// Short name used in log output.
    fn name(&self) -> &str;
}
