pub mod catalog;
pub mod operators;
pub mod dynamics;
pub mod campaign;
pub mod relative_loss;
pub mod main_execs;
mod error;

pub use catalog::{Catalog, CountryInfo};
pub use operators::{DomainVector, FlowVector, NetworkOperators, RawOperators, Triplets};
pub use dynamics::DEFAULT_TAU;
pub use campaign::{Campaign, CampaignResult};
pub use relative_loss::{relative_loss, RegionExclusion, RelativeLoss};
pub use error::ModelError;
