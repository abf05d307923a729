mod datastream;
mod deployment;
mod feature_of_interest;
mod observation;
mod observed_property;
mod procedure;
mod result;
mod system;

pub use datastream::*;
pub use deployment::*;
pub use feature_of_interest::*;
pub use observation::*;
pub use observed_property::*;
pub use procedure::*;
pub use result::*;
pub use system::*;
