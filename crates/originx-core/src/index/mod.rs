//! Secondary index of version briefs.

mod brief_index;

pub use brief_index::{BriefIndex, IndexRead};
