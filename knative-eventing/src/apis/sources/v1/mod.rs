mod sinkbinding;

pub use sinkbinding::{SinkBinding, SinkBindingSpec, SinkBindingStatus};
