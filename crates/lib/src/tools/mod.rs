//! Tools the model can call: static clinic knowledge (prices, address, opening hours).

mod clinic;

pub use clinic::{
    ClinicToolbox, Hours, KnowledgeProvider, Location, Prices, UNAVAILABLE_TOOL_REPLY,
};
