// Analysis results: canonical shapes, the normalizing builder, and score bands.
// The builder is the only place that reads raw payload field names.

pub mod band;
pub mod builder;
pub mod model;
