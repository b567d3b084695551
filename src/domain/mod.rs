// Domain layer: records, request configuration and the ports the pipeline is built on.

pub mod model;
pub mod ports;
