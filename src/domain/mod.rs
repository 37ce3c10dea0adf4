// Domain layer: core models, wire bodies and ports (interfaces) shared by the pipeline stages.

pub mod model;
pub mod ports;
pub mod wire;
