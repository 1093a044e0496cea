// Domain layer: catalog/plan models and the ports (collaborator interfaces).
// No I/O here.

pub mod model;
pub mod plan;
pub mod ports;
pub mod report;
