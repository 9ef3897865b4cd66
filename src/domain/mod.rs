// Domain layer: procedure records, artifacts and the adapter/storage ports.

pub mod model;
pub mod ports;
