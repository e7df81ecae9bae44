// Domain layer: portfolio models and ports (interfaces).

pub mod model;
pub mod ports;
