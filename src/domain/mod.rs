// Domain layer: upstream records and the ports the table is written against.

pub mod model;
pub mod ports;
