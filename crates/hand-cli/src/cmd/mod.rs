pub mod check;
pub mod gesture;
pub mod ports;
pub mod sequence;
pub mod serve;
