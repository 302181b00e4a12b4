pub mod calibration;
pub mod events;
pub mod gestures;
pub mod motion;
pub mod sequences;
pub mod settings;
pub mod status;
