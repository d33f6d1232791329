pub mod picture;
pub mod ports;
pub mod service;
pub mod timestamp;
pub mod validation;
