pub mod common;
pub mod domain;
pub mod engine;
pub mod numerics;
pub mod observation;
pub mod spectral;
pub mod timing;
