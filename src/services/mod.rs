pub mod atomic;
pub mod audio;
pub mod dataset;
pub mod encoding;
pub mod join;
pub mod normalize;
pub mod pipeline;
pub mod qa;
pub mod resolve;
pub mod settings;
pub mod source;
pub mod translation;
