pub mod entity;
pub mod geom;
pub mod physics;
pub mod playback;
pub mod recorder;
pub mod rules;
pub mod tile;
