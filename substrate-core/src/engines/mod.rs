pub mod anchor;
pub mod hashline;
pub mod multi;
pub mod patch;
pub mod suggest;
