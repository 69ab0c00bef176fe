pub mod inflate;
pub mod png;
pub mod unfilter;
