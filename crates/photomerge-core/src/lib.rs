pub mod accumulator;
pub mod align;
pub mod avg;
pub mod consts;
pub mod error;
pub mod frame;
pub mod ghost;
pub mod hdr;
pub mod histogram;
pub mod pipeline;
pub mod response;
pub mod tonemap;

mod parallel;
