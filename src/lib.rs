pub mod cli;
pub mod compositor;
pub mod config;
pub mod encoder;
pub mod export;
pub mod layout;
pub mod registry;
pub mod report;
pub mod session;
pub mod snapshot;

pub use session::{run, Session};

pub(crate) fn ceil_div(count: usize, columns: usize) -> usize {
    debug_assert!(columns > 0);
    count.div_ceil(columns)
}
