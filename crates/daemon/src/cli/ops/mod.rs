pub mod config;
pub mod mv;

pub use config::ShowConfig;
pub use mv::Mv;
