pub mod cfg;

pub use cfg::Cfg;
