pub mod logging;
pub mod network;
