// invsync-api: Async clients for the hub list/watch API and hardware-plugin inventory

pub mod error;
pub mod hwplugin;
pub mod kube;
pub mod reflector;
pub mod transport;

pub use error::Error;
