// Hardware-plugin inventory API: resource pools and resources exposed by
// each registered hardware-management plugin.

pub mod client;
pub mod types;

pub use client::InventoryClient;
pub use types::{ProcessorInfo, ResourceInfo, ResourcePoolInfo};
