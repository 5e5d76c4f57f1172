pub mod block_device;
pub mod image;
pub mod init;
pub mod memory_disk;
pub mod store;
pub mod types;

pub use block_device::BlockDevice;
pub use image::DiskImage;
pub use init::format_disk;
pub use memory_disk::Disk;
pub use store::{DiskStore, FileDiskStore, MemoryDiskStore};
pub use types::{Block, BLOCK_COUNT, BLOCK_SIZE};
