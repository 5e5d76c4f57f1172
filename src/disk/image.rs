use serde::{Deserialize, Serialize};

use crate::{
    disk::{
        memory_disk::Disk,
        types::{Block, BLOCK_COUNT, BLOCK_SIZE, DISK_SIZE},
    },
    fs::error::{FileSystemError, Result},
    utils::current_timestamp,
};

/// 魔数，用于识别磁盘镜像
pub const IMAGE_MAGIC: u64 = 0xB10C_F5F5;

/// 持久化到 DiskStore 的磁盘镜像
#[derive(Debug, Serialize, Deserialize)]
pub struct DiskImage {
    pub magic: u64,
    pub volume_id: String,
    pub saved_at: u64, // Unix 时间戳（秒）
    pub blocks: Vec<u8>, // BLOCK_COUNT * BLOCK_SIZE 字节，按块号顺序扁平化存储
}

impl DiskImage {
    pub fn capture(disk: &Disk) -> Self {
        Self {
            magic: IMAGE_MAGIC,
            volume_id: disk.volume_id().to_string(),
            saved_at: current_timestamp(),
            blocks: disk.blocks().concat(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let image: DiskImage = bincode::deserialize(bytes)?;
        if image.magic != IMAGE_MAGIC {
            return Err(FileSystemError::PersistFailed(format!(
                "bad image magic {:#x}",
                image.magic
            )));
        }
        if image.blocks.len() != DISK_SIZE {
            return Err(FileSystemError::PersistFailed(format!(
                "image holds {} bytes, expected {}",
                image.blocks.len(),
                DISK_SIZE
            )));
        }
        Ok(image)
    }

    pub fn into_disk(self) -> Disk {
        let blocks = self
            .blocks
            .chunks_exact(BLOCK_SIZE)
            .map(|chunk| {
                let mut block: Block = [0; BLOCK_SIZE];
                block.copy_from_slice(chunk);
                block
            })
            .collect::<Vec<_>>();
        debug_assert_eq!(blocks.len(), BLOCK_COUNT);
        Disk::with_blocks(self.volume_id, blocks)
    }
}
