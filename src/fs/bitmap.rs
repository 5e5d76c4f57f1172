use log::debug;

use crate::{
    disk::{Block, BlockDevice, BLOCK_SIZE},
    fs::{
        config::{BITMAP_BLOCK_ID, DATA_START_BLOCK_ID},
        error::{FileSystemError, Result},
    },
};

/// 块位图：位图块中每个字节对应一个块，1 = 已分配，0 = 空闲
pub struct Bitmap {
    block_id: usize, // 位图所在块号
    first_allocatable: usize,
}

/// 整个卷唯一的位图
pub const BITMAP: Bitmap = Bitmap::new(BITMAP_BLOCK_ID, DATA_START_BLOCK_ID);

impl Bitmap {
    pub const fn new(block_id: usize, first_allocatable: usize) -> Self {
        Self {
            block_id,
            first_allocatable,
        }
    }

    fn load<D: BlockDevice>(&self, disk: &D) -> Block {
        let mut bits: Block = [0; BLOCK_SIZE];
        disk.read_block(self.block_id, &mut bits);
        bits
    }

    // 首次适配：从 0 号开始线性扫描，返回第一个空闲块
    pub fn find_free_block<D: BlockDevice>(&self, disk: &D) -> Option<usize> {
        self.load(disk).iter().position(|&flag| flag == 0)
    }

    pub fn is_allocated<D: BlockDevice>(&self, disk: &D, block_id: usize) -> bool {
        self.load(disk)[block_id] != 0
    }

    pub fn set_allocated<D: BlockDevice>(&self, disk: &mut D, block_id: usize, allocated: bool) {
        debug_assert!(
            block_id >= self.first_allocatable,
            "block {} is reserved",
            block_id
        );
        let mut bits = self.load(disk);
        bits[block_id] = allocated as u8;
        disk.write_block(self.block_id, &bits);
    }

    /// 分配一个数据块，并把它的内容清成 "未使用" 哨兵
    pub fn alloc<D: BlockDevice>(&self, disk: &mut D) -> Result<usize> {
        let block_id = self
            .find_free_block(disk)
            .ok_or(FileSystemError::NoFreeBlock)?;
        self.set_allocated(disk, block_id, true);
        disk.write_block(block_id, &[0; BLOCK_SIZE]);
        debug!(
            "allocated data block {} ({} left)",
            block_id,
            self.free_count(disk)
        );
        Ok(block_id)
    }

    pub fn free<D: BlockDevice>(&self, disk: &mut D, block_id: usize) {
        debug_assert!(self.is_allocated(disk, block_id), "double free of {}", block_id);
        self.set_allocated(disk, block_id, false);
        debug!("freed data block {}", block_id);
    }

    pub fn free_count<D: BlockDevice>(&self, disk: &D) -> usize {
        self.load(disk).iter().filter(|&&flag| flag == 0).count()
    }
}
