use crate::{
    disk::{
        block_device::BlockDevice,
        types::{Block, BLOCK_COUNT, BLOCK_SIZE},
    },
    utils::generate_uuid,
};

/// 驻留内存的虚拟磁盘：BLOCK_COUNT 个定长块
#[derive(Debug, Clone)]
pub struct Disk {
    volume_id: String, // 卷标识，格式化时生成
    blocks: Vec<Block>,
}

impl Disk {
    /// 全零的空白磁盘，尚未格式化
    pub fn blank() -> Self {
        Self::with_blocks(generate_uuid(), vec![[0u8; BLOCK_SIZE]; BLOCK_COUNT])
    }

    pub(crate) fn with_blocks(volume_id: String, blocks: Vec<Block>) -> Self {
        assert_eq!(blocks.len(), BLOCK_COUNT, "disk must hold {} blocks", BLOCK_COUNT);
        Self { volume_id, blocks }
    }

    pub fn volume_id(&self) -> &str {
        &self.volume_id
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }
}

impl BlockDevice for Disk {
    fn read_block(&self, block_id: usize, buf: &mut Block) {
        assert!(block_id < BLOCK_COUNT, "block {} out of range", block_id);
        buf.copy_from_slice(&self.blocks[block_id]);
    }

    fn write_block(&mut self, block_id: usize, buf: &Block) {
        assert!(block_id < BLOCK_COUNT, "block {} out of range", block_id);
        self.blocks[block_id].copy_from_slice(buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_block() {
        let mut disk = Disk::blank();
        let mut block = [0u8; BLOCK_SIZE];
        block[3] = b'z';
        disk.write_block(42, &block);

        let mut buf = [0u8; BLOCK_SIZE];
        disk.read_block(42, &mut buf);
        assert_eq!(buf, block);
        disk.read_block(41, &mut buf);
        assert_eq!(buf, [0u8; BLOCK_SIZE]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_block_panics() {
        let disk = Disk::blank();
        let mut buf = [0u8; BLOCK_SIZE];
        disk.read_block(BLOCK_COUNT, &mut buf);
    }

    #[test]
    fn blank_disks_get_distinct_volume_ids() {
        assert_ne!(Disk::blank().volume_id(), Disk::blank().volume_id());
    }
}
