use crate::disk::types::Block;

/// 按块号读写的块设备。块号越界属于调用方的契约错误，直接 panic。
pub trait BlockDevice {
    fn read_block(&self, block_id: usize, buf: &mut Block);
    fn write_block(&mut self, block_id: usize, buf: &Block);
}
