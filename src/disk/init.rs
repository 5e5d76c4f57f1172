use log::debug;

use crate::{
    disk::{
        block_device::BlockDevice,
        memory_disk::Disk,
        types::{nil_int_block, BLOCK_SIZE},
    },
    fs::config::{BITMAP_BLOCK_ID, DATA_START_BLOCK_ID, DESCRIPTOR_START_BLOCK_ID},
};

/// 格式化一块新磁盘：
/// - 位图中 0..DATA_START_BLOCK_ID 标记为已占用
/// - 描述符表、目录块全部写成 -1（空槽）
/// - 数据块保持全 0，即 "未使用" 哨兵
pub fn format_disk() -> Disk {
    let mut disk = Disk::blank();

    let mut bitmap = [0u8; BLOCK_SIZE];
    bitmap[..DATA_START_BLOCK_ID].fill(1);
    disk.write_block(BITMAP_BLOCK_ID, &bitmap);

    let nil = nil_int_block();
    for block_id in DESCRIPTOR_START_BLOCK_ID..DATA_START_BLOCK_ID {
        disk.write_block(block_id, &nil);
    }

    debug!("formatted volume {}", disk.volume_id());
    disk
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::types::{decode_ints, NIL};

    #[test]
    fn fresh_disk_reserves_metadata_blocks() {
        let disk = format_disk();
        let mut buf = [0u8; BLOCK_SIZE];
        disk.read_block(BITMAP_BLOCK_ID, &mut buf);
        assert!(buf[..10].iter().all(|&b| b == 1));
        assert!(buf[10..].iter().all(|&b| b == 0));

        for block_id in 1..10 {
            disk.read_block(block_id, &mut buf);
            assert!(decode_ints(&buf).iter().all(|&v| v == NIL));
        }
        disk.read_block(DATA_START_BLOCK_ID, &mut buf);
        assert!(buf.iter().all(|&b| b == 0));
    }
}
