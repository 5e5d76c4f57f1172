/// 每个逻辑块（Block）的大小：64 字节
pub const BLOCK_SIZE: usize = 64;

/// 磁盘中包含的块总数
pub const BLOCK_COUNT: usize = 64;

/// 虚拟磁盘总大小（单位：字节）
pub const DISK_SIZE: usize = BLOCK_SIZE * BLOCK_COUNT;

/// 整数块中每个整数占用的字节数
pub const INT_SIZE: usize = 4;

/// 一个整数块可容纳的整数个数
pub const INTS_PER_BLOCK: usize = BLOCK_SIZE / INT_SIZE;

/// 一个逻辑块，所有磁盘读写都以 Block 为单位进行。
pub type Block = [u8; BLOCK_SIZE];

/// 按 16 个小端 i32 解释的块（描述符表、目录使用）
pub type IntBlock = [i32; INTS_PER_BLOCK];

/// 空槽 / 未分配指针在磁盘上的编码
pub const NIL: i32 = -1;

pub fn decode_ints(block: &Block) -> IntBlock {
    let mut ints = [0i32; INTS_PER_BLOCK];
    for (i, chunk) in block.chunks_exact(INT_SIZE).enumerate() {
        let mut bytes = [0u8; INT_SIZE];
        bytes.copy_from_slice(chunk);
        ints[i] = i32::from_le_bytes(bytes);
    }
    ints
}

pub fn encode_ints(ints: &IntBlock) -> Block {
    let mut block = [0u8; BLOCK_SIZE];
    for (chunk, value) in block.chunks_exact_mut(INT_SIZE).zip(ints.iter()) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
    block
}

/// 全部为 NIL 的整数块
pub fn nil_int_block() -> Block {
    encode_ints(&[NIL; INTS_PER_BLOCK])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_block_keeps_negative_values() {
        let mut ints = [NIL; INTS_PER_BLOCK];
        ints[0] = 192;
        ints[5] = 63;
        let block = encode_ints(&ints);
        assert_eq!(&block[..4], &192i32.to_le_bytes());
        assert_eq!(decode_ints(&block), ints);
    }

    #[test]
    fn nil_block_is_all_ones() {
        assert!(nil_int_block().iter().all(|&b| b == 0xFF));
    }
}
