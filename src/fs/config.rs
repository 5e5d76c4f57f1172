use crate::disk::BLOCK_SIZE;

pub const BITMAP_BLOCK_ID: usize = 0;
pub const DESCRIPTOR_START_BLOCK_ID: usize = 1;
pub const DESCRIPTOR_BLOCKS: usize = 6;
pub const DIRECTORY_START_BLOCK_ID: usize = DESCRIPTOR_START_BLOCK_ID + DESCRIPTOR_BLOCKS;
pub const DIRECTORY_BLOCKS: usize = 3;

// 数据区的起始块号，之前的块在格式化时即被保留
pub const DATA_START_BLOCK_ID: usize = DIRECTORY_START_BLOCK_ID + DIRECTORY_BLOCKS;

// 每个描述符 4 个整数：[length, block1, block2, block3]
pub const DESCRIPTOR_INTS: usize = 4;
pub const DESCRIPTORS_PER_BLOCK: usize = 4;
pub const TOTAL_DESCRIPTORS: usize = DESCRIPTOR_BLOCKS * DESCRIPTORS_PER_BLOCK;

// 目录项是 (name_code, descriptor) 整数对
pub const DIR_ENTRIES_PER_BLOCK: usize = 8;
pub const TOTAL_DIR_ENTRIES: usize = DIRECTORY_BLOCKS * DIR_ENTRIES_PER_BLOCK;

/// 文件名最多 4 个 ASCII 字节，正好装进一个 i32
pub const MAX_NAME_LEN: usize = 4;

pub const BLOCKS_PER_FILE: usize = DESCRIPTOR_INTS - 1;
pub const MAX_FILE_SIZE: usize = BLOCKS_PER_FILE * BLOCK_SIZE;

/// 打开文件表的容量，满了直接报错，不做淘汰
pub const OFT_CAPACITY: usize = 4;
