use std::fmt;

use crate::{
    disk::{
        types::{decode_ints, encode_ints, IntBlock, NIL},
        Block, BlockDevice, BLOCK_SIZE,
    },
    fs::{
        config::{
            DIRECTORY_BLOCKS, DIRECTORY_START_BLOCK_ID, MAX_NAME_LEN, TOTAL_DIR_ENTRIES,
        },
        error::{FileSystemError, Result},
    },
};

/// 文件名：1~4 个可打印 ASCII 字节，大端打包成一个 i32
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileName(String);

impl FileName {
    pub fn parse(name: &str) -> Result<Self> {
        let valid = !name.is_empty()
            && name.len() <= MAX_NAME_LEN
            && name.bytes().all(|b| b.is_ascii_graphic());
        if !valid {
            return Err(FileSystemError::InvalidName(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    pub fn code(&self) -> i32 {
        self.0
            .bytes()
            .fold(0i32, |acc, b| (acc << 8) | b as i32)
    }

    pub fn from_code(code: i32) -> Self {
        let name = code
            .to_be_bytes()
            .iter()
            .skip_while(|&&b| b == 0)
            .map(|&b| b as char)
            .collect();
        Self(name)
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 一个非空目录项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: FileName,
    pub descriptor: usize,
}

/// 目录：块 7~9，每块 8 个 (name_code, descriptor) 整数对
pub struct Directory {
    start_block: usize,
    block_count: usize,
}

pub const DIRECTORY: Directory = Directory::new(DIRECTORY_START_BLOCK_ID, DIRECTORY_BLOCKS);

impl Directory {
    pub const fn new(start_block: usize, block_count: usize) -> Self {
        Self {
            start_block,
            block_count,
        }
    }

    fn block_ids(&self) -> std::ops::Range<usize> {
        self.start_block..self.start_block + self.block_count
    }

    fn read<D: BlockDevice>(disk: &D, block_id: usize) -> IntBlock {
        let mut block: Block = [0; BLOCK_SIZE];
        disk.read_block(block_id, &mut block);
        decode_ints(&block)
    }

    // 按块号、槽号顺序遍历所有槽位
    fn slots<D: BlockDevice>(&self, disk: &D) -> Vec<(usize, usize, Option<DirEntry>)> {
        let mut slots = Vec::with_capacity(TOTAL_DIR_ENTRIES);
        for block_id in self.block_ids() {
            let ints = Self::read(disk, block_id);
            for (slot, pair) in ints.chunks_exact(2).enumerate() {
                let entry = (pair[0] != NIL).then(|| DirEntry {
                    name: FileName::from_code(pair[0]),
                    descriptor: pair[1] as usize,
                });
                slots.push((block_id, slot, entry));
            }
        }
        slots
    }

    fn write_slot<D: BlockDevice>(disk: &mut D, block_id: usize, slot: usize, pair: [i32; 2]) {
        let mut ints = Self::read(disk, block_id);
        ints[slot * 2] = pair[0];
        ints[slot * 2 + 1] = pair[1];
        disk.write_block(block_id, &encode_ints(&ints));
    }

    pub fn lookup<D: BlockDevice>(&self, disk: &D, name: &FileName) -> Option<usize> {
        self.slots(disk)
            .into_iter()
            .filter_map(|(_, _, entry)| entry)
            .find(|entry| entry.name == *name)
            .map(|entry| entry.descriptor)
    }

    pub fn insert<D: BlockDevice>(
        &self,
        disk: &mut D,
        name: &FileName,
        descriptor: usize,
    ) -> Result<()> {
        let (block_id, slot, _) = self
            .slots(disk)
            .into_iter()
            .find(|(_, _, entry)| entry.is_none())
            .ok_or(FileSystemError::DirectoryFull)?;
        Self::write_slot(disk, block_id, slot, [name.code(), descriptor as i32]);
        Ok(())
    }

    /// 清空匹配的槽位，返回其描述符下标
    pub fn remove<D: BlockDevice>(&self, disk: &mut D, name: &FileName) -> Option<usize> {
        let (block_id, slot, entry) = self
            .slots(disk)
            .into_iter()
            .find(|(_, _, entry)| matches!(entry, Some(e) if e.name == *name))?;
        Self::write_slot(disk, block_id, slot, [NIL, NIL]);
        entry.map(|e| e.descriptor)
    }

    pub fn list<D: BlockDevice>(&self, disk: &D) -> Vec<DirEntry> {
        self.slots(disk)
            .into_iter()
            .filter_map(|(_, _, entry)| entry)
            .collect()
    }
}
