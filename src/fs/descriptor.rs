use log::debug;

use crate::{
    disk::{
        types::{decode_ints, encode_ints, NIL},
        Block, BlockDevice, BLOCK_SIZE,
    },
    fs::{
        bitmap::BITMAP,
        config::{
            BLOCKS_PER_FILE, DESCRIPTORS_PER_BLOCK, DESCRIPTOR_INTS, DESCRIPTOR_START_BLOCK_ID,
            TOTAL_DESCRIPTORS,
        },
        error::{FileSystemError, Result},
    },
};

/// 一个已占用的文件描述符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Descriptor {
    pub length: usize,                         // 已使用的字节数
    pub blocks: [Option<usize>; BLOCKS_PER_FILE], // 数据块指针
}

impl Descriptor {
    fn decode(ints: &[i32]) -> Option<Self> {
        if ints[0] == NIL {
            return None;
        }
        let mut blocks = [None; BLOCKS_PER_FILE];
        for (slot, &raw) in blocks.iter_mut().zip(&ints[1..]) {
            *slot = (raw != NIL).then_some(raw as usize);
        }
        Some(Self {
            length: ints[0] as usize,
            blocks,
        })
    }

    fn encode(slot: Option<&Self>, out: &mut [i32]) {
        match slot {
            None => out.fill(NIL),
            Some(desc) => {
                out[0] = desc.length as i32;
                for (raw, block) in out[1..].iter_mut().zip(desc.blocks.iter()) {
                    *raw = block.map_or(NIL, |b| b as i32);
                }
            }
        }
    }

    pub fn allocated_blocks(&self) -> impl Iterator<Item = usize> + '_ {
        self.blocks.iter().flatten().copied()
    }
}

/// 描述符表：描述符 i 位于块 i / 4 + 1 的第 i % 4 个槽
pub struct DescriptorTable {
    start_block: usize,
    total: usize,
}

pub const DESCRIPTORS: DescriptorTable =
    DescriptorTable::new(DESCRIPTOR_START_BLOCK_ID, TOTAL_DESCRIPTORS);

impl DescriptorTable {
    pub const fn new(start_block: usize, total: usize) -> Self {
        Self { start_block, total }
    }

    fn locate(&self, index: usize) -> (usize, usize) {
        assert!(index < self.total, "descriptor {} out of range", index);
        (
            self.start_block + index / DESCRIPTORS_PER_BLOCK,
            (index % DESCRIPTORS_PER_BLOCK) * DESCRIPTOR_INTS,
        )
    }

    pub fn get<D: BlockDevice>(&self, disk: &D, index: usize) -> Option<Descriptor> {
        let (block_id, offset) = self.locate(index);
        let mut block: Block = [0; BLOCK_SIZE];
        disk.read_block(block_id, &mut block);
        let ints = decode_ints(&block);
        Descriptor::decode(&ints[offset..offset + DESCRIPTOR_INTS])
    }

    pub fn put<D: BlockDevice>(&self, disk: &mut D, index: usize, slot: Option<&Descriptor>) {
        let (block_id, offset) = self.locate(index);
        let mut block: Block = [0; BLOCK_SIZE];
        disk.read_block(block_id, &mut block);
        let mut ints = decode_ints(&block);
        Descriptor::encode(slot, &mut ints[offset..offset + DESCRIPTOR_INTS]);
        disk.write_block(block_id, &encode_ints(&ints));
    }

    /// 已占用的描述符；对空槽的访问是调用方的契约错误
    fn get_used<D: BlockDevice>(&self, disk: &D, index: usize) -> Descriptor {
        self.get(disk, index)
            .unwrap_or_else(|| panic!("descriptor {} is free", index))
    }

    /// 线性扫描找到第一个空槽，length 置 0 后返回其下标
    pub fn allocate<D: BlockDevice>(&self, disk: &mut D) -> Result<usize> {
        let index = (0..self.total)
            .find(|&i| self.get(disk, i).is_none())
            .ok_or(FileSystemError::NoFreeDescriptor)?;
        self.put(disk, index, Some(&Descriptor::default()));
        debug!("allocated descriptor {}", index);
        Ok(index)
    }

    /// 释放描述符及其引用的全部数据块
    pub fn free<D: BlockDevice>(&self, disk: &mut D, index: usize) {
        if let Some(desc) = self.get(disk, index) {
            for block_id in desc.allocated_blocks() {
                BITMAP.free(disk, block_id);
            }
        }
        self.put(disk, index, None);
        debug!("freed descriptor {}", index);
    }

    pub fn length<D: BlockDevice>(&self, disk: &D, index: usize) -> usize {
        self.get_used(disk, index).length
    }

    pub fn set_length<D: BlockDevice>(&self, disk: &mut D, index: usize, length: usize) {
        let mut desc = self.get_used(disk, index);
        desc.length = length;
        self.put(disk, index, Some(&desc));
    }

    pub fn data_block<D: BlockDevice>(&self, disk: &D, index: usize, n: usize) -> Option<usize> {
        self.get_used(disk, index).blocks[n]
    }

    pub fn set_data_block<D: BlockDevice>(
        &self,
        disk: &mut D,
        index: usize,
        n: usize,
        block_id: Option<usize>,
    ) {
        let mut desc = self.get_used(disk, index);
        desc.blocks[n] = block_id;
        self.put(disk, index, Some(&desc));
    }
}
