use std::collections::HashSet;

use log::debug;

use crate::disk::{
    types::{decode_ints, IntBlock, NIL},
    Block, BlockDevice, BLOCK_COUNT, BLOCK_SIZE,
};
use crate::fs::{
    config::{
        BITMAP_BLOCK_ID, BLOCKS_PER_FILE, DATA_START_BLOCK_ID, DESCRIPTORS_PER_BLOCK,
        DESCRIPTOR_BLOCKS, DESCRIPTOR_INTS, DESCRIPTOR_START_BLOCK_ID, DIRECTORY_BLOCKS,
        DIRECTORY_START_BLOCK_ID, MAX_FILE_SIZE, TOTAL_DESCRIPTORS,
    },
    directory::FileName,
    error::{FileSystemError, Result},
};

fn corrupt(reason: String) -> FileSystemError {
    FileSystemError::PersistFailed(format!("inconsistent disk image: {}", reason))
}

fn read_ints<D: BlockDevice>(disk: &D, block_id: usize) -> IntBlock {
    let mut block: Block = [0; BLOCK_SIZE];
    disk.read_block(block_id, &mut block);
    decode_ints(&block)
}

/// 挂载前的一致性检查：位图、描述符表、目录三者必须互相吻合，
/// 否则后续操作会在越界的块号或下标上 panic
pub fn check_disk<D: BlockDevice>(disk: &D) -> Result<()> {
    let mut bitmap: Block = [0; BLOCK_SIZE];
    disk.read_block(BITMAP_BLOCK_ID, &mut bitmap);
    if let Some(block_id) = bitmap.iter().position(|&flag| flag > 1) {
        return Err(corrupt(format!("bitmap flag of block {} is not 0/1", block_id)));
    }
    if let Some(block_id) = (0..DATA_START_BLOCK_ID).find(|&id| bitmap[id] != 1) {
        return Err(corrupt(format!("reserved block {} marked free", block_id)));
    }

    // 描述符：空槽全为 NIL；占用槽长度合法，指针指向数据区且前缀连续
    let mut used_descriptors = [false; TOTAL_DESCRIPTORS];
    let mut referenced = HashSet::new();
    for block_offset in 0..DESCRIPTOR_BLOCKS {
        let ints = read_ints(disk, DESCRIPTOR_START_BLOCK_ID + block_offset);
        for (slot, raw) in ints.chunks_exact(DESCRIPTOR_INTS).enumerate() {
            let index = block_offset * DESCRIPTORS_PER_BLOCK + slot;
            if raw[0] == NIL {
                if raw[1..].iter().any(|&p| p != NIL) {
                    return Err(corrupt(format!("free descriptor {} has block pointers", index)));
                }
                continue;
            }
            if raw[0] < 0 || raw[0] as usize > MAX_FILE_SIZE {
                return Err(corrupt(format!("descriptor {} has length {}", index, raw[0])));
            }
            let pointers = &raw[1..1 + BLOCKS_PER_FILE];
            let leading = pointers.iter().take_while(|&&p| p != NIL).count();
            if pointers[leading..].iter().any(|&p| p != NIL) {
                return Err(corrupt(format!("descriptor {} has a pointer gap", index)));
            }
            if raw[0] as usize > leading * BLOCK_SIZE {
                return Err(corrupt(format!(
                    "descriptor {} length {} exceeds its blocks",
                    index, raw[0]
                )));
            }
            for &pointer in &pointers[..leading] {
                let in_data_area = pointer >= DATA_START_BLOCK_ID as i32
                    && (pointer as usize) < BLOCK_COUNT;
                if !in_data_area {
                    return Err(corrupt(format!(
                        "descriptor {} points at block {}",
                        index, pointer
                    )));
                }
                if !referenced.insert(pointer as usize) {
                    return Err(corrupt(format!("block {} is shared", pointer)));
                }
            }
            used_descriptors[index] = true;
        }
    }

    if let Some(block_id) = (DATA_START_BLOCK_ID..BLOCK_COUNT)
        .find(|id| (bitmap[*id] == 1) != referenced.contains(id))
    {
        return Err(corrupt(format!(
            "bitmap disagrees with descriptors at block {}",
            block_id
        )));
    }

    // 目录：名字合法且不重复，指向已占用的描述符，每个描述符至多一个名字
    let mut names = HashSet::new();
    let mut named = [false; TOTAL_DESCRIPTORS];
    for block_id in DIRECTORY_START_BLOCK_ID..DIRECTORY_START_BLOCK_ID + DIRECTORY_BLOCKS {
        for pair in read_ints(disk, block_id).chunks_exact(2) {
            if pair[0] == NIL {
                continue;
            }
            let name = FileName::parse(&FileName::from_code(pair[0]).to_string())
                .map_err(|_| corrupt(format!("directory name code {:#x} is invalid", pair[0])))?;
            let descriptor = usize::try_from(pair[1])
                .ok()
                .filter(|&d| d < TOTAL_DESCRIPTORS && used_descriptors[d])
                .ok_or_else(|| {
                    corrupt(format!("entry <{}> refers to descriptor {}", name, pair[1]))
                })?;
            if named[descriptor] {
                return Err(corrupt(format!("descriptor {} has two names", descriptor)));
            }
            named[descriptor] = true;
            if !names.insert(name.to_string()) {
                return Err(corrupt(format!("duplicate entry <{}>", name)));
            }
        }
    }

    debug!(
        "disk check passed: {} files, {} data blocks in use",
        names.len(),
        referenced.len()
    );
    Ok(())
}
