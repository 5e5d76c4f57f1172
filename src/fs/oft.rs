use std::num::NonZeroU8;

use log::debug;

use crate::{
    disk::{Block, BlockDevice, BLOCK_SIZE},
    fs::{
        bitmap::BITMAP,
        config::{BLOCKS_PER_FILE, MAX_FILE_SIZE, OFT_CAPACITY},
        descriptor::DESCRIPTORS,
        error::{FileSystemError, Result},
    },
};

/// 数据块中的 "未使用" 哨兵；写入的字节都是 NonZeroU8，不会与之冲突
pub const UNUSED_BYTE: u8 = 0;

/// 打开文件表中的一项：游标 + 一个驻留缓冲块
#[derive(Debug, Clone)]
pub struct OpenFile {
    descriptor: usize,
    position: usize,
    buffer: Block,
    resident: usize, // 缓冲区对应文件内第几个数据块（0..BLOCKS_PER_FILE）
    dirty: bool,
    modified: bool, // 打开以来是否写过
}

impl OpenFile {
    /// 打开描述符：游标置 0，首个数据块不存在时分配一个，并载入缓冲区
    pub fn open<D: BlockDevice>(disk: &mut D, descriptor: usize) -> Result<Self> {
        let block_id = Self::backing_block(disk, descriptor, 0, true)?
            .ok_or(FileSystemError::NoFreeBlock)?;
        let mut buffer: Block = [UNUSED_BYTE; BLOCK_SIZE];
        disk.read_block(block_id, &mut buffer);
        Ok(Self {
            descriptor,
            position: 0,
            buffer,
            resident: 0,
            dirty: false,
            modified: false,
        })
    }

    pub fn descriptor(&self) -> usize {
        self.descriptor
    }

    pub fn position(&self) -> usize {
        self.position
    }

    // 文件内第 n 个数据块对应的磁盘块号，allocate 为真时按需分配并记入描述符
    fn backing_block<D: BlockDevice>(
        disk: &mut D,
        descriptor: usize,
        n: usize,
        allocate: bool,
    ) -> Result<Option<usize>> {
        if let Some(block_id) = DESCRIPTORS.data_block(disk, descriptor, n) {
            return Ok(Some(block_id));
        }
        if !allocate {
            return Ok(None);
        }
        let block_id = BITMAP.alloc(disk)?;
        DESCRIPTORS.set_data_block(disk, descriptor, n, Some(block_id));
        Ok(Some(block_id))
    }

    fn flush<D: BlockDevice>(&mut self, disk: &mut D) {
        if !self.dirty {
            return;
        }
        if let Some(block_id) = DESCRIPTORS.data_block(disk, self.descriptor, self.resident) {
            disk.write_block(block_id, &self.buffer);
            debug!(
                "flushed block {} of descriptor {} to {}",
                self.resident, self.descriptor, block_id
            );
        }
        self.dirty = false;
    }

    /// 让文件内第 n 块驻留在缓冲区。块未分配且不允许分配时返回 false，状态不变。
    fn make_resident<D: BlockDevice>(
        &mut self,
        disk: &mut D,
        n: usize,
        allocate: bool,
    ) -> Result<bool> {
        if n == self.resident {
            return Ok(true);
        }
        // 先拿到块号再刷盘，分配失败时缓冲区保持原样
        let Some(block_id) = Self::backing_block(disk, self.descriptor, n, allocate)? else {
            return Ok(false);
        };
        self.flush(disk);
        disk.read_block(block_id, &mut self.buffer);
        self.resident = n;
        debug!("loaded block {} of descriptor {}", n, self.descriptor);
        Ok(true)
    }

    /// 从当前位置读取最多 count 个字节，遇到文件末尾提前结束
    pub fn read<D: BlockDevice>(&mut self, disk: &mut D, count: usize) -> Result<Vec<u8>> {
        let length = DESCRIPTORS.length(disk, self.descriptor);
        let mut out = Vec::with_capacity(count.min(MAX_FILE_SIZE));
        for _ in 0..count {
            if self.position >= length {
                break;
            }
            if !self.make_resident(disk, self.position / BLOCK_SIZE, false)? {
                break;
            }
            out.push(self.buffer[self.position % BLOCK_SIZE]);
            self.position += 1;
        }
        Ok(out)
    }

    /// 从当前位置写入 count 个 byte，到达单文件上限即停止。
    ///
    /// 返回实际写入的字节数。中途磁盘写满时保留已写入部分；
    /// 一个字节都没写进去才返回 NoFreeBlock。
    pub fn write<D: BlockDevice>(
        &mut self,
        disk: &mut D,
        byte: NonZeroU8,
        count: usize,
    ) -> Result<usize> {
        let mut written = 0;
        let mut failure = None;
        while written < count && self.position < MAX_FILE_SIZE {
            if let Err(e) = self.make_resident(disk, self.position / BLOCK_SIZE, true) {
                failure = Some(e);
                break;
            }
            self.buffer[self.position % BLOCK_SIZE] = byte.get();
            self.dirty = true;
            self.modified = true;
            self.position += 1;
            written += 1;
        }
        self.update_length(disk);

        match failure {
            Some(e) if written == 0 => Err(e),
            _ => Ok(written),
        }
    }

    /// 移动游标；目标位置落在另一个已分配块时换入该块
    pub fn seek<D: BlockDevice>(&mut self, disk: &mut D, pos: usize) -> Result<()> {
        let length = DESCRIPTORS.length(disk, self.descriptor);
        if pos > length {
            return Err(FileSystemError::InvalidPosition(pos));
        }
        self.position = pos;
        if pos < MAX_FILE_SIZE {
            self.make_resident(disk, pos / BLOCK_SIZE, false)?;
        }
        Ok(())
    }

    /// 刷回缓冲区；写过才重新计算长度
    pub fn close<D: BlockDevice>(mut self, disk: &mut D) {
        self.flush(disk);
        if self.modified {
            self.update_length(disk);
        }
    }

    // 从头扫描已分配的数据块，统计到第一个哨兵为止的字节数
    fn update_length<D: BlockDevice>(&self, disk: &mut D) {
        let mut length = 0;
        let mut block: Block = [UNUSED_BYTE; BLOCK_SIZE];
        for n in 0..BLOCKS_PER_FILE {
            let Some(block_id) = DESCRIPTORS.data_block(disk, self.descriptor, n) else {
                break;
            };
            let contents = if n == self.resident {
                &self.buffer
            } else {
                disk.read_block(block_id, &mut block);
                &block
            };
            let used = contents
                .iter()
                .take_while(|&&b| b != UNUSED_BYTE)
                .count();
            length += used;
            if used < BLOCK_SIZE {
                break;
            }
        }
        DESCRIPTORS.set_length(disk, self.descriptor, length);
    }
}

/// 打开文件表，下标即对外的文件句柄
#[derive(Debug)]
pub struct OpenFileTable {
    entries: Vec<Option<OpenFile>>,
}

impl Default for OpenFileTable {
    fn default() -> Self {
        Self::new(OFT_CAPACITY)
    }
}

impl OpenFileTable {
    pub fn new(capacity: usize) -> Self {
        let mut entries = Vec::with_capacity(capacity);
        entries.resize_with(capacity, || None);
        Self { entries }
    }

    /// 最小的空闲下标
    pub fn free_slot(&self) -> Result<usize> {
        self.entries
            .iter()
            .position(Option::is_none)
            .ok_or(FileSystemError::OftExhausted)
    }

    pub fn install(&mut self, index: usize, file: OpenFile) {
        debug_assert!(self.entries[index].is_none());
        self.entries[index] = Some(file);
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut OpenFile> {
        self.entries
            .get_mut(index)
            .and_then(Option::as_mut)
            .ok_or(FileSystemError::InvalidHandle(index))
    }

    pub fn remove(&mut self, index: usize) -> Result<OpenFile> {
        self.entries
            .get_mut(index)
            .and_then(Option::take)
            .ok_or(FileSystemError::InvalidHandle(index))
    }

    /// 引用某个描述符的全部下标
    pub fn handles_of(&self, descriptor: usize) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| matches!(e, Some(f) if f.descriptor == descriptor))
            .map(|(i, _)| i)
            .collect()
    }

    /// 取出所有打开的文件，表被清空
    pub fn drain(&mut self) -> Vec<OpenFile> {
        self.entries.iter_mut().filter_map(Option::take).collect()
    }

    pub fn open_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::{format_disk, Disk};

    fn byte(b: u8) -> NonZeroU8 {
        NonZeroU8::new(b).unwrap()
    }

    fn new_file(disk: &mut Disk) -> Result<OpenFile> {
        let descriptor = DESCRIPTORS.allocate(disk)?;
        OpenFile::open(disk, descriptor)
    }

    #[test]
    fn open_allocates_first_block() -> Result<()> {
        let mut disk = format_disk();
        let file = new_file(&mut disk)?;
        assert_eq!(DESCRIPTORS.data_block(&disk, file.descriptor(), 0), Some(10));
        assert!(BITMAP.is_allocated(&disk, 10));
        assert_eq!(file.position(), 0);
        Ok(())
    }

    #[test]
    fn write_spanning_blocks_reads_back() -> Result<()> {
        let mut disk = format_disk();
        let mut file = new_file(&mut disk)?;
        assert_eq!(file.write(&mut disk, byte(b'x'), 70)?, 70);
        assert_eq!(DESCRIPTORS.length(&disk, file.descriptor()), 70);
        assert_eq!(
            DESCRIPTORS.get(&disk, file.descriptor()).map(|d| d.blocks),
            Some([Some(10), Some(11), None])
        );

        file.seek(&mut disk, 0)?;
        assert_eq!(file.read(&mut disk, 100)?, vec![b'x'; 70]);
        assert_eq!(file.position(), 70);
        Ok(())
    }

    #[test]
    fn write_stops_at_file_ceiling() -> Result<()> {
        let mut disk = format_disk();
        let mut file = new_file(&mut disk)?;
        assert_eq!(file.write(&mut disk, byte(b'y'), 500)?, MAX_FILE_SIZE);
        assert_eq!(file.write(&mut disk, byte(b'y'), 1)?, 0);
        assert_eq!(DESCRIPTORS.length(&disk, file.descriptor()), MAX_FILE_SIZE);
        assert_eq!(BITMAP.find_free_block(&disk), Some(13));
        Ok(())
    }

    #[test]
    fn exact_block_write_does_not_allocate_next_block() -> Result<()> {
        let mut disk = format_disk();
        let mut file = new_file(&mut disk)?;
        file.write(&mut disk, byte(b'a'), BLOCK_SIZE)?;
        assert_eq!(DESCRIPTORS.data_block(&disk, file.descriptor(), 1), None);
        Ok(())
    }

    #[test]
    fn seek_loads_covering_block() -> Result<()> {
        let mut disk = format_disk();
        let mut file = new_file(&mut disk)?;
        file.write(&mut disk, byte(b'a'), 64)?;
        file.write(&mut disk, byte(b'b'), 64)?;
        file.write(&mut disk, byte(b'c'), 10)?;

        file.seek(&mut disk, 70)?;
        assert_eq!(file.read(&mut disk, 2)?, b"bb");
        file.seek(&mut disk, 126)?;
        assert_eq!(file.read(&mut disk, 4)?, b"bbcc");
        file.seek(&mut disk, 1)?;
        assert_eq!(file.read(&mut disk, 1)?, b"a");
        Ok(())
    }

    #[test]
    fn seek_past_end_is_rejected() -> Result<()> {
        let mut disk = format_disk();
        let mut file = new_file(&mut disk)?;
        file.write(&mut disk, byte(b'a'), 5)?;
        assert!(matches!(
            file.seek(&mut disk, 6),
            Err(FileSystemError::InvalidPosition(6))
        ));
        file.seek(&mut disk, 5)?;
        assert_eq!(file.position(), 5);
        Ok(())
    }

    #[test]
    fn overwrite_in_middle_keeps_length() -> Result<()> {
        let mut disk = format_disk();
        let mut file = new_file(&mut disk)?;
        file.write(&mut disk, byte(b'a'), 100)?;
        file.seek(&mut disk, 10)?;
        file.write(&mut disk, byte(b'b'), 5)?;
        assert_eq!(DESCRIPTORS.length(&disk, file.descriptor()), 100);

        file.seek(&mut disk, 8)?;
        assert_eq!(file.read(&mut disk, 9)?, b"aabbbbbaa");
        Ok(())
    }

    #[test]
    fn close_flushes_buffer() -> Result<()> {
        let mut disk = format_disk();
        let mut file = new_file(&mut disk)?;
        let descriptor = file.descriptor();
        file.write(&mut disk, byte(b'z'), 3)?;

        let mut raw = [0u8; BLOCK_SIZE];
        disk.read_block(10, &mut raw);
        assert_eq!(raw[0], UNUSED_BYTE);

        file.close(&mut disk);
        disk.read_block(10, &mut raw);
        assert_eq!(&raw[..4], b"zzz\0");

        let mut reopened = OpenFile::open(&mut disk, descriptor)?;
        assert_eq!(reopened.read(&mut disk, 10)?, b"zzz");
        Ok(())
    }

    #[test]
    fn read_only_close_keeps_stored_length() -> Result<()> {
        let mut disk = format_disk();
        let mut file = new_file(&mut disk)?;
        let descriptor = file.descriptor();
        file.write(&mut disk, byte(b'r'), 20)?;
        file.close(&mut disk);

        // 手工改写的长度不会被只读句柄的 close 覆盖
        DESCRIPTORS.set_length(&mut disk, descriptor, 7);
        let mut reader = OpenFile::open(&mut disk, descriptor)?;
        assert_eq!(reader.read(&mut disk, 100)?.len(), 7);
        reader.close(&mut disk);
        assert_eq!(DESCRIPTORS.length(&disk, descriptor), 7);
        Ok(())
    }

    #[test]
    fn partial_write_when_disk_fills() -> Result<()> {
        let mut disk = format_disk();
        let mut file = new_file(&mut disk)?;
        while BITMAP.find_free_block(&disk).is_some() {
            BITMAP.alloc(&mut disk)?;
        }
        assert_eq!(file.write(&mut disk, byte(b'q'), 100)?, BLOCK_SIZE);
        assert!(matches!(
            file.write(&mut disk, byte(b'q'), 1),
            Err(FileSystemError::NoFreeBlock)
        ));
        assert_eq!(DESCRIPTORS.length(&disk, file.descriptor()), BLOCK_SIZE);
        Ok(())
    }

    #[test]
    fn table_hands_out_lowest_free_index() -> Result<()> {
        let mut disk = format_disk();
        let mut table = OpenFileTable::new(2);
        let a = new_file(&mut disk)?;
        let b = new_file(&mut disk)?;
        let descriptor = a.descriptor();

        table.install(table.free_slot()?, a);
        table.install(table.free_slot()?, b);
        assert!(matches!(table.free_slot(), Err(FileSystemError::OftExhausted)));
        assert_eq!(table.handles_of(descriptor), vec![0]);

        table.remove(0)?;
        assert!(matches!(table.remove(0), Err(FileSystemError::InvalidHandle(0))));
        assert!(matches!(table.get_mut(7), Err(FileSystemError::InvalidHandle(7))));
        assert_eq!(table.free_slot()?, 0);
        assert_eq!(table.drain().len(), 1);
        assert_eq!(table.open_count(), 0);
        Ok(())
    }
}
