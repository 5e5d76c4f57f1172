use std::num::NonZeroU8;

use log::{info, warn};

use crate::{
    disk::{format_disk, Disk, DiskImage, DiskStore},
    fs::{
        check::check_disk,
        descriptor::DESCRIPTORS,
        directory::{FileName, DIRECTORY},
        error::{FileSystemError, Result},
        oft::{OpenFile, OpenFileTable},
    },
};

pub mod bitmap;
pub mod check;
pub mod config;
pub mod descriptor;
pub mod directory;
pub mod error;
pub mod oft;

/// mount 的结果：从镜像恢复，或格式化了一块新盘
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    Restored,
    Initialized,
}

pub struct FileSystem {
    disk: Option<Disk>,        // 当前挂载的磁盘
    oft: OpenFileTable,        // 打开文件表
    store: Box<dyn DiskStore>, // 镜像持久化后端
}

impl FileSystem {
    pub fn new(store: Box<dyn DiskStore>) -> Self {
        Self {
            disk: None,
            oft: OpenFileTable::default(),
            store,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.disk.is_some()
    }

    fn disk(&self) -> Result<&Disk> {
        self.disk.as_ref().ok_or(FileSystemError::DiskNotMounted)
    }

    fn disk_mut(&mut self) -> Result<&mut Disk> {
        self.disk.as_mut().ok_or(FileSystemError::DiskNotMounted)
    }

    /// 挂载名为 name 的磁盘；不存在（或未给出名字）时格式化一块新盘。
    ///
    /// 镜像损坏时同样换成新盘，但把 PersistFailed 交给调用方报告。
    pub fn mount(&mut self, name: Option<&str>) -> Result<MountOutcome> {
        if self.oft.open_count() > 0 {
            warn!("discarding {} open files", self.oft.open_count());
        }
        self.oft = OpenFileTable::default();

        let restored = match name {
            Some(name) => self.load_image(name),
            None => Ok(None),
        };
        match restored {
            Ok(Some(disk)) => {
                info!("restored disk {:?} (volume {})", name, disk.volume_id());
                self.disk = Some(disk);
                Ok(MountOutcome::Restored)
            }
            Ok(None) => {
                let disk = format_disk();
                info!("initialized disk {:?} (volume {})", name, disk.volume_id());
                self.disk = Some(disk);
                Ok(MountOutcome::Initialized)
            }
            Err(e) => {
                warn!("cannot restore disk {:?}: {}; formatting a new one", name, e);
                self.disk = Some(format_disk());
                Err(e)
            }
        }
    }

    fn load_image(&self, name: &str) -> Result<Option<Disk>> {
        match self.store.load(name)? {
            Some(bytes) => {
                let disk = DiskImage::from_bytes(&bytes)?.into_disk();
                check_disk(&disk)?;
                Ok(Some(disk))
            }
            None => Ok(None),
        }
    }

    /// 关闭所有打开的文件（刷回缓冲区），然后以 name 保存磁盘镜像
    pub fn persist(&mut self, name: &str) -> Result<()> {
        let disk = self.disk.as_mut().ok_or(FileSystemError::DiskNotMounted)?;
        for file in self.oft.drain() {
            file.close(disk);
        }
        let bytes = DiskImage::capture(disk).to_bytes()?;
        self.store.save(name, &bytes)?;
        info!("saved disk {} ({} bytes)", name, bytes.len());
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<Option<usize>> {
        let name = FileName::parse(name)?;
        Ok(DIRECTORY.lookup(self.disk()?, &name))
    }

    pub fn create_file(&mut self, name: &str) -> Result<()> {
        let name = FileName::parse(name)?;
        let disk = self.disk_mut()?;
        if DIRECTORY.lookup(disk, &name).is_some() {
            return Err(FileSystemError::AlreadyExists(name.to_string()));
        }
        let descriptor = DESCRIPTORS.allocate(disk)?;
        if let Err(e) = DIRECTORY.insert(disk, &name, descriptor) {
            DESCRIPTORS.free(disk, descriptor);
            return Err(e);
        }
        info!("created {} with descriptor {}", name, descriptor);
        Ok(())
    }

    pub fn destroy_file(&mut self, name: &str) -> Result<()> {
        let name = FileName::parse(name)?;
        let disk = self.disk.as_mut().ok_or(FileSystemError::DiskNotMounted)?;
        let descriptor = DIRECTORY
            .lookup(disk, &name)
            .ok_or_else(|| FileSystemError::NotFound(name.to_string()))?;

        // 数据块马上要释放，打开的句柄直接丢弃，不必刷盘
        for handle in self.oft.handles_of(descriptor) {
            self.oft.remove(handle)?;
        }
        DIRECTORY.remove(disk, &name);
        DESCRIPTORS.free(disk, descriptor);
        info!("destroyed {} (descriptor {})", name, descriptor);
        Ok(())
    }

    /// 打开文件，返回 OFT 下标
    pub fn open_file(&mut self, name: &str) -> Result<usize> {
        let name = FileName::parse(name)?;
        let disk = self.disk.as_mut().ok_or(FileSystemError::DiskNotMounted)?;
        let descriptor = DIRECTORY
            .lookup(disk, &name)
            .ok_or_else(|| FileSystemError::NotFound(name.to_string()))?;
        if !self.oft.handles_of(descriptor).is_empty() {
            return Err(FileSystemError::AlreadyOpen(name.to_string()));
        }
        let index = self.oft.free_slot()?;
        let file = OpenFile::open(disk, descriptor)?;
        self.oft.install(index, file);
        Ok(index)
    }

    pub fn close_file(&mut self, index: usize) -> Result<()> {
        let disk = self.disk.as_mut().ok_or(FileSystemError::DiskNotMounted)?;
        self.oft.remove(index)?.close(disk);
        Ok(())
    }

    pub fn read_file(&mut self, index: usize, count: usize) -> Result<Vec<u8>> {
        let disk = self.disk.as_mut().ok_or(FileSystemError::DiskNotMounted)?;
        self.oft.get_mut(index)?.read(disk, count)
    }

    /// 返回实际写入的字节数
    pub fn write_file(&mut self, index: usize, byte: NonZeroU8, count: usize) -> Result<usize> {
        let disk = self.disk.as_mut().ok_or(FileSystemError::DiskNotMounted)?;
        self.oft.get_mut(index)?.write(disk, byte, count)
    }

    /// 返回移动后的位置
    pub fn seek_file(&mut self, index: usize, pos: usize) -> Result<usize> {
        let disk = self.disk.as_mut().ok_or(FileSystemError::DiskNotMounted)?;
        let file = self.oft.get_mut(index)?;
        file.seek(disk, pos)?;
        Ok(file.position())
    }

    /// 目录中的文件名，按块号、槽号顺序
    pub fn list_files(&self) -> Result<Vec<String>> {
        Ok(DIRECTORY
            .list(self.disk()?)
            .into_iter()
            .map(|entry| entry.name.to_string())
            .collect())
    }
}
