use std::{
    collections::HashMap,
    fs::{self, File, OpenOptions},
    io::{self, Read, Write},
    path::PathBuf,
};

use log::debug;

/// 按名字保存 / 取回磁盘镜像的持久化后端
pub trait DiskStore {
    /// 名字不存在时返回 Ok(None)
    fn load(&self, name: &str) -> io::Result<Option<Vec<u8>>>;
    fn save(&mut self, name: &str, bytes: &[u8]) -> io::Result<()>;
}

/// 镜像名会被拼进文件路径，不允许为空或包含路径分隔符
pub fn validate_disk_name(name: &str) -> io::Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid disk name '{}'", name),
        ));
    }
    Ok(())
}

/// 每个磁盘保存为目录下的一个 `<name>.img` 文件
#[derive(Debug)]
pub struct FileDiskStore {
    root: PathBuf,
}

impl FileDiskStore {
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// 默认目录：~/.blockfs/disks
    pub fn default_root() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".blockfs")
            .join("disks")
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.img", name))
    }
}

impl DiskStore for FileDiskStore {
    fn load(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        validate_disk_name(name)?;
        let path = self.path_of(name);
        let mut file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        debug!("loaded {} bytes from {}", bytes.len(), path.display());
        Ok(Some(bytes))
    }

    fn save(&mut self, name: &str, bytes: &[u8]) -> io::Result<()> {
        validate_disk_name(name)?;
        let path = self.path_of(name);
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        file.write_all(bytes)?;
        file.flush()?;
        debug!("saved {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

/// 只存在于当前进程的镜像仓库
#[derive(Debug, Default)]
pub struct MemoryDiskStore {
    images: HashMap<String, Vec<u8>>,
}

impl MemoryDiskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DiskStore for MemoryDiskStore {
    fn load(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        validate_disk_name(name)?;
        Ok(self.images.get(name).cloned())
    }

    fn save(&mut self, name: &str, bytes: &[u8]) -> io::Result<()> {
        validate_disk_name(name)?;
        self.images.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::generate_uuid;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("blockfs-test-{}", generate_uuid()))
    }

    #[test]
    fn file_store_round_trips_by_name() -> io::Result<()> {
        let root = scratch_dir();
        let mut store = FileDiskStore::new(&root)?;

        assert!(store.load("d1")?.is_none());
        store.save("d1", b"abc")?;
        store.save("d1", b"xy")?;
        assert_eq!(store.load("d1")?, Some(b"xy".to_vec()));
        assert!(root.join("d1.img").exists());

        fs::remove_dir_all(root)?;
        Ok(())
    }

    #[test]
    fn file_store_rejects_path_like_names() -> io::Result<()> {
        let root = scratch_dir();
        let mut store = FileDiskStore::new(&root)?;
        assert!(store.save("../evil", b"x").is_err());
        assert!(store.load("").is_err());
        fs::remove_dir_all(root)?;
        Ok(())
    }

    #[test]
    fn memory_store_keeps_latest_save() -> io::Result<()> {
        let mut store = MemoryDiskStore::new();
        assert!(store.load("a")?.is_none());
        store.save("a", &[1, 2, 3])?;
        store.save("b", &[4])?;
        assert_eq!(store.load("a")?, Some(vec![1, 2, 3]));
        assert_eq!(store.load("b")?, Some(vec![4]));
        Ok(())
    }
}
