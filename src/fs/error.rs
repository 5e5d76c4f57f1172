use std::fmt;

/// 文件系统错误类型
#[derive(Debug)]
pub enum FileSystemError {
    DiskNotMounted,         // 尚未执行 in
    AlreadyExists(String),  // 文件已存在
    NotFound(String),       // 文件不存在
    DirectoryFull,          // 目录槽位用尽
    NoFreeDescriptor,       // 描述符表已满
    NoFreeBlock,            // 数据块已用尽
    OftExhausted,           // 打开文件表已满
    InvalidHandle(usize),   // 未打开的 OFT 下标
    AlreadyOpen(String),    // 同一文件只允许一个句柄
    InvalidName(String),    // 文件名不是 1~4 个 ASCII 字节
    InvalidPosition(usize), // seek 超出文件末尾
    PersistFailed(String),  // 镜像读写失败或镜像损坏
}

impl From<std::io::Error> for FileSystemError {
    fn from(e: std::io::Error) -> Self {
        FileSystemError::PersistFailed(e.to_string())
    }
}

impl From<bincode::Error> for FileSystemError {
    fn from(e: bincode::Error) -> Self {
        FileSystemError::PersistFailed(format!("malformed disk image: {}", e))
    }
}

impl fmt::Display for FileSystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DiskNotMounted => write!(f, "No disk is mounted"),
            Self::AlreadyExists(name) => write!(f, "File <{}> already exists", name),
            Self::NotFound(name) => write!(f, "File <{}> does not exist", name),
            Self::DirectoryFull => write!(f, "Directory is full"),
            Self::NoFreeDescriptor => write!(f, "No free file descriptor available"),
            Self::NoFreeBlock => write!(f, "Disk space is full"),
            Self::OftExhausted => write!(f, "Too many open files"),
            Self::InvalidHandle(index) => write!(f, "No open file at index {}", index),
            Self::AlreadyOpen(name) => write!(f, "File <{}> is already open", name),
            Self::InvalidName(name) => write!(f, "Invalid file name: '{}'", name),
            Self::InvalidPosition(pos) => write!(f, "Position {} is past end of file", pos),
            Self::PersistFailed(desc) => write!(f, "Disk persistence failed: {}", desc),
        }
    }
}

impl std::error::Error for FileSystemError {}

/// 文件系统统一结果类型
pub type Result<T> = std::result::Result<T, FileSystemError>;
