use std::path::PathBuf;

use clap::Parser;

use crate::{
    disk::{DiskStore, FileDiskStore, MemoryDiskStore},
    fs::FileSystem,
    shell::{start_shell, ShellOptions},
};

mod disk;
mod fs;
mod shell;
mod utils;

// 命令行参数：帮助文本保持英文，供终端用户查看
#[derive(Parser, Debug, PartialEq)]
#[command(
    author,
    version,
    about = "A 64-block toy file system driven by two-letter commands",
    long_about = None
)]
struct Cli {
    // quiet 模式：命令失败时只输出 "error"
    #[arg(short, long, help = "Print only \"error\" when a command fails")]
    quiet: bool,
    // 镜像保存目录，缺省为 ~/.blockfs/disks
    #[arg(
        short,
        long,
        conflicts_with = "memory",
        help = "Directory where saved disks are kept (default: ~/.blockfs/disks)"
    )]
    store: Option<PathBuf>,
    // 只在进程内存中保存镜像
    #[arg(
        short,
        long,
        help = "Keep saved disks in memory only, for the lifetime of the process"
    )]
    memory: bool,
    // 交互模式历史条数
    #[arg(
        long,
        default_value_t = 100,
        help = "Number of history entries kept by the interactive shell"
    )]
    history: usize,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Cli::parse();

    let store: Box<dyn DiskStore> = if args.memory {
        Box::new(MemoryDiskStore::new())
    } else {
        let root = args.store.unwrap_or_else(FileDiskStore::default_root);
        Box::new(FileDiskStore::new(root)?)
    };

    let options = ShellOptions {
        quiet: args.quiet,
        history_size: args.history,
    };
    start_shell(FileSystem::new(store), &options)
}
