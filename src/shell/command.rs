use std::num::NonZeroU8;

use colored::*;

use crate::fs::{error::Result, FileSystem, MountOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Init(Option<String>),
    Save(String),
    Create(String),
    Destroy(String),
    Open(String),
    Close(usize),
    Read(usize, usize),
    Write(usize, NonZeroU8, usize),
    Seek(usize, usize),
    Dir,
    Help,
    Exit,
}

/// 所有操作码，供补全使用
pub const OPCODES: &[&str] = &[
    "in", "sv", "cr", "de", "op", "cl", "rd", "wr", "sk", "dr", "help", "exit",
];

/// 执行一条命令，返回成功时要打印的文本
pub fn execute_command(cmd: &Command, fs: &mut FileSystem) -> Result<String> {
    let output = match cmd {
        Command::Init(name) => match fs.mount(name.as_deref())? {
            MountOutcome::Restored => "disk restored".to_string(),
            MountOutcome::Initialized => "disk initialized".to_string(),
        },
        Command::Save(name) => {
            fs.persist(name)?;
            "disk saved".to_string()
        }
        Command::Create(name) => {
            fs.create_file(name)?;
            format!("{} created", name)
        }
        Command::Destroy(name) => {
            fs.destroy_file(name)?;
            format!("{} destroyed", name)
        }
        Command::Open(name) => {
            let index = fs.open_file(name)?;
            format!("{} opened {}", name, index)
        }
        Command::Close(index) => {
            fs.close_file(*index)?;
            format!("{} closed", index)
        }
        Command::Read(index, count) => {
            let bytes = fs.read_file(*index, *count)?;
            String::from_utf8_lossy(&bytes).into_owned()
        }
        Command::Write(index, byte, count) => {
            let written = fs.write_file(*index, *byte, *count)?;
            format!("{} bytes written", written)
        }
        Command::Seek(index, pos) => {
            let position = fs.seek_file(*index, *pos)?;
            format!("position is {}", position)
        }
        Command::Dir => fs.list_files()?.join(" "),
        Command::Help => help_text(),
        Command::Exit => "👋 Exiting blockfs shell...".yellow().bold().to_string(),
    };
    Ok(output)
}

fn help_text() -> String {
    format!(
        "{}{}",
        "📘 blockfs Commands".bright_cyan().bold(),
        "
  in [disk]          Mount a saved disk, or initialize a new one
  sv <disk>          Save the mounted disk
  cr <name>          Create file (1-4 characters)
  de <name>          Destroy file
  op <name>          Open file, prints its handle
  cl <h>             Close handle
  rd <h> <n>         Read n bytes
  wr <h> <c> <n>     Write character c n times
  sk <h> <pos>       Move the cursor of handle
  dr                 List files
  help               Show this help message
  exit               Quit the shell"
            .bright_black()
    )
}
