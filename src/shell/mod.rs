pub mod command;
pub mod parse;

use crate::{
    fs::{error::Result, FileSystem},
    shell::{
        command::{execute_command, Command, OPCODES},
        parse::parse_command,
    },
};
use colored::*;
use crossterm::{
    cursor, execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use log::debug;
use reedline::{
    DefaultCompleter, DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal,
};
use std::{
    io::{self, stdin, stdout, BufRead, IsTerminal, Write},
    path::PathBuf,
};

/// quiet 模式下所有错误统一输出的标记
pub const ERROR_MARKER: &str = "error";

#[derive(Debug, Clone)]
pub struct ShellOptions {
    pub quiet: bool,         // 只打印 "error"，不打印错误详情
    pub history_size: usize, // 交互模式下保留的历史条数
}

/// stdin 是终端时进入交互模式，否则逐行执行脚本
pub fn start_shell(mut fs: FileSystem, options: &ShellOptions) -> anyhow::Result<()> {
    if stdin().is_terminal() {
        run_interactive(&mut fs, options)
    } else {
        colored::control::set_override(false);
        run_script(&mut fs, stdin().lock(), &mut stdout().lock(), options.quiet)?;
        Ok(())
    }
}

/// 把一条命令的结果渲染成一行输出
fn render(result: Option<Result<String>>, quiet: bool) -> String {
    match result {
        Some(Ok(output)) => output,
        _ if quiet => ERROR_MARKER.to_string(),
        Some(Err(e)) => e.to_string(),
        None => "unknown or malformed command".to_string(),
    }
}

/// 非交互模式：每行一条命令，每条命令输出一行，读到 EOF 正常结束
pub fn run_script<R: BufRead, W: Write>(
    fs: &mut FileSystem,
    input: R,
    out: &mut W,
    quiet: bool,
) -> io::Result<()> {
    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let cmd = parse_command(trimmed);
        if matches!(cmd, Some(Command::Exit)) {
            break;
        }
        let result = cmd.as_ref().map(|cmd| execute_command(cmd, fs));
        debug!("{} -> {:?}", trimmed, result);
        writeln!(out, "{}", render(result, quiet))?;
    }
    out.flush()
}

fn run_interactive(fs: &mut FileSystem, options: &ShellOptions) -> anyhow::Result<()> {
    banner()?;

    let username = whoami::username();
    let hostname = whoami::fallible::hostname().unwrap_or_else(|_| "localhost".to_string());

    println!(
        "{}",
        "Type 'help' for available commands. Use ↑↓ for history, Tab for auto-completion.\n"
            .bright_black()
    );

    let history_path = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".blockfs_history");

    let mut line_editor = Reedline::create().with_history(Box::new(
        FileBackedHistory::with_file(options.history_size, history_path)?,
    ));

    // 命令补全
    let completer = DefaultCompleter::new_with_wordlen(
        OPCODES.iter().map(|s| s.to_string()).collect(),
        2,
    );
    line_editor = line_editor.with_completer(Box::new(completer));

    loop {
        let disk_state = if fs.is_mounted() { "mounted" } else { "no disk" };
        let full_prompt = format!(
            "{}:{}",
            format!("{}@{}", username, hostname).green(),
            disk_state.blue()
        );
        let prompt = DefaultPrompt::new(
            DefaultPromptSegment::Basic(full_prompt),
            DefaultPromptSegment::Basic("blockfs".bright_blue().bold().to_string()),
        );
        let input = line_editor.read_line(&prompt);

        match input {
            Ok(Signal::Success(buffer)) => {
                let trimmed = buffer.trim();
                if trimmed.is_empty() {
                    continue;
                }

                match parse_command(trimmed) {
                    Some(cmd) => {
                        match execute_command(&cmd, fs) {
                            Ok(output) => println!("{}", output),
                            Err(_) if options.quiet => println!("{}", ERROR_MARKER.red()),
                            Err(e) => println!("{} {}", "❌ Error:".red().bold(), e),
                        }
                        if matches!(cmd, Command::Exit) {
                            break;
                        }
                    }
                    None => println!(
                        "{}",
                        "⚠️  Unknown command. Type 'help' for command list.".yellow()
                    ),
                }
            }
            Ok(Signal::CtrlC) => {
                println!();
                continue;
            }
            Ok(Signal::CtrlD) => {
                println!("{}", "Exiting blockfs...".yellow());
                break;
            }
            Err(e) => {
                println!("Error reading line: {}", e);
                break;
            }
        }
    }

    println!("{}", "GoodBye!".bright_yellow());
    Ok(())
}

fn banner() -> io::Result<()> {
    let mut stdout = stdout();
    execute!(
        stdout,
        Clear(ClearType::All),
        cursor::MoveTo(0, 0),
        SetForegroundColor(Color::Cyan),
        Print(format!("Welcome to blockfs v{}\n", env!("CARGO_PKG_VERSION"))),
        ResetColor
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MemoryDiskStore;

    fn script(input: &str, quiet: bool) -> String {
        let mut fs = FileSystem::new(Box::new(MemoryDiskStore::new()));
        let mut out = Vec::new();
        run_script(&mut fs, input.as_bytes(), &mut out, quiet).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn two_block_write_reads_back_after_reopen() {
        let out = script("in\ncr a\nop a\nwr 0 x 70\ncl 0\nop a\nrd 0 70\n", false);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines[..6],
            [
                "disk initialized",
                "a created",
                "a opened 0",
                "70 bytes written",
                "0 closed",
                "a opened 0"
            ]
        );
        assert_eq!(lines[6], "x".repeat(70));
    }

    #[test]
    fn errors_do_not_stop_the_loop() {
        let out = script("in\ncr a\ncr a\nde b\nbogus\n\ndr\n", false);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[2], "File <a> already exists");
        assert_eq!(lines[3], "File <b> does not exist");
        assert_eq!(lines[4], "unknown or malformed command");
        assert_eq!(lines[5], "a");
    }

    #[test]
    fn quiet_mode_prints_marker() {
        let out = script("cr a\nin\nop zz\nxx 1\n", true);
        assert_eq!(out, "error\ndisk initialized\nerror\nerror\n");
    }

    #[test]
    fn reopening_an_open_file_is_an_error() {
        let out = script("in\ncr a\nop a\nwr 0 x 70\nop a\nsk 0 0\nrd 0 70\n", false);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[4], "File <a> is already open");
        assert_eq!(lines[6], "x".repeat(70));
    }

    #[test]
    fn exit_stops_reading() {
        let out = script("in\nexit\ncr a\n", false);
        assert_eq!(out, "disk initialized\n");
    }
}
