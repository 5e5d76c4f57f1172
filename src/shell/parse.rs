use std::num::NonZeroU8;

use crate::shell::command::Command;

/// 解析一行命令；操作码未知或参数缺失 / 非法时返回 None
pub fn parse_command(input: &str) -> Option<Command> {
    let tokens: Vec<&str> = input.trim().split_ascii_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    let cmd = tokens[0];
    let args = &tokens[1..];

    match (cmd, args.len()) {
        ("in", 0) => Some(Command::Init(None)),
        ("in", 1) => Some(Command::Init(Some(args[0].to_string()))),
        ("sv", 1) => Some(Command::Save(args[0].to_string())),
        ("cr", 1) => Some(Command::Create(args[0].to_string())),
        ("de", 1) => Some(Command::Destroy(args[0].to_string())),
        ("op", 1) => Some(Command::Open(args[0].to_string())),
        ("cl", 1) => Some(Command::Close(number(args[0])?)),
        ("rd", 2) => Some(Command::Read(number(args[0])?, number(args[1])?)),
        ("wr", 3) => Some(Command::Write(
            number(args[0])?,
            single_byte(args[1])?,
            number(args[2])?,
        )),
        ("sk", 2) => Some(Command::Seek(number(args[0])?, number(args[1])?)),
        ("dr", 0) => Some(Command::Dir),
        ("help", 0) => Some(Command::Help),
        ("exit", 0) | ("quit", 0) => Some(Command::Exit),
        _ => None,
    }
}

fn number(token: &str) -> Option<usize> {
    token.parse().ok()
}

// wr 的字节参数只能是一个字符
fn single_byte(token: &str) -> Option<NonZeroU8> {
    match token.as_bytes() {
        [b] => NonZeroU8::new(*b),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_opcode() {
        assert_eq!(parse_command("in"), Some(Command::Init(None)));
        assert_eq!(
            parse_command("in disk1"),
            Some(Command::Init(Some("disk1".into())))
        );
        assert_eq!(parse_command("sv d"), Some(Command::Save("d".into())));
        assert_eq!(parse_command("cr foo"), Some(Command::Create("foo".into())));
        assert_eq!(parse_command("de foo"), Some(Command::Destroy("foo".into())));
        assert_eq!(parse_command("op foo"), Some(Command::Open("foo".into())));
        assert_eq!(parse_command("cl 1"), Some(Command::Close(1)));
        assert_eq!(parse_command("rd 0 70"), Some(Command::Read(0, 70)));
        assert_eq!(
            parse_command("wr 0 x 70"),
            Some(Command::Write(0, NonZeroU8::new(b'x').unwrap(), 70))
        );
        assert_eq!(parse_command("sk 2 10"), Some(Command::Seek(2, 10)));
        assert_eq!(parse_command("dr"), Some(Command::Dir));
    }

    #[test]
    fn tolerates_extra_whitespace() {
        assert_eq!(parse_command("  rd   1    5  "), Some(Command::Read(1, 5)));
    }

    #[test]
    fn rejects_malformed_lines() {
        for line in ["", "xx", "cr", "cr a b", "rd 0", "rd a 1", "wr 0 xy 3", "sk 0 -1", "dr x"] {
            assert_eq!(parse_command(line), None, "line {:?}", line);
        }
    }
}
