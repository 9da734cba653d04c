use std::io::{stdout, BufRead, Write};

use anyhow::Result;
use cache_sim::{addr::Addr, sim::Simulator};

#[cfg(feature = "stat")]
use terminal_size::terminal_size;

peg::parser!(grammar command() for str {
    rule hex() -> u32
        = quiet!{"0" ['x' | 'X']}? n:$(quiet!{['0'..='9'|'a'..='f'|'A'..='F']+})
        {? u32::from_str_radix(n, 16).map_err(|_| "hex number") }
        / expected!("hex number")
    rule addr() -> Addr
        = n:hex() { Addr::new(n) }
    rule byte() -> u8
        = n:hex() {? n.try_into().map_err(|_| "byte-sized value") }
    rule read() = "read" / "r"
    rule write() = "write" / "w"
    rule display() = "display" / "d"
    rule mem() = "memory" / "mem"
    pub(crate) rule parse_command() -> Command
        = _ read() __ a:addr() _ { Command::Read(a) }
        / _ write() __ a:addr() __ v:byte() _ { Command::Write(a, v) }
        / _ display() _ { Command::Display }
        / _ "show" __ mem() __ a:addr() _ { Command::ShowMem(a) }
        / _ "stat" "s"? _ { Command::Stat }
        / _ ("exit" / "quit") _ { Command::Exit }
        / expected!("command")

    rule ws() = quiet!{[' ' | '\t' | '\r' | '\n']}
        / expected!("whitespace")
    rule _() = ws()*
    rule __() = ws()+
});

pub(crate) enum Command {
    Read(Addr),
    Write(Addr, u8),
    Display,
    ShowMem(Addr),
    Stat,
    Exit,
}

pub fn execute_commands(
    sim: &mut Simulator,
    mut input: impl BufRead,
    prompt: bool,
) -> Result<()> {
    loop {
        if prompt {
            print!("> ");
            stdout().flush()?;
        }
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            // EOF behaves like exit
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        let parsed = match command::parse_command(&line) {
            Ok(p) => p,
            Err(e) => {
                println!("parse error: expected {}", e.expected);
                continue;
            }
        };
        match parsed {
            Command::Read(addr) => match sim.read(addr) {
                Ok(r) => {
                    println!("M[{addr}] == {:#04x}, cache {}", r.value, hit_str(r.hit));
                }
                Err(e) => println!("{e}"),
            },
            Command::Write(addr, value) => match sim.write(addr, value) {
                Ok(hit) => {
                    println!("wrote {value:#04x} to M[{addr}], cache {}", hit_str(hit));
                }
                Err(e) => println!("{e}"),
            },
            Command::Display => print!("{}", sim.cache_view()),
            Command::ShowMem(addr) => match sim.get_mem(addr) {
                Ok(v) => println!("M[{addr}] == {v:#04x}"),
                Err(e) => println!("{e}"),
            },
            Command::Stat => show_stat(sim),
            Command::Exit => break,
        }
    }
    sim.exit_sim();
    Ok(())
}

fn hit_str(hit: bool) -> &'static str {
    if hit {
        "hit"
    } else {
        "miss"
    }
}

#[cfg(feature = "stat")]
fn show_stat(sim: &Simulator) {
    let width = terminal_size().map(|(w, _)| w.0 - 20).unwrap_or(60) as usize;
    println!("{}", sim.collect_stat().view(width));
}

#[cfg(not(feature = "stat"))]
fn show_stat(_: &Simulator) {
    println!("statistics unavailable; compile with `--features stat`");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_read_forms() {
        assert!(matches!(
            command::parse_command("r 3F0"),
            Ok(Command::Read(a)) if a == Addr::new(0x3F0)
        ));
        assert!(matches!(
            command::parse_command("read 0x123"),
            Ok(Command::Read(a)) if a == Addr::new(0x123)
        ));
    }

    #[test]
    fn parses_write_with_byte_value() {
        assert!(matches!(
            command::parse_command("write 0x123 ab"),
            Ok(Command::Write(a, 0xAB)) if a == Addr::new(0x123)
        ));
        // value wider than a byte is a parse error
        assert!(command::parse_command("w 123 1FF").is_err());
    }

    #[test]
    fn parses_remaining_commands() {
        assert!(matches!(command::parse_command("d"), Ok(Command::Display)));
        assert!(matches!(
            command::parse_command("show mem 7FF"),
            Ok(Command::ShowMem(_))
        ));
        assert!(matches!(command::parse_command("stats"), Ok(Command::Stat)));
        assert!(matches!(command::parse_command("quit"), Ok(Command::Exit)));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(command::parse_command("read zz").is_err());
        assert!(command::parse_command("frobnicate").is_err());
        assert!(command::parse_command("write 10").is_err());
    }
}
