//! Interactive command loop: `help`, `print
//! files`, `exit`. Reads the catalogue produced once at startup; does not
//! re-scan the device.

use crate::catalogue::Catalogue;
use std::io::{self, Write};

const HELP_TEXT: &str = "\
Commands:
  help          show this message
  print files   list every catalogued MFT record
  exit          quit
";

pub fn run(catalogue: &Catalogue) -> io::Result<()> {
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break; // EOF
        }
        match line.trim() {
            "help" => print!("{HELP_TEXT}"),
            "print files" => {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                catalogue.print_all(&mut handle)?;
            }
            "exit" => break,
            "" => {}
            other => println!("unrecognised command: {other:?} (try `help`)"),
        }
    }
    Ok(())
}
