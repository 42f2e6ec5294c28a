// Interactive browsing of an image

use anyhow::Result;
use fatscope_core::FatError;
use fatscope_fs::{EntryHandle, Image};
use log::debug;
use std::io::{BufRead, Write};

use crate::render;

const HELP: &str = "\
Available commands:
  cd PATH       Change current directory
  ls [PATH]     List child entries
  tree [PATH]   List descendant entries
  info [PATH]   Show entry information
  cat PATH      Show entry data
  help          Show this help
  exit          Stop program
";

enum Command {
    Cd,
    Ls,
    Tree,
    Info,
    Cat,
}

impl Command {
    fn parse(word: &str) -> Option<Self> {
        match word {
            "cd" => Some(Command::Cd),
            "ls" => Some(Command::Ls),
            "tree" => Some(Command::Tree),
            "info" => Some(Command::Info),
            "cat" => Some(Command::Cat),
            _ => None,
        }
    }
}

pub struct Shell<'a> {
    image: &'a mut Image,
    cwd: EntryHandle,
    json: bool,
}

impl<'a> Shell<'a> {
    pub fn new(image: &'a mut Image, json: bool) -> Result<Self> {
        let cwd = image.open_entry("/")?;
        Ok(Self { image, cwd, json })
    }

    /// Read commands until `exit` or end of input
    pub fn run(mut self, input: &mut dyn BufRead, out: &mut dyn Write) -> Result<()> {
        out.write_all(HELP.as_bytes())?;

        let mut line = String::new();
        loop {
            write!(out, "> ")?;
            out.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(out)?;
                break;
            }

            let mut words = line.split_whitespace();
            let Some(word) = words.next() else {
                continue;
            };
            let param = words.next().unwrap_or("");

            match word {
                "exit" => break,
                "help" => out.write_all(HELP.as_bytes())?,
                _ => match Command::parse(word) {
                    Some(command) => {
                        if let Err(e) = self.execute(command, param, out) {
                            writeln!(out, "Error: {}", e)?;
                        }
                    }
                    None => writeln!(out, "Unknown command: {} (try 'help')", word)?,
                },
            }
        }

        self.image.close_entry(self.cwd)?;
        Ok(())
    }

    fn execute(&mut self, command: Command, param: &str, out: &mut dyn Write) -> Result<()> {
        let target = self.image.resolve(self.cwd, param)?;
        debug!("Shell target '{}' opened as {}", param, target);

        if let Command::Cd = command {
            let entry = self.image.entry(target)?;
            if !entry.is_directory() {
                let name = entry.display_name().to_string();
                self.image.close_entry(target)?;
                return Err(FatError::NotDirectory(name).into());
            }
            let previous = std::mem::replace(&mut self.cwd, target);
            self.image.close_entry(previous)?;
            return Ok(());
        }

        let result = match command {
            Command::Ls => render::print_children(self.image, target, self.json, out),
            Command::Tree => render::print_tree(self.image, target, out),
            Command::Info => match self.image.entry(target) {
                Ok(entry) => render::print_info(entry, self.json, out),
                Err(e) => Err(e.into()),
            },
            Command::Cat => render::print_data(self.image, target, out).and_then(|()| {
                writeln!(out)?;
                Ok(())
            }),
            Command::Cd => Ok(()),
        };
        self.image.close_entry(target)?;
        result
    }
}
