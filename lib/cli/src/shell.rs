//! Line-oriented command shell over a [`TokenFs`].

use anyhow::{Context, Result, bail};
use std::io::{BufRead, Write};
use std::str::FromStr;
use token_fs::{DirCookie, NodeHandle, NodeKind, TokenFs};

/// Tokens longer than this are clipped by `read`.
const READ_BUF_LEN: usize = 4096;

/// One parsed shell line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Create a directory
    Mkdir(String),
    /// Create an empty file
    Touch(String),
    /// Link words after the token at an offset
    Write {
        /// File to write to
        path: String,
        /// Token the words are linked after; past the end appends
        offset: usize,
        /// Rest of the line, newline-terminated so its last word is kept
        words: String,
    },
    /// Read the next token through the shared cursor
    Read(String),
    /// Move the shared cursor back to the first token
    Rewind(String),
    /// List a directory, the root when no path is given
    Ls(Option<String>),
    /// Print node metadata
    Stat(String),
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let (verb, rest) = split_word(line.trim());
        let command = match verb {
            "mkdir" => Self::Mkdir(one_path(verb, rest)?),
            "touch" => Self::Touch(one_path(verb, rest)?),
            "read" => Self::Read(one_path(verb, rest)?),
            "rewind" => Self::Rewind(one_path(verb, rest)?),
            "stat" => Self::Stat(one_path(verb, rest)?),
            "ls" => match rest {
                "" => Self::Ls(None),
                _ => Self::Ls(Some(one_path(verb, rest)?)),
            },
            "write" => {
                let (path, rest) = split_word(rest);
                let (offset, words) = split_word(rest);
                if path.is_empty() || offset.is_empty() {
                    bail!("usage: write PATH OFFSET WORDS...");
                }
                let offset = offset
                    .parse()
                    .with_context(|| format!("`{offset}` is not a token offset"))?;
                Self::Write {
                    path: path.to_string(),
                    offset,
                    words: format!("{words}\n"),
                }
            }
            other => bail!("unknown command `{other}`"),
        };
        Ok(command)
    }
}

fn split_word(s: &str) -> (&str, &str) {
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (s, ""),
    }
}

fn one_path(verb: &str, rest: &str) -> Result<String> {
    match split_word(rest) {
        (path, "") if !path.is_empty() => Ok(path.to_string()),
        _ => bail!("usage: {verb} PATH"),
    }
}

/// Executes commands against one store and prints their output to `out`.
#[derive(Debug)]
pub struct Shell<W> {
    fs: TokenFs,
    out: W,
}

impl<W: Write> Shell<W> {
    /// A shell printing to `out`.
    pub fn new(fs: TokenFs, out: W) -> Self {
        Self { fs, out }
    }

    /// The store commands run against.
    pub fn fs(&self) -> &TokenFs {
        &self.fs
    }

    /// Give back the output sink.
    pub fn into_output(self) -> W {
        self.out
    }

    /// Run every line of `input`. Blank lines and `#` comments are skipped.
    ///
    /// A failing command is reported on stderr and the session carries on;
    /// only input and output errors end it.
    pub fn run(&mut self, input: impl BufRead) -> Result<()> {
        for (number, line) in input.lines().enumerate() {
            let line = line.context("failed to read command input")?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let result = line
                .parse::<Command>()
                .and_then(|command| self.execute(&command));
            if let Err(err) = result {
                tracing::debug!(line = number + 1, error = %err, "command failed");
                eprintln!("error: line {}: {err:#}", number + 1);
            }
            self.out.flush()?;
        }
        Ok(())
    }

    /// Execute a single command.
    pub fn execute(&mut self, command: &Command) -> Result<()> {
        match command {
            Command::Mkdir(path) => self.create(path, NodeKind::Directory),
            Command::Touch(path) => self.create(path, NodeKind::File),
            Command::Write {
                path,
                offset,
                words,
            } => {
                let file = self.resolve(path)?;
                let written = self
                    .fs
                    .write(file, *offset, words.as_bytes())
                    .with_context(|| format!("failed to write to `{path}`"))?;
                writeln!(self.out, "{written} bytes")?;
                Ok(())
            }
            Command::Read(path) => {
                let file = self.resolve(path)?;
                let mut buf = vec![0u8; READ_BUF_LEN];
                let outcome = self
                    .fs
                    .read_next(file, &mut buf)
                    .with_context(|| format!("failed to read `{path}`"))?;
                if outcome.end_of_data {
                    writeln!(self.out, "(end of data)")?;
                } else {
                    self.out.write_all(&buf[..outcome.len])?;
                }
                Ok(())
            }
            Command::Rewind(path) => {
                let file = self.resolve(path)?;
                self.fs
                    .rewind(file)
                    .with_context(|| format!("failed to rewind `{path}`"))?;
                Ok(())
            }
            Command::Ls(path) => {
                let path = path.as_deref().unwrap_or("/");
                let dir = self.resolve(path)?;
                self.list(dir)
                    .with_context(|| format!("failed to list `{path}`"))
            }
            Command::Stat(path) => {
                let meta = self.fs.metadata(self.resolve(path)?)?;
                let kind = match meta.kind {
                    NodeKind::File => "file",
                    NodeKind::Directory => "directory",
                };
                writeln!(
                    self.out,
                    "{} {kind} {} len={} parent={} open={}",
                    meta.inode,
                    meta.name,
                    meta.len,
                    meta.parent.inode(),
                    meta.open_count,
                )?;
                Ok(())
            }
        }
    }

    fn create(&mut self, path: &str, kind: NodeKind) -> Result<()> {
        let trimmed = path.trim_end_matches('/');
        let (parent, name) = match trimmed.rsplit_once('/') {
            Some((parent, name)) => (self.resolve(parent)?, name),
            None => (self.fs.root(), trimmed),
        };
        self.fs
            .create_node(parent, name, kind)
            .with_context(|| format!("failed to create `{path}`"))?;
        Ok(())
    }

    fn list(&mut self, dir: NodeHandle) -> Result<()> {
        let batch_len = self.fs.config().readdir_batch;
        let mut cookie = Some(DirCookie::START);
        while let Some(position) = cookie {
            let batch = self.fs.enumerate(dir, position, batch_len)?;
            for entry in &batch.entries {
                writeln!(self.out, "{}", entry.name_lossy())?;
            }
            cookie = batch.next;
        }
        Ok(())
    }

    /// Walk `path` from the root, one `lookup` per component.
    fn resolve(&self, path: &str) -> Result<NodeHandle> {
        path.split('/')
            .filter(|component| !component.is_empty())
            .try_fold(self.fs.root(), |node, component| {
                self.fs
                    .lookup(node, component)
                    .with_context(|| format!("cannot resolve `{path}`"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn session(script: &str) -> String {
        let mut shell = Shell::new(TokenFs::default(), Vec::new());
        shell.run(script.as_bytes()).unwrap();
        String::from_utf8(shell.into_output()).unwrap()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            "write /a/b 3 the quick fox".parse::<Command>().unwrap(),
            Command::Write {
                path: "/a/b".to_string(),
                offset: 3,
                words: "the quick fox\n".to_string(),
            }
        );
        assert_eq!("ls".parse::<Command>().unwrap(), Command::Ls(None));
        assert_eq!(
            "  stat   /f ".parse::<Command>().unwrap(),
            Command::Stat("/f".to_string())
        );
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!("frobnicate /f".parse::<Command>().is_err());
        assert!("touch".parse::<Command>().is_err());
        assert!("touch a b".parse::<Command>().is_err());
        assert!("write /f many words".parse::<Command>().is_err());
        assert!("write /f".parse::<Command>().is_err());
    }

    #[test]
    fn lists_files_as_sentences() {
        let out = session(
            "touch /a\n\
             write /a 0 one two three\n\
             mkdir /sub\n\
             touch /sub/hidden\n\
             ls /\n",
        );
        assert_eq!(out, "14 bytes\n.\n..\none two three. \n");
    }

    #[test]
    fn reads_one_token_per_command() {
        let out = session(
            "# comment lines are ignored\n\
             touch f\n\
             write f 0 alpha beta\n\
             read f\n\
             read f\n\
             read f\n\
             rewind f\n\
             read /f\n",
        );
        assert_eq!(out, "11 bytes\nalpha\nbeta\n(end of data)\nalpha\n");
    }

    #[test]
    fn write_offset_names_the_preceding_token() {
        let out = session(
            "touch /f\n\
             write /f 0 a b c\n\
             write /f 1 x\n\
             ls\n",
        );
        assert_eq!(out, "6 bytes\n2 bytes\n.\n..\na b x c. \n");
    }

    #[test]
    fn errors_do_not_end_the_session() {
        let out = session(
            "touch /missing/f\n\
             read /nope\n\
             touch /f\n\
             touch /f\n\
             stat /f\n",
        );
        assert_eq!(out, "2 file f len=0 parent=1 open=0\n");
    }

    #[test]
    fn nested_paths_resolve_through_lookup() {
        let mut shell = Shell::new(TokenFs::default(), Vec::new());
        shell
            .run("mkdir /d\nmkdir /d/e\ntouch /d/e/f\n".as_bytes())
            .unwrap();
        let fs = shell.fs();
        let d = fs.lookup(fs.root(), "d").unwrap();
        let e = fs.lookup(d, "e").unwrap();
        assert_eq!(fs.metadata(e).unwrap().len, 1);
        assert_eq!(shell.resolve("/d/e/./f").unwrap(), fs.lookup(e, "f").unwrap());
        assert_eq!(shell.resolve("/d/e/..").unwrap(), d);
    }
}
