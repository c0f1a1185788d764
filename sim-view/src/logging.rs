//! Logger installation: `env_logger` with a configurable record layout and an
//! optional size-rotated log file next to stderr.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use env_logger::{Builder, Env, Target};
use sim_core::LoggingConfig;

/// Size at which the log file is rotated.
pub const MAX_LOG_BYTES: u64 = 1024 * 1024;
/// Rotated files kept as `<name>.1` to `<name>.5`.
pub const LOG_BACKUPS: usize = 5;

/// Installs the global logger described by `config`.
///
/// `RUST_LOG` still overrides `config.level`.
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    let mut builder = Builder::from_env(Env::default().default_filter_or(config.level.as_str()));

    let template = config.format.clone();
    builder.format(move |buf, record| {
        let line = render(
            &template,
            &buf.timestamp().to_string(),
            record.level().as_str(),
            record.target(),
            &record.args().to_string(),
        );
        writeln!(buf, "{line}")
    });

    if let Some(path) = &config.log_file {
        let file = RotatingFile::open(path, MAX_LOG_BYTES, LOG_BACKUPS)
            .with_context(|| format!("opening log file {}", path.display()))?;
        builder.target(Target::Pipe(Box::new(Tee {
            console: io::stderr(),
            file,
        })));
    }

    builder.try_init().context("installing logger")?;
    log::info!("logging initialized");
    Ok(())
}

/// Fills the `{time}`, `{level}`, `{target}` and `{message}` placeholders.
///
/// The message goes in last so braces inside it are never expanded.
pub fn render(template: &str, time: &str, level: &str, target: &str, message: &str) -> String {
    template
        .replace("{time}", time)
        .replace("{level}", level)
        .replace("{target}", target)
        .replace("{message}", message)
}

/// Copies every write to the console and to the log file.
struct Tee<W> {
    console: W,
    file: RotatingFile,
}

impl<W: Write> Write for Tee<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.console.write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.console.flush()?;
        self.file.flush()
    }
}

/// Append-only file that is shifted to `<name>.1` once it grows past
/// `max_bytes`, pushing older backups along and dropping the oldest.
pub struct RotatingFile {
    path: PathBuf,
    file: File,
    written: u64,
    max_bytes: u64,
    backups: usize,
}

impl RotatingFile {
    /// Opens `path` for appending, creating its parent directory if needed.
    pub fn open(path: &Path, max_bytes: u64, backups: usize) -> io::Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            file,
            written,
            max_bytes,
            backups,
        })
    }

    fn backup(&self, n: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{n}"));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.backups > 0 {
            for n in (1..self.backups).rev() {
                let from = self.backup(n);
                if from.exists() {
                    fs::rename(&from, self.backup(n + 1))?;
                }
            }
            fs::rename(&self.path, self.backup(1))?;
        }
        self.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("particle-life-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn render_fills_every_placeholder() {
        let line = render(
            "{time} [{level}] {target}: {message}",
            "T",
            "INFO",
            "sim_core::simulation",
            "step 5",
        );
        assert_eq!(line, "T [INFO] sim_core::simulation: step 5");
    }

    #[test]
    fn render_leaves_braces_in_the_message_alone() {
        let line = render("{level} {message}", "T", "WARN", "x", "saw {time}");
        assert_eq!(line, "WARN saw {time}");
    }

    #[test]
    fn default_format_matches_documented_layout() {
        let line = render(&LoggingConfig::default().format, "T", "INFO", "x", "hi");
        assert_eq!(line, "T - INFO - hi");
    }

    #[test]
    fn open_creates_missing_directories() {
        let dir = scratch_dir("mkdir");
        let path = dir.join("nested").join("sim.log");
        let mut file = RotatingFile::open(&path, 1024, 2).unwrap();
        file.write_all(b"hello\n").unwrap();
        file.flush().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn rotation_shifts_backups_and_drops_the_oldest() {
        let dir = scratch_dir("rotate");
        let path = dir.join("sim.log");
        let mut file = RotatingFile::open(&path, 10, 2).unwrap();
        for line in ["aaaaaaaa\n", "bbbbbbbb\n", "cccccccc\n", "dddddddd\n"] {
            file.write_all(line.as_bytes()).unwrap();
        }
        file.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "dddddddd\n");
        assert_eq!(fs::read_to_string(dir.join("sim.log.1")).unwrap(), "cccccccc\n");
        assert_eq!(fs::read_to_string(dir.join("sim.log.2")).unwrap(), "bbbbbbbb\n");
        assert!(!dir.join("sim.log.3").exists());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn reopening_continues_the_size_count() {
        let dir = scratch_dir("reopen");
        let path = dir.join("sim.log");
        RotatingFile::open(&path, 10, 1)
            .unwrap()
            .write_all(b"12345678\n")
            .unwrap();

        let mut file = RotatingFile::open(&path, 10, 1).unwrap();
        file.write_all(b"abc\n").unwrap();
        file.flush().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "abc\n");
        assert_eq!(fs::read_to_string(dir.join("sim.log.1")).unwrap(), "12345678\n");
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn tee_writes_to_both_sinks() {
        let dir = scratch_dir("tee");
        let path = dir.join("sim.log");
        let mut tee = Tee {
            console: Vec::new(),
            file: RotatingFile::open(&path, 1024, 1).unwrap(),
        };
        tee.write_all(b"both\n").unwrap();
        tee.flush().unwrap();
        assert_eq!(tee.console, b"both\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "both\n");
        fs::remove_dir_all(dir).unwrap();
    }
}
