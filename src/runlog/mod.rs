use crate::error::Result;
use crate::report::{layout, ReportMode};
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use tracing::error;

/// Human-readable record of a run. Messages go to the console and, when a
/// file is attached, to the file as well.
#[derive(Debug)]
pub struct RunLog {
    file: Option<File>,
    errors: usize,
}

impl RunLog {
    /// Console-only log.
    pub fn console() -> Self {
        Self {
            file: None,
            errors: 0,
        }
    }

    /// Log mirrored to `path`, truncating it unless `append` is set.
    pub fn create<P: AsRef<Path>>(path: P, append: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)?;
        Ok(Self {
            file: Some(file),
            errors: 0,
        })
    }

    pub fn msg(&mut self, text: &str) {
        print!("{text}");
        let _ = io::stdout().flush();
        self.to_file(text);
    }

    /// Writes to the file only, for details that would clutter the console.
    pub fn note(&mut self, text: &str) {
        self.to_file(text);
    }

    /// Counts an error. The console copy goes through `tracing`.
    pub fn err(&mut self, text: &str) {
        self.errors += 1;
        error!("{}", text.trim_end());
        self.to_file(&format!("error: {text}"));
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    fn to_file(&mut self, text: &str) {
        if let Some(file) = self.file.as_mut() {
            // log file failures are not fatal
            let _ = file.write_all(text.as_bytes()).and_then(|_| file.flush());
        }
    }

    /// Start date and time, host and kernel, in the run log only.
    pub fn system_details(&mut self) {
        let now = Local::now();
        let text = format!(
            "system details: \n\tdate        = {} \n\ttime        = {} \n\tnodename    = {}\n\tsysname     = {}\n\trelease     = {}\n\tversion     = {}\n\tmachine     = {}\n",
            now.format("%d/%m/%y"),
            now.format("%H:%M:%S"),
            hostname(),
            kernel("ostype").unwrap_or_else(|| std::env::consts::OS.to_string()),
            kernel("osrelease").unwrap_or_else(|| "unknown".to_string()),
            kernel("version").unwrap_or_else(|| "unknown".to_string()),
            std::env::consts::ARCH,
        );
        self.note(&text);
    }

    /// Numbered list of the report columns for `mode`.
    pub fn column_legend(&mut self, mode: &ReportMode) {
        let mut text = String::from("\nColumn values: \ncol-num  col-value\n");
        for (i, column) in layout(mode).iter().enumerate() {
            text.push_str(&format!("{:>7}  {}\n", i + 1, column.field));
        }
        self.note(&text);
    }
}

/// Best-effort host name.
pub fn hostname() -> String {
    kernel("hostname")
        .or_else(|| std::env::var("HOSTNAME").ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// A value from `/proc/sys/kernel`, where the platform has one.
fn kernel(name: &str) -> Option<String> {
    fs::read_to_string(Path::new("/proc/sys/kernel").join(name))
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Local date and time as used in testset file names, `dd-mm-yy_HH-MM-SS`.
pub fn timestamp() -> String {
    Local::now().format("%d-%m-%y_%H-%M-%S").to_string()
}

/// Banner closing a verification run.
pub fn banner(passed: bool, global: bool) -> String {
    let verdict = if passed { "PASS" } else { "FAIL" };
    let rule = "*********************************************";
    let scope = if global { "GLOBAL:\n" } else { "" };
    format!("\n{rule}\n{scope}{verdict}\n{verdict}\n{verdict}\n{rule}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::CommandFamily;

    #[test]
    fn file_mirrors_messages_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let mut log = RunLog::create(&path, false).unwrap();
        log.msg("starting run...\n");
        log.err("parsing failed\n");
        log.note("details\n");
        assert_eq!(log.error_count(), 1);

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "starting run...\nerror: parsing failed\ndetails\n");

        let mut log = RunLog::create(&path, true).unwrap();
        log.note("more\n");
        assert!(fs::read_to_string(&path).unwrap().ends_with("details\nmore\n"));
    }

    #[test]
    fn legend_lists_every_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let mut log = RunLog::create(&path, false).unwrap();
        log.column_legend(&ReportMode::new(CommandFamily::ShortestPath, false));
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("      1  n\n"));
        assert!(content.contains("     28  buildHeap\n"));
    }

    #[test]
    fn details_carry_date_and_kernel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let mut log = RunLog::create(&path, false).unwrap();
        log.system_details();
        let content = fs::read_to_string(&path).unwrap();

        let date = regex::Regex::new(r"\tdate        = \d{2}/\d{2}/\d{2} \n\ttime        = \d{2}:\d{2}:\d{2} \n").unwrap();
        assert!(date.is_match(&content));
        for key in ["nodename", "sysname", "release", "version", "machine"] {
            assert!(content.contains(&format!("\t{key:<11} = ")), "{key} missing");
        }
    }

    #[test]
    fn timestamps_name_files() {
        let stamp = regex::Regex::new(r"^\d{2}-\d{2}-\d{2}_\d{2}-\d{2}-\d{2}$").unwrap();
        assert!(stamp.is_match(&timestamp()));
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn errors_are_emitted_once() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            RunLog::console().err("inCost = 42 dwCost = 50\n");
        });

        let out = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert_eq!(out.matches("inCost = 42 dwCost = 50").count(), 1);
    }

    #[test]
    fn banners() {
        assert!(banner(true, false).contains("PASS\nPASS\nPASS"));
        let global = banner(false, true);
        assert!(global.contains("GLOBAL:\nFAIL"));
    }
}
