//! Line-oriented diagnostics sink provided by the host command

/// Where the rewriters report what they did
pub trait Io {
    fn write_line(&mut self, line: &str);

    fn write_error_line(&mut self, line: &str);

    fn is_debug(&self) -> bool;

    fn write_debug_line(&mut self, line: &str) {
        if self.is_debug() {
            self.write_line(line);
        }
    }
}

/// Writes info lines to stdout and errors to stderr
///
/// In quiet mode info lines are dropped so stdout stays free for JSON output.
#[derive(Debug, Default)]
pub struct ConsoleIo {
    debug: bool,
    quiet: bool,
}

impl ConsoleIo {
    pub fn new(debug: bool, quiet: bool) -> Self {
        Self { debug, quiet }
    }
}

impl Io for ConsoleIo {
    fn write_line(&mut self, line: &str) {
        if !self.quiet {
            println!("{}", line);
        }
    }

    fn write_error_line(&mut self, line: &str) {
        eprintln!("{}", line);
    }

    fn is_debug(&self) -> bool {
        self.debug
    }
}

/// Collects lines in memory
#[derive(Debug, Default)]
pub struct BufferedIo {
    pub output: Vec<String>,
    pub errors: Vec<String>,
    debug: bool,
}

impl BufferedIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug() -> Self {
        Self {
            debug: true,
            ..Self::default()
        }
    }
}

impl Io for BufferedIo {
    fn write_line(&mut self, line: &str) {
        self.output.push(line.to_string());
    }

    fn write_error_line(&mut self, line: &str) {
        self.errors.push(line.to_string());
    }

    fn is_debug(&self) -> bool {
        self.debug
    }
}
