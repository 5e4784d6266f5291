use client_core::StatusReporter;

/// Prints each status update as it happens: info to stdout, errors to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleStatus;

impl StatusReporter for ConsoleStatus {
    fn report(&mut self, message: &str, is_error: bool) {
        if is_error {
            eprintln!("error: {message}");
        } else {
            println!("{message}");
        }
    }
}
