/// Where the pipeline stages report progress and failures. Stages take this as an argument
/// instead of reaching for a global logger.
pub trait Diagnostics {
    fn info(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}

/// Forwards everything to the `log` facade.
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn info(&mut self, msg: &str) {
        info!("{msg}");
    }

    fn error(&mut self, msg: &str) {
        error!("{msg}");
    }
}

/// Keeps every message, in order.
#[derive(Default)]
pub struct MemoryDiagnostics {
    pub info: Vec<String>,
    pub errors: Vec<String>,
}

impl Diagnostics for MemoryDiagnostics {
    fn info(&mut self, msg: &str) {
        self.info.push(msg.to_string());
    }

    fn error(&mut self, msg: &str) {
        self.errors.push(msg.to_string());
    }
}
