use std::fmt;
use std::sync::Arc;

/// Progress sink: `(current, total, message)`.
pub type ProgressFn = Arc<dyn Fn(usize, usize, &str) + Send + Sync>;

/// Best-effort workload reporter. Without a callback every call is a no-op.
#[derive(Clone, Default)]
pub struct Progress {
    callback: Option<ProgressFn>,
    message: String,
    total: usize,
    current: usize,
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("has_callback", &self.callback.is_some())
            .field("message", &self.message)
            .field("total", &self.total)
            .field("current", &self.current)
            .finish()
    }
}

impl Progress {
    pub fn new(callback: Option<ProgressFn>) -> Self {
        Self {
            callback,
            ..Self::default()
        }
    }

    pub fn begin(&mut self, message: &str, total: usize) {
        self.message.clear();
        self.message.push_str(message);
        self.total = total;
        self.current = 0;
        self.emit();
    }

    pub fn step(&mut self) {
        self.current = (self.current + 1).min(self.total);
        self.emit();
    }

    pub fn done(&mut self) {
        self.current = self.total;
        self.emit();
    }

    pub fn current(&self) -> usize {
        self.current
    }

    fn emit(&self) {
        if let Some(cb) = &self.callback {
            cb(self.current, self.total, &self.message);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::{Progress, ProgressFn};

    #[test]
    fn reports_steps_to_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cb: ProgressFn = Arc::new(move |cur: usize, total: usize, msg: &str| {
            sink.lock().unwrap().push((cur, total, msg.to_owned()));
        });
        let mut progress = Progress::new(Some(cb));

        progress.begin("Building", 2);
        progress.step();
        progress.step();
        progress.step();
        progress.done();

        let seen = seen.lock().unwrap();
        let counts: Vec<(usize, usize)> = seen.iter().map(|(c, t, _)| (*c, *t)).collect();
        assert_eq!(counts, vec![(0, 2), (1, 2), (2, 2), (2, 2), (2, 2)]);
        assert!(seen.iter().all(|(_, _, m)| m == "Building"));
    }

    #[test]
    fn silent_without_callback() {
        let mut progress = Progress::default();
        progress.begin("noop", 3);
        progress.step();
        assert_eq!(progress.current(), 1);
    }
}
