use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Destination of cleaned shader prints.
///
/// The layer may call in from any thread, so implementations serialize their
/// own appends.
pub trait LogSink: Send + Sync {
    fn add_log(&self, level: log::Level, text: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub level: log::Level,
    pub text: String,
}

/// Bounded history of shader prints that also mirrors every line to `log`
pub struct SampleLog {
    lines: Mutex<VecDeque<LogLine>>,
    capacity: usize,
}

impl SampleLog {
    pub const TARGET: &'static str = "shader_printf";

    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    pub fn lines(&self) -> Vec<LogLine> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn last(&self) -> Option<LogLine> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .back()
            .cloned()
    }
}

impl LogSink for SampleLog {
    fn add_log(&self, level: log::Level, text: &str) {
        log::log!(target: Self::TARGET, level, "{}", text);

        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(LogLine {
            level,
            text: text.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn keeps_most_recent_lines() {
        let log = SampleLog::new(2);
        log.add_log(log::Level::Info, "a");
        log.add_log(log::Level::Info, "b");
        log.add_log(log::Level::Warn, "c");

        let texts: Vec<_> = log.lines().into_iter().map(|l| l.text).collect();
        assert_eq!(texts, ["b", "c"]);
        assert_eq!(log.last().map(|l| l.level), Some(log::Level::Warn));
    }

    #[test]
    fn concurrent_appends_are_not_lost() {
        let log = Arc::new(SampleLog::new(1000));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        log.add_log(log::Level::Info, &format!("{t}:{i}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(log.lines().len(), 400);
    }
}
