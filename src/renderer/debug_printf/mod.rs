//! Routing of shader `debugPrintfEXT` output into the application log.
//!
//! The validation layer is configured through [`PrintfLayerSettings`] before the
//! instance exists, a single [`DebugMessenger`] receives the layer's messages,
//! strips the layer's metadata line and hands the remaining text to a [`LogSink`].

mod layer_settings;
mod log_sink;
mod messenger;

pub use layer_settings::{PrintfLayerSettings, VALIDATION_LAYER_NAME};
pub use log_sink::{LogLine, LogSink, SampleLog};
pub use messenger::DebugMessenger;

use ash::vk;

/// Remove the metadata the validation layer puts in front of a shader print.
///
/// Everything up to and including the first line break is dropped. A message
/// without any line break is passed through untouched.
pub fn clean_message(message: &str) -> &str {
    match message.find('\n') {
        Some(index) => &message[index + 1..],
        None => message,
    }
}

pub fn severity_to_level(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> log::Level {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::Level::Error
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::Level::Warn
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        log::Level::Info
    } else {
        log::Level::Debug
    }
}

/// Clean one layer message and append it to the sink
pub fn forward_message(
    sink: &dyn LogSink,
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message: &str,
) {
    sink.add_log(severity_to_level(severity), clean_message(message));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_layer_prefix_line() {
        let msg = "Validation Error: ...\nMy shader print: x=5";
        assert_eq!(clean_message(msg), "My shader print: x=5");
    }

    #[test]
    fn keeps_message_without_line_break() {
        let msg = "Validation Information: no newline here";
        assert_eq!(clean_message(msg), msg);
    }

    #[test]
    fn only_first_line_break_is_consumed() {
        let msg = "prefix\n\n[12, 34] Color: 1.0, 0.0, 0.0\n";
        assert_eq!(clean_message(msg), "\n[12, 34] Color: 1.0, 0.0, 0.0\n");
    }

    #[test]
    fn trailing_line_break_yields_empty_text() {
        assert_eq!(clean_message("prefix only\n"), "");
        assert_eq!(clean_message(""), "");
    }

    #[test]
    fn cleaned_text_is_suffix_after_first_break() {
        let cases = [
            "a\nb",
            "\nleading",
            "x | MessageID = 0x4fe1fef9 | vkQueueSubmit():\r\nvalue = 3",
            "one\ntwo\nthree",
        ];
        for msg in cases {
            let first = msg.find('\n').unwrap();
            assert_eq!(clean_message(msg), &msg[first + 1..]);
        }
    }

    #[test]
    fn severity_maps_to_log_level() {
        use vk::DebugUtilsMessageSeverityFlagsEXT as S;
        assert_eq!(severity_to_level(S::ERROR), log::Level::Error);
        assert_eq!(severity_to_level(S::WARNING), log::Level::Warn);
        assert_eq!(severity_to_level(S::INFO), log::Level::Info);
        assert_eq!(severity_to_level(S::VERBOSE), log::Level::Debug);
    }

    #[test]
    fn forward_message_appends_cleaned_text() {
        let sink = SampleLog::new(8);
        forward_message(
            &sink,
            vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
            "Validation Information: [ WARNING-DEBUG-PRINTF ]\n[3, 4] Color: 0.5, 0.5, 1.0",
        );
        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].level, log::Level::Info);
        assert_eq!(lines[0].text, "[3, 4] Color: 0.5, 0.5, 1.0");
    }
}
