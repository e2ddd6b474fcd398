use std::fmt::{Display, Formatter, Result as FmtResult};

use super::{ListView, ServerStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
    Warning,
    Info,
}

/// A short-lived message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }
}

impl Display for Notice {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let tag = match self.level {
            NoticeLevel::Success => "OK",
            NoticeLevel::Error => "ERROR",
            NoticeLevel::Warning => "WARN",
            NoticeLevel::Info => "INFO",
        };
        write!(f, "[{}] {}", tag, self.message)
    }
}

/// Where the controller renders its output.
pub trait Screen: Send + Sync {
    fn notify(&self, notice: Notice);

    fn show_documents(&self, view: &ListView);

    fn show_status(&self, status: &ServerStatus);
}

pub struct ConsoleScreen;

impl Screen for ConsoleScreen {
    fn notify(&self, notice: Notice) {
        log::debug!("notice: {:?}", notice);
        match notice.level {
            NoticeLevel::Error | NoticeLevel::Warning => eprintln!("{}", notice),
            NoticeLevel::Success | NoticeLevel::Info => println!("{}", notice),
        }
    }

    fn show_documents(&self, view: &ListView) {
        println!("\nDocuments ({}):", view.total_files);
        if view.cards.is_empty() {
            println!("\tNo documents uploaded yet");
        }
        for card in &view.cards {
            println!("\t{}", card);
        }
    }

    fn show_status(&self, status: &ServerStatus) {
        println!("Server: {}", status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_display() {
        assert_eq!(Notice::success("done").to_string(), "[OK] done");
        assert_eq!(Notice::warning("careful").to_string(), "[WARN] careful");
        assert_eq!(Notice::error("boom").level, NoticeLevel::Error);
    }
}
