use crate::span::Span;
use std::path::PathBuf;
use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    #[error("{span}: syntax error: {msg}")]
    Syntax { msg: String, span: Span },

    #[error("{span}: semantic error: {msg}")]
    Semantic { msg: String, span: Span },

    #[error("{span}: unable to resolve class '{class}'")]
    Resolution { class: String, span: Span },

    #[error("{span}: internal error: {msg}")]
    Internal { msg: String, span: Span },

    #[error("{span}: codegen error: {msg}")]
    Codegen { msg: String, span: Span },

    #[error("config error: {msg}")]
    Config { msg: String, path: PathBuf },
}

impl CompileError {
    pub fn syntax(msg: impl Into<String>, span: Span) -> Self {
        Self::Syntax { msg: msg.into(), span }
    }

    pub fn semantic(msg: impl Into<String>, span: Span) -> Self {
        Self::Semantic { msg: msg.into(), span }
    }

    pub fn resolution(class: impl Into<String>, span: Span) -> Self {
        Self::Resolution { class: class.into(), span }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal { msg: msg.into(), span: Span::dummy() }
    }

    pub fn internal_at(msg: impl Into<String>, span: Span) -> Self {
        Self::Internal { msg: msg.into(), span }
    }

    pub fn codegen(msg: impl Into<String>, span: Span) -> Self {
        Self::Codegen { msg: msg.into(), span }
    }

    pub fn config(msg: impl Into<String>, path: PathBuf) -> Self {
        Self::Config { msg: msg.into(), path }
    }

    /// Source position of the failure, when it has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Syntax { span, .. }
            | Self::Semantic { span, .. }
            | Self::Resolution { span, .. }
            | Self::Internal { span, .. }
            | Self::Codegen { span, .. } => Some(*span),
            Self::Config { .. } => None,
        }
    }

    /// Bare message without the position prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Syntax { msg, .. }
            | Self::Semantic { msg, .. }
            | Self::Internal { msg, .. }
            | Self::Codegen { msg, .. }
            | Self::Config { msg, .. } => msg.clone(),
            Self::Resolution { class, .. } => format!("unable to resolve class '{class}'"),
        }
    }
}

/// Render a CompileError with ariadne for terminal output.
pub fn render_error(source: &str, filename: &str, err: &CompileError) {
    use ariadne::{Label, Report, ReportKind, Source};

    match err {
        CompileError::Config { msg, path } => {
            eprintln!("error[config]: {msg}");
            eprintln!("  --> {}", path.display());
        }
        _ => {
            let span = err.span().unwrap_or_default();
            let kind_str = match err {
                CompileError::Syntax { .. } => "syntax",
                CompileError::Semantic { .. } => "semantic",
                CompileError::Resolution { .. } => "resolution",
                CompileError::Internal { .. } => "internal",
                _ => "codegen",
            };
            let end = span.end.max(span.start).min(source.len());
            let start = span.start.min(end);
            let printed = Report::build(ReportKind::Error, filename, start)
                .with_message(format!("{kind_str} error"))
                .with_label(Label::new((filename, start..end)).with_message(err.message()))
                .finish()
                .eprint((filename, Source::from(source)));
            if printed.is_err() {
                eprintln!("error: {err}");
            }
        }
    }
}
