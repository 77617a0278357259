mod analysis;
mod bindings;
mod check;
mod config;
mod diagnostics;
mod error;
mod report;
mod source;

pub mod host;
pub mod template;

pub use crate::analysis::{analyze, Analysis};
pub use crate::bindings::{
    find as find_binding, ArgumentShape, ArgumentSource, BindingExtractor, BindingKind,
    ExtractedCall, UnsupportedArgument, REGISTRY,
};
pub use crate::check::{check, check_template, CheckResult, MissingFieldDiagnostic};
pub use crate::config::{
    Config, Delimiters, OutputFormat, UnsupportedCallPolicy, DEFAULT_LEFT_DELIM,
    DEFAULT_RIGHT_DELIM,
};
pub use crate::diagnostics::{Diagnostic, Diagnostics, Location};
pub use crate::error::CheckError;
pub use crate::host::{CallSiteUsage, UsagesByTemplate};
pub use crate::report::{render, render_json, render_plain};
pub use crate::source::SourceFile;
pub use crate::template::{FieldReference, FieldsByTemplate};
