//! The render APIs the checker understands, tried in priority order.

use std::fmt;

/// Why a recognised call's arguments could not be analysed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedArgument {
    pub reason: String,
}

impl UnsupportedArgument {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for UnsupportedArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Access to the arguments of one call expression.
pub trait ArgumentSource {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Template name passed at `index`.
    fn template_name(&self, index: usize) -> Result<String, UnsupportedArgument>;

    /// Data keys passed at `index`.
    fn supplied_keys(&self, index: usize) -> Result<Vec<String>, UnsupportedArgument>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    TemplatesSet,
    HtmlTemplate,
    TextTemplate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentShape {
    /// The call names its template and passes data at fixed positions.
    NameAndData { name: usize, data: usize },
    /// Recognised, but the template cannot be named statically.
    Unsupported { reason: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingExtractor {
    pub kind: BindingKind,
    pub receiver_types: &'static [&'static str],
    pub methods: &'static [&'static str],
    pub arguments: ArgumentShape,
}

/// Template name and data keys of one render call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedCall {
    pub template_name: String,
    pub supplied_keys: Vec<String>,
}

const TEMPLATES_SET: &[&str] = &[
    "github.com/go-web-framework/templates.Set",
    "*github.com/go-web-framework/templates.Set",
];
const HTML_TEMPLATE: &[&str] = &["html/template.Template", "*html/template.Template"];
const TEXT_TEMPLATE: &[&str] = &["text/template.Template", "*text/template.Template"];

/// html/template comes before text/template; both share method names.
pub static REGISTRY: &[BindingExtractor] = &[
    BindingExtractor {
        kind: BindingKind::TemplatesSet,
        receiver_types: TEMPLATES_SET,
        methods: &["Execute"],
        arguments: ArgumentShape::NameAndData { name: 0, data: 2 },
    },
    BindingExtractor {
        kind: BindingKind::HtmlTemplate,
        receiver_types: HTML_TEMPLATE,
        methods: &["ExecuteTemplate"],
        arguments: ArgumentShape::NameAndData { name: 1, data: 2 },
    },
    BindingExtractor {
        kind: BindingKind::TextTemplate,
        receiver_types: TEXT_TEMPLATE,
        methods: &["ExecuteTemplate"],
        arguments: ArgumentShape::NameAndData { name: 1, data: 2 },
    },
    BindingExtractor {
        kind: BindingKind::HtmlTemplate,
        receiver_types: HTML_TEMPLATE,
        methods: &["Execute"],
        arguments: ArgumentShape::Unsupported {
            reason: "html/template Execute does not name its template",
        },
    },
    BindingExtractor {
        kind: BindingKind::TextTemplate,
        receiver_types: TEXT_TEMPLATE,
        methods: &["Execute"],
        arguments: ArgumentShape::Unsupported {
            reason: "text/template Execute does not name its template",
        },
    },
];

/// First registered extractor matching a receiver type and method name.
pub fn find(type_name: &str, method: &str) -> Option<&'static BindingExtractor> {
    REGISTRY.iter().find(|extractor| extractor.matches(type_name, method))
}

impl BindingExtractor {
    pub fn matches(&self, type_name: &str, method: &str) -> bool {
        self.receiver_types.contains(&type_name) && self.methods.contains(&method)
    }

    pub fn extract(
        &self,
        arguments: &impl ArgumentSource,
    ) -> Result<ExtractedCall, UnsupportedArgument> {
        match self.arguments {
            ArgumentShape::Unsupported { reason } => Err(UnsupportedArgument::new(reason)),
            ArgumentShape::NameAndData { name, data } => {
                let needed = name.max(data) + 1;
                if arguments.len() < needed {
                    return Err(UnsupportedArgument::new(format!(
                        "expected at least {needed} arguments, found {}",
                        arguments.len()
                    )));
                }
                Ok(ExtractedCall {
                    template_name: arguments.template_name(name)?,
                    supplied_keys: arguments.supplied_keys(data)?,
                })
            }
        }
    }
}
