/// One host source file of the analysed package.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// File name relative to the package directory; used in reports.
    pub name: String,
    pub contents: String,
}

impl SourceFile {
    pub fn new(name: String, contents: String) -> Self {
        Self { name, contents }
    }
}
