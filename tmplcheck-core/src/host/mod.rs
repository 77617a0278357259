//! Host-side analysis: loading a Go package, parsing it with tree-sitter
//! and finding render calls together with the data they pass.

mod arguments;
mod scope;
mod usages;

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tmplcheck_support::{fs_error, package_error, unquote};
use tree_sitter::{Node, Parser, Tree};

use crate::error::CheckError;
use crate::source::SourceFile;

pub use arguments::CallArguments;
pub use scope::{Binding, Resolver};
pub use usages::{extract_usages, CallSiteUsage, UsageExtraction, UsagesByTemplate};

/// A parsed Go package: every non-test `.go` file of one directory.
#[derive(Debug)]
pub struct HostPackage {
    /// Import path used to qualify the package's own type names.
    pub import_path: String,
    pub files: Vec<HostFile>,
}

#[derive(Debug)]
pub struct HostFile {
    pub source: SourceFile,
    pub tree: Tree,
    /// Local package name to import path.
    pub imports: HashMap<String, String>,
}

impl HostFile {
    pub fn text(&self, node: Node<'_>) -> &str {
        node.utf8_text(self.source.contents.as_bytes()).unwrap_or("")
    }
}

/// Resolves `-p` to a package directory and its import path. A path that is
/// an existing directory is used as is; anything else is looked up under
/// each `$GOPATH/src` (default `$HOME/go`).
pub fn locate_package(package: &str) -> Result<(PathBuf, String), CheckError> {
    let direct = Path::new(package);
    if direct.is_dir() {
        let import_path = gopath_import_path(direct).unwrap_or_default();
        return Ok((direct.to_path_buf(), import_path));
    }

    let roots = gopath_entries();
    for root in &roots {
        let candidate = root.join("src").join(package);
        if candidate.is_dir() {
            return Ok((candidate, package.to_string()));
        }
    }

    let searched = roots
        .iter()
        .map(|root| root.join("src").display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Err(CheckError::PackageNotFound(package_error(
        "locate",
        package,
        format!("not a directory and not found under {searched}"),
    )))
}

fn gopath_entries() -> Vec<PathBuf> {
    match env::var_os("GOPATH") {
        Some(value) if !value.is_empty() => env::split_paths(&value).collect(),
        _ => dirs_next::home_dir()
            .map(|home| vec![home.join("go")])
            .unwrap_or_default(),
    }
}

/// Import path of a directory that lives under some `$GOPATH/src`.
fn gopath_import_path(dir: &Path) -> Option<String> {
    let dir = dir.canonicalize().ok()?;
    gopath_entries().iter().find_map(|root| {
        let src = root.join("src").canonicalize().ok()?;
        dir.strip_prefix(&src).ok().map(slash_path)
    })
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Reads and parses the package named by `package`. Files are taken from
/// the package directory only, in name order, skipping `_test.go` files.
pub fn load_package(package: &str) -> Result<HostPackage, CheckError> {
    let (dir, import_path) = locate_package(package)?;
    let display = dir.display().to_string();

    let mut names = Vec::new();
    let entries =
        fs::read_dir(&dir).map_err(|err| CheckError::io(fs_error("readDir", &display, &err), err))?;
    for entry in entries {
        let entry = entry.map_err(|err| CheckError::io(fs_error("readDir", &display, &err), err))?;
        let is_file = entry.file_type().map(|kind| kind.is_file()).unwrap_or(false);
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_file && name.ends_with(".go") && !name.ends_with("_test.go") {
            names.push(name);
        }
    }
    names.sort();

    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_go::language())
        .map_err(|err| CheckError::Grammar(err.to_string()))?;

    let mut files = Vec::with_capacity(names.len());
    for name in names {
        let path = dir.join(&name);
        let contents = fs::read_to_string(&path).map_err(|err| {
            CheckError::io(fs_error("read", &path.display().to_string(), &err), err)
        })?;
        let source = SourceFile::new(name, contents);
        files.push(parse_file(&mut parser, source)?);
    }

    let import_path = if import_path.is_empty() {
        files
            .first()
            .and_then(package_clause_name)
            .unwrap_or_default()
    } else {
        import_path
    };

    Ok(HostPackage { import_path, files })
}

/// Parses one Go source file. Any syntax error is fatal.
pub fn parse_file(parser: &mut Parser, source: SourceFile) -> Result<HostFile, CheckError> {
    let tree = parser
        .parse(&source.contents, None)
        .ok_or_else(|| CheckError::HostParse {
            path: source.name.clone(),
            line: 1,
            column: 1,
        })?;

    let root = tree.root_node();
    if root.has_error() {
        let position = first_error(root)
            .unwrap_or(root)
            .start_position();
        return Err(CheckError::HostParse {
            path: source.name.clone(),
            line: position.row + 1,
            column: position.column + 1,
        });
    }

    let imports = collect_imports(root, &source.contents);
    Ok(HostFile {
        source,
        tree,
        imports,
    })
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error() || child.is_missing())
        .find_map(first_error)
}

fn collect_imports(root: Node<'_>, source: &str) -> HashMap<String, String> {
    let mut imports = HashMap::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        match node.kind() {
            "source_file" | "import_declaration" | "import_spec_list" => {
                let mut cursor = node.walk();
                stack.extend(node.named_children(&mut cursor));
            }
            "import_spec" => {
                let Some(path_node) = node.child_by_field_name("path") else {
                    continue;
                };
                let raw = path_node.utf8_text(source.as_bytes()).unwrap_or("");
                let Ok(path) = unquote(raw) else {
                    continue;
                };
                let alias = match node.child_by_field_name("name") {
                    // Dot and blank imports bring no usable qualifier.
                    Some(name) if name.kind() != "package_identifier" => continue,
                    Some(name) => name.utf8_text(source.as_bytes()).unwrap_or("").to_string(),
                    None => default_package_name(&path),
                };
                imports.insert(alias, path);
            }
            _ => {}
        }
    }

    imports
}

/// Package name Go code conventionally uses for an import path:
/// `github.com/a/b` gives `b`, `example.com/mod/v2` gives `mod`,
/// `gopkg.in/yaml.v3` gives `yaml`.
pub fn default_package_name(import_path: &str) -> String {
    let mut segments = import_path.rsplit('/');
    let mut last = segments.next().unwrap_or(import_path);
    if is_major_version(last) {
        if let Some(previous) = segments.next() {
            last = previous;
        }
    }
    last.split('.').next().unwrap_or(last).to_string()
}

fn is_major_version(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
}

fn package_clause_name(file: &HostFile) -> Option<String> {
    let root = file.tree.root_node();
    let mut cursor = root.walk();
    let clause = root
        .named_children(&mut cursor)
        .find(|child| child.kind() == "package_clause")?;
    let mut inner = clause.walk();
    let name = clause
        .named_children(&mut inner)
        .find(|child| child.kind() == "package_identifier")?;
    Some(file.text(name).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_default_package_names() {
        assert_eq!(default_package_name("html/template"), "template");
        assert_eq!(
            default_package_name("github.com/go-web-framework/templates"),
            "templates"
        );
        assert_eq!(default_package_name("example.com/mod/v2"), "mod");
        assert_eq!(default_package_name("gopkg.in/yaml.v3"), "yaml");
    }
}
