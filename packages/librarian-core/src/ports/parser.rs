use async_trait::async_trait;

use crate::error::Result;
use crate::model::{File, Function, GraphEdge, Module};

/// Source language a file was parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    TypeScript,
    JavaScript,
    Rust,
    Go,
    Java,
    Other,
}

impl Language {
    pub fn from_extension(extension: &str) -> Self {
        match extension {
            "py" => Language::Python,
            "ts" | "tsx" => Language::TypeScript,
            "js" | "jsx" => Language::JavaScript,
            "rs" => Language::Rust,
            "go" => Language::Go,
            "java" => Language::Java,
            _ => Language::Other,
        }
    }
}

/// What a parse of a single file yields: the normalized file record plus
/// every function/module/edge extracted from its syntax tree.
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub functions: Vec<Function>,
    pub modules: Vec<Module>,
    pub edges: Vec<GraphEdge>,
}

/// Driven port over a language's concrete syntax-tree parser.
///
/// Infrastructure implements this per language (tree-sitter grammars,
/// language servers, etc); the generator only ever depends on this trait.
#[async_trait]
pub trait ParserRegistry: Send + Sync {
    fn supports(&self, language: Language) -> bool;

    async fn parse(&self, file: &File, content: &str) -> Result<ParsedFile>;
}

/// In-memory registry for tests: returns a single function spanning the
/// whole file body, with no edges or nested modules. Enough to exercise
/// callers without a real grammar.
#[derive(Debug, Default)]
pub struct StaticParserRegistry;

#[async_trait]
impl ParserRegistry for StaticParserRegistry {
    fn supports(&self, _language: Language) -> bool {
        true
    }

    async fn parse(&self, file: &File, content: &str) -> Result<ParsedFile> {
        let line_count = content.lines().count().max(1) as u32;
        let name = file
            .path
            .rsplit('/')
            .next()
            .unwrap_or(&file.path)
            .to_string();
        let function = Function::new(&file.path, name, content.lines().next().unwrap_or(""), 1, line_count)?;
        Ok(ParsedFile {
            functions: vec![function],
            modules: Vec::new(),
            edges: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_registry_yields_one_function_per_file() {
        let registry = StaticParserRegistry;
        let file = File::new("a.py", "h1", "python");
        let parsed = registry.parse(&file, "def foo():\n    pass\n").await.unwrap();
        assert_eq!(parsed.functions.len(), 1);
        assert_eq!(parsed.functions[0].end_line, 2);
    }

    #[test]
    fn language_from_extension_recognizes_known_suffixes() {
        assert_eq!(Language::from_extension("py"), Language::Python);
        assert_eq!(Language::from_extension("rs"), Language::Rust);
        assert_eq!(Language::from_extension("xyz"), Language::Other);
    }
}
