//! Extension-based compiler resolution.

use std::path::Path;

use quire_core::{RawOptions, priority_order};
use regex::Regex;
use tracing::{debug, trace};

use crate::{
    Compiler, CompilerError, MarkdownCompiler, PassThroughCompiler, ResolutionError, Result,
};

/// Output of a compiler run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiled {
    pub content: String,
    /// The compiler's output extension, whatever the source extension was.
    pub extension: String,
    pub compiler: String,
}

struct Registered {
    compiler: Box<dyn Compiler>,
    ignored: Vec<Regex>,
}

impl Registered {
    fn handles(&self, extension: &str) -> bool {
        self.compiler
            .source_extensions()
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    }

    fn ignores(&self, file_name: &str) -> bool {
        self.ignored.iter().any(|re| re.is_match(file_name))
    }
}

/// Registered compilers, in registration order.
#[derive(Default)]
pub struct CompilerRegistry {
    compilers: Vec<Registered>,
}

impl std::fmt::Debug for CompilerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.compilers.iter().map(|r| r.compiler.name()))
            .finish()
    }
}

impl CompilerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the Markdown and pass-through compilers.
    pub fn with_defaults() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(MarkdownCompiler::new())?;
        registry.register(PassThroughCompiler)?;
        Ok(registry)
    }

    pub fn register(&mut self, compiler: impl Compiler + 'static) -> Result<()> {
        self.register_boxed(Box::new(compiler))
    }

    /// Register a compiler, compiling its ignore patterns.
    pub fn register_boxed(&mut self, compiler: Box<dyn Compiler>) -> Result<()> {
        let ignored = compiler
            .ignored_patterns()
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| CompilerError::InvalidPattern {
                    compiler: compiler.name().to_string(),
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            compiler = compiler.name(),
            priority = compiler.priority(),
            "registered compiler"
        );
        self.compilers.push(Registered { compiler, ignored });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.compilers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compilers.is_empty()
    }

    /// Every source extension some compiler handles, lowercased and deduplicated.
    pub fn source_extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self
            .compilers
            .iter()
            .flat_map(|r| r.compiler.source_extensions().iter())
            .map(|e| e.to_ascii_lowercase())
            .collect();
        extensions.sort();
        extensions.dedup();
        extensions
    }

    /// The compiler for `extension`.
    pub fn resolve(&self, extension: &str) -> std::result::Result<&dyn Compiler, ResolutionError> {
        self.select(extension, None)
    }

    /// The compiler for a file, honouring ignore patterns.
    ///
    /// Only the file name is matched against ignore patterns, never its directory.
    pub fn resolve_for(&self, file: &str) -> std::result::Result<&dyn Compiler, ResolutionError> {
        let path = Path::new(file);
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file);
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.select(extension, Some(file_name))
    }

    fn select(
        &self,
        extension: &str,
        file_name: Option<&str>,
    ) -> std::result::Result<&dyn Compiler, ResolutionError> {
        let extension = extension.trim_start_matches('.');
        let candidates: Vec<&Registered> =
            self.compilers.iter().filter(|r| r.handles(extension)).collect();
        if candidates.is_empty() {
            return Err(ResolutionError::NoCompiler {
                extension: extension.to_string(),
            });
        }

        let eligible: Vec<&Registered> = match file_name {
            Some(name) => candidates.into_iter().filter(|r| !r.ignores(name)).collect(),
            None => candidates,
        };

        let order = priority_order(eligible.iter().map(|r| r.compiler.priority()));
        match order.first() {
            Some(&index) => {
                let chosen = eligible[index].compiler.as_ref();
                trace!(extension, compiler = chosen.name(), "resolved compiler");
                Ok(chosen)
            }
            None => Err(ResolutionError::Ignored {
                file_name: file_name.unwrap_or_default().to_string(),
            }),
        }
    }

    /// Compile `input` written in `extension`.
    pub fn compile(&self, extension: &str, input: &str, data: &RawOptions) -> Result<Compiled> {
        let compiler = self.resolve(extension)?;
        run(compiler, extension.trim_start_matches('.'), input, data)
    }

    /// Compile a file's contents, resolving by its name.
    pub fn compile_file(&self, file: &str, input: &str, data: &RawOptions) -> Result<Compiled> {
        let compiler = self.resolve_for(file)?;
        let extension = Path::new(file)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        run(compiler, extension, input, data)
    }
}

fn run(compiler: &dyn Compiler, extension: &str, input: &str, data: &RawOptions) -> Result<Compiled> {
    let content = compiler
        .compile(extension, input, data)
        .map_err(|source| CompilerError::Compile {
            compiler: compiler.name().to_string(),
            source,
        })?;
    Ok(Compiled {
        content,
        extension: compiler.output_extension().to_string(),
        compiler: compiler.name().to_string(),
    })
}
