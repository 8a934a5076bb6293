//! Single-file transforms on top of OXC: TypeScript stripping for the
//! mirror backend and isolated declaration emit for `.d.ts` output.

use std::path::Path;

use oxc_allocator::Allocator;
use oxc_codegen::Codegen;
use oxc_isolated_declarations::{IsolatedDeclarations, IsolatedDeclarationsOptions};
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{TransformOptions, Transformer};

use crate::{Error, Result};

/// Transpiles one TypeScript/JSX module to plain JavaScript.
///
/// Type annotations and type-only imports are removed; module syntax is
/// kept as written.
pub fn transpile_module(source: &str, file_path: &Path) -> Result<String> {
    let allocator = Allocator::default();
    let source_type = source_type(file_path)?;

    let parse_result = Parser::new(&allocator, source, source_type).parse();
    if !parse_result.errors.is_empty() {
        return Err(transform_error(file_path, "Failed to parse", &parse_result.errors));
    }
    let mut program = parse_result.program;

    let scoping = SemanticBuilder::new().build(&program).semantic.into_scoping();
    let options = TransformOptions::default();
    let transformed =
        Transformer::new(&allocator, file_path, &options).build_with_scoping(scoping, &mut program);
    if !transformed.errors.is_empty() {
        return Err(transform_error(file_path, "Failed to transform", &transformed.errors));
    }

    Ok(Codegen::new().build(&program).code)
}

/// Emits the `.d.ts` text for one TypeScript module.
pub fn generate_declaration(source: &str, file_path: &Path) -> Result<String> {
    let allocator = Allocator::default();
    let source_type = source_type(file_path)?;

    let parse_result = Parser::new(&allocator, source, source_type).parse();
    if !parse_result.errors.is_empty() {
        return Err(transform_error(file_path, "Failed to parse", &parse_result.errors));
    }

    let options = IsolatedDeclarationsOptions {
        strip_internal: true,
    };
    let dts_result = IsolatedDeclarations::new(&allocator, options).build(&parse_result.program);
    if !dts_result.errors.is_empty() {
        return Err(transform_error(
            file_path,
            "Errors generating declarations",
            &dts_result.errors,
        ));
    }

    Ok(Codegen::new().build(&dts_result.program).code)
}

fn source_type(file_path: &Path) -> Result<SourceType> {
    SourceType::from_path(file_path).map_err(|e| Error::Transform {
        path: file_path.to_path_buf(),
        message: format!("{e:?}"),
    })
}

fn transform_error<E: std::fmt::Debug>(file_path: &Path, what: &str, errors: &[E]) -> Error {
    let messages: Vec<String> = errors.iter().map(|e| format!("{e:?}")).collect();
    Error::Transform {
        path: file_path.to_path_buf(),
        message: format!("{what}: {}", messages.join(", ")),
    }
}
