//! Text-level merge of generated test methods into an existing class
//!
//! The existing test body is opaque generated text, not an AST; the only
//! structural promise is matched braces around one top-level class. A
//! depth counter is therefore the whole mechanism: it isolates the class
//! body from the wrapper without mistaking a lambda's or anonymous
//! class's brace for the class's closing brace. No tokenizer, no parser.

use std::sync::LazyLock;

use regex::Regex;

/// `class Foo ... {` — start of the wrapper in generated code
static CLASS_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bclass\s+\w+[^{]*\{").expect("hardcoded class-open regex"));

/// A `@Test`/`@ParameterizedTest` annotation followed — through further
/// annotations (argument lists like `@ValueSource(ints = {1, 2})`
/// included) and modifiers — by a void method declaration
static TEST_METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"@(?:ParameterizedTest|Test)\b(?:\s*\([^)]*\))?(?:\s*@\w+(?:\s*\([^)]*\))?)*\s*(?:(?:public|protected|private|static|final)\s+)*void\s+(\w+)\s*\(",
    )
    .expect("hardcoded test-method regex")
});

/// Extract the class-body interior of generated test code.
///
/// Depth-scans from the first `class ... {` match; the interior between
/// that brace and its matching close is the method text to splice. Code
/// with no class wrapper is treated as bare methods and returned whole.
/// Unbalanced braces yield `None` — splicing a torn body would corrupt
/// the target.
pub fn extract_method_bodies(generated: &str) -> Option<String> {
    let Some(open) = CLASS_OPEN_RE.find(generated) else {
        let bare = trim_blank_lines(generated);
        return if bare.is_empty() {
            None
        } else {
            Some(bare.to_string())
        };
    };

    let body_start = open.end();
    let mut depth = 1usize;
    for (offset, ch) in generated[body_start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let interior = trim_blank_lines(&generated[body_start..body_start + offset]);
                    return if interior.is_empty() {
                        None
                    } else {
                        Some(interior.to_string())
                    };
                }
            }
            _ => {}
        }
    }
    tracing::warn!("Generated code has unbalanced braces; refusing to extract methods");
    None
}

/// Splice `methods` into `existing` immediately before its last
/// top-level closing brace.
///
/// `None` when the existing content has no closing brace at all — the
/// caller keeps the original content untouched (fail-safe, never
/// fail-destructive).
pub fn splice_before_final_brace(existing: &str, methods: &str) -> Option<String> {
    let close = existing.rfind('}')?;
    let (head, tail) = existing.split_at(close);
    let mut merged = String::with_capacity(existing.len() + methods.len() + 8);
    merged.push_str(head.trim_end());
    merged.push_str("\n\n");
    merged.push_str(methods);
    if !methods.ends_with('\n') {
        merged.push('\n');
    }
    merged.push_str(tail);
    Some(merged)
}

/// Strip leading and trailing blank lines while preserving the first
/// content line's indentation (a plain `trim` would eat it and misalign
/// the spliced block)
fn trim_blank_lines(text: &str) -> &str {
    let text = text.trim_end();
    let Some(first_content) = text.find(|c: char| !c.is_whitespace()) else {
        return "";
    };
    let line_start = text[..first_content].rfind('\n').map_or(0, |n| n + 1);
    &text[line_start..]
}

/// Names of test methods declared in `code`, by annotation match
pub fn extract_test_method_names(code: &str) -> Vec<String> {
    TEST_METHOD_RE
        .captures_iter(code)
        .map(|c| c[1].to_string())
        .collect()
}
