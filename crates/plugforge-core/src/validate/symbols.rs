//! Deterministic symbol extraction from generated file content.
//!
//! Class-kind files declare symbols via `class`/`interface`/`enum`
//! declarations and reference other files via `extends`, `implements`,
//! `new`, and `import` sites. Manifests reference the main class through
//! the `main:` key. Config and resource files declare and reference
//! nothing.

use crate::spec::FileKind;

/// Return `true` for characters that can appear in a Java-style identifier.
fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Split a line into identifier-shaped tokens.
fn identifiers(line: &str) -> Vec<&str> {
    line.split(|c: char| !is_ident_char(c))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Strip a trailing line comment (`//` for class files, `#` for YAML-ish).
fn strip_comment<'a>(line: &'a str, marker: &str) -> &'a str {
    match line.find(marker) {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn push_unique(out: &mut Vec<String>, sym: &str) {
    if !sym.is_empty() && !out.iter().any(|s| s == sym) {
        out.push(sym.to_owned());
    }
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// Extract the symbols a file declares, in source order, deduplicated.
///
/// Only class-kind files declare symbols; other kinds return an empty list.
pub fn declared_symbols(kind: FileKind, content: &str) -> Vec<String> {
    match kind {
        FileKind::MainClass | FileKind::Feature => class_declarations(content),
        FileKind::Manifest | FileKind::Config | FileKind::Resource => Vec::new(),
    }
}

fn class_declarations(content: &str) -> Vec<String> {
    let mut out = Vec::new();
    for line in content.lines() {
        let line = strip_comment(line, "//");
        let tokens = identifiers(line);
        for window in tokens.windows(2) {
            if matches!(window[0], "class" | "interface" | "enum") {
                push_unique(&mut out, window[1]);
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

/// Extract the symbols a file references, in source order, deduplicated.
pub fn referenced_symbols(kind: FileKind, content: &str) -> Vec<String> {
    match kind {
        FileKind::MainClass | FileKind::Feature => class_references(content),
        FileKind::Manifest => manifest_references(content),
        FileKind::Config | FileKind::Resource => Vec::new(),
    }
}

fn class_references(content: &str) -> Vec<String> {
    let mut out = Vec::new();
    for line in content.lines() {
        let line = strip_comment(line, "//");
        let trimmed = line.trim();

        // `import a.b.C;` -- reference the last dotted segment.
        if let Some(rest) = trimmed.strip_prefix("import ") {
            let path = rest.trim_end_matches(';').trim();
            if let Some(last) = path.rsplit('.').next() {
                if last != "*" {
                    push_unique(&mut out, last);
                }
            }
            continue;
        }

        let tokens = identifiers(line);
        let mut i = 0;
        while i < tokens.len() {
            match tokens[i] {
                // `extends X` / `new X(...)` -- the next identifier.
                "extends" | "new" => {
                    if let Some(next) = tokens.get(i + 1) {
                        push_unique(&mut out, next);
                    }
                    i += 2;
                }
                // `implements A, B` -- uppercase identifiers until a keyword
                // or the end of the line.
                "implements" => {
                    let mut j = i + 1;
                    while let Some(tok) = tokens.get(j) {
                        if tok.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
                            push_unique(&mut out, tok);
                            j += 1;
                        } else {
                            break;
                        }
                    }
                    i = j;
                }
                _ => i += 1,
            }
        }
    }
    out
}

fn manifest_references(content: &str) -> Vec<String> {
    let mut out = Vec::new();
    for line in content.lines() {
        let line = strip_comment(line, "#");
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if key.trim() == "main" {
            // The main class is referenced by its fully qualified name.
            if let Some(last) = value.trim().rsplit('.').next() {
                push_unique(&mut out, last);
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Manifest keys
// ---------------------------------------------------------------------------

/// Look up a top-level `key: value` entry in manifest/config content.
pub fn yaml_value<'a>(content: &'a str, key: &str) -> Option<&'a str> {
    for line in content.lines() {
        let line = strip_comment(line, "#");
        if let Some((k, v)) = line.split_once(':') {
            if k.trim() == key {
                let v = v.trim();
                if !v.is_empty() {
                    return Some(v);
                }
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
