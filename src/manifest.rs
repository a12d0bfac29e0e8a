//! # Manifest Parser
//!
//! Parses Go `go.mod` files into a [`Manifest`] and turns a manifest into the
//! flat, deduplicated list of downloadable dependencies that the size stages
//! work with.
//!
//! ## Supported directives
//!
//! - `module`, `go`: recorded.
//! - `require`: single-line and parenthesized blocks; `// indirect` is kept
//!   as a flag.
//! - `replace`: `old [version] => new [version]`, single-line and blocks. A
//!   replacement without a version, or whose path starts with `./`, `../` or
//!   `/`, points at a local directory.
//! - `exclude`: recorded.
//! - `toolchain`, `retract`, `godebug`, `tool`, `ignore`: accepted and
//!   ignored, in single-line and block form.
//!
//! Version tokens must start with `v`. Short forms the go command accepts
//! (`v1`, `v1.2`) are recorded in canonical `vX.Y.Z` form; anything else is
//! recorded as written.
//!
//! Anything else is a [`Error::ManifestParse`] carrying the 1-based line.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// File name of the manifest at a module root.
pub const MANIFEST_FILE: &str = "go.mod";

/// Lock file paired with [`MANIFEST_FILE`].
pub const LOCK_FILE: &str = "go.sum";

/// A required module. Identity for sizing purposes is the path alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub path: String,
    pub version: String,
    #[serde(default)]
    pub indirect: bool,
}

impl Dependency {
    pub fn new(path: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
            indirect: false,
        }
    }
}

/// A module path with an optional version, as used by `replace` and `exclude`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRef {
    pub path: String,
    pub version: Option<String>,
}

/// One `replace` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replace {
    pub old: ModuleRef,
    pub new: ModuleRef,
}

impl Replace {
    /// Whether the replacement is a directory on disk rather than a module.
    pub fn is_local(&self) -> bool {
        let path = &self.new.path;
        self.new.version.is_none()
            || path.starts_with("./")
            || path.starts_with("../")
            || path.starts_with('/')
    }

    fn applies_to(&self, dependency: &Dependency) -> bool {
        self.old.path == dependency.path
            && self
                .old
                .version
                .as_ref()
                .is_none_or(|version| *version == dependency.version)
    }
}

/// A parsed manifest.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub module: String,
    pub go_version: Option<String>,
    pub require: Vec<Dependency>,
    pub replace: Vec<Replace>,
    pub exclude: Vec<ModuleRef>,
}

impl Manifest {
    /// The replace directive that applies to `dependency`, if any.
    ///
    /// A version-specific directive wins over a path-wide one.
    pub fn replacement_for(&self, dependency: &Dependency) -> Option<&Replace> {
        self.replace
            .iter()
            .filter(|r| r.applies_to(dependency))
            .max_by_key(|r| r.old.version.is_some())
    }
}

/// Parse manifest text.
pub fn parse(content: &str) -> Result<Manifest> {
    let mut manifest = Manifest::default();
    let mut block: Option<String> = None;
    let mut last_line = 0;

    for (index, raw) in content.lines().enumerate() {
        let line = index + 1;
        last_line = line;
        let (code, comment) = split_comment(raw);
        let tokens = tokenize(code, line)?;
        if tokens.is_empty() {
            continue;
        }

        if block.is_some() && tokens.len() == 1 && tokens[0] == ")" {
            block = None;
            continue;
        }
        if let Some(verb) = &block {
            apply_directive(&mut manifest, verb, &tokens, comment, line)?;
            continue;
        }

        let verb = tokens[0].as_str();
        let args = &tokens[1..];
        if args.len() == 1 && args[0] == "(" {
            match verb {
                "require" | "replace" | "exclude" | "retract" | "godebug" | "tool"
                | "ignore" => {
                    block = Some(verb.to_string());
                }
                other => {
                    return Err(Error::ManifestParse {
                        line,
                        message: format!("directive `{}` does not take a block", other),
                    })
                }
            }
            continue;
        }
        apply_directive(&mut manifest, verb, args, comment, line)?;
    }

    if let Some(verb) = block {
        return Err(Error::ManifestParse {
            line: last_line,
            message: format!("unterminated `{}` block", verb),
        });
    }
    if manifest.module.is_empty() {
        return Err(Error::ManifestParse {
            line: last_line.max(1),
            message: "missing module directive".to_string(),
        });
    }

    Ok(manifest)
}

/// Read and parse the manifest at `path`.
pub fn from_file(path: &Path) -> Result<Manifest> {
    let content = fs::read_to_string(path)?;
    parse(&content)
}

fn apply_directive(
    manifest: &mut Manifest,
    verb: &str,
    args: &[String],
    comment: Option<&str>,
    line: usize,
) -> Result<()> {
    let malformed = |what: &str| Error::ManifestParse {
        line,
        message: format!("malformed `{}` directive: {}", verb, what),
    };

    match verb {
        "module" => match args {
            [path] => manifest.module = path.clone(),
            _ => return Err(malformed("expected a single module path")),
        },
        "go" => match args {
            [version] => manifest.go_version = Some(version.clone()),
            _ => return Err(malformed("expected a single version")),
        },
        "require" => match args {
            [path, version] => {
                let version = check_version(version, line)?;
                manifest.require.push(Dependency {
                    path: path.clone(),
                    version,
                    indirect: comment.is_some_and(|c| c.trim_start().starts_with("indirect")),
                });
            }
            _ => return Err(malformed("expected `path version`")),
        },
        "exclude" => match args {
            [path, version] => manifest.exclude.push(ModuleRef {
                path: path.clone(),
                version: Some(version.clone()),
            }),
            _ => return Err(malformed("expected `path version`")),
        },
        "replace" => {
            let arrow = args
                .iter()
                .position(|t| t == "=>")
                .ok_or_else(|| malformed("missing `=>`"))?;
            let old = module_ref(&args[..arrow]).ok_or_else(|| malformed("bad left side"))?;
            let new =
                module_ref(&args[arrow + 1..]).ok_or_else(|| malformed("bad right side"))?;
            manifest.replace.push(Replace { old, new });
        }
        "toolchain" | "retract" | "godebug" | "tool" | "ignore" => {}
        other => {
            return Err(Error::ManifestParse {
                line,
                message: format!("unknown directive `{}`", other),
            })
        }
    }
    Ok(())
}

fn module_ref(tokens: &[String]) -> Option<ModuleRef> {
    match tokens {
        [path] => Some(ModuleRef {
            path: path.clone(),
            version: None,
        }),
        [path, version] => Some(ModuleRef {
            path: path.clone(),
            version: Some(version.clone()),
        }),
        _ => None,
    }
}

/// Returns the version in the form it is recorded in.
fn check_version(version: &str, line: usize) -> Result<String> {
    if version.len() < 2 || !version.starts_with('v') {
        return Err(Error::ManifestParse {
            line,
            message: format!("version `{}` must start with `v`", version),
        });
    }
    Ok(canonical_version(version))
}

/// `v1` and `v1.2` become `v1.0.0` and `v1.2.0`, suffixes kept.
///
/// Tokens that still are not semantic versions are returned unchanged.
pub fn canonical_version(version: &str) -> String {
    let Some(bare) = version.strip_prefix('v') else {
        return version.to_string();
    };
    let split = bare.find(['-', '+']).unwrap_or(bare.len());
    let (core, suffix) = bare.split_at(split);
    let padded = match core.split('.').count() {
        1 => format!("{}.0.0{}", core, suffix),
        2 => format!("{}.0{}", core, suffix),
        _ => bare.to_string(),
    };
    match Version::parse(&padded) {
        Ok(parsed) => format!("v{}", parsed),
        Err(_) => version.to_string(),
    }
}

/// Split a line at the first `//` that is not inside quotes.
fn split_comment(line: &str) -> (&str, Option<&str>) {
    let mut quote: Option<char> = None;
    let mut prev = '\0';
    for (i, ch) in line.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '`' => quote = Some(ch),
            None if ch == '/' && prev == '/' => {
                return (&line[..i - 1], Some(&line[i + 1..]));
            }
            None => {}
        }
        prev = ch;
    }
    (line, None)
}

fn tokenize(code: &str, line: usize) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut chars = code.chars().peekable();

    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
        } else if ch == '"' || ch == '`' {
            chars.next();
            let mut token = String::new();
            loop {
                match chars.next() {
                    Some(c) if c == ch => break,
                    Some('\\') if ch == '"' => {
                        if let Some(escaped) = chars.next() {
                            token.push(escaped);
                        }
                    }
                    Some(c) => token.push(c),
                    None => {
                        return Err(Error::ManifestParse {
                            line,
                            message: "unterminated quoted string".to_string(),
                        })
                    }
                }
            }
            tokens.push(token);
        } else if ch == '(' || ch == ')' {
            chars.next();
            tokens.push(ch.to_string());
        } else {
            let mut token = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() || c == '(' || c == ')' {
                    break;
                }
                token.push(c);
                chars.next();
            }
            tokens.push(token);
        }
    }
    Ok(tokens)
}

/// Deduplicate by module path, keeping the first occurrence.
pub fn dedup_by_path(dependencies: Vec<Dependency>) -> Vec<Dependency> {
    let mut seen = HashSet::new();
    dependencies
        .into_iter()
        .filter(|dep| seen.insert(dep.path.clone()))
        .collect()
}

/// Flatten a manifest into downloadable dependencies.
///
/// Remote replacements rewrite the matching requirement. Local replacements
/// drop it and pull in the requirements of the manifest found in that
/// directory (relative to `manifest_dir`), recursively. Local directories
/// outside `manifest_dir` are never read.
pub fn resolve_requirements(manifest: &Manifest, manifest_dir: &Path) -> Vec<Dependency> {
    let root = normalize(manifest_dir);
    let mut visited = HashSet::new();
    visited.insert(root.clone());
    let mut collected = Vec::new();
    collect_requirements(manifest, &root, &root, &mut visited, &mut collected);
    dedup_by_path(collected)
}

fn collect_requirements(
    manifest: &Manifest,
    manifest_dir: &Path,
    root: &Path,
    visited: &mut HashSet<PathBuf>,
    collected: &mut Vec<Dependency>,
) {
    for dependency in &manifest.require {
        match manifest.replacement_for(dependency) {
            None => collected.push(dependency.clone()),
            Some(replace) if replace.is_local() => {
                let nested_dir = match fs::canonicalize(manifest_dir.join(&replace.new.path)) {
                    Ok(dir) => dir,
                    Err(e) => {
                        warn!(
                            "Skipping local replacement {} for {}: {}",
                            replace.new.path, dependency.path, e
                        );
                        continue;
                    }
                };
                if !nested_dir.starts_with(root) {
                    warn!(
                        "Skipping local replacement {} for {}: outside the module tree",
                        replace.new.path, dependency.path
                    );
                    continue;
                }
                if !visited.insert(nested_dir.clone()) {
                    continue;
                }
                match from_file(&nested_dir.join(MANIFEST_FILE)) {
                    Ok(nested) => {
                        collect_requirements(&nested, &nested_dir, root, visited, collected)
                    }
                    Err(e) => warn!(
                        "Skipping local replacement {} for {}: {}",
                        nested_dir.display(),
                        dependency.path,
                        e
                    ),
                }
            }
            Some(replace) => collected.push(Dependency {
                path: replace.new.path.clone(),
                version: replace
                    .new
                    .version
                    .clone()
                    .unwrap_or_else(|| dependency.version.clone()),
                indirect: dependency.indirect,
            }),
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
