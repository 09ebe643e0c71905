//! Native-notation text preprocessor: macro expansion, `*if`/`*else`/`*fi`
//! conditionals, `*include` file inclusion, and `*comment` blocks — all run
//! over the raw source text before the lexer ever sees it (§4.2).

use crate::domain::errors::EngraveError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Maximum nesting depth for `*include` and macro expansion combined,
/// beyond which the run aborts with [`EngraveError::NestingTooDeep`] rather
/// than looping forever on a self-including file or recursive macro.
pub const MAX_NESTING_DEPTH: u32 = 20;

/// Maximum number of positional macro arguments (`&1` .. `&20`).
pub const MAX_MACRO_ARGS: usize = 20;

#[derive(Debug, Clone)]
struct Macro {
    body: String,
    arg_count: usize,
}

/// Resolves `*include` targets. The CLI adapter supplies a filesystem-backed
/// implementation; tests can substitute an in-memory one.
pub trait IncludeResolver {
    fn resolve(&self, from: &Path, target: &str) -> Result<String, EngraveError>;
}

pub struct FsIncludeResolver;

impl IncludeResolver for FsIncludeResolver {
    fn resolve(&self, from: &Path, target: &str) -> Result<String, EngraveError> {
        let base = from.parent().unwrap_or_else(|| Path::new("."));
        let path: PathBuf = base.join(target);
        std::fs::read_to_string(&path).map_err(EngraveError::Io)
    }
}

pub struct Preprocessor<'a> {
    macros: HashMap<String, Macro>,
    flags: HashMap<String, bool>,
    resolver: &'a dyn IncludeResolver,
}

impl<'a> Preprocessor<'a> {
    pub fn new(resolver: &'a dyn IncludeResolver) -> Self {
        Self {
            macros: HashMap::new(),
            flags: HashMap::new(),
            resolver,
        }
    }

    pub fn define_flag(&mut self, name: impl Into<String>, value: bool) {
        self.flags.insert(name.into(), value);
    }

    /// Expand `source` (read from `path`, used to resolve relative
    /// `*include` targets) into plain notation text with every directive
    /// resolved.
    pub fn expand(&mut self, source: &str, path: &Path) -> Result<String, EngraveError> {
        self.expand_at_depth(source, path, 0)
    }

    fn expand_at_depth(&mut self, source: &str, path: &Path, depth: u32) -> Result<String, EngraveError> {
        if depth >= MAX_NESTING_DEPTH {
            return Err(EngraveError::NestingTooDeep {
                limit: MAX_NESTING_DEPTH,
            });
        }

        let mut out = String::new();
        let mut lines = source.lines().peekable();
        // Conditional stack: each frame records whether its branch is
        // currently active and whether it has already been taken (so an
        // `*or` after a taken branch stays inactive).
        let mut cond_stack: Vec<(bool, bool)> = Vec::new();
        let mut in_comment = false;

        while let Some(line) = lines.next() {
            let trimmed = line.trim_start();

            if in_comment {
                if trimmed.starts_with("*endcomment") {
                    in_comment = false;
                }
                continue;
            }

            if trimmed.starts_with("*comment") {
                in_comment = true;
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("*if") {
                let active = self.eval_condition(rest.trim(), false);
                let parent_active = cond_stack.last().map_or(true, |&(a, _)| a);
                cond_stack.push((parent_active && active, active));
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix("*not") {
                let active = self.eval_condition(rest.trim(), true);
                let parent_active = cond_stack.last().map_or(true, |&(a, _)| a);
                cond_stack.push((parent_active && active, active));
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix("*or") {
                if let Some((_, taken)) = cond_stack.pop() {
                    let active = !taken && self.eval_condition(rest.trim(), false);
                    let parent_active = cond_stack.last().map_or(true, |&(a, _)| a);
                    cond_stack.push((parent_active && active, taken || active));
                }
                continue;
            }
            if trimmed.starts_with("*else") {
                if let Some((_, taken)) = cond_stack.pop() {
                    let active = !taken;
                    let parent_active = cond_stack.last().map_or(true, |&(a, _)| a);
                    cond_stack.push((parent_active && active, true));
                }
                continue;
            }
            if trimmed.starts_with("*fi") {
                cond_stack.pop();
                continue;
            }

            let active = cond_stack.last().map_or(true, |&(a, _)| a);
            if !active {
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("*define") {
                self.define_macro(rest.trim())?;
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("*include") {
                let target = rest.trim().trim_matches('"');
                let included = self.resolver.resolve(path, target)?;
                let expanded = self.expand_at_depth(&included, &path.join(target), depth + 1)?;
                out.push_str(&expanded);
                out.push('\n');
                continue;
            }

            out.push_str(&self.expand_macro_calls(line, depth)?);
            out.push('\n');
        }

        Ok(out)
    }

    fn eval_condition(&self, name: &str, negate_from_not: bool) -> bool {
        let value = self.flags.get(name).copied().unwrap_or(false);
        if negate_from_not {
            !value
        } else {
            value
        }
    }

    fn define_macro(&mut self, rest: &str) -> Result<(), EngraveError> {
        let mut parts = rest.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default().to_string();
        let body = parts.next().unwrap_or_default().to_string();
        let arg_count = (1..=MAX_MACRO_ARGS)
            .filter(|n| body.contains(&format!("&{n}")))
            .count();
        self.macros.insert(name, Macro { body, arg_count });
        Ok(())
    }

    /// Expand `&name(arg1,arg2,...)` calls in `line`, substituting `&1`..`&N`
    /// in the macro body. `&` itself is escaped as `&&` per §4.2.
    fn expand_macro_calls(&self, line: &str, depth: u32) -> Result<String, EngraveError> {
        if depth >= MAX_NESTING_DEPTH {
            return Err(EngraveError::NestingTooDeep {
                limit: MAX_NESTING_DEPTH,
            });
        }
        let mut out = String::new();
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '&' {
                out.push(c);
                continue;
            }
            if chars.peek() == Some(&'&') {
                chars.next();
                out.push('&');
                continue;
            }
            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_alphanumeric() || c == '_' {
                    name.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            let mut args = Vec::new();
            if chars.peek() == Some(&'(') {
                chars.next();
                let mut current = String::new();
                for c in chars.by_ref() {
                    if c == ')' {
                        args.push(std::mem::take(&mut current));
                        break;
                    } else if c == ',' {
                        args.push(std::mem::take(&mut current));
                    } else {
                        current.push(c);
                    }
                }
            }
            if args.len() > MAX_MACRO_ARGS {
                return Err(EngraveError::Message(format!(
                    "macro '{name}' called with more than {MAX_MACRO_ARGS} arguments"
                )));
            }
            if let Some(m) = self.macros.get(&name) {
                let mut body = m.body.clone();
                for i in 1..=m.arg_count.max(args.len()) {
                    let placeholder = format!("&{i}");
                    let value = args.get(i - 1).cloned().unwrap_or_default();
                    body = body.replace(&placeholder, &value);
                }
                out.push_str(&self.expand_macro_calls(&body, depth + 1)?);
            } else {
                out.push('&');
                out.push_str(&name);
            }
        }
        Ok(out)
    }
}
