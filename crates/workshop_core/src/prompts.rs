//! Prompt templates stored as text files with `{name}` placeholders.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub type PromptVariables = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("missing variable for prompt template: {0}")]
    MissingVariable(String),
    #[error("malformed prompt template at byte {position}: {reason}")]
    Malformed {
        position: usize,
        reason: &'static str,
    },
    #[error("error loading prompt from {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub fn load_prompt_from_file(
    path: impl AsRef<Path>,
    variables: &PromptVariables,
) -> Result<String, PromptError> {
    let path = path.as_ref();
    let template = std::fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => PromptError::NotFound(path.to_path_buf()),
        _ => PromptError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    render_template(&template, variables)
}

/// Substitutes `{name}` placeholders; `{{` and `}}` render literal braces.
pub fn render_template(template: &str, variables: &PromptVariables) -> Result<String, PromptError> {
    let mut rendered = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((position, ch)) = chars.next() {
        match ch {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                rendered.push('{');
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                rendered.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for (_, next) in chars.by_ref() {
                    if next == '}' {
                        closed = true;
                        break;
                    }
                    if next == '{' {
                        return Err(PromptError::Malformed {
                            position,
                            reason: "nested '{' inside placeholder",
                        });
                    }
                    name.push(next);
                }
                if !closed {
                    return Err(PromptError::Malformed {
                        position,
                        reason: "unterminated placeholder",
                    });
                }
                if name.is_empty() {
                    return Err(PromptError::Malformed {
                        position,
                        reason: "empty placeholder",
                    });
                }
                let value = variables
                    .get(&name)
                    .ok_or_else(|| PromptError::MissingVariable(name.clone()))?;
                rendered.push_str(value);
            }
            '}' => {
                return Err(PromptError::Malformed {
                    position,
                    reason: "single '}' encountered",
                });
            }
            other => rendered.push(other),
        }
    }

    Ok(rendered)
}
