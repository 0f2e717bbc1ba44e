//! # Shell Completion Module
//!
//! Static completion scripts come from clap. Catalog titles are offered
//! dynamically through the hidden `complete-titles` command.
//!
//! ```bash
//! reel completion bash > ~/.local/share/bash-completion/completions/reel
//! reel completion zsh > ~/.config/zsh/completions/_reel
//! ```

use crate::cli::Shell;
use crate::content::ContentKind;
use crate::store::{CatalogStore, StoreResult};
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io;

/// Generate shell completions for the given shell
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

#[must_use]
pub fn shell_to_completion_shell(shell: Shell) -> CompletionShell {
    match shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    }
}

/// Sorted, de-duplicated titles of every available item.
pub fn title_completions<S: CatalogStore>(store: &S) -> StoreResult<Vec<String>> {
    let mut titles = Vec::new();
    for kind in ContentKind::ALL {
        titles.extend(
            store
                .find_all(kind)?
                .into_iter()
                .map(|item| item.title)
                .filter(|title| !title.is_empty()),
        );
    }
    titles.sort();
    titles.dedup();
    Ok(titles)
}

/// Quote a completion for shells that split on whitespace.
#[must_use]
pub fn quote_completion(completion: &str) -> String {
    if completion.contains(char::is_whitespace) {
        format!("\"{}\"", completion.replace('"', "\\\""))
    } else {
        completion.to_string()
    }
}
