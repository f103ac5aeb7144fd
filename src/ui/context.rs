//! Whether cache commands may draw spinners

use std::io::IsTerminal;

/// Set by CI runners, or by the user to force plain step lines
const PLAIN_OUTPUT_VARS: &[&str] = &[
    "BUILDSTASH_PLAIN",
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "JENKINS_URL",
    "BUILDKITE",
    "TEAMCITY_VERSION",
    "TF_BUILD",
];

/// Rendering mode shared by the output helpers and `TaskSpinner`
#[derive(Debug, Clone)]
pub struct UiContext {
    interactive: bool,
}

impl UiContext {
    /// Interactive only on a terminal with none of the plain-output
    /// variables set
    pub fn detect() -> Self {
        Self::from_env(std::io::stdout().is_terminal(), |var| {
            std::env::var_os(var).is_some()
        })
    }

    fn from_env(is_terminal: bool, is_set: impl Fn(&str) -> bool) -> Self {
        let plain = PLAIN_OUTPUT_VARS.iter().any(|var| is_set(var));
        Self {
            interactive: is_terminal && !plain,
        }
    }

    /// Plain lines regardless of the terminal
    pub fn non_interactive() -> Self {
        Self { interactive: false }
    }

    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }
}
